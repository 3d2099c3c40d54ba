//! Policies the renderer and link expansion consult.
//!
//! - [`FmtOpts`]: tells local feeds from external ones and builds the URLs
//!   that mentions and tags point to.
//! - [`FeedLookup`]: resolves a bare `@name` to a feed author.
//! - [`SiteOpts`]: [`FmtOpts`] backed by [`SiteConfig`].

use url::form_urlencoded::byte_serialize;
use url::Url;

use crate::app::Result;
use crate::config::SiteConfig;
use crate::domain::Twter;

pub trait FmtOpts {
    fn local_url(&self) -> &Url;
    fn is_local_url(&self, url: &str) -> bool;
    /// User-facing page of a local feed.
    fn user_url(&self, url: &str) -> String;
    /// Local page describing an external feed.
    fn external_url(&self, nick: &str, uri: &str) -> String;
    fn url_for_tag(&self, tag: &str) -> String;
    fn url_for_user(&self, user: &str) -> String;
}

pub trait FeedLookup {
    fn feed_lookup(&self, name: &str) -> Option<Twter>;
}

impl<F> FeedLookup for F
where
    F: Fn(&str) -> Option<Twter>,
{
    fn feed_lookup(&self, name: &str) -> Option<Twter> {
        self(name)
    }
}

#[derive(Debug, Clone)]
pub struct SiteOpts {
    base: Url,
    config: SiteConfig,
}

impl SiteOpts {
    pub fn new(config: SiteConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        Ok(Self { base, config })
    }

    fn join(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

impl FmtOpts for SiteOpts {
    fn local_url(&self) -> &Url {
        &self.base
    }

    fn is_local_url(&self, url: &str) -> bool {
        let base = self.config.base_url.trim_end_matches('/');
        match url.strip_prefix(base) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    fn user_url(&self, url: &str) -> String {
        url.strip_suffix("/twtxt.txt").unwrap_or(url).to_string()
    }

    fn external_url(&self, nick: &str, uri: &str) -> String {
        let page = self.join(&self.config.external_path);
        match Url::parse(&page) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("uri", uri)
                    .append_pair("nick", nick);
                url.to_string()
            }
            Err(e) => {
                tracing::warn!("Invalid external page {}: {}", page, e);
                uri.to_string()
            }
        }
    }

    fn url_for_tag(&self, tag: &str) -> String {
        let tag: String = byte_serialize(tag.as_bytes()).collect();
        format!("{}{}", self.join(&self.config.tag_path), tag)
    }

    fn url_for_user(&self, user: &str) -> String {
        format!("{}{}/twtxt.txt", self.join(&self.config.user_path), user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteOpts {
        SiteOpts::new(SiteConfig {
            base_url: "https://pod.example/".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_base_url() {
        let result = SiteOpts::new(SiteConfig {
            base_url: "not a url".into(),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_is_local_url() {
        let site = site();
        assert!(site.is_local_url("https://pod.example/user/bob/twtxt.txt"));
        assert!(site.is_local_url("https://pod.example"));
        assert!(!site.is_local_url("https://pod.example.org/twtxt.txt"));
        assert!(!site.is_local_url("https://b.example/twtxt.txt"));
        assert!(!site.is_local_url(""));
    }

    #[test]
    fn test_user_url() {
        assert_eq!(
            site().user_url("https://pod.example/user/bob/twtxt.txt"),
            "https://pod.example/user/bob"
        );
    }

    #[test]
    fn test_external_url_encodes_query() {
        assert_eq!(
            site().external_url("bob", "https://b.example/twtxt.txt"),
            "https://pod.example/external?uri=https%3A%2F%2Fb.example%2Ftwtxt.txt&nick=bob"
        );
    }

    #[test]
    fn test_url_for_tag_and_user() {
        let site = site();
        assert_eq!(site.url_for_tag("rust"), "https://pod.example/search?tag=rust");
        assert_eq!(site.url_for_tag("a b"), "https://pod.example/search?tag=a+b");
        assert_eq!(
            site.url_for_user("bob"),
            "https://pod.example/user/bob/twtxt.txt"
        );
        assert_eq!(site.local_url().host_str(), Some("pod.example"));
    }

    #[test]
    fn test_closure_lookup() {
        let lookup = |name: &str| (name == "bob").then(|| Twter::new("bob", "https://b.example/twtxt.txt"));
        assert!(lookup.feed_lookup("bob").is_some());
        assert!(lookup.feed_lookup("eve").is_none());
    }
}
