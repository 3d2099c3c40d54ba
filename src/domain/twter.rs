use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Author of a feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Twter {
    pub nick: String,
    pub url: String,
    pub avatar: String,
    pub tagline: String,
}

impl Twter {
    pub fn new(nick: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn is_zero(&self) -> bool {
        self.nick.is_empty() && self.url.is_empty()
    }

    /// Domain part of a `name@domain` nick, else the host of the feed URL.
    pub fn domain(&self) -> String {
        if let Some((_, domain)) = self.nick.split_once('@') {
            return domain.to_string();
        }
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_default()
    }

    /// Nick qualified with the feed's host, e.g. `bob@example.com`.
    pub fn domain_nick(&self) -> String {
        if self.nick.contains('@') {
            return self.nick.clone();
        }
        match Url::parse(&self.url).ok().as_ref().and_then(Url::host_str) {
            Some(host) => format!("{}@{}", self.nick, host),
            None => self.nick.clone(),
        }
    }
}

impl fmt::Display for Twter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.nick, self.url)
    }
}

pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}
