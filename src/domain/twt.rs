use std::fmt;
use std::sync::OnceLock;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use chrono::FixedOffset;
use data_encoding::BASE32_NOPAD;

use crate::ast::{rfc3339, DateTime, Elem, Link, Mention, Subject, Tag, TextFormat};
use crate::domain::Twter;
use crate::lexer::LINE_SEPARATOR;
use crate::opts::{FeedLookup, FmtOpts};

pub const TWT_HASH_LENGTH: usize = 7;

type Blake2b256 = Blake2b<U32>;

/// Short content address of a twt: the last characters of the lowercase,
/// unpadded base32 BLAKE2b-256 digest of `url\ncreated\ntext`.
pub fn twt_hash(url: &str, created: &chrono::DateTime<FixedOffset>, text: &str) -> String {
    let payload = format!("{}\n{}\n{}", url, rfc3339(created), text);
    let sum = Blake2b256::digest(payload.as_bytes());
    let encoded = BASE32_NOPAD.encode(&sum).to_lowercase();
    encoded[encoded.len() - TWT_HASH_LENGTH..].to_string()
}

/// One record of a feed.
///
/// Mentions, tags, links and the subject are indexed when elements are
/// appended. The hash and the fallback subject are computed once, on first
/// access.
#[derive(Debug, Clone)]
pub struct Twt {
    twter: Twter,
    created: DateTime,
    elems: Vec<Elem>,
    mentions: Vec<usize>,
    tags: Vec<usize>,
    links: Vec<usize>,
    subject: Option<usize>,
    hash: OnceLock<String>,
    fallback_subject: OnceLock<Subject>,
}

impl Twt {
    pub fn new(twter: Twter, created: DateTime, elems: impl IntoIterator<Item = Elem>) -> Self {
        let mut twt = Self {
            twter,
            created,
            elems: Vec::new(),
            mentions: Vec::new(),
            tags: Vec::new(),
            links: Vec::new(),
            subject: None,
            hash: OnceLock::new(),
            fallback_subject: OnceLock::new(),
        };
        for elem in elems {
            twt.append(elem);
        }
        twt
    }

    /// Carry a hash decoded from a serialized twt instead of computing it.
    /// An empty hash is ignored.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        let hash = hash.into();
        if !hash.is_empty() {
            self.hash = OnceLock::from(hash);
        }
        self
    }

    fn append(&mut self, elem: Elem) {
        let idx = self.elems.len();
        match &elem {
            Elem::Subject(subject) => {
                if self.subject.is_none() {
                    self.subject = Some(idx);
                }
                if subject.tag().is_some() {
                    self.tags.push(idx);
                }
            }
            Elem::Tag(_) => self.tags.push(idx),
            Elem::Mention(_) => self.mentions.push(idx),
            Elem::Link(_) => self.links.push(idx),
            Elem::Text(_) | Elem::Code(_) | Elem::LineSeparator => {}
        }
        self.elems.push(elem);
    }

    pub fn twter(&self) -> &Twter {
        &self.twter
    }

    pub fn datetime(&self) -> &DateTime {
        &self.created
    }

    pub fn created(&self) -> chrono::DateTime<FixedOffset> {
        self.created.datetime()
    }

    pub fn elems(&self) -> &[Elem] {
        &self.elems
    }

    pub fn mentions(&self) -> impl Iterator<Item = &Mention> {
        self.mentions.iter().filter_map(|&i| match &self.elems[i] {
            Elem::Mention(m) => Some(m),
            _ => None,
        })
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter_map(|&i| match &self.elems[i] {
            Elem::Tag(t) => Some(t),
            Elem::Subject(s) => s.tag(),
            _ => None,
        })
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter_map(|&i| match &self.elems[i] {
            Elem::Link(l) => Some(l),
            _ => None,
        })
    }

    fn mention_mut(&mut self, i: usize) -> Option<&mut Mention> {
        match self.elems.get_mut(i) {
            Some(Elem::Mention(m)) => Some(m),
            _ => None,
        }
    }

    fn tag_mut(&mut self, i: usize) -> Option<&mut Tag> {
        match self.elems.get_mut(i) {
            Some(Elem::Tag(t)) => Some(t),
            Some(Elem::Subject(s)) => s.tag_mut(),
            _ => None,
        }
    }

    /// The leading subject, or a `(#hash)` subject anchoring a new thread.
    pub fn subject(&self) -> &Subject {
        if let Some(Elem::Subject(subject)) = self.subject.map(|i| &self.elems[i]) {
            return subject;
        }
        self.fallback_subject
            .get_or_init(|| Subject::with_tag(Tag::new(self.hash(), "")))
    }

    pub fn hash(&self) -> &str {
        self.hash
            .get_or_init(|| twt_hash(&self.twter.url, &self.created(), &self.literal_text()))
    }

    /// Body as read from input.
    pub fn literal_text(&self) -> String {
        self.render(TextFormat::Literal)
    }

    /// Full record line: `timestamp<TAB>body<LF>`.
    pub fn literal(&self) -> String {
        format!("{}\t{}\n", self.created.literal(), self.literal_text())
    }

    /// Canonical twtxt body.
    pub fn text(&self) -> String {
        self.render(TextFormat::Text)
    }

    /// Record line ready to be written to a feed file.
    pub fn format_twt(&self) -> String {
        self.literal()
    }

    /// Render the body as is, without any rewriting.
    pub fn render(&self, mode: TextFormat) -> String {
        let mut out = String::new();
        for elem in &self.elems {
            elem.format(mode, &mut out);
        }
        out
    }

    /// Render the body for display. Mentions and tags are rewritten on a
    /// private copy first: text output drops their targets, Markdown and HTML
    /// point mentions at local user pages or external profile pages.
    pub fn format_text(&self, mode: TextFormat, opts: Option<&dyn FmtOpts>) -> String {
        let Some(opts) = opts else {
            return self.render(mode);
        };

        let mut twt = self.clone();
        twt.rewrite_targets(mode, opts);
        twt.render(mode)
    }

    fn rewrite_targets(&mut self, mode: TextFormat, opts: &dyn FmtOpts) {
        match mode {
            TextFormat::Text => {
                for i in self.tags.clone() {
                    if let Some(tag) = self.tag_mut(i) {
                        tag.set_target("");
                    }
                }
                for i in self.mentions.clone() {
                    let Some(m) = self.mention_mut(i) else { continue };
                    m.derive_domain();
                    if m.domain().is_empty() && is_local_feed(opts, m.target()) {
                        m.set_domain(opts.local_url().host_str().unwrap_or_default());
                    }
                    m.set_target("");
                }
            }
            TextFormat::Markdown | TextFormat::Html => {
                for i in self.mentions.clone() {
                    let Some(m) = self.mention_mut(i) else { continue };
                    if m.target().is_empty() {
                        continue;
                    }
                    if is_local_feed(opts, m.target()) {
                        let url = opts.user_url(m.target());
                        m.set_target(url);
                    } else {
                        m.derive_domain();
                        let url = opts.external_url(m.name(), m.target());
                        m.set_target(url);
                    }
                }
            }
            TextFormat::Literal | TextFormat::Compact => {}
        }
    }

    /// Fill in missing link targets in place: tags get a tag URL, bare
    /// mentions are resolved through `lookup`. Clone first to keep the
    /// original form.
    pub fn expand_links(&mut self, opts: &dyn FmtOpts, lookup: Option<&dyn FeedLookup>) {
        for i in self.tags.clone() {
            if let Some(tag) = self.tag_mut(i) {
                if tag.target().is_empty() {
                    let url = opts.url_for_tag(tag.text());
                    tag.set_target(url);
                }
            }
        }

        let Some(lookup) = lookup else { return };

        for i in self.mentions.clone() {
            let Some(m) = self.mention_mut(i) else { continue };
            if !m.target().is_empty() {
                continue;
            }
            let Some(twter) = lookup.feed_lookup(m.name()) else {
                tracing::warn!("No feed found for mention @{}", m.name());
                continue;
            };
            match twter.nick.split_once('@') {
                Some((name, domain)) => {
                    m.set_name(name);
                    m.set_domain(domain);
                }
                None => m.set_name(twter.nick.as_str()),
            }
            m.set_target(twter.url);
        }
    }
}

fn is_local_feed(opts: &dyn FmtOpts, url: &str) -> bool {
    opts.is_local_url(url) && url.ends_with("/twtxt.txt")
}

impl fmt::Display for Twt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal().replace(LINE_SEPARATOR, "\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::opts::SiteOpts;
    use crate::parser::parse_line;

    const ALICE: &str = "https://a.example/twtxt.txt";

    fn alice() -> Twter {
        Twter::new("alice", ALICE)
    }

    fn site() -> SiteOpts {
        SiteOpts::new(SiteConfig {
            base_url: "https://pod.example".into(),
            ..Default::default()
        })
        .unwrap()
    }

    fn twt(body: &str) -> Twt {
        parse_line(&format!("2021-01-24T02:19:54Z\t{body}"), &alice()).unwrap()
    }

    #[test]
    fn test_hash_shape() {
        let hash = twt("hello world").hash().to_string();
        assert_eq!(hash.len(), TWT_HASH_LENGTH);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c)));
    }

    #[test]
    fn test_hash_inputs() {
        let a = twt("hello world");
        assert_eq!(a.hash(), twt("hello world").hash());
        assert_ne!(a.hash(), twt("hello world!").hash());

        let other = parse_line("2021-01-24T02:19:54Z\thello world", &Twter::new("bob", "https://b.example/twtxt.txt")).unwrap();
        assert_ne!(a.hash(), other.hash());

        let later = parse_line("2021-01-24T02:19:55Z\thello world", &alice()).unwrap();
        assert_ne!(a.hash(), later.hash());
    }

    #[test]
    fn test_hash_matches_free_function() {
        let t = twt("hello world");
        assert_eq!(t.hash(), twt_hash(ALICE, &t.created(), "hello world"));
    }

    #[test]
    fn test_explicit_hash_is_kept() {
        let t = twt("hello world").with_hash("zzzzzzz");
        assert_eq!(t.hash(), "zzzzzzz");
        assert_eq!(twt("hello world").with_hash("").hash().len(), TWT_HASH_LENGTH);
    }

    #[test]
    fn test_subject_fallback_is_hash() {
        let t = twt("hello world");
        assert_eq!(t.subject().text(), t.hash());
        assert_eq!(t.subject().to_string(), format!("(#{})", t.hash()));
    }

    #[test]
    fn test_leading_subject() {
        let t = twt("(#abcdefg) replying here #rust");
        assert_eq!(t.subject().text(), "abcdefg");
        let tags: Vec<_> = t.tags().map(|t| t.text().to_string()).collect();
        assert_eq!(tags, vec!["abcdefg", "rust"]);
    }

    #[test]
    fn test_indices_keep_order_and_duplicates() {
        let t = twt("@bob hi @carol and @bob again https://x.example https://x.example");
        let names: Vec<_> = t.mentions().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["bob", "carol", "bob"]);
        assert_eq!(t.links().count(), 2);
    }

    #[test]
    fn test_literal_and_display() {
        let t = twt("one\u{2028}two");
        assert_eq!(t.literal(), "2021-01-24T02:19:54Z\tone\u{2028}two\n");
        assert_eq!(t.to_string(), "2021-01-24T02:19:54Z\tone\ntwo\n");
        assert_eq!(t.format_twt(), t.literal());
    }

    #[test]
    fn test_render_does_not_change_hash() {
        let t = twt("#rust @<bob https://b.example/twtxt.txt> hi");
        let before = twt("#rust @<bob https://b.example/twtxt.txt> hi").hash().to_string();
        for mode in [TextFormat::Html, TextFormat::Markdown, TextFormat::Compact] {
            t.render(mode);
            t.format_text(mode, Some(&site()));
        }
        assert_eq!(t.hash(), before);
    }

    #[test]
    fn test_concurrent_first_access() {
        let shared = std::sync::Arc::new(twt("no subject here"));
        let expected = twt("no subject here");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = std::sync::Arc::clone(&shared);
                std::thread::spawn(move || (t.hash().to_string(), t.subject().to_string()))
            })
            .collect();

        for handle in handles {
            let (hash, subject) = handle.join().unwrap();
            assert_eq!(hash, expected.hash());
            assert_eq!(subject, expected.subject().to_string());
        }
    }

    #[test]
    fn test_format_text_clears_targets() {
        let t = twt("#<rust https://t.example/rust> @<bob https://pod.example/user/bob/twtxt.txt>");
        assert_eq!(t.format_text(TextFormat::Text, Some(&site())), "#rust @bob@pod.example");
        assert_eq!(
            t.text(),
            "#<rust https://t.example/rust> @<bob https://pod.example/user/bob/twtxt.txt>"
        );
    }

    #[test]
    fn test_format_markdown_rewrites_mentions() {
        let site = site();
        let local = twt("@<bob https://pod.example/user/bob/twtxt.txt>");
        assert_eq!(
            local.format_text(TextFormat::Markdown, Some(&site)),
            "[@bob](https://pod.example/user/bob#bob)"
        );

        let external = twt("@<carol https://c.example/twtxt.txt>");
        assert_eq!(
            external.format_text(TextFormat::Html, Some(&site)),
            "<a href=\"https://pod.example/external?uri=https%3A%2F%2Fc.example%2Ftwtxt.txt&amp;nick=carol\">@carol<em>@c.example</em></a>"
        );
    }

    #[test]
    fn test_format_text_without_opts_is_plain_render() {
        let t = twt("@<bob https://b.example/twtxt.txt>");
        assert_eq!(t.format_text(TextFormat::Markdown, None), t.render(TextFormat::Markdown));
    }

    #[test]
    fn test_expand_links() {
        let mut t = twt("(#abcdefg) @bob @eve #rust");
        let lookup = |name: &str| {
            (name == "bob").then(|| Twter::new("bob@b.example", "https://b.example/twtxt.txt"))
        };
        t.expand_links(&site(), Some(&lookup));

        let tags: Vec<_> = t.tags().map(|t| t.target().to_string()).collect();
        assert_eq!(
            tags,
            vec![
                "https://pod.example/search?tag=abcdefg",
                "https://pod.example/search?tag=rust"
            ]
        );

        let mentions: Vec<_> = t.mentions().collect();
        assert_eq!(mentions[0].name(), "bob");
        assert_eq!(mentions[0].domain(), "b.example");
        assert_eq!(mentions[0].target(), "https://b.example/twtxt.txt");
        assert_eq!(mentions[1].target(), "");
    }

    #[test]
    fn test_clone_is_disjoint() {
        let original = twt("@bob #rust");
        let mut copy = original.clone();
        let lookup = |_: &str| Some(Twter::new("bob", "https://b.example/twtxt.txt"));
        copy.expand_links(&site(), Some(&lookup));

        assert_eq!(original.text(), "@bob #rust");
        assert_eq!(
            copy.text(),
            "@<bob https://b.example/twtxt.txt> #<rust https://pod.example/search?tag=rust>"
        );
        assert_eq!(original.hash(), copy.hash());
    }

    #[test]
    fn test_clone_renders_identically() {
        let t = twt("(re: lunch) @<bob https://b.example/twtxt.txt> `x` ![a](https://x.example/a.png)");
        let copy = t.clone();
        for mode in [
            TextFormat::Literal,
            TextFormat::Text,
            TextFormat::Markdown,
            TextFormat::Html,
            TextFormat::Compact,
        ] {
            assert_eq!(t.render(mode), copy.render(mode));
        }
    }

    #[test]
    fn test_programmatic_construction() {
        let created = crate::ast::DateTime::parse("2021-01-24T02:19:54Z").unwrap();
        let t = Twt::new(
            alice(),
            created,
            vec![
                Elem::from(Mention::new("bob", "https://b.example/twtxt.txt")),
                Elem::text(" hi "),
                Elem::from(Tag::new("rust", "")),
            ],
        );
        assert_eq!(t.text(), "@<bob https://b.example/twtxt.txt> hi #rust");
        assert_eq!(t.mentions().count(), 1);
        assert_eq!(t.tags().count(), 1);
    }
}
