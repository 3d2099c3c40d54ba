//! Element model for a parsed twt body.
//!
//! A body is an ordered list of [`Elem`] values. Each element keeps the text it
//! was read from, so concatenating [`Elem::literal`] over a parsed body gives
//! the input back byte for byte. Renderers live in [`format`].

pub mod format;

pub use format::TextFormat;

use std::borrow::Cow;

use chrono::{FixedOffset, NaiveDateTime, SecondsFormat};
use url::Url;

use crate::domain::Twter;
use crate::lexer::LINE_SEPARATOR;

const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Format a timestamp the way hashes and generated records expect it.
pub fn rfc3339(dt: &chrono::DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Timestamp of a record, with the text it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTime {
    lit: String,
    dt: chrono::DateTime<FixedOffset>,
}

impl DateTime {
    /// An empty literal is replaced by the RFC3339 form of `dt`.
    pub fn new(dt: chrono::DateTime<FixedOffset>, lit: impl Into<String>) -> Self {
        let mut lit = lit.into();
        if lit.is_empty() {
            lit = rfc3339(&dt);
        }
        Self { lit, dt }
    }

    /// Parse a timestamp field, trying RFC3339 first and then looser layouts.
    pub fn parse(lit: &str) -> Option<Self> {
        let trimmed = lit.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
            return Some(Self::new(dt, lit));
        }

        let zoned = match trimmed.strip_suffix(['Z', 'z']) {
            Some(rest) => Cow::Owned(format!("{rest}+00:00")),
            None => Cow::Borrowed(trimmed),
        };
        for layout in OFFSET_LAYOUTS {
            if let Ok(dt) = chrono::DateTime::parse_from_str(&zoned, layout) {
                return Some(Self::new(dt, lit));
            }
        }

        for layout in NAIVE_LAYOUTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, layout) {
                return Some(Self::new(naive.and_utc().fixed_offset(), lit));
            }
        }

        None
    }

    pub fn literal(&self) -> &str {
        &self.lit
    }

    pub fn datetime(&self) -> chrono::DateTime<FixedOffset> {
        self.dt
    }
}

/// `@name`, `@<url>` or `@<name url>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    lit: String,
    name: String,
    /// Set from a `name@domain` nick, never from the target.
    domain: String,
    target: String,
}

impl Mention {
    /// Build a mention from its parts. A `name@domain` nick is split.
    pub fn new(name: &str, target: &str) -> Self {
        let mut lit = String::new();
        Self::write_text(&mut lit, name, "", target);
        Self::with_literal(lit, name, target)
    }

    pub(crate) fn with_literal(lit: impl Into<String>, name: &str, target: &str) -> Self {
        let (name, domain) = match name.split_once('@') {
            Some((name, domain)) => (name.to_string(), domain.to_string()),
            None => (name.to_string(), String::new()),
        };

        Self {
            lit: lit.into(),
            name,
            domain,
            target: target.to_string(),
        }
    }

    pub fn literal(&self) -> &str {
        &self.lit
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Domain of the mentioned feed, falling back to the host of the target.
    pub fn domain(&self) -> Cow<'_, str> {
        if self.domain.is_empty() {
            if let Some(host) = self.url().as_ref().and_then(Url::host_str) {
                return Cow::Owned(host.to_string());
            }
        }
        Cow::Borrowed(&self.domain)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn url(&self) -> Option<Url> {
        Url::parse(&self.target).ok()
    }

    pub fn twter(&self) -> Twter {
        Twter::new(&self.name, &self.target)
    }

    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = target.into();
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn set_domain(&mut self, domain: impl Into<String>) {
        self.domain = domain.into();
    }

    pub(crate) fn derive_domain(&mut self) {
        if self.domain.is_empty() && !self.target.is_empty() {
            if let Some(host) = self.url().as_ref().and_then(Url::host_str) {
                self.domain = host.to_string();
            }
        }
    }
}

/// `#tag`, `#<url>` or `#<tag url>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    lit: String,
    text: String,
    target: String,
}

impl Tag {
    pub fn new(text: &str, target: &str) -> Self {
        let mut lit = String::new();
        Self::write_text(&mut lit, text, target);
        Self::with_literal(lit, text, target)
    }

    pub(crate) fn with_literal(lit: impl Into<String>, text: &str, target: &str) -> Self {
        Self {
            lit: lit.into(),
            text: text.to_string(),
            target: target.to_string(),
        }
    }

    pub fn literal(&self) -> &str {
        &self.lit
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn url(&self) -> Option<Url> {
        Url::parse(&self.target).ok()
    }

    pub fn set_target(&mut self, target: impl Into<String>) {
        self.target = target.into();
    }
}

/// Thread anchor at the start of a body: `(free text)` or `(#tag)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    text: String,
    tag: Option<Tag>,
}

impl Subject {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: None,
        }
    }

    pub fn with_tag(tag: Tag) -> Self {
        Self {
            text: String::new(),
            tag: Some(tag),
        }
    }

    pub fn literal(&self) -> String {
        match &self.tag {
            Some(tag) => format!("({})", tag.literal()),
            None => format!("({})", self.text),
        }
    }

    /// The free text, or the text of the wrapped tag.
    pub fn text(&self) -> &str {
        match &self.tag {
            Some(tag) => tag.text(),
            None => &self.text,
        }
    }

    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    pub(crate) fn tag_mut(&mut self) -> Option<&mut Tag> {
        self.tag.as_mut()
    }
}

/// Run of text with no markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    lit: String,
}

impl Text {
    pub fn new(lit: impl Into<String>) -> Self {
        Self { lit: lit.into() }
    }

    pub fn literal(&self) -> &str {
        &self.lit
    }

    pub(crate) fn push_str(&mut self, s: &str) {
        self.lit.push_str(s);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `[text](url)`
    Standard,
    /// `![text](url)`
    Media,
    /// `<url>`
    Plain,
    /// A bare URL in running text.
    Naked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    kind: LinkKind,
    text: String,
    target: String,
}

impl Link {
    pub fn new(text: impl Into<String>, target: impl Into<String>, kind: LinkKind) -> Self {
        Self {
            kind,
            text: text.into(),
            target: target.into(),
        }
    }

    pub fn literal(&self) -> String {
        match self.kind {
            LinkKind::Naked => self.target.clone(),
            LinkKind::Plain => format!("<{}>", self.target),
            LinkKind::Media => format!("![{}]({})", self.text, self.target),
            LinkKind::Standard => format!("[{}]({})", self.text, self.target),
        }
    }

    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    pub fn is_media(&self) -> bool {
        self.kind == LinkKind::Media
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Inline,
    Block,
}

/// Code span or block. Holds the text between the fences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    kind: CodeKind,
    lit: String,
}

impl Code {
    pub fn new(lit: impl Into<String>, kind: CodeKind) -> Self {
        Self {
            kind,
            lit: lit.into(),
        }
    }

    pub fn literal(&self) -> String {
        match self.kind {
            CodeKind::Block => format!("```{}```", self.lit),
            CodeKind::Inline => format!("`{}`", self.lit),
        }
    }

    pub fn kind(&self) -> CodeKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.lit
    }
}

/// One inline unit of a twt body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Elem {
    Text(Text),
    Mention(Mention),
    Tag(Tag),
    Subject(Subject),
    Link(Link),
    Code(Code),
    /// Paragraph break, stored as U+2028 so the record stays on one line.
    LineSeparator,
}

impl Elem {
    /// The element as it was read from input.
    pub fn literal(&self) -> Cow<'_, str> {
        match self {
            Elem::Text(n) => Cow::Borrowed(n.literal()),
            Elem::Mention(n) => Cow::Borrowed(n.literal()),
            Elem::Tag(n) => Cow::Borrowed(n.literal()),
            Elem::Subject(n) => Cow::Owned(n.literal()),
            Elem::Link(n) => Cow::Owned(n.literal()),
            Elem::Code(n) => Cow::Owned(n.literal()),
            Elem::LineSeparator => Cow::Owned(LINE_SEPARATOR.to_string()),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Elem::Text(Text::new(s))
    }
}

impl From<Mention> for Elem {
    fn from(n: Mention) -> Self {
        Elem::Mention(n)
    }
}

impl From<Tag> for Elem {
    fn from(n: Tag) -> Self {
        Elem::Tag(n)
    }
}

impl From<Subject> for Elem {
    fn from(n: Subject) -> Self {
        Elem::Subject(n)
    }
}

impl From<Link> for Elem {
    fn from(n: Link) -> Self {
        Elem::Link(n)
    }
}

impl From<Code> for Elem {
    fn from(n: Code) -> Self {
        Elem::Code(n)
    }
}

impl From<Text> for Elem {
    fn from(n: Text) -> Self {
        Elem::Text(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_rfc3339() {
        let dt = DateTime::parse("2020-12-25T16:55:57Z").unwrap();
        assert_eq!(dt.literal(), "2020-12-25T16:55:57Z");
        assert_eq!(rfc3339(&dt.datetime()), "2020-12-25T16:55:57Z");
    }

    #[test]
    fn test_datetime_keeps_offset() {
        let dt = DateTime::parse("2020-12-25T16:55:57+01:00").unwrap();
        assert_eq!(rfc3339(&dt.datetime()), "2020-12-25T16:55:57+01:00");
    }

    #[test]
    fn test_datetime_loose_layouts() {
        let no_seconds = DateTime::parse("2020-12-25T16:55Z").unwrap();
        assert_eq!(rfc3339(&no_seconds.datetime()), "2020-12-25T16:55:00Z");

        let naive = DateTime::parse("2020-12-25T16:55:57").unwrap();
        assert_eq!(rfc3339(&naive.datetime()), "2020-12-25T16:55:57Z");

        let spaced = DateTime::parse("2020-12-25 16:55:57+02:00").unwrap();
        assert_eq!(rfc3339(&spaced.datetime()), "2020-12-25T16:55:57+02:00");
    }

    #[test]
    fn test_datetime_rejects_garbage() {
        assert!(DateTime::parse("2020-13-45").is_none());
        assert!(DateTime::parse("yesterday").is_none());
        assert!(DateTime::parse("").is_none());
    }

    #[test]
    fn test_datetime_empty_literal_is_generated() {
        let dt = DateTime::parse("2021-01-01T00:00:00Z").unwrap().datetime();
        assert_eq!(DateTime::new(dt, "").literal(), "2021-01-01T00:00:00Z");
    }

    #[test]
    fn test_mention_domain_from_nick() {
        let m = Mention::new("bob@example.com", "https://b.example/twtxt.txt");
        assert_eq!(m.name(), "bob");
        assert_eq!(m.domain(), "example.com");
        assert_eq!(m.literal(), "@<bob@example.com https://b.example/twtxt.txt>");
    }

    #[test]
    fn test_mention_domain_from_target() {
        let m = Mention::new("bob", "https://b.example/twtxt.txt");
        assert_eq!(m.domain(), "b.example");

        let bare = Mention::new("bob", "");
        assert_eq!(bare.domain(), "");
        assert_eq!(bare.literal(), "@bob");
    }

    #[test]
    fn test_mention_twter() {
        let m = Mention::new("bob", "https://b.example/twtxt.txt");
        let twter = m.twter();
        assert_eq!(twter.nick, "bob");
        assert_eq!(twter.url, "https://b.example/twtxt.txt");
    }

    #[test]
    fn test_subject_text() {
        assert_eq!(Subject::new("hello world").text(), "hello world");
        assert_eq!(Subject::new("hello world").literal(), "(hello world)");

        let tagged = Subject::with_tag(Tag::new("abcdefg", ""));
        assert_eq!(tagged.text(), "abcdefg");
        assert_eq!(tagged.literal(), "(#abcdefg)");
    }

    #[test]
    fn test_link_literals() {
        let target = "https://example.com/a.png";
        assert_eq!(Link::new("", target, LinkKind::Naked).literal(), target);
        assert_eq!(
            Link::new("", target, LinkKind::Plain).literal(),
            "<https://example.com/a.png>"
        );
        assert_eq!(
            Link::new("pic", target, LinkKind::Media).literal(),
            "![pic](https://example.com/a.png)"
        );
        assert_eq!(
            Link::new("pic", target, LinkKind::Standard).literal(),
            "[pic](https://example.com/a.png)"
        );
        assert!(Link::new("pic", target, LinkKind::Media).is_media());
    }

    #[test]
    fn test_code_literals() {
        assert_eq!(Code::new("x", CodeKind::Inline).literal(), "`x`");
        assert_eq!(Code::new("x", CodeKind::Block).literal(), "```x```");
    }

    #[test]
    fn test_line_separator_literal() {
        assert_eq!(Elem::LineSeparator.literal(), "\u{2028}");
    }
}
