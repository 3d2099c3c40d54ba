//! Renderers for body elements.
//!
//! [`Elem::format`] is one exhaustive match over (element, mode). Elements
//! with no dedicated renderer for a mode fall back to their literal form,
//! HTML falls back to Markdown where an element has no HTML form. Free text
//! reaching HTML output is always escaped.

use html_escape::{encode_double_quoted_attribute, encode_text};

use super::{Code, Elem, Mention, Subject, Tag};
use crate::lexer::LINE_SEPARATOR;

/// Output mode of a rendered twt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextFormat {
    /// Input bytes, unchanged.
    Literal,
    /// Canonical twtxt form, re-parseable.
    Text,
    Markdown,
    Html,
    /// Short form without target URLs.
    Compact,
}

impl Elem {
    pub fn format(&self, mode: TextFormat, out: &mut String) {
        use TextFormat::*;

        match (self, mode) {
            (_, Literal) => out.push_str(&self.literal()),
            (Elem::Text(n), Html) => out.push_str(&encode_text(n.literal())),
            (Elem::Text(n), _) => out.push_str(n.literal()),

            (Elem::Mention(n), Text) => n.format_text(out),
            (Elem::Mention(n), Markdown) => n.format_markdown(out),
            (Elem::Mention(n), Html) => n.format_html(out),
            (Elem::Mention(n), Compact) => n.format_compact(out),

            (Elem::Tag(n), Text) => n.format_text(out),
            (Elem::Tag(n), Markdown) => n.format_markdown(out),
            (Elem::Tag(n), Html) => n.format_html(out),
            (Elem::Tag(n), Compact) => n.format_compact(out),

            (Elem::Subject(n), Text) => n.format_text(out),
            (Elem::Subject(n), Markdown) => n.format_markdown(out),
            (Elem::Subject(n), Html) => n.format_html(out),
            (Elem::Subject(n), Compact) => out.push_str(&n.literal()),

            (Elem::Link(n), Html) => out.push_str(&encode_text(&n.literal())),
            (Elem::Link(n), Text | Markdown | Compact) => out.push_str(&n.literal()),

            (Elem::Code(n), Markdown) => n.format_markdown(out),
            (Elem::Code(n), Html) => n.format_html(out),
            (Elem::Code(n), Text | Compact) => out.push_str(&n.literal()),

            (Elem::LineSeparator, Text | Markdown | Html) => out.push('\n'),
            (Elem::LineSeparator, Compact) => out.push(LINE_SEPARATOR),
        }
    }

    pub fn to_format(&self, mode: TextFormat) -> String {
        let mut out = String::new();
        self.format(mode, &mut out);
        out
    }
}

impl Mention {
    /// Canonical form. A nick domain is written back so the mention reparses
    /// to the same feed.
    pub(crate) fn write_text(out: &mut String, name: &str, domain: &str, target: &str) {
        match (name.is_empty(), target.is_empty()) {
            (false, true) => Self::write_nick(out, name, domain),
            (true, false) => {
                out.push_str("@<");
                out.push_str(target);
                out.push('>');
            }
            (false, false) => {
                out.push_str("@<");
                Self::write_name(out, name, domain);
                out.push(' ');
                out.push_str(target);
                out.push('>');
            }
            (true, true) => {}
        }
    }

    fn write_nick(out: &mut String, name: &str, domain: &str) {
        out.push('@');
        Self::write_name(out, name, domain);
    }

    fn write_name(out: &mut String, name: &str, domain: &str) {
        out.push_str(name);
        if !domain.is_empty() {
            out.push('@');
            out.push_str(domain);
        }
    }

    pub fn format_text(&self, out: &mut String) {
        Self::write_text(out, &self.name, &self.domain, &self.target);
    }

    pub fn format_compact(&self, out: &mut String) {
        if self.name.is_empty() && !self.target.is_empty() {
            out.push_str("@<");
            out.push_str(&self.target);
            out.push('>');
        } else {
            Self::write_nick(out, &self.name, &self.domain);
        }
    }

    pub fn format_markdown(&self, out: &mut String) {
        match (self.name.is_empty(), self.target.is_empty()) {
            (false, true) => Self::write_nick(out, &self.name, &self.domain),
            (true, false) => {
                out.push('<');
                out.push_str(&self.target);
                out.push('>');
            }
            (false, false) => {
                out.push_str(&format!(
                    "[@{}]({}#{})",
                    self.name, self.target, self.name
                ));
            }
            (true, true) => {}
        }
    }

    pub fn format_html(&self, out: &mut String) {
        let domain = self.domain();
        let domain = if domain.is_empty() {
            String::new()
        } else {
            format!("<em>@{}</em>", encode_text(&domain))
        };

        if self.target.is_empty() {
            out.push('@');
            out.push_str(&encode_text(&self.name));
            out.push_str(&domain);
            return;
        }

        out.push_str(&format!(
            r#"<a href="{}">@{}{}</a>"#,
            encode_double_quoted_attribute(&self.target),
            encode_text(&self.name),
            domain
        ));
    }
}

impl Tag {
    pub(crate) fn write_text(out: &mut String, text: &str, target: &str) {
        if target.is_empty() {
            out.push('#');
            out.push_str(text);
        } else if text.is_empty() {
            out.push_str("#<");
            out.push_str(target);
            out.push('>');
        } else {
            out.push_str("#<");
            out.push_str(text);
            out.push(' ');
            out.push_str(target);
            out.push('>');
        }
    }

    pub fn format_text(&self, out: &mut String) {
        Self::write_text(out, &self.text, &self.target);
    }

    pub fn format_compact(&self, out: &mut String) {
        out.push('#');
        out.push_str(&self.text);
    }

    pub fn format_markdown(&self, out: &mut String) {
        if self.target.is_empty() {
            self.format_compact(out);
            return;
        }

        if self.text.is_empty() {
            let label = match self.url() {
                Some(url) => format!("{}{}", url.host_str().unwrap_or_default(), url.path()),
                None => self.target.clone(),
            };
            out.push_str(&format!("[{}]({})", label, self.target));
            return;
        }

        out.push_str(&format!("[#{}]({})", self.text, self.target));
    }

    pub fn format_html(&self, out: &mut String) {
        if self.target.is_empty() {
            self.format_compact(out);
            return;
        }

        out.push_str(&format!(
            r##"<a href="{}">#{}</a>"##,
            encode_double_quoted_attribute(&self.target),
            encode_text(&self.text)
        ));
    }
}

impl Subject {
    fn wrap(
        &self,
        out: &mut String,
        tag: impl FnOnce(&Tag, &mut String),
        text: impl FnOnce(&str, &mut String),
    ) {
        out.push('(');
        match &self.tag {
            Some(t) => tag(t, out),
            None => text(&self.text, out),
        }
        out.push(')');
    }

    pub fn format_text(&self, out: &mut String) {
        self.wrap(out, Tag::format_compact, |s, out| out.push_str(s));
    }

    pub fn format_markdown(&self, out: &mut String) {
        self.wrap(out, Tag::format_markdown, |s, out| out.push_str(s));
    }

    pub fn format_html(&self, out: &mut String) {
        self.wrap(out, Tag::format_html, |s, out| out.push_str(&encode_text(s)));
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        self.format_text(&mut out);
        f.write_str(&out)
    }
}

impl Code {
    /// Fenced literal with line separators shown as newlines.
    pub fn format_markdown(&self, out: &mut String) {
        out.push_str(&self.literal().replace(LINE_SEPARATOR, "\n"));
    }

    pub fn format_html(&self, out: &mut String) {
        let mut md = String::new();
        self.format_markdown(&mut md);
        out.push_str(&encode_text(&md));
    }
}
