//! Recursive-descent parser over [`Lexer`] tokens.
//!
//! The parser reads one token at a time and can push any number of tokens
//! back. Inline markup that does not close properly is never an error: the
//! tokens are pushed back, the opening marker becomes plain text and a
//! [`Diagnostic`] is recorded. Only the timestamp field can make a record
//! fail, plus unterminated code fences when [`ParserConfig::strict`] is set.

use std::collections::VecDeque;
use std::fmt;
use std::io::BufRead;

use crate::app::{Result, TwtError};
use crate::ast::{Code, CodeKind, DateTime, Elem, Link, LinkKind, Mention, Subject, Tag};
use crate::config::ParserConfig;
use crate::domain::{Comment, Comments, Twt, TwtFile, Twter, Twts};
use crate::lexer::{Lexer, Position, Token, TokenKind, LINE_SEPARATOR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Markup that was kept as plain text.
    Degraded,
    /// A record line left out of a parsed file.
    DroppedLine,
}

/// Non-fatal problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    pushed: Vec<Token<'a>>,
    queued: VecDeque<Elem>,
    config: ParserConfig,
    diagnostics: Vec<Diagnostic>,
    fragment: bool,
    last_char: Option<char>,
    at_body_start: bool,
}

impl<'a> Parser<'a> {
    /// Parser for record lines.
    pub fn new(input: &'a str, config: ParserConfig) -> Self {
        Self::with_lexer(Lexer::new(input), config, false)
    }

    /// Parser for a free-text fragment. Newlines in the fragment become
    /// line separators.
    pub fn fragment(input: &'a str, config: ParserConfig) -> Self {
        Self::with_lexer(Lexer::fragment(input), config, true)
    }

    fn with_lexer(lexer: Lexer<'a>, config: ParserConfig, fragment: bool) -> Self {
        Self {
            lexer,
            pushed: Vec::new(),
            queued: VecDeque::new(),
            config,
            diagnostics: Vec::new(),
            fragment,
            last_char: None,
            at_body_start: true,
        }
    }

    /// Number lines from `line` in positions and diagnostics.
    pub fn with_line(mut self, line: usize) -> Self {
        self.lexer = self.lexer.with_line(line);
        self
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Parse `timestamp<TAB>body`.
    pub fn parse_twt(&mut self, twter: &Twter) -> Result<Twt> {
        let mut tok = self.next();
        while tok.is(TokenKind::Space) {
            tok = self.next();
        }

        if !tok.is(TokenKind::DateTime) {
            return Err(error_at(tok.pos, "expected timestamp"));
        }
        let created = DateTime::parse(tok.text)
            .ok_or_else(|| error_at(tok.pos, format!("invalid timestamp {:?}", tok.text)))?;

        let tab = self.next();
        if !tab.is(TokenKind::Tab) {
            return Err(error_at(tab.pos, "expected tab after timestamp"));
        }

        let elems = self.parse_elems()?;

        // One record per line: only a final line ending may follow the body.
        let mut end = self.next();
        if end.is(TokenKind::Newline) {
            end = self.next();
        }
        if !end.is(TokenKind::Eof) {
            return Err(error_at(end.pos, "trailing content after record"));
        }

        Ok(Twt::new(twter.clone(), created, elems))
    }

    /// Parse a body up to the end of the line (or of the fragment).
    /// Adjacent text runs are merged into one element.
    pub fn parse_elems(&mut self) -> Result<Vec<Elem>> {
        let mut elems: Vec<Elem> = Vec::new();
        self.last_char = None;
        self.at_body_start = true;

        while let Some(elem) = self.parse_elem()? {
            self.at_body_start = false;
            if let Some(c) = elem.literal().chars().last() {
                self.last_char = Some(c);
            }

            match (elems.last_mut(), elem) {
                (Some(Elem::Text(prev)), Elem::Text(text)) => prev.push_str(text.literal()),
                (_, elem) => elems.push(elem),
            }
        }

        Ok(elems)
    }

    /// Parse the next element, or `None` at the end of the line.
    pub fn parse_elem(&mut self) -> Result<Option<Elem>> {
        if let Some(elem) = self.queued.pop_front() {
            return Ok(Some(elem));
        }

        let tok = self.next();
        let elem = match tok.kind {
            TokenKind::Eof => return Ok(None),
            TokenKind::Newline if !self.fragment => {
                self.push(tok);
                return Ok(None);
            }
            TokenKind::Newline | TokenKind::LineSep => Elem::LineSeparator,
            TokenKind::At if self.at_boundary() => self.parse_mention(tok),
            TokenKind::Hash if self.at_boundary() => self.parse_tag(tok),
            TokenKind::LParen if self.at_body_start => self.parse_subject(tok),
            TokenKind::Backtick => self.parse_code(tok)?,
            TokenKind::LAngle => self.parse_plain_link(tok),
            TokenKind::Bang => self.parse_media_link(tok),
            TokenKind::LBracket => self.parse_link(tok, LinkKind::Standard),
            TokenKind::Word if looks_like_url(tok.text) => self.parse_naked_link(tok),
            _ => Elem::text(tok.text),
        };

        Ok(Some(elem))
    }

    fn next(&mut self) -> Token<'a> {
        match self.pushed.pop() {
            Some(tok) => tok,
            None => self.lexer.next_token(),
        }
    }

    fn push(&mut self, tok: Token<'a>) {
        self.pushed.push(tok);
    }

    /// Push back tokens consumed by a failed attempt, oldest first out.
    fn rewind(&mut self, consumed: Vec<Token<'a>>) {
        self.pushed.extend(consumed.into_iter().rev());
    }

    fn at_boundary(&self) -> bool {
        !matches!(self.last_char, Some(c) if c.is_alphanumeric() || c == '_')
    }

    fn degrade(&mut self, pos: Position, message: &str) {
        tracing::trace!("Line {} column {}: {}", pos.line, pos.column, message);
        if self.diagnostics.len() < self.config.max_diagnostics {
            self.diagnostics.push(Diagnostic {
                kind: DiagnosticKind::Degraded,
                line: pos.line,
                column: pos.column,
                message: message.to_string(),
            });
        }
    }

    /// Take the leading name characters of a word. The rest of the word is
    /// pushed back as its own token.
    fn take_name(&mut self, word: Token<'a>) -> Option<&'a str> {
        let end = word
            .text
            .char_indices()
            .find(|&(_, c)| !is_name_char(c))
            .map_or(word.text.len(), |(i, _)| i);
        let name = word.text[..end].trim_end_matches('.');

        if name.is_empty() {
            self.push(word);
            return None;
        }

        let rest = &word.text[name.len()..];
        if !rest.is_empty() {
            let pos = Position {
                offset: word.pos.offset + name.len(),
                column: word.pos.column + name.chars().count(),
                ..word.pos
            };
            self.push(Token {
                kind: TokenKind::Word,
                text: rest,
                pos,
            });
        }
        Some(name)
    }

    /// The `@domain` of a bare `@nick@domain`, when the nick ran to the end
    /// of its word.
    fn take_domain(&mut self, whole_word: bool) -> Option<&'a str> {
        if !whole_word {
            return None;
        }
        let at = self.next();
        if at.is(TokenKind::At) {
            let word = self.next();
            if word.is(TokenKind::Word) {
                if let Some(domain) = self.take_name(word) {
                    return Some(domain);
                }
            } else {
                self.push(word);
            }
        }
        self.push(at);
        None
    }

    /// Parse the `<...>` part of `@<...>` or `#<...>`: one field is a target,
    /// two fields separated by a single space are a name and a target.
    /// Returns the text inside the brackets and the fields.
    fn parse_angle_ref(&mut self, start: Position) -> Option<(String, String, String)> {
        let mut consumed = Vec::new();
        let mut fields = vec![String::new()];

        loop {
            let tok = self.next();
            consumed.push(tok);
            match tok.kind {
                TokenKind::RAngle => break,
                TokenKind::Space
                    if tok.text == " " && fields.len() == 1 && !fields[0].is_empty() =>
                {
                    fields.push(String::new());
                }
                TokenKind::Word
                | TokenKind::At
                | TokenKind::Hash
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::LBracket
                | TokenKind::RBracket
                | TokenKind::Bang => {
                    if let Some(field) = fields.last_mut() {
                        field.push_str(tok.text);
                    }
                }
                _ => {
                    self.rewind(consumed);
                    self.degrade(start, "unterminated reference");
                    return None;
                }
            }
        }

        if fields.iter().any(String::is_empty) {
            self.rewind(consumed);
            self.degrade(start, "empty reference");
            return None;
        }

        let inner: String = consumed.iter().map(|t| t.text).collect();
        let (name, target) = match fields.len() {
            1 => (String::new(), fields.remove(0)),
            _ => {
                let target = fields.remove(1);
                (fields.remove(0), target)
            }
        };
        Some((format!("<{inner}"), name, target))
    }

    fn parse_mention(&mut self, at: Token<'a>) -> Elem {
        let tok = self.next();
        match tok.kind {
            TokenKind::Word => match self.take_name(tok) {
                Some(name) => {
                    let nick = match self.take_domain(name.len() == tok.text.len()) {
                        Some(domain) => format!("{name}@{domain}"),
                        None => name.to_string(),
                    };
                    Mention::with_literal(format!("@{nick}"), &nick, "").into()
                }
                None => Elem::text(at.text),
            },
            TokenKind::LAngle => match self.parse_angle_ref(at.pos) {
                Some((inner, name, target)) => {
                    Mention::with_literal(format!("@{inner}"), &name, &target).into()
                }
                None => Elem::text(format!("@{}", tok.text)),
            },
            _ => {
                self.push(tok);
                Elem::text(at.text)
            }
        }
    }

    fn parse_tag(&mut self, hash: Token<'a>) -> Elem {
        let tok = self.next();
        match tok.kind {
            TokenKind::Word => match self.take_name(tok) {
                Some(name) => Tag::with_literal(format!("#{name}"), name, "").into(),
                None => Elem::text(hash.text),
            },
            TokenKind::LAngle => match self.parse_angle_ref(hash.pos) {
                Some((inner, name, target)) => {
                    Tag::with_literal(format!("#{inner}"), &name, &target).into()
                }
                None => Elem::text(format!("#{}", tok.text)),
            },
            _ => {
                self.push(tok);
                Elem::text(hash.text)
            }
        }
    }

    /// `(#tag)` or `(free text)` at the very start of a body.
    fn parse_subject(&mut self, open: Token<'a>) -> Elem {
        let first = self.next();

        if first.is(TokenKind::Hash) {
            match self.parse_tag(first) {
                Elem::Tag(tag) => {
                    let close = self.next();
                    if close.is(TokenKind::RParen) {
                        return Subject::with_tag(tag).into();
                    }
                    self.push(close);
                    self.degrade(open.pos, "unterminated subject");
                    self.queued.push_back(Elem::Tag(tag));
                    return Elem::text(open.text);
                }
                other => self.queued.push_back(other),
            }
        } else {
            self.push(first);
        }

        // Free text, including a `#` that did not start a tag.
        let prefix: String = self.queued.drain(..).map(|e| e.literal().into_owned()).collect();
        let mut text = prefix.clone();
        let mut consumed = Vec::new();
        loop {
            let tok = self.next();
            consumed.push(tok);
            match tok.kind {
                TokenKind::RParen => return Subject::new(text).into(),
                TokenKind::Newline | TokenKind::LineSep | TokenKind::Eof => {
                    self.rewind(consumed);
                    self.degrade(open.pos, "unterminated subject");
                    if !prefix.is_empty() {
                        self.queued.push_back(Elem::text(prefix));
                    }
                    return Elem::text(open.text);
                }
                _ => text.push_str(tok.text),
            }
        }
    }

    /// Inline code up to the next single backtick on the same line, or a
    /// block up to the next triple backtick.
    fn parse_code(&mut self, open: Token<'a>) -> Result<Elem> {
        let kind = match open.text.len() {
            2 => return Ok(Code::new("", CodeKind::Inline).into()),
            3 => CodeKind::Block,
            _ => CodeKind::Inline,
        };

        let mut consumed = Vec::new();
        let mut content = String::new();
        loop {
            let tok = self.next();
            consumed.push(tok);
            match tok.kind {
                TokenKind::Backtick if tok.text == open.text => {
                    return Ok(Code::new(content, kind).into());
                }
                TokenKind::Newline if self.fragment && kind == CodeKind::Block => {
                    content.push(LINE_SEPARATOR);
                }
                TokenKind::LineSep if kind == CodeKind::Block => content.push(LINE_SEPARATOR),
                TokenKind::Newline | TokenKind::LineSep | TokenKind::Eof => break,
                _ => content.push_str(tok.text),
            }
        }

        if self.config.strict {
            return Err(error_at(open.pos, "unterminated code"));
        }

        self.rewind(consumed);
        self.degrade(open.pos, "unterminated code");
        Ok(Elem::text(open.text))
    }

    /// `<url>`
    fn parse_plain_link(&mut self, open: Token<'a>) -> Elem {
        let first = self.next();
        if !(first.is(TokenKind::Word) && looks_like_url(first.text)) {
            self.push(first);
            return Elem::text(open.text);
        }

        let mut consumed = vec![first];
        let mut target = first.text.to_string();
        loop {
            let tok = self.next();
            consumed.push(tok);
            match tok.kind {
                TokenKind::RAngle => return Link::new("", target, LinkKind::Plain).into(),
                k if is_url_token(k) => target.push_str(tok.text),
                _ => {
                    self.rewind(consumed);
                    self.degrade(open.pos, "unterminated link");
                    return Elem::text(open.text);
                }
            }
        }
    }

    /// `![text](url)`
    fn parse_media_link(&mut self, bang: Token<'a>) -> Elem {
        let open = self.next();
        if !open.is(TokenKind::LBracket) {
            self.push(open);
            return Elem::text(bang.text);
        }

        match self.parse_link(open, LinkKind::Media) {
            link @ Elem::Link(_) => link,
            _ => Elem::text(format!("{}{}", bang.text, open.text)),
        }
    }

    /// `[text](url)`, `open` being the `[`.
    fn parse_link(&mut self, open: Token<'a>, kind: LinkKind) -> Elem {
        let mut consumed = Vec::new();
        let mut text = String::new();
        let mut target = String::new();
        let mut depth = 0usize;
        let mut in_target = false;

        let complete = loop {
            let tok = self.next();
            consumed.push(tok);
            if !in_target {
                match tok.kind {
                    TokenKind::RBracket => {
                        let paren = self.next();
                        consumed.push(paren);
                        if !paren.is(TokenKind::LParen) {
                            break false;
                        }
                        in_target = true;
                    }
                    TokenKind::LBracket
                    | TokenKind::Newline
                    | TokenKind::LineSep
                    | TokenKind::Eof => break false,
                    _ => text.push_str(tok.text),
                }
                continue;
            }

            match tok.kind {
                TokenKind::RParen if depth == 0 => break !target.is_empty(),
                TokenKind::RParen => {
                    depth -= 1;
                    target.push_str(tok.text);
                }
                TokenKind::LParen => {
                    depth += 1;
                    target.push_str(tok.text);
                }
                k if is_url_token(k) => target.push_str(tok.text),
                _ => break false,
            }
        };

        if complete {
            return Link::new(text, target, kind).into();
        }

        self.rewind(consumed);
        self.degrade(open.pos, "unterminated link");
        Elem::text(open.text)
    }

    /// A bare URL, running to the next whitespace or unbalanced `)`.
    fn parse_naked_link(&mut self, word: Token<'a>) -> Elem {
        let mut target = word.text.to_string();
        let mut depth = 0usize;

        loop {
            let tok = self.next();
            match tok.kind {
                TokenKind::LParen => {
                    depth += 1;
                    target.push_str(tok.text);
                }
                TokenKind::RParen if depth > 0 => {
                    depth -= 1;
                    target.push_str(tok.text);
                }
                TokenKind::Word | TokenKind::At | TokenKind::Hash | TokenKind::Bang => {
                    target.push_str(tok.text);
                }
                _ => {
                    self.push(tok);
                    break;
                }
            }
        }

        Link::new("", target, LinkKind::Naked).into()
    }
}

fn error_at(pos: Position, message: impl Into<String>) -> TwtError {
    TwtError::Parse {
        line: pos.line,
        column: pos.column,
        message: message.into(),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Tokens that may appear inside a URL between brackets.
fn is_url_token(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Word
            | TokenKind::At
            | TokenKind::Hash
            | TokenKind::Bang
            | TokenKind::LBracket
            | TokenKind::RBracket
    )
}

/// `scheme://rest`, scheme starting with a letter.
pub fn looks_like_url(s: &str) -> bool {
    match s.split_once("://") {
        Some((scheme, rest)) => {
            !rest.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Parse one record line with the default configuration.
pub fn parse_line(line: &str, twter: &Twter) -> Result<Twt> {
    parse_line_with(line, twter, &ParserConfig::default())
}

pub fn parse_line_with(line: &str, twter: &Twter, config: &ParserConfig) -> Result<Twt> {
    let line = line.trim_end_matches(['\n', '\r']);
    Parser::new(line, config.clone()).parse_twt(twter)
}

/// Parse a free-text fragment, e.g. the `text` field of a JSON twt.
/// Never fails: malformed markup is kept as text.
pub fn parse_text(text: &str) -> Vec<Elem> {
    let config = ParserConfig {
        strict: false,
        ..Default::default()
    };
    // Only strict mode can fail.
    Parser::fragment(text, config)
        .parse_elems()
        .unwrap_or_else(|_| vec![Elem::text(text)])
}

pub fn parse_text_with(text: &str, config: &ParserConfig) -> Result<Vec<Elem>> {
    Parser::fragment(text, config.clone()).parse_elems()
}

/// Parse a whole feed with the default configuration.
pub fn parse_file(reader: impl BufRead, twter: &Twter) -> Result<(TwtFile, Vec<Diagnostic>)> {
    parse_file_with(reader, twter, &ParserConfig::default())
}

/// Parse a whole feed. Lines starting with `#` are metadata, other
/// non-empty lines are records. A record that fails to parse is dropped
/// and reported in the returned diagnostics; only read errors fail the
/// whole parse.
pub fn parse_file_with(
    mut reader: impl BufRead,
    twter: &Twter,
    config: &ParserConfig,
) -> Result<(TwtFile, Vec<Diagnostic>)> {
    let mut info = Comments::new();
    let mut twts = Vec::new();
    let mut diagnostics = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        let raw = String::from_utf8_lossy(&buf);
        let line = raw.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }

        if line.trim_start().starts_with('#') {
            let comment = Comment::parse(line);
            if !comment.key().is_empty() {
                tracing::debug!("Metadata {} = {}", comment.key(), comment.value());
            }
            info.push(comment);
            continue;
        }

        let mut parser = Parser::new(line, config.clone()).with_line(line_no);
        match parser.parse_twt(twter) {
            Ok(twt) => {
                twts.push(twt);
                diagnostics.extend(parser.into_diagnostics());
            }
            Err(e) => {
                tracing::debug!("Dropping line {} of {}: {}", line_no, twter.url, e);
                let (line, column, message) = match e {
                    TwtError::Parse {
                        line,
                        column,
                        message,
                    } => (line, column, message),
                    other => (line_no, 1, other.to_string()),
                };
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::DroppedLine,
                    line,
                    column,
                    message,
                });
            }
        }
    }

    Ok((TwtFile::new(twter.clone(), info, Twts(twts)), diagnostics))
}
