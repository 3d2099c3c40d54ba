//! Tokenizer for twtxt lines.
//!
//! Every byte of the input lands in exactly one token, so concatenating the
//! token texts gives the input back. The lexer never fails: characters with
//! no special meaning are grouped into [`TokenKind::Word`] runs and all
//! rejection is left to the parser.
//!
//! ```text
//! 2024-01-01T00:00:00Z\t@<bob https://b.example/twtxt.txt> hi #rust
//! DateTime Tab At LAngle Word Space Word RAngle Space Word Space Hash Word
//! ```

use std::iter::Peekable;
use std::str::CharIndices;

/// Paragraph break kept inside a single physical line.
pub const LINE_SEPARATOR: char = '\u{2028}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Timestamp-shaped run at the start of a record line, up to the first tab.
    DateTime,
    Tab,
    At,
    Hash,
    LParen,
    RParen,
    LAngle,
    RAngle,
    LBracket,
    RBracket,
    Bang,
    /// One, two or three backticks. Longer runs are split into several tokens.
    Backtick,
    Word,
    Space,
    Newline,
    LineSep,
    Eof,
}

/// Location of a token in the input. Lines and columns start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub pos: Position,
}

impl<'a> Token<'a> {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    pos: Position,
    /// Record mode: a newline starts a new record and may be followed by a timestamp.
    records: bool,
    line_start: bool,
}

impl<'a> Lexer<'a> {
    /// Lexer for feed lines. A digit at the start of a line begins a timestamp.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            pos: Position::default(),
            records: true,
            line_start: true,
        }
    }

    /// Lexer for a free-form text fragment, such as the `text` field of a
    /// decoded twt. The fragment behaves as if a space had been injected in
    /// front of it: its first character is never taken as a line start, and
    /// newlines inside it do not start new records.
    pub fn fragment(input: &'a str) -> Self {
        Self {
            records: false,
            line_start: false,
            ..Self::new(input)
        }
    }

    /// Start numbering lines at `line`, used when lexing one line of a file.
    pub fn with_line(mut self, line: usize) -> Self {
        self.pos.line = line;
        self
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn next_token(&mut self) -> Token<'a> {
        let pos = self.pos;
        let Some(&(start, c)) = self.chars.peek() else {
            return Token {
                kind: TokenKind::Eof,
                text: "",
                pos,
            };
        };

        let at_line_start = std::mem::replace(&mut self.line_start, false);

        let kind = match c {
            '\n' => {
                self.bump();
                self.line_start = self.records;
                TokenKind::Newline
            }
            LINE_SEPARATOR => {
                self.bump();
                TokenKind::LineSep
            }
            '\t' => {
                self.bump();
                TokenKind::Tab
            }
            c if at_line_start && c.is_ascii_digit() => {
                self.eat_while(|c| !matches!(c, '\t' | '\n'));
                TokenKind::DateTime
            }
            c if is_space(c) => {
                self.eat_while(is_space);
                // Leading indentation does not end the line start.
                self.line_start = at_line_start;
                TokenKind::Space
            }
            '`' => {
                self.bump();
                for _ in 0..2 {
                    if self.peek() != Some('`') {
                        break;
                    }
                    self.bump();
                }
                TokenKind::Backtick
            }
            '@' => self.single(TokenKind::At),
            '#' => self.single(TokenKind::Hash),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '<' => self.single(TokenKind::LAngle),
            '>' => self.single(TokenKind::RAngle),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '!' => self.single(TokenKind::Bang),
            _ => {
                self.eat_while(|c| !is_delimiter(c));
                TokenKind::Word
            }
        };

        Token {
            kind,
            text: &self.input[start..self.pos.offset],
            pos,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn bump(&mut self) {
        if let Some((_, c)) = self.chars.next() {
            self.pos.offset += c.len_utf8();
            if c == '\n' {
                self.pos.line += 1;
                self.pos.column = 1;
            } else {
                self.pos.column += 1;
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}

fn is_space(c: char) -> bool {
    c.is_whitespace() && !matches!(c, '\n' | '\t' | LINE_SEPARATOR)
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '@' | '#' | '(' | ')' | '<' | '>' | '[' | ']' | '!' | '`'
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_record_line_tokens() {
        let line = "2024-01-01T00:00:00Z\t@<bob https://b.example/twtxt.txt> hi #rust\n";
        assert_eq!(
            kinds(line),
            vec![
                DateTime, Tab, At, LAngle, Word, Space, Word, RAngle, Space, Word, Space, Hash,
                Word, Newline
            ]
        );
    }

    #[test]
    fn test_lossless() {
        let line = "2024-01-01T00:00:00Z\t(#abc) see ![img](https://x.example/a.png) `x` ```y```\u{2028}bye!";
        let rebuilt: String = Lexer::new(line).map(|t| t.text).collect();
        assert_eq!(rebuilt, line);
    }

    #[test]
    fn test_datetime_only_at_line_start() {
        assert_eq!(kinds("2024 apples"), vec![DateTime]);
        assert_eq!(kinds("x 2024"), vec![Word, Space, Word]);
        assert_eq!(kinds("a\n2024\tb"), vec![Word, Newline, DateTime, Tab, Word]);
    }

    #[test]
    fn test_indented_datetime() {
        assert_eq!(kinds("  2024-01-01\tx"), vec![Space, DateTime, Tab, Word]);
    }

    #[test]
    fn test_fragment_never_starts_a_record() {
        let kinds: Vec<_> = Lexer::fragment("2024 is\n42").map(|t| t.kind).collect();
        assert_eq!(kinds, vec![Word, Space, Word, Newline, Word]);
    }

    #[test]
    fn test_backtick_runs() {
        let texts: Vec<_> = Lexer::fragment("````a``").map(|t| (t.kind, t.text)).collect();
        assert_eq!(
            texts,
            vec![(Backtick, "```"), (Backtick, "`"), (Word, "a"), (Backtick, "``")]
        );
    }

    #[test]
    fn test_line_separator_token() {
        assert_eq!(
            Lexer::fragment("a\u{2028}b").map(|t| t.kind).collect::<Vec<_>>(),
            vec![Word, LineSep, Word]
        );
    }

    #[test]
    fn test_positions() {
        let tokens: Vec<_> = Lexer::fragment("ab\ncd").with_line(7).collect();
        assert_eq!(tokens[0].pos, Position { offset: 0, line: 7, column: 1 });
        assert_eq!(tokens[2].pos, Position { offset: 3, line: 8, column: 1 });
    }

    #[test]
    fn test_eof_repeats() {
        let mut lexer = Lexer::new("");
        assert!(lexer.next_token().is(Eof));
        assert!(lexer.next_token().is(Eof));
    }
}
