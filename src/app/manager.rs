use std::io::BufRead;

use chrono::{DateTime as ChronoDateTime, FixedOffset};

use crate::app::error::Result;
use crate::ast::DateTime;
use crate::codec;
use crate::config::ParserConfig;
use crate::domain::{Twt, TwtFile, Twter};
use crate::parser::{self, Diagnostic};

/// Entry points the host application uses to turn bytes into twts.
pub trait TwtManager {
    fn decode_json(&self, data: &[u8]) -> Result<Twt>;
    fn parse_line(&self, line: &str, twter: &Twter) -> Result<Twt>;
    fn parse_file(
        &self,
        reader: &mut dyn BufRead,
        twter: &Twter,
    ) -> Result<(TwtFile, Vec<Diagnostic>)>;
    /// A freshly authored twt from free text.
    fn make_twt(
        &self,
        twter: Twter,
        created: ChronoDateTime<FixedOffset>,
        text: &str,
    ) -> Result<Twt>;
}

/// [`TwtManager`] backed by this crate's lexer and parser.
#[derive(Debug, Clone, Default)]
pub struct LexTwtManager {
    config: ParserConfig,
}

impl LexTwtManager {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }
}

impl TwtManager for LexTwtManager {
    fn decode_json(&self, data: &[u8]) -> Result<Twt> {
        codec::decode_json(data)
    }

    fn parse_line(&self, line: &str, twter: &Twter) -> Result<Twt> {
        parser::parse_line_with(line, twter, &self.config)
    }

    fn parse_file(
        &self,
        reader: &mut dyn BufRead,
        twter: &Twter,
    ) -> Result<(TwtFile, Vec<Diagnostic>)> {
        parser::parse_file_with(reader, twter, &self.config)
    }

    fn make_twt(
        &self,
        twter: Twter,
        created: ChronoDateTime<FixedOffset>,
        text: &str,
    ) -> Result<Twt> {
        let elems = parser::parse_text_with(text, &self.config)?;
        Ok(Twt::new(twter, DateTime::new(created, ""), elems))
    }
}
