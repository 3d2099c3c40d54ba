use chrono::{DateTime as ChronoDateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::app::{Result, TwtError};
use crate::ast::{DateTime, TextFormat};
use crate::domain::{Twt, Twter};
use crate::parser::parse_text;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TwtOut<'a> {
    twter: &'a Twter,
    text: String,
    created: String,
    markdown_text: String,
    hash: &'a str,
    tags: Vec<&'a str>,
    subject: String,
}

#[derive(Deserialize)]
struct TwtIn {
    #[serde(default)]
    twter: Twter,
    text: String,
    created: ChronoDateTime<FixedOffset>,
    #[serde(default)]
    hash: String,
}

impl Serialize for Twt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        TwtOut {
            twter: self.twter(),
            text: self.text(),
            created: crate::ast::rfc3339(&self.created()),
            markdown_text: self.format_text(TextFormat::Markdown, None),
            hash: self.hash(),
            tags: self.tags().map(|t| t.text()).collect(),
            subject: self.subject().to_string(),
        }
        .serialize(serializer)
    }
}

/// Rebuilds the elements by parsing `text` again and keeps the payload's hash.
impl<'de> Deserialize<'de> for Twt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let payload = TwtIn::deserialize(deserializer)?;
        let created = DateTime::new(payload.created, "");
        Ok(Twt::new(payload.twter, created, parse_text(&payload.text)).with_hash(payload.hash))
    }
}

pub fn encode_json(twt: &Twt) -> Result<String> {
    Ok(serde_json::to_string(twt)?)
}

pub fn decode_json(data: &[u8]) -> Result<Twt> {
    serde_json::from_slice(data).map_err(|e| TwtError::Decode(format!("invalid twt JSON: {e}")))
}
