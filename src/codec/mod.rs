//! Serialized forms of a [`Twt`](crate::domain::Twt).
//!
//! Both codecs carry the hash as data: a decoded twt keeps the hash it was
//! stored with instead of computing it again.

pub mod json;
pub mod record;

pub use json::{decode_json, encode_json};
pub use record::{decode_record, encode_record};
