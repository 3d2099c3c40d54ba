use crate::app::{Result, TwtError};
use crate::domain::{Twt, Twter};
use crate::parser::parse_line;

/// `nick<TAB>url<TAB>avatar<TAB>hash<TAB>record line`
pub fn encode_record(twt: &Twt) -> Vec<u8> {
    let twter = twt.twter();
    format!(
        "{}\t{}\t{}\t{}\t{}",
        twter.nick,
        twter.url,
        twter.avatar,
        twt.hash(),
        twt.literal()
    )
    .into_bytes()
}

pub fn decode_record(data: &[u8]) -> Result<Twt> {
    let data = std::str::from_utf8(data)
        .map_err(|e| TwtError::Decode(format!("twt record is not UTF-8: {e}")))?;

    let fields: Vec<&str> = data.splitn(5, '\t').collect();
    let [nick, url, avatar, hash, line] = fields[..] else {
        return Err(TwtError::Decode(format!(
            "twt record has {} fields, expected 5",
            fields.len()
        )));
    };

    let twter = Twter {
        avatar: avatar.to_string(),
        ..Twter::new(nick, url)
    };
    Ok(parse_line(line, &twter)?.with_hash(hash))
}
