use crate::domain::{Comments, Twter, Twts};

/// A parsed feed: its author, header metadata and records.
#[derive(Debug, Clone, Default)]
pub struct TwtFile {
    twter: Twter,
    info: Comments,
    twts: Twts,
}

impl TwtFile {
    pub fn new(twter: Twter, info: Comments, twts: Twts) -> Self {
        Self { twter, info, twts }
    }

    pub fn twter(&self) -> &Twter {
        &self.twter
    }

    pub fn info(&self) -> &Comments {
        &self.info
    }

    pub fn twts(&self) -> &Twts {
        &self.twts
    }

    pub fn into_twts(self) -> Twts {
        self.twts
    }
}
