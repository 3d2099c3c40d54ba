use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use chrono::{Duration, Utc};

use crate::ast::{Link, Mention, Subject, Tag};
use crate::domain::Twt;

/// A list of twts, usually shown newest first.
#[derive(Debug, Clone, Default)]
pub struct Twts(pub Vec<Twt>);

impl Twts {
    pub fn sort_newest_first(&mut self) {
        self.0.sort_by_key(|t| std::cmp::Reverse(t.created()));
    }

    pub fn tags(&self) -> Vec<&Tag> {
        self.0.iter().flat_map(|t| t.tags()).collect()
    }

    pub fn mentions(&self) -> Vec<&Mention> {
        self.0.iter().flat_map(|t| t.mentions()).collect()
    }

    pub fn links(&self) -> Vec<&Link> {
        self.0.iter().flat_map(|t| t.links()).collect()
    }

    pub fn subjects(&self) -> Vec<&Subject> {
        self.0.iter().map(|t| t.subject()).collect()
    }

    /// Occurrences per tag text, or per target for tags without text.
    pub fn tag_count(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for tag in self.tags() {
            let key = if tag.text().is_empty() {
                tag.target()
            } else {
                tag.text()
            };
            *counts.entry(key.to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn mention_count(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for mention in self.mentions() {
            *counts.entry(mention.name().to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn link_count(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for link in self.links() {
            *counts.entry(link.literal()).or_insert(0) += 1;
        }
        counts
    }

    pub fn subject_count(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for subject in self.subjects() {
            *counts.entry(subject.text().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Split into the newest twts (at most `max`, none older than `ttl`) and
    /// everything else. Sorts newest first.
    pub fn split_at_age(mut self, ttl: Duration, max: usize) -> (Twts, Twts) {
        let cutoff = Utc::now() - ttl;
        self.sort_newest_first();

        let recent = self
            .0
            .iter()
            .take(max)
            .take_while(|t| t.created().with_timezone(&Utc) >= cutoff)
            .count();

        let rest = self.0.split_off(recent);
        (self, Twts(rest))
    }
}

impl Deref for Twts {
    type Target = Vec<Twt>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Twts {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<Twt>> for Twts {
    fn from(twts: Vec<Twt>) -> Self {
        Self(twts)
    }
}

impl FromIterator<Twt> for Twts {
    fn from_iter<I: IntoIterator<Item = Twt>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
