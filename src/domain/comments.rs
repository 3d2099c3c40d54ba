use std::fmt;

use super::Twter;

/// One `#`-prefixed header line, optionally carrying a `key = value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    comment: String,
    key: String,
    value: String,
}

impl Comment {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            key: String::new(),
            value: String::new(),
        }
    }

    pub fn with_value(
        comment: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            comment: comment.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse the text of a comment line, splitting `# key = value` on the
    /// first `=`. Keys never contain whitespace.
    pub fn parse(line: &str) -> Self {
        let body = line.trim_start().trim_start_matches('#');
        if let Some((key, value)) = body.split_once('=') {
            let key = key.trim();
            if !key.is_empty() && !key.contains(char::is_whitespace) {
                return Self::with_value(line, key, value.trim());
            }
        }
        Self::new(line)
    }

    pub fn literal(&self) -> String {
        format!("{}\n", self.comment)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Feed header metadata, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments(Vec<Comment>);

impl Comments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, comment: Comment) {
        self.0.push(comment);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Find an entry by exact key.
    ///
    /// `n == 0` and `n == 1` return the first match, `n > 1` the n-th match,
    /// and a negative `n` counts from the end (`-1` is the last match).
    pub fn get_n(&self, key: &str, n: isize) -> Option<&Comment> {
        let mut matches = Vec::new();

        for comment in &self.0 {
            if comment.key != key {
                continue;
            }
            if n == 0 {
                return Some(comment);
            }
            matches.push(comment);
            if n > 0 && matches.len() == n.unsigned_abs() {
                return Some(comment);
            }
        }

        if n < 0 {
            let idx = matches.len() as isize + n;
            if idx >= 0 {
                return matches.get(idx as usize).copied();
            }
        }

        None
    }

    /// Every key/value entry whose key starts with `prefix`.
    pub fn get_all(&self, prefix: &str) -> Vec<&Comment> {
        self.0
            .iter()
            .filter(|c| !c.key.is_empty() && c.key.starts_with(prefix))
            .collect()
    }

    /// Feeds listed as `# follow = <nick> <url>`.
    pub fn followers(&self) -> Vec<Twter> {
        self.get_all("follow")
            .into_iter()
            .filter_map(|c| {
                let fields: Vec<&str> = c.value.split_whitespace().collect();
                match fields.as_slice() {
                    [nick, url] => Some(Twter::new(*nick, *url)),
                    _ => None,
                }
            })
            .collect()
    }
}

impl fmt::Display for Comments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for comment in &self.0 {
            f.write_str(&comment.literal())?;
        }
        Ok(())
    }
}

impl FromIterator<Comment> for Comments {
    fn from_iter<I: IntoIterator<Item = Comment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
