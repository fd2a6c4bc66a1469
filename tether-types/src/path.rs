//! Property paths such as `items[2].weight` or `tags["kubernetes.io/name"]`.
//!
//! Paths address values inside a property tree. A segment is a map key, a
//! sequence index, or the wildcard `*` (only meaningful in ignore rules, where
//! it is expanded against concrete trees before matching).

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One step of a [`PropertyPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// A dotted/bracketed address into a property tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath(Vec<PathSegment>);

impl PropertyPath {
    /// The empty path, addressing the root of a tree.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// A path with a single top-level key.
    pub fn root(key: impl Into<String>) -> Self {
        Self(vec![PathSegment::Key(key.into())])
    }

    #[must_use]
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Returns a new path extended by a map key.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.with(PathSegment::Key(key.into()))
    }

    /// Returns a new path extended by a sequence index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.with(PathSegment::Index(index))
    }

    /// Returns a new path extended by a wildcard.
    #[must_use]
    pub fn wildcard(&self) -> Self {
        self.with(PathSegment::Wildcard)
    }

    /// Returns a new path extended by an arbitrary segment.
    #[must_use]
    pub fn with(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// The path without its last segment, or `None` for the empty path.
    pub fn parent(&self) -> Option<PropertyPath> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// The top-level key of this path, if it starts with one.
    pub fn top_level_key(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// True when `prefix` addresses this path or one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &PropertyPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.0.iter().any(|s| matches!(s, PathSegment::Wildcard))
    }

    /// Parses a path, returning an error describing the first malformed segment.
    pub fn parse(input: &str) -> Result<Self> {
        Parser::new(input).parse()
    }
}

fn is_simple_key(key: &str) -> bool {
    !key.is_empty()
        && key != "*"
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '$')
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if is_simple_key(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                PathSegment::Key(key) => {
                    let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "[\"{escaped}\"]")?;
                }
                PathSegment::Index(index) => write!(f, "[{index}]")?,
                PathSegment::Wildcard if i == 0 => f.write_str("*")?,
                PathSegment::Wildcard => f.write_str("[*]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for PropertyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for PropertyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PropertyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PropertyPath::parse(&s).map_err(serde::de::Error::custom)
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    segments: Vec<PathSegment>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            segments: Vec::new(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::InvalidPath {
            path: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn parse(mut self) -> Result<PropertyPath> {
        if self.input.is_empty() {
            return Ok(PropertyPath::new());
        }
        if self.chars.peek().map(|(_, c)| *c) != Some('[') {
            self.parse_key()?;
        }
        while let Some((_, c)) = self.chars.next() {
            match c {
                '.' => self.parse_key()?,
                '[' => self.parse_bracket()?,
                other => return Err(self.error(format!("unexpected character {other:?}"))),
            }
        }
        Ok(PropertyPath(self.segments))
    }

    fn parse_key(&mut self) -> Result<()> {
        let mut key = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '.' || c == '[' {
                break;
            }
            key.push(c);
            self.chars.next();
        }
        if key.is_empty() {
            return Err(self.error("empty key segment"));
        }
        if key == "*" {
            self.segments.push(PathSegment::Wildcard);
        } else {
            self.segments.push(PathSegment::Key(key));
        }
        Ok(())
    }

    fn parse_bracket(&mut self) -> Result<()> {
        match self.chars.peek().map(|(_, c)| *c) {
            Some('"') => {
                self.chars.next();
                let mut key = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, '\\')) => match self.chars.next() {
                            Some((_, escaped)) => key.push(escaped),
                            None => return Err(self.error("unterminated escape")),
                        },
                        Some((_, '"')) => break,
                        Some((_, c)) => key.push(c),
                        None => return Err(self.error("unterminated quoted key")),
                    }
                }
                self.expect_close()?;
                self.segments.push(PathSegment::Key(key));
            }
            Some('*') => {
                self.chars.next();
                self.expect_close()?;
                self.segments.push(PathSegment::Wildcard);
            }
            Some(_) => {
                let mut digits = String::new();
                while let Some(&(_, c)) = self.chars.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    digits.push(c);
                    self.chars.next();
                }
                let index = digits
                    .parse::<usize>()
                    .map_err(|_| self.error("expected an index, `*`, or a quoted key"))?;
                self.expect_close()?;
                self.segments.push(PathSegment::Index(index));
            }
            None => return Err(self.error("unterminated bracket")),
        }
        Ok(())
    }

    fn expect_close(&mut self) -> Result<()> {
        match self.chars.next() {
            Some((_, ']')) => Ok(()),
            _ => Err(self.error("expected `]`")),
        }
    }
}
