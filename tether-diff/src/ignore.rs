use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tether_types::{PathSegment, PropertyMap, PropertyPath, PropertyValue};

/// A destination path pattern whose changes are not reported.
///
/// `*` segments match every index or key. Wildcards are expanded against the
/// prior tree only, so an element that exists only in the proposed tree is
/// never covered by a wildcard and its addition is still reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnorePath(PropertyPath);

impl IgnorePath {
    #[must_use]
    pub fn new(path: PropertyPath) -> Self {
        Self(path)
    }

    pub fn parse(input: &str) -> Result<Self> {
        Ok(Self(PropertyPath::parse(input)?))
    }

    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.0
    }

    /// Concrete paths covered by this pattern in `prior`.
    ///
    /// Key and index segments are kept even when `prior` has nothing there.
    #[must_use]
    pub fn expand(&self, prior: &PropertyMap) -> Vec<PropertyPath> {
        let mut out = Vec::new();
        let Some((first, rest)) = self.0.segments().split_first() else {
            return out;
        };
        match first {
            PathSegment::Key(key) => expand_into(rest, prior.get(key), PropertyPath::root(key.as_str()), &mut out),
            PathSegment::Wildcard => {
                for (key, value) in prior {
                    expand_into(rest, Some(value), PropertyPath::root(key.as_str()), &mut out);
                }
            }
            PathSegment::Index(_) => {}
        }
        out
    }
}

fn expand_into(
    segments: &[PathSegment],
    value: Option<&PropertyValue>,
    prefix: PropertyPath,
    out: &mut Vec<PropertyPath>,
) {
    let Some((first, rest)) = segments.split_first() else {
        out.push(prefix);
        return;
    };
    let value = value.map(unwrap);
    match first {
        PathSegment::Wildcard => match value {
            Some(PropertyValue::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    expand_into(rest, Some(item), prefix.index(i), out);
                }
            }
            Some(PropertyValue::Object(map)) => {
                for (key, item) in map {
                    expand_into(rest, Some(item), prefix.key(key.as_str()), out);
                }
            }
            _ => {}
        },
        PathSegment::Key(key) => {
            let child = value.and_then(PropertyValue::as_object).and_then(|map| map.get(key));
            expand_into(rest, child, prefix.key(key.as_str()), out);
        }
        PathSegment::Index(i) => {
            let child = value.and_then(PropertyValue::as_array).and_then(|items| items.get(*i));
            expand_into(rest, child, prefix.index(*i), out);
        }
    }
}

fn unwrap(value: &PropertyValue) -> &PropertyValue {
    match value {
        PropertyValue::Secret(inner) => unwrap(inner),
        PropertyValue::Output(out) if out.known => unwrap(&out.element),
        other => other,
    }
}

impl fmt::Display for IgnorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for IgnorePath {
    type Err = crate::DiffError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
