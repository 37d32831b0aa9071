//! Route pattern matching.
//!
//! # Rules
//! - Segments are split on `/`; empty segments are ignored, so trailing
//!   slashes do not matter
//! - `{name}` matches any single segment and captures it as `name`
//! - Literal segments are case-sensitive
//! - When several patterns match, the one with the most literal segments
//!   wins; ties go to the first registered

use std::collections::HashMap;
use std::fmt;

use axum::http::Method;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Compiled path pattern such as `/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|segment| {
                match segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                {
                    Some(name) => Segment::Param(name.to_string()),
                    None => Segment::Literal(segment.to_string()),
                }
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Captured parameters if `path` matches, `None` otherwise.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let mut params = HashMap::new();
        let mut parts = split(path);

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }

        match parts.next() {
            Some(_) => None,
            None => Some(params),
        }
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Literal(_)))
            .count()
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// `METHOD:pattern` key, e.g. `DELETE:/users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteKey {
    pub method: Method,
    pub pattern: RoutePattern,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.method, self.pattern.as_str())
    }
}

/// Result of a successful table lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    pub key: &'a RouteKey,
    pub value: &'a T,
    pub params: HashMap<String, String>,
}

/// Method + pattern table. Immutable once built, so lookups need no locking.
#[derive(Debug)]
pub struct RouteTable<T> {
    entries: Vec<(RouteKey, T)>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, method: Method, pattern: &str, value: T) {
        let key = RouteKey {
            method,
            pattern: RoutePattern::parse(pattern),
        };
        self.entries.push((key, value));
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        let mut best: Option<(usize, RouteMatch<'_, T>)> = None;

        for (key, value) in &self.entries {
            if key.method != *method {
                continue;
            }
            let Some(params) = key.pattern.matches(path) else {
                continue;
            };
            let score = key.pattern.literal_count();
            if best.as_ref().is_none_or(|(best_score, _)| score > *best_score) {
                best = Some((score, RouteMatch { key, value, params }));
            }
        }

        best.map(|(_, found)| found)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
