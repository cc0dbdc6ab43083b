//! Query Parameters
//!
//! Client-supplied directives from the URL query string. Keys keep their
//! order of first appearance; a repeated key collects its values into a list.

/// Keys reserved for sort/projection/pagination control
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    /// The value used when a single directive is expected (last one wins)
    pub fn last(&self) -> &str {
        match self {
            Self::One(v) => v,
            Self::Many(vs) => vs.last().map(String::as_str).unwrap_or(""),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::One(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Many(vec![first, value]);
            }
            Self::Many(vs) => vs.push(value),
        }
    }
}

/// Ordered mapping of query parameter keys to values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw (percent-encoded) query string, without the leading `?`
    pub fn parse(raw: &str) -> Self {
        let mut params = Self::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key.is_empty() {
                continue;
            }
            params.append(key.into_owned(), value.into_owned());
        }
        params
    }

    /// Add a value, turning an existing key into a list
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.push(value),
            None => self.entries.push((key, QueryValue::One(value))),
        }
    }

    /// Set a key to a single value, replacing anything already there
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = QueryValue::One(value.into());
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The single-valued form of a key (last value wins)
    pub fn get_last(&self, key: &str) -> Option<&str> {
        self.get(key).map(QueryValue::last)
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy without the reserved control keys, bracketed forms such as
    /// `limit[gte]` included
    pub fn without_reserved(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| !is_reserved(k))
                .cloned()
                .collect(),
        }
    }
}

fn is_reserved(key: &str) -> bool {
    let name = key.split('[').next().unwrap_or(key);
    RESERVED_KEYS.contains(&name)
}
