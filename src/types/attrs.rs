use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::numeric;

/// Raw attribute map of a rule-document element, preserved verbatim.
///
/// Typed fields on [`RuleNode`](super::RuleNode) are parsed from this map once
/// at load time; the map itself is what predicates and error sinks see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    entries: BTreeMap<String, String>,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_owned(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value only when it is present and non-empty.
    #[must_use]
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Truthy test shared by every boolean attribute of the dialect.
    ///
    /// A value is truthy iff it is exactly `yes`, `1`, `true`, or the
    /// attribute's own name. Matching is case-sensitive.
    #[must_use]
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| is_truthy_value(key, v))
    }

    /// Integer attribute with a fallback for absent or unparsable values.
    /// Parses a leading integer prefix, so `"2px"` reads as 2.
    #[must_use]
    pub fn index_or(&self, key: &str, fallback: usize) -> usize {
        self.get(key)
            .and_then(numeric::parse_int_prefix)
            .and_then(|i| usize::try_from(i).ok())
            .unwrap_or(fallback)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub(crate) fn is_truthy_value(name: &str, value: &str) -> bool {
    value == name || matches!(value, "yes" | "1" | "true")
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.entries {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{k}=\"{v}\"")?;
            first = false;
        }
        Ok(())
    }
}

/// Read-only view over a rule's attributes handed to predicates and processors.
#[derive(Debug, Clone, Copy)]
pub struct RuleParams<'a> {
    attrs: &'a Attributes,
}

impl<'a> RuleParams<'a> {
    #[must_use]
    pub fn new(attrs: &'a Attributes) -> Self {
        Self { attrs }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.attrs.get(key)
    }

    /// Leading floating-point prefix of the attribute, `None` when absent or not numeric.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(numeric::parse_float_prefix)
    }

    /// Leading integer prefix of the attribute.
    #[must_use]
    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(numeric::parse_int_prefix)
    }

    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.attrs.is_truthy(key)
    }

    #[must_use]
    pub fn attributes(&self) -> &'a Attributes {
        self.attrs
    }
}
