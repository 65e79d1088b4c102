//! Distinguished name utilities for directory entries.
//!
//! The engine addresses every entry through a DN assembled from a naming
//! attribute and a fixed container (`uid=<name>,ou=People,...` for users,
//! `cn=<name>,ou=Group,...` for groups). Parsing is strict so malformed
//! DNs surface early, and value escaping is handled when composing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use posixdir_core::Error as CoreError;

/// Errors that can occur when parsing a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component did not have the `attribute=value` shape.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DnError> for CoreError {
    fn from(err: DnError) -> Self {
        CoreError::Config(err.to_string())
    }
}

/// A single `attribute=value` naming component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rdn {
    attribute: String,
    value: String,
}

impl Rdn {
    /// Create a new relative distinguished name.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Attribute portion of the RDN (e.g. `uid`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Attribute value portion of the RDN.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Strongly-typed distinguished name.
///
/// Keeps a canonical string representation alongside the parsed naming
/// components, so entry DNs can be composed from an RDN and a container
/// without hand-formatting (and without forgetting to escape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<Rdn>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DnError`] if the input is empty or a component is not an
    /// `attribute=value` pair.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DnError> {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            return Err(DnError::Empty);
        }

        let mut rdns = Vec::new();
        for component in split_escaped(raw, ',')? {
            let (attribute, value) = split_attribute_value(&component)?;
            rdns.push(Rdn::new(attribute, value));
        }

        Ok(Self {
            raw: rdns_to_string(&rdns),
            rdns,
        })
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the naming components in order, most specific first.
    #[must_use]
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Looks up the value for the first matching attribute (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.rdns
            .iter()
            .find(|rdn| rdn.attribute.eq_ignore_ascii_case(attribute))
            .map(Rdn::value)
    }

    /// Creates a new distinguished name by prefixing the provided RDN.
    ///
    /// This is how entry DNs are built from a naming attribute and a
    /// container base.
    #[must_use]
    pub fn child(&self, rdn: Rdn) -> Self {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Self {
            raw: rdns_to_string(&rdns),
            rdns,
        }
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DnError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DistinguishedName> for String {
    fn from(value: DistinguishedName) -> Self {
        value.raw
    }
}

fn split_escaped(input: &str, delimiter: char) -> std::result::Result<Vec<String>, DnError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push(ch);
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == delimiter {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }

    if escape {
        return Err(DnError::UnterminatedEscape);
    }

    parts.push(current.trim().to_string());
    if parts.iter().any(String::is_empty) {
        return Err(DnError::InvalidComponent(input.to_string()));
    }
    Ok(parts)
}

fn split_attribute_value(component: &str) -> std::result::Result<(String, String), DnError> {
    let idx = component
        .find('=')
        .ok_or_else(|| DnError::InvalidComponent(component.to_string()))?;
    let attribute = component[..idx].trim();
    let value = component[idx + 1..].trim_start();

    if attribute.is_empty() || value.is_empty() {
        return Err(DnError::InvalidComponent(component.to_string()));
    }

    Ok((attribute.to_string(), value.to_string()))
}

fn escape_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in chars.iter().enumerate() {
        let is_first = idx == 0;
        let is_last = idx == chars.len() - 1;
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (is_first && (*ch == ' ' || *ch == '#'))
            || (is_last && *ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(*ch);
    }

    escaped
}

fn rdns_to_string(rdns: &[Rdn]) -> String {
    rdns.iter()
        .map(|rdn| format!("{}={}", rdn.attribute(), escape_value(rdn.value())))
        .collect::<Vec<_>>()
        .join(",")
}
