//! Path templates - named path fragments and placeholder resolution
//!
//! Values in a [`PathConfig`] may reference other entries with
//! `<%= path.name %>` tokens. Resolution is recursive and fails on unknown
//! names or reference cycles instead of looping.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors raised while resolving a path template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Unknown path reference '{name}' in '{template}'")]
    UnknownReference { name: String, template: String },

    #[error("Cyclic path reference: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },
}

/// Any `<%= ... %>` token, whatever its contents
fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<%=\s*(.*?)\s*%>").expect("token pattern is valid"))
}

/// The only token body that resolves: `path.<name>`
fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^path\.([A-Za-z_][A-Za-z0-9_\-]*)$").expect("reference pattern is valid")
    })
}

/// Named path fragments shared by every operation of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathConfig {
    entries: BTreeMap<String, String>,
}

impl PathConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a raw (unresolved) entry
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Get the raw (unresolved) value of an entry
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return a copy with the given entries replaced or added
    pub fn with_overrides<'a, I>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        let mut config = self.clone();
        for (name, value) in overrides {
            config.insert(name.clone(), value.clone());
        }
        config
    }

    /// Resolve a template against this config
    pub fn resolve(&self, template: &str) -> Result<String, TemplateError> {
        resolve(template, self)
    }

    /// Resolve every entry, in name order
    pub fn resolve_all(&self) -> Result<BTreeMap<String, String>, TemplateError> {
        self.entries
            .keys()
            .map(|name| {
                let mut stack = Vec::new();
                resolve_name(name, self, &mut stack, name).map(|value| (name.clone(), value))
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathConfig {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Replace every `<%= path.name %>` token in `template` with the resolved
/// value of `name`
///
/// A token whose body is not a `path.` reference is reported as an
/// [`TemplateError::UnknownReference`] carrying the token text.
pub fn resolve(template: &str, config: &PathConfig) -> Result<String, TemplateError> {
    let mut stack = Vec::new();
    resolve_with_stack(template, config, &mut stack)
}

fn resolve_with_stack(
    template: &str,
    config: &PathConfig,
    stack: &mut Vec<String>,
) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut last = 0;

    for captures in token_pattern().captures_iter(template) {
        let (Some(token), Some(body)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let name = reference_pattern()
            .captures(body.as_str())
            .and_then(|reference| reference.get(1))
            .ok_or_else(|| TemplateError::UnknownReference {
                name: token.as_str().to_string(),
                template: template.to_string(),
            })?;
        output.push_str(&template[last..token.start()]);
        output.push_str(&resolve_name(name.as_str(), config, stack, template)?);
        last = token.end();
    }

    output.push_str(&template[last..]);
    Ok(output)
}

fn resolve_name(
    name: &str,
    config: &PathConfig,
    stack: &mut Vec<String>,
    template: &str,
) -> Result<String, TemplateError> {
    if let Some(start) = stack.iter().position(|entry| entry == name) {
        let mut chain = stack[start..].to_vec();
        chain.push(name.to_string());
        return Err(TemplateError::CyclicReference { chain });
    }

    let raw = config
        .get(name)
        .ok_or_else(|| TemplateError::UnknownReference {
            name: name.to_string(),
            template: template.to_string(),
        })?;

    stack.push(name.to_string());
    let value = resolve_with_stack(raw, config, stack);
    stack.pop();
    value
}
