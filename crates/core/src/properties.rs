//! Process-wide properties used when resolving placeholders in descriptors.
//!
//! These play the role of `-Dname=value` build arguments. Lookups for `env.NAME`
//! fall through to the process environment.

use std::collections::BTreeMap;
use std::env;
use std::fmt;

const ENV_PREFIX: &str = "env.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemProperties {
    values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyParseError(pub String);

impl fmt::Display for PropertyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid property definition '{}', expected NAME=VALUE", self.0)
    }
}

impl std::error::Error for PropertyParseError {}

impl SystemProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    /// Looks a property up, consulting the process environment for `env.*` names
    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        name.strip_prefix(ENV_PREFIX)
            .and_then(|var| env::var(var).ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parses a `NAME=VALUE` definition. A bare `NAME` defines the property as `true`.
    pub fn parse_definition(definition: &str) -> Result<(String, String), PropertyParseError> {
        let (name, value) = match definition.split_once('=') {
            Some((name, value)) => (name.trim(), value),
            None => (definition.trim(), "true"),
        };
        if name.is_empty() {
            return Err(PropertyParseError(definition.to_string()));
        }
        Ok((name.to_string(), value.to_string()))
    }

    /// Builds properties from a list of `NAME=VALUE` definitions
    pub fn from_definitions<I, S>(definitions: I) -> Result<Self, PropertyParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut props = Self::new();
        for definition in definitions {
            let (name, value) = Self::parse_definition(definition.as_ref())?;
            props.set(name, value);
        }
        Ok(props)
    }
}

impl FromIterator<(String, String)> for SystemProperties {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
