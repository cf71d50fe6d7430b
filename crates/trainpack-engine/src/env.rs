//! Environment loading and validation.
//!
//! The engine takes the required variable set as data: the embedding
//! binary describes its environment with an [`EnvSpec`] and the loader
//! checks everything eagerly, before any stage work begins. Variables
//! flagged validate-only are checked for presence but never returned.

use std::collections::BTreeMap;

use crate::errors::EnvError;

/// How one environment variable is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvUsage {
    /// Required; its value is returned to the caller.
    Downstream,
    /// Required; presence is checked but the value is not returned.
    ValidateOnly,
    /// Returned when present, never an error when absent.
    Optional,
}

/// Declarative description of a process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSpec {
    prefix: String,
    vars: Vec<(String, EnvUsage)>,
}

impl EnvSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix` to every variable name at lookup time.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Required variable whose value is needed by the pipeline.
    #[must_use]
    pub fn downstream(mut self, name: &str) -> Self {
        self.vars.push((name.to_string(), EnvUsage::Downstream));
        self
    }

    /// Required variable that only needs to exist (e.g. credentials read
    /// directly by a collaborator's own SDK).
    #[must_use]
    pub fn validate_only(mut self, name: &str) -> Self {
        self.vars.push((name.to_string(), EnvUsage::ValidateOnly));
        self
    }

    /// Variable that may be absent.
    #[must_use]
    pub fn optional(mut self, name: &str) -> Self {
        self.vars.push((name.to_string(), EnvUsage::Optional));
        self
    }

    /// Read the process environment against this spec.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvError`] naming every missing required variable in
    /// one message.
    pub fn load(&self) -> Result<EnvVars, EnvError> {
        let mut values = BTreeMap::new();
        let mut missing = Vec::new();

        for (name, usage) in &self.vars {
            let key = format!("{}{}", self.prefix, name);
            match std::env::var(&key) {
                Ok(value) => {
                    if *usage != EnvUsage::ValidateOnly {
                        values.insert(name.to_lowercase(), value);
                    }
                }
                Err(_) => {
                    if *usage != EnvUsage::Optional {
                        missing.push(key);
                    }
                }
            }
        }

        if missing.is_empty() {
            Ok(EnvVars(values))
        } else {
            Err(EnvError(missing))
        }
    }
}

/// Validated environment values, keyed by normalized (lower-case) name.
/// Read-only for the lifetime of the run.
#[derive(Debug, Clone)]
pub struct EnvVars(BTreeMap<String, String>);

impl EnvVars {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Value of a variable the spec declared downstream.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvError`] if the name was never loaded. Required
    /// names fail at load time, so this flags a bad spec, not a bad
    /// operator environment.
    pub fn require(&self, name: &str) -> Result<&str, EnvError> {
        self.get(name)
            .ok_or_else(|| EnvError(vec![name.to_uppercase()]))
    }
}

/// Interpret a boolean-like flag value (`true`/`1`/`yes`, any case).
/// Absent or anything else is `false`.
pub fn flag_is_set(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true") | Some("1") | Some("yes")
    )
}
