//! Typed stage registry.
//!
//! The registry replaces runtime reflection: every function a training
//! config may reference is registered up front under an explicit module
//! path, so a dangling reference is a lookup failure with a message
//! instead of an import attempt.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::io::StageIo;

/// Value returned by a stage function. Only the eval stage's value is
/// inspected: `Some(false)` (or `None`, when evaluation gates the
/// upload) marks a failed evaluation.
pub type StageResult = Option<bool>;

/// A registered stage function. Stages receive their scoped IO and
/// report failure through the error channel; any error aborts the run.
pub type StageFn = Arc<dyn Fn(&mut StageIo) -> anyhow::Result<StageResult> + Send + Sync>;

/// Named stage functions registered under one module path.
#[derive(Default)]
pub struct StageModule {
    functions: BTreeMap<String, StageFn>,
}

impl StageModule {
    /// Look up a function by name.
    pub fn get(&self, function: &str) -> Option<&StageFn> {
        self.functions.get(function)
    }

    /// Names of the functions registered on this module, sorted.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

/// Mapping from module path to registered stage functions.
///
/// Populated at startup by the embedding binary:
///
/// ```
/// use std::io::Write;
/// use trainpack_sdk::Registry;
///
/// let mut registry = Registry::new();
/// registry.register("models.resnet", "train", |io| {
///     writeln!(io.out(), "training...")?;
///     Ok(None)
/// });
/// assert!(registry.get("models.resnet", "train").is_some());
/// ```
#[derive(Default)]
pub struct Registry {
    modules: BTreeMap<String, StageModule>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `module`. A later registration with the
    /// same module/function pair replaces the earlier one.
    pub fn register<F>(&mut self, module: &str, function: &str, f: F)
    where
        F: Fn(&mut StageIo) -> anyhow::Result<StageResult> + Send + Sync + 'static,
    {
        self.modules
            .entry(module.to_string())
            .or_default()
            .functions
            .insert(function.to_string(), Arc::new(f));
    }

    /// Look up a function by module path and name.
    pub fn get(&self, module: &str, function: &str) -> Option<&StageFn> {
        self.modules.get(module).and_then(|m| m.get(function))
    }

    /// Whether any functions are registered under `module`.
    pub fn contains_module(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    /// Registered module paths, sorted.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
