//! Stage reference resolution: turns a `"module.path:function"` string
//! from the training config into a registered stage function.

use serde::{Deserialize, Serialize};
use trainpack_sdk::{Registry, StageFn};

use crate::errors::ResolveError;

/// Separator convention for stage references. Both exist in the wild;
/// the config file selects one explicitly rather than the engine
/// guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefSyntax {
    /// `"models.resnet:train"`
    #[default]
    Colon,
    /// `"models.resnet.train"`: the last dot splits module from function.
    FinalDot,
}

impl RefSyntax {
    pub fn separator(self) -> char {
        match self {
            Self::Colon => ':',
            Self::FinalDot => '.',
        }
    }
}

/// A parsed stage reference: module path plus function name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableRef {
    pub module: String,
    pub function: String,
}

/// Split a reference string into module and function segments.
///
/// # Errors
///
/// Fails on a missing separator or an empty segment; the registry is
/// never consulted for a malformed reference.
pub fn parse_stage_ref(reference: &str, syntax: RefSyntax) -> Result<CallableRef, ResolveError> {
    let separator = syntax.separator();
    let (module, function) =
        reference
            .rsplit_once(separator)
            .ok_or_else(|| ResolveError::MissingSeparator {
                reference: reference.to_string(),
                separator,
            })?;

    if module.is_empty() {
        return Err(ResolveError::EmptyModule {
            reference: reference.to_string(),
        });
    }
    if function.is_empty() {
        return Err(ResolveError::EmptyFunction {
            reference: reference.to_string(),
        });
    }

    Ok(CallableRef {
        module: module.to_string(),
        function: function.to_string(),
    })
}

/// Resolve a reference string against the registry.
///
/// # Errors
///
/// Distinguishes an unregistered module from a known module missing the
/// named function, so a typo is diagnosable from the message alone.
pub fn resolve<'r>(
    registry: &'r Registry,
    reference: &str,
    syntax: RefSyntax,
) -> Result<&'r StageFn, ResolveError> {
    let parsed = parse_stage_ref(reference, syntax)?;

    if !registry.contains_module(&parsed.module) {
        return Err(ResolveError::UnknownModule {
            module: parsed.module,
            reference: reference.to_string(),
        });
    }

    registry
        .get(&parsed.module, &parsed.function)
        .ok_or(ResolveError::UnknownFunction {
            function: parsed.function,
            module: parsed.module,
        })
}
