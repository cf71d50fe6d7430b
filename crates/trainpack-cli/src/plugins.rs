//! Stage registration point for the buildpack binary.
//!
//! The deployment build step links the user's stage crates into this
//! binary; each crate exposes a `register(&mut Registry)` hook that
//! binds its functions under the module path the training config
//! references. Nothing is registered in a bare checkout, so `run`
//! fails at resolution with the offending reference named.

use trainpack_sdk::Registry;

pub fn build_registry() -> Registry {
    #[allow(unused_mut)]
    let mut registry = Registry::new();
    // Linked stage crates register here, e.g.:
    //   my_model::register(&mut registry);
    registry
}
