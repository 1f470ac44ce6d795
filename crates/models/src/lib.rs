//! Model catalog, alias resolution, per-turn selection, and forward-compat
//! synthesis for model ids newer than the shipped catalog.

pub mod alias;
pub mod catalog;
pub mod error;
pub mod forward_compat;
pub mod selection;

pub use {
    alias::{MatchKind, resolve_model_ref},
    catalog::{ModelDef, ModelRef, ModelRegistry},
    error::{Error, Result},
    forward_compat::resolve_forward_compat_model,
    selection::{ModelSelection, SelectionArgs, resolve_selection},
};
