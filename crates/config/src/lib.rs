//! Configuration loading and schema.
//!
//! Config files: `hermod.toml`, `hermod.yaml`, or `hermod.json`, searched
//! in `./` then `~/.config/hermod/`; `HERMOD_CONFIG` pins an exact path.
//!
//! `${ENV_VAR}` placeholders are expanded across the raw document.

pub mod env;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        AgentConfig, BroadcastGroup, BroadcastStrategy, DefaultsConfig, ExecDefaultsConfig,
        HermodConfig, SessionConfig, SupersedeMode,
    },
};
