//! Settings for the wirehook CLI.
//!
//! Loading flow:
//! 1. Start with compiled [`WirehookSettings::default()`]
//! 2. If `~/.wirehook/settings.json` exists, deep-merge user values over
//!    defaults
//! 3. Apply `WIREHOOK_*` environment variable overrides (highest priority
//!    below CLI flags)

mod errors;
mod loader;
mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{BrokerSettings, WirehookSettings};
