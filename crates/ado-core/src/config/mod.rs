//! Adapter settings and remote project configuration.

pub mod parser;
pub mod remote;
pub mod settings;

pub use parser::{load_settings, parse_settings_toml, parse_settings_toml_str, to_toml};
pub use remote::RemoteProjectConfig;
pub use settings::{AdoSettings, CompletionSettings, FeedScope};
