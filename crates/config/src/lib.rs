//! Application configuration loaded from a JSON document. No environment
//! variables; the compiled-in default file can be overridden with
//! `AppConfig::from_file`.

mod config_loader;

pub use config_loader::*;
