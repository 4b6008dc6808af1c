//! Analyzer Configuration Module
//!
//! Every tunable of a run, loaded from TOML and passed explicitly to the
//! stages that need it. There is no process-wide config: two analyses with
//! different settings can run side by side.
//!
//! ## Loading Order
//!
//! 1. `MACHINE_ANALYZER_CONFIG` environment variable (path to TOML file)
//! 2. `analyzer.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ```ignore
//! let config = AnalyzerConfig::load();
//! let report = pipeline::analyze(&series, &config.pipeline_config())?;
//! ```

mod analyzer_config;
pub mod defaults;
pub mod validation;

pub use analyzer_config::*;
