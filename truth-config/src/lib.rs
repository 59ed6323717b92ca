// truth-config/src/lib.rs
// ============================================================================
// Module: Truth Config Library
// Description: Canonical config model, environment overrides, and example
//              generation for the regulatory-truth pipeline.
// Purpose: Single source of truth for `truth-pipeline.toml` semantics.
// Dependencies: truth-providers, truth-store-sqlite, truth-watchdog, serde,
//               toml
// ============================================================================

//! ## Overview
//! `truth-config` defines the canonical configuration model for the
//! regulatory-truth pipeline. It provides strict, fail-closed TOML loading
//! and validation ([`config`]), the `WATCHDOG_*`/`SLACK_*`/`TRUTH_DIGEST_EMAIL`
//! environment-override cascade ([`env`]), and a canonical example
//! configuration ([`examples`]).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AlertingConfig;
pub use config::ConcurrencyConfig;
pub use config::ConfigError;
pub use config::DatabaseConfig;
pub use config::FetcherSettings;
pub use config::TruthConfig;
pub use config::WatchdogConfig;
pub use config::WebhookConfig;
pub use env::EnvLookup;
pub use env::EnvOverrides;
pub use env::ProcessEnv;
pub use examples::config_toml_example;
