//! # synthmig: Uptrends to Elastic Synthetics monitor migration
//!
//! `synthmig` reads monitor definitions from the Uptrends v4 API and turns each one into an
//! Elastic Synthetics monitor: a lightweight YAML monitor (`http`, `tcp`, `icmp`) or a browser
//! journey written against `@elastic/synthetics`.
//!
//! ## Overview
//!
//! The interesting part of the migration is deciding what a source monitor should become. Most
//! monitors are simple and a fixed rule table settles them without any network traffic. Scripted
//! or unusual monitors are described to an inference backend (an Ollama-compatible
//! `/api/generate` endpoint), whose answer is parsed out of free text. When that backend is down,
//! slow or talking nonsense, a deterministic fallback table takes over, so classification always
//! terminates.
//!
//! Classification only proposes a configuration. The generated document is then re-checked by a
//! strict validator that trusts nothing the generator did, and only documents that pass are
//! written to disk.
//!
//! ### Pipeline
//!
//! For each selected monitor, one at a time:
//!
//! 1. **Fetch** the full record through [`source::FetchMonitors`]
//! 2. **Classify** with a [`classify::ClassifierChain`]: rules, then inference, then fallback
//! 3. **Shape check** the classification with [`classify::validate_classification`]
//! 4. **Generate** the monitor with [`generator::ConfigGenerator`]
//! 5. **Validate** with [`validator::StrictValidator`] (and [`validator::validate_script`] for journeys)
//! 6. **Write** with [`output::ArtifactWriter`]
//!
//! Failures in steps 1 to 6 are recorded per monitor in a [`models::MigrationReport`]; one broken
//! monitor never aborts the batch. The [`migration::Migration`] driver ties the steps together.
//!
//! ## Configuration
//!
//! See [`config`] for the YAML layout and environment overrides. Source credentials come from
//! `UPTRENDS_USERNAME` / `UPTRENDS_PASSWORD`; the inference backend from `OLLAMA_HOST` /
//! `OLLAMA_MODEL`.

pub mod classify;
pub mod config;
pub mod errors;
pub mod generator;
pub mod migration;
pub mod models;
pub mod output;
pub mod source;
pub mod telemetry;
pub mod validator;

pub use config::Config;
pub use migration::Migration;
