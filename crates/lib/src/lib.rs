//! assetgen-lib: incremental front-end asset builds
//!
//! This crate provides the engine behind the `assetgen` command:
//! - `config`: loading `assetgen.yaml` declarations, profiles and source expansion
//! - `asset`: the handler registry and the `binary`, `css` and `js` handlers
//! - `engine`: freshness, emission, the durable build record and the watch loop
//! - `lock`: per-config single-instance locking

pub mod asset;
pub mod config;
pub mod consts;
pub mod engine;
pub mod fetch;
pub mod lock;
pub mod platform;
pub mod util;

pub use asset::{Asset, AssetHandler, GenerateError, HandlerRegistry, Source};
pub use config::{Config, ConfigError};
pub use engine::{BuildError, CleanSummary, Engine, EngineOptions, RunSummary, WatchOptions, WatchSummary, Watcher};
pub use fetch::{Fetcher, HttpFetcher};
