//! Depot core library — manifest model, fingerprints, persistence, config.
//!
//! - [`types`] — [`Entry`], [`Manifest`], path helpers
//! - [`fingerprint`] — content digests for change detection
//! - [`store`] — validated load / atomic save
//! - [`config`] — `depot.yaml`
//! - [`paths`] — on-disk layout under a project root

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod paths;
pub mod store;
pub mod types;

pub use config::{DepotConfig, PublishConfig, RemoteConfig};
pub use error::{ConfigError, ManifestError};
pub use fingerprint::fingerprint;
pub use types::{Entry, Fingerprint, Manifest};
