//! # depot-sync
//!
//! Manifest building on the publisher side and transactional sync on the
//! consumer side.
//!
//! [`pipeline::publish`] rescans tracked directories into a manifest.
//! [`pipeline::update`] fetches a remote manifest, diffs it against the last
//! synced one, and applies the result all-or-nothing.

pub mod builder;
pub mod confirm;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod pipeline;
pub mod reconcile;

pub use builder::{BuildReport, CacheBuilder};
pub use confirm::{AssumeYes, Confirm, LinePrompt};
pub use error::{DownloadError, FetchError, SyncError};
pub use executor::{FailedDownload, SyncExecutor, SyncOptions, SyncOutcome, SyncReport, SyncState};
pub use fetch::{fetcher_for, DirFetcher, HttpFetcher, RemoteFetcher};
pub use reconcile::{diff, ChangeSet};
