#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! File provisioning engine for workflow execution workspaces.
//!
//! Stages input files from remote storage backends into a local working
//! directory and pushes result files back out through pluggable
//! [`stevedore_provider::TransferProvider`] implementations. Repeated
//! downloads of the same logical target are served from a sharded on-disk
//! cache, and every provider transfer runs inside a bounded exponential
//! backoff retry loop.
//!
//! Layout: `config.rs` (session configuration), `cache.rs` (sharded input
//! cache), `retry.rs` (bounded backoff around provider transfers),
//! `dispatch.rs` (scheme-to-provider resolution), `linker.rs`
//! (hard-link/copy placement of local targets), `fallback.rs` (built-in
//! transfer for unclaimed schemes), `batch.rs` (grouped upload lifecycle),
//! `service.rs` (the [`FileProvisioner`] entry point).

mod batch;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fallback;
pub mod linker;
pub mod model;
pub mod retry;
pub mod service;

pub use cache::FileCache;
pub use config::ProvisionConfig;
pub use dispatch::{ProviderSet, scheme_of};
pub use error::{ProvisionError, ProvisionResult};
pub use fallback::FallbackTransfer;
pub use model::{FileInfo, RegisteredOutput};
pub use retry::{RetryPolicy, TokioSleeper, backoff_interval};
pub use service::FileProvisioner;
