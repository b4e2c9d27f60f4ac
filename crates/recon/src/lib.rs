//! `courier-recon`: four-source reconciliation engine for a courier's
//! trips, payout claims, bank statements and receipt log.
//!
//! Pure engine crate: receives pre-loaded raw rows, returns match records,
//! per-pass metrics, spending categories and report rollups.

pub mod aggregate;
pub mod batch;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod load;
pub mod matcher;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod pool;
pub mod report;
pub mod status;

pub use config::ReconConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{MatchLevel, PassKind, ReconInput, ReconResult};
