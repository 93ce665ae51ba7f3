//! Dataset loading and KPI derivation, independent of any presentation.

pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod log;
pub mod metrics;
pub mod profile;
pub mod record;
pub mod session;

// Re-export main types for cleaner imports
pub use error::{LoadError, MetricError, SessionError};
pub use loader::{DatasetLoader, LoadOutcome, LoadReport};
pub use record::{Period, Record, RecordSet};
pub use session::{DataSource, Session};
