//! chatline-store: lazily materialized document store handles
//!
//! A document store is reached through four nested handles: cluster, bucket,
//! scope and collection. [`StoreHandles`] creates each level on first use,
//! memoizes it, and invalidates levels with a downward cascade. The actual
//! store is reached through the driver traits in [`driver`]; a filesystem
//! driver and an in-memory driver ship in [`drivers`].

pub mod driver;
pub mod drivers;
pub mod error;
pub mod hierarchy;

pub use driver::{Bucket, Cluster, Collection, Connector, IdCursor, Scope};
pub use error::{DriverError, DriverResult, Error, Result};
pub use hierarchy::{StoreConfig, StoreHandles};
