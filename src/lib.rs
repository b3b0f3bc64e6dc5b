//! Cleansing and reconciliation of historical English league match data.
//!
//! Raw per-source files are cleansed into a common schema, club names are
//! resolved through a curated identity map, and the per-source tables are
//! merged into one unified dataset validated against reference season sizes.

pub mod checks;
pub mod cleanse;
pub mod config;
pub mod corrections;
pub mod error;
pub mod identity;
pub mod loader;
pub mod logging;
pub mod output;
pub mod reconcile;
pub mod reference;
pub mod reports;
pub mod types;
pub mod util;

pub use error::{Error, Result};
