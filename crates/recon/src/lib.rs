//! `exoplots-recon`: cross-catalog reconciliation for exoplanet tables.
//!
//! Links KOI, K2 and TOI candidates to the confirmed planet table by
//! position and period, then propagates the earliest discovery year across
//! every link. The engine works on pre-loaded tables; `load` is the only
//! module that touches the filesystem.

pub mod config;
pub mod engine;
pub mod error;
pub mod exceptions;
pub mod load;
pub mod matcher;
pub mod model;
pub mod per_year;
pub mod vintage;

pub use config::CatalogConfig;
pub use engine::{reconcile, ReconOptions};
pub use error::{ReconError, ReconErrorKind};
pub use exceptions::ExceptionConfig;
pub use load::{load_catalog_dir, LoadedCatalog};
pub use model::{CatalogKind, CatalogSet, Reconciled};
pub use vintage::KoiReleaseHistory;
