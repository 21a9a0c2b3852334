//! Catalogue entities and their persistence.
//!
//! * [`records`]: typed asteroid, orbit and class rows
//! * [`identity`]: natural-key to surrogate-key resolution
//! * [`merge`]: fill-absent-only merge policy and insert defaults
//! * [`store`]: SQLite persistence
pub mod identity;
pub mod merge;
pub mod records;
pub mod store;

pub use identity::{IdentityKeys, IdentityResolver, KeyCounter, Resolution};
pub use merge::{FillMissing, MissingElements};
pub use records::{
    AsteroidRecord, OrbitClass, OrbitOutcome, OrbitRecord, OrbitSigmas, UpsertAction, YesNo,
};
pub use store::{CatalogTable, LoadErrorEntry, NeoDatabase};
