//! Ingestion, alerting and monitoring tools for a near-Earth-object catalogue.
//!
//! Catalogue exports (merged JPL NEO + MPCORB CSV files, MPCORB extracts) are sniffed by
//! [`csv_source`], mapped onto [`catalog`] records, merged without ever overwriting stored
//! values, completed by [`orb_elem`] and persisted in SQLite by the [`ingest`] pipelines.
//! [`alerts`] and [`monitoring`] work on the resulting catalogue, and [`service`] runs all of
//! it in the background for interactive front ends.
pub mod alerts;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod csv_source;
pub mod ingest;
pub mod loader_errors;
pub mod monitoring;
pub mod orb_elem;
pub mod service;
pub mod time;
