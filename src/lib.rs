//! This crate provides an ETL that publishes fiscal indicators from the Eurostat statistics API.
//! Each configured dataset is fetched as a JSON-stat cube, reduced to a latest-period
//! cross-section and a per-country timeseries, and written as dated snapshots plus "latest"
//! aliases alongside a manifest describing what was produced.
//!
//! The reduction is a pure in-memory computation over the cube:
//!
//! * [coords] decodes linear cell indices into per-dimension positions.
//! * [catalog] builds the per-dimension category lookups.
//! * [cells] materialises the sparse values into labelled records.
//! * [units] picks the unit that represents "percentage of GDP".
//! * [projection] builds both views.
//!
//! The ETL is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [reqwest] performs the HTTP requests.
//! * [Serde](serde) performs (de)serialisation of cube, configuration and output documents.
//! * `tracing` provides structured logging.

pub mod catalog;
pub mod cells;
pub mod cli;
pub mod config;
pub mod coords;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod projection;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod units;
