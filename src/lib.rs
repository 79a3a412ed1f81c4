//! Startup search service library.
//!
//! Routes a query to the meeting or domain dataset, embeds it, looks up the
//! nearest records in that dataset's vector index and renders them. The
//! binary entry point lives in main.rs; the modules are exposed here for
//! integration testing.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod present;
pub mod router;
pub mod search;
