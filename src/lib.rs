//! trail-climate: best-effort climate summaries for hiking trails
//!
//! A library and CLI tool that turns a GeoJSON trail into a short climate
//! summary (precipitation, temperature range, wind) for the current month.
//!
//! ## Features
//!
//! - Representative point extraction from LineString and MultiLineString
//! - Region lookup with a long-lived cache and a default-region fallback
//! - Recent weather-station observations under a hard deadline
//! - Deterministic synthetic data whenever live data is missing
//! - Request coalescing and per-key TTL caching
//! - HTTP API + CLI interface
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trail_climate::climate::synthesize;
//! use trail_climate::geo::extract_representative_point;
//!
//! let geometry = serde_json::json!({
//!     "type": "LineString",
//!     "coordinates": [[-79.96, 39.63], [-79.95, 39.64], [-79.94, 39.65]]
//! });
//! let point = extract_representative_point(Some(&geometry)).unwrap();
//!
//! let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
//! let summary = synthesize(point, today, "deckers-creek");
//! assert!(summary.temperature.min <= summary.temperature.max);
//! println!("{:?}", summary);
//! ```

pub mod cache;
pub mod cli;
pub mod climate;
pub mod config;
pub mod constants;
pub mod error;
pub mod geo;
pub mod net;
pub mod server;

// Re-export commonly used types
pub use climate::{ClimateResolver, ClimateStatus, ClimateSummary};
pub use config::Config;
pub use error::{Error, Result};
pub use geo::{GeoPoint, TrailFeature};
