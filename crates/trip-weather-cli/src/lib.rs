//! Weather profiles, points of interest and heuristic spot ranking for trip
//! planning agents.
//!
//! - `service`: weather profile resolution (forecast, archive or a
//!   synthesized estimate from past years).
//! - `classifier`, `daily`, `fallback`, `aggregate`: the pieces the resolver
//!   is built from.
//! - `geocoding`, `spots`, `scoring`: destination lookup and POI ranking.
//! - `cache`: key to JSON store with TTL, injected into every call.

pub mod aggregate;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod daily;
pub mod error;
pub mod fallback;
pub mod geo;
pub mod geocoding;
pub mod model;
pub mod providers;
pub mod scoring;
pub mod service;
pub mod spots;
#[cfg(test)]
pub(crate) mod test_support;
pub mod weather_code;
