//! # GPPD Map Backend
//!
//! Spatial query backend and viewport-driven map client for the Global Power
//! Plant Database.
//!
//! ## Features
//!
//! - **Spatial queries**: bounding boxes with antimeridian wraparound,
//!   country and fuel filters, deterministic capacity ordering, pagination
//!   with a total count
//! - **Sweeps**: generation-tagged pagination where only the latest request
//!   ever commits
//! - **Clustering**: O(n) grid binning with adaptive cell size and a render
//!   budget
//! - **HTTP API**: REST endpoints via Axum
//!
//! ## Architecture
//!
//! - [`models`]: Domain types (facilities, fuels, bounds, query windows)
//! - [`routes`]: Route-specific response types
//! - [`api`]: Public DTO surface
//! - [`db`]: Query builder, repository pattern and persistence layer
//! - [`client`]: Sweep controller, dedup, viewport filter, clustering
//! - [`http`]: Axum-based HTTP server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod client;
pub mod db;
pub mod models;

pub mod routes;

#[cfg(feature = "http-server")]
pub mod http;
