//! # ISS Tracker
//!
//! An HTTP service that fetches the ISS orbital ephemeris (a CCSDS OEM XML
//! document published by NASA), caches it in memory, and answers queries
//! about individual epochs: state vectors, speed, sub-point location with
//! reverse geocoding, and the epoch nearest to the current time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌───────────┐   ┌────────────┐
//! │  Loader  │──▶│ DocumentStore│──▶│   Query   │──▶│ Kinematics │
//! │ HTTP+OEM │   │ (one slot)  │   │  epochs   │   │ speed/geo  │
//! └──────────┘   └─────────────┘   └───────────┘   └─────┬──────┘
//!                                                        ▼
//!                                                  ┌──────────┐
//!                                                  │   HTTP   │
//!                                                  │  (axum)  │
//!                                                  └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Dataset and result types |
//! | [`oem`] | OEM XML parsing |
//! | [`epoch`] | Day-of-year timestamp parsing |
//! | [`loader`] | Upstream fetch |
//! | [`store`] | Single-slot dataset store |
//! | [`query`] | Epoch listing and lookup |
//! | [`kinematics`] | Speed and sub-point calculations |
//! | [`geocode`] | Reverse geocoding |
//! | [`server`] | HTTP API |

pub mod config;
pub mod epoch;
pub mod error;
pub mod geocode;
pub mod kinematics;
pub mod loader;
pub mod logging;
pub mod models;
pub mod oem;
pub mod query;
pub mod server;
pub mod store;
