//! Library crate for duet-back: the client-side turn synchronization engine
//! and the relay server building blocks, exposed for binaries and
//! integration tests.

/// Runtime configuration and catalog seeding.
pub mod config;
/// Record store, entities, and device-local bookmarks.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Error taxonomy.
pub mod error;
/// Relay HTTP routes.
pub mod routes;
/// Ledgers, synchronization, and room directory services.
pub mod services;
/// Screens, flow machine, game client, and server state.
pub mod state;
