//! # clearsight
//!
//! Ingestion and replay gateway for browser session recordings.
//!
//! Recording clients open a session with a base DOM snapshot and then
//! stream interaction events (pointer, keyboard, scroll, resize, form,
//! network, DOM mutation). Events arrive over plain HTTP, where every
//! message names its session, or over a WebSocket, where the connection
//! itself carries the session. A replay reassembles the snapshot and the
//! ordered timeline into one self-contained document.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── IngestService / ReplayCompositor / SessionService (service/)
//!     ├── Sessions, events, snapshots (domain/)
//!     │
//!     └── TelemetryStore (store/)
//!           ├── PostgresStore
//!           └── MemoryStore
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;
pub mod ws;
