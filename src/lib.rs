//! # clipsync
//!
//! Personal clipboard sync server: push text, code, links, images, or
//! files from one machine over HTTP(S) and pull them from another.
//!
//! # Architecture
//!
//! ```text
//! clipsync
//!   ├─> ClipServer (listener, optional TLS, per-connection tasks)
//!   │     └─> Router (token check, CORS, JSON API, UI document)
//!   ├─> EntryStore (bounded newest-first JSON snapshot)
//!   ├─> classify (content type heuristic)
//!   └─> CertificateProvisioner (self-signed key pair on first start)
//! ```
//!
//! # Data Flow
//!
//! **Push:** Client → Router → classify → EntryStore (load, prepend, save) → 201
//!
//! **Pull:** Client → Router → EntryStore (load) → JSON

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Server configuration
pub mod config;

/// Content type inference
pub mod classify;

/// Security and TLS
pub mod security;

/// HTTP server and request routing
pub mod server;

/// Entry persistence
pub mod store;

/// Utility functions
pub mod utils;
