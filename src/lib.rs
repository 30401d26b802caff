//! PDF Gate Server Library
//!
//! This crate exposes the building blocks of the service for integration
//! tests. The server binary is in main.rs.
//!
//! # Modules
//!
//! - `gate`: Bounded-concurrency admission for processing work
//! - `tempfiles`: Process-scoped staged-file lifecycle management
//! - `streaming`: Multipart intake and chunked download responses
//! - `processor`: Document operation seam behind the gate
//! - `routes`: HTTP surface

pub mod config;
pub mod error;
pub mod gate;
pub mod processor;
pub mod routes;
pub mod state;
pub mod streaming;
pub mod tempfiles;
