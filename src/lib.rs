//! Shelf application library
//!
//! Catalog modules live here; the binary in `main.rs` wires them to the
//! store and the HTTP server.

pub mod modules;

pub use modules::*;
