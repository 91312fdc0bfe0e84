// These are public API re-exports - they may not be used internally yet
#![allow(unused_imports)]

//! Domain Layer
//!
//! Core abstractions the configuration model depends on.
//!
//! - **Ports** (`ports.rs`) - the `ManagementApi` trait standing for the
//!   managed server, plus the value objects shared across modules
//!
//! The managed server owns the authoritative configuration; everything in
//! this crate is an in-memory working copy that is fetched whole, edited,
//! validated, and pushed back whole through the port.

pub mod ports;

pub use ports::{ManagementApi, MediaType, VsnEvaluation};
