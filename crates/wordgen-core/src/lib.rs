//! Core types and pure functions for the WordGen longitudinal pipeline.
//!
//! This crate is deliberately free of file and HTTP I/O. All other crates
//! depend on it; it depends on nothing heavier than the hashing and Unicode
//! folding primitives the domain requires.

pub mod config;
pub mod error;
pub mod identity;
pub mod key;
pub mod normalize;
pub mod record;
pub mod stats;

pub use error::{Error, Result};
