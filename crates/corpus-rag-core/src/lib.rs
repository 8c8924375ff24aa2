//! # corpus-rag core
//!
//! I/O-free logic shared by the `corpus-rag` application: data models,
//! positional chunking, the flat L2 vector index and its byte codec,
//! ranking, and the provider traits for embedding and text generation.
//!
//! This crate contains no tokio, HTTP, or filesystem code. Concrete
//! providers and artifact persistence live in the `corpus-rag` crate.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod models;
pub mod search;

pub use error::{RagError, Result};
