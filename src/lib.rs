//! # corpus-rag
//!
//! Retrieval-augmented question answering over a single text corpus.
//!
//! A corpus file is split into fixed-size chunks, each chunk is embedded,
//! and the vectors go into a flat L2 index persisted next to the chunk
//! text. Queries are embedded the same way and answered either with the
//! nearest chunks or with a generated answer grounded on them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌──────────┐   ┌────────────────────┐
//! │  corpus  │──▶│ Chunker │──▶│ Embedder │──▶│ index.bin          │
//! │  (file)  │   └─────────┘   └──────────┘   │ chunks.json        │
//! └──────────┘                                └─────────┬──────────┘
//!                                                       │
//!                      ┌────────────────────────────────┤
//!                      ▼                                ▼
//!               ┌─────────────┐                 ┌───────────────┐
//!               │ crag search │                 │ crag ask /    │
//!               │             │                 │ crag session  │
//!               └─────────────┘                 └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! crag ingest ./corpus.txt          # build the index
//! crag search "member repository"   # nearest chunks
//! crag ask "how is data stored?"    # generated answer
//! crag session                      # interactive loop
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`http`] | JSON-over-HTTP client with retry |
//! | [`embedding`] | Embedding providers (OpenAI, Ollama, local) |
//! | [`generation`] | Chat completion providers |
//! | [`store`] | Artifact persistence |
//! | [`engine`] | Ingestion and search |
//! | [`answer`] | Retrieval-augmented answers |
//! | [`session`] | Interactive query loop |
//! | [`progress`] | Ingestion progress reporting |
//!
//! Chunking, the vector index and the provider traits live in the
//! I/O-free `corpus-rag-core` crate.

pub mod answer;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod generation;
pub mod http;
pub mod ingest;
pub mod progress;
pub mod search;
pub mod session;
pub mod status;
pub mod store;
