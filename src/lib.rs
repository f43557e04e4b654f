//! On-device conversational memory — offline semantic recall over local chat sessions.
//!
//! Mnemo stores chat sessions and their messages entirely on the local machine and
//! retrieves prior messages by meaning rather than exact text match, without any
//! network access. Text is encoded with deterministic feature hashing, ranked by
//! cosine similarity, and persisted write-through to a single durable blob.
//!
//! # Architecture
//!
//! - **Embeddings**: deterministic bigram + word feature hashing (128 dimensions,
//!   L2-normalized) — no model files, no network
//! - **Search**: linear-scan cosine ranking, optionally scoped to one session
//! - **Storage**: in-memory session/message arena persisted to one key-value blob
//!   in SQLite, written through on every mutation
//! - **Resilience**: a memory-only fallback engine answers any call the primary
//!   engine fails, so callers never see persistence or embedding errors
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`embedding`] — Deterministic text-to-vector feature hashing
//! - [`persist`] — Durable key-value blob storage and the versioned snapshot schema
//! - [`store`] — Core engine: session/message store, search, retention, failover

pub mod config;
pub mod embedding;
pub mod persist;
pub mod store;
