//! Reverse dictionary: find words from a description of their meaning.
//!
//! Each dictionary entry's definition is split (and optionally paraphrased) into
//! short phrases called features. Every feature is embedded under each
//! configured model and stored in SQLite. A query phrase is embedded the same
//! way and entries are ranked by the cosine distance of their closest feature.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   for vector distance, behind a cancellable async [`dictionary::EntryStore`]
//! - **Embeddings**: a local swama inference server and the OpenAI embeddings
//!   API, registered per [`dictionary::types::Model`] in [`embedding::Embedders`]
//! - **Search**: best feature per entry, per model, via
//!   [`service::ReverseDictionary`]
//! - **Transport**: a small JSON HTTP API ([`server`]) and the `revdict` CLI
//!
//! # Modules
//!
//! - [`config`] Configuration loading from TOML files and environment variables
//! - [`db`] SQLite database initialization, schema, migrations, and health checks
//! - [`dictionary`] Entry store: write path, ranking query, and read utilities
//! - [`embedding`] Embedding providers, rate limiting, and the model registry
//! - [`rephrase`] Definition paraphrasing through a chat completion model
//! - [`service`] Search and ingest pipelines

pub mod cancel;
pub mod config;
pub mod db;
pub mod dictionary;
pub mod embedding;
pub mod error;
pub mod rephrase;
pub mod server;
pub mod service;
