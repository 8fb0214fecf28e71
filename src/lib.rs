//! blogsearch - full-text search for a blog.
//!
//! Posts are reduced to small search documents ahead of time; a query
//! engine then builds an in-memory index over them once per reading session
//! and answers free-text queries with field-weighted BM25 ranking.
//!
//! # Modules
//!
//! - [`corpus`] - Post loading (front matter directories, JSON exports)
//! - [`index`] - Search document construction and JSON snapshots
//! - [`search`] - Text index trait, Tantivy implementation and query engine
//! - [`commands`] - High-level operations (index, search, list, tags, get)
//! - [`config`] - Configuration loading
//! - [`cli`] - Command-line interface definitions

pub mod cli;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod index;
pub mod search;

#[cfg(feature = "mcp")]
pub mod mcp;
