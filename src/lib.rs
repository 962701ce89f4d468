// src/lib.rs

//! Promotional campaign crawler library.
//!
//! Collects campaign listings from HTML pages, RSS/Atom feeds and JSON
//! endpoints, fingerprints and filters them, tracks them across runs, and
//! syncs them to a Notion database.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod sync;
pub mod utils;
