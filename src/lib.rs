//! Stores short text posts, labels each with categories from a local
//! text-generation program, and serves the results over HTTP.

pub mod classifier;
pub mod config;
pub mod db;
pub mod handlers;
pub mod model;
pub mod seed;
pub mod worker;
