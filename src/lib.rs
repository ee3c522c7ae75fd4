//! Rating-similarity movie recommender
//!
//! Builds an immutable user × item rating matrix and answers neighbor,
//! similarity, and top-k recommendation queries over it using cosine or
//! Pearson similarity. The [`api`] module exposes the engine over HTTP.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
