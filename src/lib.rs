//! News Reactions - the reaction service of a news aggregator
//!
//! This crate provides the reaction store for a news aggregation web app:
//! at most one reaction per (user, article) pair, toggle semantics, and
//! per-article counts, served over a small JSON API.

pub mod config;
pub mod routes;
pub mod store;
