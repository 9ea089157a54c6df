//! Serenade - Semantic Song Recommendation
//!
//! Indexes song lyrics datasets into a local vector store and answers
//! free-text mood queries with nearest-neighbour recommendations.

pub mod config;
pub mod embedding;
pub mod index;
pub mod ingest;
pub mod normalize;
pub mod recommend;
pub mod repl;
pub mod schema;
