//! Shared data model for the schnitt segmenters.
//!
//! Everything a segmenter produces or consumes lives here: chunks and their
//! metadata, per-call options, results with warnings, and the error type.

pub mod chunk;
pub mod config;
pub mod error;
pub mod options;
pub mod result;
pub mod tokens;

pub use chunk::*;
pub use config::ChunkerConfig;
pub use error::*;
pub use options::*;
pub use result::*;
pub use tokens::estimate_tokens;
