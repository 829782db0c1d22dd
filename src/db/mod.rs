//! Vector storage for document chunks.
//!
//! - [`vectorstore`] defines the [`VectorIndex`] trait and the provider enum
//! - [`embedded`] implements it on top of the `askmydocs-vector` crate

pub mod embedded;
pub mod vectorstore;

pub use embedded::EmbeddedVectorIndex;
pub use vectorstore::{IndexStats, VectorIndex, VectorIndexProvider};
