//! Core compute primitives (sparse matrices).
//!
//! Interaction, similarity and learned weight matrices are all stored in
//! [`CsrMatrix`]; [`CooMatrix`] is the assembly buffer for raw triples.

mod sparse;

pub use sparse::{CooMatrix, CsrMatrix, SparseVec};
