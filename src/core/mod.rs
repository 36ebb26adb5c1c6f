//! Core deterministic primitives.
//!
//! Given the same seed and input, every function here returns the same
//! output. The only nondeterministic source is `rng::entropy_seed`.

pub mod glyph;
pub mod rng;

// Re-export core types
pub use glyph::{decode, encode, Direction};
pub use rng::{derive_round_seed, DeterministicRng};
