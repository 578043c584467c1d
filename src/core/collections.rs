//! Collection aliases used throughout the crate.
//!
//! Hash maps and sets use the non-cryptographic `FxHasher`; short,
//! usually-bounded sequences use [`SmallBuffer`]. Import from this module
//! rather than naming the backing crates directly.

mod aliases;
mod key_maps;

pub use aliases::*;
pub use key_maps::*;
