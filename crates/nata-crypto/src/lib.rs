//! Hashing primitives for the NataCoin record engine.
//!
//! Content identifiers are BLAKE3 digests with a domain tag prepended. All
//! hashing wraps the `blake3` crate; nothing here is custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
