#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Security validation test suite for latebra-crypto-core.
//!
//! These integration tests verify security-critical properties:
//! - Tamper detection on every bit of a sealed chunk
//! - Decoys match real chunks in shape and open under no derived key
//! - Registry purge wipes live buffers, including under concurrent use
//! - mlock status reporting and core dump disabling

mod security;
