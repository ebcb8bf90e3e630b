//! Cryptographic primitives for response verification.

pub mod canonical;
pub mod verify;
