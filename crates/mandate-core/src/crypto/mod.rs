//! Byte-level primitives shared by signing and digests.

pub mod canonical;
