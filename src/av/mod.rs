//! Boundary to the external encoder binary.

pub mod encoder;
