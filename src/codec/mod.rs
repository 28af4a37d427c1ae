//! Codec binding: the uniform operation contract over any supported version.

pub mod binding;
pub mod error;
pub mod facade;

#[cfg(test)]
pub(crate) mod fake;

pub use binding::{CodecBinding, DecodeOptions};
pub use error::CodecError;
pub use facade::{compressor, Compressor};
