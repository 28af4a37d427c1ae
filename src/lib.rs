//! # oodle-dyn
//!
//! Version-resolving bindings to the oo2core (Oodle Data) codec library.
//!
//! oo2core ships as a closed binary in several major versions whose exports
//! differ in small ways. This crate finds the newest installed build next to
//! the host program, binds its exports through a per-version ABI
//! descriptor, and exposes one safe operation contract regardless of which
//! build was found.
//!
//! # Architecture
//!
//! ```text
//! oodle-dyn
//!   ├─> probe   (platform file names, availability cache, newest-first selector)
//!   ├─> native  (options record layout, enums, per-version export table)
//!   └─> codec   (CodecBinding, Compressor trait, process-wide facade)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use oodle_dyn::native::{CodecVariant, CompressionLevel};
//!
//! let codec = oodle_dyn::compressor()?;
//! let raw = b"hello hello hello hello";
//! let mut out = vec![0u8; codec.compressed_buffer_size_needed(CodecVariant::Kraken, raw.len())?];
//! let n = codec.compress(CodecVariant::Kraken, raw, &mut out, CompressionLevel::Normal, None)?;
//! out.truncate(n);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

/// Configuration file handling
pub mod config;

/// Native ABI: record layouts, enums and per-version export tables
pub mod native;

/// Locating installed oo2core builds
pub mod probe;

/// Safe codec operations over a bound build
pub mod codec;

pub use codec::{compressor, CodecBinding, CodecError, Compressor, DecodeOptions};
pub use native::{CodecVariant, CompressOptions, CompressionLevel, SupportedVersion};
pub use probe::{CodecNotFoundError, Resolver, VersionProbe};
