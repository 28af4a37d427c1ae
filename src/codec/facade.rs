//! Process-wide compressor facade.
//!
//! Callers that do not care which oo2core version is installed ask for
//! [`compressor()`] and get the newest available build behind the
//! [`Compressor`] trait.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use super::{
    binding::{CodecBinding, DecodeOptions},
    error::CodecError,
};
use crate::{
    native::{CodecVariant, CompressOptions, CompressionLevel, SupportedVersion},
    probe::{CodecNotFoundError, Resolver},
};

static GLOBAL: OnceLock<Arc<dyn Compressor>> = OnceLock::new();

/// Version-independent codec operations.
///
/// See [`CodecBinding`] for the contract of each operation.
pub trait Compressor: Send + Sync + fmt::Debug {
    /// Bound oo2core version
    fn version(&self) -> SupportedVersion;

    /// Compress `raw` into `compressed`, returning the meaningful length.
    fn compress(
        &self,
        variant: CodecVariant,
        raw: &[u8],
        compressed: &mut [u8],
        level: CompressionLevel,
        options: Option<&CompressOptions>,
    ) -> Result<usize, CodecError>;

    /// Decompress `compressed` into `raw`, whose length is the exact raw size.
    fn decompress(
        &self,
        compressed: &[u8],
        raw: &mut [u8],
        options: &DecodeOptions,
    ) -> Result<usize, CodecError>;

    /// Native default options for `(variant, level)`.
    fn default_options(
        &self,
        variant: CodecVariant,
        level: CompressionLevel,
    ) -> Result<CompressOptions, CodecError>;

    /// Output buffer size `compress` needs.
    fn compressed_buffer_size_needed(
        &self,
        variant: CodecVariant,
        raw_size: usize,
    ) -> Result<usize, CodecError>;

    /// Buffer size to decode into.
    fn decode_buffer_size(
        &self,
        variant: CodecVariant,
        raw_size: usize,
        corruption_possible: bool,
    ) -> Result<usize, CodecError>;
}

impl Compressor for CodecBinding {
    fn version(&self) -> SupportedVersion {
        CodecBinding::version(self)
    }

    fn compress(
        &self,
        variant: CodecVariant,
        raw: &[u8],
        compressed: &mut [u8],
        level: CompressionLevel,
        options: Option<&CompressOptions>,
    ) -> Result<usize, CodecError> {
        CodecBinding::compress(self, variant, raw, compressed, level, options)
    }

    fn decompress(
        &self,
        compressed: &[u8],
        raw: &mut [u8],
        options: &DecodeOptions,
    ) -> Result<usize, CodecError> {
        CodecBinding::decompress(self, compressed, raw, options)
    }

    fn default_options(
        &self,
        variant: CodecVariant,
        level: CompressionLevel,
    ) -> Result<CompressOptions, CodecError> {
        CodecBinding::default_options(self, variant, level)
    }

    fn compressed_buffer_size_needed(
        &self,
        variant: CodecVariant,
        raw_size: usize,
    ) -> Result<usize, CodecError> {
        CodecBinding::compressed_buffer_size_needed(self, variant, raw_size)
    }

    fn decode_buffer_size(
        &self,
        variant: CodecVariant,
        raw_size: usize,
        corruption_possible: bool,
    ) -> Result<usize, CodecError> {
        CodecBinding::decode_buffer_size(self, variant, raw_size, corruption_possible)
    }
}

/// Newest installed oo2core build, bound once per process.
///
/// Uses the default search directory and every supported version. A
/// successful binding is kept for the rest of the process; a failure is
/// not, so a later call can succeed once a binary has been put in place.
pub fn compressor() -> Result<Arc<dyn Compressor>, CodecNotFoundError> {
    bind_once(&GLOBAL, &Resolver::global())
}

/// Return the binding held in `cell`, resolving and storing one if empty.
///
/// Only a successful resolution is stored.
fn bind_once(
    cell: &OnceLock<Arc<dyn Compressor>>,
    resolver: &Resolver,
) -> Result<Arc<dyn Compressor>, CodecNotFoundError> {
    if let Some(bound) = cell.get() {
        return Ok(Arc::clone(bound));
    }

    let binding: Arc<dyn Compressor> = Arc::new(resolver.resolve()?);

    // A concurrent caller may have won; its binding is kept and ours dropped.
    Ok(Arc::clone(cell.get_or_init(|| binding)))
}
