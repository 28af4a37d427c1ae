#![expect(
    unsafe_code,
    reason = "calls through resolved oo2core function pointers"
)]

//! Version-independent codec binding.
//!
//! One [`CodecBinding`] type serves every supported version; the version's
//! [`AbiDescriptor`] and resolved [`EntryPoints`] are its only
//! parameters. All buffer checks happen here, before the foreign call,
//! because the native compress entry point is never told how large the
//! output buffer is.

use std::{
    path::{Path, PathBuf},
    ptr::{null, null_mut},
};

use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use super::error::CodecError;
use crate::native::{
    abi::open_library, AbiDescriptor, BindError, CheckCrc, CodecVariant, CompressOptions,
    CompressionLevel, DecodeThreadPhase, EntryPoints, FuzzSafe, NativeBool, SizeQueryEntryPoints,
    SupportedVersion, Verbosity, OODLELZ_FAILED,
};

/// Decoder knobs of a decompress call.
///
/// Defaults: fuzz-safe decoding required, no CRC check, silent,
/// single-threaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Refuse codecs not hardened against corrupt input
    pub fuzz_safe: FuzzSafe,
    /// Verify per-quantum CRCs. Silently skipped by the native decoder when
    /// the stream was compressed without `send_quantum_crcs`.
    pub check_crc: CheckCrc,
    /// Native log verbosity
    pub verbosity: Verbosity,
    /// Phase for two-thread decoding
    pub thread_phase: DecodeThreadPhase,
}

/// A loaded oo2core build behind the uniform operation contract.
///
/// Stateless across calls and safe to share between threads: concurrent
/// calls with disjoint buffers need no serialization, and none is added.
#[derive(Debug)]
pub struct CodecBinding {
    descriptor: &'static AbiDescriptor,
    entry: EntryPoints,
    library_path: Option<PathBuf>,
    // Keeps `entry` valid for the lifetime of the binding.
    _library: Option<libloading::Library>,
}

impl CodecBinding {
    /// Load `path` as an oo2core build of `version` and resolve its exports.
    pub fn load(version: SupportedVersion, path: &Path) -> Result<Self, BindError> {
        let descriptor = version.descriptor();
        let library = open_library(path)?;

        // Safety: the platform table maps this file name to `version`, whose
        // descriptor types the exports. `library` is stored next to them.
        let entry = unsafe { EntryPoints::resolve(&library, descriptor)? };

        info!("Bound {version} from {}", path.display());

        Ok(Self {
            descriptor,
            entry,
            library_path: Some(path.to_path_buf()),
            _library: Some(library),
        })
    }

    /// Build a binding from entry points obtained elsewhere, such as a
    /// statically linked oo2core.
    ///
    /// # Safety
    ///
    /// Every pointer in `entry` must implement the corresponding export of
    /// `version` and remain callable for the lifetime of the binding.
    pub unsafe fn from_entry_points(version: SupportedVersion, entry: EntryPoints) -> Self {
        Self {
            descriptor: version.descriptor(),
            entry,
            library_path: None,
            _library: None,
        }
    }

    /// Bound version.
    pub fn version(&self) -> SupportedVersion {
        self.descriptor.version
    }

    /// File the library was loaded from, if it was loaded from disk.
    pub fn library_path(&self) -> Option<&Path> {
        self.library_path.as_deref()
    }

    /// Compress `raw` into `compressed`.
    ///
    /// Returns the number of meaningful bytes at the start of `compressed`;
    /// anything after them is padding. Without `options`, the native
    /// defaults for `(variant, level)` are fetched and passed by address.
    ///
    /// An output buffer smaller than
    /// [`compressed_buffer_size_needed`](Self::compressed_buffer_size_needed)
    /// yields [`CodecError::Failed`] without calling native code.
    pub fn compress(
        &self,
        variant: CodecVariant,
        raw: &[u8],
        compressed: &mut [u8],
        level: CompressionLevel,
        options: Option<&CompressOptions>,
    ) -> Result<usize, CodecError> {
        if raw.is_empty() {
            return Err(CodecError::InvalidArgument("raw input is empty"));
        }
        if variant == CodecVariant::Invalid {
            return Err(CodecError::InvalidArgument("compressor is Invalid"));
        }

        let needed = self.compressed_buffer_size_needed(variant, raw.len())?;
        if compressed.len() < needed {
            trace!(
                "compress refused: output holds {} bytes, {needed} needed",
                compressed.len()
            );
            return Err(CodecError::Failed);
        }

        let raw_len = native_len(raw.len())?;

        let defaults;
        let options: &CompressOptions = match options {
            Some(options) => options,
            None => {
                defaults = self.default_options(variant, level)?;
                &defaults
            }
        };

        // Safety: `raw` is readable for `raw_len` bytes, `compressed` is
        // writable for at least the native bound, and `options` points to a
        // fully initialized record with the pinned native layout.
        let ret = unsafe {
            (self.entry.compress)(
                variant.raw(),
                raw.as_ptr(),
                raw_len,
                compressed.as_mut_ptr(),
                level.raw(),
                options,
                null(),
                null(),
                null_mut(),
                0,
            )
        };

        bytes_written("compress", ret, compressed.len())
    }

    /// Decompress `compressed` into `raw`.
    ///
    /// `raw.len()` must be the exact decompressed size. Returns the number
    /// of bytes written, or [`CodecError::Failed`] on corrupt or truncated
    /// input, a size mismatch, or a codec refused under fuzz-safe mode.
    pub fn decompress(
        &self,
        compressed: &[u8],
        raw: &mut [u8],
        options: &DecodeOptions,
    ) -> Result<usize, CodecError> {
        if compressed.is_empty() {
            return Err(CodecError::InvalidArgument("compressed input is empty"));
        }
        if raw.is_empty() {
            return Err(CodecError::InvalidArgument("raw output is empty"));
        }

        let comp_len = native_len(compressed.len())?;
        let raw_len = native_len(raw.len())?;

        // Safety: both buffers are valid for their stated lengths; the
        // optional dictionary, callback and scratch arguments are null/0.
        let ret = unsafe {
            (self.entry.decompress)(
                compressed.as_ptr(),
                comp_len,
                raw.as_mut_ptr(),
                raw_len,
                options.fuzz_safe as i32,
                options.check_crc as i32,
                options.verbosity as i32,
                null_mut(),
                0,
                null(),
                null_mut(),
                null_mut(),
                0,
                options.thread_phase as i32,
            )
        };

        bytes_written("decompress", ret, raw.len())
    }

    /// Native default options for `(variant, level)`, by value.
    pub fn default_options(
        &self,
        variant: CodecVariant,
        level: CompressionLevel,
    ) -> Result<CompressOptions, CodecError> {
        // Safety: pure query with plain integer arguments.
        let ptr = unsafe { (self.entry.default_options)(variant.raw(), level.raw()) };
        if ptr.is_null() {
            return Err(CodecError::NoDefaultOptions { variant, level });
        }

        // Safety: non-null pointer to a native-owned record whose layout is
        // pinned in `ffi_types`. Copied out; never retained.
        Ok(unsafe { ptr.read_unaligned() })
    }

    /// Output buffer size `compress` needs for `raw_size` input bytes.
    ///
    /// Larger than any real compressed stream: it includes worst-case
    /// expansion and padding.
    pub fn compressed_buffer_size_needed(
        &self,
        variant: CodecVariant,
        raw_size: usize,
    ) -> Result<usize, CodecError> {
        let raw = native_len(raw_size)?;

        // Safety: pure queries with plain integer arguments.
        let ret = unsafe {
            match self.entry.size_queries {
                SizeQueryEntryPoints::RawSizeOnly { compressed, .. } => compressed(raw),
                SizeQueryEntryPoints::PerCompressor { compressed, .. } => {
                    compressed(variant.raw(), raw)
                }
            }
        };

        size_result(ret)
    }

    /// Buffer size to decode `raw_size` bytes into.
    ///
    /// Grows when `corruption_possible` is set, leaving the decoder room to
    /// validate suspect input safely.
    pub fn decode_buffer_size(
        &self,
        variant: CodecVariant,
        raw_size: usize,
        corruption_possible: bool,
    ) -> Result<usize, CodecError> {
        let raw = native_len(raw_size)?;
        let corruption = NativeBool::from(corruption_possible);

        // Safety: pure queries with plain integer arguments.
        let ret = unsafe {
            match self.entry.size_queries {
                SizeQueryEntryPoints::RawSizeOnly { decode, .. } => decode(raw, corruption),
                SizeQueryEntryPoints::PerCompressor { decode, .. } => {
                    decode(variant.raw(), raw, corruption)
                }
            }
        };

        size_result(ret)
    }
}

fn native_len(len: usize) -> Result<i64, CodecError> {
    i64::try_from(len).map_err(|_| CodecError::SizeOverflow(len))
}

fn size_result(ret: i64) -> Result<usize, CodecError> {
    usize::try_from(ret).map_err(|_| {
        warn!("size query returned {ret}");
        CodecError::Failed
    })
}

/// Map a native compress/decompress return value onto the contract.
///
/// The sentinel and any non-positive value are failures. A count larger
/// than the buffer cannot be honest and is reported as a failure too.
fn bytes_written(op: &'static str, ret: i64, capacity: usize) -> Result<usize, CodecError> {
    if ret <= OODLELZ_FAILED {
        trace!("{op} returned {ret}");
        return Err(CodecError::Failed);
    }

    match usize::try_from(ret) {
        Ok(written) if written <= capacity => Ok(written),
        _ => {
            warn!("{op} reported {ret} bytes written into a {capacity}-byte buffer");
            Err(CodecError::Failed)
        }
    }
}
