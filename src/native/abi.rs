#![expect(
    unsafe_code,
    reason = "dlsym of native entry points into typed function pointers"
)]

//! Per-version native ABI descriptors.
//!
//! Each supported oo2core major version is described by an [`AbiDescriptor`]:
//! the export names it provides, which size-query signature it uses and the
//! size of its options record. Resolving a descriptor against a loaded
//! library yields [`EntryPoints`], the typed function pointers the codec
//! binding calls.
//!
//! Versions 5 and 6 take only the raw size in their size queries; 8 and 9
//! take the compressor tag first. Everything else is identical, so adding a
//! version is one more row in the descriptor table.

use std::{
    ffi::c_void,
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ffi_types::{CompressOptions, NativeBool, COMPRESS_OPTIONS_SIZE};

/// `OodleLZ_Compress`
pub type CompressFn = unsafe extern "system" fn(
    compressor: i32,
    raw_buf: *const u8,
    raw_len: i64,
    comp_buf: *mut u8,
    level: i32,
    options: *const CompressOptions,
    dictionary_base: *const c_void,
    lrm: *const c_void,
    scratch_mem: *mut c_void,
    scratch_size: i64,
) -> i64;

/// `OodleLZ_Decompress`
pub type DecompressFn = unsafe extern "system" fn(
    comp_buf: *const u8,
    comp_buf_size: i64,
    raw_buf: *mut u8,
    raw_len: i64,
    fuzz_safe: i32,
    check_crc: i32,
    verbosity: i32,
    dec_buf_base: *mut u8,
    dec_buf_size: i64,
    fp_callback: *const c_void,
    callback_user_data: *mut c_void,
    decoder_memory: *mut c_void,
    decoder_memory_size: i64,
    thread_phase: i32,
) -> i64;

/// `OodleLZ_CompressOptions_GetDefault`
pub type DefaultOptionsFn =
    unsafe extern "system" fn(compressor: i32, level: i32) -> *const CompressOptions;

/// `OodleLZ_GetCompressedBufferSizeNeeded`, versions 5 and 6
pub type LegacyCompressedSizeFn = unsafe extern "system" fn(raw_size: i64) -> i64;

/// `OodleLZ_GetDecodeBufferSize`, versions 5 and 6
pub type LegacyDecodeSizeFn =
    unsafe extern "system" fn(raw_size: i64, corruption_possible: NativeBool) -> i64;

/// `OodleLZ_GetCompressedBufferSizeNeeded`, versions 8 and later
pub type CompressedSizeFn = unsafe extern "system" fn(compressor: i32, raw_size: i64) -> i64;

/// `OodleLZ_GetDecodeBufferSize`, versions 8 and later
pub type DecodeSizeFn = unsafe extern "system" fn(
    compressor: i32,
    raw_size: i64,
    corruption_possible: NativeBool,
) -> i64;

/// Major versions of oo2core this crate can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SupportedVersion {
    /// oo2core 2.5
    V5,
    /// oo2core 2.6
    V6,
    /// oo2core 2.8
    V8,
    /// oo2core 2.9
    V9,
}

impl SupportedVersion {
    /// Number of supported versions
    pub const COUNT: usize = 4;

    /// Probe order: newest first.
    pub const NEWEST_FIRST: [Self; Self::COUNT] = [Self::V9, Self::V8, Self::V6, Self::V5];

    /// Major version number as it appears in file names.
    pub const fn major(self) -> u32 {
        match self {
            Self::V5 => 5,
            Self::V6 => 6,
            Self::V8 => 8,
            Self::V9 => 9,
        }
    }

    /// Look up a version by its major number.
    pub fn from_major(major: u32) -> Option<Self> {
        Self::NEWEST_FIRST.into_iter().find(|v| v.major() == major)
    }

    /// Dense index, stable across the crate, for per-version tables.
    pub const fn index(self) -> usize {
        match self {
            Self::V5 => 0,
            Self::V6 => 1,
            Self::V8 => 2,
            Self::V9 => 3,
        }
    }

    /// Native ABI descriptor of this version.
    pub fn descriptor(self) -> &'static AbiDescriptor {
        &DESCRIPTORS[self.index()]
    }
}

impl fmt::Display for SupportedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oo2core {}", self.major())
    }
}

/// Shape of the two size-query exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeQueryAbi {
    /// `(rawSize)` and `(rawSize, corruptionPossible)`
    RawSizeOnly,
    /// `(compressor, rawSize)` and `(compressor, rawSize, corruptionPossible)`
    PerCompressor,
}

/// Export names, NUL-terminated for `dlsym`.
#[derive(Debug, Clone, Copy)]
pub struct SymbolNames {
    /// Compress entry point
    pub compress: &'static [u8],
    /// Decompress entry point
    pub decompress: &'static [u8],
    /// Default-options entry point
    pub default_options: &'static [u8],
    /// Compressed-buffer bound entry point
    pub compressed_size: &'static [u8],
    /// Decode-buffer bound entry point
    pub decode_size: &'static [u8],
}

const OODLELZ_SYMBOLS: SymbolNames = SymbolNames {
    compress: b"OodleLZ_Compress\0",
    decompress: b"OodleLZ_Decompress\0",
    default_options: b"OodleLZ_CompressOptions_GetDefault\0",
    compressed_size: b"OodleLZ_GetCompressedBufferSizeNeeded\0",
    decode_size: b"OodleLZ_GetDecodeBufferSize\0",
};

/// Static contract of one supported version.
#[derive(Debug)]
pub struct AbiDescriptor {
    /// Which version this describes
    pub version: SupportedVersion,
    /// Export names
    pub symbols: SymbolNames,
    /// Size-query signature shape
    pub size_query: SizeQueryAbi,
    /// Byte size of the options record this version reads
    pub options_size: usize,
}

const DESCRIPTOR_TABLE: [AbiDescriptor; SupportedVersion::COUNT] = [
    AbiDescriptor {
        version: SupportedVersion::V5,
        symbols: OODLELZ_SYMBOLS,
        size_query: SizeQueryAbi::RawSizeOnly,
        options_size: COMPRESS_OPTIONS_SIZE,
    },
    AbiDescriptor {
        version: SupportedVersion::V6,
        symbols: OODLELZ_SYMBOLS,
        size_query: SizeQueryAbi::RawSizeOnly,
        options_size: COMPRESS_OPTIONS_SIZE,
    },
    AbiDescriptor {
        version: SupportedVersion::V8,
        symbols: OODLELZ_SYMBOLS,
        size_query: SizeQueryAbi::PerCompressor,
        options_size: COMPRESS_OPTIONS_SIZE,
    },
    AbiDescriptor {
        version: SupportedVersion::V9,
        symbols: OODLELZ_SYMBOLS,
        size_query: SizeQueryAbi::PerCompressor,
        options_size: COMPRESS_OPTIONS_SIZE,
    },
];

static DESCRIPTORS: [AbiDescriptor; SupportedVersion::COUNT] = DESCRIPTOR_TABLE;

// Every descriptor must agree with the Rust-side record.
const _: () = {
    let mut i = 0;
    while i < DESCRIPTOR_TABLE.len() {
        let expected = std::mem::size_of::<CompressOptions>();
        assert!(DESCRIPTOR_TABLE[i].options_size == expected);
        i += 1;
    }
};

/// Size-query function pointers, in the shape the version exports.
#[derive(Debug, Clone, Copy)]
pub enum SizeQueryEntryPoints {
    /// Versions 5 and 6
    RawSizeOnly {
        /// Compressed-buffer bound
        compressed: LegacyCompressedSizeFn,
        /// Decode-buffer bound
        decode: LegacyDecodeSizeFn,
    },
    /// Versions 8 and later
    PerCompressor {
        /// Compressed-buffer bound
        compressed: CompressedSizeFn,
        /// Decode-buffer bound
        decode: DecodeSizeFn,
    },
}

impl SizeQueryEntryPoints {
    /// Shape these pointers implement.
    pub fn abi(&self) -> SizeQueryAbi {
        match self {
            Self::RawSizeOnly { .. } => SizeQueryAbi::RawSizeOnly,
            Self::PerCompressor { .. } => SizeQueryAbi::PerCompressor,
        }
    }
}

/// Resolved entry points of a loaded library.
///
/// Plain function pointers: `Copy`, `Send` and `Sync`. They stay valid only
/// while the library they came from is loaded, which the codec binding
/// guarantees by owning the library handle next to them.
#[derive(Clone, Copy)]
pub struct EntryPoints {
    /// Compress
    pub compress: CompressFn,
    /// Decompress
    pub decompress: DecompressFn,
    /// Default options
    pub default_options: DefaultOptionsFn,
    /// Size queries
    pub size_queries: SizeQueryEntryPoints,
}

/// Failure to load a library or resolve its exports.
#[derive(Debug, Error)]
pub enum BindError {
    /// The dynamic loader rejected the file
    #[error("failed to load {path}: {source}")]
    Load {
        /// File that was loaded
        path: PathBuf,
        /// Loader error
        #[source]
        source: libloading::Error,
    },

    /// A required export is missing
    #[error("{version}: missing export {symbol}: {source}")]
    MissingSymbol {
        /// Version being bound
        version: SupportedVersion,
        /// Export name without the trailing NUL
        symbol: String,
        /// Loader error
        #[source]
        source: libloading::Error,
    },
}

impl fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoints")
            .field("compress", &(self.compress as *const ()))
            .field("decompress", &(self.decompress as *const ()))
            .field("default_options", &(self.default_options as *const ()))
            .field("size_queries", &self.size_queries.abi())
            .finish()
    }
}

impl EntryPoints {
    /// Resolve the descriptor's exports from `lib`.
    ///
    /// # Safety
    ///
    /// `lib` must be a build of oo2core matching `descriptor.version`; the
    /// resolved pointers are typed by the descriptor, not checked. They must
    /// not be called after `lib` is dropped.
    pub unsafe fn resolve(
        lib: &libloading::Library,
        descriptor: &AbiDescriptor,
    ) -> Result<Self, BindError> {
        let symbols = &descriptor.symbols;
        let version = descriptor.version;

        let compress: CompressFn = unsafe { lookup(lib, version, symbols.compress)? };
        let decompress: DecompressFn = unsafe { lookup(lib, version, symbols.decompress)? };
        let default_options: DefaultOptionsFn =
            unsafe { lookup(lib, version, symbols.default_options)? };

        let size_queries = match descriptor.size_query {
            SizeQueryAbi::RawSizeOnly => SizeQueryEntryPoints::RawSizeOnly {
                compressed: unsafe { lookup(lib, version, symbols.compressed_size)? },
                decode: unsafe { lookup(lib, version, symbols.decode_size)? },
            },
            SizeQueryAbi::PerCompressor => SizeQueryEntryPoints::PerCompressor {
                compressed: unsafe { lookup(lib, version, symbols.compressed_size)? },
                decode: unsafe { lookup(lib, version, symbols.decode_size)? },
            },
        };

        Ok(Self {
            compress,
            decompress,
            default_options,
            size_queries,
        })
    }
}

/// Load `path` with the platform dynamic loader.
pub(crate) fn open_library(path: &Path) -> Result<libloading::Library, BindError> {
    // Safety: runs the library's initializers. The file is an oo2core build
    // placed next to the host program by its operator, not an arbitrary blob.
    unsafe { libloading::Library::new(path) }.map_err(|source| BindError::Load {
        path: path.to_path_buf(),
        source,
    })
}

unsafe fn lookup<T: Copy>(
    lib: &libloading::Library,
    version: SupportedVersion,
    symbol: &[u8],
) -> Result<T, BindError> {
    // Copy the pointer out of the Symbol; the caller keeps `lib` alive.
    let sym: libloading::Symbol<'_, T> =
        unsafe { lib.get(symbol) }.map_err(|source| BindError::MissingSymbol {
            version,
            symbol: String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol))
                .into_owned(),
            source,
        })?;
    Ok(*sym)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first_order() {
        let majors: Vec<u32> = SupportedVersion::NEWEST_FIRST
            .iter()
            .map(|v| v.major())
            .collect();
        assert_eq!(majors, vec![9, 8, 6, 5]);
    }

    #[test]
    fn test_descriptor_table_is_indexed_by_version() {
        for version in SupportedVersion::NEWEST_FIRST {
            assert_eq!(version.descriptor().version, version);
            assert_eq!(version.descriptor().options_size, 48);
        }
    }

    #[test]
    fn test_size_query_shapes() {
        assert_eq!(
            SupportedVersion::V5.descriptor().size_query,
            SizeQueryAbi::RawSizeOnly
        );
        assert_eq!(
            SupportedVersion::V6.descriptor().size_query,
            SizeQueryAbi::RawSizeOnly
        );
        assert_eq!(
            SupportedVersion::V8.descriptor().size_query,
            SizeQueryAbi::PerCompressor
        );
        assert_eq!(
            SupportedVersion::V9.descriptor().size_query,
            SizeQueryAbi::PerCompressor
        );
    }

    #[test]
    fn test_from_major() {
        assert_eq!(SupportedVersion::from_major(8), Some(SupportedVersion::V8));
        assert_eq!(SupportedVersion::from_major(7), None);
    }

    #[test]
    fn test_symbols_are_nul_terminated() {
        let s = SupportedVersion::V9.descriptor().symbols;
        for name in [
            s.compress,
            s.decompress,
            s.default_options,
            s.compressed_size,
            s.decode_size,
        ] {
            assert_eq!(name.last(), Some(&0));
        }
    }

    #[test]
    fn test_open_missing_library_fails() {
        let path = std::env::temp_dir().join("oodle-dyn-does-not-exist.so.9");
        let err = open_library(&path).unwrap_err();
        assert!(matches!(err, BindError::Load { .. }));
        assert!(err.to_string().contains("oodle-dyn-does-not-exist"));
    }
}
