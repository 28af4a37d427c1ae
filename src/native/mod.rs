//! Native contract of the oo2core codec library.
//!
//! `ffi_types` holds the plain-data side of the contract (tag enums, the
//! options record and its byte layout). `abi` holds the per-version
//! descriptors: which entry points each supported major version exports,
//! with which signatures, and how they are resolved from a loaded library.
//!
//! Nothing in here makes decisions. The probe and the codec binding consume
//! these tables.

pub mod abi;
pub mod ffi_types;

pub use abi::{
    AbiDescriptor, BindError, EntryPoints, SizeQueryAbi, SizeQueryEntryPoints, SupportedVersion,
};
pub use ffi_types::{
    make_seek_chunk_len, CheckCrc, CodecVariant, CompressOptions, CompressionLevel,
    DecodeThreadPhase, FuzzSafe, NativeBool, OptionsViolation, Profile, UnknownTag, Verbosity,
    COMPRESS_OPTIONS_SIZE, OODLELZ_BLOCK_LEN, OODLELZ_FAILED, OODLELZ_LOCALDICTIONARYSIZE_MAX,
};
