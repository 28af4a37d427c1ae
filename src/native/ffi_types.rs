//! Plain-data types shared with the oo2core binaries.
//!
//! Every type here crosses the foreign boundary, either as a raw integer tag
//! or by address. The options record is read and written by native code, so
//! its layout is pinned by compile-time assertions at the bottom of this file.
//!
//! Tag enums are never handed to native code as Rust enums. They are
//! converted to `i32` at the call site, and values coming back from native
//! code stay raw integers until [`TryFrom<i32>`] validates them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Return value of compress and decompress on failure.
pub const OODLELZ_FAILED: i64 = 0;

/// Number of raw bytes per block. Seek chunks are whole multiples of it.
pub const OODLELZ_BLOCK_LEN: i32 = 1 << 18;

/// Upper bound of [`CompressOptions::max_local_dictionary_size`].
pub const OODLELZ_LOCALDICTIONARYSIZE_MAX: i32 = 1 << 30;

/// Byte size of the native `OodleLZ_CompressOptions` record.
pub const COMPRESS_OPTIONS_SIZE: usize = 48;

/// A raw integer that does not name any known tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {kind} tag: {value}")]
pub struct UnknownTag {
    /// Which tag family was being parsed
    pub kind: &'static str,
    /// The offending raw value (or name, for string parsing)
    pub value: String,
}

impl UnknownTag {
    fn new(kind: &'static str, value: impl ToString) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// 32-bit boolean as the native library defines it (`OO_BOOL`).
///
/// A Rust `bool` is one byte wide; the native record and the size-query
/// entry points use a full `i32`. Any non-zero value reads as true.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NativeBool(i32);

impl NativeBool {
    /// Native false (0)
    pub const FALSE: Self = Self(0);
    /// Native true (1)
    pub const TRUE: Self = Self(1);

    /// Interpret the raw value.
    pub const fn get(self) -> bool {
        self.0 != 0
    }

    /// Raw integer as stored in memory.
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl From<bool> for NativeBool {
    fn from(value: bool) -> Self {
        if value {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }
}

impl From<NativeBool> for bool {
    fn from(value: NativeBool) -> Self {
        value.get()
    }
}

impl fmt::Debug for NativeBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Compression family selected at compress time (`OodleLZ_Compressor`).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecVariant {
    /// Not a codec; rejected by compress
    Invalid = -1,
    /// Stored, no compression
    None = 3,
    /// High compression, fast decode
    Kraken = 8,
    /// Highest compression of the newer codecs
    Leviathan = 13,
    /// Faster decode than Kraken, lower ratio
    Mermaid = 9,
    /// Fastest decode, lowest ratio
    Selkie = 11,
    /// Picks among the newer codecs per block
    Hydra = 12,
    /// Legacy
    BitKnit = 10,
    /// Legacy
    Lzb16 = 4,
    /// Legacy
    Lzna = 7,
    /// Legacy
    Lzh = 0,
    /// Legacy
    Lzhlw = 1,
    /// Legacy
    Lznib = 2,
    /// Legacy
    Lzblw = 5,
    /// Legacy
    Lza = 6,
}

impl CodecVariant {
    /// Every tag, `Invalid` included.
    pub const ALL: [Self; 15] = [
        Self::Invalid,
        Self::None,
        Self::Kraken,
        Self::Leviathan,
        Self::Mermaid,
        Self::Selkie,
        Self::Hydra,
        Self::BitKnit,
        Self::Lzb16,
        Self::Lzna,
        Self::Lzh,
        Self::Lzhlw,
        Self::Lznib,
        Self::Lzblw,
        Self::Lza,
    ];

    /// Raw tag passed to the native call.
    pub const fn raw(self) -> i32 {
        self as i32
    }

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::None => "none",
            Self::Kraken => "kraken",
            Self::Leviathan => "leviathan",
            Self::Mermaid => "mermaid",
            Self::Selkie => "selkie",
            Self::Hydra => "hydra",
            Self::BitKnit => "bitknit",
            Self::Lzb16 => "lzb16",
            Self::Lzna => "lzna",
            Self::Lzh => "lzh",
            Self::Lzhlw => "lzhlw",
            Self::Lznib => "lznib",
            Self::Lzblw => "lzblw",
            Self::Lza => "lza",
        }
    }
}

impl TryFrom<i32> for CodecVariant {
    type Error = UnknownTag;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|v| v.raw() == value)
            .ok_or_else(|| UnknownTag::new("compressor", value))
    }
}

impl FromStr for CodecVariant {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.name() == lower)
            .ok_or_else(|| UnknownTag::new("compressor", s))
    }
}

impl fmt::Display for CodecVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Effort dial (`OodleLZ_CompressionLevel`).
///
/// Ordered fastest to slowest by discriminant, except that the negative
/// hyper-fast tiers are faster than every positive tier.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompressionLevel {
    /// Copy only
    None = 0,
    /// Fastest greedy parse
    SuperFast = 1,
    /// Fast greedy parse
    VeryFast = 2,
    /// Lazy parse
    Fast = 3,
    /// Default tradeoff
    #[default]
    Normal = 4,
    /// Optimal parse, level 1
    Optimal1 = 5,
    /// Optimal parse, level 2
    Optimal2 = 6,
    /// Optimal parse, level 3
    Optimal3 = 7,
    /// Optimal parse, level 4
    Optimal4 = 8,
    /// Optimal parse, level 5
    Optimal5 = 9,
    /// Faster than SuperFast
    HyperFast1 = -1,
    /// Faster than HyperFast1
    HyperFast2 = -2,
    /// Faster than HyperFast2
    HyperFast3 = -3,
    /// Fastest
    HyperFast4 = -4,
}

impl CompressionLevel {
    /// Alias of [`Self::HyperFast1`]
    pub const HYPER_FAST: Self = Self::HyperFast1;
    /// Alias of [`Self::Optimal2`]
    pub const OPTIMAL: Self = Self::Optimal2;
    /// Alias of [`Self::Optimal5`]
    pub const MAX: Self = Self::Optimal5;
    /// Alias of [`Self::HyperFast4`]
    pub const MIN: Self = Self::HyperFast4;

    /// Every level, fastest first.
    pub const ALL: [Self; 14] = [
        Self::HyperFast4,
        Self::HyperFast3,
        Self::HyperFast2,
        Self::HyperFast1,
        Self::None,
        Self::SuperFast,
        Self::VeryFast,
        Self::Fast,
        Self::Normal,
        Self::Optimal1,
        Self::Optimal2,
        Self::Optimal3,
        Self::Optimal4,
        Self::Optimal5,
    ];

    /// Raw tag passed to the native call.
    pub const fn raw(self) -> i32 {
        self as i32
    }

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SuperFast => "superfast",
            Self::VeryFast => "veryfast",
            Self::Fast => "fast",
            Self::Normal => "normal",
            Self::Optimal1 => "optimal1",
            Self::Optimal2 => "optimal2",
            Self::Optimal3 => "optimal3",
            Self::Optimal4 => "optimal4",
            Self::Optimal5 => "optimal5",
            Self::HyperFast1 => "hyperfast1",
            Self::HyperFast2 => "hyperfast2",
            Self::HyperFast3 => "hyperfast3",
            Self::HyperFast4 => "hyperfast4",
        }
    }
}

impl TryFrom<i32> for CompressionLevel {
    type Error = UnknownTag;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|l| l.raw() == value)
            .ok_or_else(|| UnknownTag::new("compression level", value))
    }
}

impl FromStr for CompressionLevel {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match lower.as_str() {
            "hyperfast" => return Ok(Self::HYPER_FAST),
            "optimal" => return Ok(Self::OPTIMAL),
            "max" => return Ok(Self::MAX),
            "min" => return Ok(Self::MIN),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|l| l.name() == lower)
            .ok_or_else(|| UnknownTag::new("compression level", s))
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the decoder refuses codecs not hardened against corrupt input.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FuzzSafe {
    /// Allow every codec
    No = 0,
    /// Fail on non-fuzz-safe codecs
    #[default]
    Yes = 1,
}

/// Whether the decoder verifies per-quantum CRCs.
///
/// Only meaningful for streams encoded with
/// [`CompressOptions::send_quantum_crcs`] set. Asking for a check on a
/// stream without CRCs is silently ignored by the native decoder.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CheckCrc {
    /// Skip verification
    #[default]
    No = 0,
    /// Verify quantum CRCs
    Yes = 1,
}

/// Native log verbosity.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Silent
    #[default]
    None = 0,
    /// Errors only
    Minimal = 1,
    /// Some progress
    Some = 2,
    /// Everything
    Lots = 3,
}

/// Phase selection for two-thread decoding.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecodeThreadPhase {
    /// First half of a phased decode
    Phase1 = 1,
    /// Second half of a phased decode
    Phase2 = 2,
    /// Both phases on the calling thread
    #[default]
    All = 3,
}

impl DecodeThreadPhase {
    /// Single-threaded decode, same as [`Self::All`]
    pub const UNTHREADED: Self = Self::All;
}

/// Decoder profile the encoder targets.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Profile {
    /// Full-featured decoders
    #[default]
    Main = 0,
    /// Reduced-memory decoders
    Reduced = 1,
}

/// Compressor options record (`OodleLZ_CompressOptions`).
///
/// Field order and widths match the native definition exactly: twelve
/// 4-byte fields, no padding, 48 bytes total. Booleans are [`NativeBool`].
/// The profile is kept as a raw tag because native code fills it in.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressOptions {
    /// Native log verbosity during compression
    pub verbosity: u32,
    /// Minimum match length. Can raise the compressor's default, never lower it.
    pub min_match_len: i32,
    /// Make seek chunks independently decodable
    pub seek_chunk_reset: NativeBool,
    /// Seek chunk length; power of two and at least [`OODLELZ_BLOCK_LEN`]
    pub seek_chunk_len: i32,
    /// Decoder profile tag, see [`Profile`]
    pub profile: i32,
    /// Maximum match offset; <= 0 means the whole buffer
    pub dictionary_size: i32,
    /// Bytes that must be saved to accept a speed-decreasing decision
    pub space_speed_tradeoff_bytes: i32,
    /// Maximum Huffman tables per chunk
    pub max_huffmans_per_chunk: i32,
    /// Embed a CRC per compressed quantum
    pub send_quantum_crcs: NativeBool,
    /// Optimal parsers: local dictionary before the long range matcher kicks in
    pub max_local_dictionary_size: i32,
    /// Optimal parsers: search beyond the local dictionary with an LRM
    pub make_long_range_matcher: i32,
    /// Match finder table size; 0 for the compressor's default
    pub match_table_size_log2: i32,
}

/// A [`CompressOptions`] field that breaks a documented invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsViolation {
    /// Local dictionary size is not a power of two or exceeds the maximum
    #[error("max_local_dictionary_size {0} must be a power of two <= 2^30")]
    LocalDictionarySize(i32),

    /// Seek chunk length is not a power of two or is below the block length
    #[error("seek_chunk_len {0} must be a power of two >= {OODLELZ_BLOCK_LEN}")]
    SeekChunkLen(i32),
}

impl CompressOptions {
    /// Decoder profile, if the raw tag is recognized.
    pub fn profile(&self) -> Option<Profile> {
        match self.profile {
            0 => Some(Profile::Main),
            1 => Some(Profile::Reduced),
            _ => None,
        }
    }

    /// Enable independent seek chunks of `len` raw bytes.
    pub fn with_seek_chunks(mut self, len: i32) -> Self {
        self.seek_chunk_reset = NativeBool::TRUE;
        self.seek_chunk_len = len;
        self
    }

    /// Toggle per-quantum CRCs.
    pub fn with_quantum_crcs(mut self, enabled: bool) -> Self {
        self.send_quantum_crcs = enabled.into();
        self
    }

    /// Check the documented field invariants.
    ///
    /// The codec binding never calls this: semantic checks belong to the
    /// native library. It exists for callers that want to fail early.
    pub fn check_invariants(&self) -> Result<(), OptionsViolation> {
        let local = self.max_local_dictionary_size;
        if !is_power_of_two(local) || local > OODLELZ_LOCALDICTIONARYSIZE_MAX {
            return Err(OptionsViolation::LocalDictionarySize(local));
        }

        if self.seek_chunk_reset.get()
            && (!is_power_of_two(self.seek_chunk_len) || self.seek_chunk_len < OODLELZ_BLOCK_LEN)
        {
            return Err(OptionsViolation::SeekChunkLen(self.seek_chunk_len));
        }

        Ok(())
    }
}

fn is_power_of_two(value: i32) -> bool {
    value > 0 && (value & (value - 1)) == 0
}

/// Pick a seek chunk length yielding roughly `desired_seek_points` chunks.
///
/// The result is a power of two clamped to
/// `OODLELZ_BLOCK_LEN..=OODLELZ_LOCALDICTIONARYSIZE_MAX`.
pub fn make_seek_chunk_len(raw_len: u64, desired_seek_points: u32) -> i32 {
    let points = u64::from(desired_seek_points.max(1));
    let target = (raw_len / points).max(OODLELZ_BLOCK_LEN as u64);
    let rounded = target
        .checked_next_power_of_two()
        .unwrap_or(OODLELZ_LOCALDICTIONARYSIZE_MAX as u64);
    rounded.min(OODLELZ_LOCALDICTIONARYSIZE_MAX as u64) as i32
}

// Layout pins for the record native code reads and writes.
const _: () = {
    use std::mem::{align_of, offset_of, size_of};

    assert!(size_of::<NativeBool>() == 4);
    assert!(size_of::<CompressOptions>() == COMPRESS_OPTIONS_SIZE);
    assert!(align_of::<CompressOptions>() == 4);
    assert!(offset_of!(CompressOptions, verbosity) == 0);
    assert!(offset_of!(CompressOptions, min_match_len) == 4);
    assert!(offset_of!(CompressOptions, seek_chunk_reset) == 8);
    assert!(offset_of!(CompressOptions, seek_chunk_len) == 12);
    assert!(offset_of!(CompressOptions, profile) == 16);
    assert!(offset_of!(CompressOptions, dictionary_size) == 20);
    assert!(
        offset_of!(CompressOptions, space_speed_tradeoff_bytes) == 24
    );
    assert!(offset_of!(CompressOptions, max_huffmans_per_chunk) == 28);
    assert!(offset_of!(CompressOptions, send_quantum_crcs) == 32);
    assert!(offset_of!(CompressOptions, max_local_dictionary_size) == 36);
    assert!(offset_of!(CompressOptions, make_long_range_matcher) == 40);
    assert!(offset_of!(CompressOptions, match_table_size_log2) == 44);
};
