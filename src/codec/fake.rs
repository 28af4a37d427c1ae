#![expect(
    unsafe_code,
    reason = "in-process stand-in for the native codec exports"
)]

//! In-process stand-in for an oo2core build.
//!
//! Implements the native export signatures as `extern "system"` functions so
//! bindings can be exercised without the proprietary binaries. The "codec"
//! stores its input verbatim behind a header:
//!
//! ```text
//! [variant: u8][flags: u8][raw_len: u64 LE][raw bytes][fnv1a: u32 LE, if FLAG_CRC]
//! ```

use std::{cell::Cell, ffi::c_void, ptr::null, slice};

use super::binding::CodecBinding;
use crate::native::{
    CodecVariant, CompressOptions, CompressionLevel, EntryPoints, NativeBool, SizeQueryAbi,
    SizeQueryEntryPoints, SupportedVersion, OODLELZ_BLOCK_LEN,
};

pub(crate) const HEADER_LEN: usize = 10;
const FLAG_CRC: u8 = 1;
const CRC_LEN: usize = 4;
const PADDING: i64 = 64;
const PER_COMPRESSOR_EXTRA: i64 = 8;

pub(crate) static FAKE_DEFAULTS: CompressOptions = CompressOptions {
    verbosity: 0,
    min_match_len: 4,
    seek_chunk_reset: NativeBool::FALSE,
    seek_chunk_len: OODLELZ_BLOCK_LEN,
    profile: 0,
    dictionary_size: 0,
    space_speed_tradeoff_bytes: 256,
    max_huffmans_per_chunk: 2,
    send_quantum_crcs: NativeBool::FALSE,
    max_local_dictionary_size: 1 << 24,
    make_long_range_matcher: 1,
    match_table_size_log2: 0,
};

thread_local! {
    static LAST_OPTIONS: Cell<Option<CompressOptions>> = const { Cell::new(None) };
}

/// Options record seen by the most recent compress on this thread.
pub(crate) fn last_options() -> Option<CompressOptions> {
    LAST_OPTIONS.with(Cell::get)
}

fn checksum(data: &[u8]) -> u32 {
    data.iter().fold(0x811c_9dc5u32, |h, &b| {
        (h ^ u32::from(b)).wrapping_mul(0x0100_0193)
    })
}

fn is_fuzz_safe(variant: CodecVariant) -> bool {
    matches!(
        variant,
        CodecVariant::None
            | CodecVariant::Kraken
            | CodecVariant::Mermaid
            | CodecVariant::Selkie
            | CodecVariant::Leviathan
            | CodecVariant::Hydra
    )
}

unsafe extern "system" fn fake_compress(
    compressor: i32,
    raw_buf: *const u8,
    raw_len: i64,
    comp_buf: *mut u8,
    level: i32,
    options: *const CompressOptions,
    _dictionary_base: *const c_void,
    _lrm: *const c_void,
    _scratch_mem: *mut c_void,
    _scratch_size: i64,
) -> i64 {
    let variant = match CodecVariant::try_from(compressor) {
        Ok(v) if v != CodecVariant::Invalid => v,
        _ => return 0,
    };
    if raw_len <= 0
        || raw_buf.is_null()
        || comp_buf.is_null()
        || options.is_null()
        || CompressionLevel::try_from(level).is_err()
    {
        return 0;
    }

    let options = unsafe { *options };
    LAST_OPTIONS.with(|last| last.set(Some(options)));

    let raw = unsafe { slice::from_raw_parts(raw_buf, raw_len as usize) };
    let crc = options.send_quantum_crcs.get();
    let total = HEADER_LEN + raw.len() + if crc { CRC_LEN } else { 0 };
    let out = unsafe { slice::from_raw_parts_mut(comp_buf, total) };

    out[0] = variant.raw() as u8;
    out[1] = if crc { FLAG_CRC } else { 0 };
    out[2..HEADER_LEN].copy_from_slice(&(raw.len() as u64).to_le_bytes());
    out[HEADER_LEN..HEADER_LEN + raw.len()].copy_from_slice(raw);
    if crc {
        out[HEADER_LEN + raw.len()..].copy_from_slice(&checksum(raw).to_le_bytes());
    }

    total as i64
}

unsafe extern "system" fn fake_decompress(
    comp_buf: *const u8,
    comp_buf_size: i64,
    raw_buf: *mut u8,
    raw_len: i64,
    fuzz_safe: i32,
    check_crc: i32,
    _verbosity: i32,
    _dec_buf_base: *mut u8,
    _dec_buf_size: i64,
    _fp_callback: *const c_void,
    _callback_user_data: *mut c_void,
    _decoder_memory: *mut c_void,
    _decoder_memory_size: i64,
    _thread_phase: i32,
) -> i64 {
    if comp_buf.is_null()
        || raw_buf.is_null()
        || comp_buf_size < HEADER_LEN as i64
        || raw_len <= 0
    {
        return 0;
    }

    let comp = unsafe { slice::from_raw_parts(comp_buf, comp_buf_size as usize) };
    let Ok(variant) = CodecVariant::try_from(i32::from(comp[0])) else {
        return 0;
    };
    if fuzz_safe != 0 && !is_fuzz_safe(variant) {
        return 0;
    }

    let stored = u64::from_le_bytes(comp[2..HEADER_LEN].try_into().unwrap());
    if stored != raw_len as u64 {
        return 0;
    }
    let stored = stored as usize;

    let has_crc = comp[1] & FLAG_CRC != 0;
    let needed = HEADER_LEN + stored + if has_crc { CRC_LEN } else { 0 };
    if comp.len() < needed {
        return 0;
    }

    let payload = &comp[HEADER_LEN..HEADER_LEN + stored];
    if check_crc != 0 && has_crc {
        let expected = u32::from_le_bytes(comp[HEADER_LEN + stored..needed].try_into().unwrap());
        if checksum(payload) != expected {
            return 0;
        }
    }

    let raw = unsafe { slice::from_raw_parts_mut(raw_buf, stored) };
    raw.copy_from_slice(payload);
    raw_len
}

unsafe extern "system" fn fake_default_options(
    compressor: i32,
    level: i32,
) -> *const CompressOptions {
    // Legacy codec without defaults in this build.
    if compressor == CodecVariant::Lza.raw() {
        return null();
    }
    if CodecVariant::try_from(compressor).is_err() || CompressionLevel::try_from(level).is_err() {
        return null();
    }
    &FAKE_DEFAULTS
}

unsafe extern "system" fn fake_legacy_compressed_size(raw_size: i64) -> i64 {
    raw_size + PADDING
}

unsafe extern "system" fn fake_legacy_decode_size(
    raw_size: i64,
    corruption_possible: NativeBool,
) -> i64 {
    raw_size + headroom(corruption_possible)
}

fn headroom(corruption_possible: NativeBool) -> i64 {
    if corruption_possible.get() {
        PADDING
    } else {
        0
    }
}

unsafe extern "system" fn fake_compressed_size(_compressor: i32, raw_size: i64) -> i64 {
    raw_size + PADDING + PER_COMPRESSOR_EXTRA
}

unsafe extern "system" fn fake_decode_size(
    _compressor: i32,
    raw_size: i64,
    corruption_possible: NativeBool,
) -> i64 {
    raw_size + headroom(corruption_possible)
}

unsafe extern "system" fn overreporting_compress(
    _compressor: i32,
    _raw_buf: *const u8,
    _raw_len: i64,
    _comp_buf: *mut u8,
    _level: i32,
    _options: *const CompressOptions,
    _dictionary_base: *const c_void,
    _lrm: *const c_void,
    _scratch_mem: *mut c_void,
    _scratch_size: i64,
) -> i64 {
    i64::MAX
}

/// Entry points shaped like `abi`.
pub(crate) fn entry_points(abi: SizeQueryAbi) -> EntryPoints {
    let size_queries = match abi {
        SizeQueryAbi::RawSizeOnly => SizeQueryEntryPoints::RawSizeOnly {
            compressed: fake_legacy_compressed_size,
            decode: fake_legacy_decode_size,
        },
        SizeQueryAbi::PerCompressor => SizeQueryEntryPoints::PerCompressor {
            compressed: fake_compressed_size,
            decode: fake_decode_size,
        },
    };

    EntryPoints {
        compress: fake_compress,
        decompress: fake_decompress,
        default_options: fake_default_options,
        size_queries,
    }
}

/// Binding of `version` backed by the fake exports.
pub(crate) fn binding(version: SupportedVersion) -> CodecBinding {
    let entry = entry_points(version.descriptor().size_query);
    // Safety: the fake functions implement every export with its native
    // signature and live for the whole process.
    unsafe { CodecBinding::from_entry_points(version, entry) }
}

/// Binding whose compress claims more output than any buffer can hold.
pub(crate) fn overreporting_binding() -> CodecBinding {
    let entry = EntryPoints {
        compress: overreporting_compress,
        ..entry_points(SizeQueryAbi::PerCompressor)
    };
    // Safety: as in `binding`; the compress export writes nothing.
    unsafe { CodecBinding::from_entry_points(SupportedVersion::V9, entry) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_follows_descriptor() {
        for version in SupportedVersion::NEWEST_FIRST {
            let entry = entry_points(version.descriptor().size_query);
            assert_eq!(entry.size_queries.abi(), version.descriptor().size_query);
        }
    }

    #[test]
    fn test_checksum_is_stable() {
        assert_eq!(checksum(b""), 0x811c_9dc5);
        assert_ne!(checksum(b"a"), checksum(b"b"));
    }
}
