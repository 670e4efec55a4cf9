//! Case data compression: bytecode and zlib (`.zsav`).
//!
//! Bytecode compression groups eight one-byte commands into a block. Each
//! command describes one 8-byte slot of case data:
//!
//! | code    | meaning                                   |
//! |---------|-------------------------------------------|
//! | 0       | padding, ignored                          |
//! | 1..=251 | the number `code - bias`                  |
//! | 252     | end of data                               |
//! | 253     | the slot is stored verbatim after the block |
//! | 254     | eight spaces                              |
//! | 255     | system-missing                            |

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use super::error::{Result, SavError};
use super::header::Cursor;
use super::types::Endian;

const CODE_PADDING: u8 = 0;
const CODE_END: u8 = 252;
const CODE_RAW: u8 = 253;
const CODE_SPACES: u8 = 254;
const CODE_SYSMIS: u8 = 255;

/// Uncompressed bytes per zlib block written by [`deflate_zsav`].
pub(crate) const ZLIB_BLOCK_SIZE: usize = 0x003F_F000;

/// Length of the zlib header that precedes the blocks.
const ZHEADER_LEN: usize = 24;

/// One 8-byte slot of case data, in file byte order.
pub(crate) type Slot = [u8; 8];

/// Split uncompressed case data into slots.
///
/// `offset` is the file position of `data`. Bytes past `max_slots` slots
/// are ignored, but a partial slot before that limit is an error.
pub(crate) fn split_raw(data: &[u8], offset: usize, max_slots: Option<usize>) -> Result<Vec<Slot>> {
    let usable = max_slots.map_or(data.len(), |n| data.len().min(n.saturating_mul(8)));
    let whole = usable / 8 * 8;
    if whole != usable {
        return Err(SavError::UnexpectedEof {
            offset: offset + whole,
            needed: 8,
        });
    }
    Ok(data[..whole]
        .chunks_exact(8)
        .map(|chunk| {
            let mut slot = [0u8; 8];
            slot.copy_from_slice(chunk);
            slot
        })
        .collect())
}

/// Expand a bytecode stream into slots.
///
/// Decoding stops at the end code, at the end of the data, or once
/// `max_slots` slots have been produced.
pub(crate) fn decode_bytecode(
    data: &[u8],
    bias: f64,
    endian: Endian,
    sysmis: f64,
    max_slots: Option<usize>,
) -> Result<Vec<Slot>> {
    let limit = max_slots.unwrap_or(usize::MAX);
    let sysmis_slot = endian.f64_bytes(sysmis);
    let mut slots = Vec::new();
    let mut pos = 0usize;

    'blocks: while slots.len() < limit && pos + 8 <= data.len() {
        let mut commands = [0u8; 8];
        commands.copy_from_slice(&data[pos..pos + 8]);
        pos += 8;

        for code in commands {
            if slots.len() >= limit {
                break 'blocks;
            }
            match code {
                CODE_PADDING => {}
                CODE_END => break 'blocks,
                CODE_RAW => {
                    let raw = data.get(pos..pos + 8).ok_or(SavError::UnexpectedEof {
                        offset: pos,
                        needed: 8,
                    })?;
                    let mut slot = [0u8; 8];
                    slot.copy_from_slice(raw);
                    slots.push(slot);
                    pos += 8;
                }
                CODE_SPACES => slots.push([b' '; 8]),
                CODE_SYSMIS => slots.push(sysmis_slot),
                n => slots.push(endian.f64_bytes(f64::from(n) - bias)),
            }
        }
    }

    Ok(slots)
}

/// Incremental bytecode compressor used by the writer.
#[derive(Debug)]
pub(crate) struct BytecodeEncoder {
    bias: f64,
    endian: Endian,
    out: Vec<u8>,
    commands: Vec<u8>,
    pending: Vec<u8>,
}

impl BytecodeEncoder {
    pub(crate) fn new(bias: f64, endian: Endian) -> Self {
        Self {
            bias,
            endian,
            out: Vec::new(),
            commands: Vec::with_capacity(8),
            pending: Vec::with_capacity(64),
        }
    }

    fn push_command(&mut self, code: u8) {
        self.commands.push(code);
        if self.commands.len() == 8 {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.commands.is_empty() {
            return;
        }
        self.commands.resize(8, CODE_PADDING);
        self.out.extend_from_slice(&self.commands);
        self.out.append(&mut self.pending);
        self.commands.clear();
    }

    /// Encode a numeric slot; `None` is system-missing.
    pub(crate) fn push_number(&mut self, value: Option<f64>) {
        match value {
            None => self.push_command(CODE_SYSMIS),
            Some(v) => {
                let code = v + self.bias;
                if v.fract() == 0.0 && (1.0..=251.0).contains(&code) {
                    self.push_command(code as u8);
                } else {
                    self.pending.extend_from_slice(&self.endian.f64_bytes(v));
                    self.push_command(CODE_RAW);
                }
            }
        }
    }

    /// Encode an 8-byte string chunk.
    pub(crate) fn push_text(&mut self, chunk: Slot) {
        if chunk == [b' '; 8] {
            self.push_command(CODE_SPACES);
        } else {
            self.pending.extend_from_slice(&chunk);
            self.push_command(CODE_RAW);
        }
    }

    /// Finish the stream, padding the last command block.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.flush();
        self.out
    }
}

/// Inflate the blocks of a `.zsav` file into a bytecode stream.
pub(crate) fn inflate_zsav(data: &[u8], offset: usize, endian: Endian) -> Result<Vec<u8>> {
    let mut header = Cursor::new(data, offset, endian);
    let _zheader_offset = header.i64()?;
    let ztrailer_offset = header.i64()?;
    let _ztrailer_len = header.i64()?;

    let trailer_start = usize::try_from(ztrailer_offset)
        .map_err(|_| SavError::invalid_format("negative zlib trailer offset"))?;
    let mut trailer = Cursor::new(data, trailer_start, endian);
    let _bias = trailer.i64()?;
    let _zero = trailer.i64()?;
    let _block_size = trailer.i32()?;
    let n_blocks = trailer.count("zlib block count")?;

    let mut out = Vec::new();
    for block in 0..n_blocks {
        let _uncompressed_offset = trailer.i64()?;
        let compressed_offset = usize::try_from(trailer.i64()?)
            .map_err(|_| SavError::invalid_format("negative zlib block offset"))?;
        let uncompressed_size = trailer.count("zlib uncompressed size")?;
        let compressed_size = trailer.count("zlib compressed size")?;

        let compressed = data
            .get(compressed_offset..compressed_offset + compressed_size)
            .ok_or(SavError::UnexpectedEof {
                offset: compressed_offset,
                needed: compressed_size,
            })?;

        let before = out.len();
        ZlibDecoder::new(compressed)
            .read_to_end(&mut out)
            .map_err(|source| SavError::Inflate { block, source })?;
        if out.len() - before != uncompressed_size {
            return Err(SavError::invalid_format(format!(
                "zlib block {block} inflated to {} bytes, expected {uncompressed_size}",
                out.len() - before
            )));
        }
    }
    Ok(out)
}

/// Wrap a bytecode stream in the `.zsav` layout: zlib header, compressed
/// blocks, then the trailer that indexes them. `offset` is the file position
/// where the zlib header will be written.
pub(crate) fn deflate_zsav(
    stream: &[u8],
    offset: usize,
    bias: f64,
    endian: Endian,
) -> Result<Vec<u8>> {
    let mut blocks = Vec::new();
    for chunk in stream.chunks(ZLIB_BLOCK_SIZE) {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(chunk)?;
        blocks.push((chunk.len(), encoder.finish()?));
    }

    let compressed_total: usize = blocks.iter().map(|(_, c)| c.len()).sum();
    let trailer_offset = offset + ZHEADER_LEN + compressed_total;
    let trailer_len = 24 + 24 * blocks.len();

    let mut out = Vec::with_capacity(ZHEADER_LEN + compressed_total + trailer_len);
    out.extend_from_slice(&endian.i64_bytes(offset as i64));
    out.extend_from_slice(&endian.i64_bytes(trailer_offset as i64));
    out.extend_from_slice(&endian.i64_bytes(trailer_len as i64));
    for (_, compressed) in &blocks {
        out.extend_from_slice(compressed);
    }

    out.extend_from_slice(&endian.i64_bytes(-(bias as i64)));
    out.extend_from_slice(&endian.i64_bytes(0));
    out.extend_from_slice(&endian.i32_bytes(ZLIB_BLOCK_SIZE as i32));
    out.extend_from_slice(&endian.i32_bytes(blocks.len() as i32));

    let mut uncompressed_offset = offset;
    let mut compressed_offset = offset + ZHEADER_LEN;
    for (raw_len, compressed) in &blocks {
        out.extend_from_slice(&endian.i64_bytes(uncompressed_offset as i64));
        out.extend_from_slice(&endian.i64_bytes(compressed_offset as i64));
        out.extend_from_slice(&endian.i32_bytes(*raw_len as i32));
        out.extend_from_slice(&endian.i32_bytes(compressed.len() as i32));
        uncompressed_offset += raw_len;
        compressed_offset += compressed.len();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSMIS: f64 = -f64::MAX;

    fn number(slot: Slot) -> f64 {
        f64::from_le_bytes(slot)
    }

    #[test]
    fn test_decode_bytecode_commands() {
        let mut data = vec![101, 255, 254, 253, 99, 0, 0, 0];
        data.extend_from_slice(&2.5f64.to_le_bytes());
        let slots = decode_bytecode(&data, 100.0, Endian::Little, SYSMIS, None).unwrap();

        assert_eq!(slots.len(), 4);
        assert!((number(slots[0]) - 1.0).abs() < f64::EPSILON);
        assert_eq!(number(slots[1]), SYSMIS);
        assert_eq!(slots[2], *b"        ");
        assert!((number(slots[3]) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decode_bytecode_honours_bias_and_end() {
        let data = [1, 252, 150, 0, 0, 0, 0, 0];
        let slots = decode_bytecode(&data, 1.0, Endian::Little, SYSMIS, None).unwrap();
        assert_eq!(slots.len(), 1);
        assert!(number(slots[0]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decode_bytecode_stops_at_limit() {
        let data = [101, 102, 103, 104, 105, 106, 107, 108];
        let slots = decode_bytecode(&data, 100.0, Endian::Little, SYSMIS, Some(3)).unwrap();
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn test_decode_bytecode_missing_raw_slot() {
        let data = [253, 0, 0, 0, 0, 0, 0, 0];
        let result = decode_bytecode(&data, 100.0, Endian::Little, SYSMIS, None);
        assert!(matches!(result, Err(SavError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_encoder_matches_decoder() {
        let mut encoder = BytecodeEncoder::new(100.0, Endian::Little);
        encoder.push_number(Some(3.0));
        encoder.push_number(None);
        encoder.push_number(Some(-1.0));
        encoder.push_number(Some(2418.0));
        encoder.push_number(Some(0.25));
        encoder.push_text(*b"        ");
        encoder.push_text(*b"Zapopan ");
        let stream = encoder.finish();

        let slots = decode_bytecode(&stream, 100.0, Endian::Little, SYSMIS, None).unwrap();
        assert_eq!(slots.len(), 7);
        assert!((number(slots[0]) - 3.0).abs() < f64::EPSILON);
        assert_eq!(number(slots[1]), SYSMIS);
        assert!((number(slots[2]) + 1.0).abs() < f64::EPSILON);
        assert!((number(slots[3]) - 2418.0).abs() < f64::EPSILON);
        assert!((number(slots[4]) - 0.25).abs() < f64::EPSILON);
        assert_eq!(slots[5], *b"        ");
        assert_eq!(slots[6], *b"Zapopan ");
    }

    #[test]
    fn test_zsav_blocks_inflate() {
        let stream: Vec<u8> = (0..64u8).collect();
        let offset = 100;
        let mut file = vec![0u8; offset];
        file.extend(deflate_zsav(&stream, offset, 100.0, Endian::Little).unwrap());

        let inflated = inflate_zsav(&file, offset, Endian::Little).unwrap();
        assert_eq!(inflated, stream);
    }

    #[test]
    fn test_split_raw() {
        let data: Vec<u8> = (0..24u8).collect();
        let slots = split_raw(&data, 0, None).unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[1][0], 8);
        assert_eq!(split_raw(&data, 0, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_split_raw_partial_slot() {
        let data: Vec<u8> = (0..20u8).collect();
        let result = split_raw(&data, 100, None);
        assert!(matches!(
            result,
            Err(SavError::UnexpectedEof {
                offset: 116,
                needed: 8
            })
        ));
        // Trailing bytes after the declared cases are not read.
        assert_eq!(split_raw(&data, 100, Some(2)).unwrap().len(), 2);
    }
}
