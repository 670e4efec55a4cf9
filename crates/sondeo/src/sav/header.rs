//! File header record and the byte cursor used by the dictionary parser.

use super::encoding::{decode_trimmed, TextEncoding};
use super::error::{Result, SavError};
use super::types::{Compression, Endian, FileHeader};

/// Length of the file header record.
pub const HEADER_LEN: usize = 176;

/// Magic for bytecode or uncompressed files.
pub const MAGIC_SAV: &[u8; 4] = b"$FL2";

/// Magic for zlib-compressed files.
pub const MAGIC_ZSAV: &[u8; 4] = b"$FL3";

/// Forward-only reader over the raw file bytes.
#[derive(Debug)]
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8], pos: usize, endian: Endian) -> Self {
        Self { data, pos, endian }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn endian(&self) -> Endian {
        self.endian
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(SavError::UnexpectedEof {
                offset: self.pos,
                needed: len,
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub(crate) fn i32(&mut self) -> Result<i32> {
        Ok(self.endian.i32(self.array()?))
    }

    pub(crate) fn i64(&mut self) -> Result<i64> {
        Ok(self.endian.i64(self.array()?))
    }

    pub(crate) fn f64(&mut self) -> Result<f64> {
        Ok(self.endian.f64(self.array()?))
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    /// Read a non-negative count field.
    pub(crate) fn count(&mut self, what: &str) -> Result<usize> {
        let value = self.i32()?;
        usize::try_from(value)
            .map_err(|_| SavError::invalid_format(format!("negative {what}: {value}")))
    }
}

/// Detect the byte order from the layout code at offset 64.
fn detect_endian(layout: [u8; 4]) -> Result<Endian> {
    if matches!(i32::from_le_bytes(layout), 2 | 3) {
        Ok(Endian::Little)
    } else if matches!(i32::from_be_bytes(layout), 2 | 3) {
        Ok(Endian::Big)
    } else {
        Err(SavError::invalid_format("unrecognized layout code"))
    }
}

/// Parse the file header record.
///
/// Header strings are decoded before the file's encoding is known, so they
/// go through the UTF-8 decoder with its Windows-1252 fallback.
pub(crate) fn parse_header(data: &[u8]) -> Result<(FileHeader, Endian)> {
    if data.len() < HEADER_LEN {
        return Err(SavError::invalid_format("file too small"));
    }

    let magic = &data[0..4];
    if magic != MAGIC_SAV && magic != MAGIC_ZSAV {
        return Err(SavError::invalid_format("missing $FL2/$FL3 signature"));
    }

    let mut layout = [0u8; 4];
    layout.copy_from_slice(&data[64..68]);
    let endian = detect_endian(layout)?;

    let mut cursor = Cursor::new(data, 64, endian);
    let layout_code = cursor.i32()?;
    let nominal_case_size = cursor.i32()?;
    let compression = Compression::from_code(cursor.i32()?)?;
    let weight_index = cursor.i32()?;
    let ncases = cursor.i32()?;
    let bias = cursor.f64()?;

    if (compression == Compression::Zlib) != (magic == MAGIC_ZSAV) {
        return Err(SavError::invalid_format(
            "zlib compression requires the $FL3 signature",
        ));
    }

    let text = TextEncoding::utf8();
    let header = FileHeader {
        magic: String::from_utf8_lossy(magic).into_owned(),
        product: decode_trimmed(text, &data[4..64]),
        layout_code,
        nominal_case_size,
        compression,
        weight_index,
        case_count: u32::try_from(ncases).ok(),
        bias,
        creation_date: decode_trimmed(text, &data[92..101]),
        creation_time: decode_trimmed(text, &data[101..109]),
        file_label: decode_trimmed(text, &data[109..173]),
    };
    Ok((header, endian))
}
