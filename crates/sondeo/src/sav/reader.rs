//! SPSS system file reader.
//!
//! Reads `.sav` and `.zsav` files into a column-major [`Dataset`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, warn};

use super::compression::{decode_bytecode, inflate_zsav, split_raw};
use super::dictionary::{parse_dictionary, Dictionary, Segment, SYSMIS};
use super::error::{Result, SavError};
use super::header::parse_header;
use super::types::{Column, Compression, Dataset, Endian, ReaderOptions, VarType, Variable};

/// SPSS system file reader.
pub struct SavReader<R: Read> {
    reader: BufReader<R>,
    options: ReaderOptions,
}

impl<R: Read> SavReader<R> {
    /// Create a new reader with default options.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            options: ReaderOptions::default(),
        }
    }

    /// Create a new reader with options.
    pub fn with_options(reader: R, options: ReaderOptions) -> Self {
        Self {
            reader: BufReader::new(reader),
            options,
        }
    }

    /// Read the entire file into memory and parse it.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or is not a valid
    /// system file.
    pub fn read_dataset(mut self) -> Result<Dataset> {
        let mut data = Vec::new();
        self.reader.read_to_end(&mut data)?;
        parse_sav_data(&data, &self.options)
    }
}

impl SavReader<File> {
    /// Open a system file for reading.
    ///
    /// # Errors
    ///
    /// Returns [`SavError::FileNotFound`] if the path does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    /// Open a system file with options.
    ///
    /// # Errors
    ///
    /// Returns [`SavError::FileNotFound`] if the path does not exist.
    pub fn open_with_options(path: &Path, options: ReaderOptions) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SavError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                SavError::Io(e)
            }
        })?;
        Ok(Self::with_options(file, options))
    }
}

/// Read a system file from a path.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub fn read_sav(path: &Path) -> Result<Dataset> {
    SavReader::open(path)?.read_dataset()
}

/// Read a system file with options.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub fn read_sav_with_options(path: &Path, options: ReaderOptions) -> Result<Dataset> {
    SavReader::open_with_options(path, options)?.read_dataset()
}

/// Parse a complete system file held in memory.
fn parse_sav_data(data: &[u8], options: &ReaderOptions) -> Result<Dataset> {
    let (mut header, endian) = parse_header(data)?;
    let dict = parse_dictionary(data, endian, header.weight_index)?;

    if header.nominal_case_size >= 0 && header.nominal_case_size as usize != dict.slot_count {
        warn!(
            "Header declares {} slots per case, dictionary has {}",
            header.nominal_case_size, dict.slot_count
        );
    }

    let body = &data[dict.data_offset.min(data.len())..];
    let case_bytes = dict.slot_count * 8;
    let max_slots = header
        .case_count
        .map(|n| (n as usize).saturating_mul(dict.slot_count));

    let slots = match header.compression {
        Compression::None => split_raw(body, dict.data_offset, max_slots)?,
        Compression::Bytecode => decode_bytecode(body, header.bias, endian, dict.sysmis, max_slots)?,
        Compression::Zlib => {
            let stream = inflate_zsav(data, dict.data_offset, endian)?;
            decode_bytecode(&stream, header.bias, endian, dict.sysmis, max_slots)?
        }
    };

    let case_count = if dict.slot_count == 0 {
        0
    } else {
        let leftover = slots.len() % dict.slot_count;
        if leftover != 0 {
            return Err(SavError::TruncatedCase { slots: leftover });
        }
        slots.len() / dict.slot_count
    };

    if let Some(declared) = header.case_count {
        if declared as usize != case_count {
            warn!("Header declares {declared} cases, data holds {case_count}");
        }
    }
    debug!(
        "Decoded {} cases of {} bytes ({:?} compression)",
        case_count, case_bytes, header.compression
    );

    let cases: Vec<u8> = slots.concat();
    let columns = dict
        .variables
        .iter()
        .zip(&dict.layouts)
        .map(|(variable, layout)| {
            build_column(variable, layout, &cases, case_count, case_bytes, endian, &dict, options)
        })
        .collect();

    header.case_count = Some(case_count as u32);
    let Dictionary {
        variables,
        documents,
        encoding,
        weight,
        ..
    } = dict;

    Ok(Dataset {
        header,
        variables,
        columns,
        documents,
        weight,
        encoding: encoding.name().to_string(),
    })
}

#[allow(clippy::too_many_arguments)]
fn build_column(
    variable: &Variable,
    layout: &[Segment],
    cases: &[u8],
    case_count: usize,
    case_bytes: usize,
    endian: Endian,
    dict: &Dictionary,
    options: &ReaderOptions,
) -> Column {
    match variable.var_type {
        VarType::Numeric => {
            let offset = layout.first().map_or(0, |s| s.first_slot * 8);
            Column::Numeric(
                (0..case_count)
                    .map(|case| {
                        let start = case * case_bytes + offset;
                        let mut raw = [0u8; 8];
                        raw.copy_from_slice(&cases[start..start + 8]);
                        let value = endian.f64(raw);
                        if value == dict.sysmis || value == SYSMIS || value.is_nan() {
                            None
                        } else if options.user_missing_as_missing
                            && variable.missing.contains_number(value)
                        {
                            None
                        } else {
                            Some(value)
                        }
                    })
                    .collect(),
            )
        }
        VarType::String { width } => Column::Text(
            (0..case_count)
                .map(|case| {
                    let base = case * case_bytes;
                    let mut bytes = Vec::with_capacity(width);
                    for segment in layout {
                        let start = base + segment.first_slot * 8;
                        bytes.extend_from_slice(&cases[start..start + segment.used_bytes]);
                    }
                    bytes.truncate(width);
                    let text = dict.encoding.decode(&bytes);
                    let text = if options.trim_strings {
                        text.trim_end_matches([' ', '\0']).to_string()
                    } else {
                        text
                    };
                    if options.user_missing_as_missing && variable.missing.contains_text(&text) {
                        None
                    } else {
                        Some(text)
                    }
                })
                .collect(),
        ),
    }
}
