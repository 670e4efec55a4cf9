//! Dictionary records: variables, value labels, documents and extensions.
//!
//! The dictionary is read in two passes. The first pass collects raw records
//! exactly as stored. The second pass resolves them once the character
//! encoding and the long variable names (both stored in extension records
//! near the end of the dictionary) are known.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::encoding::{decode_trimmed, TextEncoding};
use super::error::{Result, SavError};
use super::header::{Cursor, HEADER_LEN};
use super::types::{
    Endian, Format, Measure, MissingValue, MissingValues, Value, ValueLabels, VarType, Variable,
};

/// Record type codes.
const REC_VARIABLE: i32 = 2;
const REC_VALUE_LABELS: i32 = 3;
const REC_LABEL_VARIABLES: i32 = 4;
const REC_DOCUMENT: i32 = 6;
const REC_EXTENSION: i32 = 7;
const REC_END: i32 = 999;

/// Extension subtypes.
pub(crate) const EXT_INTEGER_INFO: i32 = 3;
pub(crate) const EXT_FLOAT_INFO: i32 = 4;
pub(crate) const EXT_DISPLAY: i32 = 11;
pub(crate) const EXT_LONG_NAMES: i32 = 13;
pub(crate) const EXT_VERY_LONG_STRINGS: i32 = 14;
pub(crate) const EXT_ENCODING: i32 = 20;
pub(crate) const EXT_LONG_STRING_LABELS: i32 = 21;

/// Bytes of a very long string stored in each 255-byte segment.
const SEGMENT_CHUNK: usize = 252;

/// Length of a document line.
pub(crate) const DOCUMENT_LINE_LEN: usize = 80;

/// The system-missing value used when the file does not record one.
pub const SYSMIS: f64 = -f64::MAX;

/// Where a variable's bytes live inside a case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    /// First 8-byte slot.
    pub first_slot: usize,
    /// Number of bytes of the segment that belong to the value.
    pub used_bytes: usize,
}

/// A fully resolved dictionary.
#[derive(Debug)]
pub(crate) struct Dictionary {
    pub variables: Vec<Variable>,
    pub layouts: Vec<Vec<Segment>>,
    pub slot_count: usize,
    pub documents: Vec<String>,
    pub encoding: TextEncoding,
    pub sysmis: f64,
    pub weight: Option<String>,
    pub data_offset: usize,
}

#[derive(Debug)]
struct RawVariable {
    type_code: i32,
    first_slot: usize,
    slot_count: usize,
    name: Vec<u8>,
    label: Option<Vec<u8>>,
    missing_code: i32,
    missing: Vec<[u8; 8]>,
    print_format: i32,
    write_format: i32,
}

#[derive(Debug)]
struct RawLabelSet {
    entries: Vec<([u8; 8], Vec<u8>)>,
    indexes: Vec<i32>,
}

#[derive(Debug, Default)]
struct Extensions {
    character_code: Option<i32>,
    sysmis: Option<f64>,
    measures: Vec<i32>,
    long_names: Option<Vec<u8>>,
    very_long_strings: Option<Vec<u8>>,
    encoding_name: Option<String>,
    long_string_labels: Option<Vec<u8>>,
}

/// Parse every dictionary record following the file header.
pub(crate) fn parse_dictionary(
    data: &[u8],
    endian: Endian,
    weight_index: i32,
) -> Result<Dictionary> {
    let mut cursor = Cursor::new(data, HEADER_LEN, endian);
    let mut raw_vars: Vec<RawVariable> = Vec::new();
    let mut slot_count = 0usize;
    let mut label_sets = Vec::new();
    let mut documents = Vec::new();
    let mut ext = Extensions::default();

    loop {
        let offset = cursor.pos();
        let record_type = cursor.i32()?;
        match record_type {
            REC_VARIABLE => parse_variable(&mut cursor, &mut raw_vars, &mut slot_count)?,
            REC_VALUE_LABELS => label_sets.push(parse_value_labels(&mut cursor)?),
            REC_DOCUMENT => {
                let lines = cursor.count("document line count")?;
                for _ in 0..lines {
                    documents.push(cursor.bytes(DOCUMENT_LINE_LEN)?.to_vec());
                }
            }
            REC_EXTENSION => parse_extension(&mut cursor, &mut ext)?,
            REC_END => {
                cursor.i32()?;
                break;
            }
            _ => {
                return Err(SavError::UnexpectedRecord {
                    record_type,
                    offset,
                })
            }
        }
    }

    let data_offset = cursor.pos();
    let encoding = ext
        .encoding_name
        .as_deref()
        .and_then(|name| {
            let encoding = TextEncoding::from_name(name);
            if encoding.is_none() {
                warn!("Unknown character encoding {name:?}");
            }
            encoding
        })
        .or_else(|| ext.character_code.and_then(TextEncoding::from_code))
        .unwrap_or_default();
    debug!(
        "Dictionary has {} raw variables in {} slots, encoding {}",
        raw_vars.len(),
        slot_count,
        encoding.name()
    );

    let (mut variables, layouts, first_slots) = resolve_variables(&raw_vars, &ext, encoding, endian)?;

    let slot_to_var: HashMap<usize, usize> = first_slots
        .iter()
        .enumerate()
        .map(|(var_idx, &slot)| (slot, var_idx))
        .collect();

    for set in &label_sets {
        apply_label_set(set, &slot_to_var, &mut variables, encoding, endian)?;
    }

    if let Some(body) = &ext.long_string_labels {
        apply_long_string_labels(body, &mut variables, encoding, endian)?;
    }

    let weight = usize::try_from(weight_index)
        .ok()
        .filter(|&i| i > 0)
        .and_then(|i| slot_to_var.get(&(i - 1)))
        .map(|&idx| variables[idx].name.clone());

    Ok(Dictionary {
        variables,
        layouts,
        slot_count,
        documents: documents
            .iter()
            .map(|line| decode_trimmed(encoding, line))
            .collect(),
        encoding,
        sysmis: ext.sysmis.unwrap_or(SYSMIS),
        weight,
        data_offset,
    })
}

fn parse_variable(
    cursor: &mut Cursor<'_>,
    raw_vars: &mut Vec<RawVariable>,
    slot_count: &mut usize,
) -> Result<()> {
    let type_code = cursor.i32()?;
    let has_label = cursor.i32()?;
    let missing_code = cursor.i32()?;
    let print_format = cursor.i32()?;
    let write_format = cursor.i32()?;
    let name = cursor.bytes(8)?.to_vec();

    let label = if has_label == 1 {
        let len = cursor.count("variable label length")?;
        let bytes = cursor.bytes(len.div_ceil(4) * 4)?;
        Some(bytes[..len].to_vec())
    } else {
        None
    };

    let n_missing = missing_code.unsigned_abs() as usize;
    if n_missing > 3 || missing_code == -1 {
        return Err(SavError::invalid_format(format!(
            "invalid missing value code {missing_code}"
        )));
    }
    let missing = (0..n_missing)
        .map(|_| cursor.array::<8>())
        .collect::<Result<Vec<_>>>()?;

    if type_code == -1 {
        let last = raw_vars
            .last_mut()
            .ok_or_else(|| SavError::invalid_format("continuation record without a variable"))?;
        last.slot_count += 1;
        *slot_count += 1;
        return Ok(());
    }

    if !(0..=255).contains(&type_code) {
        return Err(SavError::invalid_format(format!(
            "invalid variable type {type_code}"
        )));
    }

    raw_vars.push(RawVariable {
        type_code,
        first_slot: *slot_count,
        slot_count: 1,
        name,
        label,
        missing_code,
        missing,
        print_format,
        write_format,
    });
    *slot_count += 1;
    Ok(())
}

fn parse_value_labels(cursor: &mut Cursor<'_>) -> Result<RawLabelSet> {
    let count = cursor.count("value label count")?;
    let mut entries = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let value = cursor.array::<8>()?;
        let len = usize::from(cursor.u8()?);
        // The length byte plus the label are padded to a multiple of 8.
        let bytes = cursor.bytes((len + 8) / 8 * 8 - 1)?;
        entries.push((value, bytes[..len].to_vec()));
    }

    let offset = cursor.pos();
    let record_type = cursor.i32()?;
    if record_type != REC_LABEL_VARIABLES {
        return Err(SavError::UnexpectedRecord {
            record_type,
            offset,
        });
    }
    let n_vars = cursor.count("value label variable count")?;
    let indexes = (0..n_vars)
        .map(|_| cursor.i32())
        .collect::<Result<Vec<_>>>()?;

    Ok(RawLabelSet { entries, indexes })
}

fn parse_extension(cursor: &mut Cursor<'_>, ext: &mut Extensions) -> Result<()> {
    let subtype = cursor.i32()?;
    let size = cursor.count("extension element size")?;
    let count = cursor.count("extension element count")?;
    let len = size
        .checked_mul(count)
        .ok_or_else(|| SavError::invalid_format("extension record too large"))?;
    let body = cursor.bytes(len)?;
    let mut sub = Cursor::new(body, 0, cursor.endian());

    match subtype {
        EXT_INTEGER_INFO if size == 4 && count >= 8 => {
            for _ in 0..7 {
                sub.i32()?;
            }
            ext.character_code = Some(sub.i32()?);
        }
        EXT_FLOAT_INFO if size == 8 && count >= 1 => {
            ext.sysmis = Some(sub.f64()?);
        }
        EXT_DISPLAY if size == 4 => {
            let per_var = if count % 3 == 0 { 3 } else { 2 };
            for _ in 0..count / per_var {
                ext.measures.push(sub.i32()?);
                for _ in 1..per_var {
                    sub.i32()?;
                }
            }
        }
        EXT_LONG_NAMES => ext.long_names = Some(body.to_vec()),
        EXT_VERY_LONG_STRINGS => ext.very_long_strings = Some(body.to_vec()),
        EXT_ENCODING => {
            ext.encoding_name = Some(String::from_utf8_lossy(body).trim().to_string());
        }
        EXT_LONG_STRING_LABELS => ext.long_string_labels = Some(body.to_vec()),
        _ => debug!("Skipping extension record subtype {subtype} ({len} bytes)"),
    }
    Ok(())
}

/// Parse `KEY=value` pairs separated by tabs (and NULs in the very long
/// string record).
fn parse_pairs(encoding: TextEncoding, body: &[u8]) -> HashMap<String, String> {
    encoding
        .decode(body)
        .split('\t')
        .filter_map(|pair| {
            let pair = pair.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            let (key, value) = pair.split_once('=')?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Merge very long string segments, then build the public variables.
#[allow(clippy::type_complexity)]
fn resolve_variables(
    raw_vars: &[RawVariable],
    ext: &Extensions,
    encoding: TextEncoding,
    endian: Endian,
) -> Result<(Vec<Variable>, Vec<Vec<Segment>>, Vec<usize>)> {
    let long_names = ext
        .long_names
        .as_deref()
        .map(|body| parse_pairs(encoding, body))
        .unwrap_or_default();
    let very_long: HashMap<String, usize> = ext
        .very_long_strings
        .as_deref()
        .map(|body| parse_pairs(encoding, body))
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| v.trim().parse().ok().map(|w| (k, w)))
        .collect();

    let mut variables = Vec::new();
    let mut layouts = Vec::new();
    let mut first_slots = Vec::new();
    let mut raw_index_of_var = Vec::new();

    let mut i = 0;
    while i < raw_vars.len() {
        let raw = &raw_vars[i];
        let short_name = decode_trimmed(encoding, &raw.name);

        let (var_type, layout, consumed) = if let Some(&width) = very_long.get(&short_name) {
            let segments = width.div_ceil(SEGMENT_CHUNK);
            if segments == 0 || i + segments > raw_vars.len() {
                return Err(SavError::invalid_format(format!(
                    "very long string {short_name} has too few segments"
                )));
            }
            let layout = (0..segments)
                .map(|k| Segment {
                    first_slot: raw_vars[i + k].first_slot,
                    used_bytes: if k + 1 < segments {
                        SEGMENT_CHUNK
                    } else {
                        width - SEGMENT_CHUNK * (segments - 1)
                    },
                })
                .collect();
            (VarType::String { width }, layout, segments)
        } else if raw.type_code == 0 {
            let layout = vec![Segment {
                first_slot: raw.first_slot,
                used_bytes: 8,
            }];
            (VarType::Numeric, layout, 1)
        } else {
            let width = raw.type_code as usize;
            if raw.slot_count != width.div_ceil(8) {
                warn!(
                    "Variable {} has {} slots for width {}",
                    short_name, raw.slot_count, width
                );
            }
            let layout = vec![Segment {
                first_slot: raw.first_slot,
                used_bytes: width.min(raw.slot_count * 8),
            }];
            (VarType::String { width }, layout, 1)
        };

        let name = long_names
            .get(&short_name)
            .cloned()
            .unwrap_or_else(|| short_name.clone());

        variables.push(Variable {
            name,
            short_name,
            label: raw.label.as_deref().map(|l| encoding.decode(l)),
            var_type,
            print_format: Format::from_packed(raw.print_format),
            write_format: Format::from_packed(raw.write_format),
            missing: decode_missing(raw, var_type, encoding, endian),
            value_labels: ValueLabels::new(),
            measure: Measure::Unknown,
        });
        layouts.push(layout);
        first_slots.push(raw.first_slot);
        raw_index_of_var.push(i);
        i += consumed;
    }

    // Display parameters carry one entry per variable, or one per raw
    // variable when written by tools that count segments.
    if ext.measures.len() == variables.len() {
        for (var, &code) in variables.iter_mut().zip(&ext.measures) {
            var.measure = Measure::from_code(code);
        }
    } else if ext.measures.len() == raw_vars.len() {
        for (var, &raw_idx) in variables.iter_mut().zip(&raw_index_of_var) {
            var.measure = Measure::from_code(ext.measures[raw_idx]);
        }
    } else if !ext.measures.is_empty() {
        warn!(
            "Ignoring display parameters for {} variables (dictionary has {})",
            ext.measures.len(),
            variables.len()
        );
    }

    Ok((variables, layouts, first_slots))
}

fn decode_missing(
    raw: &RawVariable,
    var_type: VarType,
    encoding: TextEncoding,
    endian: Endian,
) -> MissingValues {
    if raw.missing.is_empty() {
        return MissingValues::None;
    }
    if !var_type.is_numeric() {
        return MissingValues::Discrete(
            raw.missing
                .iter()
                .map(|bytes| MissingValue::Text(decode_trimmed(encoding, bytes)))
                .collect(),
        );
    }
    let numbers: Vec<f64> = raw.missing.iter().map(|b| endian.f64(*b)).collect();
    match raw.missing_code {
        -2 => MissingValues::Range {
            low: numbers[0],
            high: numbers[1],
            discrete: None,
        },
        -3 => MissingValues::Range {
            low: numbers[0],
            high: numbers[1],
            discrete: Some(numbers[2]),
        },
        _ => MissingValues::Discrete(numbers.into_iter().map(MissingValue::Number).collect()),
    }
}

fn apply_label_set(
    set: &RawLabelSet,
    slot_to_var: &HashMap<usize, usize>,
    variables: &mut [Variable],
    encoding: TextEncoding,
    endian: Endian,
) -> Result<()> {
    for &index in &set.indexes {
        let var_idx = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|slot| slot_to_var.get(&slot))
            .copied()
            .ok_or(SavError::InvalidLabelIndex { index })?;
        let variable = &mut variables[var_idx];
        for (raw_value, raw_label) in &set.entries {
            let value = if variable.var_type.is_numeric() {
                Value::Number(endian.f64(*raw_value))
            } else {
                Value::Text(decode_trimmed(encoding, raw_value))
            };
            variable
                .value_labels
                .insert(value, encoding.decode(raw_label));
        }
    }
    Ok(())
}

fn apply_long_string_labels(
    body: &[u8],
    variables: &mut [Variable],
    encoding: TextEncoding,
    endian: Endian,
) -> Result<()> {
    let mut cursor = Cursor::new(body, 0, endian);
    while cursor.pos() < body.len() {
        let name_len = cursor.count("long string label name length")?;
        let name = decode_trimmed(encoding, cursor.bytes(name_len)?);
        cursor.i32()?;
        let n_labels = cursor.count("long string label count")?;

        let target = variables
            .iter()
            .position(|v| v.name == name)
            .or_else(|| variables.iter().position(|v| v.short_name == name));
        if target.is_none() {
            warn!("Long string value labels for unknown variable {name}");
        }

        for _ in 0..n_labels {
            let value_len = cursor.count("long string value length")?;
            let value = decode_trimmed(encoding, cursor.bytes(value_len)?);
            let label_len = cursor.count("long string label length")?;
            let label = encoding.decode(cursor.bytes(label_len)?);
            if let Some(idx) = target {
                variables[idx].value_labels.insert(Value::Text(value), label);
            }
        }
    }
    Ok(())
}
