//! SPSS system file writer.
//!
//! Writes UTF-8 text in the chosen byte order (little-endian by default).
//! The whole file is assembled in memory because the zlib trailer records
//! absolute offsets.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Local;

use super::compression::{deflate_zsav, BytecodeEncoder};
use super::dictionary::{
    DOCUMENT_LINE_LEN, EXT_DISPLAY, EXT_ENCODING, EXT_FLOAT_INFO, EXT_INTEGER_INFO,
    EXT_LONG_NAMES, EXT_LONG_STRING_LABELS, SYSMIS,
};
use super::encoding::truncate_bytes;
use super::error::{Result, SavError};
use super::header::{MAGIC_SAV, MAGIC_ZSAV};
use super::types::{
    Column, Compression, Dataset, Endian, MissingValue, MissingValues, VarType, Variable,
};

/// Widest string a single dictionary variable can hold.
const MAX_STRING_WIDTH: usize = 255;

/// Longest value label SPSS accepts.
const MAX_VALUE_LABEL_LEN: usize = 120;

/// Longest variable label written.
const MAX_VARIABLE_LABEL_LEN: usize = 255;

/// Compression bias written to the header.
const BIAS: f64 = 100.0;

/// Character code for UTF-8 in the integer info record.
const CODE_PAGE_UTF8: i32 = 65001;

/// SPSS system file writer.
pub struct SavWriter<W: Write> {
    writer: BufWriter<W>,
    compression: Compression,
    endian: Endian,
}

impl<W: Write> SavWriter<W> {
    /// Create a new writer using bytecode compression.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            compression: Compression::Bytecode,
            endian: Endian::Little,
        }
    }

    /// Choose the case data compression.
    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Choose the byte order of numeric fields.
    #[must_use]
    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Write a dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is inconsistent, holds strings wider
    /// than 255 bytes, or the output cannot be written.
    pub fn write_dataset(mut self, dataset: &Dataset) -> Result<()> {
        let layout = Layout::new(dataset)?;

        let endian = self.endian;
        let mut out = Vec::new();
        write_header(&mut out, endian, dataset, &layout, self.compression);
        write_variables(&mut out, endian, dataset, &layout);
        write_value_labels(&mut out, endian, dataset, &layout);
        write_documents(&mut out, endian, &dataset.documents);
        write_extensions(&mut out, endian, dataset, &layout);
        put_i32(&mut out, endian, 999);
        put_i32(&mut out, endian, 0);

        match self.compression {
            Compression::None => write_raw_cases(&mut out, endian, dataset, &layout),
            Compression::Bytecode => out.extend(encode_cases(endian, dataset)),
            Compression::Zlib => {
                let stream = encode_cases(endian, dataset);
                let zsav = deflate_zsav(&stream, out.len(), BIAS, endian)?;
                out.extend(zsav);
            }
        }

        self.writer.write_all(&out)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Write a dataset to a path, using the compression recorded in its header.
///
/// # Errors
///
/// Returns an error if the file cannot be created or the dataset cannot be
/// encoded.
pub fn write_sav(path: &Path, dataset: &Dataset) -> Result<()> {
    let file = File::create(path)?;
    SavWriter::new(file)
        .compression(dataset.header.compression)
        .write_dataset(dataset)
}

/// Slot positions and short names assigned to each variable.
struct Layout {
    short_names: Vec<String>,
    first_slots: Vec<usize>,
    slot_count: usize,
}

impl Layout {
    fn new(dataset: &Dataset) -> Result<Self> {
        if dataset.variables.len() != dataset.columns.len() {
            return Err(SavError::invalid_format(format!(
                "{} variables but {} columns",
                dataset.variables.len(),
                dataset.columns.len()
            )));
        }
        let cases = dataset.case_count();
        for (variable, column) in dataset.variables.iter().zip(&dataset.columns) {
            if let VarType::String { width } = variable.var_type {
                if width == 0 || width > MAX_STRING_WIDTH {
                    return Err(SavError::unsupported(format!(
                        "string variable {} has width {width} (1..=255 supported)",
                        variable.name
                    )));
                }
            }
            if variable.var_type.is_numeric() != column.is_numeric() {
                return Err(SavError::ColumnType {
                    name: variable.name.clone(),
                });
            }
            if column.len() != cases {
                return Err(SavError::ColumnLength {
                    name: variable.name.clone(),
                    expected: cases,
                    actual: column.len(),
                });
            }
        }

        let mut first_slots = Vec::with_capacity(dataset.variables.len());
        let mut slot_count = 0;
        for variable in &dataset.variables {
            first_slots.push(slot_count);
            slot_count += variable.var_type.slot_count();
        }

        Ok(Self {
            short_names: assign_short_names(&dataset.variables),
            first_slots,
            slot_count,
        })
    }
}

/// Derive unique eight-byte upper-case dictionary names.
fn assign_short_names(variables: &[Variable]) -> Vec<String> {
    let mut used = HashSet::new();
    let mut names = Vec::with_capacity(variables.len());
    let mut generated = 0usize;

    for variable in variables {
        let candidate: String = variable
            .name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '#' | '$' | '.'))
            .take(8)
            .collect::<String>()
            .to_ascii_uppercase();
        let valid = candidate
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '@');

        let name = if valid && !used.contains(&candidate) {
            candidate
        } else {
            loop {
                generated += 1;
                let name = format!("V{generated:04}");
                if !used.contains(&name) {
                    break name;
                }
            }
        };
        used.insert(name.clone());
        names.push(name);
    }
    names
}

fn put_i32(out: &mut Vec<u8>, endian: Endian, value: i32) {
    out.extend_from_slice(&endian.i32_bytes(value));
}

fn put_f64(out: &mut Vec<u8>, endian: Endian, value: f64) {
    out.extend_from_slice(&endian.f64_bytes(value));
}

/// Append `text` truncated or space-padded to exactly `len` bytes.
fn put_padded(out: &mut Vec<u8>, text: &str, len: usize) {
    let bytes = truncate_bytes(text, len).as_bytes();
    out.extend_from_slice(bytes);
    out.extend(std::iter::repeat(b' ').take(len - bytes.len()));
}

fn write_header(
    out: &mut Vec<u8>,
    endian: Endian,
    dataset: &Dataset,
    layout: &Layout,
    compression: Compression,
) {
    let magic = if compression == Compression::Zlib {
        MAGIC_ZSAV
    } else {
        MAGIC_SAV
    };
    out.extend_from_slice(magic);
    put_padded(
        out,
        &format!("@(#) SPSS DATA FILE sondeo {}", env!("CARGO_PKG_VERSION")),
        60,
    );
    put_i32(out, endian, 2);
    put_i32(out, endian, layout.slot_count as i32);
    put_i32(out, endian, compression.code());

    let weight_index = dataset
        .weight
        .as_deref()
        .and_then(|name| dataset.index_of(name))
        .filter(|&i| dataset.variables[i].var_type.is_numeric())
        .map_or(0, |i| layout.first_slots[i] as i32 + 1);
    put_i32(out, endian, weight_index);
    put_i32(out, endian, dataset.case_count() as i32);
    put_f64(out, endian, BIAS);

    let now = Local::now();
    let date = if dataset.header.creation_date.len() == 9 {
        dataset.header.creation_date.clone()
    } else {
        now.format("%d %b %y").to_string()
    };
    let time = if dataset.header.creation_time.len() == 8 {
        dataset.header.creation_time.clone()
    } else {
        now.format("%H:%M:%S").to_string()
    };
    put_padded(out, &date, 9);
    put_padded(out, &time, 8);
    put_padded(out, &dataset.header.file_label, 64);
    out.extend_from_slice(&[0u8; 3]);
}

/// Missing values as stored: the count code and the raw 8-byte values.
fn encode_missing(variable: &Variable, endian: Endian) -> (i32, Vec<[u8; 8]>) {
    let numeric = variable.var_type.is_numeric();
    match &variable.missing {
        MissingValues::None => (0, Vec::new()),
        MissingValues::Discrete(values) => {
            let raw: Vec<[u8; 8]> = values
                .iter()
                .take(3)
                .filter_map(|value| match value {
                    MissingValue::Number(n) if numeric => Some(endian.f64_bytes(*n)),
                    MissingValue::Text(t) if !numeric => {
                        let mut bytes = Vec::with_capacity(8);
                        put_padded(&mut bytes, t, 8);
                        let mut slot = [b' '; 8];
                        slot.copy_from_slice(&bytes);
                        Some(slot)
                    }
                    _ => None,
                })
                .collect();
            (raw.len() as i32, raw)
        }
        MissingValues::Range { .. } if !numeric => (0, Vec::new()),
        MissingValues::Range {
            low,
            high,
            discrete,
        } => {
            let mut raw = vec![endian.f64_bytes(*low), endian.f64_bytes(*high)];
            if let Some(value) = discrete {
                raw.push(endian.f64_bytes(*value));
            }
            (variable.missing.code(), raw)
        }
    }
}

fn write_variables(out: &mut Vec<u8>, endian: Endian, dataset: &Dataset, layout: &Layout) {
    for (variable, short_name) in dataset.variables.iter().zip(&layout.short_names) {
        let type_code = match variable.var_type {
            VarType::Numeric => 0,
            VarType::String { width } => width as i32,
        };
        let label = variable
            .label_text()
            .map(|l| truncate_bytes(l, MAX_VARIABLE_LABEL_LEN));
        let (missing_code, missing) = encode_missing(variable, endian);

        put_i32(out, endian, 2);
        put_i32(out, endian, type_code);
        put_i32(out, endian, i32::from(label.is_some()));
        put_i32(out, endian, missing_code);
        put_i32(out, endian, variable.print_format.packed());
        put_i32(out, endian, variable.write_format.packed());
        put_padded(out, short_name, 8);
        if let Some(label) = label {
            put_i32(out, endian, label.len() as i32);
            put_padded(out, label, label.len().div_ceil(4) * 4);
        }
        for value in missing {
            out.extend_from_slice(&value);
        }

        for _ in 1..variable.var_type.slot_count() {
            put_i32(out, endian, 2);
            put_i32(out, endian, -1);
            for _ in 0..4 {
                put_i32(out, endian, 0);
            }
            put_padded(out, "", 8);
        }
    }
}

/// Value labels for numeric and short string variables, one record pair each.
fn write_value_labels(out: &mut Vec<u8>, endian: Endian, dataset: &Dataset, layout: &Layout) {
    for (idx, variable) in dataset.variables.iter().enumerate() {
        if variable.value_labels.is_empty() {
            continue;
        }
        let numeric = match variable.var_type {
            VarType::Numeric => true,
            VarType::String { width } if width <= 8 => false,
            VarType::String { .. } => continue,
        };

        put_i32(out, endian, 3);
        put_i32(out, endian, variable.value_labels.len() as i32);
        for (value, label) in variable.value_labels.iter() {
            if numeric {
                put_f64(out, endian, value.as_number().unwrap_or(SYSMIS));
            } else {
                put_padded(out, &value.to_string(), 8);
            }
            let label = truncate_bytes(label, MAX_VALUE_LABEL_LEN);
            out.push(label.len() as u8);
            put_padded(out, label, (label.len() + 8) / 8 * 8 - 1);
        }

        put_i32(out, endian, 4);
        put_i32(out, endian, 1);
        put_i32(out, endian, layout.first_slots[idx] as i32 + 1);
    }
}

fn write_documents(out: &mut Vec<u8>, endian: Endian, documents: &[String]) {
    if documents.is_empty() {
        return;
    }
    put_i32(out, endian, 6);
    put_i32(out, endian, documents.len() as i32);
    for line in documents {
        put_padded(out, line, DOCUMENT_LINE_LEN);
    }
}

fn put_extension(out: &mut Vec<u8>, endian: Endian, subtype: i32, size: usize, body: &[u8]) {
    put_i32(out, endian, 7);
    put_i32(out, endian, subtype);
    put_i32(out, endian, size as i32);
    put_i32(out, endian, (body.len() / size) as i32);
    out.extend_from_slice(body);
}

fn write_extensions(out: &mut Vec<u8>, endian: Endian, dataset: &Dataset, layout: &Layout) {
    // Release 1.0.0, IEEE floats, bytecode, byte order, UTF-8.
    let mut body = Vec::new();
    for value in [1, 0, 0, -1, 1, 1, endian.code(), CODE_PAGE_UTF8] {
        put_i32(&mut body, endian, value);
    }
    put_extension(out, endian, EXT_INTEGER_INFO, 4, &body);

    let mut body = Vec::new();
    put_f64(&mut body, endian, SYSMIS);
    put_f64(&mut body, endian, f64::MAX);
    put_f64(&mut body, endian, f64::from_bits(0xFFEF_FFFF_FFFF_FFFE));
    put_extension(out, endian, EXT_FLOAT_INFO, 8, &body);

    let mut body = Vec::new();
    for variable in &dataset.variables {
        let (width, alignment) = match variable.var_type {
            VarType::Numeric => (8, 1),
            VarType::String { width } => (width.min(255) as i32, 0),
        };
        put_i32(&mut body, endian, variable.measure.code());
        put_i32(&mut body, endian, width);
        put_i32(&mut body, endian, alignment);
    }
    if !body.is_empty() {
        put_extension(out, endian, EXT_DISPLAY, 4, &body);
    }

    let long_names = dataset
        .variables
        .iter()
        .zip(&layout.short_names)
        .map(|(variable, short)| format!("{short}={}", variable.name))
        .collect::<Vec<_>>()
        .join("\t");
    if !long_names.is_empty() {
        put_extension(out, endian, EXT_LONG_NAMES, 1, long_names.as_bytes());
    }

    put_extension(out, endian, EXT_ENCODING, 1, b"UTF-8");

    let mut body = Vec::new();
    for variable in &dataset.variables {
        let VarType::String { width } = variable.var_type else {
            continue;
        };
        if width <= 8 || variable.value_labels.is_empty() {
            continue;
        }
        put_i32(&mut body, endian, variable.name.len() as i32);
        body.extend_from_slice(variable.name.as_bytes());
        put_i32(&mut body, endian, width as i32);
        put_i32(&mut body, endian, variable.value_labels.len() as i32);
        for (value, label) in variable.value_labels.iter() {
            put_i32(&mut body, endian, width as i32);
            put_padded(&mut body, &value.to_string(), width);
            put_i32(&mut body, endian, label.len() as i32);
            body.extend_from_slice(label.as_bytes());
        }
    }
    if !body.is_empty() {
        put_extension(out, endian, EXT_LONG_STRING_LABELS, 1, &body);
    }
}

/// The 8-byte chunks of a string value padded to the variable's slots.
fn string_chunks(value: Option<&str>, width: usize) -> Vec<[u8; 8]> {
    let slots = VarType::String { width }.slot_count();
    let mut bytes = Vec::with_capacity(slots * 8);
    put_padded(&mut bytes, truncate_bytes(value.unwrap_or(""), width), slots * 8);
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut slot = [0u8; 8];
            slot.copy_from_slice(chunk);
            slot
        })
        .collect()
}

fn write_raw_cases(out: &mut Vec<u8>, endian: Endian, dataset: &Dataset, layout: &Layout) {
    out.reserve(dataset.case_count() * layout.slot_count * 8);
    for row in 0..dataset.case_count() {
        for (variable, column) in dataset.variables.iter().zip(&dataset.columns) {
            match (column, variable.var_type) {
                (Column::Numeric(values), _) => {
                    put_f64(out, endian, values[row].unwrap_or(SYSMIS));
                }
                (Column::Text(values), VarType::String { width }) => {
                    for chunk in string_chunks(values[row].as_deref(), width) {
                        out.extend_from_slice(&chunk);
                    }
                }
                (Column::Text(_), VarType::Numeric) => {}
            }
        }
    }
}

fn encode_cases(endian: Endian, dataset: &Dataset) -> Vec<u8> {
    let mut encoder = BytecodeEncoder::new(BIAS, endian);
    for row in 0..dataset.case_count() {
        for (variable, column) in dataset.variables.iter().zip(&dataset.columns) {
            match (column, variable.var_type) {
                (Column::Numeric(values), _) => encoder.push_number(values[row]),
                (Column::Text(values), VarType::String { width }) => {
                    for chunk in string_chunks(values[row].as_deref(), width) {
                        encoder.push_text(chunk);
                    }
                }
                (Column::Text(_), VarType::Numeric) => {}
            }
        }
    }
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sav::types::{Measure, Value, ValueLabels};
    use crate::sav::SavReader;

    fn read_back(bytes: &[u8]) -> Dataset {
        SavReader::new(bytes).read_dataset().unwrap()
    }

    fn write(dataset: &Dataset, compression: Compression) -> Vec<u8> {
        let mut out = Vec::new();
        SavWriter::new(&mut out)
            .compression(compression)
            .write_dataset(dataset)
            .unwrap();
        out
    }

    #[test]
    fn test_short_names_are_unique() {
        let names = assign_short_names(&[
            Variable::numeric("CALIDAD_VIDA"),
            Variable::numeric("CALIDAD_VIDA_2"),
            Variable::numeric("Q_1"),
            Variable::numeric("1ABC"),
        ]);
        assert_eq!(names, vec!["CALIDAD_", "V0001", "Q_1", "V0002"]);
    }

    #[test]
    fn test_header_layout() {
        let dataset = Dataset::new(
            vec![Variable::numeric("FACTOR")],
            vec![Column::Numeric(vec![Some(1.5), Some(2.5)])],
        )
        .unwrap()
        .with_weight("FACTOR");
        let bytes = write(&dataset, Compression::Zlib);

        assert_eq!(&bytes[0..4], b"$FL3");
        assert_eq!(i32::from_le_bytes(bytes[64..68].try_into().unwrap()), 2);
        assert_eq!(i32::from_le_bytes(bytes[68..72].try_into().unwrap()), 1);
        assert_eq!(i32::from_le_bytes(bytes[72..76].try_into().unwrap()), 2);
        assert_eq!(i32::from_le_bytes(bytes[76..80].try_into().unwrap()), 1);
        assert_eq!(i32::from_le_bytes(bytes[80..84].try_into().unwrap()), 2);
    }

    #[test]
    fn test_big_endian_header() {
        let dataset = Dataset::new(
            vec![Variable::numeric("Q_1")],
            vec![Column::Numeric(vec![Some(1.0), Some(2.5)])],
        )
        .unwrap();
        let mut bytes = Vec::new();
        SavWriter::new(&mut bytes)
            .endian(Endian::Big)
            .write_dataset(&dataset)
            .unwrap();

        assert_eq!(i32::from_be_bytes(bytes[64..68].try_into().unwrap()), 2);
        assert_eq!(i32::from_be_bytes(bytes[80..84].try_into().unwrap()), 2);
        let back = read_back(&bytes);
        assert_eq!(back.value("Q_1", 1), Some(Value::from(2.5)));
    }

    #[test]
    fn test_long_names_and_weight_survive() {
        let dataset = Dataset::new(
            vec![
                Variable::numeric("CALIDAD_VIDA").with_measure(Measure::Ordinal),
                Variable::numeric("FACTOR").with_measure(Measure::Scale),
            ],
            vec![
                Column::Numeric(vec![Some(3.0)]),
                Column::Numeric(vec![Some(612.75)]),
            ],
        )
        .unwrap()
        .with_weight("FACTOR");

        for compression in [Compression::None, Compression::Bytecode, Compression::Zlib] {
            let back = read_back(&write(&dataset, compression));
            assert_eq!(back.variables[0].name, "CALIDAD_VIDA");
            assert_eq!(back.variables[0].short_name, "CALIDAD_");
            assert_eq!(back.variables[0].measure, Measure::Ordinal);
            assert_eq!(back.weight.as_deref(), Some("FACTOR"));
            assert_eq!(back.value("FACTOR", 0), Some(Value::from(612.75)));
            assert_eq!(back.header.compression, compression);
        }
    }

    #[test]
    fn test_long_string_value_labels() {
        let labels: ValueLabels = [("GDL", "Guadalajara"), ("ZAP", "Zapopan")]
            .into_iter()
            .collect();
        let dataset = Dataset::new(
            vec![
                Variable::string("MUNI", 3).with_value_labels(labels.clone()),
                Variable::string("MUNICIPIO_TEXTO", 20).with_value_labels(labels),
            ],
            vec![
                Column::Text(vec![Some("GDL".into())]),
                Column::Text(vec![Some("ZAP".into())]),
            ],
        )
        .unwrap();

        let back = read_back(&write(&dataset, Compression::Bytecode));
        let short = &back.variables[0].value_labels;
        let long = &back.variables[1].value_labels;
        assert_eq!(short.get(&Value::from("GDL")), Some("Guadalajara"));
        assert_eq!(long.get(&Value::from("ZAP")), Some("Zapopan"));
        assert_eq!(long.len(), 2);
    }

    #[test]
    fn test_rejects_very_long_strings() {
        let dataset = Dataset::new(
            vec![Variable::string("COMENTARIO", 300)],
            vec![Column::Text(vec![Some("x".into())])],
        )
        .unwrap();
        let result = SavWriter::new(Vec::new()).write_dataset(&dataset);
        assert!(matches!(result, Err(SavError::Unsupported(_))));
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = Dataset::new(
            vec![Variable::numeric("Q_1"), Variable::string("S", 4)],
            vec![Column::Numeric(Vec::new()), Column::Text(Vec::new())],
        )
        .unwrap();
        let back = read_back(&write(&dataset, Compression::Bytecode));
        assert_eq!(back.case_count(), 0);
        assert_eq!(back.variables.len(), 2);
    }

    #[test]
    fn test_documents_survive() {
        let mut dataset = Dataset::new(
            vec![Variable::numeric("Q_1")],
            vec![Column::Numeric(vec![Some(1.0)])],
        )
        .unwrap();
        dataset.documents = vec!["Encuesta AMG".to_string(), "Ola 2024".to_string()];
        let back = read_back(&write(&dataset, Compression::None));
        assert_eq!(back.documents, dataset.documents);
    }
}
