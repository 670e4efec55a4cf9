//! Core types for SPSS system files.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{Result, SavError};

/// Byte order of the numeric fields in a system file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

impl Endian {
    /// Decode a 32-bit integer.
    #[must_use]
    pub fn i32(self, bytes: [u8; 4]) -> i32 {
        match self {
            Self::Little => i32::from_le_bytes(bytes),
            Self::Big => i32::from_be_bytes(bytes),
        }
    }

    /// Decode a 64-bit integer.
    #[must_use]
    pub fn i64(self, bytes: [u8; 8]) -> i64 {
        match self {
            Self::Little => i64::from_le_bytes(bytes),
            Self::Big => i64::from_be_bytes(bytes),
        }
    }

    /// Decode a 64-bit float.
    #[must_use]
    pub fn f64(self, bytes: [u8; 8]) -> f64 {
        match self {
            Self::Little => f64::from_le_bytes(bytes),
            Self::Big => f64::from_be_bytes(bytes),
        }
    }

    /// Encode a 64-bit float.
    #[must_use]
    pub fn f64_bytes(self, value: f64) -> [u8; 8] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }

    /// Encode a 32-bit integer.
    #[must_use]
    pub fn i32_bytes(self, value: i32) -> [u8; 4] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }

    /// Encode a 64-bit integer.
    #[must_use]
    pub fn i64_bytes(self, value: i64) -> [u8; 8] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }

    /// Machine endianness code used by the integer info record.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Big => 1,
            Self::Little => 2,
        }
    }
}

/// Case data compression scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Raw 8-byte slots.
    None,
    /// Bytecode compression.
    #[default]
    Bytecode,
    /// Zlib-compressed bytecode (`.zsav`).
    Zlib,
}

impl Compression {
    /// Interpret the header's compression code.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown codes.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Bytecode),
            2 => Ok(Self::Zlib),
            other => Err(SavError::invalid_format(format!(
                "unknown compression code {other}"
            ))),
        }
    }

    /// The header's compression code.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Bytecode => 1,
            Self::Zlib => 2,
        }
    }
}

/// The fixed-size file header record.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    /// `$FL2` or `$FL3`.
    pub magic: String,
    /// Product identification string.
    pub product: String,
    /// Layout code (2 or 3).
    pub layout_code: i32,
    /// Number of 8-byte slots per case, or -1 if unknown.
    pub nominal_case_size: i32,
    /// Case compression.
    pub compression: Compression,
    /// 1-based dictionary index of the weight variable, 0 if unweighted.
    pub weight_index: i32,
    /// Number of cases, if recorded.
    pub case_count: Option<u32>,
    /// Compression bias.
    pub bias: f64,
    /// Creation date as `dd mmm yy`.
    pub creation_date: String,
    /// Creation time as `hh:mm:ss`.
    pub creation_time: String,
    /// File label.
    pub file_label: String,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            magic: "$FL2".to_string(),
            product: String::new(),
            layout_code: 2,
            nominal_case_size: -1,
            compression: Compression::Bytecode,
            weight_index: 0,
            case_count: None,
            bias: 100.0,
            creation_date: String::new(),
            creation_time: String::new(),
            file_label: String::new(),
        }
    }
}

/// Variable storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    /// 64-bit float.
    Numeric,
    /// Fixed-width string.
    String {
        /// Width in bytes.
        width: usize,
    },
}

impl VarType {
    /// Number of 8-byte slots this type occupies (ignoring very long string segmentation).
    #[must_use]
    pub fn slot_count(self) -> usize {
        match self {
            Self::Numeric => 1,
            Self::String { width } => width.div_ceil(8).max(1),
        }
    }

    /// Check if this is a numeric type.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Numeric)
    }
}

/// Print or write format of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    /// Format type code.
    pub type_code: u8,
    /// Field width.
    pub width: u8,
    /// Decimal places.
    pub decimals: u8,
}

impl Format {
    /// Default numeric format (`F8.2`).
    pub const NUMERIC: Self = Self {
        type_code: 5,
        width: 8,
        decimals: 2,
    };

    /// String format of the given width (`Aw`).
    #[must_use]
    pub fn string(width: usize) -> Self {
        Self {
            type_code: 1,
            width: width.min(255) as u8,
            decimals: 0,
        }
    }

    /// Unpack the dictionary representation.
    #[must_use]
    pub fn from_packed(packed: i32) -> Self {
        let bytes = packed.to_be_bytes();
        Self {
            type_code: bytes[1],
            width: bytes[2],
            decimals: bytes[3],
        }
    }

    /// Pack into the dictionary representation.
    #[must_use]
    pub fn packed(self) -> i32 {
        i32::from_be_bytes([0, self.type_code, self.width, self.decimals])
    }

    /// SPSS name of the format type, if it is a common one.
    #[must_use]
    pub fn spss_name(self) -> Option<&'static str> {
        match self.type_code {
            1 => Some("A"),
            2 => Some("AHEX"),
            3 => Some("COMMA"),
            4 => Some("DOLLAR"),
            5 => Some("F"),
            16 => Some("TIME"),
            17 => Some("E"),
            20 => Some("DATE"),
            22 => Some("DATETIME"),
            23 => Some("ADATE"),
            24 => Some("JDATE"),
            25 => Some("DTIME"),
            26 => Some("WKDAY"),
            27 => Some("MONTH"),
            38 => Some("EDATE"),
            39 => Some("SDATE"),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.spss_name().unwrap_or("?");
        if self.decimals > 0 {
            write!(f, "{name}{}.{}", self.width, self.decimals)
        } else {
            write!(f, "{name}{}", self.width)
        }
    }
}

/// A declared user-missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingValue {
    /// Numeric missing value.
    Number(f64),
    /// String missing value (at most 8 bytes).
    Text(String),
}

/// User-missing value declaration of a variable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum MissingValues {
    /// No user-missing values.
    #[default]
    None,
    /// Up to three discrete values.
    Discrete(Vec<MissingValue>),
    /// A numeric range, optionally with one extra discrete value.
    Range {
        /// Low end (inclusive).
        low: f64,
        /// High end (inclusive).
        high: f64,
        /// Additional discrete value.
        discrete: Option<f64>,
    },
}

impl MissingValues {
    /// Check whether a numeric value is declared missing.
    #[must_use]
    pub fn contains_number(&self, value: f64) -> bool {
        match self {
            Self::None => false,
            Self::Discrete(values) => values
                .iter()
                .any(|m| matches!(m, MissingValue::Number(n) if *n == value)),
            Self::Range {
                low,
                high,
                discrete,
            } => (*low..=*high).contains(&value) || *discrete == Some(value),
        }
    }

    /// Check whether a string value is declared missing.
    #[must_use]
    pub fn contains_text(&self, value: &str) -> bool {
        match self {
            Self::Discrete(values) => values
                .iter()
                .any(|m| matches!(m, MissingValue::Text(t) if t.trim_end() == value.trim_end())),
            _ => false,
        }
    }

    /// The dictionary's missing value count code.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::None => 0,
            Self::Discrete(values) => values.len() as i32,
            Self::Range { discrete: None, .. } => -2,
            Self::Range {
                discrete: Some(_), ..
            } => -3,
        }
    }
}

/// Measurement level of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// Not recorded.
    #[default]
    Unknown,
    /// Categories without order.
    Nominal,
    /// Ordered categories.
    Ordinal,
    /// Interval or ratio scale.
    Scale,
}

impl Measure {
    /// Interpret the display parameter code.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Nominal,
            2 => Self::Ordinal,
            3 => Self::Scale,
            _ => Self::Unknown,
        }
    }

    /// The display parameter code.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Nominal => 1,
            Self::Ordinal => 2,
            Self::Scale => 3,
        }
    }
}

/// A single cell value.
///
/// Numbers sort before text. Numbers compare with `total_cmp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric value.
    Number(f64),
    /// String value.
    Text(String),
}

impl Value {
    /// The numeric value, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// The string value, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for Value {
    /// Integral numbers keep one decimal (`3.0`), other numbers use the
    /// shortest representation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 => {
                write!(f, "{n:.1}")
            }
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Value labels of a variable, in dictionary order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueLabels(Vec<(Value, String)>);

impl ValueLabels {
    /// Create an empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the label for a value.
    pub fn insert(&mut self, value: Value, label: impl Into<String>) {
        let label = label.into();
        if let Some(entry) = self.0.iter_mut().find(|(v, _)| *v == value) {
            entry.1 = label;
        } else {
            self.0.push((value, label));
        }
    }

    /// Look up the label for a value.
    #[must_use]
    pub fn get(&self, value: &Value) -> Option<&str> {
        self.0
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, label)| label.as_str())
    }

    /// Iterate over `(value, label)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &str)> {
        self.0.iter().map(|(v, l)| (v, l.as_str()))
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: Into<Value>, L: Into<String>> FromIterator<(V, L)> for ValueLabels {
    fn from_iter<I: IntoIterator<Item = (V, L)>>(iter: I) -> Self {
        let mut labels = Self::new();
        for (value, label) in iter {
            labels.insert(value.into(), label);
        }
        labels
    }
}

/// A variable in the dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Variable name (long name when the file carries one).
    pub name: String,
    /// Eight-byte dictionary name.
    pub short_name: String,
    /// Variable label.
    pub label: Option<String>,
    /// Storage type.
    pub var_type: VarType,
    /// Print format.
    pub print_format: Format,
    /// Write format.
    pub write_format: Format,
    /// User-missing values.
    pub missing: MissingValues,
    /// Value labels.
    pub value_labels: ValueLabels,
    /// Measurement level.
    pub measure: Measure,
}

impl Variable {
    /// Create a numeric variable.
    #[must_use]
    pub fn numeric(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            short_name: name.clone(),
            name,
            label: None,
            var_type: VarType::Numeric,
            print_format: Format::NUMERIC,
            write_format: Format::NUMERIC,
            missing: MissingValues::None,
            value_labels: ValueLabels::new(),
            measure: Measure::Unknown,
        }
    }

    /// Create a string variable of the given width.
    #[must_use]
    pub fn string(name: impl Into<String>, width: usize) -> Self {
        let name = name.into();
        Self {
            short_name: name.clone(),
            name,
            label: None,
            var_type: VarType::String { width },
            print_format: Format::string(width),
            write_format: Format::string(width),
            missing: MissingValues::None,
            value_labels: ValueLabels::new(),
            measure: Measure::Nominal,
        }
    }

    /// Set the variable label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the value labels.
    #[must_use]
    pub fn with_value_labels(mut self, labels: ValueLabels) -> Self {
        self.value_labels = labels;
        self
    }

    /// Set the user-missing values.
    #[must_use]
    pub fn with_missing(mut self, missing: MissingValues) -> Self {
        self.missing = missing;
        self
    }

    /// Set the measurement level.
    #[must_use]
    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measure = measure;
        self
    }

    /// The label if present and non-empty.
    #[must_use]
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }
}

/// Column-major case values of one variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric values, `None` when missing.
    Numeric(Vec<Option<f64>>),
    /// String values, `None` when declared user-missing.
    Text(Vec<Option<String>>),
}

impl Column {
    /// Number of cases in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    /// Check if the column has no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value at `row`, or `None` when missing or out of range.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<Value> {
        match self {
            Self::Numeric(v) => v.get(row).copied().flatten().map(Value::Number),
            Self::Text(v) => v.get(row).cloned().flatten().map(Value::Text),
        }
    }

    /// The numeric value at `row`, if present.
    #[must_use]
    pub fn number(&self, row: usize) -> Option<f64> {
        match self {
            Self::Numeric(v) => v.get(row).copied().flatten(),
            Self::Text(_) => None,
        }
    }

    /// Number of missing cells.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        match self {
            Self::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Text(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    /// Check if this column holds numbers.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Keep only the given rows, in order.
    #[must_use]
    pub fn select(&self, rows: &[usize]) -> Self {
        match self {
            Self::Numeric(v) => {
                Self::Numeric(rows.iter().map(|&r| v.get(r).copied().flatten()).collect())
            }
            Self::Text(v) => Self::Text(rows.iter().map(|&r| v.get(r).cloned().flatten()).collect()),
        }
    }
}

/// A complete system file: dictionary plus case data.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// File header.
    pub header: FileHeader,
    /// Variables in dictionary order.
    pub variables: Vec<Variable>,
    /// Case values, one column per variable.
    pub columns: Vec<Column>,
    /// Document lines.
    pub documents: Vec<String>,
    /// Name of the weight variable, if the file is weighted.
    pub weight: Option<String>,
    /// Character encoding the strings were decoded from.
    pub encoding: String,
}

impl Dataset {
    /// Build a dataset from variables and matching columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the column count, column lengths or column types
    /// do not match the variables.
    pub fn new(variables: Vec<Variable>, columns: Vec<Column>) -> Result<Self> {
        if variables.len() != columns.len() {
            return Err(SavError::invalid_format(format!(
                "{} variables but {} columns",
                variables.len(),
                columns.len()
            )));
        }
        let expected = columns.first().map_or(0, Column::len);
        for (variable, column) in variables.iter().zip(&columns) {
            if column.len() != expected {
                return Err(SavError::ColumnLength {
                    name: variable.name.clone(),
                    expected,
                    actual: column.len(),
                });
            }
            if variable.var_type.is_numeric() != column.is_numeric() {
                return Err(SavError::ColumnType {
                    name: variable.name.clone(),
                });
            }
        }

        let header = FileHeader {
            case_count: Some(expected as u32),
            ..FileHeader::default()
        };
        Ok(Self {
            header,
            variables,
            columns,
            documents: Vec::new(),
            weight: None,
            encoding: "UTF-8".to_string(),
        })
    }

    /// Set the weight variable.
    #[must_use]
    pub fn with_weight(mut self, name: impl Into<String>) -> Self {
        self.weight = Some(name.into());
        self
    }

    /// Number of cases.
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Position of a variable by name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }

    /// Look up a variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index_of(name).map(|i| &self.variables[i])
    }

    /// Look up a column by variable name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    /// The value of a variable in a given case.
    #[must_use]
    pub fn value(&self, name: &str, row: usize) -> Option<Value> {
        self.column(name).and_then(|c| c.get(row))
    }

    /// Variables that carry a non-empty label.
    pub fn labelled_variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|v| v.label_text().is_some())
    }

    /// The weight variable, if any.
    #[must_use]
    pub fn weight_variable(&self) -> Option<&Variable> {
        self.weight.as_deref().and_then(|name| self.variable(name))
    }

    /// A copy of the dataset restricted to the given cases.
    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let columns = self.columns.iter().map(|c| c.select(rows)).collect();
        let header = FileHeader {
            case_count: Some(rows.len() as u32),
            ..self.header.clone()
        };
        Self {
            header,
            variables: self.variables.clone(),
            columns,
            documents: self.documents.clone(),
            weight: self.weight.clone(),
            encoding: self.encoding.clone(),
        }
    }
}

/// Options controlling how a system file is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Strip trailing spaces from string values.
    pub trim_strings: bool,
    /// Treat declared user-missing values as missing.
    pub user_missing_as_missing: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            trim_strings: true,
            user_missing_as_missing: true,
        }
    }
}
