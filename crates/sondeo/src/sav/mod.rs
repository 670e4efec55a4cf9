//! Reader and writer for SPSS system files (`.sav` and `.zsav`).
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use sondeo::sav::read_sav;
//!
//! let dataset = read_sav(Path::new("datos.sav"))?;
//! println!("{} cases, {} variables", dataset.case_count(), dataset.variables.len());
//! # Ok::<(), sondeo::sav::SavError>(())
//! ```

mod compression;
mod dictionary;
mod encoding;
mod error;
mod header;
mod reader;
mod types;
mod writer;

pub use dictionary::SYSMIS;
pub use encoding::TextEncoding;
pub use error::{Result, SavError};
pub use reader::{read_sav, read_sav_with_options, SavReader};
pub use types::{
    Column, Compression, Dataset, Endian, FileHeader, Format, Measure, MissingValue,
    MissingValues, ReaderOptions, Value, ValueLabels, VarType, Variable,
};
pub use writer::{write_sav, SavWriter};
