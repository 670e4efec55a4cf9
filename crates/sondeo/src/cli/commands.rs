//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::survey::{AgeRange, ResponseFilters};

/// Demographic filters shared by `responses` and `subset`.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Quality of life index (1-3)
    #[arg(long, value_name = "N")]
    pub calidad_vida: Option<i32>,

    /// Municipality code (1-6)
    #[arg(long, value_name = "N")]
    pub municipio: Option<i32>,

    /// Sex (1-2)
    #[arg(long, value_name = "N")]
    pub sexo: Option<i32>,

    /// Lowest age, inclusive
    #[arg(long, value_name = "N")]
    pub edad_min: Option<i32>,

    /// Highest age, inclusive
    #[arg(long, value_name = "N")]
    pub edad_max: Option<i32>,

    /// Schooling level (1-3)
    #[arg(long, value_name = "N")]
    pub escolaridad: Option<i32>,

    /// Socioeconomic level (1-4)
    #[arg(long, value_name = "N")]
    pub nse: Option<i32>,
}

impl FilterArgs {
    /// Convert to survey filters. No age flags means no age filter.
    #[must_use]
    pub fn to_filters(&self) -> ResponseFilters {
        let edad = AgeRange {
            min: self.edad_min,
            max: self.edad_max,
        };
        ResponseFilters {
            calidad_vida: self.calidad_vida,
            municipio: self.municipio,
            sexo: self.sexo,
            escolaridad: self.escolaridad,
            nse: self.nse,
            edad: (!edad.is_empty()).then_some(edad),
        }
    }
}

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Interface to bind (overrides configuration)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (overrides configuration)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Survey data file (overrides configuration)
    #[arg(short, long, value_name = "PATH")]
    pub data: Option<PathBuf>,
}

/// Questions command arguments.
#[derive(Debug, Args)]
pub struct QuestionsCommand {
    /// Only questions in this category
    #[arg(long, value_name = "ID")]
    pub category: Option<u8>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Responses command arguments.
#[derive(Debug, Args)]
pub struct ResponsesCommand {
    /// Question identifier (e.g. Q_1, T_Q_12_1)
    pub id: String,

    /// Report percentages instead of counts
    #[arg(long)]
    pub percent: bool,

    /// Demographic filters
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Categories command arguments.
#[derive(Debug, Args)]
pub struct CategoriesCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Analyze command arguments.
#[derive(Debug, Args)]
pub struct AnalyzeCommand {
    /// Survey data file (overrides configuration)
    #[arg(short, long, value_name = "PATH")]
    pub data: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(short, long, value_name = "FILE", default_value = "data_info.json")]
    pub output: PathBuf,

    /// Print the text report instead of writing JSON
    #[arg(short, long)]
    pub text: bool,
}

/// Subset command arguments.
#[derive(Debug, Args)]
pub struct SubsetCommand {
    /// Output `.sav` file
    pub output: PathBuf,

    /// Demographic filters
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Compress case data with zlib (`.zsav`)
    #[arg(long)]
    pub compress: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
