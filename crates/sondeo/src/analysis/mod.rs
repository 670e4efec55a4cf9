//! Dataset analysis report.
//!
//! [`analyze`] describes a dataset's structure, dictionary, per-column
//! statistics and data quality in a [`DataInfo`], which serializes to the
//! `data_info.json` layout and renders as a console report.

pub mod groups;
pub mod quality;
mod report;
pub mod stats;

use std::io::Cursor;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sav::{Column, Dataset, ReaderOptions, SavReader};

pub use quality::{Quality, SentinelCounts, WeightStats};
pub use report::render_text;
pub use stats::ColumnStats;

/// Shape of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Estructura {
    /// Number of cases.
    pub filas: usize,
    /// Number of variables.
    pub columnas: usize,
    /// `[filas, columnas]`.
    pub dimensiones: [usize; 2],
}

/// Dictionary summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadatos {
    /// Number of variables.
    pub numero_variables: usize,
    /// Number of cases.
    pub numero_casos: usize,
    /// Variable labels, for labelled variables.
    pub etiquetas_columnas: IndexMap<String, String>,
    /// Value labels keyed by the value's text form, for variables that have any.
    pub etiquetas_valores: IndexMap<String, IndexMap<String, String>>,
}

/// The full analysis report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataInfo {
    /// File the dataset came from.
    pub archivo: String,
    /// When the analysis ran, ISO 8601 local time.
    pub fecha_analisis: String,
    /// BLAKE3 hash of the file contents, when analyzed from a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub huella_blake3: Option<String>,
    /// Shape.
    pub estructura: Estructura,
    /// Variable names in order.
    pub columnas: Vec<String>,
    /// Storage type per variable: `float64` or `object`.
    pub tipos_datos: IndexMap<String, String>,
    /// Dictionary summary.
    pub metadatos: Metadatos,
    /// Statistics per variable.
    pub estadisticas_descriptivas: IndexMap<String, ColumnStats>,
    /// Missing count per variable, for variables with any.
    pub valores_faltantes: IndexMap<String, usize>,
    /// Data quality indicators.
    pub calidad: Quality,
}

/// Analyze a dataset.
#[must_use]
pub fn analyze(dataset: &Dataset, archivo: &str) -> DataInfo {
    let filas = dataset.case_count();
    let columnas = dataset.variables.len();
    let pairs = || dataset.variables.iter().zip(&dataset.columns);

    let tipos_datos: IndexMap<String, String> = pairs()
        .map(|(v, c)| (v.name.clone(), dtype(c).to_string()))
        .collect();

    let etiquetas_columnas: IndexMap<String, String> = dataset
        .variables
        .iter()
        .filter_map(|v| v.label_text().map(|l| (v.name.clone(), l.to_string())))
        .collect();

    let etiquetas_valores: IndexMap<String, IndexMap<String, String>> = dataset
        .variables
        .iter()
        .filter(|v| !v.value_labels.is_empty())
        .map(|v| {
            let labels: IndexMap<String, String> = v
                .value_labels
                .iter()
                .map(|(value, label)| (value.to_string(), label.to_string()))
                .collect();
            (v.name.clone(), labels)
        })
        .collect();

    let estadisticas_descriptivas: IndexMap<String, ColumnStats> = pairs()
        .map(|(v, c)| (v.name.clone(), stats::column_stats(c)))
        .collect();

    let valores_faltantes: IndexMap<String, usize> = pairs()
        .map(|(v, c)| (v.name.clone(), c.missing_count()))
        .filter(|(_, missing)| *missing > 0)
        .collect();

    debug!("Analyzed {columnas} variables over {filas} cases");
    DataInfo {
        archivo: archivo.to_string(),
        fecha_analisis: chrono::Local::now()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string(),
        huella_blake3: None,
        estructura: Estructura {
            filas,
            columnas,
            dimensiones: [filas, columnas],
        },
        columnas: dataset.variables.iter().map(|v| v.name.clone()).collect(),
        tipos_datos,
        metadatos: Metadatos {
            numero_variables: columnas,
            numero_casos: filas,
            etiquetas_columnas,
            etiquetas_valores,
        },
        estadisticas_descriptivas,
        valores_faltantes,
        calidad: quality::assess(dataset),
    }
}

/// Read and analyze a system file, recording its fingerprint.
///
/// # Errors
///
/// Returns [`Error::DataFileNotFound`] if the file does not exist and
/// [`Error::DataFile`] if it cannot be decoded.
pub fn analyze_file(path: &Path, options: ReaderOptions) -> Result<DataInfo> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::DataFileNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(e),
    })?;
    let fingerprint = blake3::hash(&bytes).to_hex().to_string();

    let dataset = SavReader::with_options(Cursor::new(bytes), options).read_dataset()?;
    let mut info = analyze(&dataset, &path.display().to_string());
    info.huella_blake3 = Some(fingerprint);
    Ok(info)
}

/// Write the report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the file or its directory cannot be written.
pub fn write_json(info: &DataInfo, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let json = serde_json::to_string_pretty(info)?;
    std::fs::write(path, json)?;
    info!("Analysis written to {}", path.display());
    Ok(())
}

fn dtype(column: &Column) -> &'static str {
    if column.is_numeric() {
        "float64"
    } else {
        "object"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sav::{ValueLabels, Variable};
    use tempfile::TempDir;

    fn dataset() -> Dataset {
        let labels: ValueLabels = [(1.0, "Hombre"), (2.0, "Mujer")].into_iter().collect();
        Dataset::new(
            vec![
                Variable::numeric("SEXO")
                    .with_label("Sexo del entrevistado")
                    .with_value_labels(labels),
                Variable::string("Q_1_S", 8),
            ],
            vec![
                Column::Numeric(vec![Some(1.0), Some(2.0), None]),
                Column::Text(vec![Some("a".into()), Some("a".into()), Some("b".into())]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_structure_and_types() {
        let info = analyze(&dataset(), "datos.sav");
        assert_eq!(info.archivo, "datos.sav");
        assert_eq!(info.estructura.dimensiones, [3, 2]);
        assert_eq!(info.columnas, vec!["SEXO", "Q_1_S"]);
        assert_eq!(info.tipos_datos["SEXO"], "float64");
        assert_eq!(info.tipos_datos["Q_1_S"], "object");
        assert!(info.huella_blake3.is_none());
    }

    #[test]
    fn test_metadata() {
        let info = analyze(&dataset(), "datos.sav");
        assert_eq!(info.metadatos.numero_casos, 3);
        assert_eq!(
            info.metadatos.etiquetas_columnas.get("SEXO").map(String::as_str),
            Some("Sexo del entrevistado")
        );
        assert!(!info.metadatos.etiquetas_columnas.contains_key("Q_1_S"));
        assert_eq!(info.metadatos.etiquetas_valores["SEXO"]["2.0"], "Mujer");
    }

    #[test]
    fn test_missing_only_lists_incomplete_columns() {
        let info = analyze(&dataset(), "datos.sav");
        assert_eq!(info.valores_faltantes.len(), 1);
        assert_eq!(info.valores_faltantes["SEXO"], 1);
    }

    #[test]
    fn test_json_keys() {
        let json = serde_json::to_value(analyze(&dataset(), "datos.sav")).unwrap();
        for key in [
            "archivo",
            "fecha_analisis",
            "estructura",
            "columnas",
            "tipos_datos",
            "metadatos",
            "estadisticas_descriptivas",
            "valores_faltantes",
            "calidad",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert!(json.get("huella_blake3").is_none());
        assert_eq!(json["estructura"]["dimensiones"], serde_json::json!([3, 2]));
    }

    #[test]
    fn test_write_json_keeps_non_ascii() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("context").join("data_info.json");
        write_json(&analyze(&dataset(), "datos.sav"), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("numérica"));
        assert!(text.contains("\n  \"archivo\""));
    }

    #[test]
    fn test_analyze_file_missing() {
        let err = analyze_file(Path::new("/nonexistent/datos.sav"), ReaderOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::DataFileNotFound { .. }));
    }
}
