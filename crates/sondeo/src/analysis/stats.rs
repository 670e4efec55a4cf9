//! Per-column descriptive statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::sav::Column;

/// Descriptive statistics for one column, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tipo")]
pub enum ColumnStats {
    /// Numeric column. Every statistic is `None` when all values are missing.
    #[serde(rename = "numérica")]
    Numeric {
        /// Arithmetic mean.
        media: Option<f64>,
        /// Median.
        mediana: Option<f64>,
        /// Smallest value.
        min: Option<f64>,
        /// Largest value.
        max: Option<f64>,
        /// Sample standard deviation. Needs two values.
        desviacion_std: Option<f64>,
        /// Distinct non-missing values.
        valores_unicos: usize,
    },
    /// Text column.
    #[serde(rename = "categórica/texto")]
    Text {
        /// Distinct non-missing values.
        valores_unicos: usize,
        /// Most frequent value, the smallest one on ties.
        valor_mas_frecuente: Option<String>,
        /// How often the most frequent value occurs.
        frecuencia_mas_comun: usize,
    },
}

/// Summary of a numeric sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of values.
    pub n: usize,
    /// Sum.
    pub sum: f64,
    /// Mean.
    pub mean: f64,
    /// Median.
    pub median: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Sample standard deviation (n - 1), `None` below two values.
    pub std_dev: Option<f64>,
}

impl Summary {
    /// Summarize the values, `None` for an empty sample.
    #[must_use]
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let sum: f64 = sorted.iter().sum();
        let mean = sum / n as f64;
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        let std_dev = (n >= 2).then(|| {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        });

        Some(Self {
            n,
            sum,
            mean,
            median,
            min: sorted[0],
            max: sorted[n - 1],
            std_dev,
        })
    }
}

/// Compute the statistics of a column.
#[must_use]
pub fn column_stats(column: &Column) -> ColumnStats {
    match column {
        Column::Numeric(values) => {
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            let mut distinct = present.clone();
            distinct.sort_by(f64::total_cmp);
            distinct.dedup();
            let summary = Summary::of(&present);

            ColumnStats::Numeric {
                media: summary.map(|s| s.mean),
                mediana: summary.map(|s| s.median),
                min: summary.map(|s| s.min),
                max: summary.map(|s| s.max),
                desviacion_std: summary.and_then(|s| s.std_dev),
                valores_unicos: distinct.len(),
            }
        }
        Column::Text(values) => {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for value in values.iter().flatten() {
                *counts.entry(value.as_str()).or_insert(0) += 1;
            }
            // Strict comparison keeps the first, i.e. smallest, of tied modes.
            let mode = counts.iter().fold(None, |best: Option<(&str, usize)>, (&v, &c)| {
                match best {
                    Some((_, best_count)) if best_count >= c => best,
                    _ => Some((v, c)),
                }
            });

            ColumnStats::Text {
                valores_unicos: counts.len(),
                valor_mas_frecuente: mode.map(|(v, _)| v.to_string()),
                frecuencia_mas_comun: mode.map_or(0, |(_, c)| c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_numeric_stats() {
        let column = Column::Numeric(vec![Some(1.0), Some(2.0), None, Some(3.0), Some(2.0)]);
        let ColumnStats::Numeric {
            media,
            mediana,
            min,
            max,
            desviacion_std,
            valores_unicos,
        } = column_stats(&column)
        else {
            panic!("expected numeric stats");
        };

        assert!(approx(media, 2.0));
        assert!(approx(mediana, 2.0));
        assert!(approx(min, 1.0));
        assert!(approx(max, 3.0));
        assert!(approx(desviacion_std, (2.0_f64 / 3.0).sqrt()));
        assert_eq!(valores_unicos, 3);
    }

    #[test]
    fn test_even_median() {
        let summary = Summary::of(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!((summary.median - 2.5).abs() < 1e-9);
        assert!((summary.sum - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_missing_numeric() {
        let stats = column_stats(&Column::Numeric(vec![None, None]));
        assert_eq!(
            stats,
            ColumnStats::Numeric {
                media: None,
                mediana: None,
                min: None,
                max: None,
                desviacion_std: None,
                valores_unicos: 0,
            }
        );
    }

    #[test]
    fn test_single_value_has_no_std() {
        let summary = Summary::of(&[5.0]).unwrap();
        assert_eq!(summary.std_dev, None);
        assert!(Summary::of(&[]).is_none());
    }

    #[test]
    fn test_text_mode_ties_pick_smallest() {
        let column = Column::Text(vec![
            Some("b".into()),
            Some("a".into()),
            Some("b".into()),
            Some("a".into()),
            None,
            Some("c".into()),
        ]);
        assert_eq!(
            column_stats(&column),
            ColumnStats::Text {
                valores_unicos: 3,
                valor_mas_frecuente: Some("a".to_string()),
                frecuencia_mas_comun: 2,
            }
        );
    }

    #[test]
    fn test_empty_text_column() {
        assert_eq!(
            column_stats(&Column::Text(Vec::new())),
            ColumnStats::Text {
                valores_unicos: 0,
                valor_mas_frecuente: None,
                frecuencia_mas_comun: 0,
            }
        );
    }

    #[test]
    fn test_serialization_tags() {
        let json = serde_json::to_value(column_stats(&Column::Numeric(vec![None]))).unwrap();
        assert_eq!(json["tipo"], "numérica");
        assert!(json["media"].is_null());

        let json = serde_json::to_value(column_stats(&Column::Text(vec![Some("x".into())]))).unwrap();
        assert_eq!(json["tipo"], "categórica/texto");
        assert_eq!(json["valor_mas_frecuente"], "x");
    }
}
