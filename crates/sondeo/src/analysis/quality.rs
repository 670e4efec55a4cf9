//! Data quality indicators: missing shares, sentinel codes, naming groups
//! and the weighting factor.

use indexmap::IndexMap;
use serde::Serialize;

use crate::sav::{Column, Dataset, Variable};
use crate::survey::round2;

use super::groups::count_groups;
use super::stats::Summary;

/// Code for "does not apply".
pub const NO_APLICA: f64 = -1.0;

/// Code for "does not know / no answer".
pub const NS_NC: f64 = -2.0;

/// Fallback name of the weighting variable.
pub const WEIGHT_FALLBACK: &str = "FACTOR";

/// Occurrences of the sentinel codes in one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentinelCounts {
    /// Cases coded -1.
    pub no_aplica: usize,
    /// Cases coded -2.
    pub ns_nc: usize,
}

/// Statistics of the weighting factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightStats {
    /// Weighting variable.
    pub variable: String,
    /// Cases with a weight.
    pub n: usize,
    /// Sum of weights.
    pub suma: f64,
    /// Mean weight.
    pub media: f64,
    /// Smallest weight.
    pub min: f64,
    /// Largest weight.
    pub max: f64,
    /// Sample standard deviation.
    pub desviacion_std: Option<f64>,
    /// Population represented by the sample.
    pub poblacion_estimada: f64,
}

/// The quality section of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quality {
    /// Missing share per column, in percent. Complete columns are left out.
    pub porcentaje_faltantes: IndexMap<String, f64>,
    /// Sentinel counts per column. Columns without sentinels are left out.
    pub codigos_centinela: IndexMap<String, SentinelCounts>,
    /// Variables per naming group.
    pub grupos_variables: IndexMap<String, usize>,
    /// Weighting factor, if the file has one.
    pub factor_expansion: Option<WeightStats>,
}

/// Compute the quality section.
#[must_use]
pub fn assess(dataset: &Dataset) -> Quality {
    let cases = dataset.case_count();
    let mut porcentaje_faltantes = IndexMap::new();
    let mut codigos_centinela = IndexMap::new();

    for (variable, column) in dataset.variables.iter().zip(&dataset.columns) {
        let missing = column.missing_count();
        if missing > 0 && cases > 0 {
            porcentaje_faltantes.insert(
                variable.name.clone(),
                round2(missing as f64 / cases as f64 * 100.0),
            );
        }

        let counts = sentinel_counts(column);
        if counts != SentinelCounts::default() {
            codigos_centinela.insert(variable.name.clone(), counts);
        }
    }

    Quality {
        porcentaje_faltantes,
        codigos_centinela,
        grupos_variables: count_groups(dataset.variables.iter().map(|v| v.name.as_str())),
        factor_expansion: weight_stats(dataset),
    }
}

/// Count the sentinel codes in a numeric column.
#[must_use]
pub fn sentinel_counts(column: &Column) -> SentinelCounts {
    let Column::Numeric(values) = column else {
        return SentinelCounts::default();
    };
    values
        .iter()
        .flatten()
        .fold(SentinelCounts::default(), |mut counts, &value| {
            if value == NO_APLICA {
                counts.no_aplica += 1;
            } else if value == NS_NC {
                counts.ns_nc += 1;
            }
            counts
        })
}

/// The weighting variable: the one the file header names, else `FACTOR`.
#[must_use]
pub fn weight_variable(dataset: &Dataset) -> Option<&Variable> {
    dataset
        .weight_variable()
        .or_else(|| dataset.variable(WEIGHT_FALLBACK))
        .filter(|v| v.var_type.is_numeric())
}

/// Statistics of the weighting factor, if any.
#[must_use]
pub fn weight_stats(dataset: &Dataset) -> Option<WeightStats> {
    let variable = weight_variable(dataset)?;
    let Some(Column::Numeric(values)) = dataset.column(&variable.name) else {
        return None;
    };
    let weights: Vec<f64> = values.iter().flatten().copied().collect();
    let summary = Summary::of(&weights)?;

    Some(WeightStats {
        variable: variable.name.clone(),
        n: summary.n,
        suma: summary.sum,
        media: summary.mean,
        min: summary.min,
        max: summary.max,
        desviacion_std: summary.std_dev,
        poblacion_estimada: summary.sum,
    })
}
