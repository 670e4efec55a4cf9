//! Demographic filters over survey cases.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::sav::{Column, Dataset, Variable};

/// Column holding the respondent's age in years.
pub const AGE_COLUMN: &str = "Q_75";

/// Equality filters, in the order they are applied, with their columns.
pub const FILTER_COLUMNS: [(&str, &str); 5] = [
    ("calidad_vida", "CALIDAD_VIDA"),
    ("municipio", "Q_94"),
    ("sexo", "SEXO"),
    ("escolaridad", "ESC"),
    ("nse", "NSE2024_C"),
];

/// Inclusive age bounds. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    /// Lowest age kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
    /// Highest age kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,
}

impl AgeRange {
    /// Check if neither bound is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Check if an age falls inside the range.
    #[must_use]
    pub fn contains(&self, age: f64) -> bool {
        self.min.map_or(true, |min| age >= f64::from(min))
            && self.max.map_or(true, |max| age <= f64::from(max))
    }
}

/// Filters requested for a tally. Unset fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseFilters {
    /// Quality of life index (1-3).
    pub calidad_vida: Option<i32>,
    /// Municipality code (1-6).
    pub municipio: Option<i32>,
    /// Sex (1-2).
    pub sexo: Option<i32>,
    /// Schooling level (1-3).
    pub escolaridad: Option<i32>,
    /// Socioeconomic level (1-4).
    pub nse: Option<i32>,
    /// Age range.
    pub edad: Option<AgeRange>,
}

impl ResponseFilters {
    /// Check if no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.equality_filters().all(|(_, _, value)| value.is_none())
            && self.edad.map_or(true, |range| range.is_empty())
    }

    /// `(key, column, value)` for each equality filter, in application order.
    pub fn equality_filters(&self) -> impl Iterator<Item = (&'static str, &'static str, Option<i32>)> {
        let values = [
            self.calidad_vida,
            self.municipio,
            self.sexo,
            self.escolaridad,
            self.nse,
        ];
        FILTER_COLUMNS
            .into_iter()
            .zip(values)
            .map(|((key, column), value)| (key, column, value))
    }
}

/// Filters that were actually applied, keyed as in the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AppliedFilters(IndexMap<String, serde_json::Value>);

impl AppliedFilters {
    /// Look up an applied filter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Number of applied filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing was applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Applied filter keys, in application order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn record(&mut self, key: &str, value: serde_json::Value) {
        self.0.insert(key.to_string(), value);
    }
}

/// Rows passing every applicable filter, plus the filters that applied.
///
/// A filter whose column is absent from the dataset is skipped and not
/// recorded. Missing cells never match.
#[must_use]
pub fn matching_rows(dataset: &Dataset, filters: &ResponseFilters) -> (Vec<usize>, AppliedFilters) {
    let mut rows: Vec<usize> = (0..dataset.case_count()).collect();
    let mut applied = AppliedFilters::default();

    for (key, column_name, value) in filters.equality_filters() {
        let Some(value) = value else { continue };
        let Some(index) = dataset.index_of(column_name) else {
            continue;
        };
        let (variable, column) = (&dataset.variables[index], &dataset.columns[index]);
        let wanted = f64::from(value);
        rows.retain(|&row| valid_number(variable, column, row) == Some(wanted));
        applied.record(key, serde_json::Value::from(value));
    }

    if let Some(range) = filters.edad.filter(|r| !r.is_empty()) {
        if let Some(index) = dataset.index_of(AGE_COLUMN) {
            let (variable, column) = (&dataset.variables[index], &dataset.columns[index]);
            rows.retain(|&row| {
                valid_number(variable, column, row).is_some_and(|age| range.contains(age))
            });
            applied.record(
                "edad",
                serde_json::to_value(range).unwrap_or(serde_json::Value::Null),
            );
        }
    }

    (rows, applied)
}

/// A cell's number, with declared user-missing codes treated as missing.
///
/// Datasets read with user-missing values kept still filter as if they
/// had been dropped.
fn valid_number(variable: &Variable, column: &Column, row: usize) -> Option<f64> {
    column
        .number(row)
        .filter(|&n| !variable.missing.contains_number(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sav::{MissingValue, MissingValues};

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                Variable::numeric("SEXO"),
                Variable::numeric("Q_94"),
                Variable::numeric("Q_75"),
                Variable::string("ESC", 4),
            ],
            vec![
                Column::Numeric(vec![Some(1.0), Some(2.0), Some(1.0), None, Some(1.0)]),
                Column::Numeric(vec![Some(3.0), Some(3.0), Some(1.0), Some(3.0), Some(3.0)]),
                Column::Numeric(vec![Some(18.0), Some(40.0), Some(65.0), Some(30.0), None]),
                Column::Text(vec![Some("1".into()); 5]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_no_filters_keeps_everything() {
        let (rows, applied) = matching_rows(&dataset(), &ResponseFilters::default());
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
        assert!(applied.is_empty());
    }

    #[test]
    fn test_equality_filters_combine() {
        let filters = ResponseFilters {
            sexo: Some(1),
            municipio: Some(3),
            ..ResponseFilters::default()
        };
        let (rows, applied) = matching_rows(&dataset(), &filters);
        assert_eq!(rows, vec![0, 4]);
        assert_eq!(applied.keys().collect::<Vec<_>>(), vec!["municipio", "sexo"]);
        assert_eq!(applied.get("sexo"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_absent_column_is_not_recorded() {
        let filters = ResponseFilters {
            nse: Some(2),
            ..ResponseFilters::default()
        };
        let (rows, applied) = matching_rows(&dataset(), &filters);
        assert_eq!(rows.len(), 5);
        assert!(applied.get("nse").is_none());
    }

    #[test]
    fn test_text_column_matches_nothing() {
        let filters = ResponseFilters {
            escolaridad: Some(1),
            ..ResponseFilters::default()
        };
        let (rows, applied) = matching_rows(&dataset(), &filters);
        assert!(rows.is_empty());
        assert_eq!(applied.len(), 1);
    }

    #[test]
    fn test_age_range_is_inclusive() {
        let filters = ResponseFilters {
            edad: Some(AgeRange {
                min: Some(18),
                max: Some(40),
            }),
            ..ResponseFilters::default()
        };
        let (rows, applied) = matching_rows(&dataset(), &filters);
        assert_eq!(rows, vec![0, 1, 3]);
        assert_eq!(
            applied.get("edad"),
            Some(&serde_json::json!({"min": 18, "max": 40}))
        );
    }

    #[test]
    fn test_open_age_range() {
        let filters = ResponseFilters {
            edad: Some(AgeRange {
                min: Some(35),
                max: None,
            }),
            ..ResponseFilters::default()
        };
        let (rows, applied) = matching_rows(&dataset(), &filters);
        assert_eq!(rows, vec![1, 2]);
        assert_eq!(applied.get("edad"), Some(&serde_json::json!({"min": 35})));
    }

    #[test]
    fn test_empty_age_range_is_ignored() {
        let filters = ResponseFilters {
            edad: Some(AgeRange::default()),
            ..ResponseFilters::default()
        };
        assert!(filters.is_empty());
        let (rows, applied) = matching_rows(&dataset(), &filters);
        assert_eq!(rows.len(), 5);
        assert!(applied.is_empty());
    }

    #[test]
    fn test_user_missing_codes_never_match() {
        let dataset = Dataset::new(
            vec![
                Variable::numeric("SEXO")
                    .with_missing(MissingValues::Discrete(vec![MissingValue::Number(9.0)])),
                Variable::numeric("Q_75").with_missing(MissingValues::Range {
                    low: 98.0,
                    high: 99.0,
                    discrete: None,
                }),
            ],
            vec![
                Column::Numeric(vec![Some(1.0), Some(9.0), Some(1.0)]),
                Column::Numeric(vec![Some(30.0), Some(30.0), Some(99.0)]),
            ],
        )
        .unwrap();

        let by_sex = ResponseFilters {
            sexo: Some(9),
            ..ResponseFilters::default()
        };
        assert!(matching_rows(&dataset, &by_sex).0.is_empty());

        let by_age = ResponseFilters {
            edad: Some(AgeRange {
                min: Some(18),
                max: None,
            }),
            ..ResponseFilters::default()
        };
        assert_eq!(matching_rows(&dataset, &by_age).0, vec![0, 1]);
    }
}
