//! Response counting.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::sav::{Column, Value, Variable};

use super::ResponseKind;

/// The measure attached to one answer: a count or a percentage.
///
/// Serializes as a single key named after the response kind, so an entry
/// reads `{"valor": 1.0, "etiqueta": "Sí", "cantidad": 12}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Amount {
    /// Number of respondents.
    Cantidad(u64),
    /// Share of respondents, rounded to two decimals.
    Porcentaje(f64),
}

/// One answer value with its label and measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEntry {
    /// Stored value.
    pub valor: Value,
    /// Value label, or the value's text form when unlabelled.
    pub etiqueta: String,
    /// Count or percentage.
    #[serde(flatten)]
    pub amount: Amount,
}

/// Round to two decimal places.
///
/// Rounds the exact binary value, with ties to even, so `0.125` gives `0.12`.
/// Scaling by 100 first would round the inexact product instead.
#[must_use]
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Count the non-missing values of `column` over `rows`.
///
/// Entries are ordered numbers first (ascending), then text. Returns the
/// entries and the number of counted responses.
pub fn tally(
    variable: &Variable,
    column: &Column,
    rows: impl IntoIterator<Item = usize>,
    kind: ResponseKind,
) -> (Vec<ResponseEntry>, u64) {
    let mut counts: BTreeMap<Value, u64> = BTreeMap::new();
    for row in rows {
        if let Some(value) = column.get(row) {
            *counts.entry(value).or_insert(0) += 1;
        }
    }
    let total: u64 = counts.values().sum();

    let entries = counts
        .into_iter()
        .map(|(value, count)| {
            let etiqueta = variable
                .value_labels
                .get(&value)
                .map_or_else(|| value.to_string(), str::to_string);
            let amount = match kind {
                ResponseKind::Cantidad => Amount::Cantidad(count),
                ResponseKind::Porcentaje if total > 0 => {
                    Amount::Porcentaje(round2(count as f64 / total as f64 * 100.0))
                }
                ResponseKind::Porcentaje => Amount::Porcentaje(0.0),
            };
            ResponseEntry {
                valor: value,
                etiqueta,
                amount,
            }
        })
        .collect();

    (entries, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sav::ValueLabels;

    fn variable() -> Variable {
        let labels: ValueLabels = [(1.0, "Sí"), (2.0, "No")].into_iter().collect();
        Variable::numeric("Q_1").with_value_labels(labels)
    }

    #[test]
    fn test_counts_sorted_and_labelled() {
        let column = Column::Numeric(vec![Some(2.0), Some(1.0), None, Some(2.0), Some(3.0)]);
        let (entries, total) = tally(&variable(), &column, 0..5, ResponseKind::Cantidad);

        assert_eq!(total, 4);
        let values: Vec<_> = entries.iter().map(|e| e.valor.clone()).collect();
        assert_eq!(
            values,
            vec![Value::from(1.0), Value::from(2.0), Value::from(3.0)]
        );
        assert_eq!(entries[0].etiqueta, "Sí");
        assert_eq!(entries[1].amount, Amount::Cantidad(2));
        assert_eq!(entries[2].etiqueta, "3.0");
    }

    #[test]
    fn test_percentages_round_to_two_decimals() {
        let column = Column::Numeric(vec![Some(1.0), Some(2.0), Some(2.0)]);
        let (entries, total) = tally(&variable(), &column, 0..3, ResponseKind::Porcentaje);

        assert_eq!(total, 3);
        assert_eq!(entries[0].amount, Amount::Porcentaje(33.33));
        assert_eq!(entries[1].amount, Amount::Porcentaje(66.67));
    }

    #[test]
    fn test_empty_rows() {
        let column = Column::Numeric(vec![Some(1.0)]);
        let (entries, total) = tally(&variable(), &column, Vec::new(), ResponseKind::Porcentaje);
        assert!(entries.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn test_text_values_include_empty_strings() {
        let variable = Variable::string("Q_4_S", 10);
        let column = Column::Text(vec![
            Some("otro".into()),
            Some(String::new()),
            Some("otro".into()),
            None,
        ]);
        let (entries, total) = tally(&variable, &column, 0..4, ResponseKind::Cantidad);
        assert_eq!(total, 3);
        assert_eq!(entries[0].valor, Value::from(""));
        assert_eq!(entries[1].amount, Amount::Cantidad(2));
    }

    #[test]
    fn test_entry_serialization() {
        let entry = ResponseEntry {
            valor: Value::from(1.0),
            etiqueta: "Sí".to_string(),
            amount: Amount::Cantidad(12),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"valor": 1.0, "etiqueta": "Sí", "cantidad": 12})
        );

        let entry = ResponseEntry {
            amount: Amount::Porcentaje(45.5),
            ..entry
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["porcentaje"], serde_json::json!(45.5));
    }

    #[test]
    fn test_round2() {
        assert!((round2(12.345_6) - 12.35).abs() < 1e-9);
        assert!((round2(100.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_round2_ties() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.625), 0.62);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-0.125), -0.12);
        // 1 of 800 and 1 of 160 responses, as percentages.
        assert_eq!(round2(1.0 / 800.0 * 100.0), 0.12);
        assert_eq!(round2(1.0 / 160.0 * 100.0), 0.62);
        assert_eq!(round2(2.0 / 3.0 * 100.0), 66.67);
    }
}
