//! Variable naming groups.
//!
//! Survey variables follow naming conventions (`Q_12`, `T_Q_3_1`,
//! `Q_7_O2`, `Q_4_S`, ...). Each pattern below names one group; a
//! variable belongs to the first group whose pattern matches.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

/// Group for names matching no pattern.
pub const OTHER_GROUP: &str = "otra";

/// A compiled naming pattern.
#[derive(Debug)]
pub struct GroupPattern {
    /// Group name as reported.
    pub name: &'static str,

    /// What the group holds.
    pub description: &'static str,

    regex: Regex,
}

impl GroupPattern {
    fn new(name: &'static str, description: &'static str, pattern: &str) -> Option<Self> {
        Regex::new(pattern).ok().map(|regex| Self {
            name,
            description,
            regex,
        })
    }

    /// Check if a variable name belongs to this group.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

static PATTERNS: LazyLock<Vec<GroupPattern>> = LazyLock::new(|| {
    [
        (
            "control",
            "Control de la entrevista",
            r"^(?i:SbjNum|Date|Duration|Srvyr|Upload|Latitude|Longitude)$",
        ),
        ("tabla", "Filas de tabla", r"^T_Q_\d+_\d+$"),
        ("opcion_multiple", "Opciones de respuesta múltiple", r"^Q_\d+_O\d+$"),
        ("especifique", "Texto libre de otro, especifique", r"_S$"),
        ("codificada", "Respuestas recodificadas", r"_C$"),
        ("pregunta_simple", "Preguntas simples", r"^Q_\d+$"),
        ("derivada", "Indicadores derivados", r"^[A-Z][A-Z0-9_]*$"),
    ]
    .into_iter()
    .filter_map(|(name, description, pattern)| GroupPattern::new(name, description, pattern))
    .collect()
});

/// The built-in patterns in match order.
#[must_use]
pub fn patterns() -> &'static [GroupPattern] {
    &PATTERNS
}

/// The group a variable name belongs to.
#[must_use]
pub fn classify(name: &str) -> &'static str {
    patterns()
        .iter()
        .find(|p| p.matches(name))
        .map_or(OTHER_GROUP, |p| p.name)
}

/// Description of a group, or `None` for [`OTHER_GROUP`] and unknown names.
#[must_use]
pub fn describe(group: &str) -> Option<&'static str> {
    patterns()
        .iter()
        .find(|p| p.name == group)
        .map(|p| p.description)
}

/// Number of variables per group, in pattern order. Empty groups are left out.
#[must_use]
pub fn count_groups<'a>(names: impl IntoIterator<Item = &'a str>) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = patterns()
        .iter()
        .map(|p| (p.name.to_string(), 0))
        .chain(std::iter::once((OTHER_GROUP.to_string(), 0)))
        .collect();
    for name in names {
        if let Some(count) = counts.get_mut(classify(name)) {
            *count += 1;
        }
    }
    counts.retain(|_, count| *count > 0);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(patterns().len(), 7);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("Q_12"), "pregunta_simple");
        assert_eq!(classify("T_Q_3_1"), "tabla");
        assert_eq!(classify("Q_7_O2"), "opcion_multiple");
        assert_eq!(classify("Q_4_S"), "especifique");
        assert_eq!(classify("NSE2024_C"), "codificada");
        assert_eq!(classify("CALIDAD_VIDA"), "derivada");
        assert_eq!(classify("SEXO"), "derivada");
        assert_eq!(classify("SbjNum"), "control");
        assert_eq!(classify("Duration"), "control");
        assert_eq!(classify("filter_$"), OTHER_GROUP);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe("tabla"), Some("Filas de tabla"));
        assert_eq!(describe("pregunta_simple"), Some("Preguntas simples"));
        assert_eq!(describe(OTHER_GROUP), None);
    }

    #[test]
    fn test_count_groups_keeps_order_and_drops_empty() {
        let counts = count_groups(["Q_1", "Q_2", "SEXO", "Q_1_O1", "x"]);
        let keys: Vec<_> = counts.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["opcion_multiple", "pregunta_simple", "derivada", "otra"]);
        assert_eq!(counts["pregunta_simple"], 2);
    }
}
