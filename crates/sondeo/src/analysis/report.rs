//! Console rendering of the analysis report.

use std::fmt::{self, Display, Formatter};

use super::{groups, ColumnStats, DataInfo};

const RULE_WIDTH: usize = 80;

#[derive(Debug)]
struct TextReport<'a>(&'a DataInfo);

/// Render the report as plain text, in numbered sections.
#[must_use]
pub fn render_text(info: &DataInfo) -> String {
    TextReport(info).to_string()
}

fn heading(f: &mut Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{title}")?;
    writeln!(f, "{}", "-".repeat(RULE_WIDTH))
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

impl Display for TextReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let info = self.0;
        let rule = "=".repeat(RULE_WIDTH);

        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "ANÁLISIS COMPLETO DEL ARCHIVO {}",
            info.archivo.to_uppercase()
        )?;
        writeln!(f, "{rule}")?;

        heading(f, "1. INFORMACIÓN BÁSICA")?;
        writeln!(f, "Número de filas (casos): {}", info.estructura.filas)?;
        writeln!(
            f,
            "Número de columnas (variables): {}",
            info.estructura.columnas
        )?;
        let [filas, columnas] = info.estructura.dimensiones;
        writeln!(f, "Dimensiones: ({filas}, {columnas})")?;

        heading(f, "2. COLUMNAS/VARIABLES")?;
        for (i, name) in info.columnas.iter().enumerate() {
            writeln!(f, "{}. {name}", i + 1)?;
        }

        heading(f, "3. TIPOS DE DATOS")?;
        let width = info.columnas.iter().map(String::len).max().unwrap_or(0);
        for (name, dtype) in &info.tipos_datos {
            writeln!(f, "{name:<width$}    {dtype}")?;
        }

        heading(f, "4. METADATOS DEL ARCHIVO SPSS")?;
        writeln!(
            f,
            "Número de variables: {}",
            info.metadatos.numero_variables
        )?;
        writeln!(f, "Número de casos: {}", info.metadatos.numero_casos)?;

        heading(f, "5. ETIQUETAS DE COLUMNAS")?;
        if info.metadatos.etiquetas_columnas.is_empty() {
            writeln!(f, "No hay etiquetas de columnas disponibles")?;
        }
        for (name, label) in &info.metadatos.etiquetas_columnas {
            writeln!(f, "{name}: {label}")?;
        }

        heading(f, "6. ETIQUETAS DE VALORES (Variables Categóricas)")?;
        if info.metadatos.etiquetas_valores.is_empty() {
            writeln!(f, "No hay etiquetas de valores disponibles")?;
        }
        for (name, labels) in &info.metadatos.etiquetas_valores {
            writeln!(f, "\n{name}:")?;
            for (value, label) in labels {
                writeln!(f, "  {value}: {label}")?;
            }
        }

        heading(f, "7. ESTADÍSTICAS DESCRIPTIVAS")?;
        for (name, stats) in &info.estadisticas_descriptivas {
            match stats {
                ColumnStats::Numeric {
                    media,
                    mediana,
                    min,
                    max,
                    desviacion_std,
                    valores_unicos,
                } => writeln!(
                    f,
                    "{name:<width$}  media={} mediana={} min={} max={} std={} únicos={valores_unicos}",
                    number(*media),
                    number(*mediana),
                    number(*min),
                    number(*max),
                    number(*desviacion_std),
                )?,
                ColumnStats::Text {
                    valores_unicos,
                    valor_mas_frecuente,
                    frecuencia_mas_comun,
                } => writeln!(
                    f,
                    "{name:<width$}  únicos={valores_unicos} más frecuente={:?} ({frecuencia_mas_comun})",
                    valor_mas_frecuente.as_deref().unwrap_or(""),
                )?,
            }
        }

        heading(f, "8. VALORES FALTANTES")?;
        if info.valores_faltantes.is_empty() {
            writeln!(f, "No hay valores faltantes")?;
        }
        for (name, count) in &info.valores_faltantes {
            writeln!(f, "{name:<width$}    {count}")?;
        }

        let calidad = &info.calidad;
        heading(f, "9. CALIDAD DE LOS DATOS")?;
        writeln!(f, "Grupos de variables:")?;
        for (group, count) in &calidad.grupos_variables {
            match groups::describe(group) {
                Some(description) => writeln!(f, "  {group}: {count} ({description})")?,
                None => writeln!(f, "  {group}: {count}")?,
            }
        }
        if !calidad.porcentaje_faltantes.is_empty() {
            writeln!(f, "Porcentaje de faltantes:")?;
            for (name, pct) in &calidad.porcentaje_faltantes {
                writeln!(f, "  {name}: {pct:.2}%")?;
            }
        }
        if !calidad.codigos_centinela.is_empty() {
            writeln!(f, "Códigos centinela (-1 no aplica, -2 NS/NC):")?;
            for (name, counts) in &calidad.codigos_centinela {
                writeln!(
                    f,
                    "  {name}: no aplica={} ns/nc={}",
                    counts.no_aplica, counts.ns_nc
                )?;
            }
        }
        match &calidad.factor_expansion {
            Some(w) => writeln!(
                f,
                "Factor de expansión ({}): n={} suma={:.2} media={:.4} min={:.4} max={:.4}",
                w.variable, w.n, w.suma, w.media, w.min, w.max
            )?,
            None => writeln!(f, "Sin factor de expansión")?,
        }

        writeln!(f)?;
        writeln!(f, "{rule}")?;
        if let Some(hash) = &info.huella_blake3 {
            writeln!(f, "Huella BLAKE3: {hash}")?;
        }
        writeln!(f, "Fecha de análisis: {}", info.fecha_analisis)?;
        writeln!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::sav::{Column, Dataset, Variable};

    fn info() -> DataInfo {
        let dataset = Dataset::new(
            vec![
                Variable::numeric("Q_1").with_label("Pregunta uno"),
                Variable::numeric("FACTOR"),
            ],
            vec![
                Column::Numeric(vec![Some(1.0), Some(-1.0), None]),
                Column::Numeric(vec![Some(1.5), Some(2.5), Some(3.0)]),
            ],
        )
        .unwrap();
        analyze(&dataset, "datos.sav")
    }

    #[test]
    fn test_sections_in_order() {
        let text = render_text(&info());
        let positions: Vec<usize> = [
            "ANÁLISIS COMPLETO DEL ARCHIVO DATOS.SAV",
            "1. INFORMACIÓN BÁSICA",
            "2. COLUMNAS/VARIABLES",
            "3. TIPOS DE DATOS",
            "4. METADATOS DEL ARCHIVO SPSS",
            "5. ETIQUETAS DE COLUMNAS",
            "6. ETIQUETAS DE VALORES",
            "7. ESTADÍSTICAS DESCRIPTIVAS",
            "8. VALORES FALTANTES",
            "9. CALIDAD DE LOS DATOS",
        ]
        .iter()
        .map(|s| text.find(s).unwrap_or_else(|| panic!("missing {s}")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_content() {
        let text = render_text(&info());
        assert!(text.contains("Número de filas (casos): 3"));
        assert!(text.contains("Dimensiones: (3, 2)"));
        assert!(text.contains("Q_1: Pregunta uno"));
        assert!(text.contains("No hay etiquetas de valores disponibles"));
        assert!(text.contains("no aplica=1"));
        assert!(text.contains("Factor de expansión (FACTOR): n=3 suma=7.00"));
        assert!(text.contains("  pregunta_simple: 1 (Preguntas simples)"));
        assert!(text.contains("  derivada: 1 (Indicadores derivados)"));
    }
}
