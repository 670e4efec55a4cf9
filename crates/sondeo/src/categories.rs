//! Thematic catalog of survey questions.
//!
//! Seventeen fixed categories group the questionnaire by topic. Every
//! question identifier in the dataset maps to at most one category.

use serde::Serialize;

/// A thematic question category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Category id (1..=17).
    pub id: u8,
    /// Display name.
    pub nombre: &'static str,
    /// What the questions in this category ask about.
    pub descripcion: &'static str,
}

const fn category(id: u8, nombre: &'static str, descripcion: &'static str) -> Category {
    Category {
        id,
        nombre,
        descripcion,
    }
}

/// All categories, ordered by id.
pub static CATEGORIES: [Category; 17] = [
    category(
        1,
        "Calidad de Vida y Satisfacción",
        "Preguntas sobre satisfacción con la vida, felicidad y relaciones personales",
    ),
    category(
        2,
        "Relaciones Familiares y del Hogar",
        "Preguntas sobre la dinámica familiar y distribución de tareas en el hogar",
    ),
    category(
        3,
        "Situación Económica",
        "Preguntas sobre satisfacción económica, ingresos y empleo",
    ),
    category(
        4,
        "Salud",
        "Preguntas sobre acceso a servicios de salud, bienestar físico y mental",
    ),
    category(
        5,
        "Educación y Tiempo Libre",
        "Preguntas sobre satisfacción educativa y uso del tiempo libre",
    ),
    category(
        6,
        "Vivienda y Servicios Públicos",
        "Preguntas sobre vivienda, servicios públicos y espacios en la colonia",
    ),
    category(
        7,
        "Movilidad y Transporte",
        "Preguntas sobre medios de transporte, tiempos de traslado y transporte público",
    ),
    category(
        8,
        "Seguridad Vial",
        "Preguntas sobre conductas de manejo, accidentes y seguridad vial",
    ),
    category(
        9,
        "Seguridad Pública",
        "Preguntas sobre percepción de seguridad, victimización y delincuencia",
    ),
    category(
        10,
        "Violencia y Agresiones",
        "Preguntas sobre experiencias de violencia, agresiones y acoso",
    ),
    category(
        11,
        "Medio Ambiente",
        "Preguntas sobre calidad del aire, agua y entorno urbano",
    ),
    category(
        12,
        "Participación Ciudadana",
        "Preguntas sobre membresía en organizaciones y formas de participación",
    ),
    category(
        13,
        "Igualdad y Discriminación",
        "Preguntas sobre percepción de igualdad y experiencias de discriminación",
    ),
    category(
        14,
        "Política y Confianza Institucional",
        "Preguntas sobre interés político, medios de información y confianza en instituciones",
    ),
    category(
        15,
        "Datos Sociodemográficos",
        "Información personal del encuestado: género, edad, escolaridad, ocupación",
    ),
    category(
        16,
        "Características del Hogar",
        "Información sobre la vivienda, equipamiento y composición del hogar",
    ),
    category(
        17,
        "Información de Control",
        "Datos de identificación, ubicación y control de la encuesta",
    ),
];

/// Question identifier to category id, in questionnaire order.
pub static QUESTION_CATEGORY_MAP: &[(&str, u8)] = &[
    // 1: Calidad de Vida y Satisfacción
    ("Q_1", 1),
    ("Q_2", 1),
    ("Q_3", 1),
    ("Q_4", 1),
    ("Q_4_S", 1),
    ("Q_5", 1),
    ("Q_6", 1),
    ("Q_7", 1),
    ("Q_8", 1),
    ("Q_9", 1),
    ("Q_10", 1),
    ("Q_11", 1),
    // 2: Relaciones Familiares y del Hogar
    ("T_Q_12_1", 2),
    ("T_Q_12_2", 2),
    ("T_Q_12_3", 2),
    ("T_Q_12_4", 2),
    ("T_Q_12_5", 2),
    ("T_Q_13_1", 2),
    ("T_Q_13_2", 2),
    ("T_Q_13_3", 2),
    ("T_Q_13_4", 2),
    ("T_Q_13_5", 2),
    ("T_Q_13_6", 2),
    // 3: Situación Económica
    ("Q_14", 3),
    ("Q_15", 3),
    ("Q_16", 3),
    ("Q_17", 3),
    ("Q_18", 3),
    ("Q_19", 3),
    ("Q_20", 3),
    ("Q_21", 3),
    // 4: Salud
    ("Q_22", 4),
    ("Q_23_O1", 4),
    ("Q_23_O2", 4),
    ("Q_23_O3", 4),
    ("Q_23_O4", 4),
    ("Q_23_O5", 4),
    ("Q_23_O6", 4),
    ("Q_23_O7", 4),
    ("Q_23_O8", 4),
    ("Q_23_O9", 4),
    ("Q_24", 4),
    ("Q_24_S", 4),
    ("T_Q_25_1", 4),
    ("T_Q_25_2", 4),
    ("T_Q_25_3", 4),
    ("T_Q_25_4", 4),
    ("T_Q_25_5", 4),
    ("T_Q_25_6", 4),
    ("T_Q_26_1", 4),
    ("T_Q_26_2", 4),
    ("T_Q_26_3", 4),
    ("T_Q_26_4", 4),
    ("T_Q_26_5", 4),
    ("T_Q_26_6", 4),
    ("T_Q_27_1", 4),
    ("T_Q_27_2", 4),
    ("T_Q_27_3", 4),
    ("T_Q_27_4", 4),
    ("T_Q_27_5", 4),
    ("T_Q_27_6", 4),
    ("T_Q_28_1", 4),
    ("T_Q_28_2", 4),
    ("T_Q_28_3", 4),
    ("T_Q_28_4", 4),
    ("T_Q_28_5", 4),
    ("T_Q_28_6", 4),
    ("T_Q_28_7", 4),
    ("T_Q_28_8", 4),
    ("T_Q_28_9", 4),
    ("T_Q_29_1", 4),
    ("T_Q_29_2", 4),
    ("T_Q_30_1", 4),
    ("T_Q_30_2", 4),
    ("T_Q_30_3", 4),
    ("T_Q_30_4", 4),
    ("T_Q_30_5", 4),
    ("T_Q_30_6", 4),
    ("Q_31", 4),
    // 5: Educación y Tiempo Libre
    ("Q_32", 5),
    ("Q_33", 5),
    ("Q_34_O1", 5),
    ("Q_34_O2", 5),
    ("Q_34_O3", 5),
    ("Q_34_O4", 5),
    ("Q_34_O5", 5),
    ("Q_34_O6", 5),
    ("Q_34_O7", 5),
    ("Q_34_O8", 5),
    ("Q_34_O9", 5),
    ("Q_34_O10", 5),
    ("Q_34_O11", 5),
    ("Q_34_O12", 5),
    ("Q_34_O13", 5),
    ("Q_34_O14", 5),
    // 6: Vivienda y Servicios Públicos
    ("Q_35", 6),
    ("T_Q_36_1", 6),
    ("T_Q_36_2", 6),
    ("T_Q_36_3", 6),
    ("T_Q_36_4", 6),
    ("T_Q_36_5", 6),
    ("T_Q_36_6", 6),
    ("T_Q_37_1", 6),
    ("T_Q_37_2", 6),
    ("T_Q_37_3", 6),
    ("T_Q_37_4", 6),
    ("T_Q_37_5", 6),
    ("T_Q_37_6", 6),
    ("T_Q_37_7", 6),
    // 7: Movilidad y Transporte
    ("Q_38", 7),
    ("T_Q_39_1", 7),
    ("T_Q_39_2", 7),
    ("T_Q_39_3", 7),
    ("T_Q_39_4", 7),
    ("T_Q_39_5", 7),
    ("T_Q_39_6", 7),
    ("Q_40", 7),
    ("Q_40_C", 7),
    ("Q_41", 7),
    ("Q_42", 7),
    ("Q_42_C", 7),
    ("T_Q_43_1", 7),
    ("T_Q_43_2", 7),
    ("T_Q_43_3", 7),
    ("T_Q_43_4", 7),
    ("T_Q_43_5", 7),
    ("T_Q_43_6", 7),
    ("T_Q_43_7", 7),
    // 8: Seguridad Vial
    ("Q_44", 8),
    ("Q_45", 8),
    ("Q_46_O1", 8),
    ("Q_46_O2", 8),
    ("Q_46_O3", 8),
    ("Q_46_O4", 8),
    ("Q_46_O5", 8),
    ("Q_46_O6", 8),
    ("Q_47", 8),
    ("Q_48", 8),
    // 9: Seguridad Pública
    ("Q_49", 9),
    ("Q_50", 9),
    ("Q_51", 9),
    ("Q_52", 9),
    ("Q_53", 9),
    ("Q_54", 9),
    ("Q_55", 9),
    ("Q_56", 9),
    ("Q_57", 9),
    // 10: Violencia y Agresiones
    ("T_Q_58_1", 10),
    ("T_Q_58_2", 10),
    ("T_Q_58_3", 10),
    ("T_Q_58_4", 10),
    ("T_Q_59_1", 10),
    ("T_Q_59_2", 10),
    ("T_Q_59_3", 10),
    // 11: Medio Ambiente
    ("T_Q_60_1", 11),
    ("T_Q_60_2", 11),
    ("T_Q_60_3", 11),
    ("T_Q_60_4", 11),
    ("T_Q_60_5", 11),
    // 12: Participación Ciudadana
    ("T_Q_61_1", 12),
    ("T_Q_61_2", 12),
    ("T_Q_61_3", 12),
    ("T_Q_61_4", 12),
    ("T_Q_61_5", 12),
    ("T_Q_66_1", 12),
    ("T_Q_66_2", 12),
    ("T_Q_66_3", 12),
    ("T_Q_66_4", 12),
    ("T_Q_66_5", 12),
    ("T_Q_66_6", 12),
    ("T_Q_66_7", 12),
    ("Q_67_O1", 12),
    ("Q_67_O2", 12),
    ("Q_67_O3", 12),
    ("Q_67_O4", 12),
    ("Q_67_O5", 12),
    ("Q_67_O6", 12),
    ("Q_67_O7", 12),
    ("Q_67_O8", 12),
    // 13: Igualdad y Discriminación
    ("Q_62", 13),
    ("T_Q_63_1", 13),
    ("T_Q_63_2", 13),
    ("T_Q_63_3", 13),
    ("T_Q_63_4", 13),
    ("T_Q_63_5", 13),
    ("T_Q_63_6", 13),
    ("T_Q_63_7", 13),
    ("T_Q_63_8", 13),
    ("T_Q_63_9", 13),
    ("T_Q_63_10", 13),
    ("T_Q_63_11", 13),
    ("T_Q_68_1", 13),
    ("T_Q_68_2", 13),
    ("T_Q_68_3", 13),
    ("T_Q_68_4", 13),
    // 14: Política y Confianza Institucional
    ("T_Q_64_1", 14),
    ("T_Q_64_2", 14),
    ("T_Q_64_3", 14),
    ("T_Q_65_1", 14),
    ("T_Q_65_2", 14),
    ("T_Q_65_3", 14),
    ("T_Q_65_4", 14),
    ("Q_69", 14),
    ("Q_70", 14),
    ("Q_71", 14),
    ("T_Q_72_1", 14),
    ("T_Q_72_2", 14),
    ("T_Q_72_3", 14),
    ("T_Q_72_4", 14),
    ("T_Q_72_5", 14),
    ("T_Q_72_6", 14),
    ("T_Q_72_7", 14),
    ("T_Q_72_8", 14),
    ("T_Q_72_9", 14),
    ("T_Q_72_10", 14),
    ("T_Q_72_11", 14),
    ("T_Q_72_12", 14),
    ("T_Q_73_1", 14),
    ("T_Q_73_2", 14),
    // 15: Datos Sociodemográficos
    ("Q_74", 15),
    ("Q_74_S", 15),
    ("Q_75", 15),
    ("Q_76", 15),
    ("Q_77", 15),
    ("Q_78", 15),
    ("Q_79", 15),
    // 16: Características del Hogar
    ("T_Q_80_1", 16),
    ("T_Q_80_2", 16),
    ("T_Q_80_3", 16),
    ("Q_81", 16),
    ("Q_82", 16),
    ("T_Q_83_1", 16),
    ("T_Q_83_2", 16),
    ("T_Q_84_1", 16),
    ("T_Q_84_2", 16),
    ("Q_85", 16),
    ("Q_86", 16),
    ("Q_87", 16),
    ("Q_88", 16),
    ("Q_89", 16),
    ("Q_90", 16),
    // 17: Información de Control
    ("SbjNum", 17),
    ("Date", 17),
    ("Duration", 17),
    ("Q_91", 17),
    ("T_Q_92_1", 17),
    ("T_Q_92_2", 17),
    ("T_Q_92_3", 17),
    ("Q_94", 17),
    ("Q_95", 17),
    ("Q_96", 17),
    ("T_Q_98_1", 17),
    ("T_Q_98_2", 17),
    ("T_Q_98_3", 17),
    ("T_Q_98_4", 17),
    ("T_Q_98_5", 17),
    ("T_Q_98_6", 17),
    ("SEXO", 17),
    ("CALIDAD_VIDA", 17),
    ("EDAD", 17),
    ("ESC", 17),
    ("IND_SE2024", 17),
    ("NSE2024", 17),
    ("NSE2024_C", 17),
    ("FACTOR", 17),
];

/// All categories, ordered by id.
#[must_use]
pub fn all_categories() -> &'static [Category] {
    &CATEGORIES
}

/// Look up a category by id.
#[must_use]
pub fn category_by_id(id: u8) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}

/// The category id a question belongs to, if it is mapped.
#[must_use]
pub fn category_id_for_question(question_id: &str) -> Option<u8> {
    QUESTION_CATEGORY_MAP
        .iter()
        .find(|(q, _)| *q == question_id)
        .map(|&(_, id)| id)
}

/// The category a question belongs to, if it is mapped.
#[must_use]
pub fn category_for_question(question_id: &str) -> Option<&'static Category> {
    category_id_for_question(question_id).and_then(category_by_id)
}

/// Question identifiers mapped to a category, in questionnaire order.
#[must_use]
pub fn questions_by_category(id: u8) -> Vec<&'static str> {
    QUESTION_CATEGORY_MAP
        .iter()
        .filter(|&&(_, category)| category == id)
        .map(|&(question, _)| question)
        .collect()
}
