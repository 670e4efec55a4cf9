//! Survey query service.
//!
//! Loads one dataset lazily, keeps it cached, and answers the questions the
//! API and CLI ask of it: which questions exist, and how respondents
//! answered them, optionally restricted by demographic filters.

mod filters;
mod subset;
mod tally;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::categories;
use crate::error::{Error, Result};
use crate::sav::{read_sav_with_options, Dataset, ReaderOptions, Value};

pub use filters::{
    matching_rows, AgeRange, AppliedFilters, ResponseFilters, AGE_COLUMN, FILTER_COLUMNS,
};
pub use subset::{export_subset, SubsetSummary};
pub use tally::{round2, tally, Amount, ResponseEntry};

/// One labelled answer option of a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOption {
    /// Stored value.
    pub valor: Value,
    /// Label shown to respondents.
    pub etiqueta: String,
}

/// A question: a dataset variable with a non-empty label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    /// Variable name.
    pub identificador: String,
    /// Question text (the variable label).
    pub pregunta: String,
    /// Value labels, in dictionary order.
    pub opciones: Vec<AnswerOption>,
}

/// How response tallies are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Absolute counts.
    #[default]
    Cantidad,
    /// Percentages of the counted responses.
    Porcentaje,
}

impl ResponseKind {
    /// Wire name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cantidad => "cantidad",
            Self::Porcentaje => "porcentaje",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cantidad" => Ok(Self::Cantidad),
            "porcentaje" => Ok(Self::Porcentaje),
            other => Err(Error::validation(format!(
                "Tipo de respuesta inválido '{other}': use 'cantidad' o 'porcentaje'"
            ))),
        }
    }
}

/// Tallied responses to one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResponses {
    /// Variable name.
    pub identificador: String,
    /// Question text, or the identifier when unlabelled.
    pub pregunta: String,
    /// Kind of measure in each entry.
    pub tipo_respuesta: ResponseKind,
    /// One entry per distinct answer.
    pub respuestas: Vec<ResponseEntry>,
    /// Number of counted (non-missing) responses.
    pub total_respuestas: u64,
    /// Filters that were applied, for filtered tallies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtros_aplicados: Option<AppliedFilters>,
}

/// Cached access to one survey dataset.
#[derive(Debug)]
pub struct SurveyService {
    path: PathBuf,
    options: ReaderOptions,
    dataset: RwLock<Option<Arc<Dataset>>>,
    questions: RwLock<Option<Arc<Vec<Question>>>>,
}

impl SurveyService {
    /// Create a service for the file at `path`. Nothing is read until the
    /// data is first needed.
    pub fn new(path: impl Into<PathBuf>, options: ReaderOptions) -> Self {
        Self {
            path: path.into(),
            options,
            dataset: RwLock::new(None),
            questions: RwLock::new(None),
        }
    }

    /// Create a service around an already loaded dataset.
    ///
    /// After [`clear_cache`](Self::clear_cache) the service reloads from
    /// `path`.
    pub fn with_dataset(path: impl Into<PathBuf>, dataset: Dataset) -> Self {
        let service = Self::new(path, ReaderOptions::default());
        *service.dataset.write() = Some(Arc::new(dataset));
        service
    }

    /// Path of the data file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the dataset is cached.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.dataset.read().is_some()
    }

    /// Load the dataset, reading the file on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DataFileNotFound`] if the file does not exist and
    /// [`Error::DataFile`] if it cannot be decoded.
    pub fn load_data(&self) -> Result<Arc<Dataset>> {
        if let Some(dataset) = self.dataset.read().as_ref() {
            debug!("Dataset cache hit");
            return Ok(Arc::clone(dataset));
        }

        if !self.path.exists() {
            return Err(Error::DataFileNotFound {
                path: self.path.clone(),
            });
        }

        let dataset = Arc::new(read_sav_with_options(&self.path, self.options)?);
        info!(
            "Loaded {} cases and {} variables from {}",
            dataset.case_count(),
            dataset.variables.len(),
            self.path.display()
        );

        let mut slot = self.dataset.write();
        // Another caller may have finished loading first.
        if let Some(existing) = slot.as_ref() {
            return Ok(Arc::clone(existing));
        }
        *slot = Some(Arc::clone(&dataset));
        Ok(dataset)
    }

    /// List the labelled variables as questions, in dataset order.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be loaded.
    pub fn load_questions(&self) -> Result<Arc<Vec<Question>>> {
        if let Some(questions) = self.questions.read().as_ref() {
            return Ok(Arc::clone(questions));
        }

        let dataset = self.load_data()?;
        let questions: Vec<Question> = dataset
            .labelled_variables()
            .map(|variable| Question {
                identificador: variable.name.clone(),
                pregunta: variable.label_text().unwrap_or_default().to_string(),
                opciones: variable
                    .value_labels
                    .iter()
                    .map(|(valor, etiqueta)| AnswerOption {
                        valor: valor.clone(),
                        etiqueta: etiqueta.to_string(),
                    })
                    .collect(),
            })
            .collect();
        debug!("Built {} questions", questions.len());

        let questions = Arc::new(questions);
        *self.questions.write() = Some(Arc::clone(&questions));
        Ok(questions)
    }

    /// Questions mapped to a category, in dataset order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CategoryNotFound`] for an unknown category, or an
    /// error if the dataset cannot be loaded.
    pub fn questions_in_category(&self, category_id: u8) -> Result<Vec<Question>> {
        if categories::category_by_id(category_id).is_none() {
            return Err(Error::CategoryNotFound { id: category_id });
        }
        Ok(self
            .load_questions()?
            .iter()
            .filter(|q| categories::category_id_for_question(&q.identificador) == Some(category_id))
            .cloned()
            .collect())
    }

    /// Tally every response to a question.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QuestionNotFound`] if the dataset has no such
    /// variable, or an error if the dataset cannot be loaded.
    pub fn question_responses(&self, id: &str, kind: ResponseKind) -> Result<QuestionResponses> {
        let dataset = self.load_data()?;
        let rows = 0..dataset.case_count();
        build_responses(&dataset, id, kind, rows)
    }

    /// Tally the responses of the cases that pass `filters`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QuestionNotFound`] if the dataset has no such
    /// variable, or an error if the dataset cannot be loaded.
    pub fn question_responses_filtered(
        &self,
        id: &str,
        kind: ResponseKind,
        filters: &ResponseFilters,
    ) -> Result<QuestionResponses> {
        let dataset = self.load_data()?;
        if dataset.index_of(id).is_none() {
            return Err(Error::question_not_found(id));
        }

        let (rows, applied) = matching_rows(&dataset, filters);
        debug!(
            "Filters {:?} kept {} of {} cases",
            applied.keys().collect::<Vec<_>>(),
            rows.len(),
            dataset.case_count()
        );
        let mut responses = build_responses(&dataset, id, kind, rows)?;
        responses.filtros_aplicados = Some(applied);
        Ok(responses)
    }

    /// Rows passing `filters`, with the filters that applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset cannot be loaded.
    pub fn matching_rows(&self, filters: &ResponseFilters) -> Result<(Vec<usize>, AppliedFilters)> {
        let dataset = self.load_data()?;
        Ok(matching_rows(&dataset, filters))
    }

    /// Drop the cached dataset and questions.
    pub fn clear_cache(&self) {
        *self.dataset.write() = None;
        *self.questions.write() = None;
        debug!("Survey cache cleared");
    }
}

fn build_responses(
    dataset: &Dataset,
    id: &str,
    kind: ResponseKind,
    rows: impl IntoIterator<Item = usize>,
) -> Result<QuestionResponses> {
    let index = dataset
        .index_of(id)
        .ok_or_else(|| Error::question_not_found(id))?;
    let variable = &dataset.variables[index];
    let (respuestas, total_respuestas) = tally(variable, &dataset.columns[index], rows, kind);

    Ok(QuestionResponses {
        identificador: id.to_string(),
        pregunta: variable.label_text().unwrap_or(id).to_string(),
        tipo_respuesta: kind,
        respuestas,
        total_respuestas,
        filtros_aplicados: None,
    })
}
