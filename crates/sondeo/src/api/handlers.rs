//! Route handlers.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::categories::{self, Category};
use crate::error::Error;
use crate::profiles::{NewProfile, Profile, ProfileUpdate};
use crate::survey::{AgeRange, QuestionResponses, ResponseFilters, ResponseKind, SurveyService};

use super::error::ApiResult;
use super::AppState;

/// Query of `GET /preguntas`.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionsQuery {
    /// Keep only questions mapped to this category.
    pub categoria: Option<u8>,
}

/// Query of `GET /respuestas/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct ResponsesQuery {
    /// `cantidad` (default) or `porcentaje`.
    pub tipo: Option<String>,
}

/// Query of `GET /respuestas/{id}/filtradas`.
#[derive(Debug, Default, Deserialize)]
pub struct FilteredQuery {
    /// `cantidad` (default) or `porcentaje`.
    pub tipo: Option<String>,
    /// Quality of life index.
    pub calidad_vida: Option<i32>,
    /// Municipality code.
    pub municipio: Option<i32>,
    /// Sex.
    pub sexo: Option<i32>,
    /// Lowest age.
    pub edad_min: Option<i32>,
    /// Highest age.
    pub edad_max: Option<i32>,
    /// Schooling level.
    pub escolaridad: Option<i32>,
    /// Socioeconomic level.
    pub nse: Option<i32>,
}

impl FilteredQuery {
    fn filters(&self) -> ResponseFilters {
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

/// Query of `GET /usuarios`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Profiles to skip.
    pub skip: Option<usize>,
    /// Page size.
    pub limit: Option<usize>,
}

fn response_kind(tipo: Option<&str>) -> Result<ResponseKind, Error> {
    tipo.map_or(Ok(ResponseKind::default()), str::parse)
}

/// Run a survey query, off the async runtime while the dataset is cold.
async fn query_survey<T, F>(survey: &Arc<SurveyService>, query: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&SurveyService) -> crate::Result<T> + Send + 'static,
{
    if survey.is_loaded() {
        return Ok(query(survey.as_ref())?);
    }
    let survey = Arc::clone(survey);
    let result = tokio::task::spawn_blocking(move || query(survey.as_ref()))
        .await
        .map_err(|e| Error::internal(format!("dataset task failed: {e}")))?;
    Ok(result?)
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Bienvenido a la API" }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "datos_cargados": state.survey.is_loaded(),
    }))
}

pub async fn list_questions(
    State(state): State<AppState>,
    query: Result<Query<QuestionsQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let preguntas = match query.categoria {
        Some(id) => query_survey(&state.survey, move |s| s.questions_in_category(id)).await?,
        None => query_survey(&state.survey, |s| s.load_questions())
            .await?
            .as_ref()
            .clone(),
    };
    Ok(Json(json!({ "preguntas": preguntas })))
}

pub async fn question_responses(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ResponsesQuery>, QueryRejection>,
) -> ApiResult<Json<QuestionResponses>> {
    let Path(id) = path?;
    let Query(query) = query?;
    let kind = response_kind(query.tipo.as_deref())?;

    let responses = query_survey(&state.survey, move |s| s.question_responses(&id, kind)).await?;
    Ok(Json(responses))
}

pub async fn filtered_responses(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<FilteredQuery>, QueryRejection>,
) -> ApiResult<Json<QuestionResponses>> {
    let Path(id) = path?;
    let Query(query) = query?;
    let kind = response_kind(query.tipo.as_deref())?;
    let filters = query.filters();

    let responses = query_survey(&state.survey, move |s| {
        s.question_responses_filtered(&id, kind, &filters)
    })
    .await?;
    Ok(Json(responses))
}

pub async fn list_categories() -> Json<Value> {
    Json(json!({ "categorias": categories::all_categories() }))
}

fn find_category(path: Result<Path<u8>, PathRejection>) -> ApiResult<&'static Category> {
    let Path(id) = path?;
    Ok(categories::category_by_id(id).ok_or(Error::CategoryNotFound { id })?)
}

pub async fn get_category(
    path: Result<Path<u8>, PathRejection>,
) -> ApiResult<Json<&'static Category>> {
    Ok(Json(find_category(path)?))
}

pub async fn category_questions(
    path: Result<Path<u8>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let categoria = find_category(path)?;
    Ok(Json(json!({
        "categoria": categoria,
        "preguntas": categories::questions_by_category(categoria.id),
    })))
}

pub async fn create_profile(
    State(state): State<AppState>,
    body: Result<Json<NewProfile>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Profile>)> {
    let Json(profile) = body?;
    let created = state.profiles.lock().await.create(&profile)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_profiles(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let limit = state.limits.clamp_limit(query.limit);

    let store = state.profiles.lock().await;
    let usuarios = store.list(query.skip.unwrap_or(0), limit)?;
    let total = store.count()?;
    Ok(Json(json!({ "usuarios": usuarios, "total": total })))
}

pub async fn get_profile(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Profile>> {
    let Path(id) = path?;
    Ok(Json(state.profiles.lock().await.get(id)?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Json<Profile>> {
    let Path(id) = path?;
    let Json(update) = body?;
    Ok(Json(state.profiles.lock().await.update(id, &update)?))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = path?;
    let eliminado = state.profiles.lock().await.delete(id)?;
    Ok(Json(json!({ "eliminado": eliminado })))
}
