//! `sondeo` - Survey dataset service for SPSS system files
//!
//! This library reads and writes SPSS `.sav`/`.zsav` files, exposes a survey's
//! questions and response tallies, stores user profiles, and analyzes
//! datasets. The `sondeo` binary serves all of it over HTTP.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod api;
pub mod categories;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod profiles;
pub mod sav;
pub mod survey;

pub use analysis::{analyze, DataInfo};
pub use api::{create_router, AppState};
pub use categories::Category;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use profiles::{NewProfile, Profile, ProfileStore, ProfileUpdate};
pub use survey::{Question, QuestionResponses, ResponseFilters, ResponseKind, SurveyService};
