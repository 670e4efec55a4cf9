//! `sondeo` - CLI for the survey dataset service
//!
//! This binary runs the HTTP API and offers the same queries, the dataset
//! analysis and filtered exports from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use sondeo::analysis::{self, render_text};
use sondeo::api::{self, AppState};
use sondeo::categories;
use sondeo::cli::{
    AnalyzeCommand, CategoriesCommand, Cli, Command, ConfigCommand, QuestionsCommand,
    ResponsesCommand, ServeCommand, SubsetCommand,
};
use sondeo::sav::Compression;
use sondeo::survey::{export_subset, Amount, ResponseKind, SurveyService};
use sondeo::{init_logging, Config, ProfileStore};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    // `config validate` reports load errors itself.
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        return handle_validate(file.clone().or_else(|| cli.config.clone()));
    }

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(cmd) => handle_serve(config, cmd),
        Command::Questions(cmd) => handle_questions(&config, &cmd),
        Command::Responses(cmd) => handle_responses(&config, &cmd),
        Command::Categories(cmd) => handle_categories(&cmd),
        Command::Analyze(cmd) => handle_analyze(&config, &cmd),
        Command::Subset(cmd) => handle_subset(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn survey_service(config: &Config) -> SurveyService {
    SurveyService::new(&config.data.sav_path, config.reader_options())
}

fn handle_serve(mut config: Config, cmd: ServeCommand) -> Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if let Some(data) = cmd.data {
        config.data.sav_path = data;
    }
    config.validate()?;
    let addr = config.bind_addr()?;

    let profiles = ProfileStore::open(config.database_path())
        .with_context(|| format!("opening {}", config.database_path().display()))?;
    let state = AppState::new(survey_service(&config), profiles, config.profiles);
    info!("Serving {}", config.data.sav_path.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    runtime.block_on(api::serve(state, addr, config.server.cors))?;
    Ok(())
}

fn handle_questions(config: &Config, cmd: &QuestionsCommand) -> Result<()> {
    let survey = survey_service(config);
    let questions = match cmd.category {
        Some(id) => survey.questions_in_category(id)?,
        None => survey.load_questions()?.as_ref().clone(),
    };

    if cmd.json {
        let body = serde_json::json!({ "preguntas": questions });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    for question in &questions {
        println!("{}: {}", question.identificador, question.pregunta);
        for option in &question.opciones {
            println!("    {} = {}", option.valor, option.etiqueta);
        }
    }
    println!();
    println!("{} preguntas", questions.len());
    Ok(())
}

fn handle_responses(config: &Config, cmd: &ResponsesCommand) -> Result<()> {
    let survey = survey_service(config);
    let kind = if cmd.percent {
        ResponseKind::Porcentaje
    } else {
        ResponseKind::Cantidad
    };
    let filters = cmd.filters.to_filters();
    let responses = if filters.is_empty() {
        survey.question_responses(&cmd.id, kind)?
    } else {
        survey.question_responses_filtered(&cmd.id, kind, &filters)?
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&responses)?);
        return Ok(());
    }

    println!("{}: {}", responses.identificador, responses.pregunta);
    if let Some(applied) = &responses.filtros_aplicados {
        println!("Filtros: {}", serde_json::to_string(applied)?);
    }
    println!("{}", "-".repeat(60));
    let width = responses
        .respuestas
        .iter()
        .map(|r| r.etiqueta.chars().count())
        .max()
        .unwrap_or(0);
    for entry in &responses.respuestas {
        let amount = match entry.amount {
            Amount::Cantidad(n) => n.to_string(),
            Amount::Porcentaje(p) => format!("{p:.2}%"),
        };
        println!("{:<width$}  {:>8}  ({})", entry.etiqueta, amount, entry.valor);
    }
    println!("{}", "-".repeat(60));
    println!("Total de respuestas: {}", responses.total_respuestas);
    Ok(())
}

fn handle_categories(cmd: &CategoriesCommand) -> Result<()> {
    let all = categories::all_categories();
    if cmd.json {
        let body = serde_json::json!({ "categorias": all });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    for category in all {
        let count = categories::questions_by_category(category.id).len();
        println!(
            "{:>2}. {} ({count} preguntas): {}",
            category.id, category.nombre, category.descripcion
        );
    }
    Ok(())
}

fn handle_analyze(config: &Config, cmd: &AnalyzeCommand) -> Result<()> {
    let path = cmd.data.as_ref().unwrap_or(&config.data.sav_path);
    let info = analysis::analyze_file(path, config.reader_options())?;

    if cmd.text {
        print!("{}", render_text(&info));
    } else {
        analysis::write_json(&info, &cmd.output)?;
        println!("Información guardada en: {}", cmd.output.display());
    }
    Ok(())
}

fn handle_subset(config: &Config, cmd: &SubsetCommand) -> Result<()> {
    let compression = cmd.compress.then_some(Compression::Zlib);
    let summary = export_subset(
        &config.data.sav_path,
        &cmd.output,
        &cmd.filters.to_filters(),
        config.reader_options(),
        compression,
    )
    .with_context(|| format!("writing {}", cmd.output.display()))?;

    println!(
        "{} de {} casos escritos en {} (filtros: {})",
        summary.written,
        summary.total,
        cmd.output.display(),
        serde_json::to_string(&summary.applied)?
    );
    Ok(())
}

fn handle_validate(file: Option<std::path::PathBuf>) -> Result<()> {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Data]");
                println!("  Data file:          {}", config.data.sav_path.display());
                println!("  Trim strings:       {}", config.data.trim_strings);
                println!();
                println!("[Server]");
                println!("  Host:               {}", config.server.host);
                println!("  Port:               {}", config.server.port);
                println!("  CORS:               {}", config.server.cors);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Profiles]");
                println!("  Default limit:      {}", config.profiles.default_limit);
                println!("  Max limit:          {}", config.profiles.max_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => handle_validate(file)?,
    }
    Ok(())
}
