use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use job_scheduler::config::ServiceConfig;
use job_scheduler::display::{print_report, write_report_to_file};
use job_scheduler::model::{
    encode_artifact, load_model, to_priority, FeatureRow, ModelSpec, Predictor,
};
use job_scheduler::schedule::run_schedule;
use job_scheduler::store::{DocumentStore, JsonFileStore};
use job_scheduler::web::{start_server, AppState};
use job_scheduler::{importer, logging};

#[derive(Parser)]
#[command(
    name = "job-scheduler",
    version,
    about = "Order priority prediction and workforce assignment"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve {
        /// Overrides JOB_SCHEDULER_PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one scheduling pass against the store
    Schedule {
        /// Compute assignments without writing them back
        #[arg(long)]
        dry_run: bool,
        /// Also write the report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Predict the priority of a single order
    Predict {
        #[arg(allow_negative_numbers = true)]
        days_left: f64,
        quantity: f64,
        workforce: f64,
    },
    /// Import orders from a CSV file
    ImportOrders { csv: PathBuf },
    /// Import employees from a CSV file
    ImportEmployees { csv: PathBuf },
    /// Validate a model spec JSON file and store it as the active model
    UploadModel { json: PathBuf },
}

/// Loads the model once. A missing model is fatal unless the config allows
/// serving without one.
fn init_predictor(
    config: &ServiceConfig,
    store: &dyn DocumentStore,
) -> Result<Option<Arc<dyn Predictor>>> {
    match load_model(
        store,
        &config.model_collection,
        &config.model_document,
        &config.model_field,
    ) {
        Ok(model) => Ok(Some(model)),
        Err(e) if config.allow_missing_model => {
            error!(error = %e, "model failed to load, continuing without it");
            Ok(None)
        }
        Err(e) => Err(e).context("failed to load model"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env()?;
    let store = Arc::new(
        JsonFileStore::open(&config.store_path)
            .with_context(|| format!("opening store {}", config.store_path.display()))?,
    );

    match cli.command {
        Command::Serve { port } => {
            let predictor = init_predictor(&config, &*store)?;
            let state = AppState::new(store, predictor);
            start_server(&config.bind_address, port.unwrap_or(config.port), state).await?;
        }
        Command::Schedule { dry_run, report } => {
            let predictor = init_predictor(&config, &*store)?;
            let today = chrono::Local::now().date_naive();
            let result = run_schedule(&*store, predictor.as_deref(), today, !dry_run)?;

            print_report(&result)?;
            if let Some(path) = report {
                write_report_to_file(&result, &path)
                    .with_context(|| format!("writing report to {}", path.display()))?;
                println!("Report saved to {}", path.display());
            }
        }
        Command::Predict {
            days_left,
            quantity,
            workforce,
        } => {
            let Some(predictor) = init_predictor(&config, &*store)? else {
                bail!("no model loaded");
            };
            let output = predictor.predict(&[FeatureRow::new(days_left, quantity, workforce)])?;
            let Some(&value) = output.first() else {
                bail!("model returned no prediction");
            };
            println!("{}", to_priority(value)?);
        }
        Command::ImportOrders { csv } => {
            let summary = importer::import_orders(&*store, &csv)?;
            println!("Imported {} orders ({} skipped)", summary.imported, summary.skipped);
        }
        Command::ImportEmployees { csv } => {
            let summary = importer::import_employees(&*store, &csv)?;
            println!("Imported {} employees ({} skipped)", summary.imported, summary.skipped);
        }
        Command::UploadModel { json } => {
            let bytes = std::fs::read(&json)
                .with_context(|| format!("reading {}", json.display()))?;
            let spec = ModelSpec::from_json(&bytes)?;
            let encoded = encode_artifact(&spec)?;
            let mut doc = serde_json::Map::new();
            doc.insert(config.model_field.clone(), serde_json::Value::String(encoded));
            store.put_document(
                &config.model_collection,
                &config.model_document,
                serde_json::Value::Object(doc),
            )?;
            info!(
                collection = %config.model_collection,
                document = %config.model_document,
                "model uploaded"
            );
            println!(
                "Model stored at {}/{}",
                config.model_collection, config.model_document
            );
        }
    }

    Ok(())
}
