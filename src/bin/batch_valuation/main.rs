//! Batch valuation runner - values every subject against a pool of sales

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use property_valuation::config::ValuationConfig;
use property_valuation::valuation::{
    appraise, default_models, parse, Appraisal, ComparableSource, SalesPool, Subject,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    info!("Starting batch valuation");

    let paths = Paths::from_env();
    let config = ValuationConfig::from_env().context("Invalid valuation configuration")?;
    let as_of = config
        .valuation_date
        .unwrap_or_else(|| Utc::now().date_naive());
    info!("Configuration loaded (valuation date {})", as_of);

    // Step 1: Load inputs
    info!("Step 1/3: Loading inputs...");
    let subjects = parse::load_subjects(&paths.subjects)
        .with_context(|| format!("Failed to load subjects from {:?}", paths.subjects))?;
    let sales = parse::load_sales(&paths.sales)
        .with_context(|| format!("Failed to load sales from {:?}", paths.sales))?;
    let pool = Arc::new(SalesPool::new(sales));
    info!("✓ {} subjects, {} sales", subjects.len(), pool.len());

    if pool.is_empty() {
        warn!("Sales pool is empty, every valuation will be zero");
    }

    // Step 2: Value each subject independently
    info!("Step 2/3: Valuing subjects...");
    let config = Arc::new(config);
    let total = subjects.len();
    let mut handles = Vec::with_capacity(total);

    for subject in subjects {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        handles.push(tokio::task::spawn_blocking(move || {
            let result = value_subject(&subject, &pool, &config, as_of);
            (subject.id, result)
        }));
    }

    let mut appraisals = Vec::with_capacity(total);
    for handle in handles {
        match handle.await {
            Ok((subject_id, Ok(appraisal))) => {
                info!(
                    "✓ {}: {:.0} (confidence {:.2}, {} comparables)",
                    subject_id,
                    appraisal.valuation.value,
                    appraisal.valuation.confidence,
                    appraisal.comparables.len()
                );
                appraisals.push(appraisal);
            }
            Ok((subject_id, Err(e))) => {
                error!("✗ {} failed: {}", subject_id, e);
            }
            Err(e) => {
                error!("✗ Valuation task panicked: {}", e);
            }
        }
    }
    info!("✓ Valued {} of {} subjects", appraisals.len(), total);

    // Step 3: Write results
    info!("Step 3/3: Writing results...");
    let json = serde_json::to_string_pretty(&appraisals)?;
    match &paths.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
            info!("✓ Results written to {:?}", path);
        }
        None => println!("{}", json),
    }

    info!("Batch valuation complete");

    Ok(())
}

fn value_subject(
    subject: &Subject,
    pool: &SalesPool,
    config: &ValuationConfig,
    as_of: NaiveDate,
) -> property_valuation::Result<Appraisal> {
    let candidates = pool.search(subject, &config.filter)?;
    appraise(subject, &candidates, &default_models(), config, as_of)
}

/// Input and output locations, from command line args or environment
#[derive(Debug, Clone)]
struct Paths {
    subjects: PathBuf,
    sales: PathBuf,
    output: Option<PathBuf>, // stdout when unset
}

impl Paths {
    fn from_env() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();

        Paths {
            subjects: args
                .first()
                .cloned()
                .or_else(|| env::var("SUBJECTS_PATH").ok())
                .unwrap_or_else(|| "data/subjects.json".to_string())
                .into(),

            sales: args
                .get(1)
                .cloned()
                .or_else(|| env::var("SALES_PATH").ok())
                .unwrap_or_else(|| "data/sales.csv".to_string())
                .into(),

            output: args
                .get(2)
                .cloned()
                .or_else(|| env::var("OUTPUT_PATH").ok())
                .map(PathBuf::from),
        }
    }
}
