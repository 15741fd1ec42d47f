use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use acta_generator::config::ActaConfig;
use acta_generator::models::{Criterion, EvaluationBundle};
use acta_generator::report::{ReportGenerator, ReportSettings};
use acta_generator::strategy::{self, StrategyKind, Verdict};
use acta_generator::{data, telemetry};

#[derive(Parser)]
#[command(name = "acta")]
#[command(about = "Final grade computation and evaluation certificates (actas) for thesis works", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample evaluation bundle
    Seed {
        #[arg(long, default_value = "bundle.json")]
        out: PathBuf,
    },
    /// Merge grades from a CSV file into a bundle
    Import {
        #[arg(long)]
        bundle: PathBuf,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute the final grade of a bundle
    Score {
        #[arg(long)]
        bundle: PathBuf,
        #[arg(long, value_enum)]
        strategy: Option<StrategyKind>,
        #[arg(long)]
        json: bool,
    },
    /// Generate the plain-text acta
    Report {
        #[arg(long)]
        bundle: PathBuf,
        #[arg(long, value_enum)]
        strategy: Option<StrategyKind>,
        /// Issue date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        issued_on: Option<NaiveDate>,
        #[arg(long, default_value = "acta.txt")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ActaConfig::load().context("invalid acta configuration")?;
    telemetry::init(&config.log_level)?;

    match cli.command {
        Commands::Seed { out } => {
            let bundle = data::seed_bundle(config.default_criteria());
            data::save_bundle(&out, &bundle)?;
            info!(path = %out.display(), "seed bundle written");
            println!("Sample bundle written to {}.", out.display());
        }
        Commands::Import { bundle, csv } => {
            let mut loaded = data::load_bundle(&bundle)?;
            let inserted = data::import_csv(&mut loaded, &csv)?;
            data::save_bundle(&bundle, &loaded)?;
            println!("Inserted {inserted} grades from {}.", csv.display());
        }
        Commands::Score {
            bundle,
            strategy: requested,
            json,
        } => {
            let loaded = data::load_bundle(&bundle)?;
            let criteria = loaded.criteria_or(config.default_criteria());
            log_reference_issues(&loaded, &criteria);

            let grading = config.grading_strategy(requested);
            let subtotals = strategy::criterion_subtotals(&loaded.grades, &criteria);
            let score = grading.calculate(&loaded.grades, &criteria);
            let verdict = Verdict::classify(score, config.passing_grade);

            if json {
                let summary = serde_json::json!({
                    "workId": loaded.work.id,
                    "studentId": loaded.student.id,
                    "strategy": grading.name(),
                    "finalGrade": score,
                    "passingGrade": config.passing_grade,
                    "verdict": verdict.label(),
                    "criteria": subtotals,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!(
                "{} ({}) - {}",
                loaded.student.name, loaded.student.rut, loaded.work.title
            );
            for subtotal in &subtotals {
                match subtotal.average {
                    Some(average) => println!(
                        "- {} x{:.2}: avg {:.2} across {} grades, contributes {:.2}",
                        subtotal.name,
                        subtotal.weight,
                        average,
                        subtotal.grade_count,
                        subtotal.contribution
                    ),
                    None => println!("- {} x{:.2}: no grades", subtotal.name, subtotal.weight),
                }
            }
            println!("{}: {:.2} ({})", grading.name(), score, verdict);
        }
        Commands::Report {
            bundle,
            strategy: requested,
            issued_on,
            out,
        } => {
            let loaded = data::load_bundle(&bundle)?;
            let criteria = loaded.criteria_or(config.default_criteria());
            log_reference_issues(&loaded, &criteria);

            let generator = ReportGenerator::new(
                config.grading_strategy(requested),
                ReportSettings {
                    institution: config.institution.clone(),
                    faculty: config.faculty.clone(),
                    passing_grade: config.passing_grade,
                    issued_on: issued_on.unwrap_or_else(|| Utc::now().date_naive()),
                },
            );
            let acta = generator.generate_report(
                &loaded.work,
                &loaded.student,
                &loaded.grades,
                &loaded.evaluators,
                &criteria,
            );
            std::fs::write(&out, acta)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(
                strategy = generator.strategy().name(),
                path = %out.display(),
                "acta generated"
            );
            println!("Acta written to {}.", out.display());
        }
    }

    Ok(())
}

fn log_reference_issues(bundle: &EvaluationBundle, criteria: &[Criterion]) {
    for issue in data::audit_references(bundle, criteria) {
        warn!("{issue}");
    }
}
