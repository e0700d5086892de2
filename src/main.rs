use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod grading;
mod models;
mod report;
mod source;
mod status;

use models::{format_one, format_two};
use source::{ProfileSource, DEFAULT_BACKEND_URL};

#[derive(Parser)]
#[command(name = "bilan-ciel")]
#[command(about = "Competency grades and final bilan for BAC PRO CIEL students", long_about = None)]
struct Cli {
    /// Backend base URL, overrides BACKEND_URL
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(id = "source", required = true, multiple = false)]
struct SourceArgs {
    /// Student id to fetch from the backend
    #[arg(long)]
    student: Option<i64>,
    /// Saved profile payload (JSON)
    #[arg(long)]
    input: Option<PathBuf>,
    /// Competency rows exported as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

impl SourceArgs {
    fn into_source(self, base_url: String) -> anyhow::Result<ProfileSource> {
        match (self.student, self.input, self.csv) {
            (Some(student_id), _, _) => Ok(ProfileSource::Backend {
                base_url,
                student_id,
            }),
            (_, Some(path), _) => Ok(ProfileSource::JsonFile(path)),
            (_, _, Some(path)) => Ok(ProfileSource::Csv(path)),
            _ => anyhow::bail!("one of --student, --input or --csv is required"),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    /// End-of-cycle bilan with the E2, E31 and E32 grades
    Final,
    /// Mid-cycle bilan with validation statistics per competency
    Intermediaire,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the E2, E31 and E32 grades
    Grade {
        #[command(flatten)]
        source: SourceArgs,
        /// Print the grades as JSON
        #[arg(long)]
        json: bool,
    },
    /// Overall competency statistics
    Summary {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Generate the markdown bilan
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, default_value_t = ReportKind::Final)]
        kind: ReportKind,
        #[arg(long, default_value = "bilan.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bilan_ciel=info")),
        )
        .init();

    let cli = Cli::parse();
    let backend_url = cli
        .backend_url
        .or_else(|| std::env::var("BACKEND_URL").ok())
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

    match cli.command {
        Commands::Grade { source, json } => {
            let payload = source.into_source(backend_url)?.load().await?;
            let grades = grading::grade_all_units(&payload.competencies);

            if json {
                let rendered = serde_json::to_string_pretty(&grades)
                    .context("failed to serialize grades")?;
                println!("{rendered}");
                return Ok(());
            }

            println!("Grades for {}:", payload.student.display_name());
            for grade in grades.iter() {
                println!(
                    "- {}: {} / 20 (computed {})",
                    grade.unit,
                    format_one(grade.note_arrondie),
                    format_two(grade.note_total)
                );
                for score in grade.scores.iter() {
                    println!(
                        "    {} x{}: {}",
                        score.code,
                        score.coefficient,
                        format_two(score.score)
                    );
                }
            }
        }
        Commands::Summary { source } => {
            let payload = source.into_source(backend_url)?.load().await?;
            let summary = grading::summarize_profile(&payload.competencies);

            println!("Profile of {}:", payload.student.display_name());
            println!("- competencies: {}", summary.total);
            println!("- mastered: {}", summary.mastered);
            println!(
                "- general average: {} over {} evaluated",
                format_two(summary.general_average),
                summary.evaluated
            );
        }
        Commands::Report { source, kind, out } => {
            let payload = source.into_source(backend_url)?.load().await?;
            let generated_at = chrono::Local::now().naive_local();
            let report = match kind {
                ReportKind::Final => report::build_report(&payload, generated_at),
                ReportKind::Intermediaire => {
                    report::build_intermediate_report(&payload, generated_at)
                }
            };
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(student = %payload.student.display_name(), "bilan generated");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
