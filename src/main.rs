use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;

mod load;
mod models;
mod percentile;
mod report;
mod roster;
mod status;
mod summary;

use models::{Subject, Term};
use roster::{ProgressBand, RosterSort};
use summary::DateFilter;

#[derive(Parser)]
#[command(name = "student-progress")]
#[command(about = "Student learning-activity progress dashboard", long_about = None)]
struct Cli {
    /// Path to the combined wide-format activity export
    #[arg(long, global = true, default_value = "data/combined_data.csv")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one student's dashboard
    Dashboard {
        #[arg(long)]
        student: String,
        /// Exact activity date to restrict to (YYYY-MM-DD, or "All")
        #[arg(long)]
        date: Option<String>,
        /// Include term diagnostic percentiles for this term
        #[arg(long)]
        term: Option<String>,
        /// Emit the summary and status as JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List students with status and progress
    Roster {
        /// Substring match on name or student id
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        teacher: Option<String>,
        /// Keep only students with activity in this subject
        #[arg(long)]
        subject: Option<String>,
        /// Progress band: high, medium, or low
        #[arg(long)]
        progress: Option<String>,
        /// Sort order: name, progress-desc, progress-asc, activity, teacher
        #[arg(long, default_value = "name")]
        sort: String,
    },
    /// Compare selected students side by side
    Compare {
        #[arg(long, required = true)]
        student: Vec<String>,
    },
    /// Generate the cohort markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export records as CSV: the full flattened set, or per-student
    /// summaries when students are named
    Export {
        #[arg(long, default_value = "student_data.csv")]
        out: PathBuf,
        #[arg(long)]
        student: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let records = load::load_records(&cli.data)?;
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Dashboard {
            student,
            date,
            term,
            json,
        } => {
            let (filter, warning) = DateFilter::parse(date.as_deref());
            if let Some(warning) = warning {
                eprintln!("warning: {warning}");
            }
            let term = term
                .as_deref()
                .map(|raw| Term::parse(raw).with_context(|| format!("unrecognized term {raw:?}")))
                .transpose()?;

            if json {
                match summary::summarize_student(&records, &student, &filter) {
                    None => println!("No data available for the selected date."),
                    Some(summary) => {
                        let status = status::status_indicators(&records, &student, today);
                        let alerts = status.as_ref().map(status::alerts).unwrap_or_default();
                        let payload = json!({
                            "summary": summary,
                            "status": status,
                            "alerts": alerts,
                        });
                        println!("{}", serde_json::to_string_pretty(&payload)?);
                    }
                }
            } else {
                match report::render_student_dashboard(&records, &student, &filter, term, today) {
                    None => println!("No data available for the selected date."),
                    Some(text) => print!("{text}"),
                }
            }
        }
        Commands::Roster {
            search,
            teacher,
            subject,
            progress,
            sort,
        } => {
            let subject = subject
                .as_deref()
                .map(|raw| {
                    Subject::parse(raw).with_context(|| format!("unrecognized subject {raw:?}"))
                })
                .transpose()?;
            let band = progress
                .as_deref()
                .map(|raw| {
                    ProgressBand::parse(raw)
                        .with_context(|| format!("unrecognized progress band {raw:?}"))
                })
                .transpose()?;
            let sort = RosterSort::parse(&sort)
                .with_context(|| format!("unrecognized sort option {sort:?}"))?;

            let mut entries = roster::filter_roster(
                roster::build_roster(&records),
                &records,
                search.as_deref(),
                teacher.as_deref(),
                subject,
                band,
            );
            roster::sort_roster(&mut entries, sort);

            if entries.is_empty() {
                println!("No students found matching the search criteria.");
                return Ok(());
            }

            for entry in &entries {
                let status = status::status_indicators(&records, &entry.student_id, today);
                let activity = status::ActivityTier::from_days(
                    status.as_ref().and_then(|s| s.days_since_activity),
                );
                println!(
                    "- {} {} (ID {}, {}) {} progress {}%, {}, last active {}",
                    entry.first_name,
                    entry.last_name,
                    entry.student_id,
                    entry.teacher_name,
                    status::ProgressTier::from_progress(entry.progress).emoji(),
                    entry.progress,
                    activity.label(),
                    entry
                        .latest_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "Unknown".to_string()),
                );
            }
        }
        Commands::Compare { student } => {
            print!("{}", report::render_comparison(&records, &student));
        }
        Commands::Report { out } => {
            let report = report::build_cohort_report(&records, today);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out, student } => {
            let csv = if student.is_empty() {
                report::raw_export_csv(&records)?
            } else {
                report::summary_report_csv(&records, &student)?
            };
            std::fs::write(&out, csv)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Export written to {}.", out.display());
        }
    }

    Ok(())
}
