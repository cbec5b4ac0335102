use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{ActivityRecord, StudentSummary, Subject, Term};
use crate::percentile::term_percentile_span;
use crate::roster::build_roster;
use crate::status::{alerts, status_indicators, ActivityTier, GrowthTier, ProgressTier};
use crate::summary::{average_predicted_growth, summarize_student, DateFilter};

#[derive(Debug, Clone)]
pub struct SubjectMix {
    pub subject: Subject,
    pub record_count: usize,
    pub questions: i64,
    pub progress: i64,
}

/// Cohort-wide activity mix, most active subject first.
pub fn summarize_by_subject(records: &[ActivityRecord]) -> Vec<SubjectMix> {
    let mut map: HashMap<Subject, (usize, i64, i64, i64)> = HashMap::new();

    for record in records {
        let entry = map.entry(record.subject).or_insert((0, 0, 0, 0));
        entry.0 += 1;
        entry.1 += record.questions_answered;
        entry.2 += record.skills_practiced;
        entry.3 += record.skills_mastered;
    }

    let mut mixes: Vec<SubjectMix> = map
        .into_iter()
        .map(|(subject, (record_count, questions, practiced, mastered))| SubjectMix {
            subject,
            record_count,
            questions,
            progress: if practiced > 0 {
                (100.0 * mastered as f64 / practiced as f64).round() as i64
            } else {
                0
            },
        })
        .collect();

    mixes.sort_by(|a, b| b.record_count.cmp(&a.record_count));
    mixes
}

fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.to_string(),
        None => "Unknown".to_string(),
    }
}

/// Renders the full per-student dashboard as markdown. Returns None when
/// the student has no records under the given filter.
pub fn render_student_dashboard(
    records: &[ActivityRecord],
    student_id: &str,
    filter: &DateFilter,
    term: Option<Term>,
    as_of: NaiveDate,
) -> Option<String> {
    let summary = summarize_student(records, student_id, filter)?;
    let mut output = String::new();

    let _ = writeln!(output, "# Student Dashboard: {}", summary.name);
    let _ = writeln!(output, "Teacher: {}", summary.teacher);
    match filter {
        DateFilter::On(date) => {
            let _ = writeln!(output, "Showing data for: {date}");
        }
        DateFilter::All => {
            let _ = writeln!(output, "Showing all available data");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Total questions: {}", summary.total_questions);
    let _ = writeln!(output, "- Skills practiced: {}", summary.total_skills_practiced);
    let _ = writeln!(output, "- Skills mastered: {}", summary.total_skills_mastered);
    let _ = writeln!(output, "- Latest activity: {}", format_date(summary.latest_date));
    let _ = writeln!(
        output,
        "- Predicted growth: +{}%",
        average_predicted_growth(&summary)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Breakdown");
    for subject in &summary.subjects {
        let Some(breakdown) = summary.subject_breakdown.get(subject) else {
            continue;
        };
        let emoji = ProgressTier::from_progress(breakdown.progress).emoji();
        let _ = writeln!(output, "### {} - {}% {}", subject, breakdown.progress, emoji);
        let _ = writeln!(output, "- Mastery rate: {:.1}%", breakdown.mastery_rate);
        let _ = writeln!(output, "- Efficiency: {:.1}%", breakdown.efficiency);
        let _ = writeln!(output, "- Questions per day: {:.1}", breakdown.questions_per_day);
        let _ = writeln!(output, "- Questions answered: {}", breakdown.questions);
        let _ = writeln!(output, "- Skills practiced: {}", breakdown.skills_practiced);
        let _ = writeln!(output, "- Skills mastered: {}", breakdown.skills_mastered);
        let _ = writeln!(output, "- Predicted growth: {:.1}", breakdown.predicted_growth);

        // Diagnostic lines come from the newest dated record of the
        // subject and only render when both levels are reported.
        let latest = records
            .iter()
            .filter(|r| {
                r.student_id == student_id && r.subject == *subject && filter.matches(r.date)
            })
            .max_by_key(|r| r.date);
        if let Some(latest) = latest {
            if let (Some(start), Some(end)) = (latest.starting_level, latest.ending_level) {
                let _ = writeln!(output, "- Starting level: {start}");
                let _ = writeln!(output, "- Ending level: {end}");
                if let Some(growth) = latest.diagnostic_growth {
                    let _ = writeln!(output, "- Diagnostic growth: {growth}");
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Progress Timeline");
    for point in &summary.timeline {
        let _ = writeln!(
            output,
            "- {}: {}: {} questions, {} skills mastered",
            format_date(point.date),
            point.subject,
            point.questions_answered,
            point.skills_mastered
        );
    }

    if let Some(term) = term {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Term Performance ({term})");
        for subject in [Subject::Mathematics, Subject::EnglishLanguageArts] {
            match term_percentile_span(records, student_id, subject, term) {
                Some(span) => {
                    let _ = writeln!(
                        output,
                        "- {} percentile: start {}, end {}",
                        subject, span.start, span.end
                    );
                }
                None => {
                    let _ = writeln!(
                        output,
                        "- {subject}: not enough completed diagnostics to receive a score"
                    );
                }
            }
        }
    }

    if let Some(status) = status_indicators(records, student_id, as_of) {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Status");
        let activity = ActivityTier::from_days(status.days_since_activity);
        match status.days_since_activity {
            Some(days) => {
                let _ = writeln!(
                    output,
                    "- Activity: {} ({} days since last activity)",
                    activity.label(),
                    days
                );
            }
            None => {
                let _ = writeln!(output, "- Activity: {} (no dated activity)", activity.label());
            }
        }
        let _ = writeln!(output, "- Overall progress: {}%", status.overall_progress);
        let _ = writeln!(
            output,
            "- Subject participation: {:.1}%",
            status.subject_completion
        );
        let _ = writeln!(
            output,
            "- Growth: {} (trend {})",
            GrowthTier::from_trend(status.growth_trend).label(),
            status.growth_trend
        );

        let _ = writeln!(output);
        let _ = writeln!(output, "## Alerts");
        let fired = alerts(&status);
        if fired.is_empty() {
            let _ = writeln!(output, "No alerts.");
        } else {
            for alert in fired {
                let _ = writeln!(output, "- [{}] {}", alert.severity.as_str(), alert.message);
            }
        }
    }

    Some(output)
}

/// Side-by-side view of the selected students.
pub fn render_comparison(records: &[ActivityRecord], student_ids: &[String]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Student Comparison");

    if student_ids.is_empty() {
        let _ = writeln!(output, "No students selected for comparison.");
        return output;
    }

    for student_id in student_ids {
        let _ = writeln!(output);
        match summarize_student(records, student_id, &DateFilter::All) {
            None => {
                let _ = writeln!(output, "## {student_id}");
                let _ = writeln!(output, "No records found for this student.");
            }
            Some(summary) => {
                let _ = writeln!(output, "## {} ({})", summary.name, summary.teacher);
                let _ = writeln!(output, "- Total questions: {}", summary.total_questions);
                let _ = writeln!(
                    output,
                    "- Skills practiced: {}",
                    summary.total_skills_practiced
                );
                let _ = writeln!(
                    output,
                    "- Skills mastered: {}",
                    summary.total_skills_mastered
                );
                let _ = writeln!(
                    output,
                    "- Predicted growth: +{}%",
                    average_predicted_growth(&summary)
                );
                for subject in &summary.subjects {
                    if let Some(breakdown) = summary.subject_breakdown.get(subject) {
                        let _ = writeln!(
                            output,
                            "- {}: progress {}%, mastery rate {:.1}%, efficiency {:.1}%",
                            subject,
                            breakdown.progress,
                            breakdown.mastery_rate,
                            breakdown.efficiency
                        );
                    }
                }
            }
        }
    }

    output
}

/// Cohort-wide markdown report: subject mix, students needing attention,
/// recent activity.
pub fn build_cohort_report(records: &[ActivityRecord], as_of: NaiveDate) -> String {
    let mixes = summarize_by_subject(records);
    let mut output = String::new();

    let _ = writeln!(output, "# Student Progress Report");
    let _ = writeln!(output, "Generated as of {as_of}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Subject Mix");

    if mixes.is_empty() {
        let _ = writeln!(output, "No activity records loaded.");
    } else {
        for mix in &mixes {
            let _ = writeln!(
                output,
                "- {}: {} records, {} questions answered, progress {}%",
                mix.subject, mix.record_count, mix.questions, mix.progress
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students Needing Attention");

    let mut flagged: Vec<(crate::models::RosterEntry, crate::models::StatusIndicators)> =
        build_roster(records)
            .into_iter()
            .filter_map(|entry| {
                status_indicators(records, &entry.student_id, as_of)
                    .map(|status| (entry, status))
            })
            .collect();
    flagged.sort_by_key(|(_, status)| status.growth_trend);

    if flagged.is_empty() {
        let _ = writeln!(output, "No students with activity in this snapshot.");
    } else {
        for (entry, status) in flagged.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} {} (ID {}, {}) {} progress {}%, growth trend {}",
                entry.first_name,
                entry.last_name,
                entry.student_id,
                entry.teacher_name,
                ProgressTier::from_progress(entry.progress).emoji(),
                entry.progress,
                status.growth_trend
            );
            for alert in alerts(status) {
                let _ = writeln!(output, "  - [{}] {}", alert.severity.as_str(), alert.message);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Activity");

    let mut dated: Vec<&ActivityRecord> = records.iter().filter(|r| r.date.is_some()).collect();
    dated.sort_by_key(|r| std::cmp::Reverse(r.date));

    if dated.is_empty() {
        let _ = writeln!(output, "No dated activity records.");
    } else {
        for record in dated.iter().take(5) {
            let _ = writeln!(
                output,
                "- {}: {} {}: {} questions in {}, {} skills mastered",
                format_date(record.date),
                record.first_name,
                record.last_name,
                record.questions_answered,
                record.subject,
                record.skills_mastered
            );
        }
    }

    output
}

/// Flattened record list, one CSV row per ActivityRecord. The column set
/// is the record's field list.
pub fn raw_export_csv(records: &[ActivityRecord]) -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    Ok(String::from_utf8(buffer)?)
}

#[derive(Debug, Serialize)]
struct SummaryReportRow {
    student_name: String,
    teacher: String,
    total_questions: i64,
    total_skills_practiced: i64,
    total_skills_mastered: i64,
    latest_date: String,
}

impl SummaryReportRow {
    fn from_summary(summary: &StudentSummary) -> SummaryReportRow {
        SummaryReportRow {
            student_name: summary.name.clone(),
            teacher: summary.teacher.clone(),
            total_questions: summary.total_questions,
            total_skills_practiced: summary.total_skills_practiced,
            total_skills_mastered: summary.total_skills_mastered,
            latest_date: format_date(summary.latest_date),
        }
    }
}

/// Per-student totals for the selected students, the roster's download
/// format. Students with no records are skipped.
pub fn summary_report_csv(
    records: &[ActivityRecord],
    student_ids: &[String],
) -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        for student_id in student_ids {
            if let Some(summary) = summarize_student(records, student_id, &DateFilter::All) {
                writer.serialize(SummaryReportRow::from_summary(&summary))?;
            }
        }
        writer.flush()?;
    }
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        student_id: &str,
        subject: Subject,
        date: Option<&str>,
        questions: i64,
        practiced: i64,
        mastered: i64,
    ) -> ActivityRecord {
        let date = date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap());
        ActivityRecord {
            student_id: student_id.to_string(),
            first_name: "Avery".to_string(),
            last_name: "Lee".to_string(),
            teacher_name: "Ms. Rivera".to_string(),
            date,
            term: Term::from_date(date),
            subject,
            questions_answered: questions,
            skills_practiced: practiced,
            skills_proficient: 0,
            skills_mastered: mastered,
            starting_level: None,
            ending_level: None,
            diagnostic_growth: None,
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 16).unwrap()
    }

    #[test]
    fn subject_mix_orders_by_record_count() {
        let records = vec![
            record("1001", Subject::Mathematics, Some("2025-10-06"), 40, 10, 4),
            record("1001", Subject::Mathematics, Some("2025-10-13"), 30, 10, 4),
            record("1002", Subject::Science, Some("2025-10-06"), 25, 6, 3),
        ];
        let mixes = summarize_by_subject(&records);
        assert_eq!(mixes.len(), 2);
        assert_eq!(mixes[0].subject, Subject::Mathematics);
        assert_eq!(mixes[0].record_count, 2);
        assert_eq!(mixes[0].questions, 70);
        assert_eq!(mixes[0].progress, 40);
    }

    #[test]
    fn cohort_report_has_all_three_sections() {
        let records = vec![
            record("1001", Subject::Mathematics, Some("2025-10-06"), 40, 10, 4),
            record("1002", Subject::Science, Some("2025-10-14"), 25, 6, 5),
        ];
        let report = build_cohort_report(&records, as_of());
        assert!(report.contains("# Student Progress Report"));
        assert!(report.contains("## Subject Mix"));
        assert!(report.contains("## Students Needing Attention"));
        assert!(report.contains("## Recent Activity"));
        assert!(report.contains("Avery Lee"));
    }

    #[test]
    fn cohort_report_on_an_empty_snapshot_uses_fallback_lines() {
        let report = build_cohort_report(&[], as_of());
        assert!(report.contains("No activity records loaded."));
        assert!(report.contains("No students with activity in this snapshot."));
        assert!(report.contains("No dated activity records."));
    }

    #[test]
    fn dashboard_renders_for_a_known_student_and_not_otherwise() {
        let records = vec![record(
            "1001",
            Subject::Mathematics,
            Some("2025-10-06"),
            40,
            10,
            4,
        )];
        let text = render_student_dashboard(&records, "1001", &DateFilter::All, None, as_of())
            .unwrap();
        assert!(text.contains("# Student Dashboard: Avery Lee"));
        assert!(text.contains("## Subject Breakdown"));
        assert!(text.contains("### Mathematics - 40% ✨"));
        assert!(text.contains("## Progress Timeline"));

        assert!(
            render_student_dashboard(&records, "9999", &DateFilter::All, None, as_of()).is_none()
        );
    }

    #[test]
    fn dashboard_term_section_reports_missing_diagnostics() {
        let records = vec![record(
            "1001",
            Subject::Mathematics,
            Some("2025-10-06"),
            40,
            10,
            4,
        )];
        let text = render_student_dashboard(
            &records,
            "1001",
            &DateFilter::All,
            Some(Term::Fall),
            as_of(),
        )
        .unwrap();
        assert!(text.contains("## Term Performance (Fall)"));
        assert!(text
            .contains("Mathematics: not enough completed diagnostics to receive a score"));
    }

    #[test]
    fn comparison_reports_missing_students_inline() {
        let records = vec![record(
            "1001",
            Subject::Mathematics,
            Some("2025-10-06"),
            40,
            10,
            4,
        )];
        let text =
            render_comparison(&records, &["1001".to_string(), "9999".to_string()]);
        assert!(text.contains("## Avery Lee (Ms. Rivera)"));
        assert!(text.contains("## 9999"));
        assert!(text.contains("No records found for this student."));
    }

    #[test]
    fn raw_export_uses_the_record_field_list_as_header() {
        let records = vec![record(
            "1001",
            Subject::Mathematics,
            Some("2025-10-06"),
            40,
            10,
            4,
        )];
        let csv = raw_export_csv(&records).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(
            header,
            "student_id,first_name,last_name,teacher_name,date,term,subject,\
             questions_answered,skills_practiced,skills_proficient,skills_mastered,\
             starting_level,ending_level,diagnostic_growth"
        );
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("Mathematics"));
    }

    #[test]
    fn summary_report_writes_unknown_for_dateless_students() {
        let records = vec![record("1001", Subject::Mathematics, None, 40, 10, 4)];
        let csv = summary_report_csv(&records, &["1001".to_string()]).unwrap();
        assert!(csv.contains("Avery Lee"));
        assert!(csv.contains("Unknown"));
    }

    #[test]
    fn summary_report_skips_unknown_students() {
        let records = vec![record(
            "1001",
            Subject::Mathematics,
            Some("2025-10-06"),
            40,
            10,
            4,
        )];
        let csv = summary_report_csv(&records, &["9999".to_string()]).unwrap();
        assert!(!csv.contains("9999"));
    }
}
