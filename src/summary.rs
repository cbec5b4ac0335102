use chrono::NaiveDate;

use crate::models::{ActivityRecord, StudentSummary, Subject, SubjectSummary, TimelinePoint};

/// Optional exact-date restriction applied before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    All,
    On(NaiveDate),
}

impl DateFilter {
    /// Parses a user-supplied filter string. An unparseable date falls
    /// back to the unfiltered view and reports a warning instead of
    /// failing the whole request.
    pub fn parse(raw: Option<&str>) -> (DateFilter, Option<String>) {
        let Some(raw) = raw else {
            return (DateFilter::All, None);
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return (DateFilter::All, None);
        }
        match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(date) => (DateFilter::On(date), None),
            Err(_) => (
                DateFilter::All,
                Some("Invalid date format. Showing all data.".to_string()),
            ),
        }
    }

    pub fn matches(&self, date: Option<NaiveDate>) -> bool {
        match self {
            DateFilter::All => true,
            DateFilter::On(filter) => date == Some(*filter),
        }
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Skills mastered as a percentage of skills practiced, denominator
/// floored at 1, one decimal place.
pub(crate) fn mastery_rate(mastered: i64, practiced: i64) -> f64 {
    round1(100.0 * mastered as f64 / practiced.max(1) as f64)
}

/// Skills mastered as a percentage of questions answered, denominator
/// floored at 1, one decimal place.
pub(crate) fn efficiency(mastered: i64, questions: i64) -> f64 {
    round1(100.0 * mastered as f64 / questions.max(1) as f64)
}

/// Aggregates one student's records for a single subject.
///
/// `progress` guards division by zero by reporting 0 outright, while
/// `mastery_rate` floors its denominator at 1. The two conventions differ
/// only at `skills_practiced == 0` and both feed comparison charts, so
/// neither may be folded into the other.
pub fn summarize_subject(records: &[&ActivityRecord]) -> SubjectSummary {
    let questions: i64 = records.iter().map(|r| r.questions_answered).sum();
    let skills_practiced: i64 = records.iter().map(|r| r.skills_practiced).sum();
    let skills_mastered: i64 = records.iter().map(|r| r.skills_mastered).sum();

    let progress = if skills_practiced > 0 {
        (100.0 * skills_mastered as f64 / skills_practiced as f64).round() as i64
    } else {
        0
    };

    let mastery_rate = mastery_rate(skills_mastered, skills_practiced);
    let efficiency = efficiency(skills_mastered, questions);
    // Divides by contributing row count, a proxy for active days rather
    // than elapsed calendar days.
    let questions_per_day = round1(questions as f64 / records.len().max(1) as f64);

    // The base score rounds first; the tier adjustment scales the rounded
    // value, so an adjusted score is generally non-integer.
    let base = (mastery_rate * 0.4 + efficiency * 0.4 + questions_per_day.min(20.0) * 0.2).round();
    let predicted_growth = if progress < 30 {
        base * 1.2
    } else if progress > 80 {
        base * 0.8
    } else {
        base
    };

    SubjectSummary {
        questions,
        skills_practiced,
        skills_mastered,
        progress,
        mastery_rate,
        efficiency,
        questions_per_day,
        predicted_growth,
    }
}

/// Rolls up one student's records across subjects. Returns None when the
/// student has no records under the given filter, so callers can render a
/// "no data" placeholder instead of a zero-filled summary.
pub fn summarize_student(
    records: &[ActivityRecord],
    student_id: &str,
    filter: &DateFilter,
) -> Option<StudentSummary> {
    let student: Vec<&ActivityRecord> = records
        .iter()
        .filter(|r| r.student_id == student_id && filter.matches(r.date))
        .collect();
    let first = student.first()?;

    let total_questions: i64 = student.iter().map(|r| r.questions_answered).sum();
    let total_skills_practiced: i64 = student.iter().map(|r| r.skills_practiced).sum();
    let total_skills_mastered: i64 = student.iter().map(|r| r.skills_mastered).sum();
    let latest_date = student.iter().filter_map(|r| r.date).max();

    let mut subjects: Vec<Subject> = Vec::new();
    for record in &student {
        if !subjects.contains(&record.subject) {
            subjects.push(record.subject);
        }
    }

    let subject_breakdown = subjects
        .iter()
        .map(|&subject| {
            let subject_records: Vec<&ActivityRecord> = student
                .iter()
                .copied()
                .filter(|r| r.subject == subject)
                .collect();
            (subject, summarize_subject(&subject_records))
        })
        .collect();

    let mut timeline: Vec<TimelinePoint> = student
        .iter()
        .map(|r| TimelinePoint {
            date: r.date,
            subject: r.subject,
            questions_answered: r.questions_answered,
            skills_mastered: r.skills_mastered,
        })
        .collect();
    timeline.sort_by_key(|point| (point.date.is_none(), point.date));

    Some(StudentSummary {
        name: format!("{} {}", first.first_name, first.last_name),
        teacher: first.teacher_name.clone(),
        subjects,
        total_questions,
        total_skills_practiced,
        total_skills_mastered,
        latest_date,
        subject_breakdown,
        timeline,
    })
}

/// Mean predicted growth across a student's subjects, as shown on the
/// comparison view.
pub fn average_predicted_growth(summary: &StudentSummary) -> i64 {
    let count = summary.subject_breakdown.len().max(1);
    let total: f64 = summary
        .subject_breakdown
        .values()
        .map(|s| s.predicted_growth)
        .sum();
    (total / count as f64).round() as i64
}
