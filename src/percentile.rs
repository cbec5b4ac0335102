use serde::Serialize;

use crate::models::{ActivityRecord, Subject, Term};

/// Which end of a diagnostic window a level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    End,
}

/// Percentile rank of `value` within `population`, 0-100. Ties share the
/// average fractional rank. Returns None for a missing value or a value
/// that does not appear in the population, which callers surface as
/// "insufficient data" rather than a numeric zero.
pub fn percentile(population: &[f64], value: Option<f64>) -> Option<i64> {
    let value = value?;
    let ties = population.iter().filter(|v| **v == value).count();
    if ties == 0 {
        return None;
    }
    let below = population.iter().filter(|v| **v < value).count();
    let average_rank = below as f64 + (ties as f64 + 1.0) / 2.0;
    Some((100.0 * average_rank / population.len() as f64).round() as i64)
}

/// All diagnostic levels reported for a subject in a term, across every
/// student. This is the reference population for percentile ranking.
pub fn diagnostic_population(
    records: &[ActivityRecord],
    subject: Subject,
    term: Term,
    phase: Phase,
) -> Vec<f64> {
    records
        .iter()
        .filter(|r| r.subject == subject && r.term == Some(term))
        .filter_map(|r| match phase {
            Phase::Start => r.starting_level,
            Phase::End => r.ending_level,
        })
        .collect()
}

/// Start and end percentile for one student, subject, and term, ranked
/// against the whole population.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PercentileSpan {
    pub start: i64,
    pub end: i64,
}

/// Ranks the student's most recent dated diagnostic in the term. Both
/// percentiles must be defined or the span is absent and the view shows
/// an informational message instead.
pub fn term_percentile_span(
    records: &[ActivityRecord],
    student_id: &str,
    subject: Subject,
    term: Term,
) -> Option<PercentileSpan> {
    let latest = records
        .iter()
        .filter(|r| {
            r.student_id == student_id
                && r.subject == subject
                && r.term == Some(term)
                && r.date.is_some()
        })
        .max_by_key(|r| r.date)?;

    let start = percentile(
        &diagnostic_population(records, subject, term, Phase::Start),
        latest.starting_level,
    )?;
    let end = percentile(
        &diagnostic_population(records, subject, term, Phase::End),
        latest.ending_level,
    )?;
    Some(PercentileSpan { start, end })
}
