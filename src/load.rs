use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::{ActivityRecord, Subject, Term};

/// One row of the wide-format activity export. Every column is optional at
/// this stage; presence rules are applied during normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Student ID", default)]
    pub student_id: Option<String>,
    #[serde(rename = "Student first name", default)]
    pub first_name: Option<String>,
    #[serde(rename = "Student last name", default)]
    pub last_name: Option<String>,
    #[serde(rename = "Teacher names", default)]
    pub teacher_names: Option<String>,
    #[serde(rename = "End date", default)]
    pub end_date: Option<String>,

    #[serde(rename = "Math questions answered", default)]
    pub math_questions: Option<String>,
    #[serde(rename = "Math skills practiced", default)]
    pub math_practiced: Option<String>,
    #[serde(rename = "Math skills proficient", default)]
    pub math_proficient: Option<String>,
    #[serde(rename = "Math skills mastered", default)]
    pub math_mastered: Option<String>,

    #[serde(rename = "ELA questions answered", default)]
    pub ela_questions: Option<String>,
    #[serde(rename = "ELA skills practiced", default)]
    pub ela_practiced: Option<String>,
    #[serde(rename = "ELA skills proficient", default)]
    pub ela_proficient: Option<String>,
    #[serde(rename = "ELA skills mastered", default)]
    pub ela_mastered: Option<String>,

    #[serde(rename = "Science questions answered", default)]
    pub science_questions: Option<String>,
    #[serde(rename = "Science skills practiced", default)]
    pub science_practiced: Option<String>,
    #[serde(rename = "Science skills proficient", default)]
    pub science_proficient: Option<String>,
    #[serde(rename = "Science skills mastered", default)]
    pub science_mastered: Option<String>,

    #[serde(rename = "Social studies questions answered", default)]
    pub social_questions: Option<String>,
    #[serde(rename = "Social studies skills practiced", default)]
    pub social_practiced: Option<String>,
    #[serde(rename = "Social studies skills proficient", default)]
    pub social_proficient: Option<String>,
    #[serde(rename = "Social studies skills mastered", default)]
    pub social_mastered: Option<String>,

    #[serde(rename = "Starting diagnostic level - Math", default)]
    pub math_starting_level: Option<String>,
    #[serde(rename = "Ending diagnostic level - Math", default)]
    pub math_ending_level: Option<String>,
    #[serde(rename = "Diagnostic growth - Math", default)]
    pub math_growth: Option<String>,

    #[serde(rename = "Starting diagnostic level - Overall ELA", default)]
    pub ela_starting_level: Option<String>,
    #[serde(rename = "Ending diagnostic level - Overall ELA", default)]
    pub ela_ending_level: Option<String>,
    #[serde(rename = "Diagnostic growth - ELA", default)]
    pub ela_growth: Option<String>,
}

struct SubjectColumns<'a> {
    subject: Subject,
    questions: Option<&'a str>,
    practiced: Option<&'a str>,
    proficient: Option<&'a str>,
    mastered: Option<&'a str>,
    starting: Option<&'a str>,
    ending: Option<&'a str>,
    growth: Option<&'a str>,
}

fn subject_columns(row: &RawRow) -> [SubjectColumns<'_>; 4] {
    [
        SubjectColumns {
            subject: Subject::Mathematics,
            questions: present(&row.math_questions),
            practiced: present(&row.math_practiced),
            proficient: present(&row.math_proficient),
            mastered: present(&row.math_mastered),
            starting: present(&row.math_starting_level),
            ending: present(&row.math_ending_level),
            growth: present(&row.math_growth),
        },
        SubjectColumns {
            subject: Subject::EnglishLanguageArts,
            questions: present(&row.ela_questions),
            practiced: present(&row.ela_practiced),
            proficient: present(&row.ela_proficient),
            mastered: present(&row.ela_mastered),
            starting: present(&row.ela_starting_level),
            ending: present(&row.ela_ending_level),
            growth: present(&row.ela_growth),
        },
        SubjectColumns {
            subject: Subject::Science,
            questions: present(&row.science_questions),
            practiced: present(&row.science_practiced),
            proficient: present(&row.science_proficient),
            mastered: present(&row.science_mastered),
            starting: None,
            ending: None,
            growth: None,
        },
        SubjectColumns {
            subject: Subject::SocialStudies,
            questions: present(&row.social_questions),
            practiced: present(&row.social_practiced),
            proficient: present(&row.social_proficient),
            mastered: present(&row.social_mastered),
            starting: None,
            ending: None,
            growth: None,
        },
    ]
}

fn present(cell: &Option<String>) -> Option<&str> {
    let value = cell.as_deref()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Lenient integer parse. The export mixes plain integers with float
/// renderings like "12.0"; anything else reads as absent.
fn parse_count(raw: Option<&str>) -> Option<i64> {
    let value = raw?;
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() => Some(f as i64),
        _ => None,
    }
}

fn parse_level(raw: Option<&str>) -> Option<f64> {
    raw?.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Accepts the date formats seen in real exports. An unparseable date is
/// not an error; the record is simply undated.
fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let value = raw?.trim();
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    None
}

/// Expands one wide-format row into long-format activity records, one per
/// subject with a positive questions-answered count. Rows without a
/// student id expand to nothing. A malformed skills cell on an emitted
/// record is an ingestion error.
pub fn normalize_row(row: &RawRow) -> anyhow::Result<Vec<ActivityRecord>> {
    let Some(student_id) = present(&row.student_id) else {
        return Ok(Vec::new());
    };

    let date = parse_date(row.end_date.as_deref());
    let term = Term::from_date(date);
    let first_name = present(&row.first_name).unwrap_or_default().to_string();
    let last_name = present(&row.last_name).unwrap_or_default().to_string();
    let teacher_name = present(&row.teacher_names).unwrap_or_default().to_string();

    let mut records = Vec::new();
    for block in subject_columns(row) {
        let Some(questions) = parse_count(block.questions) else {
            continue;
        };
        if questions <= 0 {
            continue;
        }

        let skills_practiced = parse_count(block.practiced)
            .with_context(|| format!("missing or malformed skills practiced for {}", block.subject))?;
        let skills_proficient = parse_count(block.proficient)
            .with_context(|| format!("missing or malformed skills proficient for {}", block.subject))?;
        let skills_mastered = parse_count(block.mastered)
            .with_context(|| format!("missing or malformed skills mastered for {}", block.subject))?;

        records.push(ActivityRecord {
            student_id: student_id.to_string(),
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            teacher_name: teacher_name.clone(),
            date,
            term,
            subject: block.subject,
            questions_answered: questions,
            skills_practiced,
            skills_proficient,
            skills_mastered,
            starting_level: parse_level(block.starting),
            ending_level: parse_level(block.ending),
            diagnostic_growth: parse_level(block.growth),
        });
    }

    Ok(records)
}

/// Loads and normalizes the full activity export. Any failure here is
/// fatal; callers render nothing on a load error.
pub fn load_records(path: &Path) -> anyhow::Result<Vec<ActivityRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open activity export {}", path.display()))?;

    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<RawRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("row {line} is malformed"))?;
        let mut expanded =
            normalize_row(&row).with_context(|| format!("row {line} could not be normalized"))?;
        records.append(&mut expanded);
    }

    Ok(records)
}
