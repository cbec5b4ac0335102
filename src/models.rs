use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// The fixed set of subjects the activity export reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Subject {
    #[serde(rename = "Mathematics")]
    Mathematics,
    #[serde(rename = "English Language Arts")]
    EnglishLanguageArts,
    #[serde(rename = "Science")]
    Science,
    #[serde(rename = "Social Studies")]
    SocialStudies,
}

impl Subject {
    pub fn label(self) -> &'static str {
        match self {
            Subject::Mathematics => "Mathematics",
            Subject::EnglishLanguageArts => "English Language Arts",
            Subject::Science => "Science",
            Subject::SocialStudies => "Social Studies",
        }
    }

    pub fn parse(raw: &str) -> Option<Subject> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mathematics" | "math" => Some(Subject::Mathematics),
            "english language arts" | "ela" | "english" => Some(Subject::EnglishLanguageArts),
            "science" => Some(Subject::Science),
            "social studies" | "social-studies" => Some(Subject::SocialStudies),
            _ => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Half-year reporting bucket derived from the activity date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Term {
    Fall,
    Spring,
}

impl Term {
    /// Fall covers August through December, Spring January through June.
    /// July and undated records fall outside both terms.
    pub fn from_date(date: Option<NaiveDate>) -> Option<Term> {
        use chrono::Datelike;
        let month = date?.month();
        match month {
            8..=12 => Some(Term::Fall),
            1..=6 => Some(Term::Spring),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Term::Fall => "Fall",
            Term::Spring => "Spring",
        }
    }

    pub fn parse(raw: &str) -> Option<Term> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fall" => Some(Term::Fall),
            "spring" => Some(Term::Spring),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One normalized activity row: a single student's work in a single
/// subject for a single reporting date. Only emitted when the subject's
/// questions-answered count is present and positive.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub teacher_name: String,
    pub date: Option<NaiveDate>,
    pub term: Option<Term>,
    pub subject: Subject,
    pub questions_answered: i64,
    pub skills_practiced: i64,
    pub skills_proficient: i64,
    pub skills_mastered: i64,
    /// Diagnostic levels are only reported for Mathematics and ELA.
    pub starting_level: Option<f64>,
    pub ending_level: Option<f64>,
    pub diagnostic_growth: Option<f64>,
}

/// Aggregated metrics for one student in one subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub questions: i64,
    pub skills_practiced: i64,
    pub skills_mastered: i64,
    pub progress: i64,
    pub mastery_rate: f64,
    pub efficiency: f64,
    pub questions_per_day: f64,
    pub predicted_growth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelinePoint {
    pub date: Option<NaiveDate>,
    pub subject: Subject,
    pub questions_answered: i64,
    pub skills_mastered: i64,
}

/// Full per-student rollup consumed by the dashboard and comparison views.
#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub name: String,
    pub teacher: String,
    pub subjects: Vec<Subject>,
    pub total_questions: i64,
    pub total_skills_practiced: i64,
    pub total_skills_mastered: i64,
    pub latest_date: Option<NaiveDate>,
    pub subject_breakdown: BTreeMap<Subject, SubjectSummary>,
    pub timeline: Vec<TimelinePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusIndicators {
    pub overall_progress: i64,
    /// None when no record for the student carries a parseable date.
    pub days_since_activity: Option<i64>,
    pub subject_completion: f64,
    pub growth_trend: i64,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Danger,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub severity: Severity,
    pub message: &'static str,
}

/// One row of the student list view.
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub teacher_name: String,
    pub latest_date: Option<NaiveDate>,
    pub progress: i64,
}
