use std::cmp::Reverse;
use std::collections::HashMap;

use crate::models::{ActivityRecord, RosterEntry, Subject};

/// Progress bands used by the roster filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressBand {
    High,
    Medium,
    Low,
}

impl ProgressBand {
    pub fn parse(raw: &str) -> Option<ProgressBand> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(ProgressBand::High),
            "medium" => Some(ProgressBand::Medium),
            "low" => Some(ProgressBand::Low),
            _ => None,
        }
    }

    pub fn contains(self, progress: i64) -> bool {
        match self {
            ProgressBand::High => progress >= 80,
            ProgressBand::Medium => (40..80).contains(&progress),
            ProgressBand::Low => progress < 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterSort {
    Name,
    ProgressDesc,
    ProgressAsc,
    LastActivity,
    Teacher,
}

impl RosterSort {
    pub fn parse(raw: &str) -> Option<RosterSort> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name" => Some(RosterSort::Name),
            "progress-desc" => Some(RosterSort::ProgressDesc),
            "progress-asc" => Some(RosterSort::ProgressAsc),
            "activity" => Some(RosterSort::LastActivity),
            "teacher" => Some(RosterSort::Teacher),
            _ => None,
        }
    }
}

/// Collapses the record set to one entry per student, keeping identity
/// fields from the first record seen and the newest activity date.
/// Progress uses the zero-guard convention over the student's summed
/// totals.
pub fn build_roster(records: &[ActivityRecord]) -> Vec<RosterEntry> {
    struct Totals {
        practiced: i64,
        mastered: i64,
    }

    let mut entries: Vec<RosterEntry> = Vec::new();
    let mut totals: Vec<Totals> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let slot = match index.get(record.student_id.as_str()) {
            Some(&slot) => slot,
            None => {
                index.insert(&record.student_id, entries.len());
                entries.push(RosterEntry {
                    student_id: record.student_id.clone(),
                    first_name: record.first_name.clone(),
                    last_name: record.last_name.clone(),
                    teacher_name: record.teacher_name.clone(),
                    latest_date: None,
                    progress: 0,
                });
                totals.push(Totals {
                    practiced: 0,
                    mastered: 0,
                });
                entries.len() - 1
            }
        };

        if record.date > entries[slot].latest_date {
            entries[slot].latest_date = record.date;
        }
        totals[slot].practiced += record.skills_practiced;
        totals[slot].mastered += record.skills_mastered;
    }

    for (entry, totals) in entries.iter_mut().zip(&totals) {
        entry.progress = if totals.practiced > 0 {
            (100.0 * totals.mastered as f64 / totals.practiced as f64).round() as i64
        } else {
            0
        };
    }

    entries
}

/// Applies the roster search and filters in one pass. All criteria are
/// conjunctive; None means "no restriction".
pub fn filter_roster(
    mut entries: Vec<RosterEntry>,
    records: &[ActivityRecord],
    search: Option<&str>,
    teacher: Option<&str>,
    subject: Option<Subject>,
    band: Option<ProgressBand>,
) -> Vec<RosterEntry> {
    if let Some(search) = search {
        let needle = search.to_ascii_lowercase();
        entries.retain(|e| {
            e.first_name.to_ascii_lowercase().contains(&needle)
                || e.last_name.to_ascii_lowercase().contains(&needle)
                || e.student_id.to_ascii_lowercase().contains(&needle)
        });
    }

    if let Some(teacher) = teacher {
        entries.retain(|e| e.teacher_name == teacher);
    }

    if let Some(subject) = subject {
        entries.retain(|e| {
            records
                .iter()
                .any(|r| r.student_id == e.student_id && r.subject == subject)
        });
    }

    if let Some(band) = band {
        entries.retain(|e| band.contains(e.progress));
    }

    entries
}

/// Dateless students always order last under the activity sort.
pub fn sort_roster(entries: &mut [RosterEntry], sort: RosterSort) {
    match sort {
        RosterSort::Name => {
            entries.sort_by(|a, b| {
                (&a.first_name, &a.last_name).cmp(&(&b.first_name, &b.last_name))
            });
        }
        RosterSort::ProgressDesc => entries.sort_by_key(|e| Reverse(e.progress)),
        RosterSort::ProgressAsc => entries.sort_by_key(|e| e.progress),
        RosterSort::LastActivity => {
            entries.sort_by_key(|e| (e.latest_date.is_none(), Reverse(e.latest_date)));
        }
        RosterSort::Teacher => {
            entries.sort_by(|a, b| a.teacher_name.cmp(&b.teacher_name));
        }
    }
}
