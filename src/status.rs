use chrono::NaiveDate;

use crate::models::{ActivityRecord, Alert, Severity, StatusIndicators, Subject};
use crate::summary::{efficiency, mastery_rate};

/// How recently the student last showed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityTier {
    ActiveToday,
    ActiveThisWeek,
    ActiveThisMonth,
    Inactive,
}

impl ActivityTier {
    /// A student with no dated records classifies as Inactive.
    pub fn from_days(days: Option<i64>) -> ActivityTier {
        match days {
            Some(d) if d <= 1 => ActivityTier::ActiveToday,
            Some(d) if d <= 3 => ActivityTier::ActiveThisWeek,
            Some(d) if d <= 7 => ActivityTier::ActiveThisMonth,
            _ => ActivityTier::Inactive,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActivityTier::ActiveToday => "Active Today",
            ActivityTier::ActiveThisWeek => "Active This Week",
            ActivityTier::ActiveThisMonth => "Active This Month",
            ActivityTier::Inactive => "Inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthTier {
    HighGrowth,
    ModerateGrowth,
    Stable,
    NeedsAttention,
}

impl GrowthTier {
    pub fn from_trend(trend: i64) -> GrowthTier {
        if trend >= 80 {
            GrowthTier::HighGrowth
        } else if trend >= 60 {
            GrowthTier::ModerateGrowth
        } else if trend >= 40 {
            GrowthTier::Stable
        } else {
            GrowthTier::NeedsAttention
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GrowthTier::HighGrowth => "High Growth",
            GrowthTier::ModerateGrowth => "Moderate Growth",
            GrowthTier::Stable => "Stable",
            GrowthTier::NeedsAttention => "Needs Attention",
        }
    }
}

/// Five-band progress marker used by the roster and report renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressTier {
    Excellent,
    Strong,
    Fair,
    Developing,
    Beginning,
}

impl ProgressTier {
    pub fn from_progress(progress: i64) -> ProgressTier {
        if progress >= 80 {
            ProgressTier::Excellent
        } else if progress >= 60 {
            ProgressTier::Strong
        } else if progress >= 40 {
            ProgressTier::Fair
        } else if progress >= 20 {
            ProgressTier::Developing
        } else {
            ProgressTier::Beginning
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            ProgressTier::Excellent => "🌟",
            ProgressTier::Strong => "⭐",
            ProgressTier::Fair => "✨",
            ProgressTier::Developing => "💫",
            ProgressTier::Beginning => "🌱",
        }
    }
}

/// Derives the status block for one student: overall progress, recency,
/// subject participation, and the blended growth trend. Returns None for
/// a student with no records.
pub fn status_indicators(
    records: &[ActivityRecord],
    student_id: &str,
    as_of: NaiveDate,
) -> Option<StatusIndicators> {
    let student: Vec<&ActivityRecord> = records
        .iter()
        .filter(|r| r.student_id == student_id)
        .collect();
    if student.is_empty() {
        return None;
    }

    let total_practiced: i64 = student.iter().map(|r| r.skills_practiced).sum();
    let total_mastered: i64 = student.iter().map(|r| r.skills_mastered).sum();
    let overall_progress =
        (100.0 * total_mastered as f64 / total_practiced.max(1) as f64).round() as i64;

    let latest_date = student.iter().filter_map(|r| r.date).max();
    let days_since_activity = latest_date.map(|d| (as_of - d).num_days());

    let mut subjects: Vec<Subject> = Vec::new();
    for record in &student {
        if !subjects.contains(&record.subject) {
            subjects.push(record.subject);
        }
    }

    // Participation is measured against the subjects observed anywhere in
    // the snapshot, not the full fixed set.
    let mut all_subjects: Vec<Subject> = Vec::new();
    for record in records {
        if !all_subjects.contains(&record.subject) {
            all_subjects.push(record.subject);
        }
    }
    let subject_completion = 100.0 * subjects.len() as f64 / all_subjects.len() as f64;

    // Each subject contributes a blend of its mastery rate and efficiency,
    // computed from that subject's summed totals rather than per record.
    let mut growth = 0.0;
    for &subject in &subjects {
        let mut questions = 0i64;
        let mut practiced = 0i64;
        let mut mastered = 0i64;
        for record in student.iter().filter(|r| r.subject == subject) {
            questions += record.questions_answered;
            practiced += record.skills_practiced;
            mastered += record.skills_mastered;
        }
        growth += mastery_rate(mastered, practiced) * 0.6 + efficiency(mastered, questions) * 0.4;
    }
    let growth_trend = (growth / subjects.len() as f64).round() as i64;

    Some(StatusIndicators {
        overall_progress,
        days_since_activity,
        subject_completion,
        growth_trend,
        subjects,
    })
}

/// Builds the ordered alert list: activity, progress, subject
/// participation, growth. The activity and progress pairs are mutually
/// exclusive; the rest fire independently.
pub fn alerts(status: &StatusIndicators) -> Vec<Alert> {
    let mut alerts = Vec::new();

    match status.days_since_activity {
        Some(days) if days > 7 => alerts.push(Alert {
            severity: Severity::Danger,
            message: "No activity in the last 7 days",
        }),
        Some(days) if days > 3 => alerts.push(Alert {
            severity: Severity::Warning,
            message: "Limited activity this week",
        }),
        _ => {}
    }

    if status.overall_progress < 40 {
        alerts.push(Alert {
            severity: Severity::Danger,
            message: "Overall progress below target",
        });
    } else if status.overall_progress < 60 {
        alerts.push(Alert {
            severity: Severity::Warning,
            message: "Progress needs improvement",
        });
    }

    if status.subject_completion < 50.0 {
        alerts.push(Alert {
            severity: Severity::Warning,
            message: "Low subject participation",
        });
    }

    if status.growth_trend < 40 {
        alerts.push(Alert {
            severity: Severity::Danger,
            message: "Growth trend declining",
        });
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(
        student_id: &str,
        subject: Subject,
        date: Option<NaiveDate>,
        questions: i64,
        practiced: i64,
        mastered: i64,
    ) -> ActivityRecord {
        ActivityRecord {
            student_id: student_id.to_string(),
            first_name: "Avery".to_string(),
            last_name: "Lee".to_string(),
            teacher_name: "Ms. Rivera".to_string(),
            date,
            term: crate::models::Term::from_date(date),
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

    fn status(
        overall_progress: i64,
        days_since_activity: Option<i64>,
        subject_completion: f64,
        growth_trend: i64,
    ) -> StatusIndicators {
        StatusIndicators {
            overall_progress,
            days_since_activity,
            subject_completion,
            growth_trend,
            subjects: vec![Subject::Mathematics],
        }
    }

    #[test]
    fn activity_tiers_follow_expected_thresholds() {
        assert_eq!(ActivityTier::from_days(Some(0)), ActivityTier::ActiveToday);
        assert_eq!(ActivityTier::from_days(Some(1)), ActivityTier::ActiveToday);
        assert_eq!(ActivityTier::from_days(Some(3)), ActivityTier::ActiveThisWeek);
        assert_eq!(ActivityTier::from_days(Some(7)), ActivityTier::ActiveThisMonth);
        assert_eq!(ActivityTier::from_days(Some(8)), ActivityTier::Inactive);
        assert_eq!(ActivityTier::from_days(None), ActivityTier::Inactive);
    }

    #[test]
    fn growth_tiers_follow_expected_thresholds() {
        assert_eq!(GrowthTier::from_trend(80), GrowthTier::HighGrowth);
        assert_eq!(GrowthTier::from_trend(60), GrowthTier::ModerateGrowth);
        assert_eq!(GrowthTier::from_trend(40), GrowthTier::Stable);
        assert_eq!(GrowthTier::from_trend(39), GrowthTier::NeedsAttention);
    }

    #[test]
    fn progress_tiers_pick_the_first_matching_band() {
        assert_eq!(ProgressTier::from_progress(85), ProgressTier::Excellent);
        assert_eq!(ProgressTier::from_progress(60), ProgressTier::Strong);
        assert_eq!(ProgressTier::from_progress(41), ProgressTier::Fair);
        assert_eq!(ProgressTier::from_progress(20), ProgressTier::Developing);
        assert_eq!(ProgressTier::from_progress(5), ProgressTier::Beginning);
    }

    #[test]
    fn inactive_student_fires_the_danger_activity_alert() {
        let as_of = NaiveDate::from_ymd_opt(2025, 10, 16).unwrap();
        let records = vec![record(
            "1001",
            Subject::Mathematics,
            Some(as_of - Duration::days(10)),
            40,
            10,
            4,
        )];
        let status = status_indicators(&records, "1001", as_of).unwrap();

        assert_eq!(status.days_since_activity, Some(10));
        assert_eq!(
            ActivityTier::from_days(status.days_since_activity),
            ActivityTier::Inactive
        );
        let alerts = alerts(&status);
        assert!(alerts
            .iter()
            .any(|a| a.message == "No activity in the last 7 days"
                && a.severity == Severity::Danger));
    }

    #[test]
    fn student_active_yesterday_has_no_activity_alert() {
        let as_of = NaiveDate::from_ymd_opt(2025, 10, 16).unwrap();
        let records = vec![record(
            "1001",
            Subject::Mathematics,
            Some(as_of - Duration::days(1)),
            40,
            10,
            7,
        )];
        let status = status_indicators(&records, "1001", as_of).unwrap();

        assert_eq!(
            ActivityTier::from_days(status.days_since_activity),
            ActivityTier::ActiveToday
        );
        assert!(alerts(&status)
            .iter()
            .all(|a| a.message != "No activity in the last 7 days"
                && a.message != "Limited activity this week"));
    }

    #[test]
    fn undated_student_is_inactive_but_fires_no_activity_alert() {
        let records = vec![record("1001", Subject::Mathematics, None, 40, 10, 4)];
        let status =
            status_indicators(&records, "1001", NaiveDate::from_ymd_opt(2025, 10, 16).unwrap())
                .unwrap();
        assert_eq!(status.days_since_activity, None);
        assert_eq!(
            ActivityTier::from_days(status.days_since_activity),
            ActivityTier::Inactive
        );
        assert!(alerts(&status)
            .iter()
            .all(|a| a.message != "No activity in the last 7 days"
                && a.message != "Limited activity this week"));
    }

    #[test]
    fn subject_completion_counts_subjects_observed_in_the_snapshot() {
        let as_of = NaiveDate::from_ymd_opt(2025, 10, 16).unwrap();
        let date = Some(as_of - Duration::days(1));
        let records = vec![
            record("1001", Subject::Mathematics, date, 40, 10, 4),
            record("1002", Subject::Mathematics, date, 30, 10, 4),
            record("1002", Subject::Science, date, 30, 10, 4),
        ];
        let status = status_indicators(&records, "1001", as_of).unwrap();
        assert!((status.subject_completion - 50.0).abs() < 0.001);
    }

    #[test]
    fn growth_trend_blends_per_subject_totals() {
        let as_of = NaiveDate::from_ymd_opt(2025, 10, 16).unwrap();
        let date = Some(as_of - Duration::days(1));
        // Mathematics totals: mastery 50.0, efficiency 12.5 -> 35.0
        // Science totals: mastery 80.0, efficiency 40.0 -> 64.0
        let records = vec![
            record("1001", Subject::Mathematics, date, 40, 10, 5),
            record("1001", Subject::Science, date, 10, 5, 4),
        ];
        let status = status_indicators(&records, "1001", as_of).unwrap();
        assert_eq!(status.growth_trend, 50);
    }

    #[test]
    fn alert_order_is_activity_progress_participation_growth() {
        let fired = alerts(&status(30, Some(10), 25.0, 10));
        let messages: Vec<&str> = fired.iter().map(|a| a.message).collect();
        assert_eq!(
            messages,
            vec![
                "No activity in the last 7 days",
                "Overall progress below target",
                "Low subject participation",
                "Growth trend declining",
            ]
        );
    }

    #[test]
    fn activity_and_progress_alert_pairs_are_mutually_exclusive() {
        let fired = alerts(&status(50, Some(5), 100.0, 70));
        let messages: Vec<&str> = fired.iter().map(|a| a.message).collect();
        assert_eq!(
            messages,
            vec!["Limited activity this week", "Progress needs improvement"]
        );
    }

    #[test]
    fn healthy_student_fires_no_alerts() {
        assert!(alerts(&status(75, Some(1), 100.0, 65)).is_empty());
    }
}
