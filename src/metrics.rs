//! Dashboard figures derived from the held application list. Nothing here is
//! stored; every value is recomputed from the current snapshot.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};

use crate::models::{ApplicationStatus, JobApplication, UserProfile};

pub const DEFAULT_WEEKLY_GOAL: u32 = 10;

/// `now` minus the number of whole days since Sunday. Keeps the time of day.
pub fn week_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let days = i64::from(now.weekday().num_days_from_sunday());
    now.clone() - TimeDelta::seconds(days * 86_400)
}

fn parse_applied_date<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Tz>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(tz));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return tz.from_local_datetime(&naive).earliest();
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    tz.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).earliest()
}

pub fn weekly_application_count<Tz: TimeZone>(applications: &[JobApplication], now: &DateTime<Tz>) -> usize {
    let start = week_start(now);
    let tz = now.timezone();
    applications
        .iter()
        .filter_map(|a| parse_applied_date(&a.applied_date, &tz))
        .filter(|applied| *applied >= start)
        .count()
}

/// Percentage of applications that moved past `applied`.
pub fn response_rate(applications: &[JobApplication]) -> u32 {
    if applications.is_empty() {
        return 0;
    }
    let responded = applications
        .iter()
        .filter(|a| a.status != ApplicationStatus::Applied)
        .count();
    percent(responded, applications.len())
}

pub fn weekly_goal(profile: Option<&UserProfile>) -> u32 {
    profile
        .map(|p| p.weekly_application_goal)
        .filter(|goal| *goal > 0)
        .unwrap_or(DEFAULT_WEEKLY_GOAL)
}

/// Weekly progress toward `goal`, clamped to 100.
pub fn weekly_progress(weekly_count: usize, goal: u32) -> u32 {
    let goal = if goal == 0 { DEFAULT_WEEKLY_GOAL } else { goal };
    let progress = (weekly_count as f64 / f64::from(goal) * 100.0).min(100.0);
    progress.round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusShare {
    pub status: ApplicationStatus,
    pub count: usize,
    pub percent: u32,
}

pub fn status_distribution(applications: &[JobApplication]) -> Vec<StatusShare> {
    ApplicationStatus::ALL
        .into_iter()
        .map(|status| {
            let count = applications.iter().filter(|a| a.status == status).count();
            StatusShare {
                status,
                count,
                percent: percent(count, applications.len()),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationStats {
    pub total: usize,
    pub this_week: usize,
    pub pending: usize,
    pub interviewing: usize,
    pub offered: usize,
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub stats: ApplicationStats,
    pub goal: u32,
    pub progress: u32,
    pub response_rate: u32,
    pub distribution: Vec<StatusShare>,
}

impl Dashboard {
    pub fn compute<Tz: TimeZone>(
        applications: &[JobApplication],
        profile: Option<&UserProfile>,
        now: &DateTime<Tz>,
    ) -> Self {
        let distribution = status_distribution(applications);
        let count_of = |status: ApplicationStatus| {
            distribution
                .iter()
                .find(|share| share.status == status)
                .map_or(0, |share| share.count)
        };

        let this_week = weekly_application_count(applications, now);
        let goal = weekly_goal(profile);
        let stats = ApplicationStats {
            total: applications.len(),
            this_week,
            pending: count_of(ApplicationStatus::Applied),
            interviewing: count_of(ApplicationStatus::Interviewing),
            offered: count_of(ApplicationStatus::Offered),
            accepted: count_of(ApplicationStatus::Accepted),
            rejected: count_of(ApplicationStatus::Rejected),
        };

        Self {
            stats,
            goal,
            progress: weekly_progress(this_week, goal),
            response_rate: response_rate(applications),
            distribution,
        }
    }
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}
