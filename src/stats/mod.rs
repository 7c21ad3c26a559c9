//! Focus statistics and streaks.
//!
//! The arithmetic is pure over a slice of sessions and a sorted list of days
//! with completed sessions; [`StatsEngine`] only loads those inputs, after
//! closing any session whose countdown has already run out.

pub mod commands;

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    clock::Clock,
    db::{models::Session, Database},
    error::{ensure_range, PomodoroResult},
    timer::{SessionEngine, SessionStatus, SessionType},
};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_sessions: u32,
    pub completed_sessions: u32,
    pub work_sessions: u32,
    pub break_sessions: u32,
    /// Minutes of completed work.
    pub total_focus_time: u64,
    pub average_session_duration: f64,
    pub completion_rate: f64,
    pub daily_average: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub sessions_by_day: BTreeMap<String, u32>,
    pub focus_time_by_day: BTreeMap<String, u64>,
    pub average_productivity: Option<f64>,
    pub productivity_distribution: BTreeMap<String, u32>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn is_completed_work(session: &Session) -> bool {
    session.session_type == SessionType::Work && session.status == SessionStatus::Completed
}

/// First day of a window of `days` calendar days ending with `today`.
pub fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today - Duration::days(i64::from(days.max(1)) - 1)
}

/// Consecutive days with a completed session, counting back from `today`.
///
/// Zero when `today` itself has none.
pub fn current_streak(completed_days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while completed_days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

/// Longest run of consecutive days in an ascending, de-duplicated list.
pub fn longest_streak(sorted_days: &[NaiveDate]) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in sorted_days {
        run = match previous {
            Some(prev) if day.signed_duration_since(prev).num_days() == 1 => run + 1,
            Some(prev) if day == prev => run,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

/// Aggregates the sessions started within the `days`-day window ending `today`.
///
/// `completed_days` is the user's whole history and only feeds the streaks.
pub fn compute_stats(
    sessions: &[Session],
    completed_days: &[NaiveDate],
    today: NaiveDate,
    days: u32,
) -> Stats {
    let start = window_start(today, days);
    let in_window: Vec<&Session> = sessions
        .iter()
        .filter(|s| {
            let day = s.started_at.date_naive();
            day >= start && day <= today
        })
        .collect();

    let total_sessions = in_window.len() as u32;
    let completed: Vec<&Session> = in_window
        .iter()
        .copied()
        .filter(|s| s.status == SessionStatus::Completed)
        .collect();
    let completed_sessions = completed.len() as u32;
    let break_sessions = in_window
        .iter()
        .filter(|s| s.session_type.is_break())
        .count() as u32;
    let work_sessions = total_sessions - break_sessions;

    let total_focus_time: u64 = completed
        .iter()
        .filter(|s| s.session_type == SessionType::Work)
        .filter_map(|s| s.actual_duration)
        .map(u64::from)
        .sum();

    let durations: Vec<u64> = completed
        .iter()
        .filter_map(|s| s.actual_duration)
        .map(u64::from)
        .collect();
    let average_session_duration = if durations.is_empty() {
        0.0
    } else {
        round1(durations.iter().sum::<u64>() as f64 / durations.len() as f64)
    };

    let completion_rate = if total_sessions == 0 {
        0.0
    } else {
        round1(f64::from(completed_sessions) / f64::from(total_sessions) * 100.0)
    };
    let daily_average = round1(f64::from(total_sessions) / f64::from(days.max(1)));

    let mut sessions_by_day = BTreeMap::new();
    let mut focus_time_by_day = BTreeMap::new();
    let mut day = start;
    while day <= today {
        let key = day.format("%Y-%m-%d").to_string();
        sessions_by_day.insert(key.clone(), 0u32);
        focus_time_by_day.insert(key, 0u64);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    for session in &in_window {
        let key = session.started_at.date_naive().format("%Y-%m-%d").to_string();
        if let Some(count) = sessions_by_day.get_mut(&key) {
            *count += 1;
        }
        if is_completed_work(session) {
            if let Some(minutes) = focus_time_by_day.get_mut(&key) {
                *minutes += u64::from(session.actual_duration.unwrap_or(0));
            }
        }
    }

    let ratings: Vec<u8> = completed
        .iter()
        .copied()
        .filter(|s| is_completed_work(s))
        .filter_map(|s| s.productivity_rating)
        .collect();
    let average_productivity = if ratings.is_empty() {
        None
    } else {
        let sum: u32 = ratings.iter().map(|&r| u32::from(r)).sum();
        Some(round1(f64::from(sum) / ratings.len() as f64))
    };
    let mut productivity_distribution: BTreeMap<String, u32> =
        (1..=5).map(|rating| (rating.to_string(), 0)).collect();
    for rating in &ratings {
        if let Some(count) = productivity_distribution.get_mut(&rating.to_string()) {
            *count += 1;
        }
    }

    let day_set: BTreeSet<NaiveDate> = completed_days.iter().copied().collect();
    let sorted_days: Vec<NaiveDate> = day_set.iter().copied().collect();

    Stats {
        total_sessions,
        completed_sessions,
        work_sessions,
        break_sessions,
        total_focus_time,
        average_session_duration,
        completion_rate,
        daily_average,
        current_streak: current_streak(&day_set, today),
        longest_streak: longest_streak(&sorted_days),
        sessions_by_day,
        focus_time_by_day,
        average_productivity,
        productivity_distribution,
    }
}

/// Loads session history and runs [`compute_stats`].
#[derive(Clone)]
pub struct StatsEngine {
    db: Database,
    clock: Arc<dyn Clock>,
    sessions: SessionEngine,
}

impl StatsEngine {
    pub fn new(db: Database, clock: Arc<dyn Clock>, sessions: SessionEngine) -> Self {
        Self {
            db,
            clock,
            sessions,
        }
    }

    pub async fn compute(&self, user_id: i64, days: i64) -> PomodoroResult<Stats> {
        ensure_range("days", days, 1, MAX_WINDOW_DAYS, "days")?;
        let days = u32::try_from(days).unwrap_or(1);

        self.sessions.reconcile_all(user_id).await?;

        let today = self.clock.now().date_naive();
        let since = window_start(today, days)
            .and_hms_opt(0, 0, 0)
            .map(|start| start.and_utc())
            .unwrap_or_else(|| self.clock.now());

        let sessions = self.db.sessions_started_since(user_id, since).await?;
        let completed_days = self.db.completed_session_days(user_id).await?;
        Ok(compute_stats(&sessions, &completed_days, today, days))
    }
}
