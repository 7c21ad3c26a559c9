//! Per-user timer preferences.
//!
//! A user without a stored record gets one built from the defaults on first
//! access; "deleting" settings resets them rather than removing the row.

pub mod commands;

use std::sync::Arc;

use log::info;

use crate::{
    clock::Clock,
    db::{
        models::{SettingsPatch, SettingsValues, TimerSettings},
        Database,
    },
    error::{ensure_max_chars, ensure_range, PomodoroError, PomodoroResult},
};

pub const WORK_DURATION_RANGE: (i64, i64) = (1, 120);
pub const SHORT_BREAK_DURATION_RANGE: (i64, i64) = (1, 60);
pub const LONG_BREAK_DURATION_RANGE: (i64, i64) = (1, 120);
pub const SESSIONS_UNTIL_LONG_BREAK_RANGE: (i64, i64) = (2, 12);
pub const MAX_SOUND_CHARS: usize = 50;

/// Bounds shared by settings and presets.
pub fn validate_durations(
    work_duration: u32,
    short_break_duration: u32,
    long_break_duration: u32,
    sessions_until_long_break: u32,
) -> PomodoroResult<()> {
    let (min, max) = WORK_DURATION_RANGE;
    ensure_range("work_duration", i64::from(work_duration), min, max, "minutes")?;
    let (min, max) = SHORT_BREAK_DURATION_RANGE;
    ensure_range(
        "short_break_duration",
        i64::from(short_break_duration),
        min,
        max,
        "minutes",
    )?;
    let (min, max) = LONG_BREAK_DURATION_RANGE;
    ensure_range(
        "long_break_duration",
        i64::from(long_break_duration),
        min,
        max,
        "minutes",
    )?;
    let (min, max) = SESSIONS_UNTIL_LONG_BREAK_RANGE;
    ensure_range(
        "sessions_until_long_break",
        i64::from(sessions_until_long_break),
        min,
        max,
        "sessions",
    )
}

pub fn validate(values: &SettingsValues) -> PomodoroResult<()> {
    validate_durations(
        values.work_duration,
        values.short_break_duration,
        values.long_break_duration,
        values.sessions_until_long_break,
    )?;
    ensure_max_chars("work_sound", &values.work_sound, MAX_SOUND_CHARS)?;
    ensure_max_chars("break_sound", &values.break_sound, MAX_SOUND_CHARS)?;
    if !(0.0..=1.0).contains(&values.volume) {
        return Err(PomodoroError::validation(
            "volume",
            "must be between 0.0 and 1.0",
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct SettingsStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SettingsStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Never fails for lack of a record; absence creates the defaults.
    pub async fn get_or_create(&self, user_id: i64) -> PomodoroResult<TimerSettings> {
        Ok(self
            .db
            .get_or_create_settings(user_id, self.clock.now())
            .await?)
    }

    /// Applies only the supplied fields, then checks the merged record.
    pub async fn update(
        &self,
        user_id: i64,
        patch: SettingsPatch,
    ) -> PomodoroResult<TimerSettings> {
        let saved = self
            .db
            .modify_settings(user_id, self.clock.now(), move |values| {
                patch.apply_to(values);
                validate(values)
            })
            .await?;
        info!("Updated timer settings for user {user_id}");
        Ok(saved)
    }

    pub async fn replace(
        &self,
        user_id: i64,
        values: SettingsValues,
    ) -> PomodoroResult<TimerSettings> {
        validate(&values)?;
        let saved = self
            .db
            .save_settings(user_id, values, self.clock.now())
            .await?;
        info!("Replaced timer settings for user {user_id}");
        Ok(saved)
    }

    pub async fn reset(&self, user_id: i64) -> PomodoroResult<TimerSettings> {
        let saved = self
            .db
            .save_settings(user_id, SettingsValues::default(), self.clock.now())
            .await?;
        info!("Reset timer settings for user {user_id}");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, db::temp_database};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn store(db: Database) -> SettingsStore {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        SettingsStore::new(db, Arc::new(clock))
    }

    fn field_of(err: PomodoroError) -> String {
        match err {
            PomodoroError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[rstest]
    #[case::work_low(SettingsPatch { work_duration: Some(0), ..Default::default() }, "work_duration")]
    #[case::work_high(SettingsPatch { work_duration: Some(121), ..Default::default() }, "work_duration")]
    #[case::short_high(SettingsPatch { short_break_duration: Some(61), ..Default::default() }, "short_break_duration")]
    #[case::long_high(SettingsPatch { long_break_duration: Some(121), ..Default::default() }, "long_break_duration")]
    #[case::cycle_low(SettingsPatch { sessions_until_long_break: Some(1), ..Default::default() }, "sessions_until_long_break")]
    #[case::cycle_high(SettingsPatch { sessions_until_long_break: Some(13), ..Default::default() }, "sessions_until_long_break")]
    #[case::volume_high(SettingsPatch { volume: Some(1.5), ..Default::default() }, "volume")]
    #[case::volume_negative(SettingsPatch { volume: Some(-0.1), ..Default::default() }, "volume")]
    #[case::sound_long(SettingsPatch { work_sound: Some("x".repeat(51)), ..Default::default() }, "work_sound")]
    fn out_of_range_fields_are_named(#[case] patch: SettingsPatch, #[case] field: &str) {
        let mut values = SettingsValues::default();
        patch.apply_to(&mut values);
        assert_eq!(field_of(validate(&values).unwrap_err()), field);
    }

    #[test]
    fn nan_volume_is_rejected() {
        let values = SettingsValues {
            volume: f64::NAN,
            ..SettingsValues::default()
        };
        assert_eq!(field_of(validate(&values).unwrap_err()), "volume");
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&SettingsValues::default()).is_ok());
    }

    #[tokio::test]
    async fn first_read_creates_defaults() {
        let (_dir, db) = temp_database();
        let store = store(db);

        let settings = store.get_or_create(7).await.unwrap();
        assert_eq!(settings.work_duration, 25);
        assert_eq!(settings.short_break_duration, 5);
        assert_eq!(settings.long_break_duration, 15);
        assert_eq!(settings.sessions_until_long_break, 4);
        assert!((settings.volume - 0.7).abs() < f64::EPSILON);

        let again = store.get_or_create(7).await.unwrap();
        assert_eq!(again.id, settings.id);
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let (_dir, db) = temp_database();
        let store = store(db);

        let updated = store
            .update(
                1,
                SettingsPatch {
                    work_duration: Some(50),
                    auto_start_breaks: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.work_duration, 50);
        assert!(updated.auto_start_breaks);
        assert_eq!(updated.short_break_duration, 5);
    }

    #[tokio::test]
    async fn rejected_update_leaves_record_untouched() {
        let (_dir, db) = temp_database();
        let store = store(db);
        store.get_or_create(1).await.unwrap();

        let err = store
            .update(
                1,
                SettingsPatch {
                    work_duration: Some(45),
                    volume: Some(2.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(field_of(err), "volume");

        let current = store.get_or_create(1).await.unwrap();
        assert_eq!(current.work_duration, 25);
    }

    #[tokio::test]
    async fn reset_restores_defaults_without_removing_the_row() {
        let (_dir, db) = temp_database();
        let store = store(db);
        let original = store
            .replace(
                3,
                SettingsValues {
                    work_duration: 40,
                    enable_audio: false,
                    ..SettingsValues::default()
                },
            )
            .await
            .unwrap();

        let reset = store.reset(3).await.unwrap();
        assert_eq!(reset.id, original.id);
        assert_eq!(reset.work_duration, 25);
        assert!(reset.enable_audio);
    }

    #[tokio::test]
    async fn users_do_not_share_settings() {
        let (_dir, db) = temp_database();
        let store = store(db);
        store
            .update(
                1,
                SettingsPatch {
                    work_duration: Some(90),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(store.get_or_create(2).await.unwrap().work_duration, 25);
    }
}
