//! Named timer configurations a user can apply to their settings.

pub mod commands;

use std::sync::Arc;

use log::info;

use crate::{
    clock::Clock,
    db::{
        models::{Preset, PresetInput, PresetPatch, TimerSettings},
        Database,
    },
    error::{ensure_max_chars, PomodoroError, PomodoroResult},
    settings::validate_durations,
};

pub const MAX_NAME_CHARS: usize = 100;

/// Trims the name in place and checks it along with the durations.
pub fn validate(input: &mut PresetInput) -> PomodoroResult<()> {
    let trimmed = input.name.trim();
    if trimmed.is_empty() {
        return Err(PomodoroError::validation(
            "name",
            "Preset name cannot be empty.",
        ));
    }
    if trimmed.len() != input.name.len() {
        input.name = trimmed.to_string();
    }
    ensure_max_chars("name", &input.name, MAX_NAME_CHARS)?;
    validate_durations(
        input.work_duration,
        input.short_break_duration,
        input.long_break_duration,
        input.sessions_until_long_break,
    )
}

#[derive(Clone)]
pub struct PresetCatalog {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl PresetCatalog {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn create(&self, user_id: i64, mut input: PresetInput) -> PomodoroResult<Preset> {
        validate(&mut input)?;
        let preset = self
            .db
            .create_preset(user_id, input, self.clock.now())
            .await?;
        info!("Preset {} '{}' created for user {user_id}", preset.id, preset.name);
        Ok(preset)
    }

    pub async fn list(&self, user_id: i64) -> PomodoroResult<Vec<Preset>> {
        Ok(self.db.list_presets(user_id).await?)
    }

    pub async fn get(&self, user_id: i64, preset_id: i64) -> PomodoroResult<Preset> {
        self.db
            .get_preset(user_id, preset_id)
            .await?
            .ok_or_else(|| PomodoroError::not_found("Preset not found"))
    }

    pub async fn update(
        &self,
        user_id: i64,
        preset_id: i64,
        patch: PresetPatch,
    ) -> PomodoroResult<Preset> {
        self.db
            .update_preset_with(user_id, preset_id, self.clock.now(), move |input| {
                patch.apply_to(input);
                validate(input)
            })
            .await
    }

    /// Full overwrite; every field must be supplied.
    pub async fn replace(
        &self,
        user_id: i64,
        preset_id: i64,
        replacement: PresetInput,
    ) -> PomodoroResult<Preset> {
        self.db
            .update_preset_with(user_id, preset_id, self.clock.now(), move |input| {
                *input = replacement;
                validate(input)
            })
            .await
    }

    pub async fn delete(&self, user_id: i64, preset_id: i64) -> PomodoroResult<()> {
        if !self.db.delete_preset(user_id, preset_id).await? {
            return Err(PomodoroError::not_found("Preset not found"));
        }
        info!("Preset {preset_id} deleted by user {user_id}");
        Ok(())
    }

    pub async fn set_default(&self, user_id: i64, preset_id: i64) -> PomodoroResult<Preset> {
        let preset = self
            .db
            .set_default_preset(user_id, preset_id, self.clock.now())
            .await?;
        info!("Preset {preset_id} is now the default for user {user_id}");
        Ok(preset)
    }

    /// Copies durations and cycle length into settings, creating them if absent.
    pub async fn apply_to_settings(
        &self,
        user_id: i64,
        preset_id: i64,
    ) -> PomodoroResult<TimerSettings> {
        let settings = self
            .db
            .apply_preset_to_settings(user_id, preset_id, self.clock.now())
            .await?;
        info!("Preset {preset_id} applied to settings of user {user_id}");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{clock::ManualClock, db::temp_database, settings::SettingsStore};

    fn input(name: &str) -> PresetInput {
        PresetInput {
            name: name.to_string(),
            work_duration: 50,
            short_break_duration: 10,
            long_break_duration: 30,
            sessions_until_long_break: 3,
            is_default: false,
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap(),
        ))
    }

    fn field_of(err: PomodoroError) -> String {
        match err {
            PomodoroError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn names_are_trimmed_and_required() {
        let mut padded = input("  Deep work  ");
        validate(&mut padded).unwrap();
        assert_eq!(padded.name, "Deep work");

        let mut blank = input("   ");
        assert_eq!(field_of(validate(&mut blank).unwrap_err()), "name");

        let mut long = input(&"n".repeat(101));
        assert_eq!(field_of(validate(&mut long).unwrap_err()), "name");

        let mut bad_cycle = input("Cycle");
        bad_cycle.sessions_until_long_break = 1;
        assert_eq!(
            field_of(validate(&mut bad_cycle).unwrap_err()),
            "sessions_until_long_break"
        );
    }

    #[tokio::test]
    async fn names_are_unique_per_user_and_case_sensitive() {
        let (_dir, db) = temp_database();
        let catalog = PresetCatalog::new(db, clock());

        catalog.create(1, input("Focus")).await.unwrap();
        let err = catalog.create(1, input("Focus")).await.unwrap_err();
        match err {
            PomodoroError::Validation { field, message } => {
                assert_eq!(field, "name");
                assert_eq!(message, "A preset with this name already exists.");
            }
            other => panic!("unexpected error {other:?}"),
        }

        catalog.create(1, input("focus")).await.unwrap();
        catalog.create(2, input("Focus")).await.unwrap();
        let names: Vec<String> = catalog
            .list(1)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Focus", "focus"]);
    }

    #[tokio::test]
    async fn set_default_leaves_exactly_one() {
        let (_dir, db) = temp_database();
        let catalog = PresetCatalog::new(db, clock());

        let mut first = input("A");
        first.is_default = true;
        let a = catalog.create(1, first).await.unwrap();
        let b = catalog.create(1, input("B")).await.unwrap();
        let other_user = {
            let mut theirs = input("Theirs");
            theirs.is_default = true;
            catalog.create(2, theirs).await.unwrap()
        };

        catalog.set_default(1, b.id).await.unwrap();
        let defaults: Vec<i64> = catalog
            .list(1)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.is_default)
            .map(|p| p.id)
            .collect();
        assert_eq!(defaults, vec![b.id]);
        assert!(!catalog.get(1, a.id).await.unwrap().is_default);
        assert!(catalog.get(2, other_user.id).await.unwrap().is_default);

        assert!(matches!(
            catalog.set_default(2, b.id).await.unwrap_err(),
            PomodoroError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn update_rechecks_name_and_bounds() {
        let (_dir, db) = temp_database();
        let catalog = PresetCatalog::new(db, clock());
        catalog.create(1, input("Taken")).await.unwrap();
        let preset = catalog.create(1, input("Mine")).await.unwrap();

        let err = catalog
            .update(
                1,
                preset.id,
                PresetPatch {
                    name: Some("Taken".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(field_of(err), "name");

        let renamed = catalog
            .update(
                1,
                preset.id,
                PresetPatch {
                    name: Some("Mine".into()),
                    work_duration: Some(45),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.work_duration, 45);

        let err = catalog
            .update(
                1,
                preset.id,
                PresetPatch {
                    short_break_duration: Some(61),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(field_of(err), "short_break_duration");
        assert_eq!(catalog.get(1, preset.id).await.unwrap().short_break_duration, 10);
    }

    #[tokio::test]
    async fn apply_copies_durations_into_settings() {
        let (_dir, db) = temp_database();
        let clock = clock();
        let catalog = PresetCatalog::new(db.clone(), clock.clone());
        let settings = SettingsStore::new(db, clock);

        let preset = catalog.create(1, input("Long haul")).await.unwrap();
        let applied = catalog.apply_to_settings(1, preset.id).await.unwrap();
        assert_eq!(applied.work_duration, 50);
        assert_eq!(applied.short_break_duration, 10);
        assert_eq!(applied.long_break_duration, 30);
        assert_eq!(applied.sessions_until_long_break, 3);
        assert_eq!(applied.work_sound, "bell");

        assert_eq!(settings.get_or_create(1).await.unwrap(), applied);
        assert!(matches!(
            catalog.apply_to_settings(2, preset.id).await.unwrap_err(),
            PomodoroError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_is_scoped_to_the_owner() {
        let (_dir, db) = temp_database();
        let catalog = PresetCatalog::new(db, clock());
        let preset = catalog.create(1, input("Short")).await.unwrap();

        assert!(matches!(
            catalog.delete(2, preset.id).await.unwrap_err(),
            PomodoroError::NotFound(_)
        ));
        catalog.delete(1, preset.id).await.unwrap();
        assert!(matches!(
            catalog.get(1, preset.id).await.unwrap_err(),
            PomodoroError::NotFound(_)
        ));
    }
}
