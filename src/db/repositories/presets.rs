use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{format_datetime, parse_datetime, to_u32},
        models::{Preset, PresetInput, TimerSettings},
        repositories::settings::{ensure_settings_row, load_settings, write_settings},
    },
    error::{PomodoroError, PomodoroResult},
};

const PRESET_COLUMNS: &str = "id, user_id, name, work_duration, short_break_duration,
    long_break_duration, sessions_until_long_break, is_default, created_at, updated_at";

fn row_to_preset(row: &Row) -> Result<Preset> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Preset {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        work_duration: to_u32(row.get("work_duration")?, "work_duration")?,
        short_break_duration: to_u32(row.get("short_break_duration")?, "short_break_duration")?,
        long_break_duration: to_u32(row.get("long_break_duration")?, "long_break_duration")?,
        sessions_until_long_break: to_u32(
            row.get("sessions_until_long_break")?,
            "sessions_until_long_break",
        )?,
        is_default: row.get("is_default")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn load_preset(conn: &Connection, user_id: i64, preset_id: i64) -> Result<Option<Preset>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESET_COLUMNS} FROM presets WHERE id = ?1 AND user_id = ?2"
    ))?;
    let mut rows = stmt.query(params![preset_id, user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_preset(row)?)),
        None => Ok(None),
    }
}

fn require_preset(conn: &Connection, user_id: i64, preset_id: i64) -> Result<Preset> {
    load_preset(conn, user_id, preset_id)?
        .ok_or_else(|| PomodoroError::not_found("Preset not found").into())
}

/// Names are unique per user, compared case-sensitively.
fn ensure_name_free(
    conn: &Connection,
    user_id: i64,
    name: &str,
    except_id: Option<i64>,
) -> Result<()> {
    let clash: Option<i64> = conn
        .query_row(
            "SELECT id FROM presets WHERE user_id = ?1 AND name = ?2 AND id IS NOT ?3",
            params![user_id, name, except_id],
            |row| row.get(0),
        )
        .optional()?;

    if clash.is_some() {
        return Err(
            PomodoroError::validation("name", "A preset with this name already exists.").into(),
        );
    }
    Ok(())
}

fn clear_defaults(conn: &Connection, user_id: i64, except_id: Option<i64>) -> Result<()> {
    conn.execute(
        "UPDATE presets SET is_default = 0 WHERE user_id = ?1 AND is_default = 1 AND id IS NOT ?2",
        params![user_id, except_id],
    )?;
    Ok(())
}

impl Database {
    /// Stores an already validated preset.
    pub async fn create_preset(
        &self,
        user_id: i64,
        input: PresetInput,
        now: DateTime<Utc>,
    ) -> PomodoroResult<Preset> {
        let preset = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                ensure_name_free(&tx, user_id, &input.name, None)?;
                if input.is_default {
                    clear_defaults(&tx, user_id, None)?;
                }

                let stamp = format_datetime(&now);
                tx.execute(
                    "INSERT INTO presets (user_id, name, work_duration, short_break_duration,
                                          long_break_duration, sessions_until_long_break,
                                          is_default, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                    params![
                        user_id,
                        input.name,
                        input.work_duration,
                        input.short_break_duration,
                        input.long_break_duration,
                        input.sessions_until_long_break,
                        input.is_default,
                        stamp,
                    ],
                )?;
                let preset_id = tx.last_insert_rowid();
                let preset = load_preset(&tx, user_id, preset_id)?
                    .ok_or_else(|| anyhow!("Preset not found after insert"))?;
                tx.commit()?;
                Ok(preset)
            })
            .await?;
        Ok(preset)
    }

    /// All of the user's presets, ordered by name.
    pub async fn list_presets(&self, user_id: i64) -> Result<Vec<Preset>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRESET_COLUMNS} FROM presets WHERE user_id = ?1 ORDER BY name ASC"
            ))?;
            let mut rows = stmt.query(params![user_id])?;
            let mut presets = Vec::new();
            while let Some(row) = rows.next()? {
                presets.push(row_to_preset(row)?);
            }
            Ok(presets)
        })
        .await
    }

    pub async fn get_preset(&self, user_id: i64, preset_id: i64) -> Result<Option<Preset>> {
        self.execute(move |conn| load_preset(conn, user_id, preset_id))
            .await
    }

    /// Loads the preset, lets `modify` change and validate its fields, then
    /// re-checks name uniqueness and stores the result.
    pub async fn update_preset_with<F>(
        &self,
        user_id: i64,
        preset_id: i64,
        now: DateTime<Utc>,
        modify: F,
    ) -> PomodoroResult<Preset>
    where
        F: FnOnce(&mut PresetInput) -> PomodoroResult<()> + Send + 'static,
    {
        let preset = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let current = require_preset(&tx, user_id, preset_id)?;
                let mut input = PresetInput::from(&current);
                modify(&mut input).map_err(anyhow::Error::new)?;

                ensure_name_free(&tx, user_id, &input.name, Some(preset_id))?;
                if input.is_default {
                    clear_defaults(&tx, user_id, Some(preset_id))?;
                }

                tx.execute(
                    "UPDATE presets
                     SET name = ?1,
                         work_duration = ?2,
                         short_break_duration = ?3,
                         long_break_duration = ?4,
                         sessions_until_long_break = ?5,
                         is_default = ?6,
                         updated_at = ?7
                     WHERE id = ?8 AND user_id = ?9",
                    params![
                        input.name,
                        input.work_duration,
                        input.short_break_duration,
                        input.long_break_duration,
                        input.sessions_until_long_break,
                        input.is_default,
                        format_datetime(&now),
                        preset_id,
                        user_id,
                    ],
                )?;

                let preset = require_preset(&tx, user_id, preset_id)?;
                tx.commit()?;
                Ok(preset)
            })
            .await?;
        Ok(preset)
    }

    pub async fn delete_preset(&self, user_id: i64, preset_id: i64) -> Result<bool> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM presets WHERE id = ?1 AND user_id = ?2",
                params![preset_id, user_id],
            )?;
            Ok(rows_affected > 0)
        })
        .await
    }

    /// Clears every other default of the user and marks this one, in one transaction.
    pub async fn set_default_preset(
        &self,
        user_id: i64,
        preset_id: i64,
        now: DateTime<Utc>,
    ) -> PomodoroResult<Preset> {
        let preset = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                require_preset(&tx, user_id, preset_id)?;
                clear_defaults(&tx, user_id, Some(preset_id))?;
                tx.execute(
                    "UPDATE presets SET is_default = 1, updated_at = ?1 WHERE id = ?2 AND user_id = ?3",
                    params![format_datetime(&now), preset_id, user_id],
                )?;
                let preset = require_preset(&tx, user_id, preset_id)?;
                tx.commit()?;
                Ok(preset)
            })
            .await?;
        Ok(preset)
    }

    /// Copies the preset's durations and cycle length into the user's settings.
    pub async fn apply_preset_to_settings(
        &self,
        user_id: i64,
        preset_id: i64,
        now: DateTime<Utc>,
    ) -> PomodoroResult<TimerSettings> {
        let settings = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let preset = require_preset(&tx, user_id, preset_id)?;
                ensure_settings_row(&tx, user_id, now)?;

                let mut values = load_settings(&tx, user_id)?.values();
                values.work_duration = preset.work_duration;
                values.short_break_duration = preset.short_break_duration;
                values.long_break_duration = preset.long_break_duration;
                values.sessions_until_long_break = preset.sessions_until_long_break;

                let saved = write_settings(&tx, user_id, &values, now)?;
                tx.commit()?;
                Ok(saved)
            })
            .await?;
        Ok(settings)
    }
}
