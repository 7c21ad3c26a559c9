use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{format_datetime, parse_datetime, to_u32},
        models::{SettingsValues, TimerSettings},
    },
    error::PomodoroResult,
};

fn row_to_settings(row: &Row) -> Result<TimerSettings> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(TimerSettings {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        work_duration: to_u32(row.get("work_duration")?, "work_duration")?,
        short_break_duration: to_u32(row.get("short_break_duration")?, "short_break_duration")?,
        long_break_duration: to_u32(row.get("long_break_duration")?, "long_break_duration")?,
        sessions_until_long_break: to_u32(
            row.get("sessions_until_long_break")?,
            "sessions_until_long_break",
        )?,
        auto_start_breaks: row.get("auto_start_breaks")?,
        auto_start_work: row.get("auto_start_work")?,
        enable_audio: row.get("enable_audio")?,
        work_sound: row.get("work_sound")?,
        break_sound: row.get("break_sound")?,
        volume: row.get("volume")?,
        enable_notifications: row.get("enable_notifications")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

pub(crate) fn load_settings(conn: &Connection, user_id: i64) -> Result<TimerSettings> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, work_duration, short_break_duration, long_break_duration,
                sessions_until_long_break, auto_start_breaks, auto_start_work, enable_audio,
                work_sound, break_sound, volume, enable_notifications, created_at, updated_at
         FROM timer_settings
         WHERE user_id = ?1",
    )?;
    let mut rows = stmt.query(params![user_id])?;
    match rows.next()? {
        Some(row) => row_to_settings(row),
        None => Err(anyhow!("Settings for user {user_id} not found")),
    }
}

/// Inserts the default row if the user has none yet; never touches an existing row.
pub(crate) fn ensure_settings_row(
    conn: &Connection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    let defaults = SettingsValues::default();
    let stamp = format_datetime(&now);
    conn.execute(
        "INSERT OR IGNORE INTO timer_settings (
             user_id, work_duration, short_break_duration, long_break_duration,
             sessions_until_long_break, auto_start_breaks, auto_start_work, enable_audio,
             work_sound, break_sound, volume, enable_notifications, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
        params![
            user_id,
            defaults.work_duration,
            defaults.short_break_duration,
            defaults.long_break_duration,
            defaults.sessions_until_long_break,
            defaults.auto_start_breaks,
            defaults.auto_start_work,
            defaults.enable_audio,
            defaults.work_sound,
            defaults.break_sound,
            defaults.volume,
            defaults.enable_notifications,
            stamp,
        ],
    )?;
    Ok(())
}

/// Overwrites every editable column of the user's row, creating it first if needed.
pub(crate) fn write_settings(
    conn: &Connection,
    user_id: i64,
    values: &SettingsValues,
    now: DateTime<Utc>,
) -> Result<TimerSettings> {
    ensure_settings_row(conn, user_id, now)?;
    conn.execute(
        "UPDATE timer_settings
         SET work_duration = ?1,
             short_break_duration = ?2,
             long_break_duration = ?3,
             sessions_until_long_break = ?4,
             auto_start_breaks = ?5,
             auto_start_work = ?6,
             enable_audio = ?7,
             work_sound = ?8,
             break_sound = ?9,
             volume = ?10,
             enable_notifications = ?11,
             updated_at = ?12
         WHERE user_id = ?13",
        params![
            values.work_duration,
            values.short_break_duration,
            values.long_break_duration,
            values.sessions_until_long_break,
            values.auto_start_breaks,
            values.auto_start_work,
            values.enable_audio,
            values.work_sound,
            values.break_sound,
            values.volume,
            values.enable_notifications,
            format_datetime(&now),
            user_id,
        ],
    )?;
    load_settings(conn, user_id)
}

impl Database {
    pub async fn get_or_create_settings(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<TimerSettings> {
        self.execute(move |conn| {
            ensure_settings_row(conn, user_id, now)?;
            load_settings(conn, user_id)
        })
        .await
    }

    pub async fn save_settings(
        &self,
        user_id: i64,
        values: SettingsValues,
        now: DateTime<Utc>,
    ) -> Result<TimerSettings> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let saved = write_settings(&tx, user_id, &values, now)?;
            tx.commit()?;
            Ok(saved)
        })
        .await
    }

    /// Loads the user's values (creating the row if needed), lets `modify` change
    /// and validate them, then writes them back in the same transaction.
    pub async fn modify_settings<F>(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        modify: F,
    ) -> PomodoroResult<TimerSettings>
    where
        F: FnOnce(&mut SettingsValues) -> PomodoroResult<()> + Send + 'static,
    {
        let saved = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                ensure_settings_row(&tx, user_id, now)?;
                let mut values = load_settings(&tx, user_id)?.values();
                modify(&mut values).map_err(anyhow::Error::new)?;
                let saved = write_settings(&tx, user_id, &values, now)?;
                tx.commit()?;
                Ok(saved)
            })
            .await?;
        Ok(saved)
    }
}
