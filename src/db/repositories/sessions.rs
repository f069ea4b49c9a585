use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, to_i64, to_u64, to_u8},
};
use crate::models::Session;

const SESSION_COLUMNS: &str =
    "id, location, network, start_time, end_time, duration_secs, productivity";

fn row_to_session(row: &Row) -> Result<Session> {
    let start_time: String = row.get("start_time")?;
    let end_time: String = row.get("end_time")?;
    let duration_secs: i64 = row.get("duration_secs")?;
    let productivity: i64 = row.get("productivity")?;

    Ok(Session {
        id: row.get("id")?,
        location: row.get("location")?,
        network: row.get("network")?,
        start_time: parse_datetime(&start_time, "start_time")?,
        end_time: parse_datetime(&end_time, "end_time")?,
        duration_secs: to_u64(duration_secs, "duration_secs")?,
        productivity: to_u8(productivity, "productivity")?,
    })
}

impl Database {
    /// Append a finished session. Sessions are never updated afterwards.
    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, location, network, start_time, end_time, duration_secs, productivity, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.location,
                    record.network,
                    format_datetime(&record.start_time),
                    format_datetime(&record.end_time),
                    to_i64(record.duration_secs)?,
                    record.productivity,
                    format_datetime(&Utc::now()),
                ],
            )
            .context("failed to insert session")?;
            Ok(())
        })
        .await
    }

    /// Sessions that started after `cutoff`, most recent first.
    pub async fn list_sessions_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Session>> {
        let cutoff = format_datetime(&cutoff);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM sessions
                 WHERE start_time > ?1
                 ORDER BY start_time DESC"
            ))?;

            let mut rows = stmt.query(params![cutoff])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
    }
}
