//! Append-only event log over SQLite.
//!
//! The spine is the single source of truth: every state change is an event
//! row, sequenced per epoch, with fill deduplication enforced in the same
//! transaction scope as the insert. The caller owns the connection and the
//! transaction boundaries; the spine never opens, commits, or rolls back,
//! which lets a caller make (append event, update outbox) atomic.

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use crate::{
    event::{
        CommandAccepted,
        Event,
        FillReceived,
        OrderAcked,
        OrderCanceled,
        OrderExpired,
        OrderRejected,
        OrderSubmitFailed,
        OrderSubmitIntent,
        OrderSubmitted,
        TradeClosed,
    },
    types::EpochId,
};

const CREATE_EVENTS: &str = "CREATE TABLE IF NOT EXISTS events (
    event_seq INTEGER PRIMARY KEY AUTOINCREMENT,
    epoch_id INTEGER NOT NULL,
    timestamp TEXT NOT NULL,
    event_type TEXT NOT NULL,
    payload BLOB NOT NULL
)";

const CREATE_EVENTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS ix_events_epoch_seq ON events (epoch_id, event_seq)";

const CREATE_FILL_DEDUP: &str = "CREATE TABLE IF NOT EXISTS fill_dedup (
    epoch_id INTEGER NOT NULL,
    account_id TEXT NOT NULL,
    dedup_key TEXT NOT NULL,
    UNIQUE(epoch_id, account_id, dedup_key)
)";

const INSERT_EVENT: &str =
    "INSERT INTO events (epoch_id, timestamp, event_type, payload) VALUES (?1, ?2, ?3, ?4)";

const INSERT_DEDUP: &str =
    "INSERT OR IGNORE INTO fill_dedup (epoch_id, account_id, dedup_key) VALUES (?1, ?2, ?3)";

const SELECT_EVENTS: &str = "SELECT event_seq, event_type, payload FROM events \
     WHERE epoch_id = ?1 AND event_seq > ?2 ORDER BY event_seq ASC";

const LAST_SEQ: &str = "SELECT MAX(event_seq) FROM events WHERE epoch_id = ?1";

#[derive(Error, Debug)]
pub enum SpineError {
    #[error("storage: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
    /// The log contains (or the caller tried to append) an event type this
    /// build has no registry entry for. Replay cannot proceed past it.
    #[error("unknown event type: {0}")]
    UnknownEvent(String),
}

/// Append-only event log borrowing a caller-owned connection.
pub struct EventSpine<'c> {
    conn: &'c Connection,
}

impl<'c> EventSpine<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Create the events table, epoch index, and fill dedup table. Idempotent.
    pub fn ensure_schema(&self) -> Result<(), SpineError> {
        self.conn.execute(CREATE_EVENTS, [])?;
        self.conn.execute(CREATE_EVENTS_INDEX, [])?;
        self.conn.execute(CREATE_FILL_DEDUP, [])?;
        Ok(())
    }

    /// Serialise and append an event, returning the assigned sequence number.
    ///
    /// `FillReceived` is deduplicated by `(epoch_id, account_id, dedup_key)`:
    /// a colliding fill is dropped and `Ok(None)` returned. A collision is a
    /// normal outcome, not an error.
    pub fn append(&self, event: &Event, epoch_id: EpochId) -> Result<Option<i64>, SpineError> {
        if let Event::FillReceived(fill) = event {
            let inserted = self.conn.execute(
                INSERT_DEDUP,
                params![epoch_id, fill.account_id, fill.dedup_key()],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
        }

        let payload = encode_payload(event)?;
        let timestamp = event
            .timestamp()
            .ok_or_else(|| SpineError::UnknownEvent(event.event_type().to_string()))?;
        self.conn.execute(
            INSERT_EVENT,
            params![
                epoch_id,
                timestamp.to_rfc3339(),
                event.event_type(),
                payload
            ],
        )?;
        Ok(Some(self.conn.last_insert_rowid()))
    }

    /// Read events for an epoch strictly after `after_seq`, in strictly
    /// increasing sequence order.
    pub fn read(
        &self,
        epoch_id: EpochId,
        after_seq: i64,
    ) -> Result<Vec<(i64, Event)>, SpineError> {
        let mut stmt = self.conn.prepare(SELECT_EVENTS)?;
        let rows = stmt.query_map(params![epoch_id, after_seq], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (seq, event_type, payload) = row?;
            events.push((seq, hydrate(&event_type, &payload)?));
        }
        Ok(events)
    }

    /// Highest assigned sequence number for the epoch, or `None`.
    pub fn last_event_seq(&self, epoch_id: EpochId) -> Result<Option<i64>, SpineError> {
        let seq = self
            .conn
            .query_row(LAST_SEQ, params![epoch_id], |row| row.get::<_, Option<i64>>(0))
            .optional()?
            .flatten();
        Ok(seq)
    }
}

fn encode_payload(event: &Event) -> Result<Vec<u8>, SpineError> {
    match event {
        Event::CommandAccepted(e) => Ok(serde_json::to_vec(e)?),
        Event::OrderSubmitIntent(e) => Ok(serde_json::to_vec(e)?),
        Event::OrderSubmitted(e) => Ok(serde_json::to_vec(e)?),
        Event::OrderSubmitFailed(e) => Ok(serde_json::to_vec(e)?),
        Event::OrderAcked(e) => Ok(serde_json::to_vec(e)?),
        Event::FillReceived(e) => Ok(serde_json::to_vec(e)?),
        Event::OrderRejected(e) => Ok(serde_json::to_vec(e)?),
        Event::OrderCanceled(e) => Ok(serde_json::to_vec(e)?),
        Event::OrderExpired(e) => Ok(serde_json::to_vec(e)?),
        Event::TradeClosed(e) => Ok(serde_json::to_vec(e)?),
        Event::Unknown { event_type, .. } => {
            Err(SpineError::UnknownEvent(event_type.clone()))
        }
    }
}

fn hydrate(event_type: &str, payload: &[u8]) -> Result<Event, SpineError> {
    let event = match event_type {
        "CommandAccepted" => serde_json::from_slice::<CommandAccepted>(payload)?.into(),
        "OrderSubmitIntent" => serde_json::from_slice::<OrderSubmitIntent>(payload)?.into(),
        "OrderSubmitted" => serde_json::from_slice::<OrderSubmitted>(payload)?.into(),
        "OrderSubmitFailed" => serde_json::from_slice::<OrderSubmitFailed>(payload)?.into(),
        "OrderAcked" => serde_json::from_slice::<OrderAcked>(payload)?.into(),
        "FillReceived" => serde_json::from_slice::<FillReceived>(payload)?.into(),
        "OrderRejected" => serde_json::from_slice::<OrderRejected>(payload)?.into(),
        "OrderCanceled" => serde_json::from_slice::<OrderCanceled>(payload)?.into(),
        "OrderExpired" => serde_json::from_slice::<OrderExpired>(payload)?.into(),
        "TradeClosed" => serde_json::from_slice::<TradeClosed>(payload)?.into(),
        other => return Err(SpineError::UnknownEvent(other.to_string())),
    };
    Ok(event)
}
