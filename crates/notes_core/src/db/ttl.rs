//! Store-side TTL expiry for the notes collection.
//!
//! # Responsibility
//! - Delete notes whose `expires_at` instant has been reached.
//! - Run that sweep periodically on a dedicated connection and thread.
//!
//! # Invariants
//! - Notes without `expires_at` are never touched.
//! - Expiry offset is zero: a note is due once `expires_at <= now`.
//! - A failed sweep is logged and retried on the next tick; it never stops
//!   the reaper.

use super::{now_epoch_ms, open_db, DbError, DbResult};
use log::{debug, error, info};
use rusqlite::Connection;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default sweep period of the background reaper.
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(60);

/// Deletes every note with `expires_at <= now_ms` and returns how many went.
pub fn purge_expired(conn: &Connection, now_ms: i64) -> DbResult<usize> {
    let removed = conn.execute(
        "DELETE FROM notes
         WHERE expires_at IS NOT NULL
           AND expires_at <= ?1;",
        [now_ms],
    )?;
    Ok(removed)
}

/// Background thread that periodically purges expired notes.
///
/// Owns its own connection to the database file, so it only works with
/// file-backed stores. Stops on [`Reaper::stop`] or when dropped.
pub struct Reaper {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Reaper {
    /// Opens `path` and starts sweeping every `interval`.
    ///
    /// The first sweep runs immediately. A zero `interval` is rejected with
    /// [`DbError::InvalidReaperInterval`] before the database is opened.
    pub fn spawn(path: impl AsRef<Path>, interval: Duration) -> DbResult<Self> {
        if interval.is_zero() {
            return Err(DbError::InvalidReaperInterval(interval));
        }
        let conn = open_db(path)?;
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("notes-ttl-reaper".to_string())
            .spawn(move || {
                info!(
                    "event=ttl_reaper module=db status=start interval_ms={}",
                    interval.as_millis()
                );
                loop {
                    sweep(&conn);
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("event=ttl_reaper module=db status=stopped");
            })
            .map_err(DbError::ReaperSpawn)?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Signals the reaper to stop and waits for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("event=ttl_reaper module=db status=error error_code=reaper_panicked");
            }
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sweep(conn: &Connection) {
    match purge_expired(conn, now_epoch_ms()) {
        Ok(0) => {}
        Ok(removed) => debug!("event=ttl_sweep module=db status=ok removed={removed}"),
        Err(err) => error!(
            "event=ttl_sweep module=db status=error error_code=ttl_sweep_failed error={err}"
        ),
    }
}
