//! In-memory record store with optimistic concurrency control.
//!
//! No lock is held between a load and the matching write. Instead every
//! write runs one critical section that:
//! 1. re-reads the persisted snapshot,
//! 2. recomputes its fingerprint and compares it with the caller's token,
//! 3. applies the write and stores the new fingerprint, only on a match.
//!
//! No other writer can interleave between the compare and the apply. A lost
//! race costs the loser a [`WriteOutcome::Conflict`], never a stall.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::fingerprint::{Comparison, Fingerprint, FingerprintEngine};
use crate::schema::RecordSchema;
use crate::snapshot::{RecordKey, RecordSnapshot};
use crate::source::{self, LoadedRecord, RecordSource};
use crate::token::ConcurrencyToken;

/// Details of a rejected write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictReport {
    /// Record type.
    pub record_type: String,
    /// Key of the contested record.
    pub key: RecordKey,
    /// Fingerprint the writer loaded.
    pub expected: Fingerprint,
    /// Fingerprint found in storage, or `None` if the record was deleted.
    pub actual: Option<Fingerprint>,
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.actual {
            Some(_) => write!(
                f,
                "{} {} was modified by another process; reload and retry",
                self.record_type, self.key
            ),
            None => write!(
                f,
                "{} {} was deleted by another process",
                self.record_type, self.key
            ),
        }
    }
}

/// Result of a guarded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The update was applied; carry this token into the next write.
    Updated(ConcurrencyToken),
    /// The delete was applied.
    Deleted,
    /// The record changed since it was loaded; nothing was written.
    Conflict(ConflictReport),
}

impl WriteOutcome {
    /// Returns true if the write was applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        !self.is_conflict()
    }

    /// Returns true if the write was rejected.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, WriteOutcome::Conflict(_))
    }

    /// The fresh token after an update.
    pub fn token(&self) -> Option<&ConcurrencyToken> {
        match self {
            WriteOutcome::Updated(token) => Some(token),
            _ => None,
        }
    }
}

struct StoredRow {
    snapshot: RecordSnapshot,
    fingerprint: Fingerprint,
}

/// Rows of one record type, guarded by fingerprint tokens.
pub struct RecordStore {
    schema: RecordSchema,
    engine: FingerprintEngine,
    max_write_attempts: u32,
    rows: Mutex<HashMap<RecordKey, StoredRow>>,
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new(schema: RecordSchema, config: Config) -> Self {
        Self {
            engine: FingerprintEngine::with_config(&config),
            max_write_attempts: config.max_write_attempts,
            schema,
            rows: Mutex::new(HashMap::new()),
        }
    }

    /// Schema of the stored rows.
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// The engine tokens are issued with.
    pub fn engine(&self) -> &FingerprintEngine {
        &self.engine
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Returns true if the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Keys of all rows, in no particular order.
    pub fn keys(&self) -> Vec<RecordKey> {
        self.rows.lock().keys().cloned().collect()
    }

    /// Inserts a new row and returns its token.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateKey`] if the key is taken, or a schema
    /// error if the snapshot does not conform.
    pub fn insert(&self, snapshot: RecordSnapshot) -> CoreResult<ConcurrencyToken> {
        let token = self.engine.issue_token(&self.schema, &snapshot)?;

        let mut rows = self.rows.lock();
        match rows.entry(token.key().clone()) {
            Entry::Occupied(_) => Err(CoreError::DuplicateKey {
                record_type: self.schema.record_type().to_string(),
                key: token.key().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(StoredRow {
                    snapshot,
                    fingerprint: *token.fingerprint(),
                });
                debug!(
                    record_type = %self.schema.record_type(),
                    key = %token.key(),
                    "row inserted"
                );
                Ok(token)
            }
        }
    }

    /// Loads a row and stamps it with a token.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RecordNotFound`] if there is no such row.
    pub fn load(&self, key: &RecordKey) -> CoreResult<LoadedRecord> {
        source::load(self, &self.engine, key)?.ok_or_else(|| CoreError::RecordNotFound {
            record_type: self.schema.record_type().to_string(),
            key: key.clone(),
        })
    }

    /// Replaces the row `token` was issued for, if it is unchanged.
    ///
    /// # Errors
    ///
    /// Errors are reserved for defects: a malformed snapshot, a token from
    /// another schema, or a snapshot whose key differs from the token's.
    /// A concurrent modification is reported as [`WriteOutcome::Conflict`].
    pub fn update(
        &self,
        token: &ConcurrencyToken,
        snapshot: RecordSnapshot,
    ) -> CoreResult<WriteOutcome> {
        let next = self.engine.issue_token(&self.schema, &snapshot)?;
        if next.key() != token.key() {
            return Err(CoreError::invalid_operation(format!(
                "update of {} {} may not change its key to {}",
                self.schema.record_type(),
                token.key(),
                next.key()
            )));
        }

        let mut rows = self.rows.lock();
        if let Some(conflict) = self.check_current(&rows, token)? {
            return Ok(WriteOutcome::Conflict(conflict));
        }
        rows.insert(
            next.key().clone(),
            StoredRow {
                snapshot,
                fingerprint: *next.fingerprint(),
            },
        );
        debug!(
            record_type = %self.schema.record_type(),
            key = %next.key(),
            fingerprint = %next.fingerprint(),
            "update applied"
        );
        Ok(WriteOutcome::Updated(next))
    }

    /// Deletes the row `token` was issued for, if it is unchanged.
    ///
    /// # Errors
    ///
    /// As for [`update`](Self::update).
    pub fn delete(&self, token: &ConcurrencyToken) -> CoreResult<WriteOutcome> {
        let mut rows = self.rows.lock();
        if let Some(conflict) = self.check_current(&rows, token)? {
            return Ok(WriteOutcome::Conflict(conflict));
        }
        rows.remove(token.key());
        debug!(
            record_type = %self.schema.record_type(),
            key = %token.key(),
            "delete applied"
        );
        Ok(WriteOutcome::Deleted)
    }

    /// Runs a read-modify-write cycle, retrying on conflict.
    ///
    /// `f` receives the freshly loaded record and returns the snapshot to
    /// write. It is called again with a reloaded record after each conflict,
    /// up to the configured number of attempts.
    ///
    /// # Errors
    ///
    /// Propagates errors from loading, from `f`, and from the write.
    pub fn modify<F>(&self, key: &RecordKey, mut f: F) -> CoreResult<WriteOutcome>
    where
        F: FnMut(&LoadedRecord) -> CoreResult<RecordSnapshot>,
    {
        let mut last_conflict = None;
        for attempt in 1..=self.max_write_attempts {
            let loaded = self.load(key)?;
            let next = f(&loaded)?;
            match self.update(loaded.token(), next)? {
                WriteOutcome::Conflict(report) => {
                    debug!(
                        record_type = %self.schema.record_type(),
                        key = %key,
                        attempt,
                        "write conflict, retrying"
                    );
                    last_conflict = Some(report);
                }
                applied => return Ok(applied),
            }
        }

        warn!(
            record_type = %self.schema.record_type(),
            key = %key,
            attempts = self.max_write_attempts,
            "giving up after repeated write conflicts"
        );
        last_conflict
            .map(WriteOutcome::Conflict)
            .ok_or_else(|| CoreError::invalid_operation("max_write_attempts is zero"))
    }

    /// Compare step of the write protocol. Must run under the row lock.
    fn check_current(
        &self,
        rows: &HashMap<RecordKey, StoredRow>,
        token: &ConcurrencyToken,
    ) -> CoreResult<Option<ConflictReport>> {
        let report = |actual| ConflictReport {
            record_type: self.schema.record_type().to_string(),
            key: token.key().clone(),
            expected: *token.fingerprint(),
            actual,
        };

        let Some(row) = rows.get(token.key()) else {
            return Ok(Some(report(None)));
        };
        match self.engine.check_token(&self.schema, token, &row.snapshot)? {
            Comparison::Match => Ok(None),
            Comparison::Conflict => Ok(Some(report(Some(row.fingerprint)))),
        }
    }
}

impl RecordSource for RecordStore {
    fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    fn fetch(&self, key: &RecordKey) -> CoreResult<Option<RecordSnapshot>> {
        Ok(self.rows.lock().get(key).map(|row| row.snapshot.clone()))
    }
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("record_type", &self.schema.record_type())
            .field("rows", &self.len())
            .finish()
    }
}
