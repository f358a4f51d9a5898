//! Expression store.
//!
//! [`ExpressionStore`] owns every [`ExpressionRecord`]. Identity assignment and
//! all mutation happen under one `parking_lot::Mutex` covering the whole map;
//! records are small and short-lived so the coarse lock costs little.
//!
//! Terminal transitions are validated through
//! [`ExpressionStatus::validate_transition`], so a record can become
//! `completed` or `error` exactly once and is immutable afterwards.
//!
//! Each terminal transition bumps a `tokio::sync::watch` counter, which is how
//! [`wait_terminal`](ExpressionStore::wait_terminal) learns that something
//! finished without polling.

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::info;

use crate::error::CalcError;
use crate::types::expression::{ExpressionId, ExpressionRecord, ExpressionStatus, FailureReason};

#[derive(Debug)]
struct StoreInner {
    next_id: u64,
    records: BTreeMap<ExpressionId, ExpressionRecord>,
}

/// Thread-safe map from expression identity to its record.
///
/// # Examples
///
/// ```
/// use dcalc::{ExpressionStatus, ExpressionStore};
///
/// let store = ExpressionStore::new();
/// let id = store.create("3+4");
/// assert_eq!(store.get(id).unwrap().status, ExpressionStatus::Processing);
///
/// store.complete(id, 7.0).unwrap();
/// assert_eq!(store.get(id).unwrap().result, Some(7.0));
/// assert!(store.fail(id, dcalc::FailureReason::Timeout).is_err());
/// ```
#[derive(Debug)]
pub struct ExpressionStore {
    inner: Mutex<StoreInner>,
    finished: watch::Sender<u64>,
}

impl Default for ExpressionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionStore {
    /// Creates an empty store. The first identity handed out is 1.
    pub fn new() -> Self {
        let (finished, _) = watch::channel(0);
        Self {
            inner: Mutex::new(StoreInner {
                next_id: 1,
                records: BTreeMap::new(),
            }),
            finished,
        }
    }

    /// Inserts a new `processing` record and returns its identity.
    pub fn create(&self, expression: impl Into<String>) -> ExpressionId {
        let mut inner = self.inner.lock();
        let id = ExpressionId(inner.next_id);
        inner.next_id += 1;
        inner.records.insert(id, ExpressionRecord::new(id, expression));
        id
    }

    /// Moves `id` to `completed` with `value`.
    pub fn complete(&self, id: ExpressionId, value: f64) -> Result<ExpressionRecord, CalcError> {
        let record = self.transition(id, ExpressionStatus::Completed, |record| {
            record.result = Some(value);
        })?;
        info!(expression_id = %id, result = value, "expression completed");
        Ok(record)
    }

    /// Moves `id` to `error` with `reason`.
    pub fn fail(
        &self,
        id: ExpressionId,
        reason: FailureReason,
    ) -> Result<ExpressionRecord, CalcError> {
        let record = self.transition(id, ExpressionStatus::Error, |record| {
            record.failure = Some(reason);
        })?;
        info!(expression_id = %id, %reason, "expression failed");
        Ok(record)
    }

    fn transition<F>(
        &self,
        id: ExpressionId,
        to: ExpressionStatus,
        apply: F,
    ) -> Result<ExpressionRecord, CalcError>
    where
        F: FnOnce(&mut ExpressionRecord),
    {
        let snapshot = {
            let mut inner = self.inner.lock();
            let record = inner
                .records
                .get_mut(&id)
                .ok_or(CalcError::UnknownExpression { id })?;
            record.status.validate_transition(id, &to)?;
            record.status = to;
            record.updated_at = Utc::now();
            apply(record);
            record.clone()
        };
        self.finished.send_modify(|count| *count += 1);
        Ok(snapshot)
    }

    /// Returns a snapshot of `id`.
    pub fn get(&self, id: ExpressionId) -> Result<ExpressionRecord, CalcError> {
        self.inner
            .lock()
            .records
            .get(&id)
            .cloned()
            .ok_or(CalcError::UnknownExpression { id })
    }

    /// Returns snapshots of every record, ordered by identity.
    pub fn list(&self) -> Vec<ExpressionRecord> {
        self.inner.lock().records.values().cloned().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Returns `true` if nothing has been submitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves once `id` is terminal, returning the terminal record.
    pub async fn wait_terminal(&self, id: ExpressionId) -> Result<ExpressionRecord, CalcError> {
        let mut finished = self.finished.subscribe();
        loop {
            // Mark the current version seen before checking, so a transition
            // that lands between the check and the await still wakes us.
            finished.borrow_and_update();
            let record = self.get(id)?;
            if record.is_terminal() {
                return Ok(record);
            }
            // The sender lives as long as `self`, so this cannot fail.
            let _ = finished.changed().await;
        }
    }
}
