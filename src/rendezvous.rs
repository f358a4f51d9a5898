//! Keyed single-slot handoff of sub-results.
//!
//! [`ResultRegistry::register`] binds an expression identity to a capacity-one
//! channel and hands the receiving end to the engine as a [`ResultSlot`].
//! Workers call [`ResultRegistry::deliver`] with the identity; the engine
//! reads with [`ResultSlot::wait`] or [`ResultSlot::wait_timeout`].
//!
//! One slot serves every atomic task of its expression in turn. The engine
//! always reads before dispatching the next task, so a slot never holds more
//! than one value.

use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::error::CalcError;
use crate::types::expression::ExpressionId;

/// Registry of live result slots keyed by expression identity.
#[derive(Debug, Default)]
pub struct ResultRegistry {
    slots: DashMap<ExpressionId, mpsc::Sender<f64>>,
}

impl ResultRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh slot for `id`.
    ///
    /// Fails with [`CalcError::AlreadyRegistered`] if `id` already has one.
    pub fn register(&self, id: ExpressionId) -> Result<ResultSlot, CalcError> {
        use dashmap::mapref::entry::Entry;

        match self.slots.entry(id) {
            Entry::Occupied(_) => Err(CalcError::AlreadyRegistered { id }),
            Entry::Vacant(vacant) => {
                let (tx, rx) = mpsc::channel(1);
                vacant.insert(tx);
                Ok(ResultSlot { id, rx })
            }
        }
    }

    /// Writes `value` into the slot bound to `id`.
    ///
    /// Fails with [`CalcError::UnknownExpression`] if no slot is registered
    /// (for example a late result after a timeout) and with
    /// [`CalcError::SlotOccupied`] if the previous value has not been read.
    pub fn deliver(&self, id: ExpressionId, value: f64) -> Result<(), CalcError> {
        let tx = self
            .slots
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(CalcError::UnknownExpression { id })?;

        match tx.try_send(value) {
            Ok(()) => {
                debug!(expression_id = %id, value, "result delivered");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                warn!(expression_id = %id, value, "duplicate result rejected");
                Err(CalcError::SlotOccupied { id })
            }
            Err(TrySendError::Closed(_)) => {
                self.slots.remove(&id);
                Err(CalcError::UnknownExpression { id })
            }
        }
    }

    /// Removes the slot for `id`. Returns `true` if one existed.
    pub fn unregister(&self, id: ExpressionId) -> bool {
        self.slots.remove(&id).is_some()
    }

    /// Returns `true` if `id` has a live slot.
    pub fn contains(&self, id: ExpressionId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slots are live.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Receiving end of one expression's result slot.
///
/// Held exclusively by the engine reducing that expression, so there is never
/// more than one outstanding wait per identity.
#[derive(Debug)]
pub struct ResultSlot {
    id: ExpressionId,
    rx: mpsc::Receiver<f64>,
}

impl ResultSlot {
    /// The identity this slot is bound to.
    pub fn id(&self) -> ExpressionId {
        self.id
    }

    /// Waits until a value is delivered.
    pub async fn wait(&mut self) -> Result<f64, CalcError> {
        self.rx
            .recv()
            .await
            .ok_or(CalcError::SlotClosed { id: self.id })
    }

    /// Waits for a value for at most `timeout`; `None` waits forever.
    pub async fn wait_timeout(&mut self, timeout: Option<Duration>) -> Result<f64, CalcError> {
        let Some(limit) = timeout else {
            return self.wait().await;
        };
        match tokio::time::timeout(limit, self.wait()).await {
            Ok(result) => result,
            Err(_) => Err(CalcError::ResultTimeout {
                id: self.id,
                waited_ms: limit.as_millis() as u64,
            }),
        }
    }
}
