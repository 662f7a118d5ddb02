//! The audit recorder.
//!
//! Must only be called after the guarded mutation has been durably applied.
//! A record for an action that did not happen is as wrong as a missing one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::record::{AuditRecord, AuditRecordId, AuditRecordInput};
use crate::traits::AuditStore;

/// What an audit write failure means for the request that triggered it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditPolicy {
    /// Log the failure and report success to the caller. The mutation
    /// stays applied and the request succeeds.
    #[default]
    BestEffort,

    /// Surface the failure to the caller. The mutation still stays applied
    /// (there is no rollback); the caller learns the trail is incomplete.
    Required,
}

/// Seals inputs into records and appends them to a store.
///
/// Holds no mutable state of its own, so one recorder can serve any number
/// of concurrent requests.
pub struct AuditRecorder<S: AuditStore> {
    store: Arc<S>,
    policy: AuditPolicy,
}

impl<S: AuditStore> Clone for AuditRecorder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
        }
    }
}

impl<S: AuditStore> AuditRecorder<S> {
    /// Create a best-effort recorder.
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Create a recorder over a shared store.
    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            store,
            policy: AuditPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AuditPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> AuditPolicy {
        self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Seal and append one record.
    pub async fn record(&self, input: AuditRecordInput) -> Result<AuditRecordId> {
        let record = AuditRecord::seal(input, now_millis())?;
        self.store.append(&record).await?;

        tracing::debug!(
            id = %record.id(),
            action = %record.action(),
            resource_type = record.resource_type(),
            resource_id = record.resource_id(),
            "audit record written"
        );
        Ok(record.id())
    }

    /// Record, logging instead of returning any failure.
    pub async fn record_best_effort(&self, input: AuditRecordInput) -> Option<AuditRecordId> {
        let action = input.action.clone();
        let resource_type = input.resource_type.clone();
        let resource_id = input.resource_id.clone();

        match self.record(input).await {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(
                    action = %action,
                    resource_type = %resource_type,
                    resource_id = resource_id.as_deref(),
                    error = %e,
                    "failed to write audit record"
                );
                None
            }
        }
    }

    /// Record under this recorder's policy.
    ///
    /// With [`AuditPolicy::BestEffort`] this never fails and yields `None`
    /// when the write was lost. With [`AuditPolicy::Required`] the write
    /// error is returned.
    pub async fn commit(&self, input: AuditRecordInput) -> Result<Option<AuditRecordId>> {
        match self.policy {
            AuditPolicy::BestEffort => Ok(self.record_best_effort(input).await),
            AuditPolicy::Required => self.record(input).await.map(Some),
        }
    }
}

impl<S: AuditStore + 'static> AuditRecorder<S> {
    /// Record in the background without delaying the response.
    ///
    /// Always best-effort regardless of policy: nobody is left to receive
    /// the error.
    pub fn spawn(&self, input: AuditRecordInput) -> JoinHandle<Option<AuditRecordId>> {
        let recorder = self.clone();
        tokio::spawn(async move { recorder.record_best_effort(input).await })
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
