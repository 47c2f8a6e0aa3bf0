//! Sanction ledger
//!
//! Keeps a record of every ban and mute the bot issues, with a small
//! lifecycle so timed bans can be lifted when they fall due. Discord bans
//! never expire on their own, so the maintenance task relies on this.

use crate::types::{GroupId, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use derive_more::Display;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid state transition")]
    InvalidStateTransition,

    #[error("Sanction not found: {0}")]
    NotFound(Uuid),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SanctionKind {
    Ban,
    Mute,
}

/// Lifecycle of a sanction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum SanctionState {
    /// In force
    #[default]
    Active,
    /// Reversed early by a moderator
    Lifted,
    /// Ran out and was reversed by the bot
    Expired,
}

#[derive(Debug, Clone)]
pub struct SanctionRecord {
    pub id: Uuid,
    pub group: GroupId,
    pub subject: UserId,
    pub kind: SanctionKind,
    pub issued_at: DateTime<Utc>,
    /// `None` for permanent sanctions
    pub expires_at: Option<DateTime<Utc>>,
    pub state: SanctionState,
}

impl SanctionRecord {
    #[must_use]
    pub fn new(
        group: GroupId,
        subject: UserId,
        kind: SanctionKind,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group,
            subject,
            kind,
            issued_at: Utc::now(),
            expires_at,
            state: SanctionState::Active,
        }
    }

    /// Active -> Lifted
    ///
    /// # Errors
    /// Returns an error unless the record is active
    pub fn lift(&mut self) -> LedgerResult<()> {
        self.settle(SanctionState::Lifted)
    }

    /// Active -> Expired
    ///
    /// # Errors
    /// Returns an error unless the record is active
    pub fn expire(&mut self) -> LedgerResult<()> {
        self.settle(SanctionState::Expired)
    }

    fn settle(&mut self, to: SanctionState) -> LedgerResult<()> {
        if self.state != SanctionState::Active {
            return Err(LedgerError::InvalidStateTransition);
        }
        self.state = to;

        info!(
            sanction_id = %self.id,
            user_id = %self.subject,
            guild_id = %self.group,
            kind = %self.kind,
            state = %self.state,
            "Sanction settled"
        );
        Ok(())
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == SanctionState::Active && self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Store of sanction records
#[derive(Clone, Default)]
pub struct SanctionLedger {
    records: Arc<DashMap<Uuid, SanctionRecord>>,
}

impl SanctionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, record: SanctionRecord) -> Uuid {
        let id = record.id;
        self.records.insert(id, record);
        id
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<SanctionRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Lift every active sanction of `kind` on `subject`. Returns how many.
    pub fn lift_active(&self, group: GroupId, subject: UserId, kind: SanctionKind) -> usize {
        self.records
            .iter_mut()
            .filter(|r| r.group == group && r.subject == subject && r.kind == kind)
            .filter_map(|mut r| r.lift().ok())
            .count()
    }

    /// Snapshot of active sanctions whose expiry is at or before `now`
    #[must_use]
    pub fn due_for_expiry(&self, now: DateTime<Utc>) -> Vec<SanctionRecord> {
        self.records
            .iter()
            .filter(|r| r.is_due(now))
            .map(|r| r.value().clone())
            .collect()
    }

    /// Mark a sanction expired
    ///
    /// # Errors
    /// `NotFound`, or `InvalidStateTransition` if it was already settled
    pub fn expire(&self, id: Uuid) -> LedgerResult<SanctionRecord> {
        let mut record = self.records.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        record.expire()?;
        Ok(record.clone())
    }

    /// Drop settled records. Returns how many were dropped.
    pub fn prune_settled(&self) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| r.state == SanctionState::Active);
        before.saturating_sub(self.records.len())
    }

    pub fn evict_group(&self, group: GroupId) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| r.group != group);
        before.saturating_sub(self.records.len())
    }
}
