//! Sanction engine
//!
//! Applies the warning policy and issues bans and mutes through the
//! [`Messenger`]. Callers are expected to have checked that the actor is an
//! administrator; this module only protects the group's creator.

use crate::duration::{expiry_from, parse_duration};
use crate::error::{EngineError, EngineResult};
use crate::messenger::Messenger;
use crate::moderation::ledger::{SanctionKind, SanctionLedger, SanctionRecord};
use crate::moderation::store::{ModerationStore, TemplateKind};
use crate::moderation::AutoMode;
use crate::types::{GroupId, MemberRole, UserId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Placeholder replaced with the subject's mention in message templates
pub const USER_PLACEHOLDER: &str = "{user}";

/// Warning escalation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationPolicy {
    /// Warnings that trigger a ban in strict mode
    pub warning_threshold: usize,
    /// Length of the automatic ban
    pub auto_ban: Duration,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            warning_threshold: 3,
            auto_ban: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Outcome of a warning
#[derive(Debug)]
pub struct WarnResult {
    /// Warning count including this one, before any reset
    pub count: usize,
    /// The threshold was crossed in strict mode and the record was reset
    pub escalated: bool,
    /// Set when escalation was attempted and the ban request failed
    pub escalation_failure: Option<EngineError>,
}

#[derive(Clone)]
pub struct SanctionEngine {
    store: ModerationStore,
    ledger: SanctionLedger,
    messenger: Arc<dyn Messenger>,
    policy: ModerationPolicy,
}

impl SanctionEngine {
    pub fn new(
        store: ModerationStore,
        ledger: SanctionLedger,
        messenger: Arc<dyn Messenger>,
        policy: ModerationPolicy,
    ) -> Self {
        Self {
            store,
            ledger,
            messenger,
            policy,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &ModerationStore {
        &self.store
    }

    #[must_use]
    pub const fn ledger(&self) -> &SanctionLedger {
        &self.ledger
    }

    #[must_use]
    pub const fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }

    /// Reject sanctions against the group's creator.
    ///
    /// A failed role lookup lets the sanction through; the platform will
    /// refuse it anyway if the subject is protected.
    async fn ensure_not_owner(
        &self,
        group: GroupId,
        subject: UserId,
        action: &'static str,
    ) -> EngineResult<()> {
        match self.messenger.get_role(group, subject).await {
            Ok(MemberRole::Creator) => Err(EngineError::CannotSanctionOwner { action }),
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(
                    guild_id = %group,
                    user_id = %subject,
                    error = %e,
                    "Role lookup failed, skipping owner check"
                );
                Ok(())
            }
        }
    }

    /// Record a warning and escalate if the group is in strict mode.
    ///
    /// The mode is read before the warning is appended; a concurrent mode
    /// change may be missed by one warning.
    ///
    /// # Errors
    /// `CannotSanctionOwner` when `subject` created the group. A failed
    /// escalation ban is reported in [`WarnResult::escalation_failure`].
    pub async fn warn(
        &self,
        group: GroupId,
        subject: UserId,
        reason: &str,
    ) -> EngineResult<WarnResult> {
        self.ensure_not_owner(group, subject, "warn").await?;

        let mode = self.store.mode(group);
        let reset_at = mode.escalates().then_some(self.policy.warning_threshold);
        let tally = self
            .store
            .add_warning(group, subject, reason.to_string(), reset_at);

        info!(
            guild_id = %group,
            user_id = %subject,
            count = tally.count,
            mode = %mode,
            "Warning issued"
        );

        if !tally.reset {
            return Ok(WarnResult {
                count: tally.count,
                escalated: false,
                escalation_failure: None,
            });
        }

        let until = expiry_from(Utc::now(), self.policy.auto_ban);
        let escalation_failure = match self.messenger.apply_ban(group, subject, Some(until)).await {
            Ok(()) => {
                self.ledger
                    .add(SanctionRecord::new(group, subject, SanctionKind::Ban, Some(until)));
                info!(guild_id = %group, user_id = %subject, until = %until, "Warning threshold reached, user banned");
                None
            }
            Err(e) => {
                error!(guild_id = %group, user_id = %subject, error = %e, "Escalation ban failed");
                Some(e.into())
            }
        };

        Ok(WarnResult {
            count: tally.count,
            escalated: true,
            escalation_failure,
        })
    }

    /// Idempotent
    pub fn clear_warnings(&self, group: GroupId, subject: UserId) {
        let removed = self.store.clear_warnings(group, subject);
        info!(guild_id = %group, user_id = %subject, removed, "Warnings cleared");
    }

    #[must_use]
    pub fn check_warnings(&self, group: GroupId, subject: UserId) -> usize {
        self.store.warning_count(group, subject)
    }

    /// # Errors
    /// `CannotSanctionOwner` when `subject` created the group
    pub async fn set_role(&self, group: GroupId, subject: UserId, role: &str) -> EngineResult<()> {
        self.ensure_not_owner(group, subject, "assign a role to").await?;
        self.store.set_role(group, subject, role.to_string());
        info!(guild_id = %group, user_id = %subject, role, "Role assigned");
        Ok(())
    }

    pub fn remove_role(&self, group: GroupId, subject: UserId) {
        self.store.remove_role(group, subject);
    }

    /// # Errors
    /// `InvalidMode` for anything but strict, normal or fun; the stored mode
    /// is left as it was.
    pub fn set_auto_mode(&self, group: GroupId, mode_text: &str) -> EngineResult<AutoMode> {
        let mode = mode_text.parse::<AutoMode>()?;
        self.store.set_mode(group, mode);
        info!(guild_id = %group, mode = %mode, "Auto mode changed");
        Ok(mode)
    }

    pub fn reset_auto_mode(&self, group: GroupId) {
        self.store.reset_mode(group);
    }

    pub fn set_welcome_template(&self, group: GroupId, text: &str) {
        self.store
            .set_template(group, TemplateKind::Welcome, text.to_string());
    }

    pub fn set_leaving_template(&self, group: GroupId, text: &str) {
        self.store
            .set_template(group, TemplateKind::Leaving, text.to_string());
    }

    #[must_use]
    pub fn render_welcome(&self, group: GroupId, subject: UserId) -> String {
        self.render(group, TemplateKind::Welcome, subject)
    }

    #[must_use]
    pub fn render_leaving(&self, group: GroupId, subject: UserId) -> String {
        self.render(group, TemplateKind::Leaving, subject)
    }

    fn render(&self, group: GroupId, kind: TemplateKind, subject: UserId) -> String {
        self.store
            .template(group, kind)
            .replace(USER_PLACEHOLDER, &self.messenger.mention(subject))
    }

    /// Permanent ban
    ///
    /// # Errors
    /// `CannotSanctionOwner` or `ExternalCallFailed`
    pub async fn ban(&self, group: GroupId, subject: UserId) -> EngineResult<()> {
        self.ensure_not_owner(group, subject, "ban").await?;
        self.messenger.apply_ban(group, subject, None).await?;
        self.ledger
            .add(SanctionRecord::new(group, subject, SanctionKind::Ban, None));
        info!(guild_id = %group, user_id = %subject, "User banned");
        Ok(())
    }

    /// # Errors
    /// `ExternalCallFailed`
    pub async fn unban(&self, group: GroupId, subject: UserId) -> EngineResult<()> {
        self.messenger.apply_unban(group, subject).await?;
        self.ledger.lift_active(group, subject, SanctionKind::Ban);
        info!(guild_id = %group, user_id = %subject, "User unbanned");
        Ok(())
    }

    /// Ban until the parsed duration has passed. Returns the expiry.
    ///
    /// # Errors
    /// `InvalidDuration` before anything else, then `CannotSanctionOwner` or
    /// `ExternalCallFailed`
    pub async fn temp_ban(
        &self,
        group: GroupId,
        subject: UserId,
        duration_text: &str,
    ) -> EngineResult<DateTime<Utc>> {
        let span = parse_duration(duration_text)?;
        self.ensure_not_owner(group, subject, "ban").await?;

        let until = expiry_from(Utc::now(), span);
        self.messenger.apply_ban(group, subject, Some(until)).await?;
        self.ledger
            .add(SanctionRecord::new(group, subject, SanctionKind::Ban, Some(until)));
        info!(guild_id = %group, user_id = %subject, until = %until, "User temporarily banned");
        Ok(until)
    }

    /// Forbid sending messages until the parsed duration has passed. Returns
    /// the expiry the platform applied, which is what the ledger records.
    ///
    /// # Errors
    /// `InvalidDuration` before anything else, then `CannotSanctionOwner` or
    /// `ExternalCallFailed`
    pub async fn mute(
        &self,
        group: GroupId,
        subject: UserId,
        duration_text: &str,
    ) -> EngineResult<DateTime<Utc>> {
        let span = parse_duration(duration_text)?;
        self.ensure_not_owner(group, subject, "mute").await?;

        let requested = expiry_from(Utc::now(), span);
        let until = self
            .messenger
            .apply_restriction(group, subject, false, Some(requested))
            .await?
            .unwrap_or(requested);
        if until < requested {
            warn!(guild_id = %group, user_id = %subject, requested = %requested, until = %until, "Mute shortened by the platform");
        }
        self.ledger
            .add(SanctionRecord::new(group, subject, SanctionKind::Mute, Some(until)));
        info!(guild_id = %group, user_id = %subject, until = %until, "User muted");
        Ok(until)
    }

    /// # Errors
    /// `ExternalCallFailed`
    pub async fn unmute(&self, group: GroupId, subject: UserId) -> EngineResult<()> {
        self.messenger
            .apply_restriction(group, subject, true, None)
            .await?;
        self.ledger.lift_active(group, subject, SanctionKind::Mute);
        info!(guild_id = %group, user_id = %subject, "User unmuted");
        Ok(())
    }

    /// Reverse every timed sanction that has run out. Returns how many were
    /// settled.
    ///
    /// Records are marked expired before the platform call, so a failed
    /// reversal is logged and not retried.
    pub async fn lift_due_sanctions(&self, now: DateTime<Utc>) -> usize {
        let due = self.ledger.due_for_expiry(now);
        let mut settled = 0;

        for record in due {
            if self.ledger.expire(record.id).is_err() {
                // Lifted by a moderator since the snapshot
                continue;
            }
            settled += 1;

            let result = match record.kind {
                SanctionKind::Ban => self.messenger.apply_unban(record.group, record.subject).await,
                SanctionKind::Mute => self
                    .messenger
                    .apply_restriction(record.group, record.subject, true, None)
                    .await
                    .map(|_| ()),
            };

            if let Err(e) = result {
                error!(
                    sanction_id = %record.id,
                    guild_id = %record.group,
                    user_id = %record.subject,
                    kind = %record.kind,
                    error = %e,
                    "Failed to lift expired sanction"
                );
            }
        }

        self.ledger.prune_settled();
        settled
    }

    /// Forget everything about `group`
    pub fn evict_group(&self, group: GroupId) {
        self.store.evict_group(group);
        self.ledger.evict_group(group);
        info!(guild_id = %group, "Evicted group moderation state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::{MessengerError, MockMessenger};
    use mockall::predicate::eq;

    const GROUP: GroupId = GroupId(100);
    const OWNER: UserId = UserId(1);
    const USER: UserId = UserId(7);

    /// Mock that reports `OWNER` as creator and everyone else as a member
    fn messenger() -> MockMessenger {
        let mut messenger = MockMessenger::new();
        messenger.expect_get_role().returning(|_, user| {
            Ok(if user == OWNER {
                MemberRole::Creator
            } else {
                MemberRole::Member
            })
        });
        messenger
            .expect_mention()
            .returning(|user| format!("<@{user}>"));
        messenger
    }

    fn engine(messenger: MockMessenger) -> SanctionEngine {
        SanctionEngine::new(
            ModerationStore::new(),
            SanctionLedger::new(),
            Arc::new(messenger),
            ModerationPolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_normal_mode_never_sanctions() {
        let mut messenger = messenger();
        messenger.expect_apply_ban().never();
        let engine = engine(messenger);

        for expected in 1..=5 {
            let result = engine.warn(GROUP, USER, "spam").await.unwrap();
            assert_eq!(result.count, expected);
            assert!(!result.escalated);
        }
        assert_eq!(engine.check_warnings(GROUP, USER), 5);
    }

    #[tokio::test]
    async fn test_fun_mode_never_sanctions() {
        let mut messenger = messenger();
        messenger.expect_apply_ban().never();
        let engine = engine(messenger);
        engine.set_auto_mode(GROUP, "fun").unwrap();

        for _ in 0..4 {
            assert!(!engine.warn(GROUP, USER, "spam").await.unwrap().escalated);
        }
        assert_eq!(engine.check_warnings(GROUP, USER), 4);
    }

    #[tokio::test]
    async fn test_strict_mode_bans_at_threshold_and_resets() {
        let mut messenger = messenger();
        messenger
            .expect_apply_ban()
            .withf(|group, user, until| {
                let remaining = until.map(|at| at - Utc::now());
                *group == GROUP
                    && *user == USER
                    && remaining.is_some_and(|r| r > chrono::Duration::hours(23))
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let engine = engine(messenger);
        engine.set_auto_mode(GROUP, "strict").unwrap();

        assert_eq!(engine.warn(GROUP, USER, "a").await.unwrap().count, 1);
        assert_eq!(engine.warn(GROUP, USER, "b").await.unwrap().count, 2);

        let third = engine.warn(GROUP, USER, "c").await.unwrap();
        assert_eq!(third.count, 3);
        assert!(third.escalated);
        assert!(third.escalation_failure.is_none());
        assert_eq!(engine.check_warnings(GROUP, USER), 0);
        assert_eq!(engine.ledger().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_escalation_still_resets() {
        let mut messenger = messenger();
        messenger
            .expect_apply_ban()
            .times(1)
            .returning(|_, _, _| Err(MessengerError::Platform("Missing Permissions".into())));
        let engine = engine(messenger);
        engine.set_auto_mode(GROUP, "strict").unwrap();

        engine.warn(GROUP, USER, "a").await.unwrap();
        engine.warn(GROUP, USER, "b").await.unwrap();
        let third = engine.warn(GROUP, USER, "c").await.unwrap();

        assert!(third.escalated);
        assert!(matches!(third.escalation_failure, Some(EngineError::ExternalCallFailed(_))));
        assert_eq!(engine.check_warnings(GROUP, USER), 0);
        assert!(engine.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_owner_is_protected() {
        let mut messenger = messenger();
        messenger.expect_apply_ban().never();
        messenger.expect_apply_restriction().never();
        let engine = engine(messenger);

        assert!(matches!(
            engine.ban(GROUP, OWNER).await,
            Err(EngineError::CannotSanctionOwner { action: "ban" })
        ));
        assert!(matches!(
            engine.temp_ban(GROUP, OWNER, "1 day").await,
            Err(EngineError::CannotSanctionOwner { action: "ban" })
        ));
        assert!(matches!(
            engine.mute(GROUP, OWNER, "10 minutes").await,
            Err(EngineError::CannotSanctionOwner { action: "mute" })
        ));
        assert!(matches!(
            engine.warn(GROUP, OWNER, "rude").await,
            Err(EngineError::CannotSanctionOwner { action: "warn" })
        ));
        assert_eq!(engine.check_warnings(GROUP, OWNER), 0);
    }

    #[tokio::test]
    async fn test_owner_cannot_get_a_role() {
        let engine = engine(messenger());

        let error = engine.set_role(GROUP, OWNER, "clown").await.unwrap_err();
        assert_eq!(error.to_string(), "This user is the owner, I cannot assign a role to this user!");
        assert_eq!(engine.store().role(GROUP, OWNER), None);

        engine.set_role(GROUP, USER, "helper").await.unwrap();
        assert_eq!(engine.store().role(GROUP, USER).as_deref(), Some("helper"));
    }

    #[tokio::test]
    async fn test_mute_records_the_applied_expiry() {
        let applied = Utc::now() + chrono::Duration::days(28);
        let mut messenger = messenger();
        messenger
            .expect_apply_restriction()
            .withf(|_, _, can_send, until| !*can_send && until.is_some())
            .times(1)
            .returning(move |_, _, _, _| Ok(Some(applied)));
        let engine = engine(messenger);

        let until = engine.mute(GROUP, USER, "2 months").await.unwrap();
        assert_eq!(until, applied);
        assert!(engine.ledger().due_for_expiry(applied - chrono::Duration::seconds(1)).is_empty());
        assert_eq!(engine.ledger().due_for_expiry(applied).len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_duration_before_any_call() {
        let mut messenger = MockMessenger::new();
        messenger.expect_get_role().never();
        messenger.expect_apply_ban().never();
        messenger.expect_apply_restriction().never();
        let engine = engine(messenger);

        assert!(matches!(
            engine.temp_ban(GROUP, USER, "forever").await,
            Err(EngineError::InvalidDuration(_))
        ));
        assert!(matches!(
            engine.mute(GROUP, USER, "0 days").await,
            Err(EngineError::InvalidDuration(_))
        ));
    }

    #[tokio::test]
    async fn test_role_lookup_failure_does_not_block() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_get_role()
            .returning(|_, _| Err(MessengerError::Platform("unavailable".into())));
        messenger
            .expect_apply_ban()
            .with(eq(GROUP), eq(USER), eq(None::<DateTime<Utc>>))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let engine = engine(messenger);

        engine.ban(GROUP, USER).await.unwrap();
    }

    #[tokio::test]
    async fn test_mute_and_unmute_track_ledger() {
        let mut messenger = messenger();
        messenger
            .expect_apply_restriction()
            .withf(|_, _, can_send, until| !*can_send && until.is_some())
            .times(1)
            .returning(|_, _, _, until| Ok(until));
        messenger
            .expect_apply_restriction()
            .withf(|_, _, can_send, until| *can_send && until.is_none())
            .times(1)
            .returning(|_, _, _, _| Ok(None));
        let engine = engine(messenger);

        let until = engine.mute(GROUP, USER, "10 minutes").await.unwrap();
        assert!(until > Utc::now());
        assert_eq!(engine.ledger().due_for_expiry(until).len(), 1);

        engine.unmute(GROUP, USER).await.unwrap();
        assert!(engine.ledger().due_for_expiry(until).is_empty());
    }

    #[tokio::test]
    async fn test_external_failure_is_reported() {
        let mut messenger = messenger();
        messenger
            .expect_apply_unban()
            .returning(|_, _| Err(MessengerError::Platform("Unknown Ban".into())));
        let engine = engine(messenger);

        let error = engine.unban(GROUP, USER).await.unwrap_err();
        assert_eq!(error.to_string(), "Unknown Ban");
    }

    #[tokio::test]
    async fn test_lift_due_sanctions() {
        let mut messenger = messenger();
        messenger
            .expect_apply_ban()
            .times(1)
            .returning(|_, _, _| Ok(()));
        messenger
            .expect_apply_unban()
            .with(eq(GROUP), eq(USER))
            .times(1)
            .returning(|_, _| Ok(()));
        let engine = engine(messenger);

        let until = engine.temp_ban(GROUP, USER, "2 hours").await.unwrap();

        assert_eq!(engine.lift_due_sanctions(Utc::now()).await, 0);
        assert_eq!(engine.lift_due_sanctions(until).await, 1);
        assert!(engine.ledger().is_empty());
        assert_eq!(engine.lift_due_sanctions(until).await, 0);
    }

    #[tokio::test]
    async fn test_lifted_ban_is_not_reversed_again() {
        let mut messenger = messenger();
        messenger.expect_apply_ban().returning(|_, _, _| Ok(()));
        messenger
            .expect_apply_unban()
            .times(1)
            .returning(|_, _| Ok(()));
        let engine = engine(messenger);

        let until = engine.temp_ban(GROUP, USER, "1 day").await.unwrap();
        engine.unban(GROUP, USER).await.unwrap();

        assert!(engine.ledger().due_for_expiry(until).is_empty());
        assert_eq!(engine.lift_due_sanctions(until).await, 0);
    }

    #[tokio::test]
    async fn test_invalid_mode_leaves_state() {
        let engine = engine(messenger());
        engine.set_auto_mode(GROUP, "strict").unwrap();

        assert!(matches!(
            engine.set_auto_mode(GROUP, "chaos"),
            Err(EngineError::InvalidMode(_))
        ));
        assert_eq!(engine.store().mode(GROUP), AutoMode::Strict);

        engine.reset_auto_mode(GROUP);
        assert_eq!(engine.store().mode(GROUP), AutoMode::Normal);
    }

    #[tokio::test]
    async fn test_templates_render_mentions() {
        let engine = engine(messenger());
        assert_eq!(engine.render_welcome(GROUP, USER), "Welcome <@7>!");

        engine.set_leaving_template(GROUP, "{user} left, bye {user}");
        assert_eq!(engine.render_leaving(GROUP, USER), "<@7> left, bye <@7>");
    }

    #[tokio::test]
    async fn test_evict_group() {
        let mut messenger = messenger();
        messenger.expect_apply_ban().returning(|_, _, _| Ok(()));
        let engine = engine(messenger);

        engine.warn(GROUP, USER, "spam").await.unwrap();
        engine.set_role(GROUP, USER, "helper").await.unwrap();
        engine.ban(GROUP, USER).await.unwrap();

        engine.evict_group(GROUP);
        assert_eq!(engine.check_warnings(GROUP, USER), 0);
        assert_eq!(engine.store().role(GROUP, USER), None);
        assert!(engine.ledger().is_empty());
    }
}
