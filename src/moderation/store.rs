//! Per-group moderation state
//!
//! Everything here is keyed by group (and user where it applies) and lives in
//! sharded maps. A warning append and the strict-mode reset happen under one
//! entry lock.

use crate::moderation::AutoMode;
use crate::types::{GroupId, UserId};
use dashmap::{DashMap, DashSet};
use std::sync::Arc;

pub const DEFAULT_WELCOME: &str = "Welcome {user}!";
pub const DEFAULT_LEAVING: &str = "Goodbye {user}!";

type MemberKey = (GroupId, UserId);

/// Which of a group's message templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Welcome,
    Leaving,
}

impl TemplateKind {
    #[must_use]
    pub const fn default_text(self) -> &'static str {
        match self {
            Self::Welcome => DEFAULT_WELCOME,
            Self::Leaving => DEFAULT_LEAVING,
        }
    }
}

/// What happened to a warning record after an append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningTally {
    /// Count including the new warning
    pub count: usize,
    /// The threshold was reached and the record was cleared
    pub reset: bool,
}

/// Process-wide moderation state
#[derive(Clone, Default)]
pub struct ModerationStore {
    warnings: Arc<DashMap<MemberKey, Vec<String>>>,
    roles: Arc<DashMap<MemberKey, String>>,
    modes: Arc<DashMap<GroupId, AutoMode>>,
    welcome: Arc<DashMap<GroupId, String>>,
    leaving: Arc<DashMap<GroupId, String>>,
    authorized: Arc<DashSet<GroupId>>,
}

impl ModerationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a warning.
    ///
    /// With `reset_at` set, a record whose count reaches that value is cleared
    /// before the entry lock is released, so concurrent warnings produce
    /// exactly one reset per crossing.
    pub fn add_warning(
        &self,
        group: GroupId,
        user: UserId,
        reason: String,
        reset_at: Option<usize>,
    ) -> WarningTally {
        let mut reasons = self.warnings.entry((group, user)).or_default();
        reasons.push(reason);
        let count = reasons.len();

        let reset = reset_at.is_some_and(|threshold| count >= threshold);
        if reset {
            reasons.clear();
        }
        WarningTally { count, reset }
    }

    /// Remove all warnings. Returns how many were removed.
    pub fn clear_warnings(&self, group: GroupId, user: UserId) -> usize {
        self.warnings
            .remove(&(group, user))
            .map_or(0, |(_, reasons)| reasons.len())
    }

    #[must_use]
    pub fn warning_count(&self, group: GroupId, user: UserId) -> usize {
        self.warnings.get(&(group, user)).map_or(0, |r| r.len())
    }

    #[must_use]
    pub fn warning_reasons(&self, group: GroupId, user: UserId) -> Vec<String> {
        self.warnings
            .get(&(group, user))
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn set_role(&self, group: GroupId, user: UserId, role: String) {
        self.roles.insert((group, user), role);
    }

    /// Returns the removed role, if there was one
    pub fn remove_role(&self, group: GroupId, user: UserId) -> Option<String> {
        self.roles.remove(&(group, user)).map(|(_, role)| role)
    }

    #[must_use]
    pub fn role(&self, group: GroupId, user: UserId) -> Option<String> {
        self.roles.get(&(group, user)).map(|r| r.value().clone())
    }

    #[must_use]
    pub fn mode(&self, group: GroupId) -> AutoMode {
        self.modes.get(&group).map(|m| *m).unwrap_or_default()
    }

    pub fn set_mode(&self, group: GroupId, mode: AutoMode) {
        self.modes.insert(group, mode);
    }

    pub fn reset_mode(&self, group: GroupId) {
        self.modes.remove(&group);
    }

    pub fn set_template(&self, group: GroupId, kind: TemplateKind, text: String) {
        self.templates(kind).insert(group, text);
    }

    /// Stored template, or the default
    #[must_use]
    pub fn template(&self, group: GroupId, kind: TemplateKind) -> String {
        self.templates(kind)
            .get(&group)
            .map_or_else(|| kind.default_text().to_string(), |t| t.value().clone())
    }

    fn templates(&self, kind: TemplateKind) -> &DashMap<GroupId, String> {
        match kind {
            TemplateKind::Welcome => &self.welcome,
            TemplateKind::Leaving => &self.leaving,
        }
    }

    /// Returns `false` if the group was already authorized
    pub fn authorize(&self, group: GroupId) -> bool {
        self.authorized.insert(group)
    }

    #[must_use]
    pub fn is_authorized(&self, group: GroupId) -> bool {
        self.authorized.contains(&group)
    }

    /// Forget everything about `group`
    pub fn evict_group(&self, group: GroupId) {
        self.warnings.retain(|(g, _), _| *g != group);
        self.roles.retain(|(g, _), _| *g != group);
        self.modes.remove(&group);
        self.welcome.remove(&group);
        self.leaving.remove(&group);
        self.authorized.remove(&group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: GroupId = GroupId(100);
    const USER: UserId = UserId(7);

    #[test]
    fn test_warnings_accumulate_without_reset() {
        let store = ModerationStore::new();
        for expected in 1..=4 {
            let tally = store.add_warning(GROUP, USER, format!("reason {expected}"), None);
            assert_eq!(tally, WarningTally { count: expected, reset: false });
        }
        assert_eq!(store.warning_count(GROUP, USER), 4);
        assert_eq!(store.warning_reasons(GROUP, USER)[0], "reason 1");
    }

    #[test]
    fn test_warnings_reset_at_threshold() {
        let store = ModerationStore::new();
        store.add_warning(GROUP, USER, "a".into(), Some(3));
        store.add_warning(GROUP, USER, "b".into(), Some(3));
        let tally = store.add_warning(GROUP, USER, "c".into(), Some(3));
        assert_eq!(tally, WarningTally { count: 3, reset: true });
        assert_eq!(store.warning_count(GROUP, USER), 0);
    }

    #[test]
    fn test_concurrent_warnings_reset_once_per_crossing() {
        let store = ModerationStore::new();
        let handles: Vec<_> = (0..30)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || store.add_warning(GROUP, USER, format!("w{i}"), Some(3)))
            })
            .collect();
        let resets = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|tally| tally.reset)
            .count();

        assert_eq!(resets, 10);
        assert_eq!(store.warning_count(GROUP, USER), 0);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = ModerationStore::new();
        store.add_warning(GROUP, USER, "spam".into(), None);
        assert_eq!(store.clear_warnings(GROUP, USER), 1);
        assert_eq!(store.clear_warnings(GROUP, USER), 0);
        assert_eq!(store.warning_count(GROUP, USER), 0);
    }

    #[test]
    fn test_roles_last_write_wins() {
        let store = ModerationStore::new();
        store.set_role(GROUP, USER, "helper".into());
        store.set_role(GROUP, USER, "moderator".into());
        assert_eq!(store.role(GROUP, USER).as_deref(), Some("moderator"));
        assert_eq!(store.remove_role(GROUP, USER).as_deref(), Some("moderator"));
        assert_eq!(store.remove_role(GROUP, USER), None);
    }

    #[test]
    fn test_mode_defaults_to_normal() {
        let store = ModerationStore::new();
        assert_eq!(store.mode(GROUP), AutoMode::Normal);
        store.set_mode(GROUP, AutoMode::Strict);
        assert_eq!(store.mode(GROUP), AutoMode::Strict);
        store.reset_mode(GROUP);
        assert_eq!(store.mode(GROUP), AutoMode::Normal);
    }

    #[test]
    fn test_templates_fall_back_to_defaults() {
        let store = ModerationStore::new();
        assert_eq!(store.template(GROUP, TemplateKind::Welcome), "Welcome {user}!");
        assert_eq!(store.template(GROUP, TemplateKind::Leaving), "Goodbye {user}!");
        store.set_template(GROUP, TemplateKind::Welcome, "Hi {user}".into());
        assert_eq!(store.template(GROUP, TemplateKind::Welcome), "Hi {user}");
        assert_eq!(store.template(GROUP, TemplateKind::Leaving), "Goodbye {user}!");
    }

    #[test]
    fn test_evict_group_keeps_other_groups() {
        let store = ModerationStore::new();
        let other = GroupId(200);
        for group in [GROUP, other] {
            store.add_warning(group, USER, "x".into(), None);
            store.set_role(group, USER, "r".into());
            store.set_mode(group, AutoMode::Fun);
            store.authorize(group);
        }

        store.evict_group(GROUP);

        assert_eq!(store.warning_count(GROUP, USER), 0);
        assert_eq!(store.role(GROUP, USER), None);
        assert_eq!(store.mode(GROUP), AutoMode::Normal);
        assert!(!store.is_authorized(GROUP));

        assert_eq!(store.warning_count(other, USER), 1);
        assert!(store.is_authorized(other));
    }
}
