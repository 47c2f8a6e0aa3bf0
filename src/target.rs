//! Resolving the subject of a command
//!
//! A command names its subject either by replying to one of their messages or
//! with a reference in the first argument. Numeric ids are taken as-is; any
//! other reference is looked up through the messenger.

use crate::messenger::Messenger;
use crate::types::{ChatRef, UserId};
use tracing::warn;

/// Why a subject could not be determined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    /// No reference and no replied-to message
    Missing,
    /// The reference matched nobody
    NotFound(String),
}

impl Unresolved {
    /// One-line message for the invoking chat
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Missing => "Tell me who: mention a user or reply to their message.",
            Self::NotFound(_) => "User not found.",
        }
    }
}

/// Outcome of subject resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(UserId),
    Unresolved(Unresolved),
}

/// A resolved subject together with the arguments that follow it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub resolution: Resolution,
    pub rest: Vec<String>,
}

/// Work out who a command is about.
///
/// With `reply_to` set, the replied-to author is the subject and every
/// argument belongs to the remainder. Otherwise the first argument is the
/// reference.
pub async fn resolve_target(
    messenger: &dyn Messenger,
    chat: &ChatRef,
    args: &[String],
    reply_to: Option<UserId>,
) -> Target {
    if let Some(user) = reply_to {
        return Target {
            resolution: Resolution::Resolved(user),
            rest: args.to_vec(),
        };
    }

    let Some((reference, rest)) = args.split_first() else {
        return Target {
            resolution: Resolution::Unresolved(Unresolved::Missing),
            rest: Vec::new(),
        };
    };

    Target {
        resolution: resolve_reference(messenger, chat, reference).await,
        rest: rest.to_vec(),
    }
}

/// Resolve a single textual reference
pub async fn resolve_reference(
    messenger: &dyn Messenger,
    chat: &ChatRef,
    reference: &str,
) -> Resolution {
    if let Some(id) = reference.parse::<u64>().ok().filter(|id| *id != 0) {
        return Resolution::Resolved(UserId(id));
    }

    let not_found = || Resolution::Unresolved(Unresolved::NotFound(reference.to_string()));

    let Some(group) = chat.group else {
        return not_found();
    };

    match messenger.resolve_identity(group, reference).await {
        Ok(Some(user)) => Resolution::Resolved(user),
        Ok(None) => not_found(),
        Err(e) => {
            warn!(
                group_id = %group,
                reference = %reference,
                error = %e,
                "Identity lookup failed"
            );
            not_found()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::{MessengerError, MockMessenger};
    use crate::types::{ChatId, GroupId};

    fn group_chat() -> ChatRef {
        ChatRef::group(ChatId(10), GroupId(20))
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_reply_takes_precedence() {
        let messenger = MockMessenger::new();
        let target =
            resolve_target(&messenger, &group_chat(), &args(&["2", "days"]), Some(UserId(7))).await;
        assert_eq!(target.resolution, Resolution::Resolved(UserId(7)));
        assert_eq!(target.rest, args(&["2", "days"]));
    }

    #[tokio::test]
    async fn test_numeric_reference_skips_lookup() {
        let messenger = MockMessenger::new();
        let target = resolve_target(&messenger, &group_chat(), &args(&["12345", "spam"]), None).await;
        assert_eq!(target.resolution, Resolution::Resolved(UserId(12345)));
        assert_eq!(target.rest, args(&["spam"]));
    }

    #[tokio::test]
    async fn test_handle_lookup() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_resolve_identity()
            .withf(|group, reference| *group == GroupId(20) && reference == "@bob")
            .times(1)
            .returning(|_, _| Ok(Some(UserId(42))));

        let target = resolve_target(&messenger, &group_chat(), &args(&["@bob"]), None).await;
        assert_eq!(target.resolution, Resolution::Resolved(UserId(42)));
        assert!(target.rest.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failures_are_not_found() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_resolve_identity()
            .returning(|_, reference| {
                if reference == "@ghost" {
                    Ok(None)
                } else {
                    Err(MessengerError::Platform("timeout".to_string()))
                }
            });

        for reference in ["@ghost", "@flaky"] {
            let resolution = resolve_reference(&messenger, &group_chat(), reference).await;
            assert_eq!(
                resolution,
                Resolution::Unresolved(Unresolved::NotFound(reference.to_string()))
            );
        }
    }

    #[tokio::test]
    async fn test_zero_is_not_an_id() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_resolve_identity()
            .times(1)
            .returning(|_, _| Ok(None));
        let resolution = resolve_reference(&messenger, &group_chat(), "0").await;
        assert!(matches!(resolution, Resolution::Unresolved(Unresolved::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_reference() {
        let messenger = MockMessenger::new();
        let target = resolve_target(&messenger, &group_chat(), &[], None).await;
        assert_eq!(target.resolution, Resolution::Unresolved(Unresolved::Missing));
    }

    #[tokio::test]
    async fn test_handle_in_private_chat_is_not_found() {
        let messenger = MockMessenger::new();
        let resolution = resolve_reference(&messenger, &ChatRef::private(ChatId(1)), "@bob").await;
        assert!(matches!(resolution, Resolution::Unresolved(Unresolved::NotFound(_))));
    }
}
