//! Game store
//!
//! Sessions live in a sharded map. A move holds the entry lock of its game
//! for the whole read-validate-write-remove sequence, so moves on one game are
//! serialized while unrelated games proceed in parallel.

use crate::error::{EngineError, EngineResult};
use crate::game::board::CellIndex;
use crate::game::session::{GameId, GameSession};
use crate::types::{ChatId, GroupId, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Store for in-progress games
#[derive(Clone, Default)]
pub struct GameStore {
    sessions: Arc<DashMap<GameId, GameSession>>,
}

impl GameStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: GameSession) {
        self.sessions.insert(session.id, session);
    }

    /// Snapshot of a session
    #[must_use]
    pub fn get(&self, id: GameId) -> Option<GameSession> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Apply a move atomically and return the session as it stands after the
    /// move. Finished sessions are removed before the lock is released.
    ///
    /// # Errors
    /// `GameNotFound`, `NotYourTurn` or `CellOccupied`; the store is unchanged.
    pub fn apply_move(
        &self,
        id: GameId,
        actor: UserId,
        cell: CellIndex,
    ) -> EngineResult<GameSession> {
        match self.sessions.entry(id) {
            Entry::Vacant(_) => Err(EngineError::GameNotFound),
            Entry::Occupied(mut entry) => {
                let status = entry.get_mut().apply_move(actor, cell)?;
                if status.is_terminal() {
                    Ok(entry.remove())
                } else {
                    Ok(entry.get().clone())
                }
            }
        }
    }

    /// Remove sessions with no move since `cutoff`. Returns how many were removed.
    pub fn remove_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_idle_since(cutoff));
        before.saturating_sub(self.sessions.len())
    }

    /// Remove every session started in `chat`
    pub fn remove_chat(&self, chat: ChatId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.origin.id != chat);
        before.saturating_sub(self.sessions.len())
    }

    /// Remove every session started in `group`
    pub fn remove_group(&self, group: GroupId) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.origin.group != Some(group));
        before.saturating_sub(self.sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::{GameStatus, Seat};
    use crate::types::ChatRef;
    use chrono::Duration;

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn cell(index: u8) -> CellIndex {
        CellIndex::new(index).unwrap()
    }

    fn new_game(store: &GameStore, group: u64) -> GameId {
        let session = GameSession::new(ChatRef::group(ChatId(group * 10), GroupId(group)), ALICE, BOB);
        let id = session.id;
        store.insert(session);
        id
    }

    #[test]
    fn test_missing_game() {
        let store = GameStore::new();
        assert!(matches!(
            store.apply_move(GameId::new(), ALICE, cell(0)),
            Err(EngineError::GameNotFound)
        ));
    }

    #[test]
    fn test_replayed_move_is_rejected() {
        let store = GameStore::new();
        let id = new_game(&store, 1);

        store.apply_move(id, ALICE, cell(0)).unwrap();
        // Seat 1 is up now, so the replay fails on the turn check
        assert!(matches!(store.apply_move(id, ALICE, cell(0)), Err(EngineError::NotYourTurn)));
        store.apply_move(id, BOB, cell(1)).unwrap();
        // Alice's turn again: replaying her first click hits the occupied cell
        assert!(matches!(store.apply_move(id, ALICE, cell(0)), Err(EngineError::CellOccupied)));
    }

    #[test]
    fn test_win_removes_session() {
        let store = GameStore::new();
        let id = new_game(&store, 1);

        store.apply_move(id, ALICE, cell(0)).unwrap();
        store.apply_move(id, BOB, cell(3)).unwrap();
        store.apply_move(id, ALICE, cell(1)).unwrap();
        store.apply_move(id, BOB, cell(4)).unwrap();
        let finished = store.apply_move(id, ALICE, cell(2)).unwrap();

        assert_eq!(finished.status, GameStatus::Won(Seat::First));
        assert!(store.get(id).is_none());
        assert!(matches!(store.apply_move(id, BOB, cell(5)), Err(EngineError::GameNotFound)));
    }

    #[test]
    fn test_draw_removes_session() {
        let store = GameStore::new();
        let id = new_game(&store, 1);

        // X O X
        // X O O
        // O X X
        let moves = [
            (ALICE, 0),
            (BOB, 1),
            (ALICE, 2),
            (BOB, 4),
            (ALICE, 3),
            (BOB, 5),
            (ALICE, 7),
            (BOB, 6),
        ];
        for (player, index) in moves {
            let session = store.apply_move(id, player, cell(index)).unwrap();
            assert!(!session.status.is_terminal());
        }

        let finished = store.apply_move(id, ALICE, cell(8)).unwrap();
        assert_eq!(finished.status, GameStatus::Drawn);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_moves_on_same_cell() {
        for _ in 0..50 {
            let store = GameStore::new();
            let id = new_game(&store, 1);

            let handles: Vec<_> = [ALICE, BOB]
                .into_iter()
                .map(|player| {
                    let store = store.clone();
                    std::thread::spawn(move || store.apply_move(id, player, cell(4)))
                })
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

            let successes = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(successes, 1);
            assert!(results.iter().all(|r| matches!(
                r,
                Ok(_) | Err(EngineError::NotYourTurn | EngineError::CellOccupied)
            )));

            let session = store.get(id).unwrap();
            assert_eq!(session.status, GameStatus::AwaitingMove(Seat::Second));
            assert!(!session.board.is_empty_at(cell(4)));
        }
    }

    #[test]
    fn test_remove_idle() {
        let store = GameStore::new();
        let stale = new_game(&store, 1);
        let fresh = new_game(&store, 1);

        if let Some(mut session) = store.sessions.get_mut(&stale) {
            session.last_move_at = Utc::now() - Duration::hours(48);
        }

        let removed = store.remove_idle(Utc::now() - Duration::hours(24));
        assert_eq!(removed, 1);
        assert!(store.get(stale).is_none());
        assert!(store.get(fresh).is_some());
    }

    #[test]
    fn test_remove_group() {
        let store = GameStore::new();
        new_game(&store, 1);
        new_game(&store, 1);
        let other = new_game(&store, 2);

        assert_eq!(store.remove_group(GroupId(1)), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(other).is_some());
    }
}
