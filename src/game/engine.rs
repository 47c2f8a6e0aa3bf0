//! Tic-tac-toe engine
//!
//! Starts games, applies moves coming in from button presses and renders the
//! board as message text plus a 3×3 keyboard.

use crate::action::{Button, Keyboard};
use crate::callback::CallbackPayload;
use crate::error::{EngineError, EngineResult};
use crate::game::board::{Board, CellIndex};
use crate::game::session::{GameId, GameSession, GameStatus};
use crate::game::store::GameStore;
use crate::messenger::Messenger;
use crate::target::{Resolution, resolve_target};
use crate::types::{ChatId, ChatRef, GroupId, UserId};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs games on top of a [`GameStore`]
#[derive(Clone)]
pub struct GameEngine {
    store: GameStore,
    messenger: Arc<dyn Messenger>,
}

impl GameEngine {
    pub fn new(store: GameStore, messenger: Arc<dyn Messenger>) -> Self {
        Self { store, messenger }
    }

    #[must_use]
    pub const fn store(&self) -> &GameStore {
        &self.store
    }

    /// Start a game between `initiator` (X) and the referenced opponent (O).
    ///
    /// There is no guard against playing yourself or starting several games
    /// against the same opponent.
    ///
    /// # Errors
    /// `OpponentNotFound` if the opponent reference does not resolve.
    pub async fn start(
        &self,
        chat: ChatRef,
        initiator: UserId,
        args: &[String],
        reply_to: Option<UserId>,
    ) -> EngineResult<GameSession> {
        let target = resolve_target(self.messenger.as_ref(), &chat, args, reply_to).await;
        let Resolution::Resolved(opponent) = target.resolution else {
            return Err(EngineError::OpponentNotFound);
        };

        let session = GameSession::new(chat, initiator, opponent);
        info!(
            game_id = %session.id,
            chat_id = %chat.id,
            player_x = %initiator,
            player_o = %opponent,
            "Game started"
        );
        self.store.insert(session.clone());
        Ok(session)
    }

    /// Apply a move and return the session after it. Finished games are
    /// already gone from the store when this returns.
    ///
    /// # Errors
    /// `GameNotFound`, `NotYourTurn` or `CellOccupied`
    pub fn apply_move(
        &self,
        game: GameId,
        actor: UserId,
        cell: CellIndex,
    ) -> EngineResult<GameSession> {
        let session = self.store.apply_move(game, actor, cell)?;
        debug!(game_id = %game, user_id = %actor, cell = %cell, status = ?session.status, "Move applied");
        if session.status.is_terminal() {
            info!(game_id = %game, status = ?session.status, "Game finished");
        }
        Ok(session)
    }

    /// Drop games with no move for longer than `ttl`
    pub fn sweep_expired(&self, ttl: chrono::Duration) -> usize {
        let cutoff = Utc::now()
            .checked_sub_signed(ttl)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        let removed = self.store.remove_idle(cutoff);
        if removed > 0 {
            info!(removed, "Swept idle games");
        }
        removed
    }

    /// Drop every game started in `chat`
    pub fn evict_chat(&self, chat: ChatId) -> usize {
        self.store.remove_chat(chat)
    }

    /// Drop every game started anywhere in `group`
    pub fn evict_group(&self, group: GroupId) -> usize {
        self.store.remove_group(group)
    }

    /// Message text describing the game in its current state
    #[must_use]
    pub fn describe(&self, session: &GameSession) -> String {
        let mention = |user| self.messenger.mention(user);
        match session.status {
            GameStatus::AwaitingMove(seat) if session.board == Board::new() => format!(
                "🎮 Tic-Tac-Toe: {} vs {}\nTurn: {} ({})",
                mention(session.players[0]),
                mention(session.players[1]),
                mention(session.player(seat)),
                seat.mark()
            ),
            GameStatus::AwaitingMove(seat) => format!(
                "🎮 Tic-Tac-Toe\nTurn: {} ({})",
                mention(session.player(seat)),
                seat.mark()
            ),
            GameStatus::Won(seat) => format!(
                "🎉 {} wins!\n\n{}",
                mention(session.player(seat)),
                session.board.render_text()
            ),
            GameStatus::Drawn => format!("🤝 It's a draw!\n\n{}", session.board.render_text()),
        }
    }

    /// 3×3 grid of move buttons, `None` once the game is over
    #[must_use]
    pub fn keyboard(session: &GameSession) -> Option<Keyboard> {
        if session.status.is_terminal() {
            return None;
        }

        let buttons: Vec<Button> = CellIndex::all()
            .map(|cell| {
                Button::new(
                    session.board.label(cell),
                    CallbackPayload::Move {
                        game: session.id,
                        cell,
                    },
                )
            })
            .collect();

        Some(Keyboard::new(
            buttons.chunks(3).map(<[Button]>::to_vec).collect(),
        ))
    }
}
