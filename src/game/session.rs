//! Game session state machine

use crate::error::{EngineError, EngineResult};
use crate::game::board::{Board, CellIndex, Mark};
use crate::types::{ChatRef, UserId};
use chrono::{DateTime, Utc};
use derive_more::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a game, a random 128-bit value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub struct GameId(Uuid);

impl GameId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for GameId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Seat 0 plays X and always belongs to the player who started the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    #[must_use]
    pub const fn mark(self) -> Mark {
        match self {
            Self::First => Mark::X,
            Self::Second => Mark::O,
        }
    }

    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Where a game stands after a move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Waiting for the given seat to move
    AwaitingMove(Seat),
    /// The given seat completed a line
    Won(Seat),
    /// Board is full with no line
    Drawn,
}

impl GameStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::AwaitingMove(_))
    }
}

/// An in-progress game
#[derive(Debug, Clone)]
pub struct GameSession {
    pub id: GameId,
    /// `[X, O]`
    pub players: [UserId; 2],
    pub board: Board,
    pub status: GameStatus,
    /// Chat the game was started in
    pub origin: ChatRef,
    pub created_at: DateTime<Utc>,
    pub last_move_at: DateTime<Utc>,
}

impl GameSession {
    #[must_use]
    pub fn new(origin: ChatRef, initiator: UserId, opponent: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: GameId::new(),
            players: [initiator, opponent],
            board: Board::new(),
            status: GameStatus::AwaitingMove(Seat::First),
            origin,
            created_at: now,
            last_move_at: now,
        }
    }

    #[must_use]
    pub const fn player(&self, seat: Seat) -> UserId {
        self.players[seat.index()]
    }

    /// Apply a move by `actor`, returning the resulting status.
    ///
    /// # Errors
    /// - `GameNotFound` if the game already ended
    /// - `NotYourTurn` if `actor` is not the seat to move
    /// - `CellOccupied` if the cell is taken
    ///
    /// The session is unchanged on error.
    pub fn apply_move(&mut self, actor: UserId, cell: CellIndex) -> EngineResult<GameStatus> {
        let GameStatus::AwaitingMove(seat) = self.status else {
            return Err(EngineError::GameNotFound);
        };

        if self.player(seat) != actor {
            return Err(EngineError::NotYourTurn);
        }

        if !self.board.place(cell, seat.mark()) {
            return Err(EngineError::CellOccupied);
        }

        self.last_move_at = Utc::now();
        self.status = if self.board.winner().is_some() {
            GameStatus::Won(seat)
        } else if self.board.is_full() {
            GameStatus::Drawn
        } else {
            GameStatus::AwaitingMove(seat.other())
        };

        Ok(self.status)
    }

    /// True when the last move (or creation) is at or before `cutoff`
    #[must_use]
    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_move_at <= cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatId, GroupId};

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    fn cell(index: u8) -> CellIndex {
        CellIndex::new(index).unwrap()
    }

    fn session() -> GameSession {
        GameSession::new(ChatRef::group(ChatId(10), GroupId(20)), ALICE, BOB)
    }

    #[test]
    fn test_new_session() {
        let game = session();
        assert_eq!(game.status, GameStatus::AwaitingMove(Seat::First));
        assert_eq!(game.player(Seat::First), ALICE);
        assert_eq!(game.player(Seat::Second), BOB);
    }

    #[test]
    fn test_turns_alternate() {
        let mut game = session();
        assert_eq!(
            game.apply_move(ALICE, cell(0)).unwrap(),
            GameStatus::AwaitingMove(Seat::Second)
        );
        assert!(matches!(game.apply_move(ALICE, cell(1)), Err(EngineError::NotYourTurn)));
        assert_eq!(
            game.apply_move(BOB, cell(1)).unwrap(),
            GameStatus::AwaitingMove(Seat::First)
        );
    }

    #[test]
    fn test_stranger_cannot_move() {
        let mut game = session();
        assert!(matches!(game.apply_move(UserId(99), cell(0)), Err(EngineError::NotYourTurn)));
        assert_eq!(game.board, Board::new());
    }

    #[test]
    fn test_occupied_cell_leaves_state() {
        let mut game = session();
        game.apply_move(ALICE, cell(4)).unwrap();
        assert!(matches!(game.apply_move(BOB, cell(4)), Err(EngineError::CellOccupied)));
        assert_eq!(game.status, GameStatus::AwaitingMove(Seat::Second));
    }

    #[test]
    fn test_win_then_no_more_moves() {
        let mut game = session();
        game.apply_move(ALICE, cell(0)).unwrap();
        game.apply_move(BOB, cell(3)).unwrap();
        game.apply_move(ALICE, cell(1)).unwrap();
        game.apply_move(BOB, cell(4)).unwrap();
        assert_eq!(game.apply_move(ALICE, cell(2)).unwrap(), GameStatus::Won(Seat::First));
        assert!(matches!(game.apply_move(BOB, cell(5)), Err(EngineError::GameNotFound)));
    }

    #[test]
    fn test_second_seat_can_win() {
        let mut game = session();
        game.apply_move(ALICE, cell(0)).unwrap();
        game.apply_move(BOB, cell(2)).unwrap();
        game.apply_move(ALICE, cell(1)).unwrap();
        game.apply_move(BOB, cell(4)).unwrap();
        game.apply_move(ALICE, cell(8)).unwrap();
        assert_eq!(game.apply_move(BOB, cell(6)).unwrap(), GameStatus::Won(Seat::Second));
    }

    #[test]
    fn test_game_id_parse() {
        let id = GameId::new();
        let parsed: GameId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<GameId>().is_err());
    }
}
