//! Tic-tac-toe played through message buttons

mod board;
mod engine;
mod session;
mod store;

pub use board::{Board, CellIndex, Mark, WINNING_LINES};
pub use engine::GameEngine;
pub use session::{GameId, GameSession, GameStatus, Seat};
pub use store::GameStore;
