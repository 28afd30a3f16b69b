pub mod board;
pub mod r#move;
pub mod types;

pub use board::{Board, BoardError};
pub use r#move::Move;
pub use types::{Cell, PlayerId, Position, Stone, DEFAULT_BOARD_SIZE, WIN_LENGTH};
