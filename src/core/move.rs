use super::types::{Position, Stone};
use std::fmt;

/// 確定した着手
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub pos: Position,
    pub stone: Stone,
}

impl Move {
    pub fn new(pos: Position, stone: Stone) -> Self {
        Move { pos, stone }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at {}", self.stone, self.pos)
    }
}
