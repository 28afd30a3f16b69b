use std::fmt;

/// 19路盤 (ネットワーク対戦の標準)
pub const DEFAULT_BOARD_SIZE: usize = 19;

/// 五目並べの勝利に必要な連の長さ
pub const WIN_LENGTH: usize = 5;

/// プレイヤーID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayerId {
    #[default]
    Player1, // 先手 (X)
    Player2, // 後手 (O)
}

impl PlayerId {
    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::Player1 => PlayerId::Player2,
            PlayerId::Player2 => PlayerId::Player1,
        }
    }

    pub fn stone(self) -> Stone {
        match self {
            PlayerId::Player1 => Stone::X,
            PlayerId::Player2 => Stone::O,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            PlayerId::Player1 => 1,
            PlayerId::Player2 => 2,
        }
    }
}

/// 石の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stone {
    X,
    O,
}

impl Stone {
    pub fn symbol(self) -> char {
        match self {
            Stone::X => 'X',
            Stone::O => 'O',
        }
    }

    pub fn owner(self) -> PlayerId {
        match self {
            Stone::X => PlayerId::Player1,
            Stone::O => PlayerId::Player2,
        }
    }
}

impl fmt::Display for Stone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// マスの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Stone(Stone),
}

impl Cell {
    pub const EMPTY_SYMBOL: char = '.';

    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => Self::EMPTY_SYMBOL,
            Cell::Stone(stone) => stone.symbol(),
        }
    }

    pub fn from_symbol(c: char) -> Option<Cell> {
        match c {
            Self::EMPTY_SYMBOL => Some(Cell::Empty),
            'X' => Some(Cell::Stone(Stone::X)),
            'O' => Some(Cell::Stone(Stone::O)),
            _ => None,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

/// 盤面座標 (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}
