use crate::core::{Board, Cell, Stone, WIN_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 横, 縦, 右下がり, 右上がり
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

/// 禁じ手をどちらの石に適用するか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ForbiddenPolicy {
    /// 両者に適用
    #[default]
    Symmetric,
    /// 先手 (X) のみ
    FirstPlayerOnly,
    /// 禁じ手なし
    Off,
}

impl ForbiddenPolicy {
    pub fn applies_to(self, stone: Stone) -> bool {
        match self {
            ForbiddenPolicy::Symmetric => true,
            ForbiddenPolicy::FirstPlayerOnly => stone == Stone::X,
            ForbiddenPolicy::Off => false,
        }
    }
}

/// 禁じ手の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forbidden {
    DoubleThree,
    DoubleFour,
    Overline,
}

impl fmt::Display for Forbidden {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Forbidden::DoubleThree => write!(f, "double three"),
            Forbidden::DoubleFour => write!(f, "double four"),
            Forbidden::Overline => write!(f, "overline"),
        }
    }
}

/// 置いた石を通る一方向の連
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    length: usize,
    open_start: bool,
    open_end: bool,
}

impl Run {
    fn is_open(&self) -> bool {
        self.open_start && self.open_end
    }
}

/// (row, col) の石を含む連を両方向に数える。盤外の端は open にならない
fn scan_run(board: &Board, row: isize, col: isize, stone: Stone, (dr, dc): (isize, isize)) -> Run {
    let own = Cell::Stone(stone);
    let mut length = 1;

    let mut walk = |sign: isize| -> bool {
        let (mut r, mut c) = (row + dr * sign, col + dc * sign);
        while board.cell_at(r, c) == Some(own) {
            length += 1;
            r += dr * sign;
            c += dc * sign;
        }
        board.cell_at(r, c) == Some(Cell::Empty)
    };

    let open_start = walk(-1);
    let open_end = walk(1);
    Run {
        length,
        open_start,
        open_end,
    }
}

fn runs(board: &Board, row: isize, col: isize, stone: Stone) -> impl Iterator<Item = Run> + '_ {
    DIRECTIONS
        .into_iter()
        .map(move |dir| scan_run(board, row, col, stone, dir))
}

/// 置いた石を通る 5 連以上があるか
pub fn has_five_in_a_row(board: &Board, row: isize, col: isize, stone: Stone) -> bool {
    runs(board, row, col, stone).any(|run| run.length >= WIN_LENGTH)
}

/// 長さがちょうど `length` で両端が空いている連の方向数
pub fn count_open_runs(board: &Board, row: isize, col: isize, stone: Stone, length: usize) -> usize {
    runs(board, row, col, stone)
        .filter(|run| run.length == length && run.is_open())
        .count()
}

pub fn count_open_threes(board: &Board, row: isize, col: isize, stone: Stone) -> usize {
    count_open_runs(board, row, col, stone, 3)
}

pub fn count_open_fours(board: &Board, row: isize, col: isize, stone: Stone) -> usize {
    count_open_runs(board, row, col, stone, 4)
}

/// 6 連以上 (長連)
pub fn is_overline(board: &Board, row: isize, col: isize, stone: Stone) -> bool {
    runs(board, row, col, stone).any(|run| run.length > WIN_LENGTH)
}

/// 仮置きした石が禁じ手ならその種類を返す
pub fn forbidden_kind(board: &Board, row: isize, col: isize, stone: Stone) -> Option<Forbidden> {
    if count_open_threes(board, row, col, stone) >= 2 {
        Some(Forbidden::DoubleThree)
    } else if count_open_fours(board, row, col, stone) >= 2 {
        Some(Forbidden::DoubleFour)
    } else if is_overline(board, row, col, stone) {
        Some(Forbidden::Overline)
    } else {
        None
    }
}

pub fn is_forbidden(board: &Board, row: isize, col: isize, stone: Stone) -> bool {
    forbidden_kind(board, row, col, stone).is_some()
}
