use super::types::{Cell, Position, Stone};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("position ({row}, {col}) is outside the board")]
    OutOfRange { row: isize, col: isize },
    #[error("cell {0} is already occupied")]
    CellOccupied(Position),
}

/// 盤面 (size x size の正方形)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Board {
            size,
            cells: vec![Cell::Empty; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// 盤内なら座標を返す
    pub fn position(&self, row: isize, col: isize) -> Result<Position, BoardError> {
        let n = self.size as isize;
        if row >= 0 && row < n && col >= 0 && col < n {
            Ok(Position::new(row as usize, col as usize))
        } else {
            Err(BoardError::OutOfRange { row, col })
        }
    }

    pub fn get(&self, row: isize, col: isize) -> Result<Cell, BoardError> {
        let pos = self.position(row, col)?;
        Ok(self.cells[self.index(pos)])
    }

    /// 盤外は None (ルール判定の走査用)
    pub fn cell_at(&self, row: isize, col: isize) -> Option<Cell> {
        self.get(row, col).ok()
    }

    pub fn place(&mut self, row: isize, col: isize, stone: Stone) -> Result<Position, BoardError> {
        let pos = self.position(row, col)?;
        let idx = self.index(pos);
        if !self.cells[idx].is_empty() {
            return Err(BoardError::CellOccupied(pos));
        }
        self.cells[idx] = Cell::Stone(stone);
        Ok(pos)
    }

    /// 待ったと仮置きの巻き戻し専用。合法性は呼び出し側が保証する
    pub fn clear(&mut self, pos: Position) {
        let idx = self.index(pos);
        self.cells[idx] = Cell::Empty;
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    /// 1行 size 文字、行ごとに改行
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.size * (self.size + 1));
        for row in self.cells.chunks(self.size) {
            out.extend(row.iter().map(|c| c.symbol()));
            out.push('\n');
        }
        out
    }

    /// `render` の逆変換。形が崩れていれば None
    pub fn parse(text: &str) -> Option<Board> {
        let rows: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
        let size = rows.len();
        if size == 0 {
            return None;
        }
        let mut board = Board::new(size);
        for (r, line) in rows.iter().enumerate() {
            let cells: Vec<Cell> = line
                .chars()
                .map(Cell::from_symbol)
                .collect::<Option<Vec<_>>>()?;
            if cells.len() != size {
                return None;
            }
            board.cells[r * size..(r + 1) * size].copy_from_slice(&cells);
        }
        Some(board)
    }

    fn index(&self, pos: Position) -> usize {
        pos.row * self.size + pos.col
    }
}
