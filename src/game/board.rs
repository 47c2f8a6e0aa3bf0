//! The 3×3 board

use derive_more::Display;

/// Every line that wins: rows, columns, diagonals
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// A player's mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Mark {
    #[display("X")]
    X,
    #[display("O")]
    O,
}

/// Index of a board cell, always in `0..9`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub struct CellIndex(u8);

impl CellIndex {
    pub const COUNT: u8 = 9;

    /// Returns `None` for indexes outside the board
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    /// All cells in row-major order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).map(Self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Mark>; 9],
}

impl Board {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn get(&self, cell: CellIndex) -> Option<Mark> {
        self.cells[cell.get()]
    }

    #[must_use]
    pub const fn is_empty_at(&self, cell: CellIndex) -> bool {
        self.cells[cell.get()].is_none()
    }

    /// Place a mark. Returns `false` and leaves the board untouched if the
    /// cell is taken.
    pub fn place(&mut self, cell: CellIndex, mark: Mark) -> bool {
        let slot = &mut self.cells[cell.get()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(mark);
        true
    }

    /// The mark holding three in a row, if any
    #[must_use]
    pub fn winner(&self) -> Option<Mark> {
        WINNING_LINES.iter().find_map(|&[a, b, c]| {
            let mark = self.cells[a]?;
            (self.cells[b] == Some(mark) && self.cells[c] == Some(mark)).then_some(mark)
        })
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Button label for a cell
    #[must_use]
    pub fn label(&self, cell: CellIndex) -> String {
        self.get(cell)
            .map_or_else(|| "·".to_string(), |mark| mark.to_string())
    }

    /// Plain-text grid, one row per line
    #[must_use]
    pub fn render_text(&self) -> String {
        self.cells
            .chunks(3)
            .map(|row| {
                row.iter()
                    .map(|cell| cell.map_or_else(|| "·".to_string(), |mark| mark.to_string()))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(index: u8) -> CellIndex {
        CellIndex::new(index).unwrap()
    }

    fn board_from(marks: &[(u8, Mark)]) -> Board {
        let mut board = Board::new();
        for &(index, mark) in marks {
            assert!(board.place(cell(index), mark));
        }
        board
    }

    #[test]
    fn test_cell_index_bounds() {
        assert!(CellIndex::new(0).is_some());
        assert!(CellIndex::new(8).is_some());
        assert!(CellIndex::new(9).is_none());
        assert_eq!(CellIndex::all().count(), 9);
    }

    #[test]
    fn test_place_rejects_occupied() {
        let mut board = Board::new();
        assert!(board.place(cell(4), Mark::X));
        assert!(!board.place(cell(4), Mark::O));
        assert_eq!(board.get(cell(4)), Some(Mark::X));
    }

    #[test]
    fn test_every_line_wins() {
        for line in WINNING_LINES {
            let marks: Vec<(u8, Mark)> = line.iter().map(|&i| (i as u8, Mark::O)).collect();
            assert_eq!(board_from(&marks).winner(), Some(Mark::O), "line {line:?}");
        }
    }

    #[test]
    fn test_mixed_line_does_not_win() {
        let board = board_from(&[(0, Mark::X), (1, Mark::O), (2, Mark::X)]);
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn test_full_board_without_winner() {
        // X O X
        // X O O
        // O X X
        let board = board_from(&[
            (0, Mark::X),
            (1, Mark::O),
            (2, Mark::X),
            (3, Mark::X),
            (4, Mark::O),
            (5, Mark::O),
            (6, Mark::O),
            (7, Mark::X),
            (8, Mark::X),
        ]);
        assert!(board.is_full());
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn test_render_text() {
        let board = board_from(&[(0, Mark::X), (4, Mark::O)]);
        assert_eq!(board.render_text(), "X | · | ·\n· | O | ·\n· | · | ·");
        assert_eq!(board.label(cell(0)), "X");
        assert_eq!(board.label(cell(1)), "·");
    }
}
