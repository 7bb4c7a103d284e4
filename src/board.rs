use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PuzzleError, Result};

pub const SIDE: usize = 3;
pub const CELLS: usize = SIDE * SIDE;

/// Direction the blank travels in. The declaration order is the order in
/// which successors are generated and is relied on as a tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Hash, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn to_char(&self) -> char {
        match self {
            Direction::Up => 'U',
            Direction::Down => 'D',
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }

    pub fn as_offset(&self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Right => "Right",
        };
        write!(f, "{}", s)
    }
}

/// A 3x3 arrangement of the tiles 0-8, 0 being the blank.
///
/// Always a permutation of `0..=8`: the only ways to build one are the
/// validating constructors, and every transformation returns a new board.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Board {
    cells: [u8; CELLS],
}

impl Board {
    pub fn new(cells: [u8; CELLS]) -> Result<Self> {
        validate(&cells)?;
        Ok(Self { cells })
    }

    pub fn from_grid(grid: [[u8; SIDE]; SIDE]) -> Result<Self> {
        let mut cells = [0u8; CELLS];
        for (row, values) in grid.iter().enumerate() {
            cells[row * SIDE..(row + 1) * SIDE].copy_from_slice(values);
        }
        Self::new(cells)
    }

    /// The conventional goal: tiles in reading order, blank last.
    pub fn solved() -> Self {
        Self {
            cells: [1, 2, 3, 4, 5, 6, 7, 8, 0],
        }
    }

    /// Permutation of `0..=8` with exactly one blank.
    pub fn is_valid(cells: &[u8]) -> bool {
        validate(cells).is_ok()
    }

    pub fn cells(&self) -> &[u8; CELLS] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row * SIDE + col]
    }

    pub fn to_grid(&self) -> [[u8; SIDE]; SIDE] {
        let mut grid = [[0u8; SIDE]; SIDE];
        for (idx, &value) in self.cells.iter().enumerate() {
            grid[idx / SIDE][idx % SIDE] = value;
        }
        grid
    }

    pub fn position_of(&self, value: u8) -> usize {
        // every value 0-8 is present exactly once
        self.cells.iter().position(|&v| v == value).unwrap_or(0)
    }

    pub fn blank_idx(&self) -> usize {
        self.position_of(0)
    }

    /// Row and column of the blank.
    pub fn blank_position(&self) -> (usize, usize) {
        let idx = self.blank_idx();
        (idx / SIDE, idx % SIDE)
    }

    fn target_idx(&self, dir: Direction) -> Option<usize> {
        let (row, col) = self.blank_position();
        let (dr, dc) = dir.as_offset();
        let new_row = row as isize + dr;
        let new_col = col as isize + dc;

        if new_row >= 0 && new_row < SIDE as isize && new_col >= 0 && new_col < SIDE as isize {
            Some(new_row as usize * SIDE + new_col as usize)
        } else {
            None
        }
    }

    pub fn try_slide(&self, dir: Direction) -> Option<Board> {
        let target_idx = self.target_idx(dir)?;
        let mut cells = self.cells;
        cells.swap(self.blank_idx(), target_idx);
        Some(Board { cells })
    }

    pub fn slide(&self, dir: Direction) -> Result<Board> {
        self.try_slide(dir).ok_or(PuzzleError::IllegalMove {
            direction: dir,
            position: self.blank_position(),
        })
    }

    pub fn legal_moves(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&dir| self.target_idx(dir).is_some())
            .collect()
    }

    /// Successor boards paired with the blank motion that produced them, in
    /// up, down, left, right order.
    pub fn successors(&self) -> Vec<(Direction, Board)> {
        let mut result = Vec::with_capacity(4);

        for dir in Direction::ALL {
            if let Some(successor) = self.try_slide(dir) {
                result.push((dir, successor));
            }
        }

        result
    }

    pub fn possible_moves(&self) -> Vec<Board> {
        self.successors().into_iter().map(|(_, board)| board).collect()
    }

    /// True when `next` is this board with the blank swapped with exactly one
    /// orthogonal neighbour and every other cell unchanged.
    pub fn is_adjacent(&self, next: &Board) -> bool {
        self.direction_to(next).is_some()
    }

    pub fn direction_to(&self, next: &Board) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|&dir| self.try_slide(dir).as_ref() == Some(next))
    }

    /// The tile that slid between two consecutive boards.
    pub fn moved_tile(&self, next: &Board) -> Option<u8> {
        self.cells
            .iter()
            .zip(next.cells.iter())
            .find(|(&before, &after)| before != 0 && before != after)
            .map(|(&before, _)| before)
    }
}

fn validate(cells: &[u8]) -> Result<()> {
    if let Some(&value) = cells.iter().find(|&&v| v as usize >= CELLS) {
        return Err(PuzzleError::ValueOutOfRange { value });
    }

    if !cells.contains(&0) {
        return Err(PuzzleError::MissingBlank);
    }

    let mut seen = [false; CELLS];
    for &value in cells {
        if seen[value as usize] {
            return Err(PuzzleError::DuplicateValue { value });
        }
        seen[value as usize] = true;
    }

    if cells.len() != CELLS {
        return Err(PuzzleError::WrongShape {
            rows: cells.len().div_ceil(SIDE),
            lengths: cells.chunks(SIDE).map(<[u8]>::len).collect(),
        });
    }

    Ok(())
}

impl TryFrom<Vec<Vec<u8>>> for Board {
    type Error = PuzzleError;

    fn try_from(grid: Vec<Vec<u8>>) -> Result<Self> {
        if grid.len() != SIDE || grid.iter().any(|row| row.len() != SIDE) {
            return Err(PuzzleError::WrongShape {
                rows: grid.len(),
                lengths: grid.iter().map(Vec::len).collect(),
            });
        }

        let mut cells = [0u8; CELLS];
        for (idx, value) in grid.into_iter().flatten().enumerate() {
            cells[idx] = value;
        }

        Board::new(cells)
    }
}

impl TryFrom<&[u8]> for Board {
    type Error = PuzzleError;

    fn try_from(cells: &[u8]) -> Result<Self> {
        validate(cells)?;
        let mut owned = [0u8; CELLS];
        owned.copy_from_slice(cells);
        Ok(Board { cells: owned })
    }
}

impl From<Board> for Vec<Vec<u8>> {
    fn from(board: Board) -> Self {
        board.cells.chunks(SIDE).map(<[u8]>::to_vec).collect()
    }
}

const RADIX: u32 = 10;

impl FromStr for Board {
    type Err = PuzzleError;

    /// Accepts the nine digits in reading order, optionally separated by
    /// whitespace, commas or slashes: `123456780`, `1 2 3 / 4 5 6 / 7 8 0`.
    fn from_str(str: &str) -> Result<Self> {
        let mut cells: Vec<u8> = Vec::with_capacity(CELLS);

        for char in str.chars() {
            if char.is_whitespace() || char == ',' || char == '/' {
                continue;
            }
            let digit = char.to_digit(RADIX).ok_or_else(|| PuzzleError::Parse {
                input: str.to_string(),
                reason: format!("unexpected character '{}'", char),
            })?;
            cells.push(digit as u8);
        }

        if cells.len() != CELLS {
            return Err(PuzzleError::Parse {
                input: str.to_string(),
                reason: format!("expected {} digits, found {}", CELLS, cells.len()),
            });
        }

        Board::try_from(cells.as_slice())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, values) in self.cells.chunks(SIDE).enumerate() {
            if row > 0 {
                writeln!(f)?;
            }
            let line: Vec<String> = values.iter().map(u8::to_string).collect();
            write!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
