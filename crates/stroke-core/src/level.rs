//! Level data model: cell codes, vertices, and the serialized level document.
//!
//! Raw characters are decoded into [`Cell`] exactly once, at the grid-parsing
//! boundary ([`Level::from_rows`] / [`LevelDocument`]). Everything downstream matches
//! on the enum.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// A cell position in the grid (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A grid-line intersection. Vertex `(row, col)` is the top-left corner of cell `(row, col)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Vertex {
    pub row: usize,
    pub col: usize,
}

impl Vertex {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// A vertex connection-count clue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CornerClue {
    pub vertex: Vertex,
    /// Required number of orthogonal path steps around the vertex (0..=3)
    pub count: u8,
}

/// Highest satisfiable corner count; a simple path cannot close the 2x2 cycle.
pub const MAX_CORNER_COUNT: u8 = 3;

/// Orthogonal step direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Row/column offset of one step in this direction
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Direction of a single orthogonal step from `from` to `to`, if it is one.
    pub fn between(from: Position, to: Position) -> Option<Direction> {
        let dr = to.row as isize - from.row as isize;
        let dc = to.col as isize - from.col as isize;
        match (dr, dc) {
            (-1, 0) => Some(Direction::North),
            (0, 1) => Some(Direction::East),
            (1, 0) => Some(Direction::South),
            (0, -1) => Some(Direction::West),
            _ => None,
        }
    }
}

/// Shape hints carried by a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HintKind {
    /// Path goes straight through (either axis)
    Straight,
    /// Path turns
    Turn,
    /// Path goes straight along the row
    Horizontal,
    /// Path goes straight along the column
    Vertical,
    /// Path turns through north+east or south+west
    Rising,
    /// Path turns through east+south or west+north
    Falling,
}

impl HintKind {
    pub const ALL: [HintKind; 6] = [
        HintKind::Straight,
        HintKind::Turn,
        HintKind::Horizontal,
        HintKind::Vertical,
        HintKind::Rising,
        HintKind::Falling,
    ];

    pub fn code(self) -> char {
        match self {
            HintKind::Straight => 's',
            HintKind::Turn => 't',
            HintKind::Horizontal => 'h',
            HintKind::Vertical => 'v',
            HintKind::Rising => 'u',
            HintKind::Falling => 'd',
        }
    }

    /// Remap under an axis swap (transpose).
    pub fn swap_axes(self) -> HintKind {
        match self {
            HintKind::Horizontal => HintKind::Vertical,
            HintKind::Vertical => HintKind::Horizontal,
            other => other,
        }
    }

    /// Remap under a single mirror.
    pub fn mirror(self) -> HintKind {
        match self {
            HintKind::Rising => HintKind::Falling,
            HintKind::Falling => HintKind::Rising,
            other => other,
        }
    }

    /// Whether a cell entered from `a` and left towards `b` (both neighbor
    /// directions as seen from the cell) satisfies this hint.
    pub fn accepts(self, a: Direction, b: Direction) -> bool {
        let straight = a == b.opposite();
        match self {
            HintKind::Straight => straight,
            HintKind::Turn => !straight && a != b,
            HintKind::Horizontal => straight && a.is_horizontal(),
            HintKind::Vertical => straight && !a.is_horizontal(),
            HintKind::Rising => turn_class(a, b) == Some(HintKind::Rising),
            HintKind::Falling => turn_class(a, b) == Some(HintKind::Falling),
        }
    }
}

/// Classify a turn by the pair of neighbor directions it connects.
pub fn turn_class(a: Direction, b: Direction) -> Option<HintKind> {
    use Direction::*;
    match (a, b) {
        (North, East) | (East, North) | (South, West) | (West, South) => Some(HintKind::Rising),
        (East, South) | (South, East) | (West, North) | (North, West) => Some(HintKind::Falling),
        _ => None,
    }
}

/// Cyclic-order token. The fixed cycle is Rock -> Paper -> Scissors -> Rock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Token {
    Rock,
    Paper,
    Scissors,
}

impl Token {
    pub const ALL: [Token; 3] = [Token::Rock, Token::Paper, Token::Scissors];

    pub fn code(self) -> char {
        match self {
            Token::Rock => 'R',
            Token::Paper => 'P',
            Token::Scissors => 'S',
        }
    }

    fn ordinal(self) -> u8 {
        match self {
            Token::Rock => 0,
            Token::Paper => 1,
            Token::Scissors => 2,
        }
    }

    fn from_ordinal(n: u8) -> Token {
        match n % 3 {
            0 => Token::Rock,
            1 => Token::Paper,
            _ => Token::Scissors,
        }
    }

    /// Advance `steps` positions along the cycle.
    pub fn rotate(self, steps: u8) -> Token {
        Token::from_ordinal(self.ordinal() + steps % 3)
    }

    /// Steps along the cycle from `prev` to `self`: 0 (same), 1 (forward) or 2 (backward).
    pub fn step_from(self, prev: Token) -> u8 {
        (self.ordinal() + 3 - prev.ordinal()) % 3
    }
}

/// Decoded cell content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Wall,
    MovableWall,
    Hint(HintKind),
    Token(Token),
}

impl Cell {
    pub fn code(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Wall => '#',
            Cell::MovableWall => 'm',
            Cell::Hint(kind) => kind.code(),
            Cell::Token(token) => token.code(),
        }
    }

    pub fn from_code(ch: char) -> Option<Cell> {
        let cell = match ch {
            '.' => Cell::Empty,
            '#' => Cell::Wall,
            'm' => Cell::MovableWall,
            'R' => Cell::Token(Token::Rock),
            'P' => Cell::Token(Token::Paper),
            'S' => Cell::Token(Token::Scissors),
            other => Cell::Hint(HintKind::ALL.into_iter().find(|k| k.code() == other)?),
        };
        Some(cell)
    }

    /// Fixed or movable obstacle
    pub fn is_obstacle(self) -> bool {
        matches!(self, Cell::Wall | Cell::MovableWall)
    }

    pub fn is_hint(self) -> bool {
        matches!(self, Cell::Hint(_))
    }

    pub fn token(self) -> Option<Token> {
        match self {
            Cell::Token(t) => Some(t),
            _ => None,
        }
    }

    /// Cells a movable wall may occupy
    pub fn accepts_movable(self) -> bool {
        matches!(self, Cell::Empty | Cell::MovableWall)
    }
}

/// Errors raised when decoding or validating a level
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("level grid is empty")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown cell code {code:?} at ({row}, {col})")]
    UnknownCell { row: usize, col: usize, code: char },
    #[error("vertex ({row}, {col}) is not an interior grid intersection")]
    VertexOutOfRange { row: usize, col: usize },
    #[error("vertex ({row}, {col}) appears more than once")]
    DuplicateVertex { row: usize, col: usize },
    #[error("corner count {count} at ({row}, {col}) exceeds {max}", max = MAX_CORNER_COUNT)]
    CornerCountOutOfRange { row: usize, col: usize, count: usize },
}

/// A rectangular puzzle level
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LevelDocument", into = "LevelDocument")]
pub struct Level {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    stitches: Vec<Vertex>,
    corners: Vec<CornerClue>,
}

impl Level {
    /// Create a level filled with one cell kind
    pub fn filled(rows: usize, cols: usize, cell: Cell) -> Self {
        Self {
            rows,
            cols,
            cells: vec![cell; rows * cols],
            stitches: Vec::new(),
            corners: Vec::new(),
        }
    }

    /// Parse grid rows such as `["..#", "s.R"]`.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, LevelError> {
        let first = rows.first().ok_or(LevelError::Empty)?;
        let cols = first.as_ref().chars().count();
        if cols == 0 {
            return Err(LevelError::Empty);
        }
        let mut cells = Vec::with_capacity(rows.len() * cols);
        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            let found = line.chars().count();
            if found != cols {
                return Err(LevelError::Ragged {
                    row,
                    expected: cols,
                    found,
                });
            }
            for (col, code) in line.chars().enumerate() {
                cells.push(Cell::from_code(code).ok_or(LevelError::UnknownCell { row, col, code })?);
            }
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells,
            stitches: Vec::new(),
            corners: Vec::new(),
        })
    }

    /// Attach stitches and corner clues, validating vertex placement.
    pub fn with_constraints(
        mut self,
        stitches: Vec<Vertex>,
        corners: Vec<CornerClue>,
    ) -> Result<Self, LevelError> {
        let mut seen = HashSet::new();
        for v in stitches.iter().chain(corners.iter().map(|c| &c.vertex)) {
            if !self.is_interior_vertex(*v) {
                return Err(LevelError::VertexOutOfRange { row: v.row, col: v.col });
            }
            if !seen.insert(*v) {
                return Err(LevelError::DuplicateVertex { row: v.row, col: v.col });
            }
        }
        for c in &corners {
            if c.count > MAX_CORNER_COUNT {
                return Err(LevelError::CornerCountOutOfRange {
                    row: c.vertex.row,
                    col: c.vertex.col,
                    count: c.count as usize,
                });
            }
        }
        self.stitches = stitches;
        self.corners = corners;
        Ok(self)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn stitches(&self) -> &[Vertex] {
        &self.stitches
    }

    pub fn corners(&self) -> &[CornerClue] {
        &self.corners
    }

    #[inline]
    pub fn index(&self, pos: Position) -> usize {
        pos.row * self.cols + pos.col
    }

    #[inline]
    pub fn position(&self, idx: usize) -> Position {
        Position::new(idx / self.cols, idx % self.cols)
    }

    pub fn cell(&self, idx: usize) -> Cell {
        self.cells[idx]
    }

    pub fn get(&self, pos: Position) -> Cell {
        self.cells[self.index(pos)]
    }

    pub fn set(&mut self, idx: usize, cell: Cell) {
        self.cells[idx] = cell;
    }

    pub(crate) fn push_stitch(&mut self, v: Vertex) {
        self.stitches.push(v);
    }

    pub(crate) fn push_corner(&mut self, clue: CornerClue) {
        self.corners.push(clue);
    }

    pub(crate) fn remove_corner(&mut self, v: Vertex) -> bool {
        let before = self.corners.len();
        self.corners.retain(|c| c.vertex != v);
        before != self.corners.len()
    }

    /// Whether `v` lies strictly inside the grid
    pub fn is_interior_vertex(&self, v: Vertex) -> bool {
        v.row >= 1 && v.row < self.rows && v.col >= 1 && v.col < self.cols
    }

    /// All interior vertices in row-major order
    pub fn interior_vertices(&self) -> Vec<Vertex> {
        let mut out = Vec::new();
        for row in 1..self.rows {
            for col in 1..self.cols {
                out.push(Vertex::new(row, col));
            }
        }
        out
    }

    /// The four cells around an interior vertex: `[top_left, top_right, bottom_left, bottom_right]`
    pub fn block_cells(&self, v: Vertex) -> [usize; 4] {
        let tl = self.index(Position::new(v.row - 1, v.col - 1));
        [tl, tl + 1, tl + self.cols, tl + self.cols + 1]
    }

    /// Orthogonal neighbors of a cell index
    pub fn neighbors4(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let pos = self.position(idx);
        Direction::ALL.into_iter().filter_map(move |d| {
            let (dr, dc) = d.offset();
            let r = pos.row as isize + dr;
            let c = pos.col as isize + dc;
            if r < 0 || c < 0 || r >= self.rows as isize || c >= self.cols as isize {
                None
            } else {
                Some(r as usize * self.cols + c as usize)
            }
        })
    }

    pub fn count_where(&self, f: impl Fn(Cell) -> bool) -> usize {
        self.cells.iter().filter(|&&c| f(c)).count()
    }

    /// Number of movable walls
    pub fn movable_count(&self) -> usize {
        self.count_where(|c| c == Cell::MovableWall)
    }

    /// Fixed plus movable obstacles
    pub fn obstacle_count(&self) -> usize {
        self.count_where(Cell::is_obstacle)
    }

    /// Cells that are not obstacles
    pub fn open_count(&self) -> usize {
        self.cell_count() - self.obstacle_count()
    }

    pub fn hint_count(&self) -> usize {
        self.count_where(Cell::is_hint)
    }

    pub fn token_count(&self) -> usize {
        self.count_where(|c| c.token().is_some())
    }

    /// Decorations counted by the constraint density
    pub fn constraint_count(&self) -> usize {
        self.hint_count() + self.token_count() + self.stitches.len() + self.corners.len()
    }

    /// (hints + tokens + stitches + corner clues) / open cells
    pub fn constraint_density(&self) -> f64 {
        let open = self.open_count();
        if open == 0 {
            return 0.0;
        }
        self.constraint_count() as f64 / open as f64
    }

    /// obstacles / total cells
    pub fn obstacle_density(&self) -> f64 {
        self.obstacle_count() as f64 / self.cell_count() as f64
    }

    /// Grid rows as strings
    pub fn to_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|c| c.code()).collect())
            .collect()
    }

    pub fn to_document(&self) -> LevelDocument {
        LevelDocument::from(self.clone())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.to_rows() {
            writeln!(f, "{}", row)?;
        }
        if !self.stitches.is_empty() {
            let list: Vec<String> = self
                .stitches
                .iter()
                .map(|v| format!("({},{})", v.row, v.col))
                .collect();
            writeln!(f, "stitches: {}", list.join(" "))?;
        }
        if !self.corners.is_empty() {
            let list: Vec<String> = self
                .corners
                .iter()
                .map(|c| format!("({},{})={}", c.vertex.row, c.vertex.col, c.count))
                .collect();
            writeln!(f, "corners: {}", list.join(" "))?;
        }
        Ok(())
    }
}

/// Wire form of a level consumed by rendering and rules evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDocument {
    pub grid: Vec<String>,
    #[serde(default)]
    pub stitches: Vec<[usize; 2]>,
    #[serde(default)]
    pub corner_counts: Vec<[usize; 3]>,
}

impl From<Level> for LevelDocument {
    fn from(level: Level) -> Self {
        Self {
            grid: level.to_rows(),
            stitches: level.stitches.iter().map(|v| [v.row, v.col]).collect(),
            corner_counts: level
                .corners
                .iter()
                .map(|c| [c.vertex.row, c.vertex.col, c.count as usize])
                .collect(),
        }
    }
}

impl TryFrom<LevelDocument> for Level {
    type Error = LevelError;

    fn try_from(doc: LevelDocument) -> Result<Self, Self::Error> {
        let stitches = doc
            .stitches
            .iter()
            .map(|&[row, col]| Vertex::new(row, col))
            .collect();
        let mut corners = Vec::with_capacity(doc.corner_counts.len());
        for &[row, col, count] in &doc.corner_counts {
            if count > MAX_CORNER_COUNT as usize {
                return Err(LevelError::CornerCountOutOfRange { row, col, count });
            }
            corners.push(CornerClue {
                vertex: Vertex::new(row, col),
                count: count as u8,
            });
        }
        Level::from_rows(&doc.grid)?.with_constraints(stitches, corners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render_rows() {
        let level = Level::from_rows(&["..#", "sRm", "huP"]).unwrap();
        assert_eq!(level.rows(), 3);
        assert_eq!(level.cols(), 3);
        assert_eq!(level.get(Position::new(0, 2)), Cell::Wall);
        assert_eq!(level.get(Position::new(1, 0)), Cell::Hint(HintKind::Straight));
        assert_eq!(level.get(Position::new(1, 1)), Cell::Token(Token::Rock));
        assert_eq!(level.get(Position::new(2, 1)), Cell::Hint(HintKind::Rising));
        assert_eq!(level.to_rows(), vec!["..#", "sRm", "huP"]);
    }

    #[test]
    fn test_rejects_ragged_and_unknown() {
        assert_eq!(
            Level::from_rows(&["...", ".."]),
            Err(LevelError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert!(matches!(
            Level::from_rows(&["..x"]),
            Err(LevelError::UnknownCell { code: 'x', .. })
        ));
        assert_eq!(Level::from_rows::<&str>(&[]), Err(LevelError::Empty));
    }

    #[test]
    fn test_vertex_validation() {
        let level = Level::from_rows(&["...", "...", "..."]).unwrap();
        assert!(level
            .clone()
            .with_constraints(vec![Vertex::new(0, 1)], vec![])
            .is_err());
        assert!(level
            .clone()
            .with_constraints(
                vec![Vertex::new(1, 1)],
                vec![CornerClue {
                    vertex: Vertex::new(1, 1),
                    count: 1
                }]
            )
            .is_err());
        assert!(level
            .with_constraints(
                vec![Vertex::new(1, 1)],
                vec![CornerClue {
                    vertex: Vertex::new(2, 2),
                    count: 2
                }]
            )
            .is_ok());
    }

    #[test]
    fn test_document_json_shape() {
        let level = Level::from_rows(&["...", "...", "..."])
            .unwrap()
            .with_constraints(
                vec![Vertex::new(1, 2)],
                vec![CornerClue {
                    vertex: Vertex::new(2, 1),
                    count: 3,
                }],
            )
            .unwrap();
        let json = serde_json::to_value(&level).unwrap();
        assert_eq!(json["grid"][0], "...");
        assert_eq!(json["stitches"][0][1], 2);
        assert_eq!(json["cornerCounts"][0][2], 3);
        let back: Level = serde_json::from_value(json).unwrap();
        assert_eq!(back, level);
    }

    #[test]
    fn test_densities() {
        let level = Level::from_rows(&["#..", ".s.", "..R"]).unwrap();
        assert_eq!(level.open_count(), 8);
        assert_eq!(level.constraint_count(), 2);
        assert!((level.constraint_density() - 0.25).abs() < 1e-9);
        assert!((level.obstacle_density() - 1.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_hint_acceptance() {
        use Direction::*;
        assert!(HintKind::Straight.accepts(North, South));
        assert!(HintKind::Horizontal.accepts(West, East));
        assert!(!HintKind::Vertical.accepts(West, East));
        assert!(HintKind::Turn.accepts(North, East));
        assert!(HintKind::Rising.accepts(East, North));
        assert!(HintKind::Rising.accepts(South, West));
        assert!(HintKind::Falling.accepts(West, North));
        assert!(!HintKind::Falling.accepts(North, East));
    }

    #[test]
    fn test_token_cycle() {
        assert_eq!(Token::Rock.rotate(1), Token::Paper);
        assert_eq!(Token::Scissors.rotate(1), Token::Rock);
        assert_eq!(Token::Paper.step_from(Token::Rock), 1);
        assert_eq!(Token::Rock.step_from(Token::Paper), 2);
        assert_eq!(Token::Rock.step_from(Token::Rock), 0);
    }
}
