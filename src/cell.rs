//! Axial hex-board coordinates and the per-cell neighbour table.

use std::fmt;

/// A player/stone color. `White` and `Black` double as array indices (0/1);
/// `Empty` is only ever used to mark an unoccupied cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    White = 0,
    Black = 1,
    Empty = 2,
}

impl Color {
    #[inline]
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
            Color::Empty => Color::Empty,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        debug_assert!(self != Color::Empty);
        self as usize
    }

    /// Numeric value used in the outcome-orientation arithmetic
    /// `outcome + color * (1 - 2*outcome)`.
    #[inline]
    pub fn as_f64(self) -> f64 {
        self.index() as f64
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
            Color::Empty => write!(f, "Empty"),
        }
    }
}

/// Axial coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ax {
    pub q: i32,
    pub r: i32,
}

impl Ax {
    #[inline]
    pub fn new(q: i32, r: i32) -> Self {
        Ax { q, r }
    }
}

/// A single board cell. `neighbours` holds flat cell indices into the
/// owning `GameState`'s cell arena, recorded clockwise so consecutive
/// entries are themselves mutually adjacent.
#[derive(Clone, Debug)]
pub struct Cell {
    pub q: i32,
    pub r: i32,
    pub idx: usize,
    pub color: Color,
    pub group_id: Option<usize>,
    pub neighbours: Vec<usize>,
}

impl Cell {
    pub fn new(q: i32, r: i32, idx: usize) -> Self {
        Cell {
            q,
            r,
            idx,
            color: Color::Empty,
            group_id: None,
            neighbours: Vec::new(),
        }
    }
}

#[inline]
pub fn is_valid_ax(ax: Ax, board_size: i32) -> bool {
    ax.q.abs() <= board_size - 1 && ax.r.abs() <= board_size - 1 && (ax.q + ax.r).abs() <= board_size - 1
}

/// Returns the six neighbour offsets of `(q, r)` in clockwise,
/// board-oriented order, rotated depending on which edge(s) the cell
/// touches so that out-of-range entries always fall at the tail.
///
/// This rotation table is load-bearing: it is what keeps consecutive
/// neighbours mutually adjacent regardless of which sector a cell sits in.
pub fn neighbour_order(q: i32, r: i32, board_size: i32) -> [Ax; 6] {
    let raw = [
        Ax::new(q - 1, r + 1),
        Ax::new(q - 1, r),
        Ax::new(q, r - 1),
        Ax::new(q + 1, r - 1),
        Ax::new(q + 1, r),
        Ax::new(q, r + 1),
    ];

    let order: [usize; 6] = if q == -board_size + 1 && r > 0 {
        // top edge
        [2, 3, 4, 5, 0, 1]
    } else if r == board_size - 1 && q > -board_size + 1 {
        // top-right edge
        [1, 2, 3, 4, 5, 0]
    } else if r >= 0 && q > 0 {
        // bottom-right edge
        [0, 1, 2, 3, 4, 5]
    } else if q == board_size - 1 && r < 0 {
        // bottom edge
        [5, 0, 1, 2, 3, 4]
    } else if r == -board_size + 1 && q > 0 {
        // bottom-left edge
        [4, 5, 0, 1, 2, 3]
    } else {
        // top-left edge and interior
        [3, 4, 5, 0, 1, 2]
    };

    [
        raw[order[0]],
        raw[order[1]],
        raw[order[2]],
        raw[order[3]],
        raw[order[4]],
        raw[order[5]],
    ]
}
