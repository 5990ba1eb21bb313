//! Omega board state: axial hex cells, incremental group merging with full
//! undo, legal-move iteration, terminal detection, and the MAST prior
//! bootstrap (`get_initial_policy`).

use std::collections::HashMap;

use crate::cell::{is_valid_ax, neighbour_order, Ax, Cell, Color};
use crate::group::Group;

/// Doubly-linked free-cell list, backed by flat `idx -> idx` adjacency
/// arrays indexed directly by `cellIdx` (no separate backing-store/lookup
/// split is needed once the arrays are sized to `cellNum` and indexed by
/// cell index directly).
#[derive(Clone, Debug)]
struct ValidMoves {
    cell_num: usize,
    next: Vec<Option<usize>>,
    prev: Vec<Option<usize>>,
    first: Option<usize>,
    taken: Vec<usize>,
    size: usize,
    /// Toggled on every `remove`; the piece color of the *next* move.
    color: u8,
}

impl ValidMoves {
    fn new(cell_num: usize) -> Self {
        let mut order: Vec<usize> = (0..cell_num).collect();
        fastrand::shuffle(&mut order);

        let mut next = vec![None; cell_num];
        let mut prev = vec![None; cell_num];
        for w in order.windows(2) {
            let (a, b) = (w[0], w[1]);
            next[a] = Some(b);
            prev[b] = Some(a);
        }

        ValidMoves {
            cell_num,
            next,
            prev,
            first: order.first().copied(),
            taken: Vec::new(),
            size: cell_num,
            color: 0,
        }
    }

    fn remove(&mut self, cell_idx: usize) {
        self.color = 1 - self.color;
        match self.prev[cell_idx] {
            Some(p) => self.next[p] = self.next[cell_idx],
            None => self.first = self.next[cell_idx],
        }
        if let Some(n) = self.next[cell_idx] {
            self.prev[n] = self.prev[cell_idx];
        }
        self.taken.push(cell_idx);
        self.size -= 1;
    }

    fn undo(&mut self) {
        self.color = 1 - self.color;
        let idx = self.taken.pop().expect("undo on empty ValidMoves");
        if self.first.is_none() {
            self.first = Some(idx);
            self.size += 1;
            return;
        }
        match self.prev[idx] {
            Some(p) => self.next[p] = Some(idx),
            None => self.first = Some(idx),
        }
        if let Some(n) = self.next[idx] {
            self.prev[n] = Some(idx);
        }
        self.size += 1;
    }

    fn size(&self) -> usize {
        self.size
    }

    /// Current head of the free-cell list, oriented by the piece color
    /// whose turn it is to place next.
    fn get_random_move(&self) -> usize {
        self.first.expect("no free cells") + self.cell_num * self.color as usize
    }

    fn iter(&self) -> ValidMovesIter<'_> {
        ValidMovesIter {
            moves: self,
            cur: self.first,
        }
    }
}

struct ValidMovesIter<'a> {
    moves: &'a ValidMoves,
    cur: Option<usize>,
}

impl Iterator for ValidMovesIter<'_> {
    type Item = usize;
    fn next(&mut self) -> Option<usize> {
        let idx = self.cur?;
        self.cur = self.moves.next[idx];
        Some(idx + self.moves.cell_num * self.moves.color as usize)
    }
}

/// Omega game state for a board of side length `n`.
#[derive(Clone, Debug)]
pub struct GameState {
    board_size: i32,
    pub cell_num: usize,
    cells: Vec<Cell>,
    groups: [Vec<Group>; 2],
    player_scores: [i64; 2],
    current_color: Color,
    current_player: Color,
    previous_player: Color,
    move_idxs: Vec<usize>,
    num_steps: u32,
    valid_moves: ValidMoves,
}

impl GameState {
    pub fn new(board_size: i32) -> Self {
        assert!(board_size >= 2, "boardSize must be >= 2");
        let cell_num = Self::compute_cell_num(board_size);
        let (cells, _) = Self::build_cells(board_size, cell_num);
        GameState {
            board_size,
            cell_num,
            cells,
            groups: [Vec::new(), Vec::new()],
            player_scores: [0, 0],
            current_color: Color::White,
            current_player: Color::White,
            previous_player: Color::White,
            move_idxs: Vec::new(),
            num_steps: (cell_num as u32) - (cell_num as u32) % 4,
            valid_moves: ValidMoves::new(cell_num),
        }
    }

    pub fn reset(&mut self) {
        *self = GameState::new(self.board_size);
    }

    fn compute_cell_num(board_size: i32) -> usize {
        (1 + 3 * board_size * (board_size - 1)) as usize
    }

    fn build_cells(board_size: i32, cell_num: usize) -> (Vec<Cell>, HashMap<(i32, i32), usize>) {
        let mut cells = Vec::with_capacity(cell_num);
        let mut ax_to_idx = HashMap::with_capacity(cell_num);
        let mut idx = 0usize;
        for q in -(board_size - 1)..board_size {
            for r in -(board_size - 1)..board_size {
                if is_valid_ax(Ax::new(q, r), board_size) {
                    cells.push(Cell::new(q, r, idx));
                    ax_to_idx.insert((q, r), idx);
                    idx += 1;
                }
            }
        }
        for i in 0..cells.len() {
            let (q, r) = (cells[i].q, cells[i].r);
            let order = neighbour_order(q, r, board_size);
            let neighbours: Vec<usize> = order
                .iter()
                .filter(|ax| is_valid_ax(**ax, board_size))
                .map(|ax| ax_to_idx[&(ax.q, ax.r)])
                .collect();
            cells[i].neighbours = neighbours;
        }
        (cells, ax_to_idx)
    }

    // ---- queries ----

    pub fn current_color(&self) -> Color {
        self.current_color
    }

    pub fn current_player(&self) -> Color {
        self.current_player
    }

    pub fn previous_player(&self) -> Color {
        self.previous_player
    }

    pub fn end(&self) -> bool {
        self.num_steps == 0
    }

    pub fn leader(&self) -> Color {
        if self.player_scores[0] > self.player_scores[1] {
            Color::White
        } else if self.player_scores[0] < self.player_scores[1] {
            Color::Black
        } else {
            Color::Empty
        }
    }

    pub fn get_score(&self) -> f64 {
        if self.player_scores[0] > self.player_scores[1] {
            1.0
        } else if self.player_scores[0] < self.player_scores[1] {
            0.0
        } else {
            0.5
        }
    }

    pub fn player_scores(&self) -> [i64; 2] {
        self.player_scores
    }

    pub fn taken_move(&self) -> usize {
        *self.move_idxs.last().expect("no move has been taken")
    }

    pub fn num_expected_moves(&self) -> u32 {
        (self.num_steps + 2) / 4
    }

    pub fn get_random_move(&self) -> usize {
        self.valid_moves.get_random_move()
    }

    pub fn move_num(&self) -> usize {
        self.cell_num * 2
    }

    pub fn to_move_idx(&self, cell_idx: usize, piece_idx: usize) -> usize {
        cell_idx + piece_idx * self.cell_num
    }

    pub fn last_taken_cell_idx(&self) -> usize {
        self.taken_move() % self.cell_num
    }

    pub fn get_white_cell(&self) -> usize {
        let n = self.move_idxs.len();
        let idx = if n % 2 == 0 { n - 2 } else { n - 1 };
        self.move_idxs[idx]
    }

    pub fn get_black_cell(&self) -> usize {
        let n = self.move_idxs.len();
        let idx = if n % 2 == 1 { n - 2 } else { n - 1 };
        self.move_idxs[idx] - self.cell_num
    }

    pub fn valid_moves_iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.valid_moves.iter()
    }

    pub fn valid_moves_len(&self) -> usize {
        self.valid_moves.size()
    }

    // ---- forward / backward updates ----

    pub fn update(&mut self, move_idx: usize) {
        self.move_idxs.push(move_idx);
        let cell_idx = self.last_taken_cell_idx();
        self.valid_moves.remove(cell_idx);
        self.cells[cell_idx].color = self.current_color;
        self.merge_groups(cell_idx);
        self.num_steps -= 1;
        self.update_colors();
    }

    pub fn undo(&mut self) {
        assert!(!self.move_idxs.is_empty(), "undo on empty move stack");
        let cell_idx = self.last_taken_cell_idx();
        self.decompose_group(cell_idx);
        self.num_steps += 1;
        self.undo_colors();
        self.valid_moves.undo();
        self.move_idxs.pop();
    }

    fn update_colors(&mut self) {
        if self.current_color == Color::White {
            self.current_color = Color::Black;
            self.previous_player = self.previous_player.opposite();
        } else {
            self.previous_player = self.current_player;
            self.current_player = self.current_player.opposite();
            self.current_color = Color::White;
        }
    }

    fn undo_colors(&mut self) {
        if self.current_color == Color::White {
            self.current_color = Color::Black;
            self.current_player = self.current_player.opposite();
        } else {
            self.current_color = Color::White;
        }
    }

    fn resolve_group(&self, ci: usize, group_id: usize) -> usize {
        let mut gid = group_id;
        while self.groups[ci][gid].id != gid {
            gid = self.groups[ci][gid].id;
        }
        gid
    }

    /// Same-color neighbour group ids of `cell_idx`, each counted once, in
    /// the order encountered walking the cell's neighbour list.
    fn neighbour_group_ids(&self, cell_idx: usize, color: Color) -> Vec<usize> {
        let ci = color.index();
        let mut seen = vec![false; self.groups[ci].len()];
        let mut out = Vec::new();
        for &n in &self.cells[cell_idx].neighbours {
            if self.cells[n].color == color {
                let gid = self.resolve_group(ci, self.cells[n].group_id.unwrap());
                if !seen[gid] {
                    seen[gid] = true;
                    out.push(gid);
                }
            }
        }
        out
    }

    fn merge_groups(&mut self, cell_idx: usize) {
        let color = self.cells[cell_idx].color;
        let ci = color.index();

        let added = if !self.groups[ci].is_empty() {
            self.neighbour_group_ids(cell_idx, color)
        } else {
            self.player_scores[ci] = 1;
            Vec::new()
        };

        if added.is_empty() {
            let group_id = self.groups[ci].len();
            self.cells[cell_idx].group_id = Some(group_id);
            self.groups[ci].push(Group::new(group_id, 1));
            return;
        }

        let survivor_id = added[0];
        self.cells[cell_idx].group_id = Some(survivor_id);

        let mut new_size: u32 = 1;
        for &gid in &added {
            let size = self.groups[ci][gid].size;
            new_size += size;
            self.player_scores[ci] /= size as i64;
            self.groups[ci][gid].id = survivor_id;
        }
        let absorbed = added[1..].to_vec();
        self.groups[ci][survivor_id].added_group_ids.push(absorbed);
        self.groups[ci][survivor_id].size = new_size;
        self.player_scores[ci] *= new_size as i64;
    }

    fn decompose_group(&mut self, cell_idx: usize) {
        let color = self.cells[cell_idx].color;
        self.cells[cell_idx].color = Color::Empty;
        let ci = color.index();
        let group_id = self.cells[cell_idx]
            .group_id
            .expect("placed cell must carry a group id");

        if self.groups[ci][group_id].size == 1 {
            self.groups[ci].pop();
            return;
        }

        self.player_scores[ci] /= self.groups[ci][group_id].size as i64;
        self.groups[ci][group_id].size -= 1;

        let absorbed = self.groups[ci][group_id]
            .added_group_ids
            .pop()
            .expect("merged group must have merge history");
        for cgid in absorbed {
            let csize = self.groups[ci][cgid].size;
            self.player_scores[ci] *= csize as i64;
            self.groups[ci][group_id].size -= csize;
            self.groups[ci][cgid].id = cgid;
        }

        self.player_scores[ci] *= self.groups[ci][group_id].size as i64;
    }

    /// Drives this GameState through 50,000 random full-game playouts (using
    /// its own `update`/`undo`, fully rewound afterwards) and returns the
    /// per-(color, moveIdx) mean outcome, seeded at 0.5 with one prior
    /// sample of confidence.
    pub fn get_initial_policy(&mut self) -> [Vec<f64>; 2] {
        const N_PLAYOUTS: usize = 50_000;
        let move_num = self.move_num();
        let mut scores = [vec![0.5f64; move_num], vec![0.5f64; move_num]];
        let mut counts = vec![1.0f64; move_num];
        let mut cell_idxs: Vec<usize> = (0..self.cell_num).collect();

        for _ in 0..N_PLAYOUTS {
            fastrand::shuffle(&mut cell_idxs);
            let mut r_move_idxs = Vec::with_capacity(self.cell_num);
            let mut i = 0usize;
            while self.num_steps > 0 {
                let move_idx = cell_idxs[i] + self.cell_num * self.current_color.index();
                r_move_idxs.push(move_idx);
                self.update(move_idx);
                i += 1;
            }
            let outcome = self.get_score();
            for &m in r_move_idxs.iter().rev() {
                self.undo();
                scores[0][m] = (scores[0][m] * counts[m] + outcome) / (counts[m] + 1.0);
                scores[1][m] = (scores[1][m] * counts[m] + (1.0 - outcome)) / (counts[m] + 1.0);
                counts[m] += 1.0;
            }
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_num_matches_closed_form() {
        assert_eq!(GameState::compute_cell_num(2), 7);
        assert_eq!(GameState::compute_cell_num(3), 19);
        assert_eq!(GameState::new(2).cell_num, 7);
        assert_eq!(GameState::new(3).cell_num, 19);
    }

    #[test]
    fn num_steps_multiple_of_four() {
        let gs = GameState::new(3);
        assert_eq!(gs.num_expected_moves(), (16 + 2) / 4);
        assert!(!gs.end());
    }

    #[test]
    fn update_then_undo_restores_state() {
        let mut gs = GameState::new(3);
        let before_scores = gs.player_scores();
        let before_steps = gs.num_steps;
        let move_idx = gs.get_random_move();
        gs.update(move_idx);
        assert_ne!(gs.num_steps, before_steps);
        gs.undo();
        assert_eq!(gs.player_scores(), before_scores);
        assert_eq!(gs.num_steps, before_steps);
        assert_eq!(gs.current_color, Color::White);
        assert_eq!(gs.current_player, Color::White);
        assert_eq!(gs.valid_moves.size(), gs.cell_num);
    }

    #[test]
    fn toMoveIdx_round_trip() {
        let gs = GameState::new(3);
        for cell_idx in [0usize, 5, 18] {
            for piece in [0usize, 1] {
                let m = gs.to_move_idx(cell_idx, piece);
                assert_eq!(m % gs.cell_num, cell_idx);
                assert_eq!(m / gs.cell_num, piece);
            }
        }
    }

    #[test]
    fn full_game_terminates_with_white_then_black_each_round() {
        let mut gs = GameState::new(2);
        assert_eq!(gs.cell_num, 7);
        let total_moves = gs.num_expected_moves() * 4;
        for i in 0..total_moves {
            assert!(!gs.end());
            let mv = gs.get_random_move();
            let expected_piece = if i % 2 == 0 { 0 } else { 1 };
            assert_eq!(mv / gs.cell_num, expected_piece);
            gs.update(mv);
        }
        assert!(gs.end());
        let score = gs.get_score();
        assert!(score == 0.0 || score == 0.5 || score == 1.0);
    }

    #[test]
    fn undo_stress_returns_to_identical_snapshot() {
        let mut gs = GameState::new(3);
        let mut applied = Vec::new();
        for _ in 0..10 {
            let mv = gs.get_random_move();
            applied.push(mv);
            gs.update(mv);
        }
        let snapshot_scores = gs.player_scores();
        let snapshot_steps = gs.num_steps;
        let snapshot_color = gs.current_color;
        let snapshot_player = gs.current_player;
        for _ in 0..10 {
            gs.undo();
        }
        assert_eq!(gs.player_scores(), [0, 0]);
        assert_eq!(gs.num_steps, GameState::new(3).num_steps);
        assert_eq!(gs.current_color, Color::White);
        assert_eq!(gs.current_player, Color::White);
        assert_eq!(gs.valid_moves.size(), gs.cell_num);
        let _ = (snapshot_scores, snapshot_steps, snapshot_color, snapshot_player);
    }

    #[test]
    fn player_scores_match_group_size_products() {
        let mut gs = GameState::new(3);
        for _ in 0..8 {
            let mv = gs.get_random_move();
            gs.update(mv);
        }
        for color in [Color::White, Color::Black] {
            let ci = color.index();
            let product: i64 = gs.groups[ci].iter().map(|g| g.size as i64).product();
            assert_eq!(product, gs.player_scores[ci]);
        }
    }

    #[test]
    fn valid_moves_visits_each_free_cell_once() {
        let mut gs = GameState::new(3);
        for _ in 0..4 {
            let mv = gs.get_random_move();
            gs.update(mv);
        }
        let visited: Vec<usize> = gs.valid_moves_iter().collect();
        assert_eq!(visited.len(), gs.valid_moves_len());
        let mut cell_idxs: Vec<usize> = visited.iter().map(|m| m % gs.cell_num).collect();
        cell_idxs.sort_unstable();
        cell_idxs.dedup();
        assert_eq!(cell_idxs.len(), visited.len());
    }

    #[test]
    fn initial_policy_scores_are_probabilities() {
        let mut gs = GameState::new(2);
        let policy = gs.get_initial_policy();
        for color_scores in &policy {
            for &s in color_scores {
                assert!((0.0..=1.0).contains(&s));
            }
        }
        // get_initial_policy fully rewinds the GameState.
        assert_eq!(gs.num_steps, GameState::new(2).num_steps);
        assert!(gs.move_idxs.is_empty());
    }
}
