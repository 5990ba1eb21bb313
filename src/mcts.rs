//! The search driver: selection, expansion, simulation and backpropagation
//! tied into one round, plus the external-facing bot API (`reset`, `setup`,
//! `update`, `run_search`) that plays the role of the source's `AiBot`.
//!
//! Generic over `N: NodeOps` rather than a class hierarchy (static dispatch
//! over the node flavor); `AnyMcts` is the small tagged enum the rest of
//! the crate talks to when the flavor is picked at runtime.

use std::marker::PhantomData;
use std::time::Instant;

use crate::gamestate::GameState;
use crate::mast::Mast;
use crate::node::{NodeOps, SearchContext};
use crate::rave::Rave;
use crate::scheduler::{StopScheduler, HOPELESS_THRESHOLD, MIN_CHECK_ELAPSED_MS, WINNING_THRESHOLD};
use crate::uct::Uct;
use crate::zobrist::{NodeId, TranspositionTable};

fn orient(outcome: f64, player_idx: usize) -> f64 {
    if player_idx == 0 {
        outcome
    } else {
        1.0 - outcome
    }
}

pub struct Mcts<N: NodeOps> {
    game: GameState,
    tt: TranspositionTable,
    policy: Mast,
    scheduler: StopScheduler,
    hash_code: u64,
    hash_key: u64,
    root: NodeId,
    recycling: bool,
    playouts: u64,
    _marker: PhantomData<N>,
}

impl<N: NodeOps> Mcts<N> {
    pub fn new(
        board_size: i32,
        table_bits: u32,
        recycling: bool,
        budget: usize,
        scheduler_m: f64,
        reserve_time_ms: u64,
        freq: u32,
        p: f64,
    ) -> Self {
        let mut game = GameState::new(board_size);
        let move_num = game.move_num();
        let tt = TranspositionTable::new(move_num, table_bits, recycling, budget);
        let mut policy = Mast::new(move_num);
        policy.setup(|| game.get_initial_policy());
        let scheduler = StopScheduler::new(game.num_expected_moves(), scheduler_m, reserve_time_ms, freq, p);

        let mut mcts = Mcts {
            game,
            tt,
            policy,
            scheduler,
            hash_code: 0,
            hash_key: 0,
            root: 0,
            recycling,
            playouts: 0,
            _marker: PhantomData,
        };
        mcts.root = mcts.materialize_root();
        mcts
    }

    fn materialize_root(&mut self) -> NodeId {
        let candidates: Vec<usize> = self.game.valid_moves_iter().collect();
        let ctx = SearchContext {
            taken_moves: &[],
            cell_num: self.game.cell_num,
            mast: &self.policy,
        };
        let node = N::expand(&ctx, &candidates, 0.5, self.hash_key, 0, 0, 0);
        self.tt.store(self.hash_code, node)
    }

    pub fn reset(&mut self) {
        self.game.reset();
        self.tt.clear();
        let mut policy = Mast::new(self.game.move_num());
        policy.setup(|| self.game.get_initial_policy());
        self.policy = policy;
        self.hash_code = 0;
        self.hash_key = 0;
        self.playouts = 0;
        self.root = self.materialize_root();
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// Advances the live position by one externally-played move (the bot's
    /// own choice, or the opponent's), promoting/creating the matching
    /// transposition-table node as the new root.
    pub fn update(&mut self, move_idx: usize) {
        self.apply_move(move_idx);
        let old_root = self.root;

        self.root = match self.tt.load(self.hash_code, self.hash_key) {
            Some(id) => id,
            None => {
                let candidates: Vec<usize> = self.game.valid_moves_iter().collect();
                let ctx = SearchContext {
                    taken_moves: &[],
                    cell_num: self.game.cell_num,
                    mast: &self.policy,
                };
                let depth = self.tt.node(old_root).depth + 1;
                let player_idx = move_idx / self.game.cell_num;
                let node = N::expand(&ctx, &candidates, 0.5, self.hash_key, depth, player_idx, move_idx);
                self.tt.store(self.hash_code, node)
            }
        };

        self.tt.mark_all_unreachable();
        self.tt.node_mut(self.root).reachable = true;
        if old_root != self.root {
            self.tt.remove(old_root);
        }
        self.tt.manage_memory();
    }

    fn apply_move(&mut self, move_idx: usize) {
        self.game.update(move_idx);
        let (c, k) = self.tt.zobrist.toggled(self.hash_code, self.hash_key, move_idx);
        self.hash_code = c;
        self.hash_key = k;
    }

    fn undo_move(&mut self, move_idx: usize) {
        self.game.undo();
        let (c, k) = self.tt.zobrist.toggled(self.hash_code, self.hash_key, move_idx);
        self.hash_code = c;
        self.hash_key = k;
    }

    fn pick_slot(&self, node_id: NodeId, candidates: &[usize]) -> usize {
        let node = self.tt.node(node_id);
        let ctx = SearchContext {
            taken_moves: &[],
            cell_num: self.game.cell_num,
            mast: &self.policy,
        };
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        fastrand::shuffle(&mut order);
        let mut best_slot = order[0];
        let mut best_score = f64::NEG_INFINITY;
        for &slot in &order {
            let mv = candidates[slot];
            let (pc, pk) = self.tt.zobrist.toggled(self.hash_code, self.hash_key, mv);
            let (child_mean, child_count) = match self.tt.load(pc, pk) {
                Some(id) => {
                    let child = self.tt.node(id);
                    (child.mc_mean, child.mc_count)
                }
                None => (0.5, 0.0),
            };
            let score = N::action_score(&ctx, node, slot, child_mean, child_count);
            if score > best_score {
                best_score = score;
                best_slot = slot;
            }
        }
        best_slot
    }

    fn expand_here(&mut self, path_len: u32, player_idx: usize, move_idx: usize) -> NodeId {
        let candidates: Vec<usize> = self.game.valid_moves_iter().collect();
        let seed_mean = self.policy.get_score(self.game.taken_move(), self.game.previous_player().index());
        let ctx = SearchContext {
            taken_moves: &[],
            cell_num: self.game.cell_num,
            mast: &self.policy,
        };
        let node = N::expand(&ctx, &candidates, seed_mean, self.hash_key, path_len, player_idx, move_idx);
        self.tt.store(self.hash_code, node)
    }

    /// Runs one selection/expansion/simulation/backpropagation cycle.
    pub fn run_round(&mut self) {
        let mut path: Vec<(NodeId, usize)> = Vec::new();
        let mut taken_moves: Vec<usize> = Vec::new();
        let mut current = self.root;

        while !self.game.end() {
            let candidates: Vec<usize> = self.game.valid_moves_iter().collect();
            let slot = self.pick_slot(current, &candidates);
            let mv = candidates[slot];
            self.apply_move(mv);
            path.push((current, slot));
            taken_moves.push(mv);
            self.tt.node_mut(current).reachable = true;

            match self.tt.load(self.hash_code, self.hash_key) {
                Some(id) => current = id,
                None => {
                    let depth = path.len() as u32;
                    let player_idx = mv / self.game.cell_num;
                    current = self.expand_here(depth, player_idx, mv);
                    break;
                }
            }
        }

        while !self.game.end() {
            let candidates: Vec<usize> = self.game.valid_moves_iter().collect();
            let player_idx = self.game.current_color().index();
            let (mv, _slot) = self.policy.select(&candidates, player_idx);
            self.apply_move(mv);
            taken_moves.push(mv);
        }

        let outcome = self.game.get_score();
        for &mv in &taken_moves {
            let player_idx = mv / self.game.cell_num;
            self.policy.update(player_idx, mv, orient(outcome, player_idx));
        }

        for &mv in taken_moves[path.len()..].iter().rev() {
            self.undo_move(mv);
        }

        for idx in (0..path.len()).rev() {
            let (node_id, slot) = path[idx];
            let mv = taken_moves[idx];
            let future = &taken_moves[idx + 1..];
            let ctx = SearchContext {
                taken_moves: future,
                cell_num: self.game.cell_num,
                mast: &self.policy,
            };
            let player_idx = self.tt.node(node_id).player_idx;
            let node_outcome = orient(outcome, player_idx);
            if idx == 0 {
                N::backprop_root(&ctx, self.tt.node_mut(node_id), slot, node_outcome);
            } else {
                N::backprop(&ctx, self.tt.node_mut(node_id), slot, node_outcome);
            }
            if self.recycling {
                self.tt.fifo_append(node_id);
            }
            self.undo_move(mv);
        }

        self.tt.manage_memory();
        self.playouts += 1;
    }

    /// Most-visited legal move at the root (the "robust child" choice).
    pub fn best_move(&self) -> usize {
        let candidates: Vec<usize> = self.game.valid_moves_iter().collect();
        let root = self.tt.node(self.root);
        let mut best = candidates[0];
        let mut best_visits = f64::NEG_INFINITY;
        for (slot, &mv) in candidates.iter().enumerate() {
            let v = root.v_counts.get(slot).copied().unwrap_or(0.0);
            if v > best_visits {
                best_visits = v;
                best = mv;
            }
        }
        best
    }

    fn root_top_two_visits(&self) -> (f64, f64, f64) {
        let root = self.tt.node(self.root);
        let mut visits: Vec<f64> = root.v_counts.clone();
        visits.sort_by(|a, b| b.partial_cmp(a).unwrap());
        let best_visits = visits.first().copied().unwrap_or(0.0);
        let second_visits = visits.get(1).copied().unwrap_or(0.0);

        let candidates: Vec<usize> = self.game.valid_moves_iter().collect();
        let best_slot = root
            .v_counts
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(0);
        let best_mv = candidates[best_slot];
        let (pc, pk) = self.tt.zobrist.toggled(self.hash_code, self.hash_key, best_mv);
        let best_mean = match self.tt.load(pc, pk) {
            Some(id) => self.tt.node(id).mc_mean,
            None => 0.5,
        };
        (best_visits, second_visits, best_mean)
    }

    /// Searches until the scheduler's time budget or one of its early-stop
    /// conditions fires, then reports the root's most-visited move.
    pub fn run_search(&mut self, time_left_ms: u64) -> usize {
        let n = self.game.num_expected_moves();
        let budget_ms = self.scheduler.schedule(n, time_left_ms);
        let start = Instant::now();
        let mut local_playouts: u64 = 0;

        loop {
            self.run_round();
            local_playouts += 1;

            if !self.scheduler.is_check_tick(local_playouts - 1) {
                continue;
            }
            let elapsed_ms = start.elapsed().as_millis() as u64;
            if elapsed_ms >= budget_ms {
                break;
            }
            if elapsed_ms < MIN_CHECK_ELAPSED_MS {
                continue;
            }

            let (best_visits, second_visits, best_mean) = self.root_top_two_visits();
            if best_mean < HOPELESS_THRESHOLD || best_mean > WINNING_THRESHOLD {
                break;
            }
            let speed = local_playouts as f64 / elapsed_ms as f64;
            let curve_w = self.scheduler.curve(n);
            let gap = self.scheduler.p() / curve_w * speed * (budget_ms - elapsed_ms) as f64;
            if (best_visits - second_visits) > gap {
                break;
            }
        }

        self.best_move()
    }
}

pub enum NodeKind {
    Uct,
    Rave,
}

/// Runtime-selected wrapper over the two statically-dispatched tree
/// policies.
pub enum AnyMcts {
    Uct(Mcts<Uct>),
    Rave(Mcts<Rave>),
}

impl AnyMcts {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: NodeKind,
        board_size: i32,
        table_bits: u32,
        recycling: bool,
        budget: usize,
        scheduler_m: f64,
        reserve_time_ms: u64,
        freq: u32,
        p: f64,
    ) -> Self {
        match kind {
            NodeKind::Uct => AnyMcts::Uct(Mcts::new(
                board_size,
                table_bits,
                recycling,
                budget,
                scheduler_m,
                reserve_time_ms,
                freq,
                p,
            )),
            NodeKind::Rave => AnyMcts::Rave(Mcts::new(
                board_size,
                table_bits,
                recycling,
                budget,
                scheduler_m,
                reserve_time_ms,
                freq,
                p,
            )),
        }
    }

    pub fn reset(&mut self) {
        match self {
            AnyMcts::Uct(m) => m.reset(),
            AnyMcts::Rave(m) => m.reset(),
        }
    }

    pub fn update(&mut self, move_idx: usize) {
        match self {
            AnyMcts::Uct(m) => m.update(move_idx),
            AnyMcts::Rave(m) => m.update(move_idx),
        }
    }

    pub fn run_search(&mut self, time_left_ms: u64) -> usize {
        match self {
            AnyMcts::Uct(m) => m.run_search(time_left_ms),
            AnyMcts::Rave(m) => m.run_search(time_left_ms),
        }
    }

    pub fn run_round(&mut self) {
        match self {
            AnyMcts::Uct(m) => m.run_round(),
            AnyMcts::Rave(m) => m.run_round(),
        }
    }

    pub fn game(&self) -> &GameState {
        match self {
            AnyMcts::Uct(m) => m.game(),
            AnyMcts::Rave(m) => m.game(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uct_engine_plays_a_full_small_game() {
        let mut bot = Mcts::<Uct>::new(3, 6, false, 256, 2.0, 1, 4, 0.9);
        let total_moves = bot.game().num_expected_moves() * 4;
        for _ in 0..total_moves {
            assert!(!bot.game().end());
            for _ in 0..8 {
                bot.run_round();
            }
            let mv = bot.best_move();
            bot.update(mv);
        }
        assert!(bot.game().end());
    }

    #[test]
    fn rave_engine_plays_a_full_small_game_with_recycling() {
        let mut bot = Mcts::<Rave>::new(3, 6, true, 256, 2.0, 1, 4, 0.9);
        let total_moves = bot.game().num_expected_moves() * 4;
        for _ in 0..total_moves {
            assert!(!bot.game().end());
            for _ in 0..8 {
                bot.run_round();
            }
            let mv = bot.best_move();
            bot.update(mv);
        }
        assert!(bot.game().end());
    }

    #[test]
    fn reset_returns_to_the_initial_position() {
        let mut bot = Mcts::<Uct>::new(3, 6, false, 256, 2.0, 1, 4, 0.9);
        let mv = bot.game().get_random_move();
        bot.update(mv);
        bot.reset();
        assert_eq!(bot.game().num_expected_moves(), GameState::new(3).num_expected_moves());
    }

    #[test]
    fn run_search_returns_a_currently_legal_move() {
        let mut bot = Mcts::<Uct>::new(3, 6, false, 256, 2.0, 1, 4, 0.9);
        let mv = bot.run_search(200);
        let legal: Vec<usize> = bot.game().valid_moves_iter().collect();
        assert!(legal.contains(&mv));
    }
}
