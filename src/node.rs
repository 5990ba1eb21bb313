//! Search-node storage shared by both tree policies (UCT and MC-RAVE), and
//! the `NodeOps` seam that lets the driver (`src/mcts.rs`) stay generic
//! over which policy is active.
//!
//! A node's "children" are not owned pointers: they are transposition-table
//! lookups keyed by the hash obtained after playing one of the node's
//! legal moves. What a node owns directly is just its own running estimate
//! (`mc_mean`/`mc_count`) and, per legal-move slot at the time it was
//! expanded, the UCT visit counts and (for RAVE) the AMAF table.

use crate::mast::Mast;
use crate::zobrist::NodeId;

pub const UCT_C: f64 = 2.0;
pub const RAVE_K: f64 = 500.0;
const INITIAL_V_COUNT: f64 = 1.0;

#[derive(Clone, Debug)]
pub struct Node {
    pub hash_key: u64,
    pub hash_code: u64,
    pub depth: u32,
    /// The player who made the move that produced this node.
    pub player_idx: usize,
    /// The move that produced this node (`takenMove()` at construction).
    pub move_idx: usize,
    pub reachable: bool,
    pub mc_mean: f64,
    pub mc_count: f64,
    /// The legal move reachable through each slot, captured at expansion
    /// time. Positions that are currently free for the *same* occupied-cell
    /// set are always enumerated in the same relative order regardless of
    /// how that set was reached, so this stays valid across transpositions.
    pub child_moves: Vec<usize>,
    /// Per-slot UCT visit counts, indexed by position in the legal-move
    /// enumeration current when this node was expanded.
    pub v_counts: Vec<f64>,
    /// Per-slot RAVE (AMAF) mean; empty on UCT nodes.
    pub r_mean: Vec<f64>,
    /// Per-slot RAVE (AMAF) sample count; empty on UCT nodes.
    pub r_count: Vec<f64>,
    pub fifo_prev: Option<NodeId>,
    pub fifo_next: Option<NodeId>,
    pub on_fifo: bool,
}

impl Node {
    pub fn new(hash_key: u64, depth: u32, player_idx: usize, move_idx: usize) -> Self {
        Node {
            hash_key,
            hash_code: 0,
            depth,
            player_idx,
            move_idx,
            reachable: true,
            mc_mean: 0.5,
            mc_count: 0.0,
            child_moves: Vec::new(),
            v_counts: Vec::new(),
            r_mean: Vec::new(),
            r_count: Vec::new(),
            fifo_prev: None,
            fifo_next: None,
            on_fifo: false,
        }
    }

    pub fn total_visits(&self) -> f64 {
        self.v_counts.iter().sum()
    }

    /// Score reported for the node's own state (used by the driver to pick
    /// a final move at the root and by UI/debug output).
    pub fn state_score(&self) -> f64 {
        self.mc_mean
    }
}

/// Everything beyond the node arena a tree policy needs to score a move
/// and fold a playout result back in. `taken_moves` carries every move
/// index applied so far this round (tree part and random-playout tail
/// alike) in play order, which is what lets RAVE's AMAF update treat the
/// whole game path as "all moves as first" rather than just the
/// in-tree portion.
pub struct SearchContext<'a> {
    pub taken_moves: &'a [usize],
    pub cell_num: usize,
    pub mast: &'a Mast,
}

/// The seam the driver is generic over (`Mcts<N: NodeOps>`), modeling the
/// source's template polymorphism over node kinds via static dispatch
/// instead of a class hierarchy.
pub trait NodeOps {
    fn expand(
        ctx: &SearchContext,
        candidates: &[usize],
        seed_mean: f64,
        hash_key: u64,
        depth: u32,
        player_idx: usize,
        move_idx: usize,
    ) -> Node;

    /// Selection-time urgency of the child reachable via `slot`, given that
    /// child's own current mean and total visit count (mean 0.5, count 0.0
    /// if it has never been materialized). The child's own count — not the
    /// parent's per-slot `v_counts[slot]` — is what a transposed child's
    /// confidence must be keyed on, since several parents can reach it.
    fn action_score(ctx: &SearchContext, node: &Node, slot: usize, child_mean: f64, child_count: f64) -> f64;

    /// Folds a finished playout's `outcome` (1/0/0.5 from this node's own
    /// player's perspective) back into `node`, having descended through
    /// `slot`.
    fn backprop(ctx: &SearchContext, node: &mut Node, slot: usize, outcome: f64);

    /// Root-only variant of `backprop`. Matches the source's documented
    /// omission of refreshing the root's own `mc_mean`/`mc_count`.
    fn backprop_root(ctx: &SearchContext, node: &mut Node, slot: usize, outcome: f64);
}
