//! Plain UCT (UCB1 applied to trees) tree policy.

use crate::mast::Mast;
use crate::node::{Node, NodeOps, SearchContext, UCT_C};

/// Zero-sized marker selecting the UCT flavor of `NodeOps`.
pub struct Uct;

impl NodeOps for Uct {
    fn expand(
        _ctx: &SearchContext,
        candidates: &[usize],
        seed_mean: f64,
        hash_key: u64,
        depth: u32,
        player_idx: usize,
        move_idx: usize,
    ) -> Node {
        let mut node = Node::new(hash_key, depth, player_idx, move_idx);
        node.mc_mean = seed_mean;
        node.child_moves = candidates.to_vec();
        node.v_counts = vec![1.0; candidates.len()];
        // Seeded to the legal-move count, not 0, so the first real backprop
        // blends into the prior instead of overwriting it outright.
        node.mc_count = candidates.len() as f64;
        node
    }

    fn action_score(_ctx: &SearchContext, node: &Node, slot: usize, child_mean: f64, _child_count: f64) -> f64 {
        let total = node.total_visits();
        child_mean + (UCT_C * (total + 1.0).ln() / node.v_counts[slot]).sqrt()
    }

    fn backprop(_ctx: &SearchContext, node: &mut Node, slot: usize, outcome: f64) {
        node.v_counts[slot] += 1.0;
        node.mc_count += 1.0;
        node.mc_mean += (outcome - node.mc_mean) / node.mc_count;
    }

    fn backprop_root(ctx: &SearchContext, node: &mut Node, slot: usize, outcome: f64) {
        // No documented asymmetry for plain UCT at the root.
        Self::backprop(ctx, node, slot, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(mast: &Mast) -> SearchContext<'_> {
        SearchContext {
            taken_moves: &[],
            cell_num: 1,
            mast,
        }
    }

    #[test]
    fn expand_seeds_mean_and_initial_vcounts() {
        let mast = Mast::new(8);
        let c = ctx(&mast);
        let n = Uct::expand(&c, &[0, 1, 2], 0.6, 1, 0, 0, 0);
        assert_eq!(n.mc_mean, 0.6);
        assert_eq!(n.v_counts, vec![1.0, 1.0, 1.0]);
        assert_eq!(n.child_moves, vec![0, 1, 2]);
    }

    #[test]
    fn more_visited_slots_have_lower_urgency_all_else_equal() {
        let mast = Mast::new(8);
        let c = ctx(&mast);
        let mut n = Uct::expand(&c, &[0, 1], 0.5, 1, 0, 0, 0);
        n.v_counts[0] = 10.0;
        n.v_counts[1] = 1.0;
        let s0 = Uct::action_score(&c, &n, 0, 0.5, 10.0);
        let s1 = Uct::action_score(&c, &n, 1, 0.5, 1.0);
        assert!(s1 > s0);
    }

    #[test]
    fn expand_seeds_mc_count_from_legal_move_count() {
        let mast = Mast::new(8);
        let c = ctx(&mast);
        let n = Uct::expand(&c, &[0, 1, 2], 0.5, 1, 0, 0, 0);
        assert_eq!(n.mc_count, 3.0);
    }

    #[test]
    fn backprop_blends_into_the_seeded_prior_and_counts_visit() {
        let mast = Mast::new(8);
        let c = ctx(&mast);
        let mut n = Uct::expand(&c, &[0, 1], 0.5, 1, 0, 0, 0);
        let seeded_count = n.mc_count;
        Uct::backprop(&c, &mut n, 0, 1.0);
        assert_eq!(n.v_counts[0], 2.0);
        assert_eq!(n.mc_count, seeded_count + 1.0);
        assert_eq!(n.mc_mean, 0.5 + 0.5 / (seeded_count + 1.0));
        Uct::backprop(&c, &mut n, 0, 0.0);
        assert_eq!(n.mc_count, seeded_count + 2.0);
    }
}
