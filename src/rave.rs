//! MC-RAVE: UCT blended with an All-Moves-As-First (AMAF) table, seeded
//! from MAST and folded in via `beta = sqrt(k/(mcCount+k))`.

use crate::node::{Node, NodeOps, SearchContext, RAVE_K};

/// Zero-sized marker selecting the MC-RAVE flavor of `NodeOps`.
pub struct Rave;

impl Rave {
    fn beta(mc_count: f64) -> f64 {
        (RAVE_K / (mc_count + RAVE_K)).sqrt()
    }

    /// Folds every future move (by the player to act at `node`) found in
    /// `ctx.taken_moves` into the matching child slot's AMAF statistics.
    /// `outcome` is from the acting player's own perspective.
    fn update_rave(ctx: &SearchContext, node: &mut Node, acting_player: usize, outcome: f64) {
        for (i, &mv) in ctx.taken_moves.iter().enumerate() {
            let mover = if i % 2 == 0 { acting_player } else { 1 - acting_player };
            if mover != acting_player {
                continue;
            }
            if let Some(slot) = node.child_moves.iter().position(|&m| m == mv) {
                node.r_count[slot] += 1.0;
                node.r_mean[slot] += (outcome - node.r_mean[slot]) / node.r_count[slot];
            }
        }
    }
}

impl NodeOps for Rave {
    fn expand(
        ctx: &SearchContext,
        candidates: &[usize],
        seed_mean: f64,
        hash_key: u64,
        depth: u32,
        player_idx: usize,
        move_idx: usize,
    ) -> Node {
        let mut node = Node::new(hash_key, depth, player_idx, move_idx);
        node.mc_mean = seed_mean;
        node.mc_count = 1.0;
        node.child_moves = candidates.to_vec();
        node.v_counts = vec![1.0; candidates.len()];

        let acting_player = 1 - player_idx;
        node.r_mean = candidates
            .iter()
            .map(|&m| ctx.mast.get_score(m, acting_player))
            .collect();
        node.r_count = vec![1.0; candidates.len()];
        node
    }

    fn action_score(_ctx: &SearchContext, node: &Node, slot: usize, child_mean: f64, child_count: f64) -> f64 {
        let beta = Self::beta(child_count);
        (1.0 - beta) * child_mean + beta * node.r_mean[slot]
    }

    fn backprop(ctx: &SearchContext, node: &mut Node, slot: usize, outcome: f64) {
        node.v_counts[slot] += 1.0;
        node.mc_count += 1.0;
        node.mc_mean += (outcome - node.mc_mean) / node.mc_count;

        let acting_player = 1 - node.player_idx;
        Self::update_rave(ctx, node, acting_player, 1.0 - outcome);
    }

    fn backprop_root(ctx: &SearchContext, node: &mut Node, slot: usize, outcome: f64) {
        // Documented source behaviour: the root's own mc_mean/mc_count are
        // left untouched by the round that just finished; only the RAVE
        // table for the remaining candidates is refreshed.
        node.v_counts[slot] += 1.0;
        let acting_player = 1 - node.player_idx;
        Self::update_rave(ctx, node, acting_player, 1.0 - outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mast::Mast;

    fn ctx<'a>(mast: &'a Mast, taken_moves: &'a [usize]) -> SearchContext<'a> {
        SearchContext {
            taken_moves,
            cell_num: 19,
            mast,
        }
    }

    #[test]
    fn expand_seeds_rave_table_from_mast() {
        let mut mast = Mast::new(20);
        mast.update(1, 5, 1.0);
        let moves = [];
        let c = ctx(&mast, &moves);
        let n = Rave::expand(&c, &[5, 6], 0.5, 1, 0, 0, 0);
        assert!(n.r_mean[0] > 0.5);
        assert_eq!(n.r_count, vec![1.0, 1.0]);
    }

    #[test]
    fn beta_shrinks_as_visits_grow() {
        assert!(Rave::beta(0.0) > Rave::beta(10_000.0));
    }

    #[test]
    fn backprop_updates_amaf_for_future_same_player_moves() {
        let mast = Mast::new(20);
        // node.player_idx = 0 means white just moved here, so black is to
        // act; move index 3 appears as black's first future move.
        let taken = [3usize, 9, 3];
        let c = ctx(&mast, &taken);
        let mut n = Rave::expand(&c, &[3, 4], 0.5, 1, 0, 0, 0);
        Rave::backprop(&c, &mut n, 0, 1.0);
        assert!(n.r_count[0] > 1.0);
    }
}
