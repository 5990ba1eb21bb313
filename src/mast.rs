//! Move-Average Sampling Technique: a per-(player, moveIdx) running score
//! table, sampled via a softmax over legal moves and updated by an
//! exponential moving average after each playout step.

const EMA_WEIGHT: f64 = 0.98;
const TEMPERATURE: f64 = 5.0;

/// Per-player move-average table, lazily bootstrapped from a GameState's
/// `get_initial_policy` the first time `setup` runs.
#[derive(Clone, Debug)]
pub struct Mast {
    scores: [Vec<f64>; 2],
    ready: bool,
}

impl Mast {
    pub fn new(move_num: usize) -> Self {
        Mast {
            scores: [vec![0.5; move_num], vec![0.5; move_num]],
            ready: false,
        }
    }

    /// Seeds `scores` from `initial_policy` the first time this is called;
    /// later calls are no-ops, matching the source's lazy-once cache.
    pub fn setup(&mut self, initial_policy: impl FnOnce() -> [Vec<f64>; 2]) {
        if self.ready {
            return;
        }
        self.scores = initial_policy();
        self.ready = true;
    }

    pub fn get_score(&self, move_idx: usize, player_idx: usize) -> f64 {
        self.scores[player_idx][move_idx]
    }

    pub fn get_scores(&self, player_idx: usize) -> &[f64] {
        &self.scores[player_idx]
    }

    /// Blends `outcome` (this player's score for the finished playout) into
    /// every move that player took, via the fixed-weight EMA.
    pub fn update(&mut self, player_idx: usize, move_idx: usize, outcome: f64) {
        let s = &mut self.scores[player_idx][move_idx];
        *s = EMA_WEIGHT * *s + (1.0 - EMA_WEIGHT) * outcome;
    }

    /// Samples one of `candidates` (legal move indices, in the current
    /// enumeration order used by the caller's `vCounts`/child-index arrays)
    /// via a softmax over this player's scores at those moves, temperature
    /// `TEMPERATURE`. Returns `(move_idx, position_in_candidates)` since
    /// callers need both the move and its slot in the caller's own
    /// parallel per-child arrays.
    pub fn select(&self, candidates: &[usize], player_idx: usize) -> (usize, usize) {
        assert!(!candidates.is_empty(), "select on empty candidate list");
        let weights: Vec<f64> = candidates
            .iter()
            .map(|&m| (self.scores[player_idx][m] / TEMPERATURE).exp() + 1e-8)
            .collect();
        let total: f64 = weights.iter().sum();
        let mut pick = fastrand::f64() * total;
        for (i, w) in weights.iter().enumerate() {
            pick -= w;
            if pick <= 0.0 {
                return (candidates[i], i);
            }
        }
        let last = candidates.len() - 1;
        (candidates[last], last)
    }
}
