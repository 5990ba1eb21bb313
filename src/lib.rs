//! Omega-MCTS: a Monte Carlo Tree Search engine for Omega, a two-player
//! territory game played on a hexagonal board.
//!
//! ## Modules
//!
//! - [`cell`] - axial board coordinates and the neighbour table
//! - [`group`] - per-color connected-group bookkeeping
//! - [`gamestate`] - board state, legal-move iteration, scoring
//! - [`mast`] - Move-Average Sampling Technique default policy
//! - [`zobrist`] - incremental hashing and the transposition table
//! - [`node`] - shared search-node storage and the `NodeOps` seam
//! - [`uct`] - plain UCT tree policy
//! - [`rave`] - MC-RAVE tree policy
//! - [`scheduler`] - time-budget fitting and early-stop conditions
//! - [`mcts`] - the search driver and external bot API
//!
//! ## Example
//!
//! ```
//! use omega_mcts::mcts::{AnyMcts, NodeKind};
//!
//! let mut bot = AnyMcts::new(NodeKind::Rave, 3, 10, true, 1 << 14, 2.0, 50, 100, 0.9);
//! let mv = bot.run_search(200);
//! bot.update(mv);
//! ```

pub mod cell;
pub mod gamestate;
pub mod group;
pub mod mast;
pub mod mcts;
pub mod node;
pub mod rave;
pub mod scheduler;
pub mod uct;
pub mod zobrist;
