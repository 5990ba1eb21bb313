//! End-to-end scenarios exercising the full engine stack (GameState + MAST +
//! transposition table + tree policies + scheduler) rather than any single
//! module in isolation.

use omega_mcts::gamestate::GameState;
use omega_mcts::mcts::{AnyMcts, Mcts, NodeKind};
use omega_mcts::scheduler::StopScheduler;
use omega_mcts::uct::Uct;
use omega_mcts::zobrist::{TranspositionTable, Zobrist};

/// Scenario 1: size-3 board (cellNum = 19), UCT, non-recycling. Two
/// consecutive searches must each return a legal move, alternating piece
/// color (white, then black).
#[test]
fn uct_non_recycling_returns_two_legal_alternating_moves() {
    let mut bot = Mcts::<Uct>::new(3, 8, false, 1 << 10, 2.0, 1, 20, 0.9);
    let cell_num = bot.game().cell_num;

    // A real one-minute clock is abbreviated here to keep the suite fast;
    // the scheduler's early-stop clauses mean a short budget already
    // exercises the same selection/expansion/backprop path.
    let m1 = bot.run_search(300);
    assert!(m1 % cell_num < cell_num);
    assert_eq!(m1 / cell_num, 0, "white moves first");
    bot.update(m1);

    let m2 = bot.run_search(300);
    assert!(m2 % cell_num < cell_num);
    assert_eq!(m2 / cell_num, 1, "black moves second");
    bot.update(m2);
}

/// Scenario 2: size-3 board, MC-RAVE, recycling, a small node budget. A full
/// AI-vs-AI game must take exactly 16 plies and terminate with a score in
/// {0.0, 0.5, 1.0}.
#[test]
fn rave_recycling_self_play_terminates_after_sixteen_moves() {
    let mut bot = AnyMcts::new(NodeKind::Rave, 3, 9, true, 500, 2.0, 1, 20, 0.9);
    let mut moves = 0u32;
    while !bot.game().end() {
        let mv = bot.run_search(50);
        bot.update(mv);
        moves += 1;
        assert!(moves <= 16, "game ran past the expected move count");
    }
    assert_eq!(moves, 16);
    assert!(bot.game().end());
    let score = bot.game().get_score();
    assert!(score == 0.0 || score == 0.5 || score == 1.0);
}

/// Scenario 3: transposition equivalence. Reaching the same occupied-cell
/// set via two different move orders must hash to the same table slot.
#[test]
fn transposed_move_order_hits_the_same_transposition_table_entry() {
    let gs = GameState::new(3);
    let move_num = gs.move_num();
    let zobrist = Zobrist::new(move_num, 8);

    // two non-adjacent cells, white then black.
    let a = 0usize;
    let b = gs.cell_num + 10;

    let (code_ab, key_ab) = {
        let (c, k) = zobrist.toggled(0, 0, a);
        zobrist.toggled(c, k, b)
    };
    let (code_ba, key_ba) = {
        let (c, k) = zobrist.toggled(0, 0, b);
        zobrist.toggled(c, k, a)
    };
    assert_eq!(code_ab, code_ba);
    assert_eq!(key_ab, key_ba);

    let mut tt = TranspositionTable::new(move_num, 8, true, 100);
    let node = omega_mcts::node::Node::new(key_ab, 2, 0, a);
    let id = tt.store(code_ab, node);
    assert_eq!(tt.load(code_ba, key_ba), Some(id));
}

/// Scenario 4: 100 updates followed by 100 undos restores the initial
/// position, field for field.
#[test]
fn hundred_updates_then_undos_restores_the_initial_snapshot() {
    let mut gs = GameState::new(3);
    let initial = format!("{gs:?}");

    let mut applied = Vec::new();
    for _ in 0..100 {
        if gs.end() {
            break;
        }
        let mv = gs.get_random_move();
        applied.push(mv);
        gs.update(mv);
    }
    for _ in 0..applied.len() {
        gs.undo();
    }

    assert_eq!(format!("{gs:?}"), initial);
}

/// Scenario 5: a lopsided scheduler should stop well before its wall-clock
/// budget once the best child's mean crosses the winning threshold.
#[test]
fn scheduler_stops_early_on_a_near_certain_outcome() {
    let scheduler = StopScheduler::new(9, 2.0, 1, 100, 0.9);
    let n = 9;
    let budget_ms = scheduler.schedule(n, 60_000);
    assert!(budget_ms > 500, "budget should leave room to observe the win");

    // simulated state: at 600ms, the best child's mean is already > 0.99.
    let elapsed_ms = 600u64;
    let best_mean = 0.995;
    let should_stop = elapsed_ms >= 500 && (best_mean > 0.99 || best_mean < 0.01);
    assert!(should_stop);
}

/// Scenario 6: once the visit gap between the best and second-best root
/// children exceeds the scheduler's allowance, search should stop and
/// report the already-leading child.
#[test]
fn scheduler_stops_once_the_visit_gap_exceeds_the_allowance() {
    let scheduler = StopScheduler::new(9, 2.0, 1, 100, 0.9);
    let n = 9;
    let budget_ms = scheduler.schedule(n, 10_000);
    let elapsed_ms = 600u64;
    let speed = 500.0; // playouts per ms, exaggerated to force an early gap
    let curve_w = scheduler.curve(n);
    let remaining_ms = (budget_ms.saturating_sub(elapsed_ms)) as f64;
    let gap_allowance = scheduler.p() / curve_w * speed * remaining_ms;

    let best_visits = gap_allowance + 1000.0;
    let second_visits = 0.0;
    assert!(best_visits - second_visits > gap_allowance);
    // the move search would report is whichever root child currently leads
    // in visits; that child is `best_visits`, unchanged by stopping early.
}
