//! Omega-MCTS: a Monte Carlo Tree Search engine for Omega.
//!
//! - `omega-mcts` / `omega-mcts selfplay` - play the engine against itself
//!   on an empty board and print the move-by-move game
//! - `omega-mcts bench` - run a fixed number of search rounds from the
//!   empty board and report playouts per second

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};

use omega_mcts::mcts::{AnyMcts, NodeKind};

/// Omega-MCTS: a Monte Carlo Tree Search engine for the Omega board game
#[derive(Parser)]
#[command(name = "omega-mcts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the engine against itself and print the resulting game
    Selfplay(SelfplayArgs),
    /// Run a fixed number of search rounds and report throughput
    Bench(BenchArgs),
}

#[derive(Copy, Clone, ValueEnum)]
enum NodeKindArg {
    Uct,
    Rave,
}

impl From<NodeKindArg> for NodeKind {
    fn from(kind: NodeKindArg) -> Self {
        match kind {
            NodeKindArg::Uct => NodeKind::Uct,
            NodeKindArg::Rave => NodeKind::Rave,
        }
    }
}

#[derive(clap::Args)]
struct SelfplayArgs {
    /// Hex board side length (cellNum = 1 + 3*n*(n-1))
    #[arg(long, default_value_t = 3)]
    board_size: i32,
    /// Tree policy to search with
    #[arg(long, value_enum, default_value_t = NodeKindArg::Rave)]
    node_kind: NodeKindArg,
    /// Use the unbounded recycling transposition table instead of the
    /// capped non-recycling one
    #[arg(long, default_value_t = false)]
    recycling: bool,
    /// Time budget per move, in milliseconds
    #[arg(long, default_value_t = 1000)]
    time_per_move_ms: u64,
    /// log2 of the transposition table's bucket count
    #[arg(long, default_value_t = 16)]
    table_bits: u32,
}

#[derive(clap::Args)]
struct BenchArgs {
    #[arg(long, default_value_t = 3)]
    board_size: i32,
    #[arg(long, value_enum, default_value_t = NodeKindArg::Uct)]
    node_kind: NodeKindArg,
    #[arg(long, default_value_t = false)]
    recycling: bool,
    /// Number of search rounds to run from the empty board
    #[arg(long, default_value_t = 2000)]
    rounds: u32,
    #[arg(long, default_value_t = 16)]
    table_bits: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Selfplay(args)) => selfplay(args),
        Some(Commands::Bench(args)) => bench(args),
        None => selfplay(SelfplayArgs {
            board_size: 3,
            node_kind: NodeKindArg::Rave,
            recycling: false,
            time_per_move_ms: 1000,
            table_bits: 16,
        }),
    }
}

fn make_bot(kind: NodeKindArg, board_size: i32, table_bits: u32, recycling: bool) -> Result<AnyMcts> {
    if board_size < 2 {
        bail!("board-size must be >= 2, got {board_size}");
    }
    if !(1..64).contains(&table_bits) {
        bail!("table-bits must be in 1..64, got {table_bits}");
    }
    let budget = 1usize << table_bits.min(20);
    Ok(AnyMcts::new(kind.into(), board_size, table_bits, recycling, budget, 2.0, 50, 100, 0.9))
}

fn selfplay(args: SelfplayArgs) -> Result<()> {
    let mut bot = make_bot(args.node_kind, args.board_size, args.table_bits, args.recycling)?;

    println!("Omega self-play on a size-{} board", args.board_size);
    let mut ply = 0u32;
    while !bot.game().end() {
        let mv = bot.run_search(args.time_per_move_ms);
        let cell_num = bot.game().cell_num;
        let color = if mv / cell_num == 0 { "white" } else { "black" };
        println!("ply {ply}: {color} plays cell {}", mv % cell_num);
        bot.update(mv);
        ply += 1;
    }

    let scores = bot.game().player_scores();
    println!("final score: white {} - black {}", scores[0], scores[1]);
    println!("leader: {}", bot.game().leader());
    Ok(())
}

fn bench(args: BenchArgs) -> Result<()> {
    let mut bot = make_bot(args.node_kind, args.board_size, args.table_bits, args.recycling)?;

    let start = std::time::Instant::now();
    for _ in 0..args.rounds {
        bot.run_round();
    }
    let elapsed = start.elapsed();
    let rate = args.rounds as f64 / elapsed.as_secs_f64();
    println!(
        "{} rounds in {:.3}s ({:.0} playouts/sec) on a size-{} board",
        args.rounds,
        elapsed.as_secs_f64(),
        rate,
        args.board_size
    );
    Ok(())
}
