use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use serde::Serialize;

use eight_puzzle_solver::bench;
use eight_puzzle_solver::node::PathStep;
use eight_puzzle_solver::solver::Observation;
use eight_puzzle_solver::traits::puzzle::{render_cells, DebugPrintable};
use eight_puzzle_solver::util::read_boards;
use eight_puzzle_solver::{Board, Provenance, Result, SearchConfig, Session, Solution, Strategy};

#[derive(Parser)]
#[command(name = "eight-puzzle", about = "Solve the 8-puzzle with classic search strategies")]
struct Cli {
    /// JSON file overriding search tunables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve one board, or every board in a file
    Solve {
        #[arg(long, required_unless_present_any = ["file", "beliefs"])]
        start: Option<Board>,
        #[arg(long, default_value = "123456780")]
        goal: Board,
        #[arg(long, default_value = "A*")]
        strategy: String,
        /// One board per line
        #[arg(long)]
        file: Option<PathBuf>,
        /// Solve this many distinct scrambled starts instead of --start
        #[arg(long)]
        beliefs: Option<usize>,
        /// Plan one sensorless action sequence from --start, treating the
        /// --beliefs scrambles as further possible starts
        #[arg(long, requires = "beliefs")]
        conformant: bool,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Run several strategies on the same pair
    Compare {
        #[arg(long)]
        start: Board,
        #[arg(long, default_value = "123456780")]
        goal: Board,
        /// Comma-separated tags; all strategies when omitted
        #[arg(long, value_delimiter = ',')]
        strategies: Vec<Strategy>,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        json: bool,
    },
    /// Print random boards solvable toward the goal
    Scramble {
        #[arg(long, default_value = "123456780")]
        goal: Board,
        #[arg(long, default_value_t = 1)]
        count: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Serialize)]
struct SolveOutput<'a> {
    start: Board,
    strategy: Option<Strategy>,
    solved: bool,
    moves: Option<u32>,
    provenance: Option<Provenance>,
    elapsed_secs: f64,
    directions: Option<String>,
    path: Vec<PathStep>,
    trace: &'a [Observation],
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

fn session(config: SearchConfig, seed: Option<u64>) -> Session {
    match seed {
        Some(seed) => Session::seeded(config, seed),
        None => Session::new(config),
    }
}

fn print_solution(solution: &Solution) {
    let label = solution.strategy.map_or_else(|| "unknown".to_string(), |s| s.to_string());
    solution.start.debug_print(None);

    let Some(terminal) = &solution.terminal else {
        println!("{} {} found no solution ({:.3}s)", "✗".red(), label.bold(), solution.elapsed_secs());
        return;
    };

    let boards = terminal.boards();
    for pair in boards.windows(2) {
        pair[1].debug_print(pair[0].moved_tile(&pair[1]));
    }

    let status = match terminal.provenance() {
        Provenance::Exact => "solved".green(),
        Provenance::Reconstructed => "solved via BFS fallback".yellow(),
        Provenance::BestEffort => "best effort, goal not reached".red(),
    };
    println!(
        "{} {} in {} moves [{}] ({:.3}s)",
        label.bold(),
        status,
        terminal.moves(),
        terminal.moves_str(),
        solution.elapsed_secs()
    );

    for observation in &solution.trace {
        println!("step {}:", observation.step);
        println!("{}", render_cells(&observation.known_cells(), None));
    }
}

fn report_solution(solution: &Solution, json: bool) -> Result<()> {
    if json {
        let output = SolveOutput {
            start: solution.start,
            strategy: solution.strategy,
            solved: solution.is_solved(),
            moves: solution.moves(),
            provenance: solution.provenance(),
            elapsed_secs: solution.elapsed_secs(),
            directions: solution.terminal.as_ref().map(|t| t.moves_str()),
            path: solution.path(),
            trace: &solution.trace,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_solution(solution);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::default(),
    };

    match cli.command {
        Command::Solve {
            start,
            goal,
            strategy,
            file,
            beliefs,
            conformant,
            seed,
            json,
        } => {
            let mut starts: Vec<Board> = start.into_iter().collect();
            if let Some(path) = file {
                starts.extend(read_boards(path)?);
            }

            let mut session = session(config, seed).with_progress(progress_bar());
            if let (true, Some(beliefs)) = (conformant, beliefs) {
                for start in &starts {
                    let possible = session.belief_starts(&goal, beliefs)?;
                    let solution = session.solve_conformant(start, &possible, &goal);
                    report_solution(&solution, json)?;
                }
            } else if let Some(beliefs) = beliefs {
                let strategy = strategy.parse::<Strategy>()?;
                for solution in session.solve_beliefs(&goal, beliefs, strategy)? {
                    report_solution(&solution, json)?;
                }
            } else {
                for start in &starts {
                    let solution = session.solve_tagged(start, &goal, &strategy);
                    report_solution(&solution, json)?;
                }
            }
        }
        Command::Compare {
            start,
            goal,
            strategies,
            seed,
            json,
        } => {
            let strategies = if strategies.is_empty() {
                Strategy::ALL.to_vec()
            } else {
                strategies
            };
            let pb = progress_bar();
            pb.set_length(strategies.len() as u64);
            pb.set_message("strategies");
            let reports = bench::compare(&start, &goal, &strategies, &config, seed, Some(&pb));
            pb.finish_and_clear();

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                start.debug_print(None);
                for (family, members) in bench::by_family(&reports) {
                    println!("{}", format!("{:?}", family).as_str().bold());
                    for report in members {
                        let moves = report.moves.map_or_else(|| "-".to_string(), |m| m.to_string());
                        let mark = if report.solved { "✓".green() } else { "✗".red() };
                        println!(
                            "  {} {:<34} {:>4} moves {:>10.4}s {:?}",
                            mark, report.strategy, moves, report.elapsed_secs, report.provenance
                        );
                    }
                }
            }
        }
        Command::Scramble { goal, count, seed } => {
            let mut session = session(config, seed);
            for board in session.belief_starts(&goal, count)? {
                println!("{}", board.cells().iter().map(u8::to_string).collect::<String>());
                board.debug_print(None);
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(err) = run(cli) {
        eprintln!("{} {}", "error:".red().bold(), err);
        process::exit(1);
    }
}
