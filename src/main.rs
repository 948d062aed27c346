use std::collections::BTreeSet;

use clap::Parser;
use cut_grouper::config::{EngineConfig, Strategy};
use cut_grouper::logging;
use cut_grouper::render;
use cut_grouper::solver::Solver;
use cut_grouper::types::{GroupRow, Piece};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "cut_grouper",
    about = "Groups stock pieces into width-bounded, length-balanced cuts"
)]
struct Cli {
    /// Smallest allowed total width of a group
    #[arg(long)]
    min_width: u32,

    /// Largest allowed total width of a group
    #[arg(long)]
    max_width: u32,

    /// Largest allowed difference of length x qty inside a group (default: 0)
    #[arg(long, default_value_t = 0)]
    tolerance: u64,

    /// Most partners searched per anchor piece
    #[arg(long, default_value_t = 3)]
    max_partner: usize,

    /// Selection strategy: greedy or dp
    #[arg(long, default_value = "greedy", value_parser = parse_strategy)]
    strategy: Strategy,

    /// Pieces as id:WxL:qty (e.g. 1:50x100:20 2:30x150:15)
    #[arg(long = "pieces", num_args = 1..)]
    pieces: Vec<String>,

    /// Show an ASCII bar for each group
    #[arg(long)]
    layout: bool,

    /// Print rows and residual as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn parse_strategy(s: &str) -> Result<Strategy, String> {
    match s {
        "greedy" => Ok(Strategy::Greedy),
        "dp" => Ok(Strategy::Dp),
        _ => Err(format!("invalid strategy '{}', expected: greedy or dp", s)),
    }
}

fn parse_dimensions(s: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected WxL", s));
    }
    let width = parts[0]
        .parse::<u32>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    let length = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid length in '{}'", s))?;
    if width == 0 || length == 0 {
        return Err(format!("dimensions must be non-zero in '{}'", s));
    }
    Ok((width, length))
}

fn parse_piece(s: &str) -> Result<Piece, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("invalid piece '{}', expected id:WxL:qty", s));
    }
    let id = parts[0]
        .parse::<u32>()
        .map_err(|_| format!("invalid id in '{}'", s))?;
    let (width, length) = parse_dimensions(parts[1])?;
    let qty = parts[2]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    Ok(Piece::new(id, width, length, qty))
}

fn parse_pieces(tokens: &[String]) -> Result<Vec<Piece>, String> {
    let pieces = tokens
        .iter()
        .map(|t| parse_piece(t))
        .collect::<Result<Vec<_>, _>>()?;
    let mut ids = BTreeSet::new();
    for p in &pieces {
        if !ids.insert(p.id) {
            return Err(format!("duplicate piece id {}", p.id));
        }
    }
    Ok(pieces)
}

#[derive(Serialize)]
struct JsonReport {
    rows: Vec<GroupRow>,
    residual: Vec<Piece>,
    group_count: usize,
    utilization_percent: f64,
}

fn main() {
    let cli = Cli::parse();
    logging::init();

    let pieces = parse_pieces(&cli.pieces).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let config = EngineConfig::new(cli.min_width, cli.max_width, cli.tolerance, cli.max_partner)
        .with_strategy(cli.strategy);
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let window = config.window();
    let solution = Solver::new(config, pieces).solve();

    if cli.json {
        let report = JsonReport {
            rows: solution.rows(),
            residual: solution.residual.clone(),
            group_count: solution.group_count(),
            utilization_percent: solution.utilization_percent(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    for group in &solution.groups {
        println!("Group {}:", group.group_id);
        for item in &group.items {
            println!(
                "  #{} {}x{} qty {} (length {}, {} left)",
                item.piece_id,
                item.width,
                item.length,
                item.qty_used,
                item.length_ref(),
                item.qty_remaining_after
            );
        }
        if cli.layout {
            print!("{}", render::render_group(group, window));
        }
        println!();
    }

    if !solution.residual.is_empty() {
        println!("Residual:");
        for p in &solution.residual {
            println!("  {} qty {} of {}", p, p.remaining_qty(), p.original_qty);
        }
        println!();
    }

    println!(
        "Summary: {} group{}, {} of {} units grouped ({:.1}%)",
        solution.group_count(),
        if solution.group_count() == 1 { "" } else { "s" },
        solution.grouped_qty(),
        solution.total_qty,
        solution.utilization_percent(),
    );
}
