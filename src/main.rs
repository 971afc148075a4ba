use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use seabattle::rating::Ledger;
use seabattle::{
    init_logging, Board, BotOpponent, CellState, Coord, Difficulty, Engine, EngineConfig,
    EngineError, Feedback, PlayerId, SessionId, ShotOutcome, BOARD_SIZE,
};

const HUMAN: PlayerId = PlayerId(1);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play against a bot in the terminal.
    Play {
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
        #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
        seed: Option<u64>,
    },
    /// Let an autopilot play against each bot tier and print a JSON summary.
    Simulate {
        /// Restrict to one tier; all three by default.
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long, default_value_t = 20)]
        games: u32,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Play { difficulty, seed } => {
            let mut config = EngineConfig::from_env();
            if seed.is_some() {
                config.seed = seed;
            }
            play(config, difficulty).await
        }
        Commands::Simulate {
            difficulty,
            games,
            seed,
        } => {
            let tiers = match difficulty {
                Some(d) => vec![d],
                None => Difficulty::ALL.to_vec(),
            };
            let summary = simulate(&tiers, games, seed).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}

async fn play(config: EngineConfig, difficulty: Difficulty) -> anyhow::Result<()> {
    let (engine, mut results) = Engine::new(config);
    let id = engine.create_vs_bot(HUMAN, "you", difficulty).await?;
    println!("Session {} against the {} bot. Fire with coordinates like B7, or type 'quit'.", id, difficulty);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(view) = engine.snapshot(&id).await else {
            break;
        };
        render(&view.seats);
        print!("> ");
        std::io::Write::flush(&mut std::io::stdout())?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") {
            engine.surrender(&id, HUMAN).await?;
            break;
        }
        let at: Coord = match line.parse() {
            Ok(c) => c,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        match engine.shoot(&id, HUMAN, at.x(), at.y()).await {
            Ok(report) => {
                println!("{}: {}", at, describe(report.outcome));
                for shot in report.bot_volley {
                    println!("bot fires at {}: {}", shot.at, describe(shot.outcome));
                }
            }
            Err(EngineError::AlreadyShot(c)) => println!("{} was already shot, pick another cell", c),
            Err(e) => return Err(e.into()),
        }
    }

    if let Ok(result) = results.try_recv() {
        if result.winner == HUMAN {
            println!("You won.");
        } else {
            println!("The {} bot won.", difficulty);
        }
    }
    Ok(())
}

fn describe(outcome: ShotOutcome) -> &'static str {
    match outcome {
        ShotOutcome::Miss => "miss",
        ShotOutcome::Hit => "hit",
        ShotOutcome::Sunk => "sunk",
        ShotOutcome::Victory { .. } => "sunk, fleet destroyed",
    }
}

/// Own board in full, enemy board with intact ships hidden.
fn render(seats: &[(PlayerId, String, Board)]) {
    let own = seats.iter().find(|s| s.0 == HUMAN);
    let enemy = seats.iter().find(|s| s.0 != HUMAN);
    let header: String = (1..=BOARD_SIZE).map(|y| format!("{:>3}", y)).collect();
    println!("   {}      {}", header, header);
    for x in 0..BOARD_SIZE {
        let row = |board: Option<&Board>, hide: bool| -> String {
            (0..BOARD_SIZE)
                .map(|y| {
                    let state = match (board, Coord::new(x, y)) {
                        (Some(b), Ok(c)) => b.cell(c),
                        _ => CellState::Empty,
                    };
                    let ch = match state {
                        CellState::Empty => '.',
                        CellState::Ship if hide => '.',
                        CellState::Ship => '#',
                        CellState::Miss => 'o',
                        CellState::Hit => 'X',
                    };
                    format!("{:>3}", ch)
                })
                .collect()
        };
        let letter = (b'A' + x as u8) as char;
        println!(
            "{}  {}   {}  {}",
            letter,
            row(own.map(|s| &s.2), false),
            letter,
            row(enemy.map(|s| &s.2), true)
        );
    }
}

#[derive(Debug, Default, Serialize)]
struct TierSummary {
    games: u32,
    autopilot_wins: u32,
    bot_wins: u32,
    /// Mean number of bot shots per game.
    mean_bot_shots: f64,
}

/// Autopilot (a medium bot without foreknowledge) against each tier.
async fn simulate(tiers: &[Difficulty], games: u32, seed: u64) -> anyhow::Result<BTreeMap<Difficulty, TierSummary>> {
    let (engine, mut results) = Engine::new(EngineConfig::unpaced(seed));
    let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(1));
    let mut ledger = Ledger::new();
    let mut summary = BTreeMap::new();

    for &difficulty in tiers {
        let mut tier = TierSummary::default();
        let mut bot_shots = 0usize;
        for _ in 0..games {
            let id = engine.create_vs_bot(HUMAN, "autopilot", difficulty).await?;
            bot_shots += autopilot_game(&engine, &id, &mut rng).await?;
            let result = results
                .recv()
                .await
                .ok_or_else(|| anyhow!("engine dropped its result channel"))?;
            ledger.record(&result);
            tier.games += 1;
        }
        if let Some(rec) = ledger.bot_record(HUMAN, difficulty) {
            tier.autopilot_wins = rec.wins;
            tier.bot_wins = rec.losses;
        }
        if tier.games > 0 {
            tier.mean_bot_shots = bot_shots as f64 / f64::from(tier.games);
        }
        summary.insert(difficulty, tier);
    }
    Ok(summary)
}

/// Play one session to the end. Returns how many shots the bot fired.
async fn autopilot_game(engine: &Engine, id: &SessionId, rng: &mut SmallRng) -> anyhow::Result<usize> {
    let view = engine
        .snapshot(id)
        .await
        .context("bot session vanished before the first shot")?;
    let bot_board = view
        .seats
        .iter()
        .find(|s| s.0 != HUMAN)
        .map(|s| s.2.clone())
        .context("bot session without a bot seat")?;
    let mut pilot = BotOpponent::new(Difficulty::Medium, rng, &bot_board);
    let mut bot_shots = 0;

    loop {
        let at = pilot
            .choose_shot(rng)
            .ok_or_else(|| anyhow!("autopilot ran out of cells in {}", id))?;
        let report = match engine.shoot(id, HUMAN, at.x(), at.y()).await {
            Ok(report) => report,
            Err(EngineError::AlreadyShot(_)) => {
                pilot.process_result(at, Feedback::Rejected);
                continue;
            }
            Err(e) => bail!(e),
        };
        bot_shots += report.bot_volley.len();
        let feedback = match report.outcome {
            ShotOutcome::Victory { .. } => return Ok(bot_shots),
            ShotOutcome::Miss => Feedback::Miss,
            ShotOutcome::Hit => Feedback::Hit,
            ShotOutcome::Sunk => Feedback::Sunk,
        };
        pilot.process_result(at, feedback);
        if report
            .bot_volley
            .iter()
            .any(|s| matches!(s.outcome, ShotOutcome::Victory { .. }))
        {
            return Ok(bot_shots);
        }
    }
}
