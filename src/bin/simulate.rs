use clap::Parser;
use serde::Serialize;
use serde_json::json;

use worm_arena_server::config::RoomConfig;
use worm_arena_server::constants::TICK_MS;
use worm_arena_server::engine::Room;
use worm_arena_server::rng::Rng;

/// Headless deterministic run of one room with scripted steering. Useful
/// for balance sweeps and for spotting regressions in the tick loop
/// without any sockets involved.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value_t = 12)]
    players: usize,
    #[arg(long, default_value_t = 2_400)]
    ticks: u64,
    #[arg(long, default_value_t = 4_242)]
    seed: u32,
    #[arg(long)]
    map_size: Option<f64>,
    #[arg(long)]
    food_coverage: Option<f64>,
    #[arg(long, default_value_t = false)]
    respawn: bool,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    seed: u32,
    ticks: u64,
    #[serde(rename = "startingPlayers")]
    starting_players: usize,
    #[serde(rename = "playersLeft")]
    players_left: usize,
    deaths: u64,
    respawns: u64,
    #[serde(rename = "foodCount")]
    food_count: usize,
    #[serde(rename = "topScore")]
    top_score: i64,
    #[serde(rename = "totalScore")]
    total_score: i64,
}

fn main() {
    let cli = Cli::parse();

    let mut config = RoomConfig::default();
    if let Some(map_size) = cli.map_size {
        config.map_size = map_size;
    }
    if let Some(coverage) = cli.food_coverage {
        config.food_coverage_percent = coverage;
    }
    config.max_players = cli.players.max(2);

    let mut room = Room::new("sim".to_string(), config, cli.seed, 0);
    for idx in 0..cli.players {
        room.add_player(&format!("Bot-{:02}", idx + 1), &format!("sim_{}", idx + 1));
    }

    // a separate generator drives the scripted pilots so the room's own
    // stream stays comparable across pilot strategies
    let mut pilot_rng = Rng::new(cli.seed ^ 0x5EED);
    let dt = TICK_MS as f64 / 1_000.0;
    let mut deaths = 0u64;
    let mut respawns = 0u64;

    for tick in 1..=cli.ticks {
        let ids: Vec<String> = room.players().map(|p| p.id.clone()).collect();
        for id in ids {
            if pilot_rng.chance(0.1) {
                room.apply_input(&id, Some(pilot_rng.heading()), None);
            }
            if pilot_rng.chance(0.02) {
                let boosting = pilot_rng.chance(0.5);
                room.apply_input(&id, None, Some(boosting));
            }
        }

        let report = room.step(tick * TICK_MS, dt);
        deaths += report.deaths.len() as u64;
        if cli.respawn {
            for death in &report.deaths {
                room.add_player(&death.name, &death.session_id);
                respawns += 1;
            }
        }
    }

    let scores: Vec<i64> = room.players().map(|p| p.score.round() as i64).collect();
    let summary = RunSummary {
        seed: cli.seed,
        ticks: cli.ticks,
        starting_players: cli.players,
        players_left: room.player_count(),
        deaths,
        respawns,
        food_count: room.food_count(),
        top_score: scores.iter().copied().max().unwrap_or(0),
        total_score: scores.iter().sum(),
    };

    println!(
        "{}",
        json!({ "type": "simulation_summary", "summary": summary })
    );
}
