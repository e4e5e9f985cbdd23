use std::path::PathBuf;

use contagion::SimulationConfig;
use contagion::render::{Canvas, Palette};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let seed: u64 = args
        .get(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(rand::random);
    let size: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(50);
    let max_steps: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1000);
    let out_dir: PathBuf = args
        .get(4)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));

    std::fs::create_dir_all(&out_dir)?;

    let config = SimulationConfig {
        size,
        ..SimulationConfig::default()
    };

    info!(
        seed,
        size,
        max_steps,
        infect = config.probability_to_infect_neighbour,
        death = config.probability_of_death,
        "starting outbreak"
    );

    config.validate()?;

    let centre = (size / 2) as i64;
    let mut canvas = Canvas::new(size, Palette::default());
    let run = contagion::run(config, seed, &[(centre, centre)], max_steps, &mut canvas)?;

    for step in &run.history {
        info!(
            generation = step.generation,
            infected = step.census.infected,
            immune = step.census.immune,
            dead = step.census.dead,
            "step"
        );
    }
    for t in &run.timings {
        info!(name = t.name, ms = t.ms, "timing");
    }

    let path = out_dir.join("final.png");
    canvas.save(&path)?;
    info!(path = %path.display(), "saved frame");

    let path = out_dir.join("history.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&run.history)?)?;
    info!(path = %path.display(), "saved history");

    Ok(())
}
