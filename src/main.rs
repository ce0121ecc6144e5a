//! PURSUIT - CLI Entry Point
//!
//! Headless pursuit simulation and offline sequence training.

use clap::{Parser, Subcommand};
use pursuit::grid::Grid;
use pursuit::maze::MazeGenerator;
use pursuit::stats::StrategyCounters;
use pursuit::training::Trainer;
use pursuit::{benchmark, Config, Simulation};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pursuit")]
#[command(version)]
#[command(about = "Real-time pursuit agents for mutable grid mazes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "2000")]
        steps: u64,

        /// Output directory for statistics
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Print the maze when the run ends
        #[arg(long)]
        show_maze: bool,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Train a move sequence offline
    Train {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Output file for the trained sequence (JSON)
        #[arg(short, long, default_value = "trained_sequence.json")]
        output: PathBuf,

        /// Agent the sequence is meant for
        #[arg(short, long)]
        agent_id: Option<u32>,

        /// Override the number of generations
        #[arg(short, long)]
        generations: Option<u32>,

        /// Train on an open field instead of a generated maze
        #[arg(long)]
        open: bool,

        /// Random seed for reproducibility
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of ticks
        #[arg(short, long, default_value = "500")]
        steps: u64,

        /// Maze width and height
        #[arg(short, long, default_value = "21")]
        grid_size: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            output,
            seed,
            show_maze,
            quiet,
        } => {
            let config = load_config(&config)?;
            init_logging(&config);
            run_simulation(config, steps, output, seed, show_maze, quiet)
        }

        Commands::Train {
            config,
            output,
            agent_id,
            generations,
            open,
            seed,
        } => {
            let mut config = load_config(&config)?;
            init_logging(&config);
            if let Some(g) = generations {
                config.training.generations = g;
            }
            let agent_id = agent_id.unwrap_or(config.genetic.trained_agent_id);
            train_sequence(config, output, agent_id, open, seed)
        }

        Commands::Benchmark { steps, grid_size } => {
            init_logging(&Config::default());
            run_benchmark(steps, grid_size)
        }

        Commands::Init { output } => generate_config(output),
    }
}

fn init_logging(config: &Config) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.log_level.as_str()))
        .init();
}

fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Loading config from: {:?}", path);
        Ok(Config::from_file(path)?)
    } else {
        println!("Using default configuration");
        Ok(Config::default())
    }
}

fn run_simulation(
    config: Config,
    steps: u64,
    output: PathBuf,
    seed: Option<u64>,
    show_maze: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&output)?;

    let mut sim = if let Some(s) = seed {
        println!("Using seed: {}", s);
        Simulation::new_with_seed(config.clone(), s)
    } else {
        Simulation::new(config.clone())
    };

    println!("Starting simulation");
    println!("  Maze: {}x{}", config.grid.width, config.grid.height);
    println!("  Targets: {}", sim.live_targets());
    println!("  Agents: {}", sim.controller.agents().len());
    println!("  Steps: {}", steps);
    println!();

    let start = Instant::now();
    let stats_interval = config.logging.stats_interval.max(1);

    sim.run_with_callback(steps, |sim, i| {
        if !quiet && i % stats_interval == 0 {
            println!("{}", sim.stats.summary());
        }
    });

    let elapsed = start.elapsed();
    let steps_per_sec = sim.time as f64 / elapsed.as_secs_f64().max(f64::EPSILON);

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Steps: {}", sim.time);
    println!("Speed: {:.1} steps/s", steps_per_sec);
    println!("Captures: {}", sim.stats.captures);
    println!("Targets left: {}", sim.live_targets());
    match sim.stats.gate_broken_at {
        Some(t) => println!("Gate broken at tick {}", t),
        None => println!("Gate intact"),
    }
    println!("Regenerations: {}", sim.stats.regenerations);
    let mut total = StrategyCounters::default();
    for (strategy, counters) in &sim.stats.strategies {
        print_counters(strategy.name(), counters);
        total.merge(counters);
    }
    print_counters("total", &total);

    if show_maze {
        println!();
        println!("{}", sim.grid);
    }

    let stats_path = output.join("stats.json");
    sim.stats.save_json(&stats_path.to_string_lossy())?;
    println!("Stats: {:?}", stats_path);

    let history_path = output.join("stats_history.json");
    sim.stats_history.save(&history_path.to_string_lossy())?;
    println!("Stats history: {:?}", history_path);

    Ok(())
}

fn print_counters(label: &str, counters: &StrategyCounters) {
    println!(
        "  {:8} invocations {:6} | success {:5.1}% | fallbacks {}",
        label,
        counters.invocations,
        100.0 * counters.success_rate(),
        counters.fallbacks
    );
}

fn train_sequence(
    config: Config,
    output: PathBuf,
    agent_id: u32,
    open: bool,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let grid = if open {
        Grid::open(config.grid.width, config.grid.height)
    } else {
        MazeGenerator::from_config(&config.grid).generate(&mut rng).grid
    };

    let start = grid
        .nearest_walkable(config.training.start)
        .ok_or("maze has no walkable tile")?;
    let target = grid
        .nearest_walkable(config.training.target)
        .ok_or("maze has no walkable tile")?;

    println!("Training agent {} from {} toward {}", agent_id, start, target);
    println!(
        "  Population: {} | Genes: {} | Generations: {}",
        config.training.population_size, config.training.gene_length, config.training.generations
    );

    let began = Instant::now();
    let trainer = Trainer::new(config.training.clone());
    let report = trainer.run(start, target, &grid, &mut rng);

    println!();
    println!("=== Training Complete ===");
    println!("Time: {:.2}s", began.elapsed().as_secs_f64());
    println!("{}", report.summary());

    report.to_trained(agent_id).save(&output)?;
    println!("Trained sequence: {:?}", output);

    Ok(())
}

fn run_benchmark(steps: u64, grid_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== PURSUIT Benchmark ===");
    println!("Steps: {}", steps);
    println!("Grid: {}x{}", grid_size, grid_size);
    println!();

    let result = benchmark(steps, grid_size);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
