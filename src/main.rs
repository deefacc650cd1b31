//! evomol CLI - Run molecule evolution from JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use evomol::{EvolutionConfig, EvolutionEngine, RunStatus};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Evolve a molecule population from a JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to evolution configuration file");
        eprintln!("  generations  Override for the generation limit");
        eprintln!();
        eprintln!("Example configuration is generated with --example.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: EvolutionConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Some(generations) = args.get(2).and_then(|s| s.parse().ok()) {
        config.params.max_generations = generations;
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    println!("Molecule Evolution");
    println!("==================");
    println!("Population: {}", config.params.population_size);
    println!("Generations: {}", config.params.max_generations);
    println!("Mutation rate: {}", config.params.mutation_rate);
    println!("Elitism: {}", config.params.elitism_count);
    println!("Max atoms per molecule: {}", config.params.max_atoms);
    println!("Target: {:?}", config.target);
    println!();

    let max_generations = config.params.max_generations;
    let mut engine = EvolutionEngine::new(config);

    println!("Running evolution...");
    let start = Instant::now();
    engine.start();

    while engine.status() == RunStatus::Running {
        engine.step_generation();

        // Print progress roughly every 10%
        if let Some(record) = engine.history().last()
            && (record.generation + 1) % (max_generations / 10).max(1) == 0
        {
            let elapsed = start.elapsed().as_secs_f32();
            let per_sec = (record.generation + 1) as f32 / elapsed;
            println!(
                "  Gen {}/{}: best={:.3}, avg={:.3}, {:.1} gen/s",
                record.generation, max_generations, record.best, record.average, per_sec
            );
        }
    }

    let elapsed = start.elapsed();

    println!();
    println!("Final state:");
    match engine.best() {
        Some(best) => {
            println!(
                "  Best molecule: {} ({} atoms, {} bonds)",
                best.formula(),
                best.atoms.len(),
                best.bonds.len()
            );
            println!("  Molecular weight: {:.1}", best.molecular_weight());
            println!("  Fitness: {:.3}", best.fitness);
        }
        None => println!("  No individual survived evaluation."),
    }
    if let Some(record) = engine.history().last() {
        println!(
            "  Final generation {}: best={:.3}, avg={:.3}",
            record.generation, record.best, record.average
        );
    }
    println!(
        "Time: {:.2}s ({:.1} generations/s)",
        elapsed.as_secs_f32(),
        (engine.generation() + 1) as f32 / elapsed.as_secs_f32()
    );
}

fn print_example_config() {
    let config = EvolutionConfig::default();

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
