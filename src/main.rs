//! luxopt CLI - Run or resume a design optimization stored in a checkpoint log.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use luxopt::{
    EvolutionError, Optimizer,
    compute::{RadianceOracle, evolution::JsonlStore},
    schema::{EngineConfig, RunRequest, StopReason},
};

/// Exit status after an interrupt.
const INTERRUPTED: i32 = 130;

/// Parsed command line.
#[derive(Debug, PartialEq)]
struct Invocation {
    config: Option<PathBuf>,
    store: PathBuf,
    request: Option<RunRequest>,
}

fn usage(program: &str) {
    eprintln!(
        "Usage: {} [--config <engine.json>] <store> [<popsize> <keepfrac> <niter1> <prec1> [<niter2> <prec2> [...]]]",
        program
    );
    eprintln!();
    eprintln!("Run or resume a daylighting design optimization.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  store     Checkpoint log; resumed after its last stored generation");
    eprintln!("  popsize   Population size (ignored if the store already has parameters)");
    eprintln!("  keepfrac  Fraction of survivors per generation (same)");
    eprintln!("  niter     Generations to append to the schedule ...");
    eprintln!("  prec      ... evaluated at this ray-tracing precision (ambient bounces)");
    eprintln!();
    eprintln!("Example engine configuration is printed with the --example flag.");
}

fn parse_args(args: &[String]) -> Option<Invocation> {
    let mut rest = args;
    let mut config = None;
    if rest.first().map(String::as_str) == Some("--config") {
        config = Some(PathBuf::from(rest.get(1)?));
        rest = &rest[2..];
    }

    let (store, values) = rest.split_first()?;
    let request = match values.len() {
        0 => None,
        n if n % 2 == 0 => {
            let stages = values[2..]
                .chunks(2)
                .map(|pair| Some((pair[0].parse::<usize>().ok()?, pair[1].parse::<u32>().ok()?)))
                .collect::<Option<Vec<_>>>()?;
            Some(RunRequest {
                popsize: values[0].parse().ok()?,
                keepfrac: values[1].parse().ok()?,
                stages,
            })
        }
        _ => return None,
    };

    Some(Invocation {
        config,
        store: PathBuf::from(store),
        request,
    })
}

fn load_config(path: Option<&Path>) -> EngineConfig {
    let Some(path) = path else {
        return EngineConfig::default();
    };
    let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        process::exit(1);
    });
    serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        process::exit(1);
    })
}

/// Raise the cancellation token; true if it was already raised.
fn interrupt(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::SeqCst)
}

/// First Ctrl-C stops after the running evaluations, the second exits at once.
fn install_interrupt_handler(cancel: Arc<AtomicBool>) {
    let installed = ctrlc::set_handler(move || {
        if interrupt(&cancel) {
            process::exit(INTERRUPTED);
        }
        eprintln!("Interrupted: finishing running evaluations (press Ctrl-C again to abort)");
    });
    if let Err(e) = installed {
        log::warn!("Could not install interrupt handler: {}", e);
    }
}

fn print_example_config() {
    let config = EngineConfig {
        random_seed: Some(42),
        ..Default::default()
    };
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("luxopt");

    if args.get(1).map(String::as_str) == Some("--example") {
        print_example_config();
        return;
    }

    let Some(invocation) = parse_args(&args[1.min(args.len())..]) else {
        usage(program);
        process::exit(1);
    };

    let config = load_config(invocation.config.as_deref());
    let oracle = RadianceOracle::new(config.oracle.clone());

    let store = if invocation.request.is_some() {
        JsonlStore::open(&invocation.store)
    } else {
        if !invocation.store.is_file() {
            eprintln!(
                "Error: supplied store {} can not be found.",
                invocation.store.display()
            );
            process::exit(1);
        }
        JsonlStore::open_existing(&invocation.store)
    };

    let result = store
        .map_err(EvolutionError::from)
        .and_then(|store| Optimizer::new(config, store))
        .and_then(|mut optimizer| {
            install_interrupt_handler(optimizer.cancel_handle());
            let params = optimizer.prepare_params(invocation.request.as_ref())?;
            println!("luxopt");
            println!("======");
            println!("Store: {}", invocation.store.display());
            println!(
                "Population: {} (keep {}), {} scheduled generations",
                params.popsize,
                params.keepfrac,
                params.generations()
            );
            println!();

            optimizer.run_with_callback(&oracle, |progress| {
                let metrics = &progress.best_metrics;
                println!(
                    "Generation {}/{} (precision {}): f_best {:.2e}, f_av {:.2e}, Sigma_cv {:.2e}, {} evaluations",
                    progress.generation,
                    progress.total_generations,
                    progress.precision,
                    progress.best_fitness,
                    progress.avg_fitness,
                    progress.diversity,
                    progress.evaluations
                );
                println!(
                    "  best {}  volume {:.1}  glass {:.1}",
                    progress.best_genotype, metrics.bounding_volume, metrics.glass_area
                );
            })
        });

    match result {
        Ok(result) => {
            let stats = &result.stats;
            println!();
            println!(
                "Stopped: {:?} after {} generations ({} evaluations, {:.1}s, {:.2} evaluations/s)",
                result.stop_reason,
                stats.generations_run,
                stats.total_evaluations,
                stats.elapsed_seconds,
                stats.evaluations_per_second
            );
            if stats.generations_run > 0 {
                println!("Best fitness: {:.4e}", stats.best_fitness);
            }
            if result.stop_reason == StopReason::Cancelled {
                process::exit(INTERRUPTED);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
