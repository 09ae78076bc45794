//! Genetic reverse-correlation CLI - Run an ideal-observer session from JSON
//! configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use genetic_revcorr::{
    compute::{
        NullPresenter, Session, SessionArchive, StimulusRng, TRAINING_TRIALS, build_policy,
        run_training, training_accuracy,
    },
    schema::{
        ExperimentConfig, SelectionConfig, SelectionMode, StimulusArray, Target, render_glyph,
    },
};

/// Resolution the built-in target letter is rendered at.
const TARGET_SIZE: usize = 64;
const TARGET_DISPLAY_SIZE: usize = 96;
const PARTICIPANT: &str = "observer";

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [output_dir]", args[0]);
        eprintln!();
        eprintln!("Run an ideal-observer session against the letter S.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to experiment configuration file");
        eprintln!("  output_dir   Directory for selection and composite JSON files");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let output_dir = args.get(2).map(PathBuf::from);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: ExperimentConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if config.selection.mode != SelectionMode::IdealObserver {
        log::warn!("The CLI has no participant input; switching to ideal-observer selection");
        config.selection.mode = SelectionMode::IdealObserver;
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let Some(target) = Target::letter('S', TARGET_SIZE, TARGET_DISPLAY_SIZE) else {
        eprintln!("Error: no built-in glyph for target letter");
        std::process::exit(1);
    };

    println!("Genetic Reverse Correlation");
    println!("===========================");
    println!(
        "Stimuli: {0}x{0}, {1} generations x {2} trials",
        config.stimulus_size, config.generations, config.trials_per_generation
    );
    println!("Mutation rate: {}", config.breeding.mutation_rate);
    println!(
        "Filter: threshold={}, preservation={}, noise reduction={}",
        config.filter.threshold,
        config.filter.preservation_factor,
        config.filter.noise_reduction_factor
    );
    match config.random_seed {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: entropy"),
    }
    println!();

    let policy =
        build_policy(&config.selection, Some(target.array.clone()), None).unwrap_or_else(|e| {
            eprintln!("Error building selection policy: {}", e);
            std::process::exit(1);
        });

    // Practice on J, then the session proper on S
    if let Some(letter) = render_glyph('J', config.stimulus_size) {
        let mut rng = StimulusRng::from_option(config.random_seed);
        let mut observer = build_policy(&config.selection, Some(letter.clone()), None)
            .unwrap_or_else(|e| {
                eprintln!("Error building training policy: {}", e);
                std::process::exit(1);
            });
        match run_training(
            &mut rng,
            &letter,
            TRAINING_TRIALS,
            observer.as_mut(),
            &mut NullPresenter,
        ) {
            Ok(records) => println!(
                "Training: {:.0}% correct over {} trials",
                training_accuracy(&records) * 100.0,
                records.len()
            ),
            Err(e) => {
                eprintln!("Training failed: {}", e);
                std::process::exit(1);
            }
        }
        println!();
    }

    let mut session = Session::new(config, policy).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    if let Some(dir) = &output_dir {
        let archive = SessionArchive::new(dir, PARTICIPANT).unwrap_or_else(|e| {
            eprintln!("Error creating output directory: {}", e);
            std::process::exit(1);
        });
        session = session.with_sink(archive);
    }

    println!("Running session...");
    let start = Instant::now();
    let trials_per_generation = session.config().trials_per_generation;

    let result = session
        .run_with_callback(|progress| {
            if progress.trials_completed == trials_per_generation {
                println!(
                    "  Generation {}/{} complete ({} trials, {:.2}s)",
                    progress.generation + 1,
                    progress.total_generations,
                    progress.total_trials_completed,
                    start.elapsed().as_secs_f32()
                );
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("Session failed: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Session composite:");
    print_ascii(&result.session_composite);
    println!();
    println!(
        "Target ({}x{}):",
        result.session_composite.width(),
        result.session_composite.height()
    );
    print_ascii(
        &target
            .array
            .resize_nearest(result.session_composite.width(), result.session_composite.height()),
    );

    if let Some(dir) = output_dir {
        println!();
        println!("Wrote {} trials and composites to {}", result.trials.len(), dir.display());
    }
}

/// Dark cells print dense glyphs.
fn print_ascii(grid: &StimulusArray) {
    const RAMP: &[u8] = b"@%#*+=-:. ";
    for row in grid.rows() {
        let line: String = row
            .iter()
            .map(|&v| RAMP[v as usize * (RAMP.len() - 1) / 255] as char)
            .flat_map(|c| [c, c])
            .collect();
        println!("  {}", line);
    }
}

fn print_example_config() {
    let config = ExperimentConfig {
        selection: SelectionConfig {
            mode: SelectionMode::IdealObserver,
            ..Default::default()
        },
        random_seed: Some(42),
        ..Default::default()
    };

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
