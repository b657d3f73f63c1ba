use clap::Parser;

use paramwiz::config::{self, AppConfig};
use paramwiz::io::{ConsolePrompter, ConsoleReporter, Prompter, Reporter, ScriptedPrompter};
use paramwiz::logging;
use paramwiz::targets::{self, Target, TargetRegistry};
use paramwiz::{Arguments, Wizard};

/// paramwiz - An interactive parameter wizard
#[derive(Parser)]
#[command(name = "paramwiz")]
#[command(version = "0.1.0")]
#[command(
    about = "Collects, validates, saves and restores the arguments of a function, then runs it"
)]
struct Cli {
    /// Target function to run
    #[arg(default_value = "lindenmayer")]
    target: String,

    /// Configuration file path (optional)
    #[arg(short, long, default_value = "./paramwiz.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// List available targets
    #[arg(short = 'L', long)]
    list_targets: bool,

    /// Never ask to restore or save configurations
    #[arg(long)]
    no_saves: bool,

    /// Fix a parameter instead of prompting for it (repeatable)
    #[arg(short, long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Read answers from a file, one per line, instead of the terminal
    #[arg(long, value_name = "FILE")]
    answers: Option<String>,
}

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging with specified level
    logging::init_logging(&cli.log_level);

    let registry = match targets::default_registry() {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!("Failed to register targets: {e:#}");
            std::process::exit(1);
        }
    };

    // Handle list targets command
    if cli.list_targets {
        println!("Available targets:");
        for name in registry.names() {
            println!("  - {}", name);
        }
        return;
    }

    // Load configuration, falling back to defaults when the file is absent
    let config = match config::load_config_or_default(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Failed to load config from '{}': {e:#}", cli.config);
            std::process::exit(1);
        }
    };

    // Validate configuration
    if let Err(e) = config::validate_config(&config, &registry) {
        tracing::error!("Configuration error: {e:#}");
        std::process::exit(1);
    }
    tracing::info!("Configuration loaded and validated successfully.");

    let Some(target) = registry.get(&cli.target) else {
        tracing::error!(
            "Unknown target '{}'. Available targets: {}",
            cli.target,
            registry.names().join(", ")
        );
        std::process::exit(1);
    };

    let overrides = match collect_overrides(target, &config, &cli.set) {
        Ok(overrides) => overrides,
        Err(e) => {
            tracing::error!("{e:#}");
            std::process::exit(1);
        }
    };

    let prompter: Box<dyn Prompter> = match &cli.answers {
        Some(path) => match ScriptedPrompter::from_file(path) {
            Ok(prompter) => Box::new(prompter),
            Err(e) => {
                tracing::error!("{e:#}");
                std::process::exit(1);
            }
        },
        None => Box::new(ConsolePrompter::stdio()),
    };

    let saves = config.wizard.enable_saves && !cli.no_saves;
    let mut wizard = Wizard::new(prompter, ConsoleReporter)
        .saves_root(&config.wizard.saves_root)
        .error_timeout(config.wizard.error_timeout());

    if let Err(e) = run(&mut wizard, &registry, target, &overrides, saves) {
        tracing::error!("Session ended: {e:#}");
        std::process::exit(1);
    }

    tracing::info!("Goodbye.");
}

/// Configured overrides, then command line ones on top.
fn collect_overrides(
    target: &dyn Target,
    config: &AppConfig,
    assignments: &[String],
) -> anyhow::Result<Arguments> {
    let mut overrides = match config.targets.get(target.signature().name()) {
        Some(target_config) => config::target_overrides(target, target_config)?,
        None => Arguments::new(),
    };
    for assignment in assignments {
        let (name, value) = config::parse_override(target, assignment)?;
        overrides.insert(name, value);
    }
    Ok(overrides)
}

/// Runs `target` until the user declines to rerun it.
fn run<P: Prompter, R: Reporter>(
    wizard: &mut Wizard<P, R>,
    registry: &TargetRegistry,
    target: &dyn Target,
    overrides: &Arguments,
    saves: bool,
) -> anyhow::Result<()> {
    let rerun = registry
        .get("rerun")
        .filter(|_| target.signature().name() != "rerun");

    loop {
        wizard.set_saves(saves);
        wizard.set_functions(target.functions().iter().copied());
        if let Some(result) =
            wizard.run(target.signature(), overrides, |args| target.invoke(args))?
        {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        let Some(rerun) = rerun else {
            return Ok(());
        };
        wizard.set_saves(false);
        wizard.set_functions(rerun.functions().iter().copied());
        let again =
            wizard.run(rerun.signature(), &Arguments::new(), |args| rerun.invoke(args))?;
        if again != Some(serde_json::Value::Bool(true)) {
            return Ok(());
        }
    }
}
