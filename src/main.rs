//! cpu-profile - CPU and host profile from native platform tools

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cpu_profile::config::{self, Config, OutputFormat};
use cpu_profile::deps::{collect_dependency_statuses, missing_tools};
use cpu_profile::probe::{detect_os, Prober, Strategy, SystemRunner};
use cpu_profile::profile::RuntimeInfo;

/// cpu-profile - Report CPU topology and host version
#[derive(Parser)]
#[command(name = "cpu-profile")]
#[command(version)]
#[command(about = "Report CPU model, core/thread topology, SMT status and kernel version")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and display the CPU profile (default)
    Detect {
        /// Output format (defaults to the config file setting)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Per-command timeout in seconds, 0 to wait forever
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Check that the tools this platform needs are installed
    Doctor,

    /// Show configuration path and values
    Config,
}

/// Initialize tracing with the given verbosity level
///
/// - 0: warn (default)
/// - 1: info (-v)
/// - 2: debug (-vv)
/// - 3+: trace (-vvv)
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // Allow RUST_LOG to override if set
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Detect { format, timeout }) => run_detect(&load_config()?, format, timeout)?,
        None => run_detect(&load_config()?, None, None)?,
        Some(Commands::Doctor) => run_doctor(&load_config()?),
        Some(Commands::Config) => show_config_info()?,
    }

    Ok(())
}

/// Load the config file and apply its color preference.
fn load_config() -> Result<Config> {
    let cfg = Config::load()?;
    if !cfg.output.color {
        colored::control::set_override(false);
    }
    Ok(cfg)
}

fn run_detect(cfg: &Config, format: Option<OutputFormat>, timeout: Option<u64>) -> Result<()> {
    let runner = match timeout {
        Some(seconds) => SystemRunner::with_timeout_secs(seconds),
        None => cfg.probe.runner(),
    };
    let prober = Prober::new(runner).with_settings(cfg.probe.settings());

    let profile = prober
        .profile(&RuntimeInfo::current())
        .context("CPU profile detection failed")?;

    match format.unwrap_or(cfg.output.format) {
        OutputFormat::Text => println!("{}", profile.display()),
        OutputFormat::Json => println!(
            "{}",
            profile.to_json().context("Failed to serialize profile")?
        ),
    }

    Ok(())
}

fn run_doctor(cfg: &Config) {
    let os = detect_os();
    let strategy = Strategy::for_os(os);
    let statuses = collect_dependency_statuses(strategy, &cfg.probe.runner());

    println!(
        "{} {}\n",
        "Platform:".bright_cyan().bold(),
        os.as_str().bright_white()
    );

    if statuses.is_empty() {
        println!(
            "{}",
            "No external tools are used on this platform; only the logical CPU count is reported."
                .bright_yellow()
        );
        return;
    }

    for status in &statuses {
        let mark = if status.available() {
            "✓".bright_green()
        } else {
            "✗".bright_red()
        };
        println!(
            "  {} {:<16} {}",
            mark,
            status.name.bright_white(),
            status.details().bright_black()
        );
    }

    let missing = missing_tools(&statuses);
    if missing.is_empty() {
        println!("\n{}", "All required tools found.".bright_green());
    } else {
        println!(
            "\n{} {}",
            "Missing required tools:".bright_red(),
            missing.join(", ").bright_red()
        );
    }
}

/// Show configuration information
fn show_config_info() -> Result<()> {
    println!("{}", "cpu-profile Configuration\n".bright_cyan().bold());

    match config::get_config_path() {
        Ok(path) => {
            println!("{} {}", "Config file:".bright_yellow(), path.bright_white());
            if std::path::Path::new(&path).exists() {
                println!("  {} {}", "Status:".bright_cyan(), "Exists".bright_green());
            } else {
                println!(
                    "  {} {}",
                    "Status:".bright_cyan(),
                    "Not created yet (will use defaults)".bright_yellow()
                );
            }
        }
        Err(e) => {
            println!(
                "{} Could not determine config path: {}",
                "Error:".bright_red(),
                e
            );
        }
    }

    let cfg = match Config::init() {
        Ok(cfg) => cfg,
        Err(err) => {
            println!("  {} {:#}", "Problem:".bright_red(), err);
            println!(
                "  {}",
                "Showing defaults; fix or delete the file to apply your settings.".bright_yellow()
            );
            Config::default()
        }
    };

    println!("\n{}", "Probe settings:".bright_white().bold());
    let timeout = match cfg.probe.command_timeout_seconds {
        0 => "none".to_string(),
        secs => format!("{}s", secs),
    };
    println!(
        "  {} {}",
        "Command timeout:".bright_cyan(),
        timeout.bright_white()
    );
    println!(
        "  {} {}",
        "CPU info source:".bright_cyan(),
        cfg.probe.cpuinfo_path.display().to_string().bright_white()
    );
    println!(
        "  {} {}",
        "OS banner:".bright_cyan(),
        cfg.probe.issue_path.display().to_string().bright_white()
    );

    println!("\n{}", "Output:".bright_white().bold());
    let format = match cfg.output.format {
        OutputFormat::Text => "text",
        OutputFormat::Json => "json",
    };
    println!("  {} {}", "Format:".bright_cyan(), format.bright_white());
    println!(
        "  {} {}",
        "Color:".bright_cyan(),
        if cfg.output.color {
            "true".bright_green()
        } else {
            "false".bright_yellow()
        }
    );

    Ok(())
}
