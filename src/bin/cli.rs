//! Classroom Exec CLI
//!
//! Command-line front end for batch runs, interactive sessions and configuration.

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use classroom_exec::config::{config_path, save_config, validate_config, Config};
use classroom_exec::sandbox::SandboxAvailability;
use classroom_exec::{Engine, Language, SessionEvents, VERSION};
use console::style;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(
    name = "classroom-exec",
    author = "Classroom Exec Contributors",
    version = VERSION,
    about = "Classroom Exec - run Python and JavaScript snippets in a sandbox",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run code to completion and print the result as JSON
    Run {
        /// Programming language (python, javascript)
        language: String,
        /// Code to execute
        #[arg(required_unless_present = "file")]
        code: Option<String>,
        /// Read the code from a file instead
        #[arg(long, short, conflicts_with = "code")]
        file: Option<PathBuf>,
        /// Timeout in seconds
        #[arg(long, short)]
        timeout: Option<u64>,
    },

    /// Run a program interactively, forwarding terminal input to it
    Interactive {
        /// Programming language (python, javascript)
        language: String,
        /// Source file to run
        #[arg(long, short)]
        file: PathBuf,
        /// Timeout in seconds
        #[arg(long, short)]
        timeout: Option<u64>,
    },

    /// Check whether the container sandbox is usable
    Probe,

    /// Validate the current configuration
    CheckConfig,

    /// Write a default configuration file
    InitConfig {
        /// Destination (defaults to the standard config path)
        #[arg(long, short)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("classroom_exec=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            language,
            code,
            file,
            timeout,
        } => run_batch(&language, code, file.as_deref(), timeout).await,
        Commands::Interactive {
            language,
            file,
            timeout,
        } => run_interactive(&language, &file, timeout).await,
        Commands::Probe => probe().await,
        Commands::CheckConfig => check_config(),
        Commands::InitConfig { path, force } => init_config(path, force),
    }
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Execute a snippet once and print the result
async fn run_batch(
    language: &str,
    code: Option<String>,
    file: Option<&Path>,
    timeout: Option<u64>,
) -> anyhow::Result<()> {
    let language: Language = language.parse()?;
    let code = match (code, file) {
        (Some(code), _) => code,
        (None, Some(path)) => read_source(path)?,
        (None, None) => bail!("Provide code or --file"),
    };

    let config = Config::from_env()?;
    let engine = Engine::new(config).await;

    let result = engine
        .run_batch(&code, timeout.map(Duration::from_secs), language)
        .await;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Prints session output to the terminal as it arrives
struct TerminalEvents;

#[async_trait]
impl SessionEvents for TerminalEvents {
    async fn on_output(&self, text: String, is_error: bool) {
        if is_error {
            eprint!("{}", style(text).red());
            let _ = std::io::stderr().flush();
        } else {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
    }

    async fn on_done(&self, exit_code: i32) {
        let status = if exit_code == 0 {
            style(format!("✓ exited with code {}", exit_code)).green()
        } else {
            style(format!("✗ exited with code {}", exit_code)).red()
        };
        eprintln!("\n{}", status);
    }
}

/// Run a source file as a live session
async fn run_interactive(language: &str, file: &Path, timeout: Option<u64>) -> anyhow::Result<()> {
    let language: Language = language.parse()?;
    let code = read_source(file)?;

    let config = Config::from_env()?;
    let engine = Arc::new(Engine::new(config).await);
    let session_id = format!("cli-{}", uuid::Uuid::new_v4().simple());

    let runner = engine.clone();
    let id = session_id.clone();
    let mut session = tokio::spawn(async move {
        runner
            .start_interactive(
                &id,
                &code,
                timeout.map(Duration::from_secs),
                language,
                Arc::new(TerminalEvents),
            )
            .await
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let exit_code = loop {
        tokio::select! {
            joined = &mut session => break joined?,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !engine.send_input(&session_id, &line).await {
                        eprintln!("{}", style("(program is not accepting input)").dim());
                    }
                }
                _ => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n{}", style("■ Stopped").yellow());
                engine.stop_process(&session_id).await;
                break session.await?;
            }
        }
    };

    // A pending stdin read would otherwise hold up runtime shutdown
    let status = if exit_code == 0 { 0 } else { exit_code.clamp(1, 255) };
    std::process::exit(status)
}

/// Report container sandbox availability
async fn probe() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let sandbox = config.sandbox.clone();
    let engine = Engine::new(config).await;

    match engine.availability() {
        SandboxAvailability::Available => {
            println!("{} Container sandbox available", style("✓").green());
            println!("   └─ Image: {}", style(&sandbox.image).cyan());
            println!(
                "   └─ Limits: {} memory, {:.2} CPU, network {}",
                sandbox.memory_limit,
                sandbox.cpu_fraction(),
                sandbox.network
            );
        }
        SandboxAvailability::Unavailable(reason) => {
            println!("{} Container sandbox unavailable", style("✗").red());
            println!("   └─ {}", reason);
            println!("   └─ Python and JavaScript will run as host subprocesses");
        }
        SandboxAvailability::Disabled => {
            println!("{} Container sandbox disabled by configuration", style("○").dim());
        }
    }

    Ok(())
}

/// Print configuration errors and warnings
fn check_config() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let result = validate_config(&config);

    println!("Config file: {}", style(config_path().display()).cyan());

    for issue in &result.errors {
        println!("{} {}", style("✗").red(), issue);
    }
    for issue in &result.warnings {
        println!("{} {}", style("!").yellow(), issue);
    }

    if result.valid {
        println!("{} Configuration is valid", style("✓").green());
        Ok(())
    } else {
        bail!("{} configuration error(s)", result.errors.len())
    }
}

/// Write the default configuration
fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(config_path);

    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    save_config(&Config::default(), &path)?;
    println!("{} Wrote {}", style("✓").green(), style(path.display()).cyan());
    Ok(())
}
