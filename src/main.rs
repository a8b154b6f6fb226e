//! nutri-bot — supervisor entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI flags, load config
//!   3. Init logger (CLI `-v` > `RUST_LOG` > config)
//!   4. Open the storage backend
//!   5. Register llm, tools and agents on the supervisor bus
//!   6. Start comms channels; run until Ctrl-C or every channel exits

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use nutri_bot::config::{self, Config};
use nutri_bot::error::AppError;
use nutri_bot::logger;
use nutri_bot::subsystems::agents::AgentsSubsystem;
use nutri_bot::subsystems::comms;
use nutri_bot::subsystems::llm::LlmSubsystem;
use nutri_bot::subsystems::storage::{self, Clock, SystemClock};
use nutri_bot::subsystems::tools::{NutritionTools, ToolsSubsystem, registry};
use nutri_bot::supervisor;
use nutri_bot::supervisor::bus::SupervisorBus;
use nutri_bot::supervisor::dispatch::BusHandler;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let mut config = config::load(args.config_path.as_deref())?;

    // The console only runs when asked for; Telegram is the normal ingress.
    config.comms.pty.enabled = config.comms.pty.enabled && args.interactive;

    logger::init(&config.log_level, args.log_level, config.log_file.as_deref())?;

    info!(
        bot_name = %config.bot_name,
        work_dir = %config.work_dir.display(),
        log_level = %args.log_level.unwrap_or(config.log_level.as_str()),
        interactive = %args.interactive,
        "config loaded"
    );

    std::fs::create_dir_all(&config.work_dir)
        .map_err(|e| AppError::Config(format!("cannot create work dir {}: {e}", config.work_dir.display())))?;

    // The sheets backend makes blocking HTTP calls while opening.
    let store = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || storage::open(&config))
            .await
            .map_err(|e| AppError::Storage(format!("storage init panicked: {e}")))??
    };
    info!(backend = store.backend(), "storage ready — starting subsystems");

    let shutdown = CancellationToken::new();
    let bus = SupervisorBus::new(64);
    let bus_handle = bus.handle.clone();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let llm = LlmSubsystem::new(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Config(e.to_string()))?;
    let tools = ToolsSubsystem::new(NutritionTools::new(store, clock.clone(), config.nutrition.clone()));
    let agents = AgentsSubsystem::new(
        config.agents.clone(),
        config.bot_name.clone(),
        registry::specs(),
        bus_handle.clone(),
        clock,
    );
    let handlers: Vec<Box<dyn BusHandler>> = vec![Box::new(llm), Box::new(tools), Box::new(agents)];

    let sup_token = shutdown.clone();
    let sup_handle = tokio::spawn(async move {
        supervisor::run(bus, sup_token, handlers).await;
    });

    print_startup_summary(&config, args.interactive);

    let comms = comms::start(&config, bus_handle, shutdown.clone());
    let result = comms.join().await;

    // Channels are gone (or failed): stop the supervisor too.
    shutdown.cancel();
    sup_handle.await.ok();

    if args.interactive {
        println!("\nBye :) ...");
    }
    result
}

fn print_startup_summary(config: &Config, interactive: bool) {
    let mut channels = Vec::new();
    if config.comms.pty.enabled {
        channels.push(format!("pty (user {})", config.comms.pty.user_id));
    }
    if config.comms.telegram.enabled {
        channels.push(format!("telegram ({:?})", config.comms.telegram.mode).to_lowercase());
    }
    let channels = if channels.is_empty() { "none".to_string() } else { channels.join(", ") };

    println!("── {} ─────────────────────────────", config.bot_name);
    println!("  storage : {:?}", config.storage.backend);
    println!("  llm     : {} ({})", config.llm.provider, config.llm.openai.model);
    println!("  agent   : {} (max {} tool rounds)", config.agents.default_agent, config.agents.max_tool_rounds);
    println!("  comms   : {channels}");
    println!("  tools   : {}", registry::TOOL_NAMES.len());
    if interactive {
        println!("💡 Type /help for help");
    }
}

struct CliArgs {
    log_level: Option<&'static str>,
    interactive: bool,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut interactive = false;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: nutri-bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -i, --interactive          Enable the console (PTY) channel");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv              Increase logging verbosity");
                std::process::exit(0);
            }
            "-i" | "--interactive" => interactive = true,
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    CliArgs { log_level: logger::level_from_verbosity(verbosity), interactive, config_path }
}
