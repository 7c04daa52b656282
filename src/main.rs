#![forbid(unsafe_code)]

mod blacklist;
mod catalog;
mod config;
mod constants;
mod engine;
mod error;
mod executor;
mod notify;
mod plan;
mod profile;
mod service;
mod state;
mod system;
mod types;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use config::AppConfig;
use notify::EventListener;
use service::{ProfileService, Request, ServiceHandle};
use types::RequestedValue;

#[derive(Parser)]
#[command(name = "profilectl", about = "Device-setting profile manager for rooted devices")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List saved profiles
    List,
    /// Show the currently applied state
    Current,
    /// Load a profile by name
    Load {
        /// Profile name (the file name, not the display title)
        name: String,
    },
    /// Turn off the active profile and restore the pre-profile state
    Off,
    /// Apply a single setting change as an ephemeral quick action
    Quick {
        /// Setting key (size, density, overscan, chrome_desktop,
        /// vibration_off, backlight_off, immersive, rotation_lock)
        key: String,
        /// Desired value, or "toggle" to negate the applied value
        value: String,
    },
    /// Arm a one-shot flag consumed by the next pass
    Force {
        #[command(subcommand)]
        flag: ForceFlag,
    },
    /// Update an application config value
    Config {
        /// Config key (safe_mode, debug_mode, landscape, native_width,
        /// native_height, native_density)
        key: String,
        value: String,
    },
    /// Print profile events as they happen
    Watch,
}

#[derive(Subcommand)]
enum ForceFlag {
    /// Rerun the refresh strategy on the next pass even without a metric
    /// change
    Refresh,
    /// Clear the forced-compatibility overrides on the next pass
    SafeMode,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    match cli.command {
        Command::List => list()?,
        Command::Current => current()?,
        Command::Load { name } => run_pass(Request::Load(name))?,
        Command::Off => run_pass(Request::TurnOff)?,
        Command::Quick { key, value } => {
            let value = RequestedValue::from_arg(&value);
            run_pass(Request::QuickAction { key, value })?;
        }
        Command::Force { flag } => force(flag)?,
        Command::Config { key, value } => set_config(&key, &value)?,
        Command::Watch => watch()?,
    }
    Ok(())
}

fn force(flag: ForceFlag) -> Result<()> {
    let mut service = ProfileService::open_default()?;
    match flag {
        ForceFlag::Refresh => service.force_ui_refresh()?,
        ForceFlag::SafeMode => service.force_safe_mode()?,
    }
    Ok(())
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = AppConfig::load()?;
    match key {
        "safe_mode" => config.safe_mode = parse_flag(value)?,
        "debug_mode" => config.debug_mode = parse_flag(value)?,
        "landscape" => config.landscape = parse_flag(value)?,
        "native_width" => config.native_width = value.parse()?,
        "native_height" => config.native_height = value.parse()?,
        "native_density" => config.native_density = value.parse()?,
        _ => anyhow::bail!("unknown config key `{key}`"),
    }
    config.save()?;
    info!(key, value, "config updated");
    Ok(())
}

fn parse_flag(value: &str) -> Result<bool> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => anyhow::bail!("expected on/off, got `{value}`"),
    }
}

fn list() -> Result<()> {
    let service = ProfileService::open_default()?;
    let active = service.current_state()?.filename;
    let profiles = service.profiles().list()?;
    if profiles.is_empty() {
        println!("no saved profiles");
        return Ok(());
    }
    for (name, title) in profiles {
        let marker = if active.as_deref() == Some(name.as_str()) { "*" } else { " " };
        println!("{marker} {name}  {title}");
    }
    Ok(())
}

fn current() -> Result<()> {
    let service = ProfileService::open_default()?;
    let snapshot = service.current_state()?;
    if snapshot.not_active {
        println!("no profile active");
        return Ok(());
    }
    println!("profile:  {}", snapshot.profile_name);
    println!("size:     {}", snapshot.size);
    println!("density:  {}", snapshot.density);
    if let Some(name) = &snapshot.filename {
        println!("name:     {name}");
    }
    Ok(())
}

/// Queue a single pass on the worker and report what it did
fn run_pass(request: Request) -> Result<()> {
    let service = ProfileService::open_default()?;
    let (handle, worker): (ServiceHandle, _) = service::spawn(service);

    let report = handle.submit(request)?;
    match &report.active {
        Some(name) => info!(profile = %name, "profile applied"),
        None => info!("profile turned off"),
    }
    for command in &report.commands {
        println!("ran: {command}");
    }
    for (slot, command) in &report.deferred {
        println!("deferred ({slot:?}): {command}");
    }

    drop(handle);
    if worker.join().is_err() {
        anyhow::bail!("profile worker panicked");
    }
    Ok(())
}

fn watch() -> Result<()> {
    let listener = EventListener::bind_default()?;
    info!(socket = %listener.socket_path().display(), "listening for profile events");
    loop {
        match listener.next_event() {
            Ok(event) => println!("{event:?}"),
            Err(e) => tracing::warn!(error = %e, "dropped event connection"),
        }
    }
}
