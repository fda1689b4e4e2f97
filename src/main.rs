// kiosklock CLI - headless harness for the kiosk lock engine
// Wires log-only platform collaborators and feeds remote commands from stdin

use anyhow::{Context, Result};
use clap::Parser;
use kiosklock::device::{LogScreen, LogSurface, StaticDevicePolicy};
use kiosklock::router::NavigationIntent;
use kiosklock::{prefs::PrefStore, vault::Vault, KioskCore};
use log::{error, info, warn};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// Kiosk lock engine: pins a tablet to one web application behind a
/// PIN-gated settings area
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Kiosk lock engine: pins a device to one web application",
    long_about = "Kiosk lock engine: pins a device to one web application behind a
PIN-gated settings area.

This binary runs the engine headless: platform calls (display brightness,
lock-task enforcement, the web view) are logged instead of executed, and the
remote command channel is read line by line from stdin:

  reboot
  set_volume:<0-100>
  navigate_to:<welcome|settings>

SETUP:
  Run 'kiosklock --setup' to configure the target URL and the admin PIN.
  The admin PIN defaults to 1234 until changed."
)]
struct Args {
    /// Directory holding the settings file and the encrypted vault
    /// (defaults to the platform config directory)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Treat this process as holding the device-owner privilege
    #[arg(long)]
    device_owner: bool,

    /// Run interactive setup to configure the URL and PINs
    #[arg(long)]
    setup: bool,
}

fn default_data_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Failed to determine config directory")?
        .join("kiosklock"))
}

/// Helper to prompt for a line with a default value
fn prompt_line(prompt: &str, default: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input.to_string())
    }
}

/// Run interactive setup to configure the target URL and PINs
fn run_setup(data_dir: PathBuf) -> Result<()> {
    println!("kiosklock Setup");
    println!("===============\n");

    let prefs = PrefStore::open(data_dir.join("settings.toml"));
    let vault = Vault::open(data_dir.join("vault.toml"));

    let url = prompt_line("Target URL (http:// or https://, empty to clear): ", "")?;
    if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("Error: URL must start with http:// or https://");
    }
    prefs.save_url(&url).context("Failed to save URL")?;

    let admin_pin = rpassword::prompt_password("New admin PIN (empty to keep current): ")
        .context("Failed to read admin PIN")?;
    if !admin_pin.is_empty() {
        let confirm = rpassword::prompt_password("Confirm admin PIN: ")
            .context("Failed to read confirmation")?;
        if admin_pin != confirm {
            anyhow::bail!("Error: PINs do not match");
        }
        vault
            .save_admin_pin(&admin_pin)
            .context("Failed to save admin PIN")?;
    }

    let kiosk_pin = rpassword::prompt_password(
        "Kiosk exit PIN, 4 digits (empty to leave unset, 'clear' to remove): ",
    )
    .context("Failed to read kiosk PIN")?;
    match kiosk_pin.as_str() {
        "" => {}
        "clear" => vault
            .clear_kiosk_pin()
            .context("Failed to clear kiosk PIN")?,
        pin => vault
            .save_kiosk_pin(pin)
            .context("Failed to save kiosk PIN")?,
    }

    println!("\nConfiguration saved to: {}", data_dir.display());
    println!("Setup complete!");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    if args.setup {
        return run_setup(data_dir);
    }

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting kiosklock (data dir: {})", data_dir.display());

    let core = KioskCore::new(
        &data_dir,
        Arc::new(StaticDevicePolicy::new(args.device_owner)),
        Arc::new(LogScreen),
        Arc::new(LogSurface::new()),
    );

    // Presentation stand-in: consume navigation intents and log them.
    let nav_rx = core.router.subscribe();
    thread::Builder::new()
        .name("nav-consumer".to_string())
        .spawn(move || {
            for intent in nav_rx.iter() {
                match intent {
                    NavigationIntent::Navigate {
                        target,
                        pop_up_to,
                        inclusive,
                    } => match pop_up_to {
                        Some(pop) => info!(
                            "NAVIGATE -> {} (pop up to {}, inclusive: {})",
                            target, pop, inclusive
                        ),
                        None => info!("NAVIGATE -> {}", target),
                    },
                    NavigationIntent::PopBackStack => info!("NAVIGATE <- pop back stack"),
                }
            }
        })
        .expect("Failed to spawn nav-consumer thread");

    core.start_background_threads();

    if core.aggregator.current().is_unconfigured() {
        info!("STATUS: UNCONFIGURED - run 'kiosklock --setup' to set a target URL");
    } else {
        info!("STATUS: CONFIGURED - kiosk session active");
    }
    info!("Reading remote commands from stdin (reboot | set_volume:<n> | navigate_to:<route>)");

    // Remote command channel stand-in: one command per stdin line.
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = core.handle_remote_command(&line) {
            // Malformed commands are logged and dropped.
            error!("Dropping remote command: {:#}", e);
        }
    }

    warn!("stdin closed - shutting down");
    Ok(())
}
