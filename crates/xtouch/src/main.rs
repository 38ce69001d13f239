//! xtouch - print XInput2 touch samples
//!
//! Opens a touch window on the X display and prints one line per touch
//! sample until a key is pressed in the window.
//!
//! # Usage
//!
//! ```sh
//! xtouch                     # default display, first touchscreen
//! xtouch --json              # JSON lines instead of text
//! xtouch --list-devices      # show what the server enumerates
//! xtouch --display :1 --config ./xtouch.toml
//! ```
//!
//! Logs go to stderr and follow `RUST_LOG`.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use xtouch::session::enumerate_devices;
use xtouch::{Config, DevicePolicy, Dispatch, PassEnd, TouchPump, TouchSample, X11Backend};

/// How long to block for events between polls
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

const USAGE: &str = "usage: xtouch [--config PATH] [--display NAME] [--json] \
[--legacy-device-selection] [--list-devices]";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    display: Option<String>,
    json: bool,
    legacy_device_selection: bool,
    list_devices: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<Args>> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--display" => {
                parsed.display = Some(args.next().context("--display needs a name")?);
            }
            "--json" => parsed.json = true,
            "--legacy-device-selection" => parsed.legacy_device_selection = true,
            "--list-devices" => parsed.list_devices = true,
            "-h" | "--help" => return Ok(None),
            other => bail!("unknown argument: {other}\n{USAGE}"),
        }
    }

    Ok(Some(parsed))
}

fn main() -> Result<()> {
    setup_logging();

    let Some(args) = parse_args(std::env::args().skip(1))? else {
        println!("{USAGE}");
        return Ok(());
    };

    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::from_path(path)
                .with_context(|| format!("loading {}", path.display()))?;
            config.apply_env();
            config
        }
        None => Config::load(),
    };
    if args.display.is_some() {
        config.display = args.display.clone();
    }
    if args.legacy_device_selection {
        config.device = DevicePolicy::FirstNonTouch;
    }

    if args.list_devices {
        return list_devices(&config);
    }

    run(&config, args.json)
}

fn run(config: &Config, json: bool) -> Result<()> {
    let session = xtouch::initialize(config).context("touch initialization failed")?;
    tracing::info!(
        device = session.handle().device_id(),
        name = session.handle().device.name(),
        "INIT finished, press a key in the window to quit"
    );

    let mut pump = TouchPump::with_handler(session, move |sample: &TouchSample| {
        match print_sample(sample, json) {
            Ok(()) => Dispatch::Continue,
            Err(e) => {
                tracing::warn!(error = %e, "stdout closed, stopping");
                Dispatch::Stop
            }
        }
    });

    loop {
        pump.wait(FRAME_INTERVAL)?;
        let summary = pump.poll()?;
        match summary.end {
            PassEnd::KeyPress | PassEnd::HandlerStop => break,
            PassEnd::Drained | PassEnd::Budget => {}
        }
    }

    tracing::info!("exiting");
    Ok(())
}

fn print_sample(sample: &TouchSample, json: bool) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    if json {
        serde_json::to_writer(&mut stdout, sample)?;
        writeln!(stdout)?;
    } else {
        writeln!(
            stdout,
            "id={} state={} x={:.2} y={:.2}",
            sample.identifier,
            sample.phase.code(),
            sample.x,
            sample.y
        )?;
    }
    stdout.flush()?;
    Ok(())
}

fn list_devices(config: &Config) -> Result<()> {
    let mut backend = X11Backend::connect(config.display.as_deref())?;
    let listing = enumerate_devices(&mut backend, config)?;
    tracing::debug!(version = ?listing.version, "listing devices");

    let selected = listing.selected;
    for device in listing.devices {
        let marker = if selected.as_ref().map(|t| t.id()) == Some(device.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:>3}  {:<40} {:?}",
            device.id, device.name, device.classes
        );
    }
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,x11rb=warn"));

    // Respect NO_COLOR environment variable for testing
    let use_ansi = std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_ansi(use_ansi),
        )
        .with(filter)
        .init();
}
