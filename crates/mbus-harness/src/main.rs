//! `mbus-harness` binary: the CLI surface the core deliberately omits.
//! Each subcommand is one of the five operations a test harness is meant
//! to expose: `init`, `start`, `send`, `wait-for`, `stop`.
//!
//! One process == one session against one binding, so `stop` is mostly
//! documentary here: the bus is torn down on exit regardless (`Bus`'s
//! `Drop` implicitly stops and joins the receiver), but the subcommand
//! exists so a script driving a long-lived `start` in the background has
//! an explicit, nameable counterpart to call (by sending the process an
//! interrupt) rather than just killing it.

use std::{io::BufRead, path::PathBuf, process::ExitCode, time::Duration};

use clap::{Parser, Subcommand};
use mbus_harness::{config, exit_code, AnyBus, HarnessError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Drive one CAN or XBee bus session from the command line.
#[derive(Parser, Debug)]
#[command(name = "mbus-harness")]
#[command(about = "CLI surface for the inter-board robotics message bus")]
#[command(version)]
struct Args {
    /// Path to the binding's JSON config file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the binding and confirm it's ready, then exit.
    Init,
    /// Open the binding, start the receiver worker, and block until
    /// interrupted (Enter on stdin, for a scripted session).
    Start,
    /// Open the binding (starting the receiver first if a non-zero
    /// timeout is given, since that's what a response needs) and send
    /// one message.
    Send {
        /// Destination peer address.
        #[arg(long)]
        dst: u16,
        /// Function code.
        #[arg(long)]
        fct: u16,
        /// Message id. Defaults to the instance's next counter value.
        #[arg(long)]
        id: Option<u8>,
        /// Mark this message as a response rather than a request.
        #[arg(long)]
        response: bool,
        /// Payload as a hex string, e.g. `0a1bff`. Defaults to empty.
        #[arg(long, default_value = "")]
        payload: String,
        /// Milliseconds to wait for a correlated response. `0` returns
        /// immediately after the write.
        #[arg(long, default_value_t = 0)]
        timeout_ms: u64,
    },
    /// Open the binding, start the receiver, and wait for a response
    /// already correlated to `id` (e.g. one sent by a prior `send`
    /// invocation against a long-lived peer).
    WaitFor {
        /// Message id to wait for.
        #[arg(long)]
        id: u8,
        /// Milliseconds to wait before giving up.
        #[arg(long)]
        timeout_ms: u64,
    },
    /// Open the binding, start the receiver, and stop it again
    /// immediately — a smoke test that `start`/`stop` round-trip cleanly
    /// without leaving anything running.
    Stop,
}

fn run(args: &Args) -> Result<(), HarnessError> {
    let binding = config::load(&args.config)?;

    match &args.command {
        Command::Init => {
            let bus = AnyBus::open(&binding)?;
            tracing::info!("bus opened and ready");
            drop(bus);
            Ok(())
        },
        Command::Start => {
            let bus = AnyBus::open(&binding)?;
            bus.start()?;
            tracing::info!("receiver started, press Enter to stop");
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
            bus.stop();
            Ok(())
        },
        Command::Send { dst, fct, id, response, payload, timeout_ms } => {
            let payload_bytes = mbus_harness::parse_hex_payload(payload)?;
            let timeout = Duration::from_millis(*timeout_ms);
            let bus = AnyBus::open(&binding)?;
            if !timeout.is_zero() {
                bus.start()?;
            }
            let reply = bus.send(*dst, *fct, payload_bytes, *id, *response, timeout)?;
            match reply {
                Some(msg) => tracing::info!(?msg, "response received"),
                None => tracing::info!("sent, no wait requested"),
            }
            Ok(())
        },
        Command::WaitFor { id, timeout_ms } => {
            let bus = AnyBus::open(&binding)?;
            bus.start()?;
            let msg = bus.wait_for(*id, Duration::from_millis(*timeout_ms))?;
            tracing::info!(?msg, "response received");
            Ok(())
        },
        Command::Stop => {
            let bus = AnyBus::open(&binding)?;
            bus.start()?;
            let was_running = bus.is_running();
            bus.stop();
            tracing::info!(was_running, "receiver stopped");
            Ok(())
        },
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "harness command failed");
            ExitCode::from(exit_code(&err).clamp(1, 255) as u8)
        },
    }
}
