//! neurited - headless brain-on-a-track simulation daemon
//!
//! The process is a thin shell around `neurite::driver::Driver`:
//! - stdin carries the line-oriented command protocol
//!   (start/resume/pause/reset/stop/speed <ms>)
//! - stdout carries one JSON snapshot per tick, newline-delimited
//! - diagnostics go to an append-only log file, never to stdout
//!
//! The supervising shell owns rendering and frame dropping; we keep ticking
//! at the requested pace regardless of how fast it drains the pipe.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use neurite::driver::{Command, ControlFlags, Driver, LifeEvent};
use neurite::params::Params;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

struct Options {
    seed: Option<u64>,
    delay_ms: u64,
    log_path: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            seed: None,
            delay_ms: 500,
            log_path: PathBuf::from("neurited.log"),
        }
    }
}

fn print_help() {
    println!("neurited (spiking-net simulation daemon)");
    println!("usage:");
    println!("  neurited [--seed <u64>] [--delay <ms>] [--log <path>]");
    println!();
    println!("  --seed <u64>   fixed seed for reproducible runs (default: wall clock)");
    println!("  --delay <ms>   initial inter-tick delay (default: 500)");
    println!("  --log <path>   log file (default: neurited.log)");
}

fn parse_options() -> Result<Options, String> {
    let mut opts = Options::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" | "help" => {
                print_help();
                std::process::exit(0);
            }
            "--seed" => {
                let v = args.next().ok_or("--seed needs a value")?;
                opts.seed = Some(v.parse().map_err(|_| format!("bad --seed value: {v:?}"))?);
            }
            "--delay" => {
                let v = args.next().ok_or("--delay needs a value")?;
                opts.delay_ms = v.parse().map_err(|_| format!("bad --delay value: {v:?}"))?;
            }
            "--log" => {
                opts.log_path = PathBuf::from(args.next().ok_or("--log needs a value")?);
            }
            other => return Err(format!("unknown argument: {other:?}")),
        }
    }
    Ok(opts)
}

/// Read commands from stdin and translate them onto the control flags.
/// A closed stream means the supervising shell went away: stop.
async fn read_commands(flags: Arc<ControlFlags>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match Command::parse(line) {
                    Ok(cmd) => {
                        info!("command: {cmd:?}");
                        flags.apply(cmd);
                        if cmd == Command::Stop {
                            break;
                        }
                    }
                    Err(reason) => warn!("rejected command {line:?}: {reason}"),
                }
            }
            Ok(None) => {
                info!("command stream closed; stopping");
                flags.stop();
                break;
            }
            Err(e) => {
                error!("command stream error: {e}; stopping");
                flags.stop();
                break;
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = match parse_options() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("neurited: {e}");
            eprintln!("try: neurited --help");
            return ExitCode::from(2);
        }
    };

    // stdout belongs to the snapshot stream, so diagnostics append to a
    // file. The mutex makes the sink safe for both runtime threads.
    let log_file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&opts.log_path)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("neurited: cannot open log file {:?}: {e}", opts.log_path);
            return ExitCode::FAILURE;
        }
    };
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    info!("process started");

    let params = Params {
        seed: opts.seed,
        ..Params::default()
    };
    let flags = Arc::new(ControlFlags::new());
    flags.set_delay_ms(opts.delay_ms);

    tokio::spawn(read_commands(Arc::clone(&flags)));

    // Stop cleanly on Ctrl-C as well, so the exit code stays zero.
    {
        let flags = Arc::clone(&flags);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; stopping");
                flags.stop();
            }
        });
    }

    // The simulation is synchronous and paces itself with sleeps; give it a
    // blocking thread and let the async side own only the boundary.
    let sim_flags = Arc::clone(&flags);
    let sim = tokio::task::spawn_blocking(move || {
        let driver = Driver::new(params, sim_flags);
        let stdout = std::io::stdout();
        driver.run(
            |snap| match serde_json::to_string(snap) {
                Ok(mut line) => {
                    line.push('\n');
                    let mut out = stdout.lock();
                    if let Err(e) = out.write_all(line.as_bytes()).and_then(|_| out.flush()) {
                        // A slow or gone consumer is not our problem; keep ticking.
                        warn!("snapshot write failed: {e}");
                    }
                }
                Err(e) => warn!("snapshot encode failed: {e}"),
            },
            |event| match event {
                LifeEvent::Started => info!("entering simulation loop"),
                LifeEvent::ResetTriggered => info!("simulation reset triggered"),
            },
        );
    });

    match sim.await {
        Ok(()) => {
            info!("process exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("simulation thread died: {e}");
            ExitCode::FAILURE
        }
    }
}
