//! Announcer main entry point
//!
//! The event loop wakes for three reasons:
//! 1. a line of user input, read on a background thread
//! 2. a status update from a playback worker
//! 3. the scheduler's periodic check coming due
//!
//! Workers queue events and wake the `mio::Poll` through a `Waker`.

use announcer::playback::Status;
use announcer::state::config::Config;
use announcer::state::AppState;
use announcer::ui::{spawn_line_reader, ChannelStatus, EventQueue, Shell, ShellAction, UiEvent};
use announcer::{AnnouncerError, Result};
use log::{debug, error, info};
use mio::{Events, Poll, Token, Waker};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Token for the waker in mio poll
const WAKER: Token = Token(0);

/// Longest time the loop sleeps without looking at the shutdown flag
const MAX_POLL_WAIT: Duration = Duration::from_millis(250);

/// Set by SIGINT/SIGTERM
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_shutdown(_: libc::c_int) {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

/// Command line options
struct Options {
    debug: bool,
    config: Option<PathBuf>,
}

fn parse_args() -> std::result::Result<Options, String> {
    let mut options = Options {
        debug: false,
        config: None,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--debug" | "-d" => options.debug = true,
            "--config" | "-c" => {
                let path = args.next().ok_or("--config needs a path")?;
                options.config = Some(PathBuf::from(path));
            }
            "--version" | "-V" => {
                println!("{} {}", announcer::APP_NAME, announcer::VERSION);
                process::exit(0);
            }
            other => return Err(format!("Unknown argument '{}'", other)),
        }
    }

    Ok(options)
}

fn main() {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: announcer [--debug|-d] [--config <path>]");
            process::exit(2);
        }
    };

    // Initialize logger
    if options.debug {
        // Debug mode: write to announcer.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("announcer.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open announcer.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "Announcer version {} starting (debug mode, logging to announcer.log)",
            announcer::VERSION
        );
    } else {
        // Normal mode: only errors, so log lines don't break the console
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }

    if let Err(e) = run(options) {
        error!("Fatal error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn install_signal_handlers() -> Result<()> {
    for sig in [Signal::SIGINT, Signal::SIGTERM] {
        unsafe {
            signal::signal(sig, SigHandler::Handler(handle_shutdown)).map_err(|e| {
                AnnouncerError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("Failed to set {} handler: {}", sig, e),
                ))
            })?;
        }
    }
    Ok(())
}

fn run(options: Options) -> Result<()> {
    debug!("Initializing announcer");

    let config = match &options.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Config loaded from {:?}", config.path());

    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(16);
    let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);
    let (tx, rx) = mpsc::channel();
    let queue = EventQueue::new(tx, waker);

    let mut state = AppState::open(config, Arc::new(ChannelStatus::new(queue.clone())))?;

    // Colours and prompts only make sense on a terminal
    let interactive = unsafe { libc::isatty(io::stdin().as_raw_fd()) } != 0;
    let mut shell = Shell::new(interactive);

    install_signal_handlers()?;
    spawn_line_reader(queue)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    shell.greet(&state, &mut out)?;
    shell.show_status(&Status::default(), &mut out)?;

    info!("Announcer ready - entering event loop");

    let mut input_closed = false;
    loop {
        if SHUTDOWN.load(Ordering::Relaxed) {
            info!("Shutdown requested by signal");
            break;
        }

        if state.is_check_due(Instant::now()) {
            state.tick();
        }

        let timeout = state
            .time_until_next_check(Instant::now())
            .map(|d| d.min(MAX_POLL_WAIT))
            .unwrap_or(MAX_POLL_WAIT);

        if let Err(e) = poll.poll(&mut events, Some(timeout)) {
            if e.kind() == io::ErrorKind::Interrupted {
                debug!("poll() interrupted by signal");
                continue;
            }
            return Err(e.into());
        }

        let mut quit = false;
        loop {
            match rx.try_recv() {
                Ok(UiEvent::Line(line)) => {
                    if shell.handle_line(&mut state, &line, &mut out)? == ShellAction::Quit {
                        quit = true;
                        break;
                    }
                }
                Ok(UiEvent::Eof) => {
                    debug!("Input closed");
                    input_closed = true;
                }
                Ok(UiEvent::Status(status)) => shell.show_status(&status, &mut out)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    input_closed = true;
                    break;
                }
            }
        }

        if quit {
            info!("Quit requested");
            break;
        }

        // Scripted input: wait for pending broadcasts to finish, then exit
        if input_closed && !state.is_busy() {
            info!("Input closed and nothing pending, exiting");
            break;
        }
    }

    state.shutdown();
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
