//! keyprobe - log the keys typed on the local keyboard.

use anyhow::{Context, Result};
use clap::builder::EnumValueParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use futures::StreamExt;
use keyprobe::output::{Format, KeyWriter};
use keyprobe::terminal::EchoGuard;
use keyprobe::{
    candidates, device_capabilities, until_terminated, DeviceScanner, DeviceSession, InputDevices,
    KeyStream, KeycodeTable, KeyprobeError, Outcome, TerminalOperator, Termination, INPUT_DIR,
    MAX_BATCH_SIZE,
};
use log::{debug, warn};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Where the keys come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeviceArg {
    Scan,
    Path(PathBuf),
}

#[derive(Debug)]
struct Options {
    device: Option<DeviceArg>,
    input_dir: PathBuf,
    format: Format,
    timestamps: bool,
    batch_size: usize,
    list: bool,
}

impl Options {
    fn from_matches(matches: &ArgMatches) -> Self {
        let device = matches.get_one::<String>("device").map(|device| {
            if device == "scan" {
                DeviceArg::Scan
            } else {
                DeviceArg::Path(PathBuf::from(device))
            }
        });

        Self {
            device,
            input_dir: matches
                .get_one::<PathBuf>("input-dir")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(INPUT_DIR)),
            format: matches.get_one::<Format>("format").copied().unwrap_or_default(),
            timestamps: matches.get_flag("timestamps"),
            batch_size: matches
                .get_one::<u16>("batch")
                .map_or(keyprobe::DEFAULT_BATCH_SIZE, |n| usize::from(*n)),
            list: matches.get_flag("list"),
        }
    }
}

fn cli() -> Command {
    Command::new("keyprobe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Log the keys typed on the local keyboard")
        .long_about(
            "keyprobe reads raw input events from a keyboard event device and prints the keys \
             that are pressed. Pass the device path, or `scan` to find the keyboard by \
             probing every device while you hold down the enter key.",
        )
        .arg(
            Arg::new("device")
                .help("Path of the event device, or `scan` to probe for it")
                .env("KEYPROBE_DEVICE")
                .index(1),
        )
        .arg(
            Arg::new("input-dir")
                .long("input-dir")
                .help("Directory holding the event devices")
                .env("KEYPROBE_INPUT_DIR")
                .value_parser(value_parser!(PathBuf))
                .default_value(INPUT_DIR),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .help("How to print keys")
                .value_parser(EnumValueParser::<Format>::new())
                .default_value("symbol"),
        )
        .arg(
            Arg::new("timestamps")
                .long("timestamps")
                .help("Prefix each line with the event time (code and both formats)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("batch")
                .long("batch")
                .help("Number of events requested per read")
                .value_parser(value_parser!(u16).range(1..=MAX_BATCH_SIZE as i64))
                .default_value("64"),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .help("List the devices in the input directory and exit")
                .action(ArgAction::SetTrue),
        )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let options = Options::from_matches(&cli().get_matches());

    if options.list {
        return match list(&options.input_dir) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        };
    }

    let Some(device) = options.device.clone() else {
        println!("Please specify the path to the event device on the command line.");
        println!("If you do not know which device to use, pass `scan` instead.");
        return ExitCode::SUCCESS;
    };

    if !nix::unistd::getuid().is_root() {
        eprintln!("warning: not running as root, device access may fail");
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: cannot start the runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(run(&options, device));

    // A decoder blocked in read() must not hold up the exit.
    runtime.shutdown_background();

    code
}

async fn run(options: &Options, device: DeviceArg) -> ExitCode {
    let mut termination = match Termination::register() {
        Ok(termination) => termination,
        Err(e) => {
            eprintln!("error: cannot register signal handlers: {e}");
            return ExitCode::FAILURE;
        }
    };

    let guard = disable_echo();

    match until_terminated(&mut termination, guard, capture(options, device)).await {
        Outcome::Finished(Ok(())) => ExitCode::SUCCESS,
        Outcome::Terminated(signal) => {
            println!("\nexiting...({signal})");
            ExitCode::SUCCESS
        }
        Outcome::Finished(Err(e)) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn disable_echo() -> Option<EchoGuard<io::Stdin>> {
    let stdin = io::stdin();

    if !stdin.is_terminal() {
        debug!("stdin is not a terminal, leaving echo alone");
        return None;
    }

    match EchoGuard::disable(stdin) {
        Ok(guard) => Some(guard),
        Err(e) => {
            warn!("cannot disable terminal echo: {e}");
            None
        }
    }
}

async fn capture(options: &Options, device: DeviceArg) -> Result<()> {
    let path = match device {
        DeviceArg::Path(path) => path,
        DeviceArg::Scan => scan(options.input_dir.clone()).await?,
    };

    let session = DeviceSession::open(&path).with_context(|| {
        format!(
            "{} is not a valid device, try using the argument `scan`",
            path.display()
        )
    })?;

    let decoder = session.into_decoder(KeycodeTable::default(), options.batch_size);
    let mut keys = KeyStream::spawn(decoder);
    let mut writer = KeyWriter::new(io::stdout(), options.format, options.timestamps);

    while let Some(key) = keys.next().await {
        let key = key.context("reading key events")?;
        writer.write_key(&key).context("writing key")?;
    }

    Err(KeyprobeError::DecoderExited.into())
}

async fn scan(dir: PathBuf) -> Result<PathBuf> {
    let found = tokio::task::spawn_blocking({
        let dir = dir.clone();
        move || DeviceScanner::new(InputDevices, TerminalOperator::stdio()).scan(&dir)
    })
    .await
    .context("device scan did not complete")?
    .context("scanning for devices")?;

    found
        .ok_or(KeyprobeError::NoDeviceFound(dir))
        .context("is the event interface enabled?")
}

fn list(dir: &Path) -> Result<()> {
    for path in candidates(dir)? {
        match device_capabilities(&path) {
            Ok(caps) => println!(
                "{}\t{}\t{}",
                path.display(),
                caps.name.as_deref().unwrap_or("unknown"),
                if caps.keyboard { "keyboard" } else { "-" }
            ),
            Err(e) => println!("{}\t({e})", path.display()),
        }
    }

    Ok(())
}
