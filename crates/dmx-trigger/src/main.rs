//! dmx-trigger - run programs based on the values in a DMX stream
//!
//! Loads a trigger configuration, listens for DMX on one universe and fires
//! the configured actions as slot values change.

#![warn(missing_docs)]

mod logging_setup;
mod runner;
mod signals;

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use dmx_trigger_control::{DmxReceiver, Protocol};
use dmx_trigger_core::{ProcessSupervisor, TerminationFlag, TriggerConfig, TriggerEngine};
use tracing::{error, info};

use crate::logging_setup::LogConfig;
use crate::runner::LoopExit;
use crate::signals::UnixSignals;

/// Process exit statuses, following BSD sysexits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    /// Clean shutdown
    Ok = 0,
    /// Configuration could not be loaded (EX_DATAERR)
    Config = 65,
    /// Frame source could not be opened or failed (EX_UNAVAILABLE)
    Unavailable = 69,
    /// Internal failure such as logging setup (EX_SOFTWARE)
    Software = 70,
    /// Signal handlers could not be installed (EX_OSERR)
    OsErr = 71,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

/// Network protocol selection
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ProtocolArg {
    /// Art-Net (UDP 6454)
    #[default]
    Artnet,
    /// sACN / E1.31 (UDP 5568, multicast)
    Sacn,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Artnet => Protocol::ArtNet,
            ProtocolArg::Sacn => Protocol::Sacn,
        }
    }
}

/// Run programs based on the values in a DMX stream.
#[derive(Debug, Parser)]
#[command(name = "dmx-trigger", version, about)]
struct Cli {
    /// Trigger configuration (.toml, .ron or .json)
    config: PathBuf,

    /// The universe to use (defaults to the config file's, then 1)
    #[arg(short, long)]
    universe: Option<u16>,

    /// Set the logging level 0 .. 4
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=4))]
    log_level: u8,

    /// Network protocol to receive DMX on
    #[arg(short, long, value_enum, default_value_t)]
    protocol: ProtocolArg,

    /// Local address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Do not log to stderr
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_verbosity(cli.log_level, cli.log_file.clone());
    log_config.console_output = !cli.quiet;

    let _log_guard = match logging_setup::init(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Exit::Software.into();
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return Exit::Software.into();
        }
    };

    runtime.block_on(run(cli)).into()
}

async fn run(cli: Cli) -> Exit {
    info!("Loading config from {:?}", cli.config);
    let config = match TriggerConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}: {}", cli.config.display(), e);
            return Exit::Config;
        }
    };

    let universe = cli.universe.unwrap_or_else(|| config.universe_or_default());
    let (context, groups) = config.into_parts();
    let mut engine = TriggerEngine::new(universe, context, groups);

    let protocol = Protocol::from(cli.protocol);
    let mut receiver = match DmxReceiver::bind(protocol, universe, cli.bind).await {
        Ok(receiver) => receiver,
        Err(e) => {
            error!("Failed to open {} input: {}", protocol, e);
            return Exit::Unavailable;
        }
    };

    let mut signals = match UnixSignals::install() {
        Ok(signals) => signals,
        Err(e) => {
            error!("Failed to install signal handlers: {}", e);
            return Exit::OsErr;
        }
    };

    info!(
        "Watching {} universe {} with actions on {} slots",
        protocol,
        universe,
        engine.group_count()
    );

    let termination = TerminationFlag::new();
    let mut supervisor = ProcessSupervisor::new();
    let (exit, stats) = runner::run(
        &mut engine,
        &mut receiver,
        &mut signals,
        &mut supervisor,
        &termination,
    )
    .await;

    supervisor.reap();
    info!(
        "Stopped after {} frames ({} ignored, {} bad packets); {} actions fired, {} failed",
        stats.frames_processed,
        stats.frames_ignored,
        stats.bad_packets,
        stats.actions_fired,
        stats.actions_failed
    );
    if supervisor.outstanding() > 0 {
        info!(
            "Leaving {} child processes running",
            supervisor.outstanding()
        );
    }

    match exit {
        LoopExit::Terminated | LoopExit::SourceClosed => Exit::Ok,
        LoopExit::SourceFailed => Exit::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["dmx-trigger", "rules.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("rules.toml"));
        assert_eq!(cli.universe, None);
        assert_eq!(cli.log_level, 3);
        assert!(matches!(cli.protocol, ProtocolArg::Artnet));
        assert_eq!(cli.bind, "0.0.0.0".parse::<IpAddr>().unwrap());
        assert!(!cli.quiet);
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::try_parse_from([
            "dmx-trigger",
            "-u",
            "7",
            "-l",
            "4",
            "--protocol",
            "sacn",
            "--quiet",
            "--log-file",
            "trigger.log",
            "rules.json",
        ])
        .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.log_file, Some(PathBuf::from("trigger.log")));
        assert_eq!(cli.universe, Some(7));
        assert_eq!(cli.log_level, 4);
        assert_eq!(Protocol::from(cli.protocol), Protocol::Sacn);
    }

    #[test]
    fn test_cli_rejects_bad_log_level() {
        assert!(Cli::try_parse_from(["dmx-trigger", "-l", "5", "rules.toml"]).is_err());
        assert!(Cli::try_parse_from(["dmx-trigger"]).is_err());
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            Exit::Ok as u8,
            Exit::Config as u8,
            Exit::Unavailable as u8,
            Exit::Software as u8,
            Exit::OsErr as u8,
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
        assert_eq!(Exit::Config as u8, 65);
    }

    #[tokio::test]
    async fn test_bad_config_exits_before_binding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[[slot]]\nslot = 0\n").unwrap();

        let cli = Cli::try_parse_from(["dmx-trigger", path.to_str().unwrap()]).unwrap();
        assert_eq!(run(cli).await, Exit::Config);
    }
}
