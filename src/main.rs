//! Pay provider fees for every ticket in the wallet, then set vote choices.

use std::path::{Path, PathBuf};

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use figment::Figment;
use log::{error, info};

use vspclient::config::Config;
use vspclient::logging;
use vspclient::model::timestamp::SystemClock;
use vspclient::transport::ReqwestTransport;
use vspclient::wallet::RpcWallet;
use vspclient::{BatchReport, Session, Settings};

const PROGRAM_NAME: &str = "vspclient";

const ABOUT_TEXT: &str = "Pay voting service provider fees for the wallet's tickets.

EXIT CODES:
     0: Every ticket was paid for or deferred.
     1: Fatal error; no ticket was processed.
     2: At least one ticket failed.";

const EXIT_OK: u8 = 0;
const EXIT_FATAL: u8 = 1;
const EXIT_TICKET_FAILED: u8 = 2;

const CONFIG: &str = "CONFIG";
const LOG_CONFIG: &str = "LOG_CONFIG";
const PROVIDER_URL: &str = "PROVIDER_URL";
const PROTOCOL: &str = "PROTOCOL";
const DRY_RUN: &str = "DRY_RUN";

const DEFAULT_CONFIG: &str = "vspclient.toml";
const DEFAULT_LOG_CONFIG: &str = "log4rs.yaml";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(CONFIG)
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: vspclient.toml]")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new(LOG_CONFIG)
                .long("log-config")
                .value_name("FILE")
                .help("log4rs configuration [default: log4rs.yaml]")
                .value_parser(value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new(PROVIDER_URL)
                .long("provider-url")
                .value_name("URL")
                .help("Provider base URL, overriding the config file")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new(PROTOCOL)
                .long("protocol")
                .help("Protocol preset, overriding the config file")
                .value_parser(["current", "legacy"])
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new(DRY_RUN)
                .long("dry-run")
                .help("Discover the provider and list tickets, but pay nothing")
                .action(ArgAction::SetTrue),
        )
}

fn path_arg<'a>(args: &'a ArgMatches, id: &str, default: &'static str) -> &'a Path {
    args.get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .unwrap_or_else(|| Path::new(default))
}

/// The config file and environment, with command-line overrides on top.
fn figment(args: &ArgMatches) -> Figment {
    let mut figment = Config::figment(path_arg(args, CONFIG, DEFAULT_CONFIG));
    if let Some(url) = args.get_one::<String>(PROVIDER_URL) {
        figment = figment.merge(("provider.url", url.as_str()));
    }
    if let Some(preset) = args.get_one::<String>(PROTOCOL) {
        figment = figment.merge(("protocol.preset", preset.as_str()));
    }
    figment
}

fn exit_code(result: &vspclient::Result<BatchReport>) -> u8 {
    match result {
        Ok(report) if report.any_failed() => EXIT_TICKET_FAILED,
        Ok(_) => EXIT_OK,
        Err(_) => EXIT_FATAL,
    }
}

fn process(config: &Config, dry_run: bool) -> vspclient::Result<BatchReport> {
    let settings = Settings::from(config);
    info!(
        "Using provider {} ({} network)",
        settings.base_url, settings.network
    );
    let wallet = RpcWallet::new(config.wallet())?;
    let transport = ReqwestTransport::new(config.provider().timeout())?;
    let session = Session::connect(settings, wallet, transport, SystemClock)?;

    if dry_run {
        let tickets = session.tickets()?;
        info!("Dry run: {} ticket(s) would be processed", tickets.len());
        for ticket in tickets {
            println!("{ticket}");
        }
        return Ok(BatchReport::default());
    }
    session.run()
}

fn run(args: &ArgMatches) -> u8 {
    let config = match Config::from_figment(&figment(args)) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return EXIT_FATAL;
        }
    };

    let result = process(&config, args.get_flag(DRY_RUN));
    match &result {
        Ok(report) => info!("Finished: {report}"),
        Err(err) => {
            error!("{err}");
            error!("Critical failure, no tickets processed");
        }
    }
    exit_code(&result)
}

fn main() {
    let args = cli().get_matches();

    // Set up logging.
    if let Err(err) = logging::init(path_arg(&args, LOG_CONFIG, DEFAULT_LOG_CONFIG)) {
        eprintln!("{err}");
        std::process::exit(EXIT_FATAL.into())
    }
    info!("Initialised logging");

    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
