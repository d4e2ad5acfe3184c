//! Binary entrypoint for the waygate CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `generate --seed <n> [--theme <key>]` - print a field layout as JSON
//! - `simulate [--steps <n>]` - two players travelling over the loopback network
//!
//! See the library crate docs for module-level details: `waygate::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use waygate::config::Config;
use waygate::field::{FieldGenerator, Theme};
use waygate::logutil::parse_level;
use waygate::metrics;
use waygate::session::{LoopbackNetwork, PeerId};
use waygate::travel::{TravelNotice, TravelService, TravelSettings};

#[derive(Parser)]
#[command(name = "waygate")]
#[command(about = "Town and field session travel for peer-hosted games")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Generate a field and print its layout as JSON
    Generate {
        #[arg(short, long)]
        seed: u64,
        /// Theme key (verdant, ember, tidal, frost); defaults to the configured theme
        #[arg(short, long)]
        theme: Option<String>,
    },
    /// Run a scripted two-player session over the in-process network
    Simulate {
        /// Number of portal hops the visitor makes
        #[arg(short, long, default_value_t = 3)]
        steps: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command {
        Commands::Init => None,
        _ => match Config::load(&cli.config).await {
            Ok(c) => Some(c),
            Err(e) => {
                eprintln!("{}; using defaults", e);
                None
            }
        },
    };
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Init => {
            if std::path::Path::new(&cli.config).exists() {
                return Err(anyhow!("{} already exists", cli.config));
            }
            Config::create_default(&cli.config).await?;
            println!("Wrote default configuration to {}", cli.config);
        }
        Commands::Generate { seed, theme } => {
            let config = config.unwrap_or_default();
            let theme = match theme {
                Some(key) => Theme::from_key(&key).ok_or_else(|| anyhow!("unknown theme '{}'", key))?,
                None => config.field.theme(),
            };
            let layout = FieldGenerator::new(seed, theme).generate();
            println!("{}", serde_json::to_string_pretty(&layout)?);
        }
        Commands::Simulate { steps } => {
            simulate(config.unwrap_or_default(), steps)?;
        }
    }
    Ok(())
}

/// A host opens their town, a visitor follows them out into fields and back.
fn simulate(config: Config, steps: usize) -> Result<()> {
    let network = LoopbackNetwork::default();
    let host_settings = TravelSettings::from_config(&config);
    let visitor_settings = TravelSettings {
        identity: visitor_identity(host_settings.identity),
        town_name: format!("{} Outskirts", host_settings.town_name),
        ..host_settings.clone()
    };
    let (mut host, mut host_notices) = TravelService::loopback(&network, host_settings);
    let (mut visitor, mut visitor_notices) = TravelService::loopback(&network, visitor_settings);
    let mut bag = config.inventory.build();

    host.coordinator_mut().host_town()?;
    host.pump_pending();
    let town = host.coordinator().current_session_id();
    info!("Host town is session {}", town);

    visitor.coordinator_mut().host_town()?;
    visitor.pump_pending();
    visitor.coordinator_mut().travel_to_town(town)?;
    settle(&mut host, &mut visitor);

    for step in 0..steps {
        let portal = 1 + step % config.field.town_portal_count.max(1);
        let Some(live) = visitor.coordinator().live_map() else {
            warn!("Visitor stranded after step {}", step);
            break;
        };
        let index = if live.portal(portal).is_some() { portal } else { 0 };
        visitor.coordinator_mut().enter_portal(index)?;
        settle(&mut host, &mut visitor);

        let mut offered = None;
        while let Ok(notice) = visitor_notices.try_recv() {
            print_notice("visitor", &notice);
            if let TravelNotice::RestoreOffered { cached_id, .. } = notice {
                offered = Some(cached_id);
            }
        }
        if let Some(cached_id) = offered {
            visitor.coordinator_mut().restore_cached_field(cached_id)?;
            settle(&mut host, &mut visitor);
        }
        while let Ok(taken) = visitor.coordinator_mut().pick_up_item(0, &mut bag) {
            if taken == 0 {
                break;
            }
        }
    }

    for (who, rx) in [("host", &mut host_notices), ("visitor", &mut visitor_notices)] {
        while let Ok(notice) = rx.try_recv() {
            print_notice(who, &notice);
        }
    }
    let snap = visitor.snapshot();
    println!("visitor: {:?} in session {}", snap.state, snap.session_id);
    println!("visitor cache: {:?}", snap.cache_stats);
    println!("visitor inventory:\n{}", bag.format_compact());
    println!("counters: {:?}", metrics::snapshot());
    Ok(())
}

/// A peer id distinct from `host`, wrapping past the top of the range.
fn visitor_identity(host: PeerId) -> PeerId {
    PeerId(host.0.wrapping_add(1).max(1))
}

fn settle<D, T>(a: &mut TravelService<D, T>, b: &mut TravelService<D, T>)
where
    D: waygate::session::SessionDirectory,
    T: waygate::session::SessionTransport,
{
    while a.pump_pending() + b.pump_pending() > 0 {}
}

fn print_notice(who: &str, notice: &TravelNotice) {
    match notice.as_error() {
        Some(err) => println!("{:>8}: error: {}", who, err),
        None => println!("{:>8}: {:?}", who, notice),
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| parse_level(&c.logging.level))
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    let file = log_file.and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match file {
        Some(f) => {
            let file = std::sync::Mutex::new(f);
            // Mirror to the console only when someone is watching
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
