use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use voltage_monitor::{AlertEvent, Config, ConfigError, ConfigStore, Monitor};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short, long, env = "VOLTAGE_CONFIG", default_value = "config.json")]
    file: PathBuf,

    /// Status page to sample (overrides the config file)
    #[arg(long, env = "VOLTAGE_URL")]
    url: Option<String>,

    /// Seconds between samples
    #[arg(long, env = "VOLTAGE_INTERVAL")]
    interval: Option<String>,

    /// Alert threshold
    #[arg(long, env = "VOLTAGE_THRESHOLD")]
    threshold: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "VOLTAGE_TIMEOUT")]
    timeout: Option<String>,

    /// Wait for a `start` command instead of monitoring right away
    #[arg(long)]
    no_start: bool,

    /// Trace every cycle
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::DEBUG
    };
    let filter = filter::Targets::new().with_targets(vec![("voltage_monitor", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = Config::load(Some(&args.file)).unwrap_or_else(|e| {
        warn!("{e:#}, falling back to defaults");
        Config::default()
    });
    let store = Arc::new(ConfigStore::new(config));
    apply_overrides(&store, &args)?;

    let (alert_tx, mut alert_rx) = mpsc::unbounded_channel::<AlertEvent>();
    let monitor = Monitor::new(store, alert_tx);

    if !args.no_start {
        println!("{}", monitor.start());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            Some(event) = alert_rx.recv() => {
                println!(
                    "ALERT [{}]: voltage is {} (threshold {})",
                    event.timestamp.format("%H:%M:%S"),
                    event.value,
                    event.threshold
                );
            }

            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if handle_command(&monitor, line.trim()).await == Control::Quit {
                        break;
                    }
                }
                None => {
                    trace!("stdin closed, monitoring until interrupted");
                    stdin_open = false;
                }
            },

            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    monitor.stop();
    Ok(())
}

fn apply_overrides(store: &ConfigStore, args: &Args) -> Result<(), ConfigError> {
    if let Some(url) = &args.url {
        store.set_url(url)?;
    }
    if let Some(interval) = &args.interval {
        store.set_interval(interval)?;
    }
    if let Some(threshold) = &args.threshold {
        store.set_threshold(threshold)?;
    }
    if let Some(timeout) = &args.timeout {
        store.set_timeout(timeout)?;
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Control {
    Continue,
    Quit,
}

async fn handle_command(monitor: &Monitor, line: &str) -> Control {
    let (command, value) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(command, value)| (command, value.trim()));

    let edit = |result: Result<(), ConfigError>| match result {
        Ok(()) => println!("ok"),
        Err(e) => println!("error: {e}"),
    };

    match command {
        "" => {}
        "start" => println!("{}", monitor.start()),
        "stop" => println!("{}", monitor.stop()),
        "url" => edit(monitor.config().set_url(value)),
        "interval" => edit(monitor.config().set_interval(value)),
        "threshold" => edit(monitor.config().set_threshold(value)),
        "timeout" => edit(monitor.config().set_timeout(value)),
        "check" => match monitor.check_now().await {
            Ok(outcome) => println!("{outcome:?}"),
            Err(e) => println!("error: {e:#}"),
        },
        "status" => {
            let Config {
                url,
                interval,
                threshold,
                timeout,
            } = monitor.config().get();
            println!("running:   {}", monitor.is_running());
            println!("alert:     {:?}", monitor.alert_state().await);
            println!("url:       {url}");
            println!("interval:  {interval}s");
            println!("threshold: {threshold}");
            println!("timeout:   {timeout}s");
        }
        "quit" | "exit" => return Control::Quit,
        _ => println!(
            "commands: start, stop, status, check, url <url>, interval <secs>, \
             threshold <value>, timeout <secs>, quit"
        ),
    }

    Control::Continue
}
