//! Growtacular sensor test binary
//!
//! Polls the grow box sensors and prints readings on a fixed interval.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use growtacular::config::{
    DEFAULT_ADS1115_ADDRESS, DEFAULT_BME280_ADDRESS, DEFAULT_DHT_PIN, DEFAULT_I2C_BUS,
    DEFAULT_ONEWIRE_DIR,
};
use growtacular::sensors::ads1115::Gain;
use growtacular::sensors::dht::DhtModel;
use growtacular::{
    OneWireBus, Report, SensorCollector, SensorConfig, TemperatureUnit, DEFAULT_INTERVAL_MS,
};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "growtacular")]
#[command(about = "Growtacular sensor test for Raspberry Pi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Polls DS18B20, DHT, BME280 and ADS1115 sensors and prints readings")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Poll interval in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MS)]
    interval: u64,

    /// One-wire sysfs device directory
    #[arg(long, default_value = DEFAULT_ONEWIRE_DIR)]
    w1_dir: PathBuf,

    /// BCM GPIO pin of the DHT data line
    #[arg(long, default_value_t = DEFAULT_DHT_PIN)]
    dht_pin: u8,

    /// DHT model: dht11 or dht22
    #[arg(long, default_value = "dht11")]
    dht_model: DhtModel,

    /// I2C bus number shared by the BME280 and ADS1115
    #[arg(long, default_value_t = DEFAULT_I2C_BUS)]
    i2c_bus: u8,

    /// BME280 I2C address
    #[arg(long, value_parser = parse_address, default_value_t = DEFAULT_BME280_ADDRESS)]
    bme280_address: u8,

    /// ADS1115 I2C address
    #[arg(long, value_parser = parse_address, default_value_t = DEFAULT_ADS1115_ADDRESS)]
    ads_address: u8,

    /// ADS1115 input wired to the soil moisture probe
    #[arg(long, default_value_t = 0)]
    adc_channel: u8,

    /// ADS1115 gain: 2/3, 1, 2, 4, 8 or 16
    #[arg(long, default_value = "1")]
    adc_gain: Gain,

    /// Skip the one-wire probes
    #[arg(long)]
    no_onewire: bool,

    /// Skip the DHT sensor
    #[arg(long)]
    no_dht: bool,

    /// Skip the BME280
    #[arg(long)]
    no_bme280: bool,

    /// Skip the ADS1115 soil moisture probe
    #[arg(long)]
    no_adc: bool,

    /// Load the w1-gpio and w1-therm kernel modules first (needs root)
    #[arg(long)]
    load_modules: bool,

    /// Print temperatures in Celsius instead of Fahrenheit
    #[arg(long)]
    celsius: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll sensors on the interval (default)
    Poll(PollArgs),

    /// Take a single snapshot and exit
    Snapshot(SnapshotArgs),

    /// List one-wire probes and exit
    Probes,
}

#[derive(Args, Default)]
struct PollArgs {
    /// Stop after this many polls
    #[arg(short, long)]
    count: Option<u64>,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Fixed-width console report
    Pretty,
    /// Snapshot as JSON
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    let config = build_config(&cli);

    match &cli.command {
        Some(Commands::Poll(args)) => {
            print_banner();
            poll_command(&config, args).await?;
        }
        Some(Commands::Snapshot(args)) => {
            snapshot_command(&config, args).await?;
        }
        Some(Commands::Probes) => {
            probes_command(&config)?;
        }
        None => {
            // Default to poll command
            print_banner();
            poll_command(&config, &PollArgs::default()).await?;
        }
    }

    Ok(())
}

fn log_level(cli: &Cli) -> LevelFilter {
    if cli.debug {
        LevelFilter::DEBUG
    } else if cli.verbose {
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    }
}

/// Flag level as the default, refined by `RUST_LOG`-style directives.
fn log_filter(cli: &Cli, directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(log_level(cli).into())
        .parse_lossy(directives)
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(cli, &directives))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;

    Ok(())
}

fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid I2C address '{}': {}", s, e))
}

fn build_config(cli: &Cli) -> SensorConfig {
    let unit = if cli.celsius {
        TemperatureUnit::Celsius
    } else {
        TemperatureUnit::Fahrenheit
    };

    let mut config = SensorConfig::default()
        .with_interval_ms(cli.interval)
        .with_unit(unit)
        .with_onewire_dir(&cli.w1_dir)
        .with_dht(cli.dht_pin, cli.dht_model)
        .with_i2c_bus(cli.i2c_bus)
        .with_soil_channel(cli.adc_channel, cli.adc_gain);

    config.bme280.address = cli.bme280_address;
    config.soil.address = cli.ads_address;
    config.onewire.load_modules = cli.load_modules;
    config.onewire.enabled = !cli.no_onewire;
    config.dht.enabled = !cli.no_dht;
    config.bme280.enabled = !cli.no_bme280;
    config.soil.enabled = !cli.no_adc;

    config
}

fn print_banner() {
    println!("Growtacular Sensors Test");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    #[cfg(not(feature = "hardware"))]
    println!("   Built without hardware support: one-wire probes only");
    println!();
}

async fn poll_command(config: &SensorConfig, args: &PollArgs) -> anyhow::Result<()> {
    info!("Starting sensor poll...");

    let collector = SensorCollector::from_config(config)?;
    info!("Sensor collector initialized with {} sensor group(s)", collector.sensor_count());

    let mut stream = collector.into_stream(config.interval_ms);
    info!("Polling every {}ms", config.interval_ms);

    let mut polls = 0u64;
    loop {
        tokio::select! {
            next = stream.next() => {
                let Some(snapshot) = next else {
                    error!("Sensor polling stopped unexpectedly");
                    break;
                };
                print!("{}", Report::new(&snapshot, config.unit));
                polls += 1;
                if args.count.is_some_and(|count| polls >= count) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping after {} poll(s)", polls);
                break;
            }
        }
    }

    Ok(())
}

async fn snapshot_command(config: &SensorConfig, args: &SnapshotArgs) -> anyhow::Result<()> {
    let mut collector = SensorCollector::from_config(config)?;
    let snapshot = tokio::task::spawn_blocking(move || collector.collect_snapshot())
        .await
        .context("Sensor read task failed")?;

    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            println!("{}", json);
        }
        OutputFormat::Pretty => {
            print!("{}", Report::new(&snapshot, config.unit));
        }
    }

    Ok(())
}

fn probes_command(config: &SensorConfig) -> anyhow::Result<()> {
    if config.onewire.load_modules {
        growtacular::sensors::onewire::load_kernel_modules();
    }

    let bus = OneWireBus::from_config(&config.onewire);
    let devices = bus
        .discover()
        .with_context(|| format!("Failed to list {}", bus.base_dir().display()))?;

    println!("One-wire probes in {}:", bus.base_dir().display());
    if devices.is_empty() {
        println!("  none found");
    }
    for device in &devices {
        println!("  {}", device.id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["growtacular", "--interval", "2000", "--dht-model", "dht22"]).unwrap();
        assert_eq!(cli.interval, 2000);
        assert_eq!(cli.dht_model, DhtModel::Dht22);
    }

    #[test]
    fn test_default_values() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["growtacular"]).unwrap();
        assert_eq!(cli.interval, DEFAULT_INTERVAL_MS);
        assert_eq!(cli.dht_pin, 17);
        assert_eq!(cli.bme280_address, 0x77);
        assert_eq!(cli.ads_address, 0x48);
        assert_eq!(cli.adc_gain, Gain::One);
        assert_eq!(cli.w1_dir, PathBuf::from("/sys/bus/w1/devices"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_hex_addresses() {
        assert_eq!(parse_address("0x76"), Ok(0x76));
        assert_eq!(parse_address("72"), Ok(72));
        assert!(parse_address("0xZZ").is_err());
        assert!(parse_address("0x100").is_err());
    }

    #[test]
    fn test_build_config_flags() {
        use clap::Parser;

        let cli = Cli::try_parse_from([
            "growtacular",
            "--no-dht",
            "--celsius",
            "--bme280-address",
            "0x76",
            "--adc-gain",
            "2/3",
            "snapshot",
            "--format",
            "json",
        ])
        .unwrap();
        let config = build_config(&cli);
        assert!(!config.dht.enabled);
        assert!(config.bme280.enabled);
        assert_eq!(config.bme280.address, 0x76);
        assert_eq!(config.soil.gain, Gain::TwoThirds);
        assert_eq!(config.unit, TemperatureUnit::Celsius);
        match cli.command {
            Some(Commands::Snapshot(args)) => assert_eq!(args.format, OutputFormat::Json),
            _ => panic!("expected snapshot command"),
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        use clap::Parser;

        assert!(Cli::try_parse_from(["growtacular", "snapshot", "--format", "xml"]).is_err());
        let cli = Cli::try_parse_from(["growtacular", "snapshot"]).unwrap();
        match cli.command {
            Some(Commands::Snapshot(args)) => assert_eq!(args.format, OutputFormat::Pretty),
            _ => panic!("expected snapshot command"),
        }
    }

    fn level_hint(filter: &EnvFilter) -> Option<LevelFilter> {
        <EnvFilter as tracing_subscriber::Layer<tracing_subscriber::Registry>>::max_level_hint(filter)
    }

    #[test]
    fn test_log_level_from_flags() {
        use clap::Parser;

        let quiet = Cli::try_parse_from(["growtacular"]).unwrap();
        assert_eq!(level_hint(&log_filter(&quiet, "")), Some(LevelFilter::WARN));

        let verbose = Cli::try_parse_from(["growtacular", "--verbose"]).unwrap();
        assert_eq!(level_hint(&log_filter(&verbose, "")), Some(LevelFilter::INFO));

        let debug = Cli::try_parse_from(["growtacular", "--debug"]).unwrap();
        assert_eq!(level_hint(&log_filter(&debug, "")), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_env_directives_refine_level() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["growtacular", "--verbose"]).unwrap();
        let filter = log_filter(&cli, "growtacular=debug");
        assert_eq!(level_hint(&filter), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_poll_count() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["growtacular", "poll", "--count", "3"]).unwrap();
        match cli.command {
            Some(Commands::Poll(args)) => assert_eq!(args.count, Some(3)),
            _ => panic!("expected poll command"),
        }
    }
}
