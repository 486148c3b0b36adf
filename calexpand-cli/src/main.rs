use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use calexpand::{
    describe, parse_datetime, ExceptionRecord, Expander, ExpanderConfig, MasterRecord,
};
use clap::Parser;
use jiff::civil::DateTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "calexpand",
    about = "Expand recurring calendar records into concrete instances",
    version
)]
struct Cli {
    /// JSON batch `{"masters": [...], "exceptions": [...]}`; stdin when absent or "-"
    input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, env = "CALEXPAND_CONFIG")]
    config: Option<PathBuf>,

    /// Standard bias in minutes (utc = local + bias)
    #[arg(long, allow_hyphen_values = true)]
    bias: Option<i32>,

    /// Additional bias in minutes inside the daylight window
    #[arg(long, allow_hyphen_values = true)]
    daylight_bias: Option<i32>,

    /// Window start (ISO 8601 datetime); also the anchor for --check
    #[arg(long)]
    from: Option<String>,

    /// Window end (ISO 8601 datetime, exclusive)
    #[arg(long)]
    to: Option<String>,

    /// Maximum occurrences generated per master
    #[arg(long)]
    cap: Option<u32>,

    /// Worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Validate a recurrence description without expanding anything
    #[arg(long, value_name = "XML")]
    check: Option<String>,

    /// Print a recurrence description in human-readable form
    #[arg(long, value_name = "XML")]
    describe: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Batch {
    masters: Vec<MasterRecord>,
    exceptions: Vec<ExceptionRecord>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(2);
        }
    }
}

fn init_tracing(verbose: bool) {
    // Anomalies and failures are printed below; the log carries the detail.
    let default = if verbose { "debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = load_config(cli)?;

    if let Some(ref xml) = cli.check {
        let anchor = config.window_start.unwrap_or(DateTime::constant(1970, 1, 1, 0, 0, 0, 0));
        return Ok(match calexpand::parse(xml, anchor) {
            Ok(_) => {
                println!("valid");
                0
            }
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        });
    }

    if let Some(ref xml) = cli.describe {
        let anchor = config.window_start.unwrap_or(DateTime::constant(1970, 1, 1, 0, 0, 0, 0));
        return Ok(match calexpand::parse(xml, anchor) {
            Ok((pattern, range)) => {
                println!("{}", describe(&pattern, &range));
                0
            }
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        });
    }

    let batch = read_batch(cli.input.as_deref())?;
    tracing::debug!(
        masters = batch.masters.len(),
        exceptions = batch.exceptions.len(),
        "read batch"
    );

    let expansion = Expander::from_config(&config).expand(&batch.masters, &batch.exceptions);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&expansion.instances)?);
    } else {
        for instance in &expansion.instances {
            println!("{} {} {}", instance.id(), instance.start(), instance.end());
        }
    }

    for warning in &expansion.warnings {
        eprintln!("warning: {warning}");
    }
    for failure in &expansion.failures {
        eprintln!("error: {failure}");
    }

    Ok(if expansion.failures.is_empty() { 0 } else { 1 })
}

fn load_config(cli: &Cli) -> anyhow::Result<ExpanderConfig> {
    let mut config = match cli.config {
        Some(ref path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file at {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => ExpanderConfig::default(),
    };

    if let Some(bias) = cli.bias {
        config.standard_bias = bias;
    }
    if let Some(bias) = cli.daylight_bias {
        config.daylight_bias = bias;
    }
    if let Some(ref from) = cli.from {
        config.window_start = Some(datetime_arg("--from", from)?);
    }
    if let Some(ref to) = cli.to {
        config.window_end = Some(datetime_arg("--to", to)?);
    }
    if let Some(cap) = cli.cap {
        config.instance_cap = Some(cap);
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }

    tracing::debug!(?config, "configuration");
    Ok(config)
}

fn datetime_arg(flag: &str, value: &str) -> anyhow::Result<DateTime> {
    parse_datetime(value).with_context(|| format!("invalid {flag} datetime '{value}'"))
}

fn read_batch(input: Option<&Path>) -> anyhow::Result<Batch> {
    let text = match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input at {}", path.display()))?,
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            text
        }
    };
    serde_json::from_str(&text).context("invalid input batch")
}
