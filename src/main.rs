use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use cx_health::check::{CheckReport, FailureDecision, HealthCheck, Outcome};
use cx_health::collectors::SnmpCollector;
use cx_health::config::{parse_tolerance, Config};
use cx_health::error::ConfigError;
use cx_health::rules::Policy;
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line arguments for the Cx health check
#[derive(Parser, Debug)]
#[command(
    name = "check_cx_health",
    about = "Detect a broken Cx Diameter stack from the previous five minute statistics",
    long_about = "Reads the Homestead Cx response statistics from the local SNMP agent and reports \
                  whether no Diameter request succeeded while server errors exceeded TOLERANCE. \
                  The check is repeated and only reported positive if both readings agree. \
                  Exits 3 if all requests are failing, 0 if not and 1 if the check could not run."
)]
struct Cli {
    /// Number of server errors tolerated before a restart is requested
    #[arg(value_name = "TOLERANCE", allow_hyphen_values = true)]
    tolerance: String,

    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Result code classification policy, overriding the configuration file
    #[arg(long, value_enum)]
    policy: Option<Policy>,

    /// SNMP agent host, overriding the configuration file
    #[arg(long)]
    host: Option<String>,

    /// SNMP community, overriding the configuration file
    #[arg(long)]
    community: Option<String>,

    /// Read the tables of each pass concurrently
    #[arg(long)]
    parallel_reads: bool,

    /// Output format for the verdict
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (default filter debug)"
    )]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// "All requests failing? <bool>"
    Text,
    /// Full report with per-pass and per-table tallies
    Json,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }

            if config_path.extension().is_some_and(|ext| ext != "toml") {
                warn!(
                    "Configuration file does not have .toml extension: {}",
                    config_path.display()
                );
            }
        }

        Ok(())
    }

    /// Load the configuration file, if any, and apply command-line overrides
    ///
    /// Without `--config` the defaults are used. A named file that is missing
    /// or invalid is an error.
    fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Config::from_file(path)?
            }
            None => Config::default(),
        };

        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(ref host) = self.host {
            config.snmp.host = host.clone();
        }
        if let Some(ref community) = self.community {
            config.snmp.community = Some(community.clone());
        }
        if self.parallel_reads {
            config.parallel_reads = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Run the health check and decide the outcome
fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let tolerance = parse_tolerance(&cli.tolerance)?;
    info!("Server error tolerance = {}", tolerance);

    let config = cli
        .load_config()
        .context("Failed to load configuration")?;
    info!(
        "Checking {} with {} classification",
        config.snmp.host, config.policy
    );

    let check = HealthCheck::new(
        SnmpCollector::new(config.resolved_snmp()),
        config.table_rules()?,
        FailureDecision::new(tolerance),
    )
    .with_parallel_reads(config.parallel_reads);

    let report = check.run().context("Failed to read Cx statistics")?;
    print_report(&report, cli.format)?;

    Ok(report.outcome())
}

fn print_report(report: &CheckReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", report.verdict_line()),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).context("Failed to encode report")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Map the result of a run, including a caught panic, to the process exit status
///
/// Only a completed check may report a verdict; every failure shares the
/// execution-failed status.
fn exit_status(result: std::thread::Result<anyhow::Result<Outcome>>) -> u8 {
    match result {
        Ok(Ok(outcome)) => outcome.exit_code(),
        Ok(Err(e)) => {
            eprintln!("check_cx_health: {:#}", e);
            Outcome::ExecutionFailed.exit_code()
        }
        Err(_) => {
            error!("Cx health check panicked");
            Outcome::ExecutionFailed.exit_code()
        }
    }
}

fn main() -> ExitCode {
    // Argument errors must not look like a verdict, so they share the failure status
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(Outcome::ExecutionFailed.exit_code()),
            };
        }
    };

    init_logging(cli.verbose);

    ExitCode::from(exit_status(std::panic::catch_unwind(|| run(&cli))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cx_health::error::ReadError;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["check_cx_health"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_tolerance_is_required() {
        let result = Cli::try_parse_from(["check_cx_health"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_tolerance_reaches_validation() {
        let cli = parse(&["-1"]);
        assert_eq!(cli.tolerance, "-1");
        assert!(matches!(
            parse_tolerance(&cli.tolerance),
            Err(ConfigError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn test_invalid_tolerance_fails_before_any_read() {
        let cli = parse(&["lots", "--host", "unreachable.invalid"]);
        let result = run(&cli);
        let error = result.unwrap_err();
        assert!(error.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["10"]);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.verbose);

        let config = cli.load_config().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = parse(&[
            "10",
            "--policy",
            "explicit-codes",
            "--host",
            "10.1.1.1",
            "--community",
            "clearwater",
            "--parallel-reads",
            "--format",
            "json",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);

        let config = cli.load_config().unwrap();
        assert_eq!(config.policy, Policy::ExplicitCodes);
        assert_eq!(config.snmp.host, "10.1.1.1");
        assert_eq!(config.snmp.community.as_deref(), Some("clearwater"));
        assert!(config.parallel_reads);
    }

    #[test]
    fn test_config_file_then_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "policy = \"explicit-codes\"\n[snmp]\nhost = \"hs1\"").unwrap();
        file.flush().unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let cli = parse(&["5", "--config", &path, "--host", "hs2"]);
        assert!(cli.validate().is_ok());

        let config = cli.load_config().unwrap();
        assert_eq!(config.policy, Policy::ExplicitCodes);
        assert_eq!(config.snmp.host, "hs2");
    }

    #[test]
    fn test_invalid_config_file_is_fatal() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "policy = 42").unwrap();
        file.flush().unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let cli = parse(&["5", "--config", &path]);
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn test_missing_config_file_is_fatal() {
        let cli = parse(&["5", "--config", "/nonexistent/cx_health.toml"]);
        assert!(cli.validate().is_ok());
        assert!(matches!(cli.load_config(), Err(ConfigError::ReadError(_))));

        let error = run(&cli).unwrap_err();
        assert!(error.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_config_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().into_owned();
        let cli = parse(&["5", "--config", &path]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_exit_status_for_verdicts() {
        assert_eq!(exit_status(Ok(Ok(Outcome::Healthy))), 0);
        assert_eq!(exit_status(Ok(Ok(Outcome::AllRequestsFailing))), 3);
    }

    #[test]
    fn test_exit_status_for_errors() {
        let read_error = anyhow::Error::new(ReadError::MissingValue("timeouts".to_string()))
            .context("Failed to read Cx statistics");
        assert_eq!(exit_status(Ok(Err(read_error))), 1);

        let config_error = anyhow::Error::new(ConfigError::InvalidTolerance("ten".to_string()));
        assert_eq!(exit_status(Ok(Err(config_error))), 1);
    }

    #[test]
    fn test_exit_status_for_panic() {
        let panicked = std::panic::catch_unwind(|| -> anyhow::Result<Outcome> {
            panic!("counter source exploded")
        });
        assert!(panicked.is_err());
        assert_eq!(exit_status(panicked), 1);
    }

    #[test]
    fn test_unknown_policy_rejected_by_parser() {
        let result = Cli::try_parse_from(["check_cx_health", "5", "--policy", "lenient"]);
        assert!(result.is_err());
    }
}
