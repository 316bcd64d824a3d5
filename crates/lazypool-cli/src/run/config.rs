use anyhow::bail;
use clap::{Parser, ValueEnum};
use lazypool::{CancelPolicy, PoolConfig};
use std::path::PathBuf;

/// Runtime configuration for the `lazypool` binary.
///
/// Every input line is a delay in milliseconds. Each line is handed to a
/// worker, which sleeps for that long and then prints the line. Workers are
/// started lazily, up to `--workers` of them. All values can also be provided
/// through environment variables (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lazypool",
    version,
    about = "Process a file of delays with a lazily grown, bounded worker pool"
)]
pub struct CliArgs {
    /// Path to the input file, one work item per line. Use `-` for stdin.
    ///
    /// Environment variable: `INPUT_FILE`
    #[arg(short, long, env = "INPUT_FILE", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Input file given positionally. Takes precedence over `--file`.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Maximum number of workers that may run concurrently.
    ///
    /// Workers are only started when every running worker is busy, so short
    /// inputs may never reach this limit. Must be at least 1.
    ///
    /// Environment variable: `MAX_WORKERS`
    #[arg(
        short,
        long,
        env = "MAX_WORKERS",
        default_value_t = 1,
        allow_negative_numbers = true
    )]
    pub workers: i64,

    /// What to do with items that are already running when the process is
    /// interrupted.
    ///
    /// Environment variable: `CANCEL_POLICY`
    #[arg(long, env = "CANCEL_POLICY", value_enum, default_value_t = OnCancel::Finish)]
    pub on_cancel: OnCancel,

    /// Format of diagnostic logs written to stderr. Verbosity is controlled by
    /// `RUST_LOG`.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnCancel {
    /// Let running items finish; skip everything not yet dispatched.
    Finish,
    /// Drop running items immediately.
    Abandon,
}

impl From<OnCancel> for CancelPolicy {
    fn from(value: OnCancel) -> Self {
        match value {
            OnCancel::Finish => Self::FinishInFlight,
            OnCancel::Abandon => Self::Abandon,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub pool: PoolConfig,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let Some(input) = args.input.or(args.file) else {
            bail!("Specify the input file with --file <PATH> or as a positional argument");
        };

        if args.workers <= 0 {
            bail!("MAX_WORKERS must be greater than 0 (got {})", args.workers);
        }

        let max_workers = usize::try_from(args.workers)?;
        let pool = PoolConfig::new(max_workers)?.with_cancel_policy(args.on_cancel.into());

        Ok(Self {
            input,
            pool,
            log_format: args.log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> anyhow::Result<RunConfig> {
        let args = CliArgs::try_parse_from(std::iter::once("lazypool").chain(argv.iter().copied()))?;
        RunConfig::try_from(args)
    }

    #[test]
    fn file_flag_and_workers() {
        let config = parse(&["--file", "tasks.txt", "--workers", "3"]).unwrap();
        assert_eq!(config.input, PathBuf::from("tasks.txt"));
        assert_eq!(config.pool.max_workers(), 3);
        assert_eq!(config.pool.cancel_policy(), CancelPolicy::FinishInFlight);
    }

    #[test]
    fn positional_input_wins_over_flag() {
        let config = parse(&["-f", "flag.txt", "positional.txt"]).unwrap();
        assert_eq!(config.input, PathBuf::from("positional.txt"));
        assert_eq!(config.pool.max_workers(), 1);
    }

    #[test]
    fn missing_input_is_rejected() {
        let err = parse(&["--workers", "2"]).unwrap_err();
        assert!(err.to_string().contains("input file"), "{err}");
    }

    #[test]
    fn non_positive_workers_are_rejected() {
        for workers in ["0", "-3"] {
            let err = parse(&["tasks.txt", "--workers", workers]).unwrap_err();
            assert!(err.to_string().contains("greater than 0"), "{err}");
        }
    }

    #[test]
    fn non_numeric_workers_fail_to_parse() {
        assert!(parse(&["tasks.txt", "--workers", "many"]).is_err());
    }

    #[test]
    fn abandon_policy_maps_through() {
        let config = parse(&["tasks.txt", "--on-cancel", "abandon"]).unwrap();
        assert_eq!(config.pool.cancel_policy(), CancelPolicy::Abandon);
    }
}
