// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `jobrunner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobrunner",
    version,
    about = "Start, stop and watch the JVM jobs declared in a jobs.toml file.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the job configuration (TOML).
    ///
    /// Created with defaults if it does not exist.
    #[arg(long, value_name = "PATH", default_value = "jobs.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBRUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List every configured job with its current status.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print the launch command of a job without running it.
    Command {
        job: String,
        /// Extra arguments appended after the job's params.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run one job in the foreground until it exits or Ctrl-C.
    Run {
        job: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Start all enabled continuous jobs and supervise them until Ctrl-C.
    Serve,

    /// Print the tail of a job's log file.
    Logs {
        job: String,
        /// Number of trailing lines; all of them if omitted.
        #[arg(long, short = 'n', value_name = "N")]
        lines: Option<usize>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_keeps_hyphenated_job_arguments() {
        let args = CliArgs::try_parse_from([
            "jobrunner", "--config", "x.toml", "run", "import", "--since", "2024-01-01",
        ])
        .unwrap();
        assert_eq!(args.config, "x.toml");
        match args.command {
            Command::Run { job, args } => {
                assert_eq!(job, "import");
                assert_eq!(args, vec!["--since", "2024-01-01"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let args =
            CliArgs::try_parse_from(["jobrunner", "logs", "import", "-n", "20", "--log-level", "debug"])
                .unwrap();
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(matches!(args.command, Command::Logs { lines: Some(20), .. }));
        assert_eq!(args.config, "jobs.toml");
    }
}
