use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use settle_config::SettleConfig;
use settle_error::WaitError;
use settle_logging::{LogFormat, LogLevel, LoggingConfig};
use settle_retry::async_retry::retry_until_async;
use settle_wait::{CancelToken, duration_ms};
use settle_wait::async_wait::try_until_or_fail_async;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "settle")]
#[command(about = "Wait for, or retry, a command until it exits successfully.", long_about = None)]
struct Cli {
    /// Raise the log level (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// plain, json or compact
    #[arg(long, default_value = "plain", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-run CMD every interval until it succeeds or the timeout passes.
    Until {
        /// YAML or JSON settle config.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Named wait profile from the config.
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        interval_ms: Option<u64>,
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// What is being waited for, used in logs and the failure message.
        #[arg(long)]
        description: Option<String>,
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Run CMD, retrying a bounded number of times until it succeeds.
    Retry {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Retries after the first attempt.
        #[arg(long)]
        retries: Option<u32>,
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Failure message when every attempt fails.
        #[arg(long)]
        message: Option<String>,
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig::new()
        .with_level(LogLevel::from_verbosity(cli.verbose))
        .with_format(cli.log_format);
    if let Err(err) = settle_logging::init(&logging) {
        eprintln!("settle: {err:#}");
        return ExitCode::from(2);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("settle: failed to start runtime: {err}");
            return ExitCode::from(2);
        }
    };

    match runtime.block_on(run(cli.cmd)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("settle: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cmd: Command) -> Result<()> {
    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match cmd {
        Command::Until {
            config,
            profile,
            interval_ms,
            timeout_ms,
            description,
            command,
        } => {
            let config = load(config)?;
            let mut settings = config.settings_for(profile.as_deref())?.clone();
            if let Some(ms) = interval_ms {
                settings.interval_ms = ms;
            }
            if let Some(ms) = timeout_ms {
                settings.timeout_ms = ms;
            }
            settings.description = description
                .or(settings.description)
                .or_else(|| Some(format!("`{}` to succeed", command.join(" "))));
            let spec = settings.to_spec()?;

            let message = format!("`{}` never succeeded", command.join(" "));
            let outcome =
                try_until_or_fail_async(&spec, || succeeds(&command), message, Some(&cancel))
                    .await?;
            info!(
                evaluations = outcome.evaluations(),
                elapsed_ms = duration_ms(outcome.elapsed()),
                "Command succeeded"
            );
        }

        Command::Retry {
            config,
            retries,
            delay_ms,
            message,
            command,
        } => {
            let config = load(config)?;
            let mut policy = config.retry;
            if let Some(retries) = retries {
                policy.max_retries = retries;
            }
            if let Some(ms) = delay_ms {
                policy.delay_ms = ms;
            }
            let message =
                message.unwrap_or_else(|| format!("`{}` kept failing", command.join(" ")));

            let attempts =
                retry_until_async(&policy, || succeeds(&command), &message, Some(&cancel)).await?;
            info!(attempts, "Command succeeded");
        }
    }

    Ok(())
}

fn load(path: Option<PathBuf>) -> Result<SettleConfig> {
    let mut config = match path {
        Some(path) => settle_config::load_config(path)?,
        None => SettleConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid settle environment override")?;
    Ok(config)
}

/// Runs `command` to completion; true when it exits with status 0.
async fn succeeds(command: &[String]) -> io::Result<bool> {
    let Some((program, args)) = command.split_first() else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
    };
    let status = tokio::process::Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|err| io::Error::new(err.kind(), format!("failed to run {program}: {err}")))?;
    Ok(status.success())
}

/// 0 success, 1 timed out or retries exhausted, 2 configuration,
/// 3 the command could not be run, 130 interrupted.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<WaitError<io::Error>>() {
        Some(WaitError::TimedOut { .. } | WaitError::RetriesExhausted { .. }) => 1,
        Some(WaitError::Configuration(_)) | None => 2,
        Some(WaitError::Condition(_)) => 3,
        Some(WaitError::Cancelled { .. }) => 130,
    }
}
