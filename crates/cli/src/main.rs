//! Beacon entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: load `beacon.toml` (or `--config`), apply
//!    environment overrides for secrets, and validate it.
//! 2. **Wire observability**: install `tracing-subscriber` with a JSON or
//!    pretty layer and, when configured, an OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: the Slack client, the CodeBuild and
//!    Beanstalk adapters, and one snapshot store per watched kind.
//! 4. **Start the jobs**: one scheduler ticker per kind and the Slack events
//!    listener sharing those stores through the command handler.
//! 5. **Shut down gracefully** on SIGINT/SIGTERM: stop accepting events, stop
//!    ticking, and give in-flight work a grace period to finish.

mod config;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use cloud::{BeanstalkAdapter, CodeBuildAdapter};
use listener::{ListenerState, SigningSecret};
use monitor::{CommandHandler, CycleRunner, Notifier, Scheduler};
use slack::{SlackClient, SlackConfig};
use tokio::net::TcpListener;
use tracing::{error, info};
use watch::{BuildRecord, ChannelId, EnvironmentRecord, SnapshotStore};

use crate::config::Config;

/// Time given to in-flight cycles and command replies after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Watches AWS CodeBuild builds and Elastic Beanstalk environments, announces
/// status changes to Slack, and answers chat commands.
#[derive(Debug, Parser)]
#[command(name = "beacon", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, short, env = "BEACON_CONFIG", default_value = "beacon.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let telemetry = telemetry::init(&config.telemetry)?;

    let result = run(config).await;
    if let Err(err) = &result {
        error!(error = %format!("{err:#}"), "beacon stopped with an error");
    }
    telemetry.shutdown();
    result
}

async fn run(config: Config) -> anyhow::Result<()> {
    let permissions = Arc::new(config.load_permissions()?);
    info!(
        users = permissions.len(),
        path = %config.permissions.users_file.display(),
        "permission table loaded"
    );

    // Chat
    let mut slack_config = SlackConfig::new(config.slack.bot_token.as_str());
    if let Some(url) = &config.slack.api_base_url {
        slack_config = slack_config.with_api_base_url(url.as_str());
    }
    let slack = Arc::new(SlackClient::new(slack_config)?);
    let announce_channel = ChannelId::new(config.slack.announce_channel.trim())
        .context("slack.announce_channel is empty")?;
    let notifier = Arc::new(Notifier::new(
        slack.clone(),
        announce_channel,
        config.watch.delivery_mode(),
    ));

    // Cloud
    let sdk_config = cloud::load_sdk_config(&config.aws.region).await;
    let codebuild = Arc::new(CodeBuildAdapter::from_conf(
        &sdk_config,
        config.aws.build_window,
    ));
    let beanstalk = Arc::new(BeanstalkAdapter::from_conf(
        &sdk_config,
        config.aws.rebuild.source_bundle(),
    ));

    // Watch jobs
    let builds = Arc::new(SnapshotStore::<BuildRecord>::new());
    let environments = Arc::new(SnapshotStore::<EnvironmentRecord>::new());
    let options = config.watch.cycle_options();
    let scheduler = Scheduler::new();
    scheduler.watch(
        Arc::new(CycleRunner::new(
            Arc::clone(&builds),
            codebuild.clone(),
            Arc::clone(&notifier),
            options,
        )),
        config.watch.interval(),
    );
    scheduler.watch(
        Arc::new(CycleRunner::new(
            Arc::clone(&environments),
            beanstalk.clone(),
            Arc::clone(&notifier),
            options,
        )),
        config.watch.interval(),
    );

    // Command surface
    let handler = Arc::new(CommandHandler::new(
        builds,
        environments,
        codebuild,
        beanstalk,
        slack.clone(),
        permissions,
        notifier,
    ));
    let secret = SigningSecret::new(&config.slack.signing_secret)?;
    let state = ListenerState::new(secret, handler, slack);
    let tcp = TcpListener::bind(config.listener.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.listener.bind))?;

    let shutdown = scheduler.shutdown_token();
    let mut server = tokio::spawn(listener::serve(
        tcp,
        listener::router(state.clone()),
        shutdown.clone(),
    ));

    let served = tokio::select! {
        () = shutdown_signal() => None,
        joined = &mut server => Some(joined),
    };
    shutdown.cancel();
    let served = match served {
        Some(joined) => joined,
        None => server.await,
    };

    info!("draining in-flight work");
    state.tasks().close();
    if tokio::time::timeout(SHUTDOWN_GRACE, state.tasks().wait())
        .await
        .is_err()
    {
        info!(remaining = state.tasks().len(), "abandoning unanswered commands");
    }
    scheduler.shutdown_with_grace(SHUTDOWN_GRACE).await;

    served
        .context("listener task panicked")?
        .context("listener stopped")?;
    info!("beacon stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
