mod config;

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reveille_adapters::persistence::sqlite::SqliteDb;
use reveille_adapters::scheduler::LocalTriggerScheduler;
use reveille_app::alarm_service::AlarmService;
use reveille_app::reconciler::Reconciler;
use reveille_ports::types::ReconcileReport;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "reveille", version, about = "Weekly alarm scheduler")]
struct Cli {
    /// Path to a config file (defaults to <config dir>/reveille/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.log_filter, cli.debug);

    let settings = config.settings()?;
    info!(timezone = %settings.timezone, database = %config.database_url, "starting reveille");

    if let Some(parent) = config.database_path().as_deref().and_then(|p| p.parent()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let db = SqliteDb::new(&config.database_url)
        .await
        .context("opening database")?;

    let (scheduler, mut fired) = LocalTriggerScheduler::new(settings.timezone);
    let service = AlarmService::new(db.clone(), scheduler, db, Reconciler::new(settings));

    let report = service.load(Utc::now()).await.context("loading events")?;
    log_report("startup", &report);

    let mut retry = tokio::time::interval(config.reconcile_interval());
    retry.tick().await;

    loop {
        tokio::select! {
            Some(correlation) = fired.recv() => {
                match service.handle_fired(&correlation, Utc::now()).await {
                    Ok(alarm) => info!(
                        name = %alarm.name,
                        day = %alarm.day,
                        time = %alarm.time,
                        description = ?alarm.description,
                        sound = %alarm.sound_ref,
                        "alarm ringing"
                    ),
                    Err(err) => warn!(correlation = %correlation, error = %err, "fired trigger matches no alarm"),
                }
            }
            _ = retry.tick() => {
                let report = service.reconcile(Utc::now()).await;
                log_report("periodic", &report);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing(filter: &str, debug: bool) {
    let filter = if debug {
        "reveille=debug,reveille_app=debug,reveille_adapters=debug,info"
    } else {
        filter
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().compact().with_target(debug))
        .init();
}

fn log_report(pass: &str, report: &ReconcileReport) {
    if report.is_noop() {
        return;
    }
    info!(
        pass,
        armed = report.armed.len(),
        cancelled = report.cancelled.len(),
        failures = report.failures.len(),
        "reconcile finished"
    );
    for failure in &report.failures {
        warn!(
            event_id = %failure.event_id,
            alarm_id = ?failure.alarm_id.as_ref().map(|id| id.to_string()),
            reason = %failure.reason,
            "alarm will not fire"
        );
    }
}
