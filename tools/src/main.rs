//! badge-runner: headless operator tool for the achievement ledger.
//!
//! Usage:
//!   badge-runner status      --db badges.db --identity asha
//!   badge-runner reconcile   --db badges.db --identity asha --count 22
//!   badge-runner bump        --db badges.db --identity asha --delta 1
//!   badge-runner reset       --db badges.db --identity asha
//!   badge-runner certificate --db badges.db --identity asha --tier Silver --email asha@example.org
//!   badge-runner watch       --db badges.db --identity asha --counts 3,12,22,15

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use civic_badges_core::{
    certificate::{recipient_from_email, Certificate},
    clock::SystemClock,
    config::AchievementConfig,
    error::{BadgeError, BadgeResult},
    layout::CertificateLayout,
    ledger::EarnedTier,
    oracle::ReportCountOracle,
    render::fit_to_page,
    resolver::{BadgeResolver, Progress},
    scheduler::{SyncEvent, SyncScheduler},
    session::{AchievementSession, ReconcileGate},
    store::SqliteStore,
    types::ReportCount,
};
use std::collections::VecDeque;
use std::env;
use std::sync::{Arc, Mutex};

#[derive(serde::Serialize)]
struct StatusView {
    identity: String,
    display_count: ReportCount,
    headline: String,
    icon: String,
    next_hint: Option<String>,
    last_notified: Option<String>,
    earned: Vec<EarnedTier>,
}

#[derive(serde::Serialize)]
struct CertificateView<'a> {
    certificate: &'a Certificate,
    filename: String,
    layout: CertificateLayout,
    page_placement: civic_badges_core::render::Placement,
}

/// Replays a fixed list of counts, one per poll; fails once exhausted.
struct ReplayOracle {
    counts: Mutex<VecDeque<ReportCount>>,
}

#[async_trait]
impl ReportCountOracle for ReplayOracle {
    async fn fetch_count(&self, _identity: &str) -> BadgeResult<ReportCount> {
        let mut counts = self.counts.lock().map_err(|_| BadgeError::OracleUnavailable {
            reason: "replay lock poisoned".into(),
        })?;
        counts.pop_front().ok_or_else(|| BadgeError::OracleUnavailable {
            reason: "replay exhausted".into(),
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("status");
    let db = arg_value(&args, "--db").unwrap_or("badges.db");
    let identity = arg_value(&args, "--identity").unwrap_or("").to_string();
    let data_dir = arg_value(&args, "--data-dir").unwrap_or("./data");

    let config = AchievementConfig::load(data_dir)?;
    log::debug!("loaded {} tiers from {data_dir}", config.thresholds.len());
    let resolver = BadgeResolver::new(Arc::new(config.threshold_table()?));
    let store = Arc::new(SqliteStore::open_migrated(db).with_context(|| format!("open {db}"))?);
    let mut session =
        AchievementSession::open(identity.clone(), resolver, store, Arc::new(SystemClock))?;

    match command {
        "status" => print_status(&session)?,
        "reconcile" => {
            // No default: a count of zero prunes the whole ledger.
            let count: ReportCount = required_arg(&args, "--count")?;
            let update = session.apply_count(count)?;
            println!(
                "count={} changed={} unlocked={} pruned={:?}",
                update.count,
                update.outcome.changed,
                update.outcome.newly_unlocked.as_ref().map_or("-", |t| t.tier_name.as_str()),
                update.outcome.pruned,
            );
            if let Some(event) = update.unlock {
                println!("🎉 {} {} unlocked", event.tier.icon, event.tier.tier_name);
            }
        }
        "bump" => {
            let delta = parse_arg(&args, "--delta", 1u64);
            println!("display count now {}", session.bump_display_count(delta)?);
        }
        "reset" => {
            session.reset()?;
            println!("achievement state cleared for '{identity}'");
        }
        "certificate" => {
            let tier_name = arg_value(&args, "--tier").context("--tier is required")?;
            let Some(earned) = session.ledger().earned_tier(tier_name) else {
                bail!("'{identity}' has not earned {tier_name}");
            };
            let recipient = recipient_from_email(
                arg_value(&args, "--email"),
                &config.certificate.fallback_recipient,
            );
            let cert = Certificate::issue(
                &config.certificate,
                &recipient,
                &earned.tier,
                Some(earned.earned_at),
                &SystemClock,
            );
            let layout = CertificateLayout::build(&cert, &config.certificate);
            let scale = config.certificate.raster_scale.max(1);
            let view = CertificateView {
                certificate: &cert,
                filename: cert.filename(),
                page_placement: fit_to_page(
                    layout.width * scale,
                    layout.height * scale,
                    config.certificate.page_format,
                ),
                layout,
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        "watch" => {
            let counts = arg_value(&args, "--counts").unwrap_or("");
            run_watch(session, counts, &config).await?;
        }
        other => bail!("unknown command '{other}'"),
    }

    Ok(())
}

async fn run_watch(
    session: AchievementSession,
    counts: &str,
    config: &AchievementConfig,
) -> Result<()> {
    let counts = counts
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<ReportCount>())
        .collect::<Result<VecDeque<_>, _>>()
        .context("--counts must be comma-separated integers")?;
    let polls = counts.len();
    if polls == 0 {
        bail!("--counts is empty");
    }

    let oracle = Arc::new(ReplayOracle { counts: Mutex::new(counts) });
    let gate = ReconcileGate::new(session);
    let mut scheduler = SyncScheduler::new(gate, oracle, config.scheduler.clone());
    let mut events = scheduler.start();

    for _ in 0..polls {
        let Some(event) = events.recv().await else {
            break;
        };
        match event {
            SyncEvent::Reconciled(u) => {
                let unlocked = u
                    .unlock
                    .map(|e| format!(" 🎉 {}", e.tier.tier_name))
                    .unwrap_or_default();
                println!("poll: count={} changed={}{unlocked}", u.count, u.outcome.changed);
            }
            SyncEvent::FetchFailed { reason } => println!("poll: skipped ({reason})"),
            SyncEvent::ReconcileFailed { reason } => println!("poll: not applied ({reason})"),
            SyncEvent::Discarded { .. } => break,
        }
    }
    scheduler.stop();

    let result = print_status(&*scheduler.gate().lock().await);
    result
}

fn print_status(session: &AchievementSession) -> Result<()> {
    let progress: Progress = session.progress()?;
    let view = StatusView {
        identity: session.identity().to_string(),
        display_count: progress.count,
        headline: progress.headline(),
        icon: progress.icon().to_string(),
        next_hint: progress.next_hint(),
        last_notified: session.notifier().last_notified()?,
        earned: session.earned(),
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    arg_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn required_arg<T>(args: &[String], flag: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = arg_value(args, flag).with_context(|| format!("{flag} is required"))?;
    raw.parse().with_context(|| format!("{flag} expects a number, got '{raw}'"))
}
