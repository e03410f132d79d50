use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;

use portal_core::constants::DEMO_LINKS;
use portal_core::remote::{HttpLedger, MemoryLedger};
use portal_core::stats::SyncStats;
use portal_core::{
    AccountState, ActionOutcome, CoreConfig, FeedAccount, FeedEvent, FeedItem, FeedRuntime,
    Identity, Notice, Projection, SessionState, StaticWallet,
};

use super::config::PortalConfig;

const LEDGER_TIMEOUT: Duration = Duration::from_secs(10);
const DEMO_LATENCY: Duration = Duration::from_millis(150);

/// One-shot feed operation run against the configured ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    Feed,
    Init,
    Submit { link: String },
    Like { link: String },
    Unlike { link: String },
    Toggle { link: String },
    /// Walk through the optimistic like flow against an in-process ledger
    Demo,
}

/// JSON printed after a command
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandReport {
    pub session: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ActionOutcome>,
    pub projection: Projection,
    pub stats: SyncStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoReport {
    pub optimistic: Projection,
    pub confirmed: Projection,
    pub stats: SyncStats,
}

fn drain_notices(rx: &mut UnboundedReceiver<FeedEvent>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let FeedEvent::Notice(notice) = event {
            notices.push(notice);
        }
    }
    notices
}

/// Restore or open a session and make sure the feed was loaded once.
async fn open_session(runtime: &FeedRuntime) -> Result<Identity> {
    let identity = match runtime.start().await {
        Some(identity) => identity,
        None => runtime.connect().await.context("Wallet connection failed")?,
    };
    if runtime.projection().account == AccountState::Unknown {
        runtime.refresh().await.context("Failed to load feed")?;
    }
    Ok(identity)
}

/// Run a command and collect what the user would see afterwards.
pub async fn execute(config: &PortalConfig, command: FeedCommand) -> Result<CommandReport> {
    if command == FeedCommand::Demo {
        bail!("demo does not produce a command report");
    }

    let ledger = HttpLedger::new(LEDGER_TIMEOUT).context("Failed to build HTTP client")?;
    let wallet = config.build_wallet()?;
    let runtime = FeedRuntime::new(
        CoreConfig::new(config.target.clone()),
        Arc::new(wallet),
        Arc::new(ledger),
    );
    let mut events = runtime
        .take_event_rx()
        .context("Event receiver already taken")?;

    let identity = open_session(&runtime).await?;
    tracing::debug!(identity = identity.short(), "session open");

    let outcome = match command {
        FeedCommand::Feed | FeedCommand::Demo => None,
        FeedCommand::Init => Some(runtime.initialize_account().await?),
        FeedCommand::Submit { link } => {
            runtime.set_draft(link);
            Some(runtime.submit_draft().await?)
        }
        FeedCommand::Like { link } => Some(runtime.like(&link).await?),
        FeedCommand::Unlike { link } => Some(runtime.unlike(&link).await?),
        FeedCommand::Toggle { link } => Some(runtime.toggle_like(&link).await?),
    };

    Ok(CommandReport {
        session: runtime.session_state(),
        outcome,
        projection: runtime.projection(),
        stats: runtime.stats(),
        notices: drain_notices(&mut events),
    })
}

/// Like the first demo link while the ledger holds the instruction, then
/// release it and show the confirmed state.
pub async fn run_demo() -> Result<DemoReport> {
    let curator = Identity::parse("demo-curator")?;
    let viewer = Identity::parse("demo-viewer")?;
    let config = CoreConfig::default();

    let ledger = Arc::new(MemoryLedger::new());
    ledger.seed_account(
        &config.target,
        FeedAccount {
            total_items: DEMO_LINKS.len() as u64,
            items: DEMO_LINKS
                .iter()
                .map(|link| FeedItem::new(*link, curator.clone()))
                .collect(),
        },
    );
    ledger.set_latency(DEMO_LATENCY);

    let wallet = Arc::new(StaticWallet::new(viewer, true, true));
    let runtime = Arc::new(FeedRuntime::new(config, wallet, ledger.clone()));
    open_session(&runtime).await?;

    let link = DEMO_LINKS[0];
    ledger.pause_instructions();
    let task = {
        let runtime = runtime.clone();
        tokio::spawn(async move { runtime.like(link).await })
    };

    let held = tokio::time::timeout(Duration::from_secs(5), async {
        while ledger.held_instructions() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    if held.is_err() {
        ledger.resume_instructions();
        bail!("like never reached the ledger");
    }

    let optimistic = runtime.projection();
    ledger.resume_instructions();
    task.await.context("Like task panicked")??;

    Ok(DemoReport {
        optimistic,
        confirmed: runtime.projection(),
        stats: runtime.stats(),
    })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

/// Run a command and print its result as JSON on stdout
pub async fn run_command(config: &PortalConfig, command: FeedCommand, pretty: bool) -> Result<()> {
    match command {
        FeedCommand::Demo => print_json(&run_demo().await?, pretty),
        command => print_json(&execute(config, command).await?, pretty),
    }
}
