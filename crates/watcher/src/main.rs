//! ResolveIT grievance watcher
//!
//! Connects to the real-time endpoint, follows the grievances listed in
//! `WATCH_GRIEVANCES` (comma separated ids) and logs every event until Ctrl-C.
//! Subscriptions are re-created after every (re)connect.

use std::env;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use resolveit_realtime::{
    Envelope, HandlerSet, RealtimeClient, RealtimeConfig, SubscriptionCallbacks, Topic,
};
use resolveit_shared::{GrievanceId, Remark, StatusChange, TypingState};

const CONSUMER_KEY: &str = "watcher";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = RealtimeConfig::from_env().context("Invalid realtime configuration")?;
    let topics = parse_topics(&env::var("WATCH_GRIEVANCES").unwrap_or_default())?;
    if topics.is_empty() {
        anyhow::bail!("WATCH_GRIEVANCES must list at least one grievance id");
    }

    tracing::info!(
        url = %config.url,
        grievances = topics.len(),
        max_reconnect_attempts = config.reconnect.max_attempts,
        "Starting grievance watcher"
    );

    let client = RealtimeClient::new(config);
    let (connected_tx, mut connected_rx) = mpsc::unbounded_channel();
    client
        .add_handler(CONSUMER_KEY, watcher_handlers(connected_tx))
        .await;
    client.connect().await;

    loop {
        tokio::select! {
            Some(()) = connected_rx.recv() => {
                for topic in &topics {
                    if let Err(e) = client.subscribe(topic.clone(), topic_callbacks()).await {
                        tracing::warn!(topic = %topic, error = %e, "Could not follow grievance");
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Shutting down grievance watcher");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn parse_topics(raw: &str) -> anyhow::Result<Vec<Topic>> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<GrievanceId>()
                .map(Topic::from)
                .with_context(|| format!("Invalid grievance id: {}", id))
        })
        .collect()
}

fn topic_callbacks() -> SubscriptionCallbacks {
    SubscriptionCallbacks::new().on_error(|err| {
        tracing::error!(error = %err, "Subscription error");
    })
}

fn watcher_handlers(connected: mpsc::UnboundedSender<()>) -> HandlerSet {
    HandlerSet::new()
        .on_connect(move || {
            let _ = connected.send(());
        })
        .on_disconnect(|| tracing::warn!("Live updates paused"))
        .on_new_item(|item, topic| {
            match serde_json::from_value::<Remark>(item.clone()) {
                Ok(remark) => tracing::info!(
                    grievance = topic.id(),
                    author = remark.user_name.as_deref().unwrap_or("unknown"),
                    internal = remark.is_internal.unwrap_or(false),
                    message = %remark.message,
                    "New remark"
                ),
                Err(_) => tracing::info!(grievance = topic.id(), item = %item, "New item"),
            }
        })
        .on_status_update(|envelope, topic| log_status(envelope, topic))
        .on_typing_indicator(|envelope, topic| {
            if let Ok(typing) = envelope.decode_payload::<TypingState>() {
                tracing::debug!(
                    grievance = topic.id(),
                    user = %typing.user_id,
                    typing = typing.is_typing,
                    "Typing indicator"
                );
            }
        })
        .on_message(|envelope, topic| {
            tracing::info!(
                grievance = topic.id(),
                kind = %envelope.kind,
                payload = %envelope.payload,
                "Grievance event"
            );
        })
}

fn log_status(envelope: &Envelope, topic: &Topic) {
    match envelope.decode_payload::<StatusChange>() {
        Ok(change) => tracing::info!(
            grievance = topic.id(),
            from = change.old_status.as_deref().unwrap_or("-"),
            to = %change.new_status,
            closed = change.status().map(|s| s.is_closed()).unwrap_or(false),
            at = envelope.timestamp.as_deref().unwrap_or("-"),
            "Status changed"
        ),
        Err(e) => tracing::warn!(
            grievance = topic.id(),
            error = %e,
            payload = %envelope.payload,
            "Unreadable status update"
        ),
    }
}
