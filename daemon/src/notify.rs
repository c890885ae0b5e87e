//! Optional Telegram summary for manual single-cycle runs.
//!
//! Delivery is best-effort: failures are logged and never affect the
//! poll outcome.

use std::time::Duration;

use review_pipeline::CycleStats;
use serde::Serialize;
use tracing::warn;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Renders the cycle summary sent after a `--once` run.
pub fn summary_message(stats: &CycleStats) -> String {
    format!(
        "<b>review-responder</b> poll complete\nFixed: {} | Skipped: {} | Errors: {}",
        stats.fixed, stats.skipped, stats.errors
    )
}

/// Posts one HTML-formatted message to a Telegram chat.
pub async fn send_telegram(bot_token: &str, chat_id: &str, text: &str) {
    let url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");
    let body = SendMessage {
        chat_id,
        text,
        parse_mode: "HTML",
    };

    let client = match reqwest::Client::builder().timeout(SEND_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "telegram client build failed");
            return;
        }
    };

    match client.post(&url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => {}
        Ok(resp) => warn!(status = %resp.status(), "telegram rejected the notification"),
        Err(e) => warn!(error = %e, "telegram notification failed"),
    }
}
