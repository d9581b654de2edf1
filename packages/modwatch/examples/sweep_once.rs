//! One-shot sweep wired to the live Patreon and Groq APIs.
//!
//! Required environment (a `.env` file works):
//! - `GROQ_API_KEY` — extraction model access
//! - `PATREON_CAMPAIGN_ID` — campaign to sweep
//!
//! Optional:
//! - `GOOGLE_SHEETS_API_KEY` — enables sheet feeds
//! - `RUST_LOG` — log filter, e.g. `modwatch=debug`
//!
//! Notifications go to a logging gateway instead of a chat platform, so the
//! run is side-effect free outside the in-memory store.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::EnvFilter;

use modwatch::error::NotifyResult;
use modwatch::traits::notify::NotificationGateway;
use modwatch::types::feed::FeedPlatform;
use modwatch::types::message::{MessageHandle, RenderableMessage, ThreadHandle};
use modwatch::{
    AnalyzerConfig, FeedSweeper, GoogleSheetsSource, GroqAnalyzer, MemoryStore, RegistryService,
    SweepConfig,
};

/// Gateway that logs instead of delivering.
#[derive(Default)]
struct LogGateway {
    next_id: AtomicU32,
}

#[async_trait]
impl NotificationGateway for LogGateway {
    async fn send(
        &self,
        channel_id: &str,
        message: RenderableMessage,
    ) -> NotifyResult<MessageHandle> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        info!(channel_id, ?message, "send");
        Ok(MessageHandle::new(channel_id, format!("log-{id}")))
    }

    async fn edit(&self, handle: &MessageHandle, message: RenderableMessage) -> NotifyResult<()> {
        info!(message_id = %handle.message_id, ?message, "edit");
        Ok(())
    }

    async fn create_thread(
        &self,
        handle: &MessageHandle,
        title: &str,
    ) -> NotifyResult<ThreadHandle> {
        info!(message_id = %handle.message_id, title, "create_thread");
        Ok(ThreadHandle {
            thread_id: format!("thread-{}", handle.message_id),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let campaign_id = std::env::var("PATREON_CAMPAIGN_ID")?;

    let store = Arc::new(MemoryStore::new());
    let registry = RegistryService::new(Arc::clone(&store));
    registry
        .create_feed(
            campaign_id.as_str(),
            FeedPlatform::Patreon,
            "example",
            "log-channel",
            None,
        )
        .await?;

    let analyzer = Arc::new(GroqAnalyzer::from_env(AnalyzerConfig::default())?);
    let sheets = GoogleSheetsSource::from_env()
        .unwrap_or_else(|_| GoogleSheetsSource::new(String::new()));

    let sweeper = FeedSweeper::new(
        store,
        analyzer,
        modwatch::PatreonSource::new(),
        sheets,
        Arc::new(LogGateway::default()),
        Some("log-review".to_string()),
        SweepConfig::default(),
    );

    let outcome = sweeper.check_single(&campaign_id).await?;
    info!(
        new_posts = outcome.new_posts,
        failures = outcome.failures.len(),
        "sweep complete"
    );
    Ok(())
}
