pub mod api;
pub mod handler;
pub mod types;

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::settings::Settings;

pub use api::TelegramClient;
use types::Message;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const RETRY_DELAY_SECS: u64 = 5;

/// Answer `message` on its own task; chats never wait on each other.
pub fn dispatch(tasks: &mut JoinSet<()>, client: &TelegramClient, settings: &Arc<Settings>, message: Message) {
    let client = client.clone();
    let settings = Arc::clone(settings);
    tasks.spawn(async move {
        let chat_id = message.chat.id;
        if let Err(err) = handler::handle_message(&client, &settings, message).await {
            log_error!("failed to answer chat {}: {err:#}", chat_id);
        }
    });
}

fn reap_finished(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(err) = result {
            log_error!("message task failed: {err}");
        }
    }
}

/// Long-poll Telegram for updates until `cancel_token` fires.
pub async fn bot_loop(client: TelegramClient, settings: Arc<Settings>, cancel_token: CancellationToken) {
    let mut offset = 0;
    let mut tasks = JoinSet::new();
    log_info!("bot started, polling for updates");

    loop {
        let updates = tokio::select! {
            result = client.get_updates(offset) => result,
            _ = cancel_token.cancelled() => break,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(err) => {
                log_error!("polling failed: {err:#}");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(RETRY_DELAY_SECS)) => continue,
                    _ = cancel_token.cancelled() => break,
                }
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            if let Some(message) = update.message {
                dispatch(&mut tasks, &client, &settings, message);
            }
        }
        reap_finished(&mut tasks);
    }

    log_info!("bot loop shutting down, abandoning {} in-flight messages", tasks.len());
    tasks.shutdown().await;
}
