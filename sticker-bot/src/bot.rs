//! Update loop and per-user workers.
//!
//! Each user gets a worker task that owns their [`Conversation`] and handles
//! that user's events one at a time, so a long creation run for one user never
//! blocks another. Replies go through a separate sender task per worker so they
//! reach the chat while the conversation is still busy. A worker that receives
//! nothing for `telegram.session_idle_secs` stops, dropping its session.

use crate::telegram::update::{parse_update, update_id, Inbound};
use crate::telegram::TelegramClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use sticker_common::config::Config;
use sticker_common::logging::generate_trace_id;
use sticker_core::{Conversation, MergeSettings, OwnerHandle, Reply, StickerApi, UserId};
use tokio::sync::mpsc;

/// Pause after a failed poll before retrying.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct Bot {
    client: Arc<TelegramClient>,
    owner: Arc<OwnerHandle>,
    settings: MergeSettings,
    allowed_users: Vec<String>,
    poll_timeout_secs: u64,
    idle_after: Duration,
    workers: HashMap<UserId, mpsc::UnboundedSender<Inbound>>,
}

impl Bot {
    pub fn new(client: Arc<TelegramClient>, config: &Config) -> Self {
        Self {
            client,
            owner: Arc::new(OwnerHandle::new()),
            settings: MergeSettings::from(&config.merge),
            allowed_users: config.telegram.allowed_users.clone(),
            poll_timeout_secs: config.telegram.poll_timeout_secs,
            idle_after: Duration::from_secs(config.telegram.session_idle_secs),
            workers: HashMap::new(),
        }
    }

    fn is_user_allowed(&self, identity: &str) -> bool {
        self.allowed_users.iter().any(|u| u == "*" || u == identity)
    }

    fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        identities.into_iter().any(|id| self.is_user_allowed(id))
    }

    /// Number of users with a live worker.
    pub fn active_users(&self) -> usize {
        self.workers.values().filter(|w| !w.is_closed()).count()
    }

    /// Forget workers that stopped after going idle.
    fn prune_workers(&mut self) {
        let before = self.workers.len();
        self.workers.retain(|_, worker| !worker.is_closed());
        let pruned = before - self.workers.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = self.workers.len(), "Pruned idle workers");
        }
    }

    /// Long-poll for updates until Ctrl-C.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut offset: i64 = 0;
        tracing::info!(
            poll_timeout_secs = self.poll_timeout_secs,
            "Sticker bot listening for updates"
        );

        loop {
            let polled = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!(active_users = self.active_users(), "Shutdown requested");
                    break;
                }
                polled = self.client.get_updates(offset, self.poll_timeout_secs) => polled,
            };

            let updates = match polled {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "Telegram poll error");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in &updates {
                if let Some(id) = update_id(update) {
                    offset = offset.max(id + 1);
                }
                self.dispatch(update);
            }
        }

        Ok(())
    }

    /// Route one raw update to its user's worker.
    pub fn dispatch(&mut self, update: &serde_json::Value) {
        let Some(inbound) = parse_update(update) else {
            tracing::debug!("Ignoring update without a sender");
            return;
        };

        let identities = inbound.identities();
        if !self.is_any_user_allowed(identities.iter().map(String::as_str)) {
            tracing::warn!(
                user_id = inbound.user_id,
                username = inbound.username.as_deref().unwrap_or("unknown"),
                "Ignoring update from unauthorized user"
            );
            return;
        }

        self.route(inbound);
    }

    fn route(&mut self, inbound: Inbound) {
        self.prune_workers();
        let user_id = inbound.user_id;
        if let Some(worker) = self.workers.get(&user_id) {
            match worker.send(inbound) {
                Ok(()) => return,
                Err(mpsc::error::SendError(inbound)) => {
                    tracing::warn!(user_id, "Worker stopped, restarting");
                    self.workers.remove(&user_id);
                    self.spawn_and_send(inbound);
                    return;
                }
            }
        }
        self.spawn_and_send(inbound);
    }

    fn spawn_and_send(&mut self, inbound: Inbound) {
        let user_id = inbound.user_id;
        let worker = spawn_worker(
            user_id,
            self.client.clone(),
            self.owner.clone(),
            self.settings.clone(),
            self.idle_after,
        );
        if worker.send(inbound).is_err() {
            tracing::error!(user_id, "Fresh worker rejected an update");
            return;
        }
        self.workers.insert(user_id, worker);
    }
}

/// Spawn the task owning one user's conversation.
fn spawn_worker(
    user_id: UserId,
    client: Arc<TelegramClient>,
    owner: Arc<OwnerHandle>,
    settings: MergeSettings,
    idle_after: Duration,
) -> mpsc::UnboundedSender<Inbound> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Inbound>();
    let outbound = spawn_sender(client.clone());
    let api: Arc<dyn StickerApi> = client.clone();

    tokio::spawn(async move {
        let mut conversation = Conversation::new(user_id, api, owner, settings);
        tracing::debug!(user_id, "Conversation worker started");

        loop {
            match tokio::time::timeout(idle_after, rx.recv()).await {
                Ok(Some(inbound)) => {
                    handle_inbound(&client, &mut conversation, &outbound, inbound).await;
                }
                Ok(None) => break,
                Err(_) => {
                    // Refuse new updates, then finish whatever already arrived.
                    rx.close();
                    while let Ok(inbound) = rx.try_recv() {
                        handle_inbound(&client, &mut conversation, &outbound, inbound).await;
                    }
                    tracing::info!(
                        user_id,
                        stage = conversation.stage().as_str(),
                        idle_secs = idle_after.as_secs(),
                        "Session idle, stopping worker"
                    );
                    break;
                }
            }
        }

        tracing::debug!(user_id, "Conversation worker stopped");
    });

    tx
}

async fn handle_inbound(
    client: &TelegramClient,
    conversation: &mut Conversation,
    outbound: &mpsc::UnboundedSender<(i64, Reply)>,
    inbound: Inbound,
) {
    let user_id = conversation.user_id();
    let trace_id = generate_trace_id();

    if let Some(callback_id) = &inbound.callback_id {
        if let Err(e) = client.answer_callback_query(callback_id, None).await {
            tracing::warn!(trace_id = %trace_id, user_id, error = %e, "Failed to answer callback query");
        }
    }

    let Some(event) = inbound.event else {
        return;
    };

    tracing::info!(
        trace_id = %trace_id,
        user_id,
        chat_id = inbound.chat_id,
        stage = conversation.stage().as_str(),
        "Update received"
    );

    let chat_id = inbound.chat_id;
    conversation
        .drive(event, &mut |reply| {
            if outbound.send((chat_id, reply)).is_err() {
                tracing::error!(user_id, "Reply sender stopped");
            }
        })
        .await;

    tracing::debug!(
        trace_id = %trace_id,
        user_id,
        stage = conversation.stage().as_str(),
        "Update handled"
    );
}

/// Spawn the task that delivers replies in order.
fn spawn_sender(client: Arc<TelegramClient>) -> mpsc::UnboundedSender<(i64, Reply)> {
    let (tx, mut rx) = mpsc::unbounded_channel::<(i64, Reply)>();

    tokio::spawn(async move {
        while let Some((chat_id, reply)) = rx.recv().await {
            if let Err(e) = client.send_reply(chat_id, &reply).await {
                tracing::error!(chat_id, error = %e, "Failed to send reply");
            }
        }
    });

    tx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(allowed: &[&str]) -> Bot {
        let mut config = Config::default();
        config.telegram.allowed_users = allowed.iter().map(ToString::to_string).collect();
        Bot::new(
            Arc::new(TelegramClient::new("t", "http://127.0.0.1:9")),
            &config,
        )
    }

    fn photo_from(update_id: i64, user: i64) -> serde_json::Value {
        serde_json::json!({
            "update_id": update_id,
            "message": {
                "message_id": update_id,
                "from": {"id": user},
                "chat": {"id": user},
                "photo": []
            }
        })
    }

    #[test]
    fn wildcard_allows_everyone() {
        let bot = bot(&["*"]);
        assert!(bot.is_any_user_allowed(["42", "anyone"]));
    }

    #[test]
    fn specific_users_by_name_or_id() {
        let bot = bot(&["alice", "7"]);
        assert!(bot.is_any_user_allowed(["1", "alice"]));
        assert!(bot.is_any_user_allowed(["7"]));
        assert!(!bot.is_any_user_allowed(["8", "bob"]));
    }

    #[tokio::test]
    async fn unauthorized_updates_spawn_no_worker() {
        let mut bot = bot(&["alice"]);
        bot.dispatch(&serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "from": {"id": 5, "username": "mallory"},
                "chat": {"id": 5},
                "text": "/start"
            }
        }));
        assert_eq!(bot.active_users(), 0);
    }

    #[tokio::test]
    async fn one_worker_per_user() {
        let mut bot = bot(&["*"]);
        for (update_id, user) in [(1, 5), (2, 5), (3, 6)] {
            bot.dispatch(&photo_from(update_id, user));
        }
        assert_eq!(bot.active_users(), 2);
    }

    #[tokio::test]
    async fn idle_workers_are_reaped() {
        let mut bot = bot(&["*"]);
        bot.idle_after = Duration::from_millis(50);

        bot.dispatch(&photo_from(1, 5));
        bot.dispatch(&photo_from(2, 6));
        assert_eq!(bot.active_users(), 2);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(bot.active_users(), 0);

        bot.dispatch(&photo_from(3, 5));
        assert_eq!(bot.workers.len(), 1);
        assert_eq!(bot.active_users(), 1);
    }
}
