//! Async driver around `ChatState`.
//!
//! `ChatSession` issues the API calls, feeds their results into the state and
//! executes the resulting followups. While signed in, a background task
//! merges the change feed into the same state. The lock on the state is
//! never held across an await, so the feed task and user actions interleave
//! freely and always see the conversation that is open at dispatch time.
//!
//! Notices go out on an unbounded channel; every state change is published
//! as a snapshot through a `watch` channel.
//!
//! The feed task runs on a handle that shares the state but not the feed
//! slot. Dropping the last user-held `ChatSession` aborts the feed.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ChatApi;
use crate::error::{ClientError, Result};
use crate::feed::{FeedEvent, FeedStream};
use crate::state::{Action, ChatState, Followup, Notice, PageKind, PageRequest};
use crate::types::*;

pub struct ChatSession<A: ChatApi + 'static> {
    api: Arc<A>,
    state: Arc<Mutex<ChatState>>,
    snapshots: Arc<watch::Sender<ChatState>>,
    notices: mpsc::UnboundedSender<Notice>,
    feed_task: Arc<FeedTask>,
}

/// Slot for the running feed task; aborts it when dropped.
#[derive(Default)]
struct FeedTask(Mutex<Option<JoinHandle<()>>>);

impl Drop for FeedTask {
    fn drop(&mut self) {
        let slot = self.0.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl<A: ChatApi + 'static> Clone for ChatSession<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            state: self.state.clone(),
            snapshots: self.snapshots.clone(),
            notices: self.notices.clone(),
            feed_task: self.feed_task.clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<A: ChatApi + 'static> ChatSession<A> {
    /// Create a session and the receiving end of its notices.
    pub fn new(api: A, page_limit: i64) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let state = ChatState::new(page_limit);
        let (snapshots, _) = watch::channel(state.clone());
        let (notices, notices_rx) = mpsc::unbounded_channel();

        let session = Self {
            api: Arc::new(api),
            state: Arc::new(Mutex::new(state)),
            snapshots: Arc::new(snapshots),
            notices,
            feed_task: Arc::new(FeedTask::default()),
        };
        (session, notices_rx)
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Current state.
    pub fn snapshot(&self) -> ChatState {
        lock(&self.state).clone()
    }

    /// Receiver that sees every state change.
    pub fn watch(&self) -> watch::Receiver<ChatState> {
        self.snapshots.subscribe()
    }

    /// Same session with an empty feed slot, for the feed task itself.
    fn detached(&self) -> Self {
        Self {
            feed_task: Arc::new(FeedTask::default()),
            ..self.clone()
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        let mut state = lock(&self.state);
        let result = f(&mut state);
        self.snapshots.send_replace(state.clone());
        result
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start a session for `user_id`: load the lists and subscribe to the feed.
    pub async fn sign_in(&self, user_id: UserId) {
        self.stop_feed();
        let followups = self.with_state(|s| s.sign_in(user_id));
        info!(%user_id, "Chat session started");

        match self.api.subscribe().await {
            Ok(feed) => {
                let session = self.detached();
                let handle = tokio::spawn(async move { session.run_feed(feed).await });
                *lock(&self.feed_task.0) = Some(handle);
            }
            Err(e) => {
                warn!(error = %e, "Chat feed unavailable, relying on explicit fetches");
            }
        }

        self.run_followups(followups).await;
    }

    /// Tear down the feed and forget all state.
    pub async fn sign_out(&self) {
        self.stop_feed();
        self.with_state(|s| s.sign_out());
        info!("Chat session ended");
    }

    fn stop_feed(&self) {
        if let Some(handle) = lock(&self.feed_task.0).take() {
            handle.abort();
        }
    }

    /// Whether the change feed task is still running.
    pub fn feed_active(&self) -> bool {
        lock(&self.feed_task.0)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    pub async fn open_conversation(&self, conversation_id: ConversationId) -> Result<()> {
        let request = self.with_state(|s| s.open_conversation(conversation_id));
        self.fetch_page(request).await
    }

    pub fn close_conversation(&self) {
        self.with_state(|s| s.close_conversation());
    }

    /// Fetch the next older page. `Ok(false)` when nothing was requested
    /// because a load is in flight or the history is exhausted.
    pub async fn load_more(&self) -> Result<bool> {
        match self.with_state(|s| s.begin_load_more()) {
            Some(request) => {
                self.fetch_page(request).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fetch_page(&self, request: PageRequest) -> Result<()> {
        let result = self
            .api
            .list_messages(request.conversation_id, request.limit, request.offset)
            .await;

        match result {
            Ok(page) => {
                let followups = self.with_state(|s| s.apply_page(request, page.messages));
                self.run_followups(followups).await;
                Ok(())
            }
            Err(e) => {
                self.with_state(|s| s.page_failed(request));
                let action = match request.kind {
                    PageKind::Initial => Action::Open,
                    PageKind::LoadMore => Action::LoadMore,
                };
                self.fail(action, &e);
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Mutations; state changes only after the server confirmed
    // ------------------------------------------------------------------

    pub async fn send_message(&self, content: &str) -> Result<Message> {
        let conversation_id = self
            .snapshot()
            .active_conversation()
            .ok_or(ClientError::NoActiveConversation)?;

        let message = match self.api.send_message(conversation_id, content).await {
            Ok(message) => message,
            Err(e) => {
                self.fail(Action::Send, &e);
                return Err(e);
            }
        };

        let followups = self.with_state(|s| s.apply_sent(message.clone()));
        self.run_followups(followups).await;
        Ok(message)
    }

    /// Create a conversation and open it.
    pub async fn create_conversation(
        &self,
        title: Option<&str>,
        target_user_id: Option<UserId>,
    ) -> Result<Conversation> {
        let conversation = match self.api.create_conversation(title, target_user_id).await {
            Ok(conversation) => conversation,
            Err(e) => {
                self.fail(Action::Create, &e);
                return Err(e);
            }
        };

        let followups = self.with_state(|s| s.apply_created(&conversation));
        self.run_followups(followups).await;
        self.open_conversation(conversation.id).await?;
        Ok(conversation)
    }

    pub async fn rename_conversation(
        &self,
        conversation_id: ConversationId,
        title: &str,
    ) -> Result<Conversation> {
        match self.api.rename_conversation(conversation_id, title).await {
            Ok(conversation) => {
                self.with_state(|s| s.apply_renamed(&conversation));
                Ok(conversation)
            }
            Err(e) => {
                self.fail(Action::Rename, &e);
                Err(e)
            }
        }
    }

    pub async fn delete_conversation(&self, conversation_id: ConversationId) -> Result<()> {
        if let Err(e) = self.api.delete_conversation(conversation_id).await {
            self.fail(Action::DeleteConversation, &e);
            return Err(e);
        }

        let followups = self.with_state(|s| s.apply_conversation_deleted(conversation_id));
        self.run_followups(followups).await;
        Ok(())
    }

    pub async fn delete_message(&self, message_id: MessageId) -> Result<()> {
        if let Err(e) = self.api.delete_message(message_id).await {
            self.fail(Action::DeleteMessage, &e);
            return Err(e);
        }

        let followups = self.with_state(|s| s.apply_message_deleted(message_id));
        self.run_followups(followups).await;
        Ok(())
    }

    pub async fn set_filter(&self, filter: ConversationFilter) {
        let followups = self.with_state(|s| s.set_filter(filter));
        self.run_followups(followups).await;
    }

    /// Reload the conversation list and unread count.
    pub async fn refresh(&self) {
        self.run_followups(vec![Followup::RefreshConversations, Followup::RefreshUnreadCount])
            .await;
    }

    fn fail(&self, action: Action, error: &ClientError) {
        warn!(?action, error = %error, "Chat action failed");
        let _ = self.notices.send(Notice::Failed {
            action,
            message: error.to_string(),
        });
    }

    // ------------------------------------------------------------------
    // Change feed
    // ------------------------------------------------------------------

    /// Merge one feed event into the state.
    pub async fn apply_feed_event(&self, event: FeedEvent) {
        match event {
            FeedEvent::Connected => debug!("Chat feed connected"),
            FeedEvent::Chat(event) => {
                let followups = self.with_state(|s| s.apply_event(event));
                self.run_followups(followups).await;
            }
            FeedEvent::Lagged { missed } => {
                warn!(missed, "Chat feed lagged, refreshing");
                self.refresh().await;
            }
        }
    }

    /// Consume the feed until it ends or fails. Failures are logged and the
    /// session continues on explicit fetches alone.
    async fn run_feed(self, mut feed: FeedStream) {
        while let Some(item) = feed.next().await {
            match item {
                Ok(event) => self.apply_feed_event(event).await,
                Err(e) => {
                    warn!(error = %e, "Chat feed failed, relying on explicit fetches");
                    return;
                }
            }
        }
        debug!("Chat feed closed");
    }

    // ------------------------------------------------------------------
    // Followups
    // ------------------------------------------------------------------

    async fn run_followups(&self, followups: Vec<Followup>) {
        let mut done: Vec<Followup> = Vec::with_capacity(followups.len());

        for followup in followups {
            if done.contains(&followup) {
                continue;
            }

            match &followup {
                Followup::RefreshConversations => self.refresh_conversations().await,
                Followup::RefreshUnreadCount => self.refresh_unread_count().await,
                Followup::Notify(notice) => {
                    let _ = self.notices.send(notice.clone());
                }
            }
            done.push(followup);
        }
    }

    async fn refresh_conversations(&self) {
        let (user, filter) = {
            let state = lock(&self.state);
            (state.current_user(), state.filter())
        };
        if user.is_none() {
            return;
        }

        match self.api.list_conversations(filter).await {
            Ok(conversations) => self.with_state(|s| {
                // The session may have changed hands while the call was out
                if s.current_user() == user {
                    s.apply_conversations(conversations);
                }
            }),
            Err(e) => warn!(error = %e, "Failed to refresh conversations"),
        }
    }

    async fn refresh_unread_count(&self) {
        let user = lock(&self.state).current_user();
        if user.is_none() {
            return;
        }

        match self.api.unread_count().await {
            Ok(count) => self.with_state(|s| {
                if s.current_user() == user {
                    s.apply_unread_count(count);
                }
            }),
            Err(e) => warn!(error = %e, "Failed to refresh unread count"),
        }
    }
}
