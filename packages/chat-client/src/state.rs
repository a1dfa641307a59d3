//! Client-side chat state, free of I/O.
//!
//! `ChatState` is the single source of truth for which conversation is open,
//! the messages held in memory and the pagination offset. Every input (a
//! fetched page, a confirmed send, a feed event) is applied here and answered
//! with `Followup`s that the session executes.
//!
//! Offset bookkeeping: the offset counts the messages of the open
//! conversation that are in memory and were counted server-side, so the next
//! load-more request skips exactly those. It grows by the number of new
//! messages each fetched page adds and by one for every appended message, and
//! shrinks by one when an in-memory message is deleted.

use crate::types::*;

/// Page size used by the session unless configured otherwise.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// First page of a freshly opened conversation; replaces the list
    Initial,
    /// Older page; prepended to the list
    LoadMore,
}

/// A page fetch issued by the state. Stale replies are recognized by `epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub conversation_id: ConversationId,
    pub limit: i64,
    pub offset: i64,
    pub kind: PageKind,
    epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Open,
    LoadMore,
    Send,
    Create,
    Rename,
    DeleteConversation,
    DeleteMessage,
}

/// Passive notification for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Someone else wrote in a conversation that is not open
    NewMessage {
        conversation_id: ConversationId,
        sender_id: UserId,
        preview: String,
    },
    /// A user action failed; state was left as it was
    Failed { action: Action, message: String },
}

/// Work the session must do after a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Followup {
    RefreshConversations,
    RefreshUnreadCount,
    Notify(Notice),
}

#[derive(Debug, Clone)]
pub struct ChatState {
    limit: i64,
    current_user: Option<UserId>,
    filter: ConversationFilter,
    conversations: Vec<ConversationSummary>,
    unread_count: i64,
    active: Option<ConversationId>,
    messages: Vec<Message>,
    offset: i64,
    has_more: bool,
    loading_more: bool,
    epoch: u64,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

impl ChatState {
    pub fn new(limit: i64) -> Self {
        Self {
            limit: limit.max(1),
            current_user: None,
            filter: ConversationFilter::All,
            conversations: Vec::new(),
            unread_count: 0,
            active: None,
            messages: Vec::new(),
            offset: 0,
            has_more: true,
            loading_more: false,
            epoch: 0,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn current_user(&self) -> Option<UserId> {
        self.current_user
    }

    pub fn filter(&self) -> ConversationFilter {
        self.filter
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn unread_count(&self) -> i64 {
        self.unread_count
    }

    pub fn active_conversation(&self) -> Option<ConversationId> {
        self.active
    }

    /// Messages of the open conversation, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    /// Whether a load-more request would be issued right now.
    pub fn can_load_more(&self) -> bool {
        self.active.is_some() && self.has_more && !self.loading_more
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    pub fn sign_in(&mut self, user_id: UserId) -> Vec<Followup> {
        self.reset();
        self.current_user = Some(user_id);
        vec![Followup::RefreshConversations, Followup::RefreshUnreadCount]
    }

    pub fn sign_out(&mut self) {
        self.reset();
    }

    /// Drop everything, including pending page replies.
    fn reset(&mut self) {
        let epoch = self.epoch + 1;
        *self = Self::new(self.limit);
        self.epoch = epoch;
    }

    pub fn set_filter(&mut self, filter: ConversationFilter) -> Vec<Followup> {
        self.filter = filter;
        vec![Followup::RefreshConversations]
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    /// Make `conversation_id` the open conversation and request its first page.
    pub fn open_conversation(&mut self, conversation_id: ConversationId) -> PageRequest {
        self.epoch += 1;
        self.active = Some(conversation_id);
        self.messages.clear();
        self.offset = 0;
        self.has_more = true;
        self.loading_more = false;

        PageRequest {
            conversation_id,
            limit: self.limit,
            offset: 0,
            kind: PageKind::Initial,
            epoch: self.epoch,
        }
    }

    pub fn close_conversation(&mut self) {
        self.epoch += 1;
        self.active = None;
        self.messages.clear();
        self.offset = 0;
        self.has_more = true;
        self.loading_more = false;
    }

    /// Request the next older page, unless one is in flight or none is left.
    pub fn begin_load_more(&mut self) -> Option<PageRequest> {
        if !self.can_load_more() {
            return None;
        }
        let conversation_id = self.active?;
        self.loading_more = true;

        Some(PageRequest {
            conversation_id,
            limit: self.limit,
            offset: self.offset,
            kind: PageKind::LoadMore,
            epoch: self.epoch,
        })
    }

    fn is_current(&self, request: &PageRequest) -> bool {
        request.epoch == self.epoch && self.active == Some(request.conversation_id)
    }

    /// Apply a fetched page (oldest first). Stale pages are ignored.
    pub fn apply_page(&mut self, request: PageRequest, messages: Vec<Message>) -> Vec<Followup> {
        if !self.is_current(&request) {
            return Vec::new();
        }

        let received = messages.len() as i64;
        self.has_more = received >= request.limit;

        match request.kind {
            PageKind::Initial => {
                // Anything that arrived over the feed while the page was in
                // flight is either in the page or newer than it
                let mut merged = messages;
                for message in self.messages.drain(..) {
                    if !merged.iter().any(|m| m.id == message.id) {
                        merged.push(message);
                    }
                }
                self.offset = merged.len() as i64;
                self.messages = merged;

                // Opening marked messages read server-side
                vec![Followup::RefreshConversations, Followup::RefreshUnreadCount]
            }
            PageKind::LoadMore => {
                self.loading_more = false;
                let older: Vec<Message> = messages
                    .into_iter()
                    .filter(|m| !self.contains(m.id))
                    .collect();
                // Rows already held were counted when they arrived
                self.offset += older.len() as i64;
                self.messages.splice(0..0, older);
                Vec::new()
            }
        }
    }

    /// A page fetch failed; allow the user to trigger it again.
    pub fn page_failed(&mut self, request: PageRequest) {
        if request.kind == PageKind::LoadMore && self.is_current(&request) {
            self.loading_more = false;
        }
    }

    // ------------------------------------------------------------------
    // Message mutations
    // ------------------------------------------------------------------

    fn contains(&self, message_id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }

    /// Append to the open conversation unless already present.
    fn append(&mut self, message: Message) -> bool {
        if self.active != Some(message.conversation_id) || self.contains(message.id) {
            return false;
        }
        self.messages.push(message);
        self.offset += 1;
        true
    }

    /// Remove from memory, returns whether it was there.
    fn remove(&mut self, message_id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != message_id);
        let removed = self.messages.len() < before;
        if removed {
            self.offset = (self.offset - 1).max(0);
        }
        removed
    }

    /// The server confirmed our own message.
    pub fn apply_sent(&mut self, message: Message) -> Vec<Followup> {
        self.append(message);
        vec![Followup::RefreshConversations, Followup::RefreshUnreadCount]
    }

    /// The server confirmed deleting a message.
    pub fn apply_message_deleted(&mut self, message_id: MessageId) -> Vec<Followup> {
        self.remove(message_id);
        vec![Followup::RefreshConversations, Followup::RefreshUnreadCount]
    }

    // ------------------------------------------------------------------
    // Conversation mutations
    // ------------------------------------------------------------------

    pub fn apply_conversations(&mut self, conversations: Vec<ConversationSummary>) {
        self.conversations = conversations;
    }

    pub fn apply_unread_count(&mut self, count: i64) {
        self.unread_count = count;
    }

    pub fn apply_created(&mut self, _conversation: &Conversation) -> Vec<Followup> {
        vec![Followup::RefreshConversations]
    }

    pub fn apply_renamed(&mut self, conversation: &Conversation) {
        if let Some(summary) = self.conversations.iter_mut().find(|c| c.id == conversation.id) {
            summary.title = conversation.title.clone();
            summary.updated_at = conversation.updated_at;
        }
    }

    pub fn apply_conversation_deleted(&mut self, conversation_id: ConversationId) -> Vec<Followup> {
        self.conversations.retain(|c| c.id != conversation_id);
        if self.active == Some(conversation_id) {
            self.close_conversation();
        }
        vec![Followup::RefreshUnreadCount]
    }

    // ------------------------------------------------------------------
    // Change feed
    // ------------------------------------------------------------------

    /// Merge a change feed event. Ignored while signed out.
    pub fn apply_event(&mut self, event: ChatEvent) -> Vec<Followup> {
        let Some(me) = self.current_user else {
            return Vec::new();
        };

        match event {
            ChatEvent::MessageInserted { message } => {
                let from_someone_else = message.sender_id != me;

                if self.active == Some(message.conversation_id) {
                    self.append(message);
                    if from_someone_else {
                        vec![Followup::RefreshUnreadCount, Followup::RefreshConversations]
                    } else {
                        Vec::new()
                    }
                } else {
                    let mut followups =
                        vec![Followup::RefreshConversations, Followup::RefreshUnreadCount];
                    if from_someone_else {
                        followups.push(Followup::Notify(Notice::NewMessage {
                            conversation_id: message.conversation_id,
                            sender_id: message.sender_id,
                            preview: message.content.chars().take(80).collect(),
                        }));
                    }
                    followups
                }
            }
            ChatEvent::MessageDeleted { message_id, .. } => {
                self.remove(message_id);
                vec![Followup::RefreshConversations, Followup::RefreshUnreadCount]
            }
            ChatEvent::MessagesRead {
                conversation_id,
                reader_id,
                ..
            } => {
                if self.active == Some(conversation_id) {
                    for message in self.messages.iter_mut().filter(|m| m.sender_id != reader_id) {
                        message.is_read = true;
                    }
                }
                if reader_id == me {
                    Vec::new()
                } else {
                    vec![Followup::RefreshConversations, Followup::RefreshUnreadCount]
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn message(conversation_id: ConversationId, sender_id: UserId, content: &str) -> Message {
        Message {
            id: Uuid::now_v7(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    fn signed_in(limit: i64) -> (ChatState, UserId) {
        let me = Uuid::now_v7();
        let mut state = ChatState::new(limit);
        state.sign_in(me);
        (state, me)
    }

    fn batch(conversation_id: ConversationId, sender: UserId, n: usize) -> Vec<Message> {
        (0..n).map(|i| message(conversation_id, sender, &format!("m{}", i))).collect()
    }

    #[test]
    fn test_initial_page_replaces_and_sets_offset() {
        let (mut state, me) = signed_in(20);
        let conversation = Uuid::now_v7();

        let request = state.open_conversation(conversation);
        assert_eq!(request.offset, 0);
        assert_eq!(request.kind, PageKind::Initial);

        let followups = state.apply_page(request, batch(conversation, me, 20));
        assert_eq!(state.messages().len(), 20);
        assert_eq!(state.offset(), 20);
        assert!(state.has_more());
        assert!(followups.contains(&Followup::RefreshConversations));
        assert!(followups.contains(&Followup::RefreshUnreadCount));
    }

    #[test]
    fn test_load_more_prepends_and_finishes_on_short_page() {
        let (mut state, me) = signed_in(20);
        let conversation = Uuid::now_v7();
        let older = batch(conversation, me, 5);
        let newer = batch(conversation, me, 20);

        let request = state.open_conversation(conversation);
        state.apply_page(request, newer.clone());

        let more = state.begin_load_more().unwrap();
        assert_eq!(more.offset, 20);
        assert!(state.is_loading_more());

        state.apply_page(more, older.clone());
        assert!(!state.has_more());
        assert!(!state.is_loading_more());
        assert_eq!(state.offset(), 25);

        let expected: Vec<_> = older.iter().chain(newer.iter()).map(|m| m.id).collect();
        let actual: Vec<_> = state.messages().iter().map(|m| m.id).collect();
        assert_eq!(actual, expected);

        assert!(state.begin_load_more().is_none());
    }

    #[test]
    fn test_concurrent_load_more_is_suppressed() {
        let (mut state, me) = signed_in(2);
        let conversation = Uuid::now_v7();
        let request = state.open_conversation(conversation);
        state.apply_page(request, batch(conversation, me, 2));

        let first = state.begin_load_more();
        assert!(first.is_some());
        assert!(state.begin_load_more().is_none());

        state.page_failed(first.unwrap());
        assert!(state.begin_load_more().is_some());
    }

    #[test]
    fn test_stale_page_is_ignored() {
        let (mut state, me) = signed_in(20);
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();

        let stale = state.open_conversation(first);
        let current = state.open_conversation(second);

        assert!(state.apply_page(stale, batch(first, me, 3)).is_empty());
        assert!(state.messages().is_empty());

        state.apply_page(current, batch(second, me, 1));
        assert_eq!(state.messages()[0].conversation_id, second);
    }

    #[test]
    fn test_own_send_then_echo_keeps_one_copy() {
        let (mut state, me) = signed_in(20);
        let conversation = Uuid::now_v7();
        let request = state.open_conversation(conversation);
        state.apply_page(request, Vec::new());

        let sent = message(conversation, me, "oi");
        state.apply_sent(sent.clone());
        let followups = state.apply_event(ChatEvent::MessageInserted { message: sent.clone() });

        assert_eq!(state.messages(), &[sent]);
        assert_eq!(state.offset(), 1);
        assert!(followups.is_empty());
    }

    #[test]
    fn test_echo_before_send_confirmation_keeps_one_copy() {
        let (mut state, me) = signed_in(20);
        let conversation = Uuid::now_v7();
        let request = state.open_conversation(conversation);
        state.apply_page(request, Vec::new());

        let sent = message(conversation, me, "oi");
        state.apply_event(ChatEvent::MessageInserted { message: sent.clone() });
        state.apply_sent(sent);

        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.offset(), 1);
    }

    #[test]
    fn test_insert_from_other_in_open_conversation_refreshes_count() {
        let (mut state, _me) = signed_in(20);
        let conversation = Uuid::now_v7();
        let request = state.open_conversation(conversation);
        state.apply_page(request, Vec::new());

        let followups = state.apply_event(ChatEvent::MessageInserted {
            message: message(conversation, Uuid::now_v7(), "resposta"),
        });

        assert_eq!(state.messages().len(), 1);
        assert!(followups.contains(&Followup::RefreshUnreadCount));
        assert!(!followups.iter().any(|f| matches!(f, Followup::Notify(_))));
    }

    #[test]
    fn test_insert_elsewhere_notifies() {
        let (mut state, _me) = signed_in(20);
        let open = Uuid::now_v7();
        let elsewhere = Uuid::now_v7();
        let sender = Uuid::now_v7();
        let request = state.open_conversation(open);
        state.apply_page(request, Vec::new());

        let followups = state.apply_event(ChatEvent::MessageInserted {
            message: message(elsewhere, sender, "preciso de ajuda"),
        });

        assert!(state.messages().is_empty());
        assert_eq!(state.offset(), 0);
        assert!(followups.contains(&Followup::RefreshConversations));
        assert!(followups.contains(&Followup::Notify(Notice::NewMessage {
            conversation_id: elsewhere,
            sender_id: sender,
            preview: "preciso de ajuda".to_string(),
        })));
    }

    #[test]
    fn test_own_insert_elsewhere_does_not_notify() {
        let (mut state, me) = signed_in(20);
        let followups = state.apply_event(ChatEvent::MessageInserted {
            message: message(Uuid::now_v7(), me, "de outro dispositivo"),
        });

        assert!(!followups.iter().any(|f| matches!(f, Followup::Notify(_))));
        assert!(followups.contains(&Followup::RefreshUnreadCount));
    }

    #[test]
    fn test_delete_event_removes_and_shrinks_offset() {
        let (mut state, me) = signed_in(20);
        let conversation = Uuid::now_v7();
        let page = batch(conversation, me, 3);
        let request = state.open_conversation(conversation);
        state.apply_page(request, page.clone());

        let followups = state.apply_event(ChatEvent::MessageDeleted {
            message_id: page[1].id,
            conversation_id: conversation,
        });
        assert_eq!(state.messages().len(), 2);
        assert_eq!(state.offset(), 2);
        assert!(followups.contains(&Followup::RefreshConversations));
        assert!(followups.contains(&Followup::RefreshUnreadCount));

        // Unknown ids still refresh but leave the list alone
        let followups = state.apply_event(ChatEvent::MessageDeleted {
            message_id: Uuid::now_v7(),
            conversation_id: conversation,
        });
        assert_eq!(state.offset(), 2);
        assert!(!followups.is_empty());
    }

    #[test]
    fn test_messages_read_flips_flags_of_other_senders() {
        let (mut state, me) = signed_in(20);
        let conversation = Uuid::now_v7();
        let admin = Uuid::now_v7();
        let mine = message(conversation, me, "pergunta");
        let theirs = message(conversation, admin, "resposta");
        let request = state.open_conversation(conversation);
        state.apply_page(request, vec![mine, theirs]);

        let followups = state.apply_event(ChatEvent::MessagesRead {
            conversation_id: conversation,
            reader_id: admin,
            count: 1,
        });

        assert!(state.messages()[0].is_read);
        assert!(!state.messages()[1].is_read);
        assert!(followups.contains(&Followup::RefreshUnreadCount));
    }

    #[test]
    fn test_events_ignored_while_signed_out() {
        let mut state = ChatState::default();
        let followups = state.apply_event(ChatEvent::MessageInserted {
            message: message(Uuid::now_v7(), Uuid::now_v7(), "oi"),
        });
        assert!(followups.is_empty());
    }

    #[test]
    fn test_sign_out_discards_pending_page() {
        let (mut state, me) = signed_in(20);
        let conversation = Uuid::now_v7();
        let request = state.open_conversation(conversation);

        state.sign_out();
        state.sign_in(me);

        assert!(state.apply_page(request, batch(conversation, me, 2)).is_empty());
        assert!(state.active_conversation().is_none());
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_deleting_active_conversation_closes_it() {
        let (mut state, _me) = signed_in(20);
        let conversation = Uuid::now_v7();
        state.open_conversation(conversation);

        state.apply_conversation_deleted(conversation);
        assert!(state.active_conversation().is_none());
        assert!(state.begin_load_more().is_none());
    }

    #[test]
    fn test_pages_and_live_inserts_reconstruct_history() {
        let (mut state, me) = signed_in(3);
        let conversation = Uuid::now_v7();
        // Server history, oldest first
        let mut history = batch(conversation, me, 7);

        let request = state.open_conversation(conversation);
        state.apply_page(request, history[4..].to_vec());

        // A live insert arrives before the user scrolls up
        let live = message(conversation, Uuid::now_v7(), "nova");
        history.push(live.clone());
        state.apply_event(ChatEvent::MessageInserted { message: live });

        while let Some(more) = state.begin_load_more() {
            let page = server_page(&history, &more);
            state.apply_page(more, page);
        }

        let ids: Vec<_> = state.messages().iter().map(|m| m.id).collect();
        let expected: Vec<_> = history.iter().map(|m| m.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_insert_committed_before_load_more_leaves_no_gap() {
        let (mut state, me) = signed_in(3);
        let conversation = Uuid::now_v7();
        let mut history = batch(conversation, me, 9);

        let request = state.open_conversation(conversation);
        state.apply_page(request, history[6..].to_vec());

        // The insert lands server-side after the request was issued but
        // before the page is selected, so the page repeats m6
        let more = state.begin_load_more().unwrap();
        let live = message(conversation, Uuid::now_v7(), "nova");
        history.push(live.clone());
        let page = server_page(&history, &more);
        assert_eq!(page.last().map(|m| m.id), Some(history[6].id));

        state.apply_event(ChatEvent::MessageInserted { message: live });
        state.apply_page(more, page);
        assert_eq!(state.offset(), state.messages().len() as i64);

        while let Some(more) = state.begin_load_more() {
            let page = server_page(&history, &more);
            state.apply_page(more, page);
        }

        assert_eq!(state.offset(), state.messages().len() as i64);
        let contents: Vec<_> = state.messages().iter().map(|m| m.content.as_str()).collect();
        let expected: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, expected);
    }

    /// Server view of a page: newest first, skip `offset`, take `limit`,
    /// returned oldest first.
    fn server_page(history: &[Message], request: &PageRequest) -> Vec<Message> {
        let newest_first: Vec<_> = history.iter().rev().cloned().collect();
        let start = (request.offset as usize).min(newest_first.len());
        let end = (start + request.limit as usize).min(newest_first.len());
        let mut page = newest_first[start..end].to_vec();
        page.reverse();
        page
    }
}
