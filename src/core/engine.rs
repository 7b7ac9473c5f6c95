//! Conversation engine: owns the collection, the cursor, and the mutation
//! rules for send/retry/new/clear.
//!
//! User-initiated mutations are synchronous and persist immediately.
//! Dispatch runs on spawned tasks and reports back as id-tagged events over
//! an unbounded channel owned by the driving loop; completions are applied
//! by conversation-id lookup against the live collection, never by cursor,
//! so a reply landing after the user navigated away still reaches the right
//! transcript. An event whose conversation no longer exists is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::dispatch::Dispatcher;
use crate::api::{wire_history, DispatchOutcome, WireMessage};
use crate::core::conversation::{Conversation, ConversationList};
use crate::core::history::HistoryStore;
use crate::core::providers::ProviderDescriptor;

/// Completion of one dispatch, routed back by conversation id.
#[derive(Debug)]
pub struct DispatchEvent {
    pub conversation_id: String,
    pub outcome: DispatchOutcome,
}

pub struct ChatEngine {
    conversations: ConversationList,
    store: Box<dyn HistoryStore>,
    dispatcher: Arc<dyn Dispatcher>,
    incognito: bool,
    events_tx: mpsc::UnboundedSender<DispatchEvent>,
}

impl ChatEngine {
    /// Build an engine over a store and a dispatcher, adopting any persisted
    /// history (or starting with one fresh conversation). The returned
    /// receiver delivers dispatch completions; feed them back through
    /// [`ChatEngine::apply_dispatch`].
    pub fn new(
        store: Box<dyn HistoryStore>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let snapshot = store.load();
        let mut conversations = ConversationList::from_snapshot(snapshot);
        if conversations.is_empty() {
            conversations.prepend_new();
        }

        let engine = Self {
            conversations,
            store,
            dispatcher,
            incognito: false,
            events_tx,
        };
        (engine, events_rx)
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.conversations.conversations()
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.conversations.current()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.conversations.current_id()
    }

    pub fn incognito(&self) -> bool {
        self.incognito
    }

    /// Toggle incognito. While on, mutations stay in memory only.
    pub fn set_incognito(&mut self, on: bool) {
        self.incognito = on;
    }

    /// Create a fresh conversation at the front of the collection and move
    /// the cursor onto it. Returns its id.
    pub fn new_chat(&mut self) -> String {
        let id = self.conversations.prepend_new().id.clone();
        self.persist();
        id
    }

    /// Move the cursor. Silent no-op when the id is unknown.
    pub fn select_conversation(&mut self, id: &str) -> bool {
        self.conversations.select(id)
    }

    /// Append a user turn to the current conversation and dispatch the
    /// updated history. Blank input and a missing cursor are silent no-ops.
    /// Returns whether a dispatch was started.
    pub fn send_user_message(
        &mut self,
        text: &str,
        provider: &ProviderDescriptor,
        model: &str,
    ) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let Some(current_id) = self.conversations.current_id().map(str::to_string) else {
            return false;
        };
        let Some(conversation) = self.conversations.find_mut(&current_id) else {
            return false;
        };

        conversation.push_user_message(text);
        let history = wire_history(&conversation.messages);

        self.persist();
        self.spawn_dispatch(current_id, provider.clone(), model.to_string(), history);
        true
    }

    /// Regenerate from an assistant turn: drop it (and anything after it),
    /// persist the truncated transcript, and re-dispatch what remains.
    /// No-op unless `message_index` names an assistant turn in an existing
    /// conversation. Returns whether a dispatch was started.
    pub fn retry(
        &mut self,
        conversation_id: &str,
        message_index: usize,
        provider: &ProviderDescriptor,
        model: &str,
    ) -> bool {
        let Some(conversation) = self.conversations.find_mut(conversation_id) else {
            return false;
        };
        if !conversation.is_retry_target(message_index) {
            return false;
        }

        conversation.truncate_from(message_index);
        let history = wire_history(&conversation.messages);

        self.persist();
        self.spawn_dispatch(
            conversation_id.to_string(),
            provider.clone(),
            model.to_string(),
            history,
        );
        true
    }

    /// Drop the whole collection and the persisted blob, then start over
    /// with one fresh conversation.
    pub fn clear_history(&mut self) {
        if let Err(err) = self.store.clear() {
            warn!(%err, "failed to clear persisted history");
        }
        self.conversations.reset();
        self.persist();
    }

    /// Apply a dispatch completion to its conversation. Returns false when
    /// the conversation no longer exists and the event was dropped.
    pub fn apply_dispatch(&mut self, event: DispatchEvent) -> bool {
        let Some(conversation) = self.conversations.find_mut(&event.conversation_id) else {
            debug!(
                conversation_id = %event.conversation_id,
                "dropping completion for a conversation that no longer exists"
            );
            return false;
        };
        conversation.push_assistant_message(event.outcome.into_text());
        self.persist();
        true
    }

    fn spawn_dispatch(
        &self,
        conversation_id: String,
        provider: ProviderDescriptor,
        model: String,
        history: Vec<WireMessage>,
    ) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = dispatcher.send(&provider, &model, history).await;
            // The receiver may be gone during shutdown; nothing to do then.
            let _ = events_tx.send(DispatchEvent {
                conversation_id,
                outcome,
            });
        });
    }

    fn persist(&self) {
        if self.incognito {
            return;
        }
        if let Err(err) = self.store.save(self.conversations.conversations()) {
            warn!(%err, "failed to persist conversation history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::MemoryHistoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted dispatcher: replies with a fixed text and records the
    /// history length of each call.
    struct MockDispatcher {
        reply: DispatchOutcome,
        seen_history_lens: Mutex<Vec<usize>>,
    }

    impl MockDispatcher {
        fn success(text: &str) -> Self {
            Self {
                reply: DispatchOutcome::Success(text.to_string()),
                seen_history_lens: Mutex::new(Vec::new()),
            }
        }

        fn failure(text: &str) -> Self {
            Self {
                reply: DispatchOutcome::Failure(text.to_string()),
                seen_history_lens: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Dispatcher for MockDispatcher {
        async fn send(
            &self,
            _provider: &ProviderDescriptor,
            _model: &str,
            history: Vec<WireMessage>,
        ) -> DispatchOutcome {
            self.seen_history_lens.lock().unwrap().push(history.len());
            self.reply.clone()
        }

        async fn discover_local_models(&self, _provider: &ProviderDescriptor) -> Vec<String> {
            Vec::new()
        }
    }

    fn test_provider() -> ProviderDescriptor {
        ProviderDescriptor {
            id: "test".to_string(),
            display_name: "Test".to_string(),
            base_url: "https://api.test.invalid/v1".to_string(),
            api_key_env: None,
            api_key: None,
            models: vec!["test-model".to_string()],
            requires_model: true,
            local: false,
        }
    }

    fn test_engine(
        dispatcher: MockDispatcher,
    ) -> (
        ChatEngine,
        mpsc::UnboundedReceiver<DispatchEvent>,
        MemoryHistoryStore,
        Arc<MockDispatcher>,
    ) {
        let store = MemoryHistoryStore::new();
        let dispatcher = Arc::new(dispatcher);
        let (engine, rx) = ChatEngine::new(
            Box::new(store.clone()),
            Arc::clone(&dispatcher) as Arc<dyn Dispatcher>,
        );
        (engine, rx, store, dispatcher)
    }

    #[tokio::test]
    async fn send_appends_user_turn_then_assistant_turn() {
        let (mut engine, mut rx, _store, _dispatcher) = test_engine(MockDispatcher::success("pong"));
        let provider = test_provider();

        assert!(engine.send_user_message("ping", &provider, "test-model"));
        // User turn lands immediately, before the dispatch resolves.
        assert_eq!(engine.current().unwrap().messages.len(), 1);
        assert!(engine.current().unwrap().messages[0].is_user());

        let event = rx.recv().await.unwrap();
        assert!(engine.apply_dispatch(event));

        let messages = &engine.current().unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_assistant());
        assert_eq!(messages[1].text, "pong");
    }

    #[tokio::test]
    async fn blank_messages_are_rejected() {
        let (mut engine, mut rx, store, _dispatcher) = test_engine(MockDispatcher::success("pong"));
        let provider = test_provider();

        assert!(!engine.send_user_message("", &provider, "test-model"));
        assert!(!engine.send_user_message("   \t\n", &provider, "test-model"));

        assert!(engine.current().unwrap().messages.is_empty());
        assert!(rx.try_recv().is_err());
        assert!(!store.has_blob());
    }

    #[tokio::test]
    async fn failure_outcomes_land_in_the_transcript() {
        let (mut engine, mut rx, _store, _dispatcher) =
            test_engine(MockDispatcher::failure("Error: connection refused"));
        let provider = test_provider();

        engine.send_user_message("hello?", &provider, "test-model");
        let event = rx.recv().await.unwrap();
        engine.apply_dispatch(event);

        let messages = &engine.current().unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_assistant());
        assert_eq!(messages[1].text, "Error: connection refused");
    }

    #[tokio::test]
    async fn dispatch_receives_the_full_updated_history() {
        let (mut engine, mut rx, _store, dispatcher) =
            test_engine(MockDispatcher::success("sure"));
        let provider = test_provider();

        engine.send_user_message("one", &provider, "test-model");
        let event = rx.recv().await.unwrap();
        engine.apply_dispatch(event);
        engine.send_user_message("two", &provider, "test-model");
        let event = rx.recv().await.unwrap();
        engine.apply_dispatch(event);

        // First call saw [user], second saw [user, assistant, user].
        assert_eq!(*dispatcher.seen_history_lens.lock().unwrap(), vec![1, 3]);
        assert_eq!(engine.current().unwrap().messages.len(), 4);
    }

    #[tokio::test]
    async fn retry_truncates_then_regenerates() {
        let (mut engine, mut rx, _store, _dispatcher) = test_engine(MockDispatcher::success("take two"));
        let provider = test_provider();
        let id = engine.current_id().unwrap().to_string();

        engine.send_user_message("question", &provider, "test-model");
        engine.apply_dispatch(rx.recv().await.unwrap());
        assert_eq!(engine.current().unwrap().messages.len(), 2);

        // Retry the assistant turn at index 1: transcript shrinks to 1
        // message before the new dispatch resolves, then grows to 2.
        assert!(engine.retry(&id, 1, &provider, "test-model"));
        assert_eq!(engine.current().unwrap().messages.len(), 1);

        engine.apply_dispatch(rx.recv().await.unwrap());
        let messages = &engine.current().unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].text, "take two");
    }

    #[tokio::test]
    async fn retry_rejects_user_turns_and_bad_indices() {
        let (mut engine, mut rx, _store, _dispatcher) = test_engine(MockDispatcher::success("pong"));
        let provider = test_provider();
        let id = engine.current_id().unwrap().to_string();

        engine.send_user_message("hi", &provider, "test-model");
        engine.apply_dispatch(rx.recv().await.unwrap());

        assert!(!engine.retry(&id, 0, &provider, "test-model")); // user turn
        assert!(!engine.retry(&id, 7, &provider, "test-model")); // out of range
        assert!(!engine.retry("no-such-id", 1, &provider, "test-model"));
        assert_eq!(engine.current().unwrap().messages.len(), 2);
    }

    #[tokio::test]
    async fn replies_follow_their_conversation_not_the_cursor() {
        let (mut engine, mut rx, _store, _dispatcher) = test_engine(MockDispatcher::success("late reply"));
        let provider = test_provider();
        let original_id = engine.current_id().unwrap().to_string();

        engine.send_user_message("slow question", &provider, "test-model");
        // Navigate away before the dispatch resolves.
        let new_id = engine.new_chat();
        assert_eq!(engine.current_id(), Some(new_id.as_str()));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.conversation_id, original_id);
        assert!(engine.apply_dispatch(event));

        // The reply landed in the original conversation; the new chat is
        // still empty.
        let original = engine
            .conversations()
            .iter()
            .find(|c| c.id == original_id)
            .unwrap();
        assert_eq!(original.messages.len(), 2);
        assert_eq!(original.messages[1].text, "late reply");
        assert!(engine.current().unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn completions_for_vanished_conversations_are_dropped() {
        let (mut engine, mut rx, _store, _dispatcher) = test_engine(MockDispatcher::success("too late"));
        let provider = test_provider();

        engine.send_user_message("hello", &provider, "test-model");
        engine.clear_history();

        let event = rx.recv().await.unwrap();
        assert!(!engine.apply_dispatch(event));
        assert!(engine.current().unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn history_round_trips_through_the_store() {
        let (mut engine, mut rx, store, _dispatcher) = test_engine(MockDispatcher::success("remembered"));
        let provider = test_provider();

        engine.send_user_message("remember me", &provider, "test-model");
        engine.apply_dispatch(rx.recv().await.unwrap());
        let saved_id = engine.current_id().unwrap().to_string();
        let saved_title = engine.current().unwrap().title.clone();

        // A second engine over the same slot adopts the history.
        let (revived, _rx) =
            ChatEngine::new(Box::new(store.clone()), Arc::new(MockDispatcher::success("x")));
        assert_eq!(revived.conversations().len(), 1);
        let conversation = &revived.conversations()[0];
        assert_eq!(conversation.id, saved_id);
        assert_eq!(conversation.title, saved_title);
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(revived.current_id(), Some(saved_id.as_str()));
    }

    #[tokio::test]
    async fn clear_history_resets_to_one_fresh_conversation() {
        let (mut engine, mut rx, store, _dispatcher) = test_engine(MockDispatcher::success("gone soon"));
        let provider = test_provider();

        engine.send_user_message("delete this", &provider, "test-model");
        engine.apply_dispatch(rx.recv().await.unwrap());
        engine.clear_history();

        assert_eq!(engine.conversations().len(), 1);
        assert!(engine.current().unwrap().messages.is_empty());

        // The persisted blob now holds exactly the fresh collection.
        let persisted = store.load();
        assert_eq!(persisted.len(), 1);
        assert!(persisted[0].messages.is_empty());
    }

    #[tokio::test]
    async fn incognito_suppresses_persistence() {
        let (mut engine, mut rx, store, _dispatcher) = test_engine(MockDispatcher::success("secret"));
        let provider = test_provider();
        engine.set_incognito(true);

        engine.send_user_message("between us", &provider, "test-model");
        engine.apply_dispatch(rx.recv().await.unwrap());
        engine.new_chat();

        assert!(!store.has_blob());
        // The in-memory collection still mutated normally.
        assert_eq!(engine.conversations().len(), 2);
    }

    #[tokio::test]
    async fn new_chat_prepends_and_persists() {
        let (mut engine, _rx, store, _dispatcher) = test_engine(MockDispatcher::success("x"));
        let first_id = engine.current_id().unwrap().to_string();

        let new_id = engine.new_chat();
        assert_eq!(engine.conversations()[0].id, new_id);
        assert_eq!(engine.conversations()[1].id, first_id);

        let persisted = store.load();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].id, new_id);
    }
}
