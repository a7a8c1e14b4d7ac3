//! In-memory, per-conversation message history with sliding-window trimming.

use chrono::{DateTime, Utc};
use ragline_core::ConversationSettings;
use ragline_llm::{LlmMessage, MessageRole};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;

type TurnLocks = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// Conversations are never trimmed below this many messages by the token budget.
const MIN_RETAINED_MESSAGES: usize = 2;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Role/content pair for a model request.
    pub fn to_llm_message(&self) -> LlmMessage {
        LlmMessage::new(self.role.into(), self.content.clone())
    }
}

/// Result of trimming one conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimOutcome {
    /// Messages evicted by this trim
    pub evicted: usize,

    /// Still above the token budget after trimming
    pub over_budget: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub message_count: usize,
    pub estimated_tokens: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
}

/// Owns every conversation's history for the lifetime of the process.
///
/// Unknown conversation ids are never an error: reads return empty results
/// and clears are no-ops.
#[derive(Debug)]
pub struct ConversationManager {
    max_history_messages: usize,
    max_history_tokens: usize,
    conversations: Mutex<HashMap<String, Vec<ConversationMessage>>>,
    turn_locks: TurnLocks,
}

impl Default for ConversationManager {
    fn default() -> Self {
        Self::new(&ConversationSettings::default())
    }
}

impl ConversationManager {
    pub fn new(settings: &ConversationSettings) -> Self {
        Self {
            max_history_messages: settings.max_history_messages,
            max_history_tokens: settings.max_history_tokens,
            conversations: Mutex::new(HashMap::new()),
            turn_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn conversations(&self) -> MutexGuard<'_, HashMap<String, Vec<ConversationMessage>>> {
        self.conversations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one message, then trim.
    pub fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: impl Into<String>,
    ) -> TrimOutcome {
        let mut conversations = self.conversations();
        let messages = conversations.entry(conversation_id.to_string()).or_default();
        messages.push(ConversationMessage::new(role, content));
        self.trim(conversation_id, messages)
    }

    /// Append a user message and its assistant reply as one step.
    ///
    /// No other append can land between the two messages.
    pub fn add_exchange(
        &self,
        conversation_id: &str,
        user_content: impl Into<String>,
        assistant_content: impl Into<String>,
    ) -> TrimOutcome {
        let mut conversations = self.conversations();
        let messages = conversations.entry(conversation_id.to_string()).or_default();

        messages.push(ConversationMessage::new(Role::User, user_content));
        let first = self.trim(conversation_id, messages);
        messages.push(ConversationMessage::new(Role::Assistant, assistant_content));
        let second = self.trim(conversation_id, messages);

        TrimOutcome {
            evicted: first.evicted + second.evicted,
            over_budget: second.over_budget,
        }
    }

    /// Count limit first, then oldest-first eviction down to the token budget.
    fn trim(&self, conversation_id: &str, messages: &mut Vec<ConversationMessage>) -> TrimOutcome {
        let mut evicted = 0;

        if messages.len() > self.max_history_messages {
            let excess = messages.len() - self.max_history_messages;
            messages.drain(..excess);
            evicted += excess;
        }

        let mut tokens = estimate_tokens(messages);
        while tokens > self.max_history_tokens && messages.len() > MIN_RETAINED_MESSAGES {
            messages.remove(0);
            evicted += 1;
            tokens = estimate_tokens(messages);
        }

        let over_budget = tokens > self.max_history_tokens;
        if over_budget {
            tracing::warn!(
                conversation_id,
                estimated_tokens = tokens,
                max_tokens = self.max_history_tokens,
                "Conversation still over token budget after trimming"
            );
        }

        if evicted > 0 {
            tracing::debug!(conversation_id, evicted, "Trimmed conversation history");
        }

        TrimOutcome {
            evicted,
            over_budget,
        }
    }

    /// The last `n` messages (all when `None`), oldest first.
    pub fn get_recent_history(&self, conversation_id: &str, n: Option<usize>) -> Vec<LlmMessage> {
        let conversations = self.conversations();
        let Some(messages) = conversations.get(conversation_id) else {
            return Vec::new();
        };

        let start = n.map_or(0, |n| messages.len().saturating_sub(n));
        messages[start..]
            .iter()
            .map(ConversationMessage::to_llm_message)
            .collect()
    }

    /// Every retained message, with timestamps.
    pub fn get_conversation_history(&self, conversation_id: &str) -> Vec<ConversationMessage> {
        self.conversations()
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clear_conversation(&self, conversation_id: &str) {
        if self.conversations().remove(conversation_id).is_some() {
            tracing::info!(conversation_id, "Cleared conversation");
        }

        // A lock still held by an in-flight turn stays registered
        let mut locks = self.turn_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(conversation_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(conversation_id);
        }
    }

    pub fn summary(&self, conversation_id: &str) -> ConversationSummary {
        let conversations = self.conversations();
        let Some(messages) = conversations.get(conversation_id) else {
            return ConversationSummary::default();
        };

        let user_messages = messages.iter().filter(|m| m.role == Role::User).count();
        ConversationSummary {
            message_count: messages.len(),
            estimated_tokens: estimate_tokens(messages),
            user_messages,
            assistant_messages: messages.len() - user_messages,
        }
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations().len()
    }

    /// Serialize turns on one conversation in arrival order.
    ///
    /// Waiters are granted the lock first-in, first-out. Dropping the
    /// returned guard (or the future awaiting it) releases the turn.
    pub async fn lock_turn(&self, conversation_id: &str) -> TurnGuard {
        let lock = {
            let mut locks = self.turn_locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(conversation_id.to_string()).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;

        TurnGuard {
            guard: Some(guard),
            lock,
            conversation_id: conversation_id.to_string(),
            locks: Arc::clone(&self.turn_locks),
        }
    }

    #[cfg(test)]
    pub(crate) fn turn_lock_count(&self) -> usize {
        self.turn_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// An exclusive turn on one conversation.
///
/// On drop the turn is released, and the conversation's lock entry is
/// removed when no other turn holds or awaits it.
pub struct TurnGuard {
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<tokio::sync::Mutex<()>>,
    conversation_id: String,
    locks: TurnLocks,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Remaining references: the map entry and this guard
        let idle = locks
            .get(&self.conversation_id)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(&self.conversation_id);
        }
    }
}

/// Approximate token count: total characters / 4.
pub fn estimate_tokens(messages: &[ConversationMessage]) -> usize {
    messages
        .iter()
        .map(|m| m.content.chars().count())
        .sum::<usize>()
        / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(max_messages: usize, max_tokens: usize) -> ConversationManager {
        ConversationManager::new(&ConversationSettings {
            max_history_messages: max_messages,
            max_history_tokens: max_tokens,
        })
    }

    #[test]
    fn test_unknown_conversation_is_empty() {
        let manager = ConversationManager::default();
        assert!(manager.get_recent_history("nope", None).is_empty());
        assert!(manager.get_conversation_history("nope").is_empty());
        assert_eq!(manager.summary("nope"), ConversationSummary::default());
        manager.clear_conversation("nope");
        assert_eq!(manager.conversation_count(), 0);
    }

    #[test]
    fn test_message_count_limit() {
        let manager = manager(10, 2000);
        for i in 0..15 {
            manager.add_message("c1", Role::User, format!("message {}", i));
        }

        let history = manager.get_recent_history("c1", None);
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].content, "message 5");
        assert_eq!(history[9].content, "message 14");
    }

    #[test]
    fn test_recent_history_last_n() {
        let manager = ConversationManager::default();
        manager.add_exchange("c1", "q1", "a1");
        manager.add_exchange("c1", "q2", "a2");

        let history = manager.get_recent_history("c1", Some(2));
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "q2");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "a2");

        assert_eq!(manager.get_recent_history("c1", Some(50)).len(), 4);
    }

    #[test]
    fn test_token_budget_evicts_oldest() {
        // 40 chars = 10 tokens per message, budget 25 tokens
        let manager = manager(10, 25);
        for i in 0..4 {
            manager.add_message("c1", Role::User, format!("{}{}", i, "x".repeat(39)));
        }

        let history = manager.get_conversation_history("c1");
        assert_eq!(history.len(), 2);
        assert!(history[0].content.starts_with('2'));
        assert!(history[1].content.starts_with('3'));
    }

    #[test]
    fn test_never_trimmed_below_two_messages() {
        let manager = manager(10, 10);
        manager.add_message("c1", Role::User, "a".repeat(400));
        let outcome = manager.add_message("c1", Role::Assistant, "b".repeat(400));

        assert!(outcome.over_budget);
        assert_eq!(outcome.evicted, 0);
        assert_eq!(manager.get_conversation_history("c1").len(), 2);

        let outcome = manager.add_message("c1", Role::User, "c".repeat(400));
        assert!(outcome.over_budget);
        assert_eq!(outcome.evicted, 1);
        assert_eq!(manager.get_conversation_history("c1").len(), 2);
    }

    #[test]
    fn test_conversations_are_isolated() {
        let manager = ConversationManager::default();
        manager.add_exchange("a", "question a", "answer a");
        manager.add_message("b", Role::User, "question b");

        assert_eq!(manager.get_recent_history("a", None).len(), 2);
        assert_eq!(manager.get_recent_history("b", None).len(), 1);
        assert_eq!(manager.conversation_count(), 2);

        manager.clear_conversation("a");
        assert!(manager.get_recent_history("a", None).is_empty());
        assert_eq!(manager.get_recent_history("b", None).len(), 1);
    }

    #[test]
    fn test_summary_counts() {
        let manager = ConversationManager::default();
        manager.add_exchange("c1", "abcd", "efghijkl");
        manager.add_message("c1", Role::User, "mnop");

        let summary = manager.summary("c1");
        assert_eq!(summary.message_count, 3);
        assert_eq!(summary.user_messages, 2);
        assert_eq!(summary.assistant_messages, 1);
        assert_eq!(summary.estimated_tokens, 4);
    }

    #[test]
    fn test_estimate_tokens() {
        let messages = vec![
            ConversationMessage::new(Role::User, "12345678"),
            ConversationMessage::new(Role::Assistant, "1234"),
        ];
        assert_eq!(estimate_tokens(&messages), 3);
        assert_eq!(estimate_tokens(&[]), 0);
    }

    #[tokio::test]
    async fn test_turn_lock_serializes_same_id() {
        let manager = Arc::new(ConversationManager::default());
        let guard = manager.lock_turn("c1").await;

        let waiter = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let _turn = manager.lock_turn("c1").await;
                manager.add_message("c1", Role::User, "second");
            })
        };

        // Other conversations never contend
        let _other = manager.lock_turn("c2").await;

        tokio::task::yield_now().await;
        manager.add_message("c1", Role::User, "first");
        drop(guard);
        waiter.await.unwrap();

        let history = manager.get_recent_history("c1", None);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].content, "second");
    }

    #[tokio::test]
    async fn test_clear_keeps_lock_held_by_turn() {
        let manager = ConversationManager::default();
        let guard = manager.lock_turn("c1").await;
        manager.clear_conversation("c1");
        assert_eq!(manager.turn_lock_count(), 1);

        drop(guard);
        assert_eq!(manager.turn_lock_count(), 0);
    }

    #[tokio::test]
    async fn test_released_turn_drops_lock_entry() {
        let manager = Arc::new(ConversationManager::default());
        for i in 0..50 {
            let _turn = manager.lock_turn(&format!("c{}", i)).await;
        }
        assert_eq!(manager.turn_lock_count(), 0);

        // A queued waiter keeps the entry alive until its own turn ends
        let first = manager.lock_turn("c1").await;
        let waiter = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let _turn = manager.lock_turn("c1").await;
                manager.turn_lock_count()
            })
        };
        let holders = || Arc::strong_count(&manager.turn_locks.lock().unwrap()["c1"]);
        while holders() < 5 {
            tokio::task::yield_now().await;
        }
        drop(first);

        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(manager.turn_lock_count(), 0);
    }
}
