use std::collections::HashMap;
use std::sync::RwLock;

use super::types::GraphState;

/// In-memory checkpoints keyed by session (thread) id. Lives for the process.
#[derive(Default)]
pub struct SessionStore {
    threads: RwLock<HashMap<String, GraphState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, thread_id: &str) -> Option<GraphState> {
        let map = self.threads.read().ok()?;
        map.get(thread_id).cloned()
    }

    pub fn put(&self, thread_id: &str, state: GraphState) {
        if let Ok(mut map) = self.threads.write() {
            map.insert(thread_id.to_string(), state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Message;

    #[test]
    fn threads_are_isolated() {
        let store = SessionStore::new();
        assert_eq!(store.get("a"), None);

        let state = GraphState {
            messages: vec![Message::user("hello")],
            structured_response: None,
        };
        store.put("a", state.clone());

        assert_eq!(store.get("a"), Some(state));
        assert_eq!(store.get("b"), None);
    }

    #[test]
    fn put_replaces_previous_checkpoint() {
        let store = SessionStore::new();
        store.put("a", GraphState::default());
        let newer = GraphState {
            messages: vec![Message::user("again")],
            structured_response: None,
        };
        store.put("a", newer.clone());
        assert_eq!(store.get("a"), Some(newer));
    }
}
