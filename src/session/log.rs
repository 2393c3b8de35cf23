//! Record of optimistic mutations awaiting backend confirmation
//!
//! Every write that touches local state before the backend answers gets an
//! entry here. The controller settles the entry once the request resolves, and
//! a failed entry is what the compensating action (marking the affected message
//! or session as failed) is keyed on. The log lets the UI and tests ask which
//! sessions have diverged from the backend.

/// Kind of optimistic write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    /// A session was created locally with a client-generated id
    CreateSession,
    /// A user message was appended at `index`
    AppendMessage {
        /// Position of the message in the session transcript
        index: usize,
    },
    /// A session was removed locally before the backend deleted it
    DeleteSession,
}

/// Settlement state of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Request still in flight
    Pending,
    /// Backend acknowledged the write
    Confirmed,
    /// Backend rejected the write or the request failed
    Failed,
}

/// One logged mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Log-unique identifier
    pub id: u64,
    /// Session the write applies to
    pub session_id: String,
    /// What was written
    pub kind: MutationKind,
    /// Where the write stands
    pub state: MutationState,
    /// Failure text, set when `state` is `Failed`
    pub error: Option<String>,
}

/// Append-only log of optimistic mutations
#[derive(Debug, Default)]
pub struct MutationLog {
    entries: Vec<Mutation>,
    next_id: u64,
}

impl MutationLog {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pending mutation and returns its id
    pub fn record(&mut self, session_id: impl Into<String>, kind: MutationKind) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Mutation {
            id,
            session_id: session_id.into(),
            kind,
            state: MutationState::Pending,
            error: None,
        });
        id
    }

    /// Marks a mutation as acknowledged
    pub fn confirm(&mut self, id: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|m| m.id == id) {
            entry.state = MutationState::Confirmed;
            entry.error = None;
        }
    }

    /// Marks a mutation as failed
    pub fn fail(&mut self, id: u64, error: impl Into<String>) {
        if let Some(entry) = self.entries.iter_mut().find(|m| m.id == id) {
            entry.state = MutationState::Failed;
            entry.error = Some(error.into());
        }
    }

    /// Looks up a mutation by id
    pub fn get(&self, id: u64) -> Option<&Mutation> {
        self.entries.iter().find(|m| m.id == id)
    }

    /// Mutations still waiting for the backend
    pub fn pending(&self) -> impl Iterator<Item = &Mutation> {
        self.entries
            .iter()
            .filter(|m| m.state == MutationState::Pending)
    }

    /// Mutations the backend never acknowledged
    pub fn failed(&self) -> impl Iterator<Item = &Mutation> {
        self.entries
            .iter()
            .filter(|m| m.state == MutationState::Failed)
    }

    /// Ids of sessions whose local state differs from the backend
    pub fn diverged_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for m in self.failed() {
            if !ids.contains(&m.session_id) {
                ids.push(m.session_id.clone());
            }
        }
        ids
    }

    /// Drops settled entries; pending ones are kept
    pub fn compact(&mut self) {
        self.entries
            .retain(|m| m.state == MutationState::Pending || m.state == MutationState::Failed);
    }

    /// Forgets everything, e.g. after the collection was replaced from the backend
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
