use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::identity::IdentityGate;
use crate::results::SearchResult;
use crate::search::{ImageBlob, SearchMode, SearchRequest};

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub images: Vec<Arc<ImageBlob>>,
    pub description: String,
    pub mode: SearchMode,
    pub result: SearchResult,
}

impl HistoryEntry {
    /// Label for list views: the description, or a generic tag for image-only searches.
    pub fn title(&self) -> &str {
        let description = self.description.trim();
        if description.is_empty() {
            "Image Search"
        } else {
            description
        }
    }

    pub fn preview(&self) -> Option<&ImageBlob> {
        self.images.first().map(Arc::as_ref)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistorySelection<'a> {
    Entry(&'a HistoryEntry),
    SignInRequired,
    NotFound,
}

/// Past searches, most recent first. Entries are never edited once recorded.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed one-shot search. Chat turns are not recorded.
    pub fn record(
        &mut self,
        request: &SearchRequest,
        result: SearchResult,
    ) -> Option<&HistoryEntry> {
        if request.mode == SearchMode::Chat {
            return None;
        }
        self.entries.push_front(HistoryEntry {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            images: request.images.clone(),
            description: request.description.clone(),
            mode: request.mode,
            result,
        });
        self.entries.front()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Entry at `index` in most-recent-first order.
    pub fn nth(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// Resolves an entry for reopening; multi and chat entries need a signed-in user.
    pub fn select<'a>(&'a self, id: &str, identity: &dyn IdentityGate) -> HistorySelection<'a> {
        match self.get(id) {
            None => HistorySelection::NotFound,
            Some(entry) if entry.mode.requires_sign_in() && !identity.is_signed_in() => {
                HistorySelection::SignInRequired
            }
            Some(entry) => HistorySelection::Entry(entry),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
