use crate::models::Chapter;
use crate::services::chapterizer;
use crate::services::llm::{DEFAULT_SUMMARY_PERCENT, clamp_summary_percent};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Everything one uploaded book carries between requests.
///
/// `text` and `chapters` are fixed at upload; only the slider value and the
/// chapter selection change afterwards.
#[derive(Debug, Clone)]
pub struct Session {
    pub text: Arc<str>,
    pub chapters: Arc<[Chapter]>,
    pub summary_percent: u8,
    pub selected_chapter: Option<usize>,
}

impl Session {
    pub fn new(text: String) -> Self {
        let chapters = chapterizer::locate(&text);
        Session {
            text: text.into(),
            chapters: chapters.into(),
            summary_percent: DEFAULT_SUMMARY_PERCENT,
            selected_chapter: None,
        }
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    /// The text of chapter `index`, if there is such a chapter.
    pub fn chapter_text(&self, index: usize) -> Option<String> {
        self.chapters
            .get(index)
            .map(|chapter| chapter.text(&self.text))
    }
}

/// Sessions kept before the oldest upload is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 64;

#[derive(Default)]
struct Sessions {
    by_id: HashMap<Uuid, Session>,
    // insertion order, oldest first
    order: VecDeque<Uuid>,
}

/// In-memory sessions keyed by upload id, bounded to `capacity` entries.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<Sessions>>,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SessionStore {
            sessions: Arc::new(RwLock::new(Sessions::default())),
            capacity: capacity.max(1),
        }
    }

    /// Store `session`, evicting the oldest sessions once the store is full.
    pub async fn insert(&self, session: Session) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;

        while sessions.by_id.len() >= self.capacity {
            let Some(oldest) = sessions.order.pop_front() else {
                break;
            };
            if sessions.by_id.remove(&oldest).is_some() {
                tracing::info!("Evicted session {} (store holds {})", oldest, self.capacity);
            }
        }

        sessions.by_id.insert(id, session);
        sessions.order.push_back(id);
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions.read().await.by_id.get(&id).cloned()
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let existed = sessions.by_id.remove(&id).is_some();
        if existed {
            sessions.order.retain(|queued| *queued != id);
        }
        existed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.by_id.len()
    }

    /// Record a new slider value and return the session as updated.
    pub async fn set_summary_percent(&self, id: Uuid, percent: u8) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.by_id.get_mut(&id)?;
        session.summary_percent = clamp_summary_percent(percent);
        Some(session.clone())
    }

    /// Record the selected chapter. Out-of-range indices leave the session untouched.
    pub async fn select_chapter(&self, id: Uuid, index: usize) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.by_id.get_mut(&id)?;
        if index < session.chapters.len() {
            session.selected_chapter = Some(index);
        }
        Some(session.clone())
    }
}
