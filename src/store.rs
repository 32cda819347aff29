use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The closed set of reaction kinds users can attach to an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    Important,
    Interesting,
    Shocking,
    Useful,
    Liked,
}

impl ReactionType {
    pub const ALL: [ReactionType; 5] = [
        ReactionType::Important,
        ReactionType::Interesting,
        ReactionType::Shocking,
        ReactionType::Useful,
        ReactionType::Liked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionType::Important => "important",
            ReactionType::Interesting => "interesting",
            ReactionType::Shocking => "shocking",
            ReactionType::Useful => "useful",
            ReactionType::Liked => "liked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == s)
    }
}

impl std::fmt::Display for ReactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user's reaction to one article.
///
/// `created_at` records the first time the user reacted to the article and
/// survives type changes; only deletion and re-creation resets it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reaction {
    pub id: i64,
    pub user_id: i64,
    pub article_id: String,
    pub reaction_type: ReactionType,
    pub created_at: DateTime<Utc>,
}

/// What a toggle call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Created,
    Updated,
    Deleted,
}

/// Result of a toggle: the action taken plus the live record, if one remains.
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    pub action: ToggleAction,
    pub reaction: Option<Reaction>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("reaction {0} not found")]
    NotFound(i64),

    #[error("reaction {0} belongs to another user")]
    Forbidden(i64),
}

/// The toggle state machine, kept separate from the index bookkeeping.
#[derive(Debug, PartialEq, Eq)]
enum ToggleDecision {
    Create,
    Delete,
    Update,
}

fn decide(existing: Option<ReactionType>, requested: ReactionType) -> ToggleDecision {
    match existing {
        None => ToggleDecision::Create,
        Some(kind) if kind == requested => ToggleDecision::Delete,
        Some(_) => ToggleDecision::Update,
    }
}

/// Authoritative records plus the two derived indexes, guarded as one unit.
#[derive(Default)]
struct Inner {
    /// Authoritative set, keyed by reaction id.
    records: HashMap<i64, Reaction>,
    /// article_id -> reaction ids, in insertion order.
    by_article: HashMap<String, Vec<i64>>,
    /// article_id -> user_id -> reaction id; enforces at-most-one per pair.
    by_article_user: HashMap<String, HashMap<i64, i64>>,
    next_id: i64,
}

impl Inner {
    /// Detach a reaction from both indexes. The record itself is removed by
    /// the caller.
    fn unlink(&mut self, article_id: &str, user_id: i64, reaction_id: i64) {
        if let Some(ids) = self.by_article.get_mut(article_id) {
            ids.retain(|id| *id != reaction_id);
            if ids.is_empty() {
                self.by_article.remove(article_id);
            }
        }
        if let Some(users) = self.by_article_user.get_mut(article_id) {
            users.remove(&user_id);
            if users.is_empty() {
                self.by_article_user.remove(article_id);
            }
        }
    }
}

/// In-memory reaction store.
///
/// Owns every live `Reaction` and keeps the by-article and by-(article,user)
/// indexes consistent with the record set. A single mutex covers all
/// operations, reads included, so no caller can observe the indexes and the
/// record set mid-update. Nothing under the lock performs I/O.
pub struct ReactionStore {
    max_page_size: usize,
    inner: Mutex<Inner>,
}

impl ReactionStore {
    pub fn new(max_page_size: usize) -> Self {
        Self {
            max_page_size,
            inner: Mutex::new(Inner {
                next_id: 1,
                ..Inner::default()
            }),
        }
    }

    /// Create, replace, or remove this user's reaction to the article.
    ///
    /// Three-way toggle keyed on the user's current reaction to the article:
    /// none -> create, same type -> delete, different type -> change the type
    /// in place (id and `created_at` unchanged). Validation failures leave
    /// the store untouched.
    pub fn toggle(
        &self,
        user_id: i64,
        article_id: &str,
        reaction_type: &str,
    ) -> Result<ToggleOutcome, StoreError> {
        let requested = ReactionType::parse(reaction_type).ok_or_else(|| {
            StoreError::InvalidArgument(format!("unknown reaction type: {reaction_type}"))
        })?;
        if user_id <= 0 {
            return Err(StoreError::InvalidArgument(
                "user_id must be positive".to_string(),
            ));
        }
        if article_id.is_empty() {
            return Err(StoreError::InvalidArgument(
                "article_id must not be empty".to_string(),
            ));
        }

        let mut inner = self.inner.lock();

        let existing_id = inner
            .by_article_user
            .get(article_id)
            .and_then(|users| users.get(&user_id))
            .copied();
        let existing_kind = existing_id.and_then(|id| {
            inner.records.get(&id).map(|record| record.reaction_type)
        });

        match decide(existing_kind, requested) {
            ToggleDecision::Create => {
                let id = inner.next_id;
                inner.next_id += 1;

                let record = Reaction {
                    id,
                    user_id,
                    article_id: article_id.to_owned(),
                    reaction_type: requested,
                    created_at: Utc::now(),
                };
                inner.records.insert(id, record.clone());
                inner
                    .by_article
                    .entry(article_id.to_owned())
                    .or_default()
                    .push(id);
                inner
                    .by_article_user
                    .entry(article_id.to_owned())
                    .or_default()
                    .insert(user_id, id);

                Ok(ToggleOutcome {
                    action: ToggleAction::Created,
                    reaction: Some(record),
                })
            }
            ToggleDecision::Delete => {
                let id = existing_id.expect("decision requires an existing reaction");
                inner.records.remove(&id);
                inner.unlink(article_id, user_id, id);

                Ok(ToggleOutcome {
                    action: ToggleAction::Deleted,
                    reaction: None,
                })
            }
            ToggleDecision::Update => {
                let id = existing_id.expect("decision requires an existing reaction");
                let record = inner
                    .records
                    .get_mut(&id)
                    .expect("index points at a live record");
                record.reaction_type = requested;
                let record = record.clone();

                Ok(ToggleOutcome {
                    action: ToggleAction::Updated,
                    reaction: Some(record),
                })
            }
        }
    }

    /// Remove a reaction by id. Only the owning user may remove it.
    pub fn remove_by_id(
        &self,
        reaction_id: i64,
        requesting_user_id: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();

        let (owner, article_id) = match inner.records.get(&reaction_id) {
            None => return Err(StoreError::NotFound(reaction_id)),
            Some(record) => (record.user_id, record.article_id.clone()),
        };
        if owner != requesting_user_id {
            return Err(StoreError::Forbidden(reaction_id));
        }

        inner.records.remove(&reaction_id);
        inner.unlink(&article_id, owner, reaction_id);
        Ok(())
    }

    /// Page through an article's reactions in insertion order.
    ///
    /// Pages are 1-based; `size` must be within `[1, max_page_size]`. Returns
    /// the requested slice plus the total number of live reactions for the
    /// article.
    pub fn list_by_article(
        &self,
        article_id: &str,
        page: usize,
        size: usize,
    ) -> Result<(Vec<Reaction>, usize), StoreError> {
        if page < 1 {
            return Err(StoreError::InvalidArgument(
                "page must be >= 1".to_string(),
            ));
        }
        if size < 1 || size > self.max_page_size {
            return Err(StoreError::InvalidArgument(format!(
                "size must be between 1 and {}",
                self.max_page_size
            )));
        }

        let inner = self.inner.lock();
        let ids = inner
            .by_article
            .get(article_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let total = ids.len();

        let start = (page - 1).saturating_mul(size);
        let items = ids
            .iter()
            .skip(start)
            .take(size)
            .filter_map(|id| inner.records.get(id).cloned())
            .collect();

        Ok((items, total))
    }

    /// Per-kind reaction counts for an article, plus the total across kinds.
    /// Kinds with no reactions are omitted.
    pub fn counts_by_article(&self, article_id: &str) -> (BTreeMap<ReactionType, u64>, u64) {
        let inner = self.inner.lock();

        let mut counts = BTreeMap::new();
        let mut total = 0;
        if let Some(ids) = inner.by_article.get(article_id) {
            for id in ids {
                if let Some(record) = inner.records.get(id) {
                    *counts.entry(record.reaction_type).or_insert(0) += 1;
                    total += 1;
                }
            }
        }
        (counts, total)
    }

    /// Batch lookup of one user's reactions across a set of articles.
    /// Articles the user has not reacted to are absent from the result.
    pub fn reactions_for_user(
        &self,
        user_id: i64,
        article_ids: &[String],
    ) -> HashMap<String, ReactionType> {
        let inner = self.inner.lock();

        let mut result = HashMap::new();
        for article_id in article_ids {
            let found = inner
                .by_article_user
                .get(article_id)
                .and_then(|users| users.get(&user_id))
                .and_then(|id| inner.records.get(id));
            if let Some(record) = found {
                result.insert(article_id.clone(), record.reaction_type);
            }
        }
        result
    }
}
