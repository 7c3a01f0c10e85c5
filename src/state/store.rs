//! Durable collection of topic quizzes with their play statistics.

use std::{cmp::Ordering, fmt, sync::Arc};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    dao::{
        models::{QuizEntity, StoreDocument},
        quiz_repository::QuizRepository,
        storage::{StorageError, StorageResult},
    },
    state::quiz::{GeneratedQuiz, MAX_SCORE, QuizRecord, topic_key},
};

/// A stored quiz is replayed only while it has been played fewer times than this.
pub const REUSE_CAP: u32 = 10;
/// Minimum plays before a topic can appear on the leaderboard.
pub const LEADERBOARD_MIN_PLAYS: u32 = 5;
/// Topics answered correctly more often than this (in percent) are too easy to rank.
pub const LEADERBOARD_MAX_PERCENTAGE: f64 = 90.0;

/// Outcome of [`QuizStore::lookup_or_create`]: the quiz to play and where its result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizLookup {
    /// Content to play, either reused from the store or freshly generated.
    pub quiz: GeneratedQuiz,
    /// `false` when the topic was already stored, whether replayed or past the reuse cap.
    pub is_new_quiz: bool,
    /// Store slot of the record; for a brand-new topic, the slot it will be appended at.
    pub index: usize,
}

/// Read-only projection of a record for the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// Display topic.
    pub topic: String,
    /// Share of correct answers across all plays, in percent.
    pub correct_percentage: f64,
}

/// In-memory quiz store, written back in full after every mutation.
pub struct QuizStore {
    repository: Arc<dyn QuizRepository>,
    quizzes: IndexMap<String, QuizRecord>,
    dirty: bool,
}

impl fmt::Debug for QuizStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizStore")
            .field("quizzes", &self.quizzes.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl QuizStore {
    /// Load the store from `repository`; an absent document yields an empty store.
    pub async fn load(repository: Arc<dyn QuizRepository>) -> StorageResult<Self> {
        let quizzes = read_quizzes(repository.as_ref()).await?;
        info!(quizzes = quizzes.len(), "quiz store loaded");
        Ok(Self {
            repository,
            quizzes,
            dirty: false,
        })
    }

    /// Re-read the store from durable storage, flushing unsaved results first.
    pub async fn reload(&mut self) -> StorageResult<()> {
        if self.dirty {
            self.persist().await?;
        }
        self.quizzes = read_quizzes(self.repository.as_ref()).await?;
        debug!(quizzes = self.quizzes.len(), "quiz store reloaded");
        Ok(())
    }

    /// Number of stored topics.
    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    /// Whether the store holds no topic yet.
    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }

    /// Whether the in-memory state holds changes not yet written to storage.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Display topics in store order, as handed to the generator.
    pub fn known_topics(&self) -> Vec<String> {
        self.quizzes
            .values()
            .map(|record| record.topic().to_string())
            .collect()
    }

    /// Case-insensitive lookup of a stored record.
    pub fn get(&self, topic: &str) -> Option<&QuizRecord> {
        self.quizzes.get(&topic_key(topic))
    }

    /// Stored records in store order.
    pub fn records(&self) -> impl Iterator<Item = &QuizRecord> {
        self.quizzes.values()
    }

    /// Decide which quiz to play for `topic`.
    ///
    /// A stored record played fewer than [`REUSE_CAP`] times is replayed verbatim and the
    /// generated content is discarded. Otherwise the generated content is used and filed
    /// under `topic`; for a capped topic it will replace the stored record in place.
    /// `is_new_quiz` is set only when the topic was not stored before.
    pub fn lookup_or_create(&self, topic: &str, generated: GeneratedQuiz) -> QuizLookup {
        let key = topic_key(topic);
        match self.quizzes.get_full(&key) {
            Some((index, _, record)) if record.use_count < REUSE_CAP => {
                debug!(topic = %record.topic(), use_count = record.use_count, "reusing stored quiz");
                QuizLookup {
                    quiz: record.quiz.clone(),
                    is_new_quiz: false,
                    index,
                }
            }
            Some((index, _, record)) => {
                info!(topic = %record.topic(), use_count = record.use_count, "stored quiz reached reuse cap; using fresh content");
                QuizLookup {
                    quiz: GeneratedQuiz {
                        topic: topic.trim().to_string(),
                        ..generated
                    },
                    is_new_quiz: false,
                    index,
                }
            }
            None => QuizLookup {
                quiz: GeneratedQuiz {
                    topic: topic.trim().to_string(),
                    ..generated
                },
                is_new_quiz: true,
                index: self.quizzes.len(),
            },
        }
    }

    /// Fold a finished play into the store and write the store back.
    ///
    /// The in-memory state is updated even when the write fails; the store then stays
    /// dirty and [`QuizStore::persist`] can be retried without recording the play twice.
    pub async fn record_outcome(&mut self, lookup: &QuizLookup, score: u8) -> StorageResult<()> {
        let score = score.min(MAX_SCORE);
        let key = lookup.quiz.key();

        let replay = !lookup.is_new_quiz
            && self
                .quizzes
                .get(&key)
                .is_some_and(|record| record.use_count < REUSE_CAP);

        if let Some((index, _, record)) = self.quizzes.get_full_mut(&key).filter(|_| replay) {
            if index != lookup.index {
                warn!(expected = lookup.index, actual = index, topic = %record.topic(), "quiz moved since lookup");
            }
            record.push_play(score);
            info!(
                topic = %record.topic(),
                score,
                use_count = record.use_count,
                correct_percentage = record.correct_percentage,
                "play recorded on stored quiz"
            );
        } else {
            // Inserting an existing key keeps its slot, so a capped topic is replaced in place.
            let record = QuizRecord::first_play(lookup.quiz.clone(), score);
            info!(topic = %record.topic(), score, "fresh quiz stored");
            self.quizzes.insert(key, record);
        }

        self.dirty = true;
        self.persist().await
    }

    /// Write the whole store to durable storage.
    pub async fn persist(&mut self) -> StorageResult<()> {
        self.repository.save(self.document()).await?;
        self.dirty = false;
        Ok(())
    }

    /// Topics with at least [`LEADERBOARD_MIN_PLAYS`] plays and a correct share of at most
    /// [`LEADERBOARD_MAX_PERCENTAGE`], highest correct share first. Ties keep store order.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .quizzes
            .values()
            .filter(|record| {
                record.use_count >= LEADERBOARD_MIN_PLAYS
                    && record.correct_percentage <= LEADERBOARD_MAX_PERCENTAGE
            })
            .map(|record| LeaderboardEntry {
                topic: record.topic().to_string(),
                correct_percentage: record.correct_percentage,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.correct_percentage
                .partial_cmp(&a.correct_percentage)
                .unwrap_or(Ordering::Equal)
        });
        entries
    }

    fn document(&self) -> StoreDocument {
        StoreDocument {
            all_topics: self.known_topics(),
            all_quizzes: self.quizzes.values().cloned().map(QuizEntity::from).collect(),
        }
    }
}

async fn read_quizzes(
    repository: &dyn QuizRepository,
) -> StorageResult<IndexMap<String, QuizRecord>> {
    let Some(document) = repository.load().await? else {
        return Ok(IndexMap::new());
    };
    let StoreDocument {
        all_topics,
        all_quizzes,
    } = document;

    if all_topics.len() != all_quizzes.len() {
        return Err(StorageError::corrupt(format!(
            "{} topics listed for {} quizzes",
            all_topics.len(),
            all_quizzes.len()
        )));
    }

    let mut quizzes = IndexMap::with_capacity(all_quizzes.len());
    for (listed, entity) in all_topics.into_iter().zip(all_quizzes) {
        let key = topic_key(&entity.topic);
        if topic_key(&listed) != key {
            return Err(StorageError::corrupt(format!(
                "topic index entry `{listed}` does not match quiz `{}`",
                entity.topic
            )));
        }
        let record = QuizRecord::try_from(entity)?;
        if quizzes.insert(key, record).is_some() {
            return Err(StorageError::corrupt(format!(
                "topic `{listed}` is stored more than once"
            )));
        }
    }
    Ok(quizzes)
}
