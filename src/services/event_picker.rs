//! Decides whether a bonus event interposes between two questions and which
//! one it is.
//!
//! The trigger is a biased coin, not a schedule: every advance past the
//! warmup window rolls independently. Selection avoids repeats through an
//! in-memory arena of consumed ids that lives exactly as long as this
//! picker; on exhaustion the arena is cleared and repeats become legal
//! again, which is deliberate policy rather than an accident.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;
use uuid::Uuid;

use crate::config::GameTuning;
use crate::dao::models::{EventKind, GameEventEntity};
use crate::state::catalog::EventCatalog;

/// Stateful event chooser for one client session.
#[derive(Debug, Clone)]
pub struct EventPicker {
    catalog: EventCatalog,
    tuning: GameTuning,
    used: HashSet<Uuid>,
}

impl EventPicker {
    /// Build a picker over the given catalog with the configured tuning.
    pub fn new(catalog: EventCatalog, tuning: GameTuning) -> Self {
        Self {
            catalog,
            tuning,
            used: HashSet::new(),
        }
    }

    /// Roll the trigger coin. Always false during the warmup window so an
    /// event is never the first thing a fresh game shows.
    pub fn should_trigger(&self, answered_questions: u32, rng: &mut impl Rng) -> bool {
        if answered_questions < self.tuning.event_warmup_questions {
            return false;
        }
        rng.random_bool(self.tuning.event_trigger_probability)
    }

    /// Choose an event eligible at the given level, avoiding recent repeats
    /// and biasing toward the under-represented `game` kind. Returns `None`
    /// when nothing is eligible even after clearing the used arena; the
    /// caller then proceeds straight to the next question.
    pub fn pick(
        &mut self,
        level: u32,
        forced_kind: Option<EventKind>,
        rng: &mut impl Rng,
    ) -> Option<GameEventEntity> {
        let mut eligible: Vec<&GameEventEntity> = self
            .catalog
            .all()
            .filter(|e| e.level <= level && !self.used.contains(&e.id))
            .collect();

        if let Some(kind) = forced_kind {
            let narrowed: Vec<&GameEventEntity> =
                eligible.iter().copied().filter(|e| e.kind == kind).collect();
            if !narrowed.is_empty() {
                eligible = narrowed;
            }
        } else {
            let games: Vec<&GameEventEntity> = eligible
                .iter()
                .copied()
                .filter(|e| e.kind == EventKind::Game)
                .collect();
            if !games.is_empty() && rng.random_bool(self.tuning.game_event_bias) {
                eligible = games;
            }
        }

        if eligible.is_empty() {
            self.reset_used();
            let mut retry: Vec<&GameEventEntity> =
                self.catalog.all().filter(|e| e.level <= level).collect();
            if let Some(kind) = forced_kind {
                let narrowed: Vec<&GameEventEntity> =
                    retry.iter().copied().filter(|e| e.kind == kind).collect();
                if !narrowed.is_empty() {
                    retry = narrowed;
                }
            }
            let chosen = retry.choose(rng).copied().cloned()?;
            self.used.insert(chosen.id);
            return Some(chosen);
        }

        let chosen = eligible.choose(rng).copied().cloned()?;
        self.used.insert(chosen.id);
        Some(chosen)
    }

    /// Forget every consumed id, making the whole catalog eligible again.
    /// Swapping this policy (e.g. persisting the arena) only touches this
    /// function.
    fn reset_used(&mut self) {
        self.used.clear();
    }
}
