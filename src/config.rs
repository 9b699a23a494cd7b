//! Application configuration: gameplay tuning constants and the question /
//! event catalog seed, both loaded from JSON files with baked-in defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dao::models::{EventKind, GameEventEntity, QuestionEntity};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DUET_BACK_CONFIG_PATH";
/// Default location of the catalog seed file.
const DEFAULT_CATALOG_PATH: &str = "config/catalog.json";
/// Environment variable that overrides [`DEFAULT_CATALOG_PATH`].
const CATALOG_PATH_ENV: &str = "DUET_BACK_CATALOG_PATH";

/// Gameplay tuning constants. The trigger probability and game-kind bias
/// have no derivation; they are product decisions kept tunable on purpose.
#[derive(Debug, Clone, PartialEq)]
pub struct GameTuning {
    /// Chance that a bonus event interposes after an advancing question.
    pub event_trigger_probability: f64,
    /// Chance of narrowing the candidate pool to `game`-kind events when
    /// any are available, counteracting their scarcity in the catalog.
    pub game_event_bias: f64,
    /// Number of answered questions before events may fire at all.
    pub event_warmup_questions: u32,
    /// Background ledger/room poll cadence, in seconds.
    pub poll_interval_secs: u64,
    /// Duration of the non-skippable tier-crossing interstitial.
    pub level_up_duration_ms: u64,
}

impl GameTuning {
    /// Poll cadence as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Interstitial duration as a [`Duration`].
    pub fn level_up_duration(&self) -> Duration {
        Duration::from_millis(self.level_up_duration_ms)
    }
}

impl Default for GameTuning {
    fn default() -> Self {
        Self {
            event_trigger_probability: 0.40,
            game_event_bias: 0.50,
            event_warmup_questions: 2,
            poll_interval_secs: 5,
            level_up_duration_ms: 2_500,
        }
    }
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    tuning: GameTuning,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to defaults when the
    /// file is absent or unreadable.
    pub fn load() -> Self {
        let path = resolve_path(CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH);
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found; using built-in defaults");
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Gameplay tuning constants.
    pub fn tuning(&self) -> &GameTuning {
        &self.tuning
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    #[serde(default)]
    tuning: RawTuning,
}

#[derive(Debug, Default, Deserialize)]
struct RawTuning {
    event_trigger_probability: Option<f64>,
    game_event_bias: Option<f64>,
    event_warmup_questions: Option<u32>,
    poll_interval_secs: Option<u64>,
    level_up_duration_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = GameTuning::default();
        let tuning = GameTuning {
            event_trigger_probability: clamp_probability(
                raw.tuning
                    .event_trigger_probability
                    .unwrap_or(defaults.event_trigger_probability),
            ),
            game_event_bias: clamp_probability(
                raw.tuning.game_event_bias.unwrap_or(defaults.game_event_bias),
            ),
            event_warmup_questions: raw
                .tuning
                .event_warmup_questions
                .unwrap_or(defaults.event_warmup_questions),
            poll_interval_secs: raw
                .tuning
                .poll_interval_secs
                .unwrap_or(defaults.poll_interval_secs)
                .max(1),
            level_up_duration_ms: raw
                .tuning
                .level_up_duration_ms
                .unwrap_or(defaults.level_up_duration_ms),
        };
        Self { tuning }
    }
}

fn clamp_probability(value: f64) -> f64 {
    if !(0.0..=1.0).contains(&value) {
        warn!(value, "probability outside [0, 1]; clamping");
    }
    value.clamp(0.0, 1.0)
}

/// Load the catalog seed from disk, falling back to the built-in set.
pub fn load_catalog_seed() -> (Vec<QuestionEntity>, Vec<GameEventEntity>) {
    let path = resolve_path(CATALOG_PATH_ENV, DEFAULT_CATALOG_PATH);
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<RawCatalog>(&contents) {
            Ok(raw) => {
                info!(
                    path = %path.display(),
                    questions = raw.questions.len(),
                    events = raw.events.len(),
                    "loaded catalog seed"
                );
                raw.into_entities()
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to parse catalog seed; using built-in set");
                default_catalog().into_entities()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "catalog seed not found; using built-in set");
            default_catalog().into_entities()
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read catalog seed; using built-in set");
            default_catalog().into_entities()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    questions: Vec<RawQuestion>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    text: String,
    level: u32,
    sort_order: u32,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    kind: EventKind,
    title: String,
    description: String,
    level: u32,
    requires_both: bool,
    #[serde(default)]
    is_private: bool,
    sort_order: u32,
}

impl RawCatalog {
    fn into_entities(self) -> (Vec<QuestionEntity>, Vec<GameEventEntity>) {
        let questions = self
            .questions
            .into_iter()
            .map(|q| QuestionEntity {
                id: Uuid::new_v4(),
                text: q.text,
                level: q.level,
                sort_order: q.sort_order,
                suggestions: q.suggestions,
            })
            .collect();
        let events = self
            .events
            .into_iter()
            .map(|e| GameEventEntity {
                id: Uuid::new_v4(),
                kind: e.kind,
                title: e.title,
                description: e.description,
                level: e.level,
                requires_both: e.requires_both,
                is_private: e.is_private,
                sort_order: e.sort_order,
            })
            .collect();
        (questions, events)
    }
}

/// Resolve a configuration path taking the environment override into account.
fn resolve_path(env_var: &str, default: &str) -> PathBuf {
    env::var_os(env_var)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Built-in catalog shipped with the binary: three tiers of questions and a
/// spread of event kinds, enough to play through without a seed file.
fn default_catalog() -> RawCatalog {
    let question = |text: &str, level: u32, sort_order: u32, suggestions: &[&str]| RawQuestion {
        text: text.into(),
        level,
        sort_order,
        suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
    };
    let event = |kind: EventKind,
                 title: &str,
                 description: &str,
                 level: u32,
                 requires_both: bool,
                 is_private: bool,
                 sort_order: u32| RawEvent {
        kind,
        title: title.into(),
        description: description.into(),
        level,
        requires_both,
        is_private,
        sort_order,
    };

    RawCatalog {
        questions: vec![
            question(
                "What made you smile for no good reason this week?",
                1,
                1,
                &["A message", "A memory", "Something silly"],
            ),
            question(
                "Which tiny habit of mine do you secretly find funny?",
                1,
                2,
                &[],
            ),
            question("What would your perfect lazy Sunday look like?", 1, 3, &[
                "Breakfast in bed",
                "A long walk",
                "Doing absolutely nothing",
            ]),
            question("What song always makes you think of us?", 1, 4, &[]),
            question(
                "What is something you admire about me that you rarely say out loud?",
                2,
                1,
                &[],
            ),
            question(
                "Which moment together would you relive exactly as it was?",
                2,
                2,
                &[],
            ),
            question("What do you wish we argued about less?", 2, 3, &[]),
            question(
                "When did you last feel truly proud of the two of us?",
                2,
                4,
                &[],
            ),
            question(
                "What is a dream you have never dared to tell me?",
                3,
                1,
                &[],
            ),
            question("What scares you most about the future, honestly?", 3, 2, &[]),
            question(
                "If we could restart one chapter of our story, which one would you rewrite?",
                3,
                3,
                &[],
            ),
            question(
                "What do you need more of from me, starting tonight?",
                3,
                4,
                &[],
            ),
        ],
        events: vec![
            event(
                EventKind::Message,
                "Whisper something",
                "Write your partner one sentence you have never sent them.",
                1,
                false,
                true,
                1,
            ),
            event(
                EventKind::Game,
                "Rock, paper, scissors",
                "Best of one. Loser fetches the next round of drinks.",
                1,
                true,
                false,
                2,
            ),
            event(
                EventKind::Photo,
                "Show your view",
                "Take a photo of whatever is in front of you and show it.",
                1,
                false,
                false,
                3,
            ),
            event(
                EventKind::Sync,
                "Same wavelength",
                "On the count of three, both name a place you want to travel to.",
                1,
                true,
                false,
                4,
            ),
            event(
                EventKind::Promise,
                "A small promise",
                "Promise one concrete thing for the coming week.",
                2,
                false,
                false,
                1,
            ),
            event(
                EventKind::Game,
                "Rematch",
                "Rock, paper, scissors again. Winner picks the next movie.",
                2,
                true,
                false,
                2,
            ),
            event(
                EventKind::Confession,
                "Small confession",
                "Admit one harmless thing you never mentioned.",
                2,
                false,
                false,
                3,
            ),
            event(
                EventKind::Sync,
                "Answer together",
                "Both write the first word that describes this evening.",
                3,
                true,
                false,
                1,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tuning_is_sane() {
        let tuning = GameTuning::default();
        assert!((0.0..=1.0).contains(&tuning.event_trigger_probability));
        assert!((0.0..=1.0).contains(&tuning.game_event_bias));
        assert!(tuning.event_warmup_questions >= 1);
        assert!(tuning.poll_interval_secs >= 1);
    }

    #[test]
    fn raw_config_overrides_merge_with_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"tuning": {"event_trigger_probability": 0.9}}"#)
                .expect("parse");
        let config: AppConfig = raw.into();
        assert_eq!(config.tuning().event_trigger_probability, 0.9);
        // Untouched fields keep their defaults.
        assert_eq!(
            config.tuning().game_event_bias,
            GameTuning::default().game_event_bias
        );
    }

    #[test]
    fn out_of_range_probability_is_clamped() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"tuning": {"event_trigger_probability": 1.7}}"#)
                .expect("parse");
        let config: AppConfig = raw.into();
        assert_eq!(config.tuning().event_trigger_probability, 1.0);
    }

    #[test]
    fn built_in_catalog_spans_every_tier_and_has_game_events() {
        let (questions, events) = default_catalog().into_entities();
        for level in 1..=3 {
            assert!(questions.iter().any(|q| q.level == level));
        }
        assert!(events.iter().any(|e| e.kind == EventKind::Game));
        assert!(events.iter().any(|e| !e.requires_both && e.is_private));
    }

    #[test]
    fn catalog_seed_round_trips_through_json() {
        let json = r#"{
            "questions": [
                {"text": "One?", "level": 1, "sort_order": 1},
                {"text": "Two?", "level": 2, "sort_order": 1, "suggestions": ["a"]}
            ],
            "events": [
                {"kind": "game", "title": "RPS", "description": "play", "level": 1,
                 "requires_both": true, "sort_order": 1}
            ]
        }"#;
        let raw: RawCatalog = serde_json::from_str(json).expect("parse");
        let (questions, events) = raw.into_entities();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].suggestions, vec!["a".to_string()]);
        assert_eq!(events[0].kind, EventKind::Game);
        assert!(!events[0].is_private);
    }
}
