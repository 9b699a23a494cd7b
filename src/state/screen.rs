//! The screen set and the pure derivation that maps replicated state onto
//! it.
//!
//! Every client computes its screen redundantly from the same inputs: the
//! shared room row, its own player name, and the ledger rows for the current
//! question/event. There is no arbiter; convergence comes from both clients
//! running [`derive_screen`] over the same replicated data.

use tracing::warn;
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, EventResponseEntity, GameEventEntity, QuestionEntity, RoomEntity, RoomStatus,
};
use crate::state::catalog::{EventCatalog, QuestionCatalog};

/// How the local player participates in the active event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRole {
    /// Both players act.
    Joint,
    /// The local player is the solo performer.
    SoloPerformer,
}

/// An active event from the local player's perspective.
#[derive(Debug, Clone, PartialEq)]
pub struct EventCard {
    /// The event definition being played.
    pub event: GameEventEntity,
    /// The local player's part in it.
    pub role: EventRole,
}

/// One player's entry in a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerCard {
    /// Player the entry belongs to.
    pub player_name: String,
    /// Submitted text; `None` when the player passed.
    pub answer: Option<String>,
    /// Whether the player passed.
    pub skipped: bool,
}

/// Immutable payload rendered by the reveal screen. Captured once when both
/// answers are in; a later question advance cannot retroactively change what
/// was displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSnapshot {
    /// Question the snapshot belongs to.
    pub question_id: Uuid,
    /// Question text at capture time.
    pub question: String,
    /// The local player's entry.
    pub mine: AnswerCard,
    /// The partner's entry.
    pub partner: AnswerCard,
}

/// Payload for the joint-event reveal.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRevealSnapshot {
    /// The event definition that was played.
    pub event: GameEventEntity,
    /// The local player's response text.
    pub mine: Option<String>,
    /// The partner's response text.
    pub partner: Option<String>,
}

/// An event performed by the partner, from the observer's seat.
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerEventCard {
    /// The event definition being performed.
    pub event: GameEventEntity,
    /// Who is performing it.
    pub performer: String,
}

/// Payload shown to the observer once a solo performer finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerEventNotice {
    /// The event definition that was performed.
    pub event: GameEventEntity,
    /// Who performed it.
    pub performer: String,
    /// The performer's response; withheld for private events.
    pub response: Option<String>,
}

/// Everything a client can be displaying.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    /// Room exists but play has not started (partner missing or question
    /// pointer unset).
    Waiting,
    /// The current question, awaiting the local player's answer.
    Question(QuestionEntity),
    /// Local player answered; the partner has not.
    WaitingPartner,
    /// Both answers are in.
    Reveal(RevealSnapshot),
    /// Non-interactive tier-crossing interstitial.
    LevelUp {
        /// Tier being left.
        from: u32,
        /// Tier being entered.
        to: u32,
    },
    /// The local player acts in the active event.
    Event(EventCard),
    /// The local player finished their part; the other side has not.
    EventWaiting(EventCard),
    /// Joint event, both responses in.
    EventReveal(EventRevealSnapshot),
    /// Solo event performed by the partner, still in progress.
    PartnerEventWaiting(PartnerEventCard),
    /// Solo event finished by the partner.
    PartnerEventNotification(PartnerEventNotice),
    /// History overlay; the interrupted screen is remembered by the machine.
    History,
    /// Question catalog exhausted.
    End,
}

/// The replicated inputs a derivation runs over.
#[derive(Debug, Clone, Copy)]
pub struct GameView<'a> {
    /// Latest observed copy of the shared room row.
    pub room: &'a RoomEntity,
    /// The local player's name.
    pub me: &'a str,
    /// Answer rows for the room's current question.
    pub answers: &'a [AnswerEntity],
    /// Response rows for the room's current event.
    pub responses: &'a [EventResponseEntity],
    /// Question catalog.
    pub questions: &'a QuestionCatalog,
    /// Event catalog.
    pub events: &'a EventCatalog,
}

/// Compute the screen implied by the replicated state. Pure and total: the
/// same view always yields the same screen, on any client. Local-only
/// adornments (`LevelUp`, `History`) are layered on by the flow machine.
pub fn derive_screen(view: &GameView) -> Screen {
    let room = view.room;

    if room.status == RoomStatus::Finished {
        return Screen::End;
    }

    if let Some(event_id) = room.current_event_id {
        match view.events.get(event_id) {
            Some(event) => {
                if let Some(screen) = derive_event_screen(view, event.clone()) {
                    return screen;
                }
            }
            None => {
                warn!(event = %event_id, "active event missing from catalog; ignoring pointer");
            }
        }
    }

    if room.player2_name.is_none() || !room.both_connected() {
        return Screen::Waiting;
    }

    let Some(question_id) = room.current_question_id else {
        return Screen::Waiting;
    };
    let Some(question) = view.questions.get(question_id) else {
        warn!(question = %question_id, "current question missing from catalog");
        return Screen::Waiting;
    };

    let mine = view.answers.iter().find(|a| a.player_name == view.me);
    let partner = view.answers.iter().find(|a| a.player_name != view.me);

    match (mine, partner) {
        (Some(mine), Some(partner)) => Screen::Reveal(RevealSnapshot {
            question_id,
            question: question.text.clone(),
            mine: answer_card(mine),
            partner: answer_card(partner),
        }),
        (Some(_), None) => Screen::WaitingPartner,
        _ => Screen::Question(question.clone()),
    }
}

/// Classify the local player against the active event. Returns `None` for a
/// malformed row (solo event without a performer) so the caller falls back
/// to the question flow instead of dead-ending.
fn derive_event_screen(view: &GameView, event: GameEventEntity) -> Option<Screen> {
    let mine = view
        .responses
        .iter()
        .find(|r| r.player_name == view.me);

    if event.requires_both {
        let partner = view
            .responses
            .iter()
            .find(|r| r.player_name != view.me);
        let card = EventCard {
            event: event.clone(),
            role: EventRole::Joint,
        };
        return Some(match (completed(mine), partner.filter(|r| r.completed)) {
            (true, Some(partner)) => Screen::EventReveal(EventRevealSnapshot {
                event,
                mine: mine.and_then(|r| r.response.clone()),
                partner: partner.response.clone(),
            }),
            (true, None) => Screen::EventWaiting(card),
            _ => Screen::Event(card),
        });
    }

    let Some(performer) = view.room.event_player_name.as_deref() else {
        warn!(event = %event.id, "solo event without a performer; ignoring pointer");
        return None;
    };

    if performer == view.me {
        let card = EventCard {
            event,
            role: EventRole::SoloPerformer,
        };
        Some(if completed(mine) {
            Screen::EventWaiting(card)
        } else {
            Screen::Event(card)
        })
    } else {
        let performed = view
            .responses
            .iter()
            .find(|r| r.player_name == performer && r.completed);
        Some(match performed {
            Some(row) => Screen::PartnerEventNotification(PartnerEventNotice {
                response: (!event.is_private).then(|| row.response.clone()).flatten(),
                event,
                performer: performer.to_string(),
            }),
            None => Screen::PartnerEventWaiting(PartnerEventCard {
                event,
                performer: performer.to_string(),
            }),
        })
    }
}

fn completed(row: Option<&EventResponseEntity>) -> bool {
    row.is_some_and(|r| r.completed)
}

fn answer_card(row: &AnswerEntity) -> AnswerCard {
    AnswerCard {
        player_name: row.player_name.clone(),
        answer: row.answer.clone(),
        skipped: row.skipped,
    }
}
