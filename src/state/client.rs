//! One player's client: the orchestrator shell that wires the session
//! mirror, both ledgers, the event picker, and the flow machine together.
//!
//! Every decision is computed locally from replicated state; the partner's
//! client runs the identical logic against the same store and converges on
//! the same answers. Writes to the shared row are scoped per transition and
//! guarded so a race with the partner degrades to a no-op, never a
//! double-advance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rand::Rng;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::config::GameTuning;
use crate::dao::models::{GameEventEntity, RecordChange, RoomEntity, RoomPatch, RoomStatus};
use crate::dao::record_store::RecordStore;
use crate::error::ServiceError;
use crate::services::answer_ledger::AnswerLedger;
use crate::services::event_ledger::EventResponseLedger;
use crate::services::event_picker::EventPicker;
use crate::services::history_service::{self, HistoryEntry};
use crate::services::session_sync::SessionSync;
use crate::state::catalog::{EventCatalog, QuestionCatalog};
use crate::state::machine::FlowMachine;
use crate::state::screen::{GameView, Screen};

/// What the advance effect decided to do after the trigger roll.
enum AdvanceDecision {
    /// Interpose the event, performed by the named player when solo.
    Event(GameEventEntity, Option<String>),
    /// No event this turn; move straight to the next question.
    NextQuestion,
}

/// A per-player game client bound to one room.
pub struct GameClient {
    store: Arc<dyn RecordStore>,
    tuning: GameTuning,
    me: String,
    questions: QuestionCatalog,
    events: EventCatalog,
    session: SessionSync,
    answers: AnswerLedger,
    responses: EventResponseLedger,
    picker: Mutex<EventPicker>,
    machine: Mutex<FlowMachine>,
    screen: watch::Sender<Screen>,
    level_up_timer: AtomicBool,
}

impl GameClient {
    /// Bind a client to a room the player already belongs to, loading both
    /// catalogs from the store.
    pub async fn connect(
        store: Arc<dyn RecordStore>,
        tuning: GameTuning,
        room: RoomEntity,
        player_name: &str,
    ) -> Result<Self, ServiceError> {
        if !room.is_member(player_name) {
            return Err(ServiceError::InvalidInput(format!(
                "`{player_name}` is not a player of room {}",
                room.room_code
            )));
        }

        let questions = QuestionCatalog::load(store.as_ref()).await?;
        let events = EventCatalog::load(store.as_ref()).await?;
        let room_id = room.id;

        let (screen, _) = watch::channel(Screen::Waiting);
        Ok(Self {
            answers: AnswerLedger::new(store.clone(), room_id),
            responses: EventResponseLedger::new(store.clone(), room_id),
            session: SessionSync::new(store.clone(), room),
            picker: Mutex::new(EventPicker::new(events.clone(), tuning.clone())),
            machine: Mutex::new(FlowMachine::new(player_name)),
            me: player_name.to_string(),
            store,
            tuning,
            questions,
            events,
            screen,
            level_up_timer: AtomicBool::new(false),
        })
    }

    /// The local player's name.
    pub fn player_name(&self) -> &str {
        &self.me
    }

    /// Latest observed copy of the shared room row.
    pub fn room(&self) -> RoomEntity {
        self.session.current()
    }

    /// Currently displayed screen.
    pub fn screen(&self) -> Screen {
        self.screen.borrow().clone()
    }

    /// Subscribe to screen changes.
    pub fn watch_screen(&self) -> watch::Receiver<Screen> {
        self.screen.subscribe()
    }

    /// One deterministic synchronization pass: re-fetch everything, run the
    /// owner's init effect if it applies, and re-derive the screen.
    pub async fn refresh(&self) -> Result<Screen, ServiceError> {
        self.pull().await?;
        if self.maybe_start_game().await? {
            self.pull().await?;
        }
        Ok(self.recompute())
    }

    /// Record the local player's answer for the current question.
    pub async fn submit_answer(&self, answer: String) -> Result<Screen, ServiceError> {
        self.answers.submit(&self.me, Some(answer), false).await?;
        Ok(self.recompute())
    }

    /// Pass on the current question.
    pub async fn skip_question(&self) -> Result<Screen, ServiceError> {
        self.answers.submit(&self.me, None, true).await?;
        Ok(self.recompute())
    }

    /// Leave the reveal screen: roll the event trigger and either interpose
    /// a bonus event or advance the question pointer.
    ///
    /// A no-op unless both players have recorded an answer for the current
    /// question, which also defuses double-invocation: once the pointer has
    /// moved, the ledger rescopes and the guard fails.
    pub async fn advance_from_reveal(&self) -> Result<Screen, ServiceError> {
        if !(self.answers.has_answered(&self.me) && self.answers.partner_has_answered(&self.me)) {
            debug!("advance ignored: both answers are not recorded yet");
            return Ok(self.recompute());
        }

        let room = self.session.current();
        let answered = {
            let mut machine = self.machine_lock();
            machine.mark_advanced();
            machine.answered_questions()
        };

        let decision = self.decide_advance(&room, answered);
        match decision {
            AdvanceDecision::Event(event, performer) => {
                debug!(event = %event.id, ?performer, "bonus event interposed");
                self.session
                    .update(RoomPatch {
                        current_event_id: Some(Some(event.id)),
                        event_player_name: Some(performer),
                        ..RoomPatch::default()
                    })
                    .await?;
            }
            AdvanceDecision::NextQuestion => self.advance_question(&room).await?,
        }

        self.pull().await?;
        Ok(self.recompute())
    }

    /// Record or rewrite the local player's response to the active event.
    pub async fn submit_event_response(
        &self,
        response: Option<String>,
        completed: bool,
    ) -> Result<Screen, ServiceError> {
        let room = self.session.current();
        let Some(event_id) = room.current_event_id else {
            return Err(ServiceError::InvalidState("no event is active".into()));
        };
        self.responses
            .submit(event_id, &self.me, response, completed)
            .await?;
        Ok(self.recompute())
    }

    /// Acknowledge a finished event: clear the shared pointer and advance
    /// the question. Idempotent against the partner's own continue — when
    /// the pointer is already gone this only resets local event context, so
    /// a race can never advance past a question twice.
    pub async fn continue_after_event(&self) -> Result<Screen, ServiceError> {
        self.session.poll_once().await?;
        let room = self.session.current();

        if room.current_event_id.is_some() {
            self.session
                .update(RoomPatch {
                    current_event_id: Some(None),
                    event_player_name: Some(None),
                    ..RoomPatch::default()
                })
                .await?;
            self.advance_question(&room).await?;
        } else {
            debug!("continue ignored: event already cleared by the partner");
        }

        self.responses.rescope(None);
        self.pull().await?;
        Ok(self.recompute())
    }

    /// Open the history overlay.
    pub fn open_history(&self) -> Screen {
        self.machine_lock().open_history();
        self.publish()
    }

    /// Close the history overlay, returning to the interrupted screen.
    pub fn close_history(&self) -> Screen {
        self.machine_lock().close_history();
        self.publish()
    }

    /// Complete the tier-crossing interstitial.
    pub fn finish_level_up(&self) -> Screen {
        self.machine_lock().finish_level_up();
        self.recompute()
    }

    /// The answered-question journal for this room.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>, ServiceError> {
        let room = self.session.current();
        history_service::room_history(&self.store, &self.questions, &room).await
    }

    /// Run the background freshness loop: change-feed pushes and interval
    /// polls feed the same sinks, and the screen channel republishes on
    /// every observed difference. Poll failures are logged and swallowed so
    /// a single missed poll never flaps the UI.
    pub fn spawn_sync(self: &Arc<Self>) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut feed = match client.store.subscribe().await {
                Ok(feed) => feed,
                Err(err) => {
                    warn!(error = %err, "change feed unavailable; relying on polls only");
                    client.poll_forever().await;
                    return;
                }
            };

            let mut poll = tokio::time::interval(client.tuning.poll_interval());
            poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    change = feed.recv() => match change {
                        Ok(change) if change.room_id() == client.session.room_id() => {
                            client.absorb(change);
                            client.after_sync().await;
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "change feed lagged; polls will catch up");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = poll.tick() => {
                        if let Err(err) = client.pull().await {
                            debug!(error = %err, "background poll failed");
                        }
                        client.after_sync().await;
                    }
                }
            }
        })
    }

    /// Route one pushed change into the matching sink.
    fn absorb(&self, change: RecordChange) {
        self.session.apply_remote(&change);
        match change {
            RecordChange::Answer(row) => self.answers.apply(row),
            RecordChange::EventResponse(row) => self.responses.apply(row),
            RecordChange::Room(_) => {}
        }
        let room = self.session.current();
        self.answers.rescope(room.current_question_id);
        self.responses.rescope(room.current_event_id);
    }

    async fn after_sync(self: &Arc<Self>) {
        if let Err(err) = self.maybe_start_game().await {
            debug!(error = %err, "deferred game start failed");
        }
        let screen = self.recompute();
        self.arm_level_up_timer(&screen);
    }

    async fn poll_forever(self: &Arc<Self>) {
        let mut poll = tokio::time::interval(self.tuning.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            poll.tick().await;
            if let Err(err) = self.pull().await {
                debug!(error = %err, "background poll failed");
            }
            self.after_sync().await;
        }
    }

    /// Auto-complete the level-up interstitial after its fixed duration.
    fn arm_level_up_timer(self: &Arc<Self>, screen: &Screen) {
        if !matches!(screen, Screen::LevelUp { .. }) {
            return;
        }
        if self.level_up_timer.swap(true, Ordering::SeqCst) {
            return;
        }
        let client = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(client.tuning.level_up_duration()).await;
            client.finish_level_up();
            client.level_up_timer.store(false, Ordering::SeqCst);
        });
    }

    /// Re-fetch the room and both ledgers, rescoping to the latest pointers.
    async fn pull(&self) -> Result<(), ServiceError> {
        self.session.poll_once().await?;
        let room = self.session.current();
        self.answers.rescope(room.current_question_id);
        self.responses.rescope(room.current_event_id);
        self.answers.poll_once().await?;
        self.responses.poll_once().await?;
        Ok(())
    }

    /// The room owner publishes the first question once both players are
    /// connected. Both clients could race here after a reconnect shuffle;
    /// last writer wins and the next observation self-corrects.
    async fn maybe_start_game(&self) -> Result<bool, ServiceError> {
        let room = self.session.current();
        let am_owner = room.player1_name == self.me;
        if !(am_owner
            && room.status == RoomStatus::Waiting
            && room.both_connected()
            && room.current_question_id.is_none())
        {
            return Ok(false);
        }

        match self.questions.first() {
            Some(first) => {
                debug!(question = %first.id, "starting game at tier {}", first.level);
                self.session
                    .update(RoomPatch {
                        status: Some(RoomStatus::Playing),
                        current_level: Some(first.level),
                        current_question_id: Some(Some(first.id)),
                        ..RoomPatch::default()
                    })
                    .await?;
            }
            None => {
                warn!("question catalog is empty; finishing immediately");
                self.session
                    .update(RoomPatch {
                        status: Some(RoomStatus::Finished),
                        ..RoomPatch::default()
                    })
                    .await?;
            }
        }
        Ok(true)
    }

    /// Move the shared question pointer to the global successor, or finish
    /// the game when the catalog is exhausted.
    async fn advance_question(&self, room: &RoomEntity) -> Result<(), ServiceError> {
        let Some(current) = room.current_question_id else {
            return Ok(());
        };
        match self.questions.next_after(current) {
            Some(next) => {
                self.session
                    .update(RoomPatch {
                        current_question_id: Some(Some(next.id)),
                        current_level: Some(next.level),
                        ..RoomPatch::default()
                    })
                    .await
            }
            None => {
                self.session
                    .update(RoomPatch {
                        status: Some(RoomStatus::Finished),
                        ..RoomPatch::default()
                    })
                    .await
            }
        }
    }

    /// Roll the trigger and pick an event plus performer. All randomness
    /// happens here, synchronously, so the decision is made in one place.
    fn decide_advance(&self, room: &RoomEntity, answered: u32) -> AdvanceDecision {
        let mut rng = rand::rng();
        let mut picker = self.picker.lock().unwrap_or_else(PoisonError::into_inner);

        if !picker.should_trigger(answered, &mut rng) {
            return AdvanceDecision::NextQuestion;
        }

        let level = room.current_level.unwrap_or(1);
        match picker.pick(level, None, &mut rng) {
            Some(event) => {
                let performer = if event.requires_both {
                    None
                } else {
                    let partner = room
                        .partner_name(&self.me)
                        .unwrap_or(&room.player1_name)
                        .to_string();
                    let seats = [self.me.clone(), partner];
                    Some(seats[rng.random_range(0..seats.len())].clone())
                };
                AdvanceDecision::Event(event, performer)
            }
            None => AdvanceDecision::NextQuestion,
        }
    }

    /// Re-derive and publish the screen from the cached state.
    fn recompute(&self) -> Screen {
        let room = self.session.current();
        let answers = self.answers.rows();
        let responses = self.responses.rows();
        let view = GameView {
            room: &room,
            me: &self.me,
            answers: &answers,
            responses: &responses,
            questions: &self.questions,
            events: &self.events,
        };
        self.machine_lock().observe(&view);
        self.publish()
    }

    fn publish(&self) -> Screen {
        let screen = self.machine_lock().screen().clone();
        self.screen.send_if_modified(|current| {
            if *current == screen {
                false
            } else {
                *current = screen.clone();
                true
            }
        });
        screen
    }

    fn machine_lock(&self) -> std::sync::MutexGuard<'_, FlowMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
