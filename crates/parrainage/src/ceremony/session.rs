//! Tick-driven state machine sequencing one draw round.
//!
//! The host calls [`DrawSession::tick`] once per animation interval. The
//! session owns the pre-selected winners and the shuffle display but never
//! writes to the roster: when the handshake finishes it reports
//! [`SessionStep::CommitDue`] and waits for the owner to run the commit and
//! hand the result back through [`DrawSession::complete_commit`].

use rand::Rng;
use serde::Serialize;
use std::time::Duration;

use super::domain::{Match, PairingRule, Person, Role};
use super::engine::{CommitError, DrawnPair, MatchEngine};
use super::rules::PairingPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawPhase {
    Idle,
    Countdown,
    RevealingMentee,
    TransitionPause,
    RevealingMentor,
    Reveal,
    Handshake,
    Finished,
}

impl DrawPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Countdown => "Countdown",
            Self::RevealingMentee => "Revealing mentee",
            Self::TransitionPause => "Transition",
            Self::RevealingMentor => "Revealing mentor",
            Self::Reveal => "Reveal",
            Self::Handshake => "Handshake",
            Self::Finished => "Finished",
        }
    }

    /// A round is in flight; starting another one is refused.
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle | Self::Finished)
    }
}

/// Phase lengths, counted in ticks of [`SessionTimings::tick_interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub tick_interval: Duration,
    pub countdown_from: u8,
    pub ticks_per_count: u32,
    pub mentee_shuffles: u32,
    pub mentee_hold_ticks: u32,
    pub transition_ticks: u32,
    pub mentor_shuffles: u32,
    pub mentor_hold_ticks: u32,
    pub reveal_ticks: u32,
    pub handshake_ticks: u32,
}

impl SessionTimings {
    /// Stage pacing: 5 s countdown, 3 s and 5 s shuffles at 100 ms a frame.
    pub const fn ceremony() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            countdown_from: 5,
            ticks_per_count: 10,
            mentee_shuffles: 30,
            mentee_hold_ticks: 15,
            transition_ticks: 30,
            mentor_shuffles: 50,
            mentor_hold_ticks: 10,
            reveal_ticks: 15,
            handshake_ticks: 25,
        }
    }

    /// Same phase structure with every pause cut to a single tick.
    pub const fn rehearsal() -> Self {
        Self {
            tick_interval: Duration::from_millis(10),
            countdown_from: 1,
            ticks_per_count: 1,
            mentee_shuffles: 3,
            mentee_hold_ticks: 1,
            transition_ticks: 1,
            mentor_shuffles: 3,
            mentor_hold_ticks: 1,
            reveal_ticks: 1,
            handshake_ticks: 1,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self::ceremony()
    }
}

/// What a single tick changed, for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStep {
    /// No round in flight.
    Idle,
    /// Time passed without a visible change.
    Waiting,
    CountdownChanged(u8),
    Shuffled { role: Role, candidate: Person },
    Locked { role: Role, winner: Person },
    PhaseChanged(DrawPhase),
    /// The handshake is over; the owner must commit this pair now.
    CommitDue(DrawnPair),
    Committed(Match),
    Aborted(CommitError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started { rule: PairingRule },
    /// No rule has candidates on both sides.
    CeremonyComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a draw is already running ({})", .0.label())]
    RoundInProgress(DrawPhase),
    #[error("the previous round has not finished ({})", .0.label())]
    NotFinished(DrawPhase),
    #[error("no commit is pending")]
    NoCommitPending,
}

#[derive(Debug, Clone)]
struct Reel {
    pool: Vec<Person>,
    winner: Person,
    spins_left: u32,
    hold_ticks: u32,
    held: u32,
    locked: bool,
    displayed: Option<Person>,
}

enum ReelStep {
    Shuffled(Person),
    Locked(Person),
    Holding,
    Done,
}

impl Reel {
    fn new(pool: Vec<Person>, winner: Person, spins: u32, hold_ticks: u32) -> Self {
        Self {
            pool,
            winner,
            spins_left: spins,
            hold_ticks,
            held: 0,
            locked: false,
            displayed: None,
        }
    }

    fn advance<R: Rng>(&mut self, engine: &mut MatchEngine<R>) -> ReelStep {
        if self.spins_left > 0 {
            self.spins_left -= 1;
            let candidate = self.next_candidate(engine);
            self.displayed = Some(candidate.clone());
            return ReelStep::Shuffled(candidate);
        }

        if !self.locked {
            self.locked = true;
            self.displayed = Some(self.winner.clone());
            return ReelStep::Locked(self.winner.clone());
        }

        self.held += 1;
        if self.held >= self.hold_ticks {
            ReelStep::Done
        } else {
            ReelStep::Holding
        }
    }

    /// Resamples until the pick differs from what is on screen, unless the
    /// pool has a single candidate.
    fn next_candidate<R: Rng>(&self, engine: &mut MatchEngine<R>) -> Person {
        let previous = self.displayed.as_ref().map(|person| &person.id);
        loop {
            let candidate = engine
                .pick_index(self.pool.len())
                .and_then(|index| self.pool.get(index))
                .unwrap_or(&self.winner);
            if self.pool.len() <= 1 || Some(&candidate.id) != previous {
                return candidate.clone();
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DrawSession {
    timings: SessionTimings,
    phase: DrawPhase,
    countdown: u8,
    elapsed: u32,
    plan: Option<PairingPlan>,
    winners: Option<DrawnPair>,
    mentee_reel: Option<Reel>,
    mentor_reel: Option<Reel>,
    commit_pending: bool,
    last_match: Option<Match>,
    last_error: Option<CommitError>,
}

impl Default for DrawSession {
    fn default() -> Self {
        Self::new(SessionTimings::default())
    }
}

impl DrawSession {
    pub fn new(timings: SessionTimings) -> Self {
        Self {
            timings,
            phase: DrawPhase::Idle,
            countdown: timings.countdown_from,
            elapsed: 0,
            plan: None,
            winners: None,
            mentee_reel: None,
            mentor_reel: None,
            commit_pending: false,
            last_match: None,
            last_error: None,
        }
    }

    pub fn timings(&self) -> &SessionTimings {
        &self.timings
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    pub fn countdown(&self) -> u8 {
        self.countdown
    }

    pub fn plan(&self) -> Option<&PairingPlan> {
        self.plan.as_ref()
    }

    pub fn displayed_mentee(&self) -> Option<&Person> {
        self.mentee_reel.as_ref().and_then(|reel| reel.displayed.as_ref())
    }

    pub fn displayed_mentor(&self) -> Option<&Person> {
        self.mentor_reel.as_ref().and_then(|reel| reel.displayed.as_ref())
    }

    pub fn last_match(&self) -> Option<&Match> {
        self.last_match.as_ref()
    }

    pub fn last_error(&self) -> Option<&CommitError> {
        self.last_error.as_ref()
    }

    /// Enters the countdown for `plan`. Refused while a round is running;
    /// with no plan the session stays where it is.
    pub fn start(&mut self, plan: Option<PairingPlan>) -> Result<StartOutcome, SessionError> {
        if self.phase.is_active() {
            return Err(SessionError::RoundInProgress(self.phase));
        }

        let Some(plan) = plan else {
            return Ok(StartOutcome::CeremonyComplete);
        };

        let rule = plan.rule;
        self.clear_round();
        self.plan = Some(plan);
        self.phase = DrawPhase::Countdown;
        Ok(StartOutcome::Started { rule })
    }

    /// Drops the round in flight, including a draw that was never committed.
    pub fn reset(&mut self) {
        self.clear_round();
        self.last_match = None;
        self.last_error = None;
        self.phase = DrawPhase::Idle;
    }

    pub fn tick<R: Rng>(&mut self, engine: &mut MatchEngine<R>) -> SessionStep {
        match self.phase {
            DrawPhase::Idle | DrawPhase::Finished => SessionStep::Idle,
            DrawPhase::Countdown => self.tick_countdown(engine),
            DrawPhase::RevealingMentee => self.tick_reel(Role::Mentee, engine),
            DrawPhase::TransitionPause => {
                if self.wait(self.timings.transition_ticks) {
                    self.enter_mentor_reveal()
                } else {
                    SessionStep::Waiting
                }
            }
            DrawPhase::RevealingMentor => self.tick_reel(Role::Mentor, engine),
            DrawPhase::Reveal => {
                if self.wait(self.timings.reveal_ticks) {
                    self.enter(DrawPhase::Handshake)
                } else {
                    SessionStep::Waiting
                }
            }
            DrawPhase::Handshake => self.tick_handshake(),
        }
    }

    /// Feeds back the outcome of the commit requested by `CommitDue`.
    /// Success finishes the round; failure discards it and returns to idle.
    pub fn complete_commit(
        &mut self,
        result: Result<Match, CommitError>,
    ) -> Result<SessionStep, SessionError> {
        if self.phase != DrawPhase::Handshake || !self.commit_pending {
            return Err(SessionError::NoCommitPending);
        }
        self.commit_pending = false;

        match result {
            Ok(entry) => {
                self.phase = DrawPhase::Finished;
                self.last_match = Some(entry.clone());
                self.last_error = None;
                Ok(SessionStep::Committed(entry))
            }
            Err(error) => {
                self.clear_round();
                self.phase = DrawPhase::Idle;
                self.last_error = Some(error.clone());
                Ok(SessionStep::Aborted(error))
            }
        }
    }

    fn tick_countdown<R: Rng>(&mut self, engine: &mut MatchEngine<R>) -> SessionStep {
        if self.countdown == 0 {
            return self.enter_mentee_reveal(engine);
        }

        if self.wait(self.timings.ticks_per_count) {
            self.countdown -= 1;
            SessionStep::CountdownChanged(self.countdown)
        } else {
            SessionStep::Waiting
        }
    }

    fn enter_mentee_reveal<R: Rng>(&mut self, engine: &mut MatchEngine<R>) -> SessionStep {
        let Some(plan) = self.plan.as_ref() else {
            self.reset();
            return SessionStep::Idle;
        };
        let Some(winners) = engine.draw_winners(plan) else {
            self.reset();
            return SessionStep::Idle;
        };

        self.mentee_reel = Some(Reel::new(
            plan.source_available.clone(),
            winners.mentee.clone(),
            self.timings.mentee_shuffles,
            self.timings.mentee_hold_ticks,
        ));
        self.winners = Some(winners);
        self.enter(DrawPhase::RevealingMentee)
    }

    fn enter_mentor_reveal(&mut self) -> SessionStep {
        let (Some(plan), Some(winners)) = (self.plan.as_ref(), self.winners.as_ref()) else {
            self.reset();
            return SessionStep::Idle;
        };

        self.mentor_reel = Some(Reel::new(
            plan.target_available.clone(),
            winners.mentor.clone(),
            self.timings.mentor_shuffles,
            self.timings.mentor_hold_ticks,
        ));
        self.enter(DrawPhase::RevealingMentor)
    }

    fn tick_reel<R: Rng>(&mut self, role: Role, engine: &mut MatchEngine<R>) -> SessionStep {
        let reel = match role {
            Role::Mentee => self.mentee_reel.as_mut(),
            Role::Mentor => self.mentor_reel.as_mut(),
        };
        let Some(reel) = reel else {
            self.reset();
            return SessionStep::Idle;
        };

        match reel.advance(engine) {
            ReelStep::Shuffled(candidate) => SessionStep::Shuffled { role, candidate },
            ReelStep::Locked(winner) => SessionStep::Locked { role, winner },
            ReelStep::Holding => SessionStep::Waiting,
            ReelStep::Done => match role {
                Role::Mentee => self.enter(DrawPhase::TransitionPause),
                Role::Mentor => self.enter(DrawPhase::Reveal),
            },
        }
    }

    fn tick_handshake(&mut self) -> SessionStep {
        if self.commit_pending || !self.wait(self.timings.handshake_ticks) {
            return SessionStep::Waiting;
        }

        match self.winners.clone() {
            Some(pair) => {
                self.commit_pending = true;
                SessionStep::CommitDue(pair)
            }
            None => {
                self.reset();
                SessionStep::Idle
            }
        }
    }

    /// Counts one tick in the current phase; true once `ticks` have elapsed.
    fn wait(&mut self, ticks: u32) -> bool {
        self.elapsed += 1;
        if self.elapsed >= ticks {
            self.elapsed = 0;
            true
        } else {
            false
        }
    }

    fn enter(&mut self, phase: DrawPhase) -> SessionStep {
        self.phase = phase;
        self.elapsed = 0;
        SessionStep::PhaseChanged(phase)
    }

    fn clear_round(&mut self) {
        self.countdown = self.timings.countdown_from;
        self.elapsed = 0;
        self.plan = None;
        self.winners = None;
        self.mentee_reel = None;
        self.mentor_reel = None;
        self.commit_pending = false;
    }
}

#[cfg(test)]
mod tests;
