use chrono::Utc;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use super::domain::{
    seed_roster, Match, PairingRule, Person, PersonId, Settings, SettingsPatch, PAIRING_RULES,
};
use super::engine::{CommitError, MatchEngine};
use super::matches::MatchLog;
use super::persistence::{SnapshotKey, SnapshotStore, StoreError};
use super::roster::{Roster, RosterError};
use super::rules::{find_next_pairing, pending_summary, PairingPlan, RuleAvailability};
use super::session::{
    DrawPhase, DrawSession, SessionError, SessionStep, SessionTimings, StartOutcome,
};

/// Fixed configuration of a ceremony: rule priority, the roster restored by
/// a reset, and the animation pacing.
#[derive(Debug, Clone)]
pub struct CeremonyBlueprint {
    pub rules: Vec<PairingRule>,
    pub seed: Vec<Person>,
    pub timings: SessionTimings,
}

impl CeremonyBlueprint {
    pub fn standard() -> Self {
        Self {
            rules: PAIRING_RULES.to_vec(),
            seed: seed_roster(),
            timings: SessionTimings::ceremony(),
        }
    }

    pub fn with_timings(mut self, timings: SessionTimings) -> Self {
        self.timings = timings;
        self
    }
}

impl Default for CeremonyBlueprint {
    fn default() -> Self {
        Self::standard()
    }
}

/// Change notifications for observers of a [`Ceremony`].
#[derive(Debug, Clone, PartialEq)]
pub enum CeremonyEvent {
    RosterChanged,
    MatchesChanged,
    SettingsChanged,
    Session(SessionStep),
    RoundAborted(CommitError),
    CeremonyComplete,
}

pub type Observer = Box<dyn FnMut(&CeremonyEvent)>;

#[derive(Debug, thiserror::Error)]
pub enum CeremonyError {
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owned ceremony state: roster, match log and settings, the draw session,
/// and the snapshot store they are written through.
///
/// Every mutation rewrites the affected snapshot in full, bumps
/// [`Ceremony::revision`] and notifies subscribers.
pub struct Ceremony<S, R = ChaCha8Rng> {
    roster: Roster,
    matches: MatchLog,
    settings: Settings,
    rules: Vec<PairingRule>,
    seed: Roster,
    engine: MatchEngine<R>,
    session: DrawSession,
    store: S,
    observers: Vec<Observer>,
    revision: u64,
}

impl<S, R> Ceremony<S, R>
where
    S: SnapshotStore,
    R: Rng,
{
    /// Restores state from `store`. Missing or unreadable snapshots fall back
    /// to the blueprint seed, an empty log and default settings.
    pub fn open(
        blueprint: CeremonyBlueprint,
        store: S,
        engine: MatchEngine<R>,
    ) -> Result<Self, CeremonyError> {
        let CeremonyBlueprint {
            rules,
            seed,
            timings,
        } = blueprint;
        let seed = Roster::from_people(seed)?;

        let roster = match store.load::<Vec<Person>>(SnapshotKey::Roster) {
            Ok(Some(people)) => Roster::from_people(people).unwrap_or_else(|err| {
                warn!(%err, "roster snapshot rejected, restoring seed roster");
                seed.clone()
            }),
            Ok(None) => seed.clone(),
            Err(err) => {
                warn!(%err, "roster snapshot unreadable, restoring seed roster");
                seed.clone()
            }
        };
        let matches = match store.load::<Vec<Match>>(SnapshotKey::Matches) {
            Ok(entries) => MatchLog::from_entries(entries.unwrap_or_default()),
            Err(err) => {
                warn!(%err, "match snapshot unreadable, starting with an empty log");
                MatchLog::new()
            }
        };
        let settings = match store.load::<Settings>(SnapshotKey::Settings) {
            Ok(settings) => settings.unwrap_or_default(),
            Err(err) => {
                warn!(%err, "settings snapshot unreadable, using defaults");
                Settings::default()
            }
        };

        info!(
            people = roster.len(),
            matches = matches.len(),
            rules = rules.len(),
            "ceremony state loaded"
        );

        Ok(Self {
            roster,
            matches,
            settings,
            rules,
            seed,
            engine,
            session: DrawSession::new(timings),
            store,
            observers: Vec::new(),
            revision: 0,
        })
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn matches(&self) -> &MatchLog {
        &self.matches
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn rules(&self) -> &[PairingRule] {
        &self.rules
    }

    pub fn session(&self) -> &DrawSession {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Incremented on every state change; lets hosts poll instead of subscribe.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&CeremonyEvent) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn next_pairing(&self) -> Option<PairingPlan> {
        find_next_pairing(&self.rules, &self.roster)
    }

    pub fn has_next_pairing(&self) -> bool {
        self.next_pairing().is_some()
    }

    pub fn pending(&self) -> Vec<RuleAvailability> {
        pending_summary(&self.rules, &self.roster)
    }

    /// Ids that a committed match already names stay retired, even after the
    /// person has been removed from the roster.
    pub fn add_person(&mut self, person: Person) -> Result<(), CeremonyError> {
        let id = person.id.clone();
        self.ensure_not_retired(&id)?;

        let mut staged = self.roster.clone();
        staged.add(person)?;
        self.store.save(SnapshotKey::Roster, staged.people())?;
        self.roster = staged;

        debug!(%id, "person added");
        self.emit(CeremonyEvent::RosterChanged);
        Ok(())
    }

    pub fn add_people(&mut self, people: Vec<Person>) -> Result<usize, CeremonyError> {
        for person in &people {
            self.ensure_not_retired(&person.id)?;
        }

        let mut staged = self.roster.clone();
        let added = staged.add_batch(people)?;
        self.store.save(SnapshotKey::Roster, staged.people())?;
        self.roster = staged;

        info!(added, "people added to roster");
        self.emit(CeremonyEvent::RosterChanged);
        Ok(added)
    }

    /// Unknown ids are a no-op and yield `None`.
    pub fn remove_person(&mut self, id: &PersonId) -> Result<Option<Person>, CeremonyError> {
        let mut staged = self.roster.clone();
        let person = match staged.remove(id) {
            Ok(person) => person,
            Err(RosterError::NotFound(_)) => {
                debug!(%id, "remove ignored, person not on roster");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        self.store.save(SnapshotKey::Roster, staged.people())?;
        self.roster = staged;

        debug!(%id, "person removed");
        self.emit(CeremonyEvent::RosterChanged);
        Ok(Some(person))
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<bool, CeremonyError> {
        let mut staged = self.settings.clone();
        if !staged.apply(patch) {
            return Ok(false);
        }
        self.store.save(SnapshotKey::Settings, &staged)?;
        self.settings = staged;
        self.emit(CeremonyEvent::SettingsChanged);
        Ok(true)
    }

    /// Restores the seed roster, empties the log and clears settings. A round
    /// in flight is dropped without committing.
    pub fn reset_all(&mut self) -> Result<(), CeremonyError> {
        self.session.reset();
        self.roster.reset(&self.seed);
        self.matches.clear();
        self.settings = Settings::default();

        info!(people = self.roster.len(), "ceremony reset to seed roster");
        self.emit(CeremonyEvent::Session(SessionStep::Idle));
        self.emit(CeremonyEvent::RosterChanged);
        self.emit(CeremonyEvent::MatchesChanged);
        self.emit(CeremonyEvent::SettingsChanged);

        self.store.clear()?;
        self.persist_roster()?;
        self.persist_matches()?;
        self.store.save(SnapshotKey::Settings, &self.settings)?;
        Ok(())
    }

    /// Starts a round from `Idle` or `Finished`.
    pub fn start_round(&mut self) -> Result<StartOutcome, CeremonyError> {
        let plan = self.next_pairing();
        let outcome = self.session.start(plan)?;
        match &outcome {
            StartOutcome::Started { rule } => {
                info!(%rule, "draw started");
                self.emit(CeremonyEvent::Session(SessionStep::PhaseChanged(
                    self.session.phase(),
                )));
            }
            StartOutcome::CeremonyComplete => {
                info!(matches = self.matches.len(), "no pairing left to draw");
                self.emit(CeremonyEvent::CeremonyComplete);
            }
        }
        Ok(outcome)
    }

    /// Follow-up draw; only valid once the previous round finished.
    pub fn next_round(&mut self) -> Result<StartOutcome, CeremonyError> {
        let phase = self.session.phase();
        if phase != DrawPhase::Finished {
            return Err(SessionError::NotFinished(phase).into());
        }
        self.start_round()
    }

    pub fn reset_round(&mut self) {
        if self.session.phase().is_active() {
            info!(phase = self.session.phase().label(), "draw cancelled");
        }
        self.session.reset();
        self.emit(CeremonyEvent::Session(SessionStep::Idle));
    }

    /// Advances the session by one tick. When the handshake completes this
    /// runs the commit, which is the only place a round writes state.
    ///
    /// A committed pairing is never rolled back: if its snapshots cannot be
    /// written the failure is logged, observers are still notified and the
    /// next successful write of the full snapshot catches the store up.
    pub fn tick(&mut self) -> Result<SessionStep, CeremonyError> {
        let step = match self.session.tick(&mut self.engine) {
            SessionStep::CommitDue(pair) => {
                let result = self.engine.commit(
                    &mut self.roster,
                    &mut self.matches,
                    &pair.mentee.id,
                    &pair.mentor.id,
                    Utc::now(),
                );
                let committed = result.is_ok();
                let step = self.session.complete_commit(result)?;

                match &step {
                    SessionStep::Committed(entry) => info!(
                        mentee = %entry.mentee.name,
                        mentor = %entry.mentor.name,
                        "pairing committed"
                    ),
                    SessionStep::Aborted(err) => {
                        warn!(%err, "draw aborted before commit");
                        self.emit(CeremonyEvent::RoundAborted(err.clone()));
                    }
                    _ => {}
                }

                if committed {
                    if let Err(err) = self.persist_roster().and_then(|()| self.persist_matches())
                    {
                        warn!(%err, "pairing committed but its snapshots were not written");
                    }
                    self.emit(CeremonyEvent::RosterChanged);
                    self.emit(CeremonyEvent::MatchesChanged);
                }
                step
            }
            SessionStep::Idle => return Ok(SessionStep::Idle),
            step => step,
        };

        self.emit(CeremonyEvent::Session(step.clone()));
        Ok(step)
    }

    fn ensure_not_retired(&self, id: &PersonId) -> Result<(), RosterError> {
        if self.matches.match_for(id).is_some() {
            return Err(RosterError::DuplicateId(id.clone()));
        }
        Ok(())
    }

    fn persist_roster(&self) -> Result<(), StoreError> {
        self.store.save(SnapshotKey::Roster, self.roster.people())
    }

    fn persist_matches(&self) -> Result<(), StoreError> {
        self.store.save(SnapshotKey::Matches, self.matches.entries())
    }

    fn emit(&mut self, event: CeremonyEvent) {
        self.revision += 1;
        for observer in &mut self.observers {
            observer(&event);
        }
    }
}
