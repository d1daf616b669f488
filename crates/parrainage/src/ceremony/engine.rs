use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::domain::{Match, MatchId, Person, PersonId};
use super::matches::MatchLog;
use super::roster::Roster;
use super::rules::PairingPlan;

/// Winners picked for a round before they are revealed.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnPair {
    pub mentee: Person,
    pub mentor: Person,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    #[error("'{0}' was matched while the draw was running")]
    AlreadyMatched(PersonId),
    #[error("'{0}' left the roster while the draw was running")]
    MissingParticipant(PersonId),
}

/// Owns the ceremony's random source and is the only writer of match state.
#[derive(Debug, Clone)]
pub struct MatchEngine<R = ChaCha8Rng> {
    rng: R,
}

impl MatchEngine<ChaCha8Rng> {
    /// Reproducible engine; the same seed replays the same ceremony.
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(ChaCha8Rng::from_entropy())
    }

    pub fn with_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl<R: Rng> MatchEngine<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Uniform index in `[0, len)`, or `None` for an empty pool.
    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.rng.gen_range(0..len))
    }

    /// Preview draw: one independent uniform pick per side. Does not touch
    /// the roster.
    pub fn draw_winners(&mut self, plan: &PairingPlan) -> Option<DrawnPair> {
        let mentee = plan.source_available.choose(&mut self.rng)?.clone();
        let mentor = plan.target_available.choose(&mut self.rng)?.clone();
        Some(DrawnPair { mentee, mentor })
    }

    /// Records the pairing: a new match is appended to the log and both
    /// people are flipped to matched.
    ///
    /// Both participants are checked before anything is written, so a failed
    /// commit leaves the roster and log exactly as they were. The match holds
    /// the people as they were just before the flip.
    pub fn commit(
        &self,
        roster: &mut Roster,
        log: &mut MatchLog,
        mentee_id: &PersonId,
        mentor_id: &PersonId,
        now: DateTime<Utc>,
    ) -> Result<Match, CommitError> {
        let mentee = Self::unmatched(roster, mentee_id)?.clone();
        let mentor = Self::unmatched(roster, mentor_id)?.clone();

        for id in [mentee_id, mentor_id] {
            roster
                .mark_matched(id)
                .map_err(|_| CommitError::MissingParticipant(id.clone()))?;
        }

        let entry = Match {
            id: MatchId::generate(),
            mentee,
            mentor,
            created_at: now,
        };
        log.append(entry.clone());
        Ok(entry)
    }

    fn unmatched<'a>(roster: &'a Roster, id: &PersonId) -> Result<&'a Person, CommitError> {
        let person = roster
            .get(id)
            .ok_or_else(|| CommitError::MissingParticipant(id.clone()))?;
        if person.is_matched() {
            return Err(CommitError::AlreadyMatched(id.clone()));
        }
        Ok(person)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ceremony::domain::{seed_roster, Role, PAIRING_RULES};
    use crate::ceremony::rules::find_next_pairing;

    fn seeded_roster() -> Roster {
        Roster::from_people(seed_roster()).expect("seed is unique")
    }

    #[test]
    fn draw_picks_from_the_plan_pools() {
        let roster = seeded_roster();
        let plan = find_next_pairing(&PAIRING_RULES, &roster).expect("drawable");
        let mut engine = MatchEngine::seeded(7);

        for _ in 0..20 {
            let pair = engine.draw_winners(&plan).expect("pools are non-empty");
            assert!(plan.source_available.contains(&pair.mentee));
            assert!(plan.target_available.contains(&pair.mentor));
        }
        assert_eq!(
            roster,
            seeded_roster(),
            "preview draws never mutate the roster"
        );
    }

    #[test]
    fn same_seed_replays_the_same_draw() {
        let roster = seeded_roster();
        let plan = find_next_pairing(&PAIRING_RULES, &roster).expect("drawable");
        let first = MatchEngine::seeded(42).draw_winners(&plan);
        let second = MatchEngine::seeded(42).draw_winners(&plan);
        assert_eq!(first, second);
    }

    #[test]
    fn every_candidate_can_win() {
        let roster = seeded_roster();
        let plan = find_next_pairing(&PAIRING_RULES, &roster).expect("drawable");
        let mut engine = MatchEngine::seeded(1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let pair = engine.draw_winners(&plan).expect("drawable");
            seen.insert(pair.mentee.id);
        }
        assert_eq!(seen.len(), plan.source_available.len());
    }

    #[test]
    fn pick_index_handles_empty_pools() {
        let mut engine = MatchEngine::seeded(3);
        assert_eq!(engine.pick_index(0), None);
        assert_eq!(engine.pick_index(1), Some(0));
    }

    #[test]
    fn commit_flips_both_and_appends_once() {
        let mut roster = seeded_roster();
        let mut log = MatchLog::new();
        let engine = MatchEngine::seeded(0);
        let now = Utc::now();

        let entry = engine
            .commit(
                &mut roster,
                &mut log,
                &PersonId::from("f1"),
                &PersonId::from("p2"),
                now,
            )
            .expect("commit succeeds");

        assert_eq!(entry.mentee.id, PersonId::from("f1"));
        assert_eq!(entry.mentor.id, PersonId::from("p2"));
        assert_eq!(entry.created_at, now);
        assert!(!entry.mentee.is_matched() && !entry.mentor.is_matched());
        assert_eq!(log.len(), 1);
        assert!(roster.get(&PersonId::from("f1")).expect("f1").is_matched());
        assert!(roster.get(&PersonId::from("p2")).expect("p2").is_matched());
        assert!(!roster
            .list_available(entry.mentee.class_name, Role::Mentee)
            .iter()
            .any(|person| person.id == entry.mentee.id));
    }

    #[test]
    fn second_commit_of_a_winner_is_rejected() {
        let mut roster = seeded_roster();
        let mut log = MatchLog::new();
        let engine = MatchEngine::seeded(0);
        let f1 = PersonId::from("f1");

        engine
            .commit(&mut roster, &mut log, &f1, &PersonId::from("p1"), Utc::now())
            .expect("first commit");
        let err = engine
            .commit(&mut roster, &mut log, &f1, &PersonId::from("p2"), Utc::now())
            .expect_err("f1 already matched");

        assert_eq!(err, CommitError::AlreadyMatched(f1));
        assert_eq!(log.len(), 1);
        assert!(
            !roster.get(&PersonId::from("p2")).expect("p2").is_matched(),
            "a rejected commit must not flip the other side"
        );
    }

    #[test]
    fn commit_rejects_removed_participant() {
        let mut roster = seeded_roster();
        let mut log = MatchLog::new();
        let p3 = PersonId::from("p3");
        roster.remove(&p3).expect("p3 present");

        let err = MatchEngine::seeded(0)
            .commit(&mut roster, &mut log, &PersonId::from("f3"), &p3, Utc::now())
            .expect_err("p3 removed");
        assert_eq!(err, CommitError::MissingParticipant(p3));
        assert!(log.is_empty());
        assert!(!roster.get(&PersonId::from("f3")).expect("f3").is_matched());
    }
}
