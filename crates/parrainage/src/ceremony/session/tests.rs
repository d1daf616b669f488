use super::*;
use crate::ceremony::domain::{ClassName, PersonId, PAIRING_RULES};
use crate::ceremony::matches::MatchLog;
use crate::ceremony::roster::Roster;
use crate::ceremony::rules::find_next_pairing;
use chrono::Utc;
use rand_chacha::ChaCha8Rng;

const TICK_LIMIT: usize = 10_000;

fn roster(mentees: usize, mentors: usize) -> Roster {
    let mut roster = Roster::new();
    for index in 0..mentees {
        roster
            .add(Person::new(
                PersonId::new(format!("f{index}")),
                format!("Mentee {index}"),
                "",
                ClassName::Bts1,
            ))
            .expect("unique mentee");
    }
    for index in 0..mentors {
        roster
            .add(Person::new(
                PersonId::new(format!("p{index}")),
                format!("Mentor {index}"),
                "",
                ClassName::Bts2,
            ))
            .expect("unique mentor");
    }
    roster
}

fn plan_for(roster: &Roster) -> Option<PairingPlan> {
    find_next_pairing(&PAIRING_RULES, roster)
}

fn run_until_commit(
    session: &mut DrawSession,
    engine: &mut MatchEngine<ChaCha8Rng>,
) -> (Vec<SessionStep>, DrawnPair) {
    let mut steps = Vec::new();
    for _ in 0..TICK_LIMIT {
        match session.tick(engine) {
            SessionStep::CommitDue(pair) => return (steps, pair),
            step => steps.push(step),
        }
    }
    panic!("round never reached the commit point");
}

#[test]
fn start_without_plan_reports_completion() {
    let mut session = DrawSession::new(SessionTimings::rehearsal());
    assert_eq!(session.start(None), Ok(StartOutcome::CeremonyComplete));
    assert_eq!(session.phase(), DrawPhase::Idle);
}

#[test]
fn start_is_refused_while_a_round_runs() {
    let roster = roster(2, 2);
    let mut session = DrawSession::new(SessionTimings::rehearsal());
    session.start(plan_for(&roster)).expect("first start");

    assert_eq!(
        session.start(plan_for(&roster)),
        Err(SessionError::RoundInProgress(DrawPhase::Countdown))
    );
}

#[test]
fn countdown_steps_once_per_second() {
    let roster = roster(1, 1);
    let mut engine = MatchEngine::seeded(11);
    let mut session = DrawSession::new(SessionTimings::ceremony());
    session.start(plan_for(&roster)).expect("start");

    let mut counts = Vec::new();
    for _ in 0..50 {
        if let SessionStep::CountdownChanged(value) = session.tick(&mut engine) {
            counts.push(value);
        }
    }
    assert_eq!(counts, vec![4, 3, 2, 1, 0]);
    assert_eq!(session.phase(), DrawPhase::Countdown);

    assert_eq!(
        session.tick(&mut engine),
        SessionStep::PhaseChanged(DrawPhase::RevealingMentee)
    );
}

#[test]
fn round_walks_every_phase_in_order() {
    let roster = roster(3, 3);
    let mut engine = MatchEngine::seeded(5);
    let mut session = DrawSession::new(SessionTimings::rehearsal());
    session.start(plan_for(&roster)).expect("start");

    let (steps, _) = run_until_commit(&mut session, &mut engine);
    let phases: Vec<DrawPhase> = steps
        .iter()
        .filter_map(|step| match step {
            SessionStep::PhaseChanged(phase) => Some(*phase),
            _ => None,
        })
        .collect();

    assert_eq!(
        phases,
        vec![
            DrawPhase::RevealingMentee,
            DrawPhase::TransitionPause,
            DrawPhase::RevealingMentor,
            DrawPhase::Reveal,
            DrawPhase::Handshake,
        ]
    );
    assert_eq!(session.phase(), DrawPhase::Handshake);
}

#[test]
fn reels_lock_on_the_preselected_winners() {
    let roster = roster(4, 4);
    let mut engine = MatchEngine::seeded(99);
    let mut session = DrawSession::new(SessionTimings::rehearsal());
    session.start(plan_for(&roster)).expect("start");

    let (steps, pair) = run_until_commit(&mut session, &mut engine);
    let locked: Vec<(Role, PersonId)> = steps
        .iter()
        .filter_map(|step| match step {
            SessionStep::Locked { role, winner } => Some((*role, winner.id.clone())),
            _ => None,
        })
        .collect();

    assert_eq!(
        locked,
        vec![
            (Role::Mentee, pair.mentee.id.clone()),
            (Role::Mentor, pair.mentor.id.clone()),
        ]
    );
    assert_eq!(session.displayed_mentee(), Some(&pair.mentee));
    assert_eq!(session.displayed_mentor(), Some(&pair.mentor));
}

#[test]
fn shuffle_never_repeats_consecutively() {
    let roster = roster(2, 3);
    let mut engine = MatchEngine::seeded(2024);
    let mut session = DrawSession::new(SessionTimings::ceremony());
    session.start(plan_for(&roster)).expect("start");

    let (steps, _) = run_until_commit(&mut session, &mut engine);
    for role in [Role::Mentee, Role::Mentor] {
        let shown: Vec<&PersonId> = steps
            .iter()
            .filter_map(|step| match step {
                SessionStep::Shuffled {
                    role: shown_role,
                    candidate,
                } if *shown_role == role => Some(&candidate.id),
                _ => None,
            })
            .collect();

        let expected = match role {
            Role::Mentee => SessionTimings::ceremony().mentee_shuffles,
            Role::Mentor => SessionTimings::ceremony().mentor_shuffles,
        };
        assert_eq!(shown.len(), expected as usize);
        assert!(
            shown.windows(2).all(|pair| pair[0] != pair[1]),
            "{role} reel repeated a candidate"
        );
    }
}

#[test]
fn single_candidate_pools_still_shuffle() {
    let roster = roster(1, 1);
    let mut engine = MatchEngine::seeded(8);
    let mut session = DrawSession::new(SessionTimings::rehearsal());
    session.start(plan_for(&roster)).expect("start");

    let (steps, pair) = run_until_commit(&mut session, &mut engine);
    assert_eq!(pair.mentee.id, PersonId::from("f0"));
    assert_eq!(pair.mentor.id, PersonId::from("p0"));
    assert!(steps
        .iter()
        .any(|step| matches!(step, SessionStep::Shuffled { .. })));
}

#[test]
fn commit_is_requested_exactly_once() {
    let roster = roster(2, 2);
    let mut engine = MatchEngine::seeded(1);
    let mut session = DrawSession::new(SessionTimings::rehearsal());
    session.start(plan_for(&roster)).expect("start");
    run_until_commit(&mut session, &mut engine);

    for _ in 0..20 {
        assert_eq!(session.tick(&mut engine), SessionStep::Waiting);
    }
    assert_eq!(session.phase(), DrawPhase::Handshake);
}

#[test]
fn successful_commit_finishes_the_round() {
    let mut roster = roster(2, 2);
    let mut log = MatchLog::new();
    let mut engine = MatchEngine::seeded(3);
    let mut session = DrawSession::new(SessionTimings::rehearsal());
    session.start(plan_for(&roster)).expect("start");

    let (_, pair) = run_until_commit(&mut session, &mut engine);
    let result = engine.commit(
        &mut roster,
        &mut log,
        &pair.mentee.id,
        &pair.mentor.id,
        Utc::now(),
    );
    let step = session.complete_commit(result).expect("commit was pending");

    assert!(matches!(step, SessionStep::Committed(_)));
    assert_eq!(session.phase(), DrawPhase::Finished);
    assert_eq!(
        session.last_match().map(|entry| &entry.mentee.id),
        Some(&pair.mentee.id)
    );
    assert_eq!(session.tick(&mut engine), SessionStep::Idle);
    assert_eq!(
        session.complete_commit(Err(CommitError::AlreadyMatched(pair.mentee.id))),
        Err(SessionError::NoCommitPending)
    );

    let outcome = session.start(plan_for(&roster)).expect("next round");
    assert!(matches!(outcome, StartOutcome::Started { .. }));
    assert_eq!(session.phase(), DrawPhase::Countdown);
}

#[test]
fn failed_commit_returns_to_idle() {
    let roster = roster(2, 2);
    let mut engine = MatchEngine::seeded(4);
    let mut session = DrawSession::new(SessionTimings::rehearsal());
    session.start(plan_for(&roster)).expect("start");

    let (_, pair) = run_until_commit(&mut session, &mut engine);
    let error = CommitError::AlreadyMatched(pair.mentor.id.clone());
    let step = session
        .complete_commit(Err(error.clone()))
        .expect("commit was pending");

    assert_eq!(step, SessionStep::Aborted(error.clone()));
    assert_eq!(session.phase(), DrawPhase::Idle);
    assert_eq!(session.last_error(), Some(&error));
    assert!(session.plan().is_none());
}

#[test]
fn reset_discards_the_round_in_flight() {
    let roster = roster(3, 3);
    let mut engine = MatchEngine::seeded(6);
    let mut session = DrawSession::new(SessionTimings::ceremony());
    session.start(plan_for(&roster)).expect("start");

    for _ in 0..80 {
        session.tick(&mut engine);
    }
    assert!(session.phase().is_active());

    session.reset();
    assert_eq!(session.phase(), DrawPhase::Idle);
    assert!(session.plan().is_none());
    assert!(session.displayed_mentee().is_none());
    assert_eq!(session.countdown(), 5);
    for _ in 0..TICK_LIMIT {
        assert_eq!(session.tick(&mut engine), SessionStep::Idle);
    }
    assert_eq!(
        session.complete_commit(Ok(Match {
            id: crate::ceremony::domain::MatchId::generate(),
            mentee: roster.people()[0].clone(),
            mentor: roster.people()[3].clone(),
            created_at: Utc::now(),
        })),
        Err(SessionError::NoCommitPending)
    );
}
