//! Pairing ceremony core: who is on the roster, which classes pair with
//! which, the animated draw, and the committed match log.

pub mod domain;
mod engine;
pub mod import;
mod matches;
pub mod persistence;
pub mod report;
mod roster;
mod rules;
pub mod session;
mod service;

pub use domain::{
    ClassName, Match, MatchId, PairingRule, Person, PersonId, Role, Settings, SettingsPatch,
    CLASS_ROLES, PAIRING_RULES,
};
pub use engine::{CommitError, DrawnPair, MatchEngine};
pub use import::{ImportError, PhotoImport, PhotoImporter};
pub use matches::MatchLog;
pub use persistence::{JsonDirectoryStore, MemorySnapshotStore, SnapshotStore, StoreError};
pub use report::{MatchReport, ReportError};
pub use roster::{Roster, RosterError};
pub use rules::{find_next_pairing, pending_summary, PairingPlan, RuleAvailability};
pub use service::{Ceremony, CeremonyBlueprint, CeremonyError, CeremonyEvent, Observer};
pub use session::{DrawPhase, DrawSession, SessionError, SessionStep, SessionTimings, StartOutcome};
