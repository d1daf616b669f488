use serde::Serialize;

use super::domain::{PairingRule, Person, Role};
use super::roster::Roster;

/// The rule selected for the next draw along with both eligible pools,
/// captured at resolution time.
#[derive(Debug, Clone, PartialEq)]
pub struct PairingPlan {
    pub rule_index: usize,
    pub rule: PairingRule,
    pub source_available: Vec<Person>,
    pub target_available: Vec<Person>,
}

impl PairingPlan {
    pub fn pool(&self, role: Role) -> &[Person] {
        match role {
            Role::Mentee => &self.source_available,
            Role::Mentor => &self.target_available,
        }
    }
}

/// Returns the first rule, in priority order, with at least one available
/// mentee in its source class and one available mentor in its target class.
///
/// `None` means the ceremony is complete. The function only reads the roster,
/// so repeated calls without a mutation in between agree.
pub fn find_next_pairing(rules: &[PairingRule], roster: &Roster) -> Option<PairingPlan> {
    rules.iter().enumerate().find_map(|(rule_index, rule)| {
        let source_available = roster.list_available(rule.source, Role::Mentee);
        if source_available.is_empty() {
            return None;
        }
        let target_available = roster.list_available(rule.target, Role::Mentor);
        if target_available.is_empty() {
            return None;
        }

        Some(PairingPlan {
            rule_index,
            rule: *rule,
            source_available,
            target_available,
        })
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleAvailability {
    pub rule: PairingRule,
    pub mentees: usize,
    pub mentors: usize,
}

impl RuleAvailability {
    pub fn is_drawable(&self) -> bool {
        self.mentees > 0 && self.mentors > 0
    }
}

/// Per-rule available counts, in rule order.
pub fn pending_summary(rules: &[PairingRule], roster: &Roster) -> Vec<RuleAvailability> {
    rules
        .iter()
        .map(|rule| RuleAvailability {
            rule: *rule,
            mentees: roster.available_count(rule.source, Role::Mentee),
            mentors: roster.available_count(rule.target, Role::Mentor),
        })
        .collect()
}
