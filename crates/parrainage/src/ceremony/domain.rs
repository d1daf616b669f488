use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of classes taking part in the ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassName {
    #[serde(rename = "BTS 1")]
    Bts1,
    #[serde(rename = "BTS 2")]
    Bts2,
    #[serde(rename = "LP 1 AGITEL")]
    Lp1Agitel,
    #[serde(rename = "LP 2 AGITEL")]
    Lp2Agitel,
    #[serde(rename = "LP 1 UPAF")]
    Lp1Upaf,
    #[serde(rename = "LP 2 UPAF")]
    Lp2Upaf,
}

impl ClassName {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Bts1,
            Self::Bts2,
            Self::Lp1Agitel,
            Self::Lp2Agitel,
            Self::Lp1Upaf,
            Self::Lp2Upaf,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Bts1 => "BTS 1",
            Self::Bts2 => "BTS 2",
            Self::Lp1Agitel => "LP 1 AGITEL",
            Self::Lp2Agitel => "LP 2 AGITEL",
            Self::Lp1Upaf => "LP 1 UPAF",
            Self::Lp2Upaf => "LP 2 UPAF",
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Bts1 => "bts1",
            Self::Bts2 => "bts2",
            Self::Lp1Agitel => "lp1-agitel",
            Self::Lp2Agitel => "lp2-agitel",
            Self::Lp1Upaf => "lp1-upaf",
            Self::Lp2Upaf => "lp2-upaf",
        }
    }

    /// Role every member of this class plays, read from [`CLASS_ROLES`].
    pub fn role(self) -> Role {
        role_for_class(self)
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ClassName {
    type Err = DomainError;

    /// Accepts the display label (`"LP 2 UPAF"`) or the slug (`"lp2-upaf"`),
    /// ignoring case, spaces, dashes and underscores.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = compact(raw);
        Self::ordered()
            .into_iter()
            .find(|class| compact(class.slug()) == wanted)
            .ok_or_else(|| DomainError::UnknownClass(raw.trim().to_string()))
    }
}

fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "FILLEUL")]
    Mentee,
    #[serde(rename = "PARRAIN")]
    Mentor,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mentee => "Filleul",
            Self::Mentor => "Parrain",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Static class-to-role table. Senior classes mentor, everyone else is a mentee.
pub const CLASS_ROLES: [(ClassName, Role); 6] = [
    (ClassName::Bts1, Role::Mentee),
    (ClassName::Bts2, Role::Mentor),
    (ClassName::Lp1Agitel, Role::Mentee),
    (ClassName::Lp2Agitel, Role::Mentor),
    (ClassName::Lp1Upaf, Role::Mentee),
    (ClassName::Lp2Upaf, Role::Mentor),
];

pub fn role_for_class(class_name: ClassName) -> Role {
    CLASS_ROLES
        .iter()
        .find(|(class, _)| *class == class_name)
        .map(|(_, role)| *role)
        .unwrap_or(Role::Mentee)
}

/// Source-class mentees are paired with target-class mentors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairingRule {
    pub source: ClassName,
    pub target: ClassName,
}

impl PairingRule {
    pub const fn new(source: ClassName, target: ClassName) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for PairingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Rule priority is the slice order.
pub const PAIRING_RULES: [PairingRule; 3] = [
    PairingRule::new(ClassName::Bts1, ClassName::Bts2),
    PairingRule::new(ClassName::Lp1Agitel, ClassName::Lp2Agitel),
    PairingRule::new(ClassName::Lp1Upaf, ClassName::Lp2Upaf),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl MatchId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A student on the roster.
///
/// `matched` is private: it starts out false and only the match engine may
/// flip it, through the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(rename = "photoUrl")]
    pub photo_ref: String,
    pub class_name: ClassName,
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(rename = "isMatched", default)]
    matched: bool,
}

impl Person {
    /// Builds an unmatched person whose role follows [`CLASS_ROLES`].
    pub fn new(
        id: PersonId,
        name: impl Into<String>,
        photo_ref: impl Into<String>,
        class_name: ClassName,
    ) -> Self {
        Self::with_role(id, name, photo_ref, class_name, class_name.role())
    }

    pub fn with_role(
        id: PersonId,
        name: impl Into<String>,
        photo_ref: impl Into<String>,
        class_name: ClassName,
        role: Role,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            photo_ref: photo_ref.into(),
            class_name,
            role,
            matched: false,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }

    pub(crate) fn set_matched(&mut self) {
        self.matched = true;
    }

    pub fn is_available_as(&self, class_name: ClassName, role: Role) -> bool {
        !self.matched && self.class_name == class_name && self.role == role
    }
}

/// A committed pairing. Holds snapshots of both people taken at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    #[serde(rename = "filleul")]
    pub mentee: Person,
    #[serde(rename = "parrain")]
    pub mentor: Person,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "logoUrl", default)]
    pub logo_ref: Option<String>,
}

/// Partial settings update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub logo_ref: Option<Option<String>>,
}

impl Settings {
    /// Applies the patch and reports whether anything changed.
    pub fn apply(&mut self, patch: SettingsPatch) -> bool {
        let mut changed = false;
        if let Some(logo_ref) = patch.logo_ref {
            changed |= self.logo_ref != logo_ref;
            self.logo_ref = logo_ref;
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("unknown class '{0}'")]
    UnknownClass(String),
}

/// Demo roster loaded on first start and restored by a full reset.
pub fn seed_roster() -> Vec<Person> {
    const SEED: [(&str, &str, ClassName); 12] = [
        ("f1", "Alice Dupont", ClassName::Bts1),
        ("f2", "Jean Kofi", ClassName::Bts1),
        ("f3", "Sarah Koné", ClassName::Bts1),
        ("p1", "Marc Yao", ClassName::Bts2),
        ("p2", "Julie Kouadio", ClassName::Bts2),
        ("p3", "Paul Digbeu", ClassName::Bts2),
        ("f4", "Awa Touré", ClassName::Lp1Agitel),
        ("f5", "Moussa Diop", ClassName::Lp1Agitel),
        ("p4", "Fatou Sylla", ClassName::Lp2Agitel),
        ("p5", "Oumar Cissé", ClassName::Lp2Agitel),
        ("f6", "Grace N’Guessan", ClassName::Lp1Upaf),
        ("p6", "Hervé Banny", ClassName::Lp2Upaf),
    ];

    SEED.iter()
        .enumerate()
        .map(|(index, (id, name, class_name))| {
            Person::new(
                PersonId::from(*id),
                *name,
                format!("https://picsum.photos/200/300?random={}", index + 1),
                *class_name,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_parses_labels_and_slugs() {
        assert_eq!("LP 2 UPAF".parse::<ClassName>(), Ok(ClassName::Lp2Upaf));
        assert_eq!("lp1-agitel".parse::<ClassName>(), Ok(ClassName::Lp1Agitel));
        assert_eq!(" bts_1 ".parse::<ClassName>(), Ok(ClassName::Bts1));
        assert_eq!(
            "master".parse::<ClassName>(),
            Err(DomainError::UnknownClass("master".to_string()))
        );
    }

    #[test]
    fn senior_classes_mentor() {
        let mentors: Vec<ClassName> = ClassName::ordered()
            .into_iter()
            .filter(|class| class.role() == Role::Mentor)
            .collect();
        assert_eq!(
            mentors,
            vec![ClassName::Bts2, ClassName::Lp2Agitel, ClassName::Lp2Upaf]
        );
    }

    #[test]
    fn person_serializes_with_snapshot_keys() {
        let person = Person::new(PersonId::from("f1"), "Alice", "a.png", ClassName::Bts1);
        let value = serde_json::to_value(&person).expect("serialize person");
        assert_eq!(value["className"], "BTS 1");
        assert_eq!(value["type"], "FILLEUL");
        assert_eq!(value["photoUrl"], "a.png");
        assert_eq!(value["isMatched"], false);
    }

    #[test]
    fn seed_roster_has_unique_ids_and_expected_roles() {
        let seed = seed_roster();
        assert_eq!(seed.len(), 12);
        let mut ids: Vec<&str> = seed.iter().map(|person| person.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 12);
        assert!(seed
            .iter()
            .all(|person| person.role == person.class_name.role() && !person.is_matched()));
    }

    #[test]
    fn settings_patch_reports_changes() {
        let mut settings = Settings::default();
        assert!(!settings.apply(SettingsPatch::default()));
        assert!(settings.apply(SettingsPatch {
            logo_ref: Some(Some("logo.png".to_string())),
        }));
        assert_eq!(settings.logo_ref.as_deref(), Some("logo.png"));
        assert!(settings.apply(SettingsPatch {
            logo_ref: Some(None)
        }));
        assert_eq!(settings.logo_ref, None);
    }
}
