use std::collections::HashSet;

use super::domain::{ClassName, Person, PersonId, Role};

/// Ordered set of people keyed by id. Insertion order is preserved so that
/// availability queries are reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    people: Vec<Person>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("person '{0}' is already on the roster")]
    DuplicateId(PersonId),
    #[error("person '{0}' is not on the roster")]
    NotFound(PersonId),
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a roster from a snapshot, rejecting snapshots with repeated ids.
    pub fn from_people(people: Vec<Person>) -> Result<Self, RosterError> {
        let mut roster = Self::new();
        roster.add_batch(people)?;
        Ok(roster)
    }

    pub fn add(&mut self, person: Person) -> Result<(), RosterError> {
        if self.contains(&person.id) {
            return Err(RosterError::DuplicateId(person.id));
        }
        self.people.push(person);
        Ok(())
    }

    /// Appends every person or none of them.
    pub fn add_batch(&mut self, people: Vec<Person>) -> Result<usize, RosterError> {
        let mut incoming: HashSet<&PersonId> = HashSet::with_capacity(people.len());
        for person in &people {
            if self.contains(&person.id) || !incoming.insert(&person.id) {
                return Err(RosterError::DuplicateId(person.id.clone()));
            }
        }

        let added = people.len();
        self.people.extend(people);
        Ok(added)
    }

    /// Removing a matched person leaves committed matches untouched; they
    /// carry their own snapshots.
    pub fn remove(&mut self, id: &PersonId) -> Result<Person, RosterError> {
        let index = self
            .people
            .iter()
            .position(|person| &person.id == id)
            .ok_or_else(|| RosterError::NotFound(id.clone()))?;
        Ok(self.people.remove(index))
    }

    pub fn get(&self, id: &PersonId) -> Option<&Person> {
        self.people.iter().find(|person| &person.id == id)
    }

    pub fn contains(&self, id: &PersonId) -> bool {
        self.get(id).is_some()
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn available(&self, class_name: ClassName, role: Role) -> impl Iterator<Item = &Person> {
        self.people
            .iter()
            .filter(move |person| person.is_available_as(class_name, role))
    }

    /// Unmatched people of the class and role, in insertion order.
    pub fn list_available(&self, class_name: ClassName, role: Role) -> Vec<Person> {
        self.available(class_name, role).cloned().collect()
    }

    pub fn available_count(&self, class_name: ClassName, role: Role) -> usize {
        self.available(class_name, role).count()
    }

    pub(crate) fn mark_matched(&mut self, id: &PersonId) -> Result<&Person, RosterError> {
        let person = self
            .people
            .iter_mut()
            .find(|person| &person.id == id)
            .ok_or_else(|| RosterError::NotFound(id.clone()))?;
        person.set_matched();
        Ok(person)
    }

    pub fn reset(&mut self, seed: &Roster) {
        self.people.clone_from(&seed.people);
    }
}
