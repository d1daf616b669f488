use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::domain::{ClassName, DomainError, Person, PersonId};

/// Turns `jean_kofi-2.JPG` into `Jean Kofi 2`.
///
/// Drops the last extension (a leading dot is not an extension), turns dashes
/// and underscores into spaces, trims, and upper-cases the first letter of
/// every word. Other letters keep their case.
pub fn display_name_from_filename(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(index) if index > 0 => &file_name[..index],
        _ => file_name,
    };
    let spaced = stem.replace(['-', '_'], " ");
    capitalize_words(spaced.trim())
}

fn capitalize_words(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphanumeric() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first_raw()
        .is_some_and(|mime| mime.starts_with("image/"))
}

#[derive(Debug, Default)]
pub struct PhotoImport {
    pub people: Vec<Person>,
    pub skipped: Vec<PathBuf>,
}

/// Builds roster entries from a folder of class photos.
pub struct PhotoImporter;

impl PhotoImporter {
    /// One person per image file, all in `class_name`, role taken from the
    /// class table. Non-image files and names that reduce to nothing are
    /// reported in `skipped`. The path itself becomes the photo reference.
    pub fn people_from_paths<I, P>(paths: I, class_name: ClassName) -> PhotoImport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut import = PhotoImport::default();

        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(display_name_from_filename)
                .filter(|name| !name.is_empty());

            match name {
                Some(name) if is_image(path) => import.people.push(Person::new(
                    PersonId::generate(),
                    name,
                    path.display().to_string(),
                    class_name,
                )),
                _ => import.skipped.push(path.to_path_buf()),
            }
        }

        import
    }

    /// Reads a `name,class[,photo][,id]` roster sheet.
    pub fn people_from_csv<R: Read>(reader: R) -> Result<Vec<Person>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut people = Vec::new();

        for (index, row) in csv_reader.deserialize::<RosterRow>().enumerate() {
            let row = row?;
            let class_name = row
                .class
                .parse::<ClassName>()
                .map_err(|source| ImportError::Class {
                    line: index + 2,
                    source,
                })?;
            if row.name.is_empty() {
                return Err(ImportError::MissingName { line: index + 2 });
            }

            let id = row.id.map(PersonId::new).unwrap_or_else(PersonId::generate);
            people.push(Person::new(
                id,
                row.name,
                row.photo.unwrap_or_default(),
                class_name,
            ));
        }

        Ok(people)
    }
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    name: String,
    class: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    photo: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    id: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid roster CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {source}")]
    Class {
        line: usize,
        #[source]
        source: DomainError,
    },
    #[error("line {line}: name is empty")]
    MissingName { line: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ceremony::domain::Role;
    use std::io::Cursor;

    #[test]
    fn display_names_follow_the_filename() {
        assert_eq!(display_name_from_filename("jean_kofi.jpg"), "Jean Kofi");
        assert_eq!(display_name_from_filename("awa-toure.final.png"), "Awa Toure.Final");
        assert_eq!(display_name_from_filename("  _marc-yao_ .jpeg"), "Marc Yao");
        assert_eq!(display_name_from_filename("McDo"), "McDo");
        assert_eq!(display_name_from_filename(".hidden"), ".Hidden");
        assert_eq!(display_name_from_filename("élodie_n'guessan.png"), "Élodie N'Guessan");
    }

    #[test]
    fn photo_import_assigns_class_role_and_skips_non_images() {
        let paths = ["photos/alice_dupont.jpg", "photos/notes.txt", "photos/marc-yao.PNG"];
        let import = PhotoImporter::people_from_paths(paths, ClassName::Bts2);

        let names: Vec<&str> = import.people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alice Dupont", "Marc Yao"]);
        assert!(import
            .people
            .iter()
            .all(|person| person.role == Role::Mentor && person.class_name == ClassName::Bts2));
        assert_eq!(import.people[0].photo_ref, "photos/alice_dupont.jpg");
        assert_ne!(import.people[0].id, import.people[1].id);
        assert_eq!(import.skipped, vec![PathBuf::from("photos/notes.txt")]);
    }

    #[test]
    fn csv_import_reads_rows_and_generates_missing_ids() {
        let csv = "name,class,photo,id\n\
                   Awa Touré,LP 1 AGITEL,,f4\n\
                   Fatou Sylla,lp2-agitel,https://example.test/fatou.png,\n";
        let people = PhotoImporter::people_from_csv(Cursor::new(csv)).expect("valid csv");

        assert_eq!(people.len(), 2);
        assert_eq!(people[0].id, PersonId::from("f4"));
        assert_eq!(people[0].role, Role::Mentee);
        assert_eq!(people[0].photo_ref, "");
        assert_eq!(people[1].class_name, ClassName::Lp2Agitel);
        assert_eq!(people[1].role, Role::Mentor);
        assert!(!people[1].id.as_str().is_empty());
    }

    #[test]
    fn csv_import_rejects_unknown_classes() {
        let csv = "name,class\nAlice,BTS 1\nBob,Terminale\n";
        match PhotoImporter::people_from_csv(Cursor::new(csv)) {
            Err(ImportError::Class { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected class error, got {other:?}"),
        }
    }
}
