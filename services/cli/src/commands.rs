use crate::infra::{expand_paths, Context};
use chrono::Local;
use clap::{Args, Subcommand};
use parrainage::ceremony::{
    ClassName, MatchReport, Person, PersonId, PhotoImporter, Role, SettingsPatch,
};
use parrainage::error::AppError;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Subcommand, Debug)]
pub(crate) enum RosterCommand {
    /// List everyone on the roster, grouped by class
    List {
        /// Only show people still waiting for a pairing
        #[arg(long)]
        available: bool,
        /// Print the roster as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a single person
    Add(AddArgs),
    /// Remove a person by id
    Remove {
        /// Roster id of the person to remove
        id: String,
    },
    /// Import people from class photos or a roster CSV
    Import(ImportArgs),
}

#[derive(Args, Debug)]
pub(crate) struct AddArgs {
    /// Display name
    #[arg(long)]
    pub(crate) name: String,
    /// Class label, e.g. "BTS 1" or "LP 2 UPAF"
    #[arg(long)]
    pub(crate) class: ClassName,
    /// Photo path or URL
    #[arg(long, default_value = "")]
    pub(crate) photo: String,
    /// Explicit id (generated when omitted)
    #[arg(long)]
    pub(crate) id: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Class assigned to every imported photo
    #[arg(long, required_unless_present = "csv")]
    pub(crate) class: Option<ClassName>,
    /// Roster CSV with name,class[,photo][,id] columns
    #[arg(long, conflicts_with = "paths")]
    pub(crate) csv: Option<PathBuf>,
    /// Photo files or directories of photos
    pub(crate) paths: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct MatchesArgs {
    /// Print the pairings as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Destination file (defaults to parrainage_<date>.csv)
    #[arg(long, short)]
    pub(crate) output: Option<PathBuf>,
    /// Write to stdout instead of a file
    #[arg(long, conflicts_with = "output")]
    pub(crate) stdout: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SettingsArgs {
    /// Logo shown on the ceremony screen
    #[arg(long, conflicts_with = "clear_logo")]
    pub(crate) logo: Option<String>,
    /// Remove the configured logo
    #[arg(long)]
    pub(crate) clear_logo: bool,
}

pub(crate) fn run_status(context: &Context) -> Result<(), AppError> {
    let ceremony = context.open()?;
    let roster = ceremony.roster();
    let matched = roster.people().iter().filter(|p| p.is_matched()).count();

    println!("Parrainage ceremony status");
    println!(
        "- {} people on the roster ({} matched, {} waiting)",
        roster.len(),
        matched,
        roster.len() - matched
    );
    println!("- {} pairings committed", ceremony.matches().len());
    match &ceremony.settings().logo_ref {
        Some(logo) => println!("- Logo: {logo}"),
        None => println!("- Logo: none"),
    }

    println!("Pairing rules (in draw order):");
    for pending in ceremony.pending() {
        let marker = if pending.is_drawable() { "ready" } else { "done" };
        println!(
            "  - {}: {} filleul(s) / {} parrain(s) available [{}]",
            pending.rule, pending.mentees, pending.mentors, marker
        );
    }

    match ceremony.next_pairing() {
        Some(plan) => println!("Next draw: {}", plan.rule),
        None => println!("Every pairing has been drawn."),
    }
    Ok(())
}

pub(crate) fn run_roster(context: &Context, command: RosterCommand) -> Result<(), AppError> {
    match command {
        RosterCommand::List { available, json } => list_roster(context, available, json),
        RosterCommand::Add(args) => add_person(context, args),
        RosterCommand::Remove { id } => remove_person(context, id),
        RosterCommand::Import(args) => import_people(context, args),
    }
}

fn list_roster(context: &Context, available_only: bool, json: bool) -> Result<(), AppError> {
    let ceremony = context.open()?;
    let people: Vec<&Person> = ceremony
        .roster()
        .people()
        .iter()
        .filter(|person| !available_only || !person.is_matched())
        .collect();

    if json {
        let payload = serde_json::to_string_pretty(&people)
            .map_err(|err| AppError::Io(io::Error::new(io::ErrorKind::Other, err)))?;
        println!("{payload}");
        return Ok(());
    }

    for class_name in ClassName::ordered() {
        let members: Vec<&&Person> = people
            .iter()
            .filter(|person| person.class_name == class_name)
            .collect();
        if members.is_empty() {
            continue;
        }
        println!("{} ({})", class_name, class_name.role().label());
        for person in members {
            let status = if person.is_matched() { "matched" } else { "waiting" };
            println!("  - [{}] {} ({})", person.id, person.name, status);
        }
    }
    Ok(())
}

fn add_person(context: &Context, args: AddArgs) -> Result<(), AppError> {
    let AddArgs {
        name,
        class,
        photo,
        id,
    } = args;
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Usage("name must not be empty".to_string()));
    }

    let id = id.map(PersonId::new).unwrap_or_else(PersonId::generate);
    let person = Person::new(id.clone(), name, photo, class);
    let role = person.role;

    let mut ceremony = context.open()?;
    ceremony.add_person(person)?;
    println!("Added {} to {} as {}", id, class, role.label());
    Ok(())
}

fn remove_person(context: &Context, id: String) -> Result<(), AppError> {
    let mut ceremony = context.open()?;
    match ceremony.remove_person(&PersonId::new(id.clone()))? {
        Some(person) => println!("Removed {} ({})", person.name, person.class_name),
        None => println!("No one with id {id} on the roster"),
    }
    Ok(())
}

fn import_people(context: &Context, args: ImportArgs) -> Result<(), AppError> {
    let ImportArgs { class, csv, paths } = args;

    let people = match (csv, class) {
        (Some(csv), _) => {
            let reader = BufReader::new(File::open(&csv)?);
            PhotoImporter::people_from_csv(reader)?
        }
        (None, Some(class_name)) => {
            if paths.is_empty() {
                return Err(AppError::Usage(
                    "give at least one photo file or directory".to_string(),
                ));
            }
            let import = PhotoImporter::people_from_paths(expand_paths(&paths)?, class_name);
            for skipped in &import.skipped {
                warn!(path = %skipped.display(), "skipped file that is not a photo");
            }
            import.people
        }
        (None, None) => {
            return Err(AppError::Usage(
                "--class is required when importing photos".to_string(),
            ))
        }
    };

    if people.is_empty() {
        println!("Nothing to import");
        return Ok(());
    }

    let mut ceremony = context.open()?;
    let added = ceremony.add_people(people)?;
    println!("Imported {added} people");
    Ok(())
}

pub(crate) fn run_matches(context: &Context, args: MatchesArgs) -> Result<(), AppError> {
    let ceremony = context.open()?;
    let entries = ceremony.matches().entries();

    if args.json {
        let payload = serde_json::to_string_pretty(entries)
            .map_err(|err| AppError::Io(io::Error::new(io::ErrorKind::Other, err)))?;
        println!("{payload}");
        return Ok(());
    }

    if entries.is_empty() {
        println!("No pairings yet");
        return Ok(());
    }
    let report = MatchReport::from_matches(entries, Local::now().date_naive());
    print!("{}", report.render_table());
    Ok(())
}

pub(crate) fn run_export(context: &Context, args: ExportArgs) -> Result<(), AppError> {
    let ceremony = context.open()?;
    let today = Local::now().date_naive();
    let report = MatchReport::from_matches(ceremony.matches().entries(), today);

    if args.stdout {
        report.write_csv(io::stdout().lock())?;
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("parrainage_{}.csv", today.format("%Y-%m-%d"))));
    report.write_csv(BufWriter::new(File::create(&output)?))?;
    info!(rows = report.rows.len(), path = %output.display(), "report exported");
    println!(
        "Wrote {} pairing(s) to {}",
        report.rows.len(),
        output.display()
    );
    Ok(())
}

pub(crate) fn run_settings(context: &Context, args: SettingsArgs) -> Result<(), AppError> {
    let logo_ref = match (args.logo, args.clear_logo) {
        (Some(logo), _) => Some(Some(logo)),
        (None, true) => Some(None),
        (None, false) => None,
    };

    let mut ceremony = context.open()?;
    if ceremony.update_settings(SettingsPatch { logo_ref })? {
        println!("Settings updated");
    } else {
        println!("Settings unchanged");
    }
    match &ceremony.settings().logo_ref {
        Some(logo) => println!("- Logo: {logo}"),
        None => println!("- Logo: none"),
    }
    Ok(())
}

pub(crate) fn run_reset(context: &Context, confirmed: bool) -> Result<(), AppError> {
    if !confirmed {
        return Err(AppError::Usage(
            "reset deletes every pairing; re-run with --yes to confirm".to_string(),
        ));
    }
    let mut ceremony = context.open()?;
    ceremony.reset_all()?;
    let mentors = ceremony
        .roster()
        .people()
        .iter()
        .filter(|person| person.role == Role::Mentor)
        .count();
    println!(
        "Roster restored: {} people ({} parrains), no pairings",
        ceremony.roster().len(),
        mentors
    );
    Ok(())
}
