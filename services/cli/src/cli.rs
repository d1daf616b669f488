use crate::commands::{
    run_export, run_matches, run_reset, run_roster, run_settings, run_status, ExportArgs,
    MatchesArgs, RosterCommand, SettingsArgs,
};
use crate::infra::Context;
use crate::stage::{run_draw, DrawArgs};
use clap::{Parser, Subcommand};
use parrainage::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "parrainage",
    about = "Run the godparent draw ceremony and manage its roster from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show roster counts, pending pairings and settings (default command)
    Status,
    /// Inspect or edit the roster
    Roster {
        #[command(subcommand)]
        command: RosterCommand,
    },
    /// Run the animated draw for the next pairing
    Draw(DrawArgs),
    /// List committed pairings
    Matches(MatchesArgs),
    /// Write the pairing report as CSV
    Export(ExportArgs),
    /// Update the ceremony settings
    Settings(SettingsArgs),
    /// Restore the seed roster and delete every pairing
    Reset {
        /// Confirm the reset; nothing is deleted without it
        #[arg(long)]
        yes: bool,
    },
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Status);
    let context = Context::load()?;

    match command {
        Command::Status => run_status(&context),
        Command::Roster { command } => run_roster(&context, command),
        Command::Draw(args) => run_draw(&context, args).await,
        Command::Matches(args) => run_matches(&context, args),
        Command::Export(args) => run_export(&context, args),
        Command::Settings(args) => run_settings(&context, args),
        Command::Reset { yes } => run_reset(&context, yes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RosterCommand;
    use parrainage::ceremony::ClassName;

    #[test]
    fn draw_flags_parse() {
        let cli = Cli::try_parse_from(["parrainage", "draw", "--all", "--fast"]).expect("parses");
        match cli.command {
            Some(Command::Draw(args)) => assert!(args.all && args.fast),
            other => panic!("expected draw command, got {other:?}"),
        }
    }

    #[test]
    fn photo_import_requires_a_class() {
        assert!(Cli::try_parse_from(["parrainage", "roster", "import", "photos/"]).is_err());

        let cli = Cli::try_parse_from([
            "parrainage",
            "roster",
            "import",
            "--class",
            "lp 2 upaf",
            "photos/",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Roster {
                command: RosterCommand::Import(args),
            }) => assert_eq!(args.class, Some(ClassName::Lp2Upaf)),
            other => panic!("expected roster import, got {other:?}"),
        }
    }

    #[test]
    fn csv_import_needs_no_class() {
        let cli = Cli::try_parse_from(["parrainage", "roster", "import", "--csv", "roster.csv"])
            .expect("parses");
        assert!(matches!(
            cli.command,
            Some(Command::Roster {
                command: RosterCommand::Import(_)
            })
        ));
    }

    #[test]
    fn missing_subcommand_defaults_to_status() {
        let cli = Cli::try_parse_from(["parrainage"]).expect("parses");
        assert!(cli.command.is_none());
    }
}
