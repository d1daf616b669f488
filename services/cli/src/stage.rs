use crate::infra::Context;
use clap::Args;
use parrainage::ceremony::{
    Ceremony, DrawPhase, JsonDirectoryStore, Person, Role, SessionStep, SessionTimings,
    StartOutcome,
};
use parrainage::error::AppError;
use std::io::{self, Write};
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

#[derive(Args, Debug, Default)]
pub(crate) struct DrawArgs {
    /// Keep drawing until every rule is exhausted
    #[arg(long)]
    pub(crate) all: bool,
    /// Skip the stage pacing and use short pauses
    #[arg(long)]
    pub(crate) fast: bool,
}

/// Drives the session clock and renders each step on the terminal.
pub(crate) async fn run_draw(context: &Context, args: DrawArgs) -> Result<(), AppError> {
    let timings = if args.fast {
        SessionTimings::rehearsal()
    } else {
        context.config.draw.timings()
    };
    let mut ceremony = context.open_with(timings)?;

    let mut drawn = 0usize;
    loop {
        let outcome = if drawn == 0 {
            ceremony.start_round()?
        } else {
            ceremony.next_round()?
        };
        match outcome {
            StartOutcome::Started { rule } => {
                println!("\n=== Tirage {} ===", rule);
                println!("  {}...", timings.countdown_from);
            }
            StartOutcome::CeremonyComplete => {
                println!("Tous les parrainages ont été tirés.");
                break;
            }
        }

        if !play_round(&mut ceremony, timings).await? {
            break;
        }
        drawn += 1;
        if !args.all {
            break;
        }
    }

    info!(drawn, total = ceremony.matches().len(), "draw session finished");
    Ok(())
}

/// `Ok(true)` when the round committed a pairing.
async fn play_round(
    ceremony: &mut Ceremony<JsonDirectoryStore>,
    timings: SessionTimings,
) -> Result<bool, AppError> {
    let mut clock = interval(timings.tick_interval);
    clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        clock.tick().await;
        match ceremony.tick()? {
            SessionStep::Idle => return Ok(false),
            SessionStep::Waiting | SessionStep::CommitDue(_) => {}
            SessionStep::CountdownChanged(0) => println!("  C'est parti !"),
            SessionStep::CountdownChanged(count) => println!("  {count}..."),
            SessionStep::PhaseChanged(phase) => render_phase(phase),
            SessionStep::Shuffled { role, candidate } => render_shuffle(role, &candidate),
            SessionStep::Locked { role, winner } => {
                print!("\r");
                println!("  {:<8} {:<40}", format!("{}:", role.label()), describe(&winner));
            }
            SessionStep::Committed(entry) => {
                println!(
                    "  Parrainage : {} -> {}",
                    describe(&entry.mentee),
                    describe(&entry.mentor)
                );
                return Ok(true);
            }
            SessionStep::Aborted(err) => {
                eprintln!("  Tirage annulé : {err}");
                return Ok(false);
            }
        }
    }
}

fn render_phase(phase: DrawPhase) {
    match phase {
        DrawPhase::Reveal => println!("  Et voici le duo !"),
        DrawPhase::Handshake => println!("  Poignée de main..."),
        DrawPhase::Idle
        | DrawPhase::Countdown
        | DrawPhase::RevealingMentee
        | DrawPhase::TransitionPause
        | DrawPhase::RevealingMentor
        | DrawPhase::Finished => {}
    }
}

fn render_shuffle(role: Role, candidate: &Person) {
    print!(
        "\r  {:<8} {:<40}",
        format!("{}:", role.label()),
        candidate.name
    );
    let _ = io::stdout().flush();
}

fn describe(person: &Person) -> String {
    format!("{} ({})", person.name, person.class_name)
}
