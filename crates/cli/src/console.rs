//! Interactive run console.
//!
//! A tokio interval refreshes the timer while the run is going; each input
//! line is one user intent applied to the session.

use std::str::FromStr;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use smed_analysis::{build_dataset, AnalysisFilter, SortSpec};
use smed_core::{OperationId, OperatorId};
use smed_session::{Clock, Session, SessionError, StartOutcome};
use smed_storage::Storage;
use crate::display;

const HELP: &str = "\
Commands:
  start            start or resume (asks to confirm if preparation is incomplete)
  start!           start even if preparation is incomplete
  pause            pause the timer
  reset            stop and clear this session's results
  done <who>       complete the current step of an operator (id or name),
                   or a specific operation by id
  prep <op>        toggle a preparation operation
  status           timer, preparation and objectives
  lanes            operator lanes
  analyze          analysis table
  help             this list
  quit             leave";

/// One console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Start or resume
    Start {
        /// Skip the preparation check
        force: bool,
    },
    /// Pause
    Pause,
    /// Reset the run
    Reset,
    /// Complete a step
    Done(String),
    /// Toggle preparation readiness
    Prep(String),
    /// Show status
    Status,
    /// Show lanes
    Lanes,
    /// Show analysis
    Analyze,
    /// Show commands
    Help,
    /// Leave the console
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default().to_lowercase();
        let rest = parts.collect::<Vec<_>>().join(" ");
        let argument = |name: &str| {
            if rest.is_empty() {
                Err(format!("'{}' needs an argument", name))
            } else {
                Ok(rest.clone())
            }
        };

        match verb.as_str() {
            "start" => Ok(ConsoleCommand::Start { force: false }),
            "start!" => Ok(ConsoleCommand::Start { force: true }),
            "pause" => Ok(ConsoleCommand::Pause),
            "reset" => Ok(ConsoleCommand::Reset),
            "done" => argument("done").map(ConsoleCommand::Done),
            "prep" => argument("prep").map(ConsoleCommand::Prep),
            "status" => Ok(ConsoleCommand::Status),
            "lanes" => Ok(ConsoleCommand::Lanes),
            "analyze" => Ok(ConsoleCommand::Analyze),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            other => Err(format!("Unknown command '{}' (type 'help')", other)),
        }
    }
}

/// What the loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading
    Continue,
    /// Leave
    Quit,
}

/// Find an operator by id, or by name ignoring case.
pub fn resolve_operator<C: Clock>(session: &Session<C>, who: &str) -> Option<OperatorId> {
    let config = session.config();
    config
        .operators
        .iter()
        .find(|op| op.id.as_str() == who)
        .or_else(|| {
            config
                .operators
                .iter()
                .find(|op| op.name.to_lowercase() == who.to_lowercase())
        })
        .map(|op| op.id.clone())
}

/// Apply one command and return the text to print.
pub fn apply<C: Clock>(session: &mut Session<C>, command: ConsoleCommand) -> (Flow, String) {
    let text = match command {
        ConsoleCommand::Start { force } => {
            let outcome = if force { session.start_confirmed() } else { session.start() };
            match outcome {
                StartOutcome::Started => "Run started.".to_string(),
                StartOutcome::Resumed => {
                    format!("Run resumed at {}.", display::format_hms(session.elapsed_ms()))
                }
                StartOutcome::AlreadyRunning => "Already running.".to_string(),
                StartOutcome::NeedsConfirmation { pending } => {
                    let labels: Vec<String> = pending
                        .iter()
                        .map(|id| {
                            session
                                .config()
                                .find_operation(id)
                                .map(|op| op.operation.label.clone())
                                .unwrap_or_else(|| id.to_string())
                        })
                        .collect();
                    format!(
                        "Preparation incomplete ({}). Type 'start!' to start anyway.",
                        labels.join(", ")
                    )
                }
            }
        }
        ConsoleCommand::Pause => {
            if session.pause() {
                format!("Paused at {}.", display::format_hms(session.elapsed_ms()))
            } else {
                "Not running.".to_string()
            }
        }
        ConsoleCommand::Reset => {
            session.reset();
            "Run reset.".to_string()
        }
        ConsoleCommand::Done(who) => complete(session, &who),
        ConsoleCommand::Prep(op) => match session.toggle_preparation(&OperationId::from(op.as_str())) {
            Ok(ready) => {
                let progress = session.preparation_progress();
                format!(
                    "{} {} ({}/{} ready).",
                    op,
                    if ready { "ready" } else { "not ready" },
                    progress.ready,
                    progress.total
                )
            }
            Err(e) => e.to_string(),
        },
        ConsoleCommand::Status => display::render_status(session),
        ConsoleCommand::Lanes => display::render_lanes(&session.lanes()),
        ConsoleCommand::Analyze => {
            let dataset = build_dataset(
                session.config(),
                session.results(),
                session.last_run(),
                &AnalysisFilter::default(),
                SortSpec::default(),
            );
            display::render_analysis(&dataset)
        }
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => return (Flow::Quit, String::new()),
    };
    (Flow::Continue, text)
}

fn complete<C: Clock>(session: &mut Session<C>, who: &str) -> String {
    let result = match resolve_operator(session, who) {
        Some(operator) => session.complete_current_operation(&operator),
        None => session.complete_operation(&OperationId::from(who)),
    };
    match result {
        Ok(done) => {
            let label = session
                .config()
                .find_operation(&done.operation_id)
                .map(|op| op.operation.label.clone())
                .unwrap_or_else(|| done.operation_id.to_string());
            let mut text = format!(
                "{}: {} done in {}.",
                session.config().operator_name(&done.operator_id),
                label,
                display::format_hms(done.result.actual_ms)
            );
            if session.is_session_complete() {
                text.push_str(" All operations recorded; run archived.");
            }
            text
        }
        Err(SessionError::UnknownOperation(_)) => format!("No operator or operation named '{}'.", who),
        Err(e) => e.to_string(),
    }
}

/// Write the snapshot the session queued, if any. Failures are logged only.
async fn flush<C: Clock, S: Storage>(session: &mut Session<C>, storage: &mut S) {
    if let Some(snapshot) = session.take_pending_snapshot() {
        if let Err(e) = storage.save_state(&snapshot).await {
            warn!("Failed to save state: {}", e);
        }
    }
}

/// Run the console on stdin until `quit` or end of input.
pub async fn run<C: Clock, S: Storage>(mut session: Session<C>, storage: &mut S) -> Result<()> {
    println!("{}", HELP);
    println!();
    println!("{}", display::render_status(&session));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(session.options().tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick(), if session.run_state().running => {
                session.tick();
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let flow = match line.parse::<ConsoleCommand>() {
                    Ok(command) => {
                        let (flow, text) = apply(&mut session, command);
                        if !text.is_empty() {
                            println!("{}", text);
                        }
                        flow
                    }
                    Err(message) => {
                        println!("{}", message);
                        Flow::Continue
                    }
                };
                flush(&mut session, storage).await;
                if flow == Flow::Quit {
                    break;
                }
            }
        }
    }

    flush(&mut session, storage).await;
    info!("Console closed at {}", display::format_hms(session.tick()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smed_core::PersistedState;
    use smed_session::ManualClock;

    fn session() -> (Session<ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        let state = PersistedState::demo(chrono::Utc::now());
        (Session::new(state, clock.clone()), clock)
    }

    #[test]
    fn test_parse_commands() {
        let parse = |line: &str| line.parse::<ConsoleCommand>();
        assert_eq!(parse("start"), Ok(ConsoleCommand::Start { force: false }));
        assert_eq!(parse("START!"), Ok(ConsoleCommand::Start { force: true }));
        assert_eq!(parse("done op1"), Ok(ConsoleCommand::Done("op1".to_string())));
        assert_eq!(parse("done  Operator 2 "), Ok(ConsoleCommand::Done("Operator 2".to_string())));
        assert!("done".parse::<ConsoleCommand>().is_err());
        assert!("jump".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn test_start_asks_for_confirmation() {
        let (mut session, _clock) = session();
        let (_, text) = apply(&mut session, ConsoleCommand::Start { force: false });
        assert!(text.contains("start!"));
        assert!(!session.run_state().running);

        apply(&mut session, ConsoleCommand::Start { force: true });
        assert!(session.run_state().running);
    }

    #[test]
    fn test_done_by_name_and_by_operation() {
        let (mut session, clock) = session();
        apply(&mut session, ConsoleCommand::Start { force: true });
        clock.advance_ms(240_000);

        let (_, text) = apply(&mut session, ConsoleCommand::Done("operator 1".to_string()));
        assert!(text.contains("00:04:00"), "{text}");

        let (_, text) = apply(&mut session, ConsoleCommand::Done("p1_op2".to_string()));
        assert!(!text.contains("not the current step"), "{text}");
        assert_eq!(session.results().len(), 2);

        let (_, text) = apply(&mut session, ConsoleCommand::Done("nobody".to_string()));
        assert!(text.contains("No operator or operation"));
    }

    #[test]
    fn test_quit_stops_loop() {
        let (mut session, _clock) = session();
        assert_eq!(apply(&mut session, ConsoleCommand::Quit).0, Flow::Quit);
    }
}
