//! REPL command implementation

use super::{Outcome, Session};
use crate::config::Config;
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::IsTerminal;
use titan_runtime::{ReplCore, RunOptions};

const PROMPT: &str = "> ";

/// Run the interactive REPL
///
/// Ends on `:quit`, on EOF, or at the first line that reports diagnostics.
pub fn run(session: &Session, config: &Config) -> Result<Outcome> {
    let mut rl = DefaultEditor::new()?;
    let mut repl = new_core(session);

    let history_path = if config.no_history {
        None
    } else {
        config.get_history_path()
    };
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path); // Missing on first use
    }

    let interactive = std::io::stdin().is_terminal();
    if interactive {
        println!("Titan v{} REPL", titan_runtime::VERSION);
        println!("Type statements, or :quit to exit");
        println!();
    }

    let outcome = loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == ":quit" || trimmed == ":q" {
                    break Outcome::Success;
                }

                if trimmed == ":reset" {
                    repl = new_core(session);
                    println!("REPL state reset");
                    continue;
                }

                if trimmed == ":help" || trimmed == ":h" {
                    print_help();
                    continue;
                }

                if ReplCore::is_blank(&line) {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if let Err(diagnostics) = repl.eval_line(&line) {
                    session.report(diagnostics, Some(&line));
                    break Outcome::Failed;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                println!("Use :quit or :q to exit");
            }
            Err(ReadlineError::Eof) => break Outcome::Success,
            Err(err) => {
                save_history(&mut rl, history_path.as_deref());
                return Err(err.into());
            }
        }
    };

    save_history(&mut rl, history_path.as_deref());
    tracing::debug!(lines = repl.line_count(), "repl finished");
    Ok(outcome)
}

fn new_core(session: &Session) -> ReplCore {
    ReplCore::with_runtime(session.runtime(RunOptions::interactive(session.analyze)))
}

fn save_history(rl: &mut DefaultEditor, path: Option<&std::path::Path>) {
    if let Some(path) = path {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = rl.save_history(path) {
            tracing::warn!(error = %e, path = %path.display(), "failed to save history");
        }
    }
}

/// Print help information
fn print_help() {
    println!("Titan REPL Commands:");
    println!("  :quit, :q         Exit the REPL");
    println!("  :reset            Clear all variables and functions");
    println!("  :help, :h         Show this help message");
    println!();
    println!("Each line is parsed and run as its own unit. Declarations persist.");
    println!("Examples:");
    println!("  > let x: u8 = 42;");
    println!("  > fn double(n: u16) -> u16 {{ return n * 2; }}");
    println!("  > puts(double(x));");
}
