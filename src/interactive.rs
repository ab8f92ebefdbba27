//! Interactive terminal session
//!
//! Plain lines are submitted to the active category, lines starting with `:`
//! are commands. Completions are printed as they arrive.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::app::{EnhancerApp, StatusUpdate};
use crate::session::preview_line;

/// Width of result previews in `:history`
const PREVIEW_CHARS: usize = 80;

/// Read one line, replacing invalid UTF-8 instead of failing.
///
/// Returns `None` at end of input. Partially read bytes stay in `buf`, so the
/// call can be raced in `tokio::select!` and resumed with the same buffer.
pub async fn read_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let read = reader.read_until(b'\n', buf).await?;
    if read == 0 && buf.is_empty() {
        return Ok(None);
    }

    let line = String::from_utf8_lossy(buf)
        .trim_end_matches(['\n', '\r'])
        .to_string();
    if std::str::from_utf8(buf).is_err() {
        warn!("Input line was not valid UTF-8, invalid bytes replaced");
    }
    buf.clear();
    Ok(Some(line))
}

/// Run the session until `:quit` or end of input.
///
/// At end of input, requests still in flight are waited for and printed.
pub async fn run<R, W>(mut app: EnhancerApp, mut input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(
        out,
        "Category '{}' active. Type a prompt and press Enter, or :help.",
        app.active_category()
    )?;

    let mut buf = Vec::new();

    loop {
        tokio::select! {
            line = read_line_lossy(&mut input, &mut buf) => {
                let Some(line) = line? else { break };
                if !handle_line(&mut app, line.trim(), out)? {
                    app.shutdown();
                    return Ok(());
                }
            }
            Some(completion) = app.next_completion() => {
                let update = app.apply(completion);
                print_update(out, &update)?;
            }
        }
    }

    while let Some(completion) = app.next_completion().await {
        let update = app.apply(completion);
        print_update(out, &update)?;
    }
    app.shutdown();
    Ok(())
}

/// Handle one input line. Returns `false` when the user asked to quit.
pub fn handle_line<W: Write>(app: &mut EnhancerApp, line: &str, out: &mut W) -> io::Result<bool> {
    if line.is_empty() {
        return Ok(true);
    }

    let (command, argument) = match line.split_once(' ') {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };

    match command {
        ":quit" | ":q" => return Ok(false),
        ":help" => print_help(out)?,
        ":types" => {
            for key in app.store().categories() {
                let marker = if key == app.active_category() { '*' } else { ' ' };
                writeln!(out, "{} {}", marker, key)?;
            }
        }
        ":type" => match app.select_category(argument) {
            Ok(()) => {
                writeln!(out, "Category '{}' active. Ready.", app.active_category())?;
                print_log(out, app)?;
            }
            Err(e) => writeln!(out, "{}", e)?,
        },
        ":show" => print_log(out, app)?,
        ":history" => match app.result_history() {
            Some(results) if !results.is_empty() => {
                for (i, result) in results.iter().enumerate() {
                    writeln!(out, "{:>3}. {}", i + 1, preview_line(result, PREVIEW_CHARS))?;
                }
            }
            _ => writeln!(
                out,
                "No enhanced prompts in the category '{}'.",
                app.active_category()
            )?,
        },
        ":copy" => match app.last_result() {
            Some(text) => writeln!(out, "{}", text)?,
            None => writeln!(out, "No result to copy in this category.")?,
        },
        ":clear" => match app.clear_active() {
            Ok(()) => writeln!(out, "History for '{}' cleared.", app.active_category())?,
            Err(e) => writeln!(out, "{}", e)?,
        },
        ":export" => {
            if argument.is_empty() {
                writeln!(out, "Usage: :export <path>")?;
            } else {
                match app.export_active(Path::new(argument)) {
                    Ok(()) => writeln!(out, "History exported to {}", argument)?,
                    Err(e) => writeln!(out, "{}", e)?,
                }
            }
        }
        _ if command.starts_with(':') => {
            writeln!(out, "Unknown command {}, try :help", command)?
        }
        _ => match app.submit(line) {
            Ok(()) => writeln!(out, "Enhancing '{}' prompt...", app.active_category())?,
            Err(e) => writeln!(out, "{}", e)?,
        },
    }
    Ok(true)
}

fn print_update<W: Write>(out: &mut W, update: &StatusUpdate) -> io::Result<()> {
    match &update.result {
        Ok(text) => {
            writeln!(out, "Prompt '{}' enhanced successfully.", update.category)?;
            if update.is_active {
                writeln!(out, "Enhanced Result:\n{}\n", text)?;
            }
        }
        Err(e) => {
            writeln!(out, "Error in '{}': {}", update.category, e)?;
            if e.requires_user_action() {
                writeln!(out, "Check your input or API token before trying again.")?;
            } else if e.is_transient() {
                writeln!(out, "This may be temporary, try again shortly.")?;
            }
        }
    }
    Ok(())
}

fn print_log<W: Write>(out: &mut W, app: &EnhancerApp) -> io::Result<()> {
    if let Some(session) = app.active_session() {
        for entry in session.entries() {
            writeln!(out, "{}\n", entry.render())?;
        }
    }
    Ok(())
}

fn print_help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "Commands:
  <text>           enhance <text> with the active category
  :types           list categories
  :type <key>      switch category
  :show            show the active category's conversation
  :history         list past enhanced results
  :copy            print the last enhanced result
  :clear           clear the active category's history
  :export <path>   save the conversation to a text file
  :quit            exit"
    )
}
