//! Terminal rendering of the [`ViewState`].

use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use chrono::Local;
use colored::Colorize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::view::ViewState;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Repaint on every view change until cancelled or the monitor goes away.
pub async fn run(mut rx: watch::Receiver<ViewState>, cancel: CancellationToken) {
    let clear = std::io::stdout().is_terminal();
    loop {
        let frame = render_frame(&rx.borrow_and_update());
        paint(&frame, clear);
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
}

fn paint(frame: &str, clear: bool) {
    let mut out = std::io::stdout().lock();
    if clear {
        let _ = out.write_all(CLEAR_SCREEN.as_bytes());
    }
    let _ = out.write_all(frame.as_bytes());
    let _ = out.flush();
}

pub fn render_frame(view: &ViewState) -> String {
    let mut out = String::new();

    let dot = if view.blink_active {
        "●".red().bold().to_string()
    } else {
        " ".to_string()
    };
    let _ = writeln!(out, "Data Records {dot}");

    let last = view
        .last_update
        .map(|t| {
            t.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "—".to_string());
    let _ = writeln!(
        out,
        "Last Updated: {last}   Record Count: {}   [Enter] refresh",
        view.records.len()
    );
    let _ = writeln!(out);

    if view.is_loading {
        let _ = writeln!(out, "Loading data...");
        return out;
    }
    if view.is_error {
        let detail = view.last_error.as_deref().unwrap_or("unknown error");
        let _ = writeln!(out, "{}", format!("Error fetching data: {detail}").red());
        return out;
    }

    let id_w = view
        .records
        .iter()
        .map(|r| r.id.to_string().chars().count())
        .chain(std::iter::once(2))
        .max()
        .unwrap_or(2);
    let name_w = view
        .records
        .iter()
        .map(|r| r.name.chars().count())
        .chain(std::iter::once(4))
        .max()
        .unwrap_or(4);

    let _ = writeln!(out, "  {:<id_w$}  {:<name_w$}  Status", "ID", "Name");
    for rec in &view.records {
        let highlighted = view.is_highlighted(&rec.id);
        let marker = if highlighted { '*' } else { ' ' };
        let line = format!(
            "{marker} {:<id_w$}  {:<name_w$}  {}",
            rec.id.to_string(),
            rec.name,
            rec.status
        );
        if highlighted {
            let _ = writeln!(out, "{}", line.black().on_yellow());
        } else {
            let _ = writeln!(out, "{line}");
        }
    }
    out
}
