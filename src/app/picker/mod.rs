mod render;
mod session;

use std::io;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;

use self::render::draw_picker;
use self::session::PickerSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PickerOutcome {
    Pending,
    Chosen(usize),
    Cancelled,
}

/// Applies one key press to the cursor. `len` is the number of options.
pub(super) fn handle_key(list_state: &mut ListState, len: usize, code: KeyCode) -> PickerOutcome {
    if len == 0 {
        return PickerOutcome::Cancelled;
    }
    let current = list_state.selected().unwrap_or(0).min(len - 1);
    match code {
        KeyCode::Esc | KeyCode::Char('q') => return PickerOutcome::Cancelled,
        KeyCode::Enter => return PickerOutcome::Chosen(current),
        KeyCode::Up | KeyCode::Char('k') => list_state.select(Some(current.saturating_sub(1))),
        KeyCode::Down | KeyCode::Char('j') => list_state.select(Some((current + 1).min(len - 1))),
        KeyCode::Home => list_state.select(Some(0)),
        KeyCode::End => list_state.select(Some(len - 1)),
        _ => {}
    }
    PickerOutcome::Pending
}

/// Shows `options` full screen and returns the chosen index, or `None` when
/// the user backs out or there is nothing to choose from.
pub(super) fn pick(title: &str, options: &[String]) -> Result<Option<usize>> {
    if options.is_empty() {
        return Ok(None);
    }

    let mut session = PickerSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut list_state = ListState::default();
    list_state.select(Some(0));

    let outcome = loop {
        terminal.draw(|frame| draw_picker(frame, title, options, &mut list_state))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match handle_key(&mut list_state, options.len(), key.code) {
            PickerOutcome::Pending => {}
            done => break done,
        }
    };

    terminal.show_cursor()?;
    session.leave()?;
    Ok(match outcome {
        PickerOutcome::Chosen(index) => Some(index),
        PickerOutcome::Pending | PickerOutcome::Cancelled => None,
    })
}
