use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crate::app::{App, EditTarget, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.assistant.poll_reply().await;
            // Each append lands here as a snapshot; follow the transcript
            while app.transcript_events.try_recv().is_ok() {
                app.scroll_chat_to_bottom();
            }
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key).await?,
        InputMode::Editing => handle_editing_mode(app, key).await?,
    }

    Ok(())
}

async fn handle_normal_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // List navigation
        KeyCode::Char('j') | KeyCode::Down => app.nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.nav_up(),
        KeyCode::Char('g') => app.nav_first(),
        KeyCode::Char('G') => app.nav_last(),

        // Pagination
        KeyCode::Char('n') | KeyCode::Right => app.next_page().await,
        KeyCode::Char('p') | KeyCode::Left => app.prev_page().await,

        // Search
        KeyCode::Char('/') => {
            app.edit_target = EditTarget::Search;
            app.input_mode = InputMode::Editing;
        }

        // Tortoise widget
        KeyCode::Char('a') => {
            if !app.widget_open {
                app.toggle_widget();
            }
            app.edit_target = EditTarget::Ask;
            app.input_mode = InputMode::Editing;
            app.ask_cursor = app.assistant.draft.chars().count();
        }
        KeyCode::Char('t') => app.toggle_widget(),

        // Chat scrolling while the widget is open
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if app.widget_open {
                app.chat_scroll = app.chat_scroll.saturating_add(app.chat_height / 2);
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if app.widget_open {
                app.chat_scroll = app.chat_scroll.saturating_sub(app.chat_height / 2);
            }
        }

        KeyCode::Esc => {
            if app.widget_open {
                app.toggle_widget();
            } else {
                app.clear_search().await;
            }
        }

        _ => {}
    }
    Ok(())
}

async fn handle_editing_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match app.edit_target {
        EditTarget::Search => handle_search_editing(app, key).await,
        EditTarget::Ask => handle_ask_editing(app, key),
    }
    Ok(())
}

async fn handle_search_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.run_search().await;
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Backspace => {
            app.search_input.pop();
        }
        KeyCode::Char(c) => {
            app.search_input.push(c);
        }
        _ => {}
    }
}

fn handle_ask_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            if !app.assistant.draft.trim().is_empty() && !app.assistant.is_sending() {
                let context = app.widget_context();
                app.assistant.submit_draft(context.as_deref());
                app.ask_cursor = 0;
                app.input_mode = InputMode::Normal;
                app.scroll_chat_to_bottom();
            }
        }
        KeyCode::Backspace => {
            if app.ask_cursor > 0 {
                app.ask_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.assistant.draft, app.ask_cursor);
                app.assistant.draft.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.assistant.draft.chars().count();
            if app.ask_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.assistant.draft, app.ask_cursor);
                app.assistant.draft.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.ask_cursor = app.ask_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.assistant.draft.chars().count();
            app.ask_cursor = (app.ask_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.ask_cursor = 0;
        }
        KeyCode::End => {
            app.ask_cursor = app.assistant.draft.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.assistant.draft, app.ask_cursor);
            app.assistant.draft.insert(byte_pos, c);
            app.ask_cursor += 1;
        }
        _ => {}
    }
}
