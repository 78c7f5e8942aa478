use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use crate::assistant::Assistant;
use crate::characters::{Character, CharacterClient};
use crate::conversation::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Which input box editing keystrokes go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Search,
    Ask,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub edit_target: EditTarget,

    // Character index state
    pub characters: Vec<Character>,
    pub list_state: ListState,
    pub page: i64,
    pub pages: i64,
    pub total: i64,
    pub search_input: String,
    pub active_search: Option<String>,
    pub status_line: Option<String>,

    // Tortoise widget state
    pub widget_open: bool,
    pub assistant: Assistant,
    pub ask_cursor: usize, // cursor position in the draft, in chars
    pub chat_scroll: u16,
    pub chat_height: u16, // inner chat area size, updated during render
    pub chat_width: u16,
    pub animation_frame: u8, // 0-2 for ellipsis animation
    pub transcript_events: mpsc::UnboundedReceiver<Snapshot>,

    client: CharacterClient,
}

impl App {
    pub fn new(client: CharacterClient, mut assistant: Assistant) -> Self {
        let transcript_events = assistant.subscribe();
        let mut list_state = ListState::default();
        list_state.select(Some(0));

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            edit_target: EditTarget::Search,

            characters: Vec::new(),
            list_state,
            page: 1,
            pages: 0,
            total: 0,
            search_input: String::new(),
            active_search: None,
            status_line: None,

            widget_open: false,
            assistant,
            ask_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            transcript_events,

            client,
        }
    }

    pub fn selected_character(&self) -> Option<&Character> {
        self.list_state.selected().and_then(|i| self.characters.get(i))
    }

    /// Context string the widget sends along with a question, when a
    /// character is on screen.
    pub fn widget_context(&self) -> Option<String> {
        self.selected_character().map(|character| character.summary())
    }

    pub async fn load_page(&mut self, page: i64) {
        let result = match &self.active_search {
            Some(name) => self.client.search(name, page).await,
            None => self.client.list(page).await,
        };

        match result {
            Ok((characters, info)) => {
                self.characters = characters;
                self.page = page;
                self.pages = info.pages;
                self.total = info.count;
                self.status_line = None;
                self.list_state
                    .select(if self.characters.is_empty() { None } else { Some(0) });
            }
            Err(err) => {
                self.status_line = Some(format!("Failed to load characters: {}", err));
            }
        }
    }

    pub async fn next_page(&mut self) {
        if self.page < self.pages {
            let page = self.page + 1;
            self.load_page(page).await;
        }
    }

    pub async fn prev_page(&mut self) {
        if self.page > 1 {
            let page = self.page - 1;
            self.load_page(page).await;
        }
    }

    pub async fn run_search(&mut self) {
        let query = self.search_input.trim().to_string();
        if query.is_empty() {
            return;
        }
        self.active_search = Some(query.clone());
        self.load_page(1).await;
        if self.characters.is_empty() && self.status_line.is_none() {
            self.status_line = Some(format!("No characters match \"{}\"", query));
        }
    }

    pub async fn clear_search(&mut self) {
        if self.active_search.take().is_some() {
            self.search_input.clear();
            self.load_page(1).await;
        }
    }

    // List navigation
    pub fn nav_down(&mut self) {
        let len = self.characters.len();
        if len > 0 {
            let i = self.list_state.selected().unwrap_or(0);
            self.list_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn nav_up(&mut self) {
        let i = self.list_state.selected().unwrap_or(0);
        self.list_state.select(Some(i.saturating_sub(1)));
    }

    pub fn nav_first(&mut self) {
        if !self.characters.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn nav_last(&mut self) {
        let len = self.characters.len();
        if len > 0 {
            self.list_state.select(Some(len - 1));
        }
    }

    /// Open or close the tortoise panel. The transcript and any in-flight
    /// request belong to the assistant and survive the toggle.
    pub fn toggle_widget(&mut self) {
        self.widget_open = !self.widget_open;
        if !self.widget_open && self.input_mode == InputMode::Editing
            && self.edit_target == EditTarget::Ask
        {
            self.input_mode = InputMode::Normal;
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.assistant.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat so the latest entry (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            40
        };

        let mut total_lines: u16 = 0;
        for message in self.assistant.conversation().messages() {
            total_lines += 1; // role line
            for line in message.content.lines() {
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // blank line after message
        }

        if self.assistant.is_sending() {
            total_lines += 2; // role line + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }
}
