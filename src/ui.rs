use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, EditTarget, InputMode};
use crate::conversation::Role;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.widget_open {
        let [list_area, detail_area, tortoise_area] = Layout::horizontal([
            Constraint::Percentage(28),
            Constraint::Percentage(36),
            Constraint::Percentage(36),
        ])
        .areas(body_area);
        render_character_list(app, frame, list_area);
        render_character_detail(app, frame, detail_area);
        render_tortoise_panel(app, frame, tortoise_area);
    } else {
        let [list_area, detail_area] = Layout::horizontal([
            Constraint::Percentage(35),
            Constraint::Percentage(65),
        ])
        .areas(body_area);
        render_character_list(app, frame, list_area);
        render_character_detail(app, frame, detail_area);
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let page_indicator = if app.pages > 0 {
        format!(" {} characters, page {}/{}", app.total, app.page, app.pages)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" Citadel of N Factorials ", Style::default().fg(Color::Green).bold()),
        Span::styled(page_indicator, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_character_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let searching = app.input_mode == InputMode::Editing && app.edit_target == EditTarget::Search;

    let title = if searching {
        format!(" Search: {}_ ", app.search_input)
    } else if let Some(name) = &app.active_search {
        format!(" Results: {} ", name)
    } else {
        " Characters ".to_string()
    };

    let border_color = if searching { Color::Yellow } else { Color::Green };

    let items: Vec<ListItem> = app
        .characters
        .iter()
        .map(|character| {
            let status_color = match character.status.as_str() {
                "Alive" => Color::Green,
                "Dead" => Color::Red,
                _ => Color::DarkGray,
            };
            ListItem::new(Line::from(vec![
                Span::styled("● ", Style::default().fg(status_color)),
                Span::raw(character.name.clone()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Green)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_character_detail(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Detail ");

    let Some(character) = app.selected_character() else {
        let placeholder = Paragraph::new(Span::styled(
            "Select a character",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(placeholder, area);
        return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White);

    let mut lines = vec![
        Line::from(Span::styled(
            character.name.clone(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("{} - {}", character.status, character.species)),
        Line::default(),
        Line::from(vec![Span::styled("Gender    ", label), Span::styled(character.gender.clone(), value)]),
    ];

    if !character.kind.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Type      ", label),
            Span::styled(character.kind.clone(), value),
        ]));
    }

    lines.extend([
        Line::from(vec![
            Span::styled("Origin    ", label),
            Span::styled(character.origin.name.clone(), value),
        ]),
        Line::from(vec![
            Span::styled("Location  ", label),
            Span::styled(character.location.name.clone(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::styled("Episodes  ", label),
            Span::styled(character.episode.len().to_string(), value),
        ]),
        Line::default(),
        Line::from(Span::styled(character.image.clone(), Style::default().fg(Color::DarkGray))),
    ]);

    let detail = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(detail, area);
}

fn render_tortoise_panel(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Truth Tortoise ");

    let messages = app.assistant.conversation().snapshot();
    let chat_text = if messages.is_empty() && !app.assistant.is_sending() {
        Text::from(Span::styled(
            "Ask your first question to unlock the truth.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for message in messages.iter() {
            match message.role {
                Role::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(message.content.clone()));
                    lines.push(Line::default());
                }
                Role::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "Tortoise:",
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    )));
                    for line in message.content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                    lines.push(Line::default());
                }
            }
        }

        if app.assistant.is_sending() {
            lines.push(Line::from(Span::styled(
                "Tortoise:",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    // Ask input at the bottom
    let editing = app.input_mode == InputMode::Editing && app.edit_target == EditTarget::Ask;
    let input_border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Ask the tortoise (a) ");

    // Horizontal scroll keeps the cursor visible in a narrow box
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.ask_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .assistant
        .draft
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, input_area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    if let Some(status) = &app.status_line {
        let line = Paragraph::new(Span::styled(
            format!(" {} ", status),
            Style::default().bg(Color::Red).fg(Color::White),
        ));
        frame.render_widget(line, area);
        return;
    }

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<Span> = match app.input_mode {
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" nav ", label_style),
                Span::styled(" n/p ", key_style),
                Span::styled(" page ", label_style),
                Span::styled(" / ", key_style),
                Span::styled(" search ", label_style),
                Span::styled(" a ", key_style),
                Span::styled(" ask ", label_style),
                Span::styled(" t ", key_style),
                Span::styled(
                    if app.widget_open { " hide tortoise " } else { " tortoise " },
                    label_style,
                ),
            ];
            if app.widget_open {
                hints.extend(vec![
                    Span::styled(" C-d/C-u ", key_style),
                    Span::styled(" scroll chat ", label_style),
                ]);
            }
            hints.extend(vec![
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(
                match app.edit_target {
                    EditTarget::Search => " search ",
                    EditTarget::Ask => " send ",
                },
                label_style,
            ),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ],
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}
