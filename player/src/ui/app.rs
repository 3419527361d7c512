use crate::app::{App, FormField, LoginField, SettingsField};
use crate::ui::components::*;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use signage_core::{PlaybackState, RenderKind, classify};
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

fn title_bar(f: &mut Frame, title: &str, subtitle: &str, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", title))
        .title_alignment(Alignment::Center)
        .style(Style::default().bg(Color::Black));

    let text = Paragraph::new(Text::from(subtitle.to_string()))
        .block(block)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center);

    f.render_widget(text, area);
}

fn hint_bar(f: &mut Frame, hints: &str, area: Rect) {
    let bar = Paragraph::new(Text::from(hints.to_string()))
        .style(Style::default().fg(Color::DarkGray).bg(Color::Black))
        .alignment(Alignment::Center);
    f.render_widget(bar, area);
}

fn three_rows(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(2),    // Content
            Constraint::Length(1), // Key hints
        ])
        .split(area)
}

/// Draw the channel list with the primary call-to-action
pub fn draw_main_menu_view(f: &mut Frame, app: &App, area: Rect) {
    f.render_widget(Block::default().style(Style::default().bg(Color::Black)), area);
    let chunks = three_rows(area);
    title_bar(f, &app.config.brand, "Select a channel and press Enter", chunks[0]);

    if app.loading {
        let spinner = get_spinner_frame(app.started_at.elapsed().as_millis());
        let loading = Paragraph::new(format!("{spinner} Loading channels..."))
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(loading, centered_rect(60, 20, chunks[1]));
    } else if app.channels.is_empty() {
        let empty = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                "No video configured",
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press Enter or s to add a YouTube, Cloudinary or direct video link"),
        ]))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        f.render_widget(empty, centered_rect(70, 30, chunks[1]));
    } else {
        let items: Vec<ListItem> = app
            .channels
            .iter()
            .enumerate()
            .map(|(i, channel)| {
                let number = if i < 9 { format!("{} ", i + 1) } else { "  ".to_string() };
                let provider = classify(&channel.url);
                let mut spans = vec![
                    Span::styled(number, Style::default().fg(Color::DarkGray)),
                    Span::styled(
                        if i == 0 { "▶ PLAY  " } else { "▶ " },
                        Style::default().fg(Color::Green),
                    ),
                    Span::styled(channel.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  [{provider}]"), Style::default().fg(Color::Cyan)),
                ];
                if channel.loop_enabled {
                    spans.push(Span::styled("  ⟳", Style::default().fg(Color::DarkGray)));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Channels ({}) ", app.channels.len())),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(app.selected));
        f.render_stateful_widget(list, chunks[1], &mut state);
    }

    hint_bar(
        f,
        "Enter: play | s: settings | a: admin | r: reload | F1: help | Ctrl+Q: quit",
        chunks[2],
    );
}

/// Draw the player view for the current playback state
pub fn draw_player_view(f: &mut Frame, app: &App, area: Rect) {
    f.render_widget(Block::default().style(Style::default().bg(Color::Black)), area);
    let chunks = three_rows(area);
    let title = app
        .active
        .as_ref()
        .map(|r| r.title.as_str())
        .unwrap_or("Player");
    title_bar(f, title, &app.config.brand, chunks[0]);

    let source = app.playback.source();
    let mut lines = Vec::new();
    let (hints, border) = match app.playback.state() {
        PlaybackState::Idle => {
            lines.push(Line::from("Nothing playing"));
            ("Esc: back", Color::DarkGray)
        }
        PlaybackState::Loading => {
            let spinner = get_spinner_frame(app.started_at.elapsed().as_millis());
            lines.push(Line::from(Span::styled(
                format!("{spinner} Loading video..."),
                Style::default().fg(Color::Yellow),
            )));
            ("Esc/x: stop", Color::Yellow)
        }
        PlaybackState::Playing => {
            lines.push(Line::from(Span::styled(
                "▶ Now playing",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
            ("Esc/x: stop", Color::Green)
        }
        PlaybackState::Error(e) => {
            lines.push(Line::from(Span::styled(
                "Unable to play video",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                e.to_string(),
                Style::default().fg(Color::Red),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from("Check the link in settings or try again."));
            ("r: retry | s: settings | Esc: back", Color::Red)
        }
    };

    if let Some(source) = source {
        let kind = match source.kind {
            RenderKind::EmbeddedFrame => "embedded player",
            RenderKind::NativeVideo => "native video",
        };
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Source: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{} ({})", source.provider, kind)),
        ]));
        lines.push(Line::from(vec![
            Span::styled("Loop: ", Style::default().fg(Color::DarkGray)),
            Span::raw(if source.looping { "on" } else { "off" }),
        ]));
        let url_width = chunks[1].width.saturating_sub(12) as usize;
        lines.push(Line::from(vec![
            Span::styled("URL: ", Style::default().fg(Color::DarkGray)),
            Span::raw(truncate(&source.url, url_width)),
        ]));
    }

    let panel = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(panel, centered_rect(80, 60, chunks[1]));

    hint_bar(f, hints, chunks[2]);
}

/// Draw the single-source settings form
pub fn draw_settings_view(f: &mut Frame, app: &App, area: Rect) {
    f.render_widget(Block::default().style(Style::default().bg(Color::Black)), area);
    let chunks = three_rows(area);
    title_bar(f, "Settings", "Video source for this display", chunks[0]);

    let form = &app.settings_form;
    let url_field = InputField::new("YouTube, Cloudinary or direct video link", &form.url)
        .focused(form.field == SettingsField::Url)
        .error(form.error.as_deref());

    let body = centered_rect(80, 80, chunks[1]);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(url_field.height()),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(body);

    f.render_widget(url_field, rows[0]);
    f.render_widget(
        Toggle::new("Loop video", form.loop_enabled).focused(form.field == SettingsField::Loop),
        rows[2],
    );

    hint_bar(
        f,
        "Tab: next field | Space: toggle loop | Enter: save | Ctrl+U: clear | Esc: cancel",
        chunks[2],
    );
}

/// Draw the admin surface: login, list, form or delete confirmation
pub fn draw_admin_view(f: &mut Frame, app: &App, area: Rect) {
    f.render_widget(Block::default().style(Style::default().bg(Color::Black)), area);
    let chunks = three_rows(area);
    title_bar(f, "Admin", &app.store.describe(), chunks[0]);

    if app.needs_login() {
        draw_login(f, app, chunks[1]);
        hint_bar(f, "Tab: next field | Enter: sign in | Esc: back", chunks[2]);
        return;
    }

    draw_record_list(f, app, chunks[1]);

    if let Some(form) = &app.admin.form {
        let popup = centered_rect(80, 70, chunks[1]);
        f.render_widget(Clear, popup);
        let title = if form.editing.is_some() { " Edit video " } else { " New video " };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title)
            .style(Style::default().bg(Color::Black));
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let title_field = InputField::new("Title", &form.title).focused(form.field == FormField::Title);
        let url_field = InputField::new("Video link or embed code", &form.url)
            .focused(form.field == FormField::Url)
            .error(form.error.as_deref());
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(url_field.height()),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);
        f.render_widget(title_field, rows[0]);
        f.render_widget(url_field, rows[1]);
        f.render_widget(
            Toggle::new("Loop", form.loop_enabled).focused(form.field == FormField::Loop),
            rows[2],
        );
        if app.admin.saving {
            let spinner = get_spinner_frame(app.started_at.elapsed().as_millis());
            f.render_widget(
                Paragraph::new(format!("{spinner} Saving...")).style(Style::default().fg(Color::Yellow)),
                rows[3],
            );
        }
        hint_bar(f, "Tab: next field | Space: toggle loop | Enter: save | Esc: cancel", chunks[2]);
        return;
    }

    if let Some(id) = &app.admin.confirm_delete {
        let title = app
            .admin
            .records
            .iter()
            .find(|r| &r.id == id)
            .map(|r| r.title.as_str())
            .unwrap_or(id.as_str());
        let popup = centered_rect(50, 20, chunks[1]);
        f.render_widget(Clear, popup);
        let confirm = Paragraph::new(Text::from(vec![
            Line::from(format!("Delete \"{title}\"?")),
            Line::from(""),
            Line::from(Span::styled("y: delete | n: keep", Style::default().fg(Color::Yellow))),
        ]))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Confirm ")
                .style(Style::default().bg(Color::Black)),
        );
        f.render_widget(confirm, popup);
    }

    let hints = if app.store.requires_auth() {
        "n: new | e: edit | d: delete | r: reload | l: sign out | Esc: back"
    } else {
        "n: new | e: edit | d: delete | r: reload | Esc: back"
    };
    hint_bar(f, hints, chunks[2]);
}

fn draw_record_list(f: &mut Frame, app: &App, area: Rect) {
    if app.admin.records.is_empty() {
        let empty = Paragraph::new("No videos yet. Press n to add one.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Videos "));
        f.render_widget(empty, area);
        return;
    }

    let url_width = (area.width as usize).saturating_sub(40).max(10);
    let items: Vec<ListItem> = app
        .admin
        .records
        .iter()
        .map(|record| {
            let processing = app.admin.processing.as_deref() == Some(record.id.as_str());
            let style = if processing {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            let mut spans = vec![
                Span::styled(record.title.clone(), style.add_modifier(Modifier::BOLD)),
                Span::raw("  "),
                Span::styled(truncate(&record.url, url_width), style.fg(Color::Cyan)),
            ];
            if record.loop_enabled {
                spans.push(Span::styled("  loop", style.fg(Color::DarkGray)));
            }
            if processing {
                spans.push(Span::styled("  deleting...", Style::default().fg(Color::Yellow)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Videos ({}) ", app.admin.records.len())),
        )
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("» ");

    let mut state = ListState::default();
    state.select(Some(app.admin.selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_login(f: &mut Frame, app: &App, area: Rect) {
    let login = &app.admin.login;
    let body = centered_rect(60, 60, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(body);

    f.render_widget(
        Paragraph::new("Sign in to manage videos").alignment(Alignment::Center),
        rows[0],
    );
    f.render_widget(
        InputField::new("Email", &login.email).focused(login.field == LoginField::Email),
        rows[1],
    );
    f.render_widget(
        InputField::new("Password", &login.password)
            .masked(true)
            .focused(login.field == LoginField::Password),
        rows[2],
    );
    if app.pending.is_some() {
        let spinner = get_spinner_frame(app.started_at.elapsed().as_millis());
        f.render_widget(
            Paragraph::new(format!("{spinner} Signing in...")).style(Style::default().fg(Color::Yellow)),
            rows[3],
        );
    } else if let Some(error) = &login.error {
        f.render_widget(
            Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
            rows[3],
        );
    }
}

/// Draw a status message near the bottom of the screen
pub fn draw_status_message(f: &mut Frame, message: &str, color: Color, age: Duration, max_age: Duration) {
    let status_message = StatusMessage::new(message, color, age).max_age(max_age);

    let area = f.area();
    let message_width = message.width() as u16 + 4;
    let message_area = Rect {
        x: area.x + (area.width.saturating_sub(message_width)) / 2,
        y: area.y + area.height.saturating_sub(5),
        width: message_width.min(area.width),
        height: 3.min(area.height),
    };

    f.render_widget(status_message, message_area);
}

/// Draw command prompt
pub fn draw_command_prompt(f: &mut Frame, command: &str) {
    let full = f.area();
    let area = Rect::new(0, full.height.saturating_sub(3), full.width, 3.min(full.height));
    f.render_widget(Clear, area);

    let prompt_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));
    let inner_area = prompt_block.inner(area);
    f.render_widget(prompt_block, area);

    let command_para = Paragraph::new(Text::from(format!(":{}", command)))
        .style(
            Style::default()
                .fg(Color::Yellow)
                .bg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Left);
    f.render_widget(command_para, inner_area);

    f.set_cursor_position((inner_area.x + 1 + command.width() as u16, inner_area.y));
}

/// Draw help dialog
pub fn draw_help_dialog(f: &mut Frame, show_admin: bool) {
    let area = centered_rect(60, 70, f.area());
    f.render_widget(HelpOverlay::new(show_admin), area);
}

/// Helper function to create a centered rect using up certain percentage of the available rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
