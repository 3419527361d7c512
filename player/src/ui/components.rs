use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::time::Duration;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display a status message with fade effect
pub struct StatusMessage<'a> {
    message: &'a str,
    color: Color,
    age: Duration,
    max_age: Duration,
}

impl<'a> StatusMessage<'a> {
    pub fn new(message: &'a str, color: Color, age: Duration) -> Self {
        Self {
            message,
            color,
            age,
            max_age: Duration::from_secs(4),
        }
    }

    pub fn max_age(mut self, duration: Duration) -> Self {
        self.max_age = duration;
        self
    }
}

impl<'a> Widget for StatusMessage<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.age > self.max_age {
            return;
        }
        let fade_factor = 1.0 - (self.age.as_secs_f32() / self.max_age.as_secs_f32().max(0.001));

        // Errors always stay red
        let color = match (self.color, fade_factor) {
            (Color::Red, _) => Color::Red,
            (_, f) if f > 0.3 => self.color,
            _ => Color::DarkGray,
        };

        let text = Paragraph::new(Text::from(self.message))
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .style(Style::default().bg(Color::Black)),
            );

        Clear.render(area, buf);
        text.render(area, buf);
    }
}

/// Single-line text input with a label and an optional field error
pub struct InputField<'a> {
    label: &'a str,
    value: &'a str,
    focused: bool,
    masked: bool,
    error: Option<&'a str>,
}

impl<'a> InputField<'a> {
    pub fn new(label: &'a str, value: &'a str) -> Self {
        Self {
            label,
            value,
            focused: false,
            masked: false,
            error: None,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Render the value as bullets (passwords)
    pub fn masked(mut self, masked: bool) -> Self {
        self.masked = masked;
        self
    }

    pub fn error(mut self, error: Option<&'a str>) -> Self {
        self.error = error;
        self
    }

    /// Rows needed to render the field
    pub fn height(&self) -> u16 {
        if self.error.is_some() { 4 } else { 3 }
    }
}

impl<'a> Widget for InputField<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = match (self.error.is_some(), self.focused) {
            (true, _) => Color::Red,
            (false, true) => Color::Yellow,
            (false, false) => Color::DarkGray,
        };

        let shown = if self.masked {
            "•".repeat(self.value.chars().count())
        } else {
            self.value.to_string()
        };

        // Keep the tail visible for long embed snippets
        let shown = tail_to_width(&shown, area.width.saturating_sub(3) as usize);

        let mut spans = vec![Span::raw(shown)];
        if self.focused {
            spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
        }

        let field_area = Rect {
            height: area.height.min(3),
            ..area
        };
        Paragraph::new(Line::from(spans))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border))
                    .title(format!(" {} ", self.label)),
            )
            .render(field_area, buf);

        if let Some(error) = self.error {
            if area.height > 3 {
                let error_area = Rect {
                    y: area.y + 3,
                    height: 1,
                    ..area
                };
                Paragraph::new(Span::styled(error, Style::default().fg(Color::Red)))
                    .render(error_area, buf);
            }
        }
    }
}

/// Checkbox-style toggle row
pub struct Toggle<'a> {
    label: &'a str,
    checked: bool,
    focused: bool,
}

impl<'a> Toggle<'a> {
    pub fn new(label: &'a str, checked: bool) -> Self {
        Self {
            label,
            checked,
            focused: false,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl<'a> Widget for Toggle<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mark = if self.checked { "[x]" } else { "[ ]" };
        let style = if self.focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        Paragraph::new(Line::from(vec![
            Span::styled(mark, style),
            Span::styled(format!(" {}", self.label), style),
        ]))
        .render(area, buf);
    }
}

/// Help overlay for the current surface
pub struct HelpOverlay {
    show_admin: bool,
}

impl HelpOverlay {
    pub fn new(show_admin: bool) -> Self {
        Self { show_admin }
    }
}

fn help_line(key: &'static str, text: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(key, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" - "),
        Span::raw(text),
    ])
}

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let heading = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        let mut lines = vec![
            Line::from(Span::styled("Keyboard Controls", heading)),
            Line::from(""),
            help_line("↑/↓", "Select channel"),
            help_line("Enter/Space", "Play selected channel"),
            help_line("1-9", "Play channel by number"),
            help_line("Esc/x", "Stop playback"),
            help_line("s", "Settings"),
            help_line("a", "Admin"),
            help_line("r", "Reload channels / retry after an error"),
            help_line(":", "Command mode"),
            help_line("F1", "Toggle help"),
            help_line("Ctrl+Q", "Quit"),
        ];

        if self.show_admin {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Admin", heading)));
            lines.push(help_line("n", "New video"));
            lines.push(help_line("e/Enter", "Edit video"));
            lines.push(help_line("d", "Delete video (confirm with y)"));
            lines.push(help_line("Tab", "Next field"));
            lines.push(help_line("l", "Sign out"));
        }

        let help = Paragraph::new(Text::from(lines))
            .block(Block::default().title("Help").borders(Borders::ALL))
            .style(Style::default().fg(Color::White).bg(Color::Black))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });

        Clear.render(area, buf);
        help.render(area, buf);
    }
}

/// Get a spinner frame for loading animations
pub fn get_spinner_frame(duration_ms: u128) -> &'static str {
    const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"];
    let frame_idx = (duration_ms / 80) % SPINNER_FRAMES.len() as u128;
    SPINNER_FRAMES[frame_idx as usize]
}

/// Longest suffix of `text` that fits in `width` terminal columns
pub fn tail_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut used = 0;
    let mut start = text.len();
    for (i, c) in text.char_indices().rev() {
        let w = c.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = i;
    }
    text[start..].to_string()
}

/// Shorten a link for list display
pub fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let budget = max.saturating_sub(1);
    let mut used = 0;
    let keep: String = text
        .chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= budget
        })
        .collect();
    format!("{keep}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("https://youtu.be/dQw4w9WgXcQ", 10), "https://y…");
        assert_eq!(truncate("大阪の映像", 6), "大阪…");
    }

    #[test]
    fn test_tail_to_width_counts_columns() {
        assert_eq!(tail_to_width("abc", 5), "abc");
        assert_eq!(tail_to_width("abcdef", 3), "def");
        // Each of these takes two columns
        assert_eq!(tail_to_width("大阪の映像", 5), "映像");
        assert_eq!(tail_to_width("大阪の映像", 5).width(), 4);
    }

    #[test]
    fn test_input_field_wide_value_keeps_tail_visible() {
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        InputField::new("Title", "ロビーの案内映像").render(area, &mut buf);
        // Seven columns inside the border fit the last three glyphs
        assert_eq!(buf[(1, 1)].symbol(), "内");
        assert_eq!(buf[(5, 1)].symbol(), "像");
        assert_eq!(buf[(9, 1)].symbol(), "│");
    }

    #[test]
    fn test_spinner_cycles() {
        assert_eq!(get_spinner_frame(0), get_spinner_frame(800));
        assert_ne!(get_spinner_frame(0), get_spinner_frame(80));
    }

    #[test]
    fn test_input_field_shows_error_row() {
        let area = Rect::new(0, 0, 30, 4);
        let mut buf = Buffer::empty(area);
        InputField::new("Video link", "nope")
            .error(Some("Unsupported format"))
            .render(area, &mut buf);
        let last_row: String = (0..area.width).map(|x| buf[(x, 3)].symbol().to_string()).collect();
        assert!(last_row.starts_with("Unsupported format"));
    }
}
