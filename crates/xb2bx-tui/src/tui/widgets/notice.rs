// Notice line: local validation errors first, then the app's latest notice.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use xb2bx_app::protocol::NoticeLevel;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let line = match current(state) {
        Some((level, text)) => Line::from(Span::styled(
            format!(" {text}  (n to dismiss)"),
            Style::default().fg(level_color(level)),
        )),
        None => Line::default(),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn current(state: &ViewState) -> Option<(NoticeLevel, &str)> {
    if let Some(error) = &state.local_error {
        return Some((NoticeLevel::Error, error.as_str()));
    }
    let notice = state.snapshot.as_ref()?.notice.as_ref()?;
    Some((notice.level, notice.text.as_str()))
}

pub fn level_color(level: NoticeLevel) -> Color {
    match level {
        NoticeLevel::Info => Color::Green,
        NoticeLevel::Error => Color::Red,
    }
}
