// Login / registration form.

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use xb2bx_app::fence::Slot;

use super::{form_lines, is_loading};
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let [column] = Layout::horizontal([Constraint::Max(64)])
        .flex(Flex::Center)
        .areas(area);

    let (title, form) = if state.register_mode {
        ("Create an account", &state.register_form)
    } else {
        ("Sign in to XB2BX", &state.login_form)
    };

    let mut lines = vec![
        Line::from(Span::styled(
            "B2B sourcing: post RFQs, collect quotes, settle through escrow.",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
    ];
    lines.extend(form_lines(form, true));
    lines.push(Line::default());
    if is_loading(state, Slot::Auth) {
        lines.push(Line::from(Span::styled(
            "Signing in...",
            Style::default().fg(Color::Yellow),
        )));
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
    );
    frame.render_widget(paragraph, column);
}
