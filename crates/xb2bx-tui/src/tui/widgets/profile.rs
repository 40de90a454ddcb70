// Profile: user card and sign-out hint.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use xb2bx_core::model::User;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let lines = state.user().map(profile_lines).unwrap_or_default();
    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Profile"));
    frame.render_widget(paragraph, area);
}

fn profile_lines(user: &User) -> Vec<Line<'static>> {
    let label = |text: &'static str| Span::styled(format!("{text:>10}: "), Style::default().fg(Color::Gray));
    let verified = match user.is_verified {
        Some(true) => Span::styled("verified", Style::default().fg(Color::Green)),
        Some(false) => Span::styled("unverified", Style::default().fg(Color::Yellow)),
        None => Span::raw("--"),
    };
    vec![
        Line::from(vec![
            label("Name"),
            Span::styled(user.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![label("Email"), Span::raw(user.email.clone())]),
        Line::from(vec![label("Role"), Span::raw(user.role.as_str())]),
        Line::from(vec![label("Status"), verified]),
        Line::from(vec![label("User id"), Span::raw(user.id.to_string())]),
        Line::default(),
        Line::from(Span::styled(
            "Press l to sign out.",
            Style::default().fg(Color::Gray),
        )),
    ]
}
