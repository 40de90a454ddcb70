// Status bar widget: signed-in user and current screen.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use xb2bx_app::router::Screen;
use xb2bx_core::model::User;

use crate::tui::ViewState;

/// Layout: [brand] [user] [screen] [busy marker]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = vec![Span::styled(
        " XB2BX ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];

    spans.push(Span::raw(" "));
    spans.push(Span::styled(user_label(state.user()), Style::default().fg(Color::White)));
    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
    spans.push(Span::styled(
        screen_label(state.screen()),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    ));

    if state.snapshot.as_ref().is_some_and(|s| !s.busy.is_empty()) {
        spans.push(Span::styled(" | working...", Style::default().fg(Color::Yellow)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

pub fn user_label(user: Option<&User>) -> String {
    match user {
        Some(user) => {
            let verified = if user.is_verified == Some(true) { " *" } else { "" };
            format!("{} ({}){}", user.name, user.role, verified)
        }
        None => "not signed in".to_string(),
    }
}

pub fn screen_label(screen: Screen) -> String {
    match screen {
        Screen::Login => "Sign in".to_string(),
        Screen::Dashboard => "Dashboard".to_string(),
        Screen::SellerRfqs => "Open RFQs".to_string(),
        Screen::ResearchHub => "Research Hub".to_string(),
        Screen::Profile => "Profile".to_string(),
        Screen::RfqDetail { rfq_id } => format!("RFQ #{rfq_id}"),
        Screen::CreateRfq => "New RFQ".to_string(),
        Screen::CreateQuote { rfq_id } => format!("Quote for RFQ #{rfq_id}"),
        Screen::Blank => String::new(),
    }
}
