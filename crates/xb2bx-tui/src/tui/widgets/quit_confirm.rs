// Quit confirmation overlay, drawn over the current screen while
// `ViewState::confirm_quit` is set.

use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

const DIALOG_WIDTH: u16 = 30;
const DIALOG_HEIGHT: u16 = 5;

pub fn render(frame: &mut Frame, area: Rect) {
    let dialog = centered(DIALOG_WIDTH, DIALOG_HEIGHT, area);
    frame.render_widget(Clear, dialog);

    let key = |c: &'static str, color: Color| {
        Span::styled(c, Style::default().fg(color).add_modifier(Modifier::BOLD))
    };
    let lines = vec![
        Line::from("Really quit? Your session stays signed in."),
        Line::from(vec![key("y", Color::Green), Span::raw(" quit   "), key("n", Color::Red), Span::raw(" stay")]),
    ];

    let paragraph = Paragraph::new(lines)
        .wrap(ratatui::widgets::Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Quit XB2BX "),
        )
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog);
}

/// A `width` x `height` rectangle centered in `area`, shrunk to fit.
fn centered(width: u16, height: u16, area: Rect) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}
