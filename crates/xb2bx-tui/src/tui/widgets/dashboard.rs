// Buyer dashboard: RFQ list on the left, market insight and smart matches
// on the right.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

use xb2bx_app::fence::Slot;

use super::{is_loading, rfq_table, titled_block};
use crate::tui::layout::columns;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (left, right) = columns(area, 60);

    let rfqs = state.listed_rfqs();
    let title = format!("RFQs ({})", rfqs.len());
    let table = rfq_table(&rfqs, state.selected, titled_block(&title, state, Slot::Listing));
    frame.render_widget(table, left);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(right);

    let insight = state
        .snapshot
        .as_ref()
        .and_then(|s| s.insight.clone())
        .unwrap_or_else(|| placeholder(state).to_string());
    let paragraph = Paragraph::new(insight)
        .block(titled_block("Market insight", state, Slot::Insights))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, side[0]);

    let matches: Vec<Line> = state
        .snapshot
        .as_ref()
        .map(|s| s.smart_matches.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|m| Line::from(vec![Span::styled("* ", Style::default().fg(Color::Cyan)), Span::raw(m.clone())]))
        .collect();
    let paragraph = Paragraph::new(matches).block(titled_block("Smart matches", state, Slot::Insights));
    frame.render_widget(paragraph, side[1]);
}

fn placeholder(state: &ViewState) -> &'static str {
    if is_loading(state, Slot::Insights) || is_loading(state, Slot::Listing) {
        "Analyzing your market..."
    } else {
        "No insight yet. Press r to refresh."
    }
}
