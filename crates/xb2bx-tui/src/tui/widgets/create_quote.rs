// Create-quote form: the RFQ being quoted, a price field, and the AI
// opportunity analysis.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use xb2bx_app::fence::Slot;

use super::{form_lines, is_loading, titled_block};
use crate::tui::layout::columns;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, rfq_id: i64) {
    let (left, right) = columns(area, 50);
    let zones = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(3)])
        .split(left);

    let target = state
        .snapshot
        .as_ref()
        .and_then(|s| s.quote_target.as_ref())
        .filter(|r| r.id == rfq_id);
    let summary: Vec<Line> = match target {
        Some(rfq) => vec![
            Line::from(rfq.product.clone()),
            Line::from(format!("Quantity: {}", rfq.quantity)),
            Line::from(format!("Category: {}", rfq.category)),
            Line::from(format!("Specs: {}", rfq.specs)),
        ],
        None => vec![Line::from(format!("Loading RFQ #{rfq_id}..."))],
    };
    frame.render_widget(
        Paragraph::new(summary)
            .block(titled_block(&format!("Quoting RFQ #{rfq_id}"), state, Slot::Detail))
            .wrap(Wrap { trim: false }),
        zones[0],
    );
    frame.render_widget(
        Paragraph::new(form_lines(&state.quote_form, state.editing))
            .block(titled_block("Your offer", state, Slot::Mutation)),
        zones[1],
    );

    let analysis = state
        .snapshot
        .as_ref()
        .and_then(|s| s.draft.opportunity.clone())
        .unwrap_or_else(|| {
            if is_loading(state, Slot::Opportunity) {
                "Analyzing the opportunity...".to_string()
            } else {
                "Press g for an AI read on pricing and competition.".to_string()
            }
        });
    frame.render_widget(
        Paragraph::new(analysis)
            .block(Block::default().borders(Borders::ALL).title("Opportunity"))
            .wrap(Wrap { trim: false }),
        right,
    );
}
