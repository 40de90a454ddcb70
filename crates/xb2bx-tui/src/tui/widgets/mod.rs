// TUI widget modules, one per screen plus the fixed bars.

pub mod create_quote;
pub mod create_rfq;
pub mod dashboard;
pub mod detail;
pub mod login;
pub mod nav_bar;
pub mod notice;
pub mod profile;
pub mod quit_confirm;
pub mod research;
pub mod seller_rfqs;
pub mod status_bar;

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use xb2bx_app::fence::Slot;
use xb2bx_core::model::{Rfq, RfqStatus, Urgency};

use super::form::Form;
use super::ViewState;

/// Empty pane for a guarded view with nothing to show.
pub fn render_blank(frame: &mut Frame, area: Rect) {
    frame.render_widget(Block::default().borders(Borders::ALL), area);
}

pub fn is_loading(state: &ViewState, slot: Slot) -> bool {
    state.snapshot.as_ref().is_some_and(|s| s.is_busy(slot))
}

/// Bordered block whose title gains a loading marker while `slot` is busy.
pub fn titled_block(title: &str, state: &ViewState, slot: Slot) -> Block<'static> {
    let mut spans = vec![Span::styled(
        title.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if is_loading(state, slot) {
        spans.push(Span::styled(" -- loading...", Style::default().fg(Color::Yellow)));
    }
    Block::default().borders(Borders::ALL).title(Line::from(spans))
}

/// One line per field; the focused field is highlighted while editing.
pub fn form_lines(form: &Form, editing: bool) -> Vec<Line<'static>> {
    form.fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let focused = editing && i == form.focus;
            let label_style = if focused {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let mut spans = vec![
                Span::styled(format!("{:>20}: ", field.label), label_style),
                Span::raw(field.display()),
            ];
            if focused {
                spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
            }
            Line::from(spans)
        })
        .collect()
}

pub fn urgency_style(urgency: Option<Urgency>) -> Style {
    match urgency {
        Some(Urgency::Critical) => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Some(Urgency::High) => Style::default().fg(Color::Yellow),
        _ => Style::default(),
    }
}

pub fn status_label(status: Option<RfqStatus>) -> &'static str {
    match status {
        None | Some(RfqStatus::Open) => "open",
        Some(RfqStatus::Closed) => "closed",
        Some(RfqStatus::Awarded) => "awarded",
    }
}

/// RFQ table with the `selected` row highlighted.
pub fn rfq_table<'a>(rfqs: &[&Rfq], selected: usize, block: Block<'a>) -> Table<'a> {
    let header = Row::new(vec!["#", "Product", "Qty", "Category", "Urgency", "Status"])
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = rfqs
        .iter()
        .enumerate()
        .map(|(i, rfq)| {
            let urgency = rfq.urgency.unwrap_or_default();
            let row = Row::new(vec![
                Cell::from(rfq.id.to_string()),
                Cell::from(rfq.product.clone()),
                Cell::from(rfq.quantity.to_string()),
                Cell::from(rfq.category.clone()),
                Cell::from(Span::styled(urgency.as_str(), urgency_style(rfq.urgency))),
                Cell::from(status_label(rfq.status)),
            ]);
            if i == selected {
                row.style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            } else {
                row
            }
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Min(16),
        Constraint::Length(8),
        Constraint::Length(14),
        Constraint::Length(9),
        Constraint::Length(8),
    ];

    Table::new(rows, widths).header(header).block(block)
}
