// RFQ detail: the request, its quotes, escrow state, and the negotiation
// thread with a compose line.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use xb2bx_app::fence::Slot;
use xb2bx_app::protocol::RfqDetail;
use xb2bx_core::model::{Escrow, EscrowStatus};

use super::{form_lines, status_label, titled_block, urgency_style};
use crate::tui::layout::columns;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, rfq_id: i64) {
    // The snapshot may still describe the previous RFQ while loading.
    let detail = state
        .snapshot
        .as_ref()
        .and_then(|s| s.detail.as_ref())
        .filter(|d| d.rfq.id == rfq_id);

    let Some(detail) = detail else {
        let text = format!("Loading RFQ #{rfq_id}...");
        frame.render_widget(
            Paragraph::new(text).block(titled_block("RFQ", state, Slot::Detail)),
            area,
        );
        return;
    };

    let (left, right) = columns(area, 55);

    let left_zones = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(4), Constraint::Length(3)])
        .split(left);

    frame.render_widget(
        Paragraph::new(summary_lines(detail))
            .block(titled_block(&format!("RFQ #{}", detail.rfq.id), state, Slot::Detail))
            .wrap(Wrap { trim: false }),
        left_zones[0],
    );
    frame.render_widget(quotes_table(detail, state.selected), left_zones[1]);
    frame.render_widget(
        Paragraph::new(escrow_line(detail.escrow.as_ref()))
            .block(titled_block("Escrow", state, Slot::Mutation)),
        left_zones[2],
    );

    let right_zones = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(right);

    let thread: Vec<Line> = detail
        .messages
        .iter()
        .map(|m| {
            let sender = m
                .sender_name
                .clone()
                .unwrap_or_else(|| format!("user {}", m.sender_id));
            Line::from(vec![
                Span::styled(format!("{sender}: "), Style::default().fg(Color::Cyan)),
                Span::raw(m.message.clone()),
            ])
        })
        .collect();
    // Keep the newest messages in view.
    let inner = right_zones[0].height.saturating_sub(2) as usize;
    let scroll = thread.len().saturating_sub(inner) as u16;
    frame.render_widget(
        Paragraph::new(thread)
            .block(Block::default().borders(Borders::ALL).title("Negotiation"))
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        right_zones[0],
    );
    frame.render_widget(
        Paragraph::new(form_lines(&state.message_form, state.editing))
            .block(Block::default().borders(Borders::ALL)),
        right_zones[1],
    );
}

fn summary_lines(detail: &RfqDetail) -> Vec<Line<'static>> {
    let rfq = &detail.rfq;
    let urgency = rfq.urgency.unwrap_or_default();
    vec![
        Line::from(Span::styled(
            rfq.product.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Quantity: {}   Category: {}", rfq.quantity, rfq.category)),
        Line::from(vec![
            Span::raw("Urgency: "),
            Span::styled(urgency.as_str(), urgency_style(rfq.urgency)),
            Span::raw(format!("   Status: {}", status_label(rfq.status))),
        ]),
        Line::from(format!("Specs: {}", rfq.specs)),
    ]
}

fn quotes_table(detail: &RfqDetail, selected: usize) -> Table<'static> {
    let header = Row::new(vec!["Seller", "Price", ""])
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = detail
        .quotes
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let seller = q
                .seller_name
                .clone()
                .unwrap_or_else(|| format!("seller {}", q.seller_id));
            let badge = if q.is_gold_supplier() { "GOLD" } else { "" };
            let row = Row::new(vec![
                Cell::from(seller),
                Cell::from(format!("${:.2}", q.price)),
                Cell::from(Span::styled(badge, Style::default().fg(Color::Yellow))),
            ]);
            if i == selected {
                row.style(Style::default().bg(Color::DarkGray))
            } else {
                row
            }
        })
        .collect();
    Table::new(
        rows,
        [Constraint::Min(12), Constraint::Length(12), Constraint::Length(5)],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Quotes ({})", detail.quotes.len())),
    )
}

pub fn escrow_line(escrow: Option<&Escrow>) -> Line<'static> {
    match escrow {
        None => Line::from(Span::styled(
            "No escrow. Press f to fund the highlighted quote.",
            Style::default().fg(Color::Gray),
        )),
        Some(escrow) => {
            let color = match escrow.status {
                EscrowStatus::Funded => Color::Green,
                EscrowStatus::Released => Color::Cyan,
                EscrowStatus::Disputed => Color::Red,
                EscrowStatus::Pending => Color::Yellow,
            };
            Line::from(vec![
                Span::raw(format!("${:.2} ", escrow.amount)),
                Span::styled(escrow.status.as_str(), Style::default().fg(color)),
            ])
        }
    }
}
