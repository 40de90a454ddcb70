// Seller listing: open RFQs to quote on, and the seller's own quotes.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Cell, Row, Table};
use ratatui::Frame;

use xb2bx_app::fence::Slot;
use xb2bx_core::model::Quote;

use super::{rfq_table, titled_block};
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let rfqs = state.listed_rfqs();
    let title = format!("Open RFQs ({})", rfqs.len());
    frame.render_widget(
        rfq_table(&rfqs, state.selected, titled_block(&title, state, Slot::Listing)),
        halves[0],
    );

    let quotes = state
        .snapshot
        .as_ref()
        .map(|s| s.seller_quotes.as_slice())
        .unwrap_or_default();
    let table = quote_table(quotes).block(titled_block("My quotes", state, Slot::Listing));
    frame.render_widget(table, halves[1]);
}

pub fn quote_table(quotes: &[Quote]) -> Table<'static> {
    let header = Row::new(vec!["RFQ", "Product", "Price", "Submitted"])
        .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = quotes
        .iter()
        .map(|q| {
            Row::new(vec![
                Cell::from(format!("#{}", q.rfq_id)),
                Cell::from(q.product_name.clone().unwrap_or_else(|| "--".to_string())),
                Cell::from(format!("${:.2}", q.price)),
                Cell::from(q.created_at.clone().unwrap_or_default()),
            ])
        })
        .collect();
    Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Min(16),
            Constraint::Length(12),
            Constraint::Length(24),
        ],
    )
    .header(header)
}
