// Research hub: query field, grounded brief, and cited sources.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use xb2bx_app::fence::Slot;
use xb2bx_llm::Source;

use super::{form_lines, is_loading, titled_block};
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let research = state.snapshot.as_ref().and_then(|s| s.research.as_ref());
    let source_rows = research.map_or(0, |r| r.sources.len()) as u16;

    let zones = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(source_rows.min(8) + 2),
        ])
        .split(area);

    let query = Paragraph::new(form_lines(&state.research_form, state.editing))
        .block(Block::default().borders(Borders::ALL).title("Product research"));
    frame.render_widget(query, zones[0]);

    let body = match research {
        Some(result) => result.text.clone(),
        None if is_loading(state, Slot::Research) => "Researching...".to_string(),
        None => "Press / to research a product or market.".to_string(),
    };
    let brief = Paragraph::new(body)
        .block(titled_block("Brief", state, Slot::Research))
        .wrap(Wrap { trim: false });
    frame.render_widget(brief, zones[1]);

    let lines: Vec<Line> = research
        .map(|r| r.sources.iter().map(source_line).collect())
        .unwrap_or_default();
    let sources = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Sources"));
    frame.render_widget(sources, zones[2]);
}

fn source_line(source: &Source) -> Line<'static> {
    let title = source.title.clone().unwrap_or_else(|| "Untitled".to_string());
    Line::from(vec![
        Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(
            source.uri.clone().unwrap_or_default(),
            Style::default().fg(Color::Cyan),
        ),
    ])
}
