// Create-RFQ form with AI assists: a drafted spec sheet and a product render.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use xb2bx_app::fence::Slot;

use super::{form_lines, is_loading, titled_block};
use crate::tui::layout::columns;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (left, right) = columns(area, 60);

    let mut lines = form_lines(&state.rfq_form, state.editing);
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        "Urgency: normal, high or critical. Image file is optional.",
        Style::default().fg(Color::Gray),
    )));
    let form = Paragraph::new(lines)
        .block(titled_block("New RFQ", state, Slot::Mutation))
        .wrap(Wrap { trim: false });
    frame.render_widget(form, left);

    let draft = state.snapshot.as_ref().map(|s| &s.draft);
    let mut assist = vec![Line::from(Span::styled(
        "Specs",
        Style::default().fg(Color::Cyan),
    ))];
    assist.push(Line::from(
        if is_loading(state, Slot::Specs) {
            "Drafting specs..."
        } else if draft.and_then(|d| d.specs.as_ref()).is_some() {
            "Drafted into the Specs field."
        } else {
            "Press s to draft specs for the product."
        },
    ));
    assist.push(Line::default());
    assist.push(Line::from(Span::styled("Image", Style::default().fg(Color::Cyan))));
    assist.push(Line::from(image_status(
        is_loading(state, Slot::Image),
        draft.and_then(|d| d.image.as_deref()),
    )));

    frame.render_widget(
        Paragraph::new(assist)
            .block(Block::default().borders(Borders::ALL).title("AI assist"))
            .wrap(Wrap { trim: false }),
        right,
    );
}

pub fn image_status(loading: bool, image: Option<&str>) -> String {
    match image {
        _ if loading => "Rendering...".to_string(),
        Some(url) if !url.is_empty() => {
            format!("Render ready ({} KB), attached unless an image file is set.", url.len() / 1024)
        }
        Some(_) => "No render came back.".to_string(),
        None => "Press g to render the product.".to_string(),
    }
}
