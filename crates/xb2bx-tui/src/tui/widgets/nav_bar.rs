// Bottom navigation: tabs plus key hints for the current screen.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use xb2bx_app::router::{Screen, Tab, View};

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = Vec::new();
    if let Some(snapshot) = state.snapshot.as_ref().filter(|s| s.user.is_some()) {
        spans.extend(tab_spans(snapshot.view));
        spans.push(Span::styled("| ", Style::default().fg(Color::Gray)));
    }
    spans.push(Span::styled(
        key_hints(state.screen(), state.is_editing()),
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    ));

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

/// "[1:Home] [2:RFQs] [3:Intel] [4:Profile]" with the tab for `view`
/// highlighted. Views outside the tab set highlight nothing.
pub fn tab_spans(view: View) -> Vec<Span<'static>> {
    let active = Tab::for_view(view);
    let mut spans = Vec::new();
    for (i, tab) in Tab::ALL.into_iter().enumerate() {
        let style = if Some(tab) == active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(format!("[{}:{}]", i + 1, tab.label()), style));
        spans.push(Span::raw(" "));
    }
    spans
}

pub fn key_hints(screen: Screen, editing: bool) -> &'static str {
    match screen {
        Screen::Login => "Tab:Next field | Enter:Submit | Ctrl+R:Sign in/Register | Esc:Quit",
        _ if editing => "Tab:Next field | Enter:Next/Submit | Esc:Done",
        Screen::Dashboard => "j/k:Move | Enter:Open | a:New RFQ | i:Intel | r:Refresh | q:Quit",
        Screen::SellerRfqs => "j/k:Move | Enter:Open | o:Quote | r:Refresh | q:Quit",
        Screen::RfqDetail { .. } => "j/k:Quote | m:Message | o:Quote | f:Fund | x:Release | b:Back",
        Screen::CreateRfq => "e:Edit | s:AI specs | g:AI image | Enter:Post | b:Back",
        Screen::CreateQuote { .. } => "e:Edit | g:Analyze | Enter:Submit | b:Back",
        Screen::ResearchHub => "/:Query | b:Back | q:Quit",
        Screen::Profile => "l:Sign out | q:Quit",
        Screen::Blank => "b:Back | q:Quit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_tab_is_highlighted() {
        let spans = tab_spans(View::Intel);
        let highlighted: Vec<&str> = spans
            .iter()
            .filter(|s| s.style.bg == Some(Color::White))
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(highlighted, vec!["[3:Intel]"]);
    }

    #[test]
    fn detail_views_highlight_no_tab() {
        let spans = tab_spans(View::RfqDetail);
        assert!(spans.iter().all(|s| s.style.bg != Some(Color::White)));
    }

    #[test]
    fn editing_hints_override_screen_hints() {
        assert!(key_hints(Screen::ResearchHub, true).contains("Esc:Done"));
        assert!(key_hints(Screen::Login, true).contains("Ctrl+R"));
    }
}
