// Screen layout: fixed bars around a single content pane.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Main Panel (fill)                                 |
// +--------------------------------------------------+
// | Notice Line (1 row)                               |
// +--------------------------------------------------+
// | Nav Bar (1 row)                                   |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Signed-in user and current screen.
    pub status_bar: Rect,
    /// Screen content.
    pub main_panel: Rect,
    /// Latest notice or local validation message.
    pub notice: Rect,
    /// Bottom navigation tabs and key hints.
    pub nav_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    AppLayout {
        status_bar: vertical[0],
        main_panel: vertical[1],
        notice: vertical[2],
        nav_bar: vertical[3],
    }
}

/// Split a pane into a left and right column.
pub fn columns(area: Rect, left_percent: u16) -> (Rect, Rect) {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(left_percent),
            Constraint::Percentage(100 - left_percent.min(100)),
        ])
        .split(area);
    (horizontal[0], horizontal[1])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_area() -> Rect {
        Rect::new(0, 0, 120, 40)
    }

    #[test]
    fn bars_are_one_row() {
        let layout = build_layout(test_area());
        assert_eq!(layout.status_bar.height, 1);
        assert_eq!(layout.notice.height, 1);
        assert_eq!(layout.nav_bar.height, 1);
    }

    #[test]
    fn main_panel_fills_the_rest() {
        let layout = build_layout(test_area());
        assert_eq!(layout.main_panel.height, 37);
        assert_eq!(layout.main_panel.width, 120);
    }

    #[test]
    fn zones_are_stacked_in_order() {
        let layout = build_layout(test_area());
        assert_eq!(layout.status_bar.y, 0);
        assert_eq!(layout.main_panel.y, 1);
        assert_eq!(layout.notice.y, 38);
        assert_eq!(layout.nav_bar.y, 39);
    }

    #[test]
    fn columns_split_full_width() {
        let (left, right) = columns(test_area(), 60);
        assert_eq!(left.width + right.width, 120);
        assert_eq!(left.width, 72);
        assert_eq!(right.x, left.x + left.width);
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let layout = build_layout(Rect::new(0, 0, 10, 2));
        let total = layout.status_bar.height
            + layout.main_panel.height
            + layout.notice.height
            + layout.nav_bar.height;
        assert!(total <= 2);
    }
}
