// TUI module: terminal rendering and keyboard input.
//
// The app loop owns all marketplace state and pushes a full snapshot after
// every change. `ViewState` keeps the latest snapshot plus what only the
// terminal cares about: list selection, form contents, and edit mode.

pub mod form;
pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::Frame;
use tokio::sync::mpsc;

use xb2bx_app::protocol::{AppSnapshot, UiUpdate, UserCommand};
use xb2bx_app::router::Screen;
use xb2bx_core::model::{Quote, Rfq, User};

use form::{rfq_field, Form};
use layout::build_layout;

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state that mirrors the application state for rendering.
pub struct ViewState {
    /// Latest snapshot from the app loop. `None` until the first arrives.
    pub snapshot: Option<AppSnapshot>,
    /// Highlighted row in the current screen's list.
    pub selected: usize,
    /// Keystrokes go to the current screen's form.
    pub editing: bool,
    /// Login screen shows the registration form.
    pub register_mode: bool,
    pub login_form: Form,
    pub register_form: Form,
    pub rfq_form: Form,
    pub quote_form: Form,
    pub research_form: Form,
    pub message_form: Form,
    pub confirm_quit: bool,
    /// Input rejected before it reached the app.
    pub local_error: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            snapshot: None,
            selected: 0,
            editing: false,
            register_mode: false,
            login_form: Form::login(),
            register_form: Form::register(),
            rfq_form: Form::create_rfq(),
            quote_form: Form::single("Unit price"),
            research_form: Form::single("Query"),
            message_form: Form::single("Message"),
            confirm_quit: false,
            local_error: None,
        }
    }
}

impl ViewState {
    pub fn screen(&self) -> Screen {
        self.snapshot.as_ref().map_or(Screen::Blank, |s| s.screen)
    }

    pub fn user(&self) -> Option<&User> {
        self.snapshot.as_ref().and_then(|s| s.user.as_ref())
    }

    /// The login screen always takes text input.
    pub fn is_editing(&self) -> bool {
        self.editing || self.screen() == Screen::Login
    }

    pub fn active_form(&self) -> Option<&Form> {
        match self.screen() {
            Screen::Login if self.register_mode => Some(&self.register_form),
            Screen::Login => Some(&self.login_form),
            Screen::CreateRfq => Some(&self.rfq_form),
            Screen::CreateQuote { .. } => Some(&self.quote_form),
            Screen::ResearchHub => Some(&self.research_form),
            Screen::RfqDetail { .. } => Some(&self.message_form),
            _ => None,
        }
    }

    pub fn active_form_mut(&mut self) -> Option<&mut Form> {
        match self.screen() {
            Screen::Login if self.register_mode => Some(&mut self.register_form),
            Screen::Login => Some(&mut self.login_form),
            Screen::CreateRfq => Some(&mut self.rfq_form),
            Screen::CreateQuote { .. } => Some(&mut self.quote_form),
            Screen::ResearchHub => Some(&mut self.research_form),
            Screen::RfqDetail { .. } => Some(&mut self.message_form),
            _ => None,
        }
    }

    /// RFQs listed on the current screen, in display order.
    pub fn listed_rfqs(&self) -> Vec<&Rfq> {
        let Some(snapshot) = &self.snapshot else {
            return Vec::new();
        };
        match snapshot.screen {
            Screen::Dashboard => snapshot.rfqs.iter().collect(),
            Screen::SellerRfqs => snapshot.rfqs.iter().filter(|r| r.is_open()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn selected_rfq(&self) -> Option<&Rfq> {
        self.listed_rfqs().get(self.selected).copied()
    }

    /// Quote highlighted on the detail screen.
    pub fn selected_quote(&self) -> Option<&Quote> {
        let detail = self.snapshot.as_ref()?.detail.as_ref()?;
        detail.quotes.get(self.selected)
    }

    /// Number of selectable rows on the current screen.
    pub fn list_len(&self) -> usize {
        match self.screen() {
            Screen::Dashboard | Screen::SellerRfqs => self.listed_rfqs().len(),
            Screen::RfqDetail { .. } => self
                .snapshot
                .as_ref()
                .and_then(|s| s.detail.as_ref())
                .map_or(0, |d| d.quotes.len()),
            _ => 0,
        }
    }

    /// Apply a full snapshot from the app loop.
    ///
    /// Leaving a screen discards its form contents and selection. A freshly
    /// generated spec sheet is copied into the RFQ form.
    pub fn apply_snapshot(&mut self, snapshot: AppSnapshot) {
        let previous = self.screen();
        if snapshot.screen != previous {
            self.leave_screen(previous);
        }

        let old_specs = self
            .snapshot
            .as_ref()
            .and_then(|s| s.draft.specs.as_deref());
        if let Some(specs) = snapshot.draft.specs.as_deref() {
            if old_specs != Some(specs) && !specs.is_empty() {
                self.rfq_form.set_value(rfq_field::SPECS, specs);
            }
        }

        self.snapshot = Some(snapshot);
        self.selected = self.selected.min(self.list_len().saturating_sub(1));
    }

    fn leave_screen(&mut self, screen: Screen) {
        self.selected = 0;
        self.editing = false;
        self.local_error = None;
        match screen {
            Screen::Login => {
                self.login_form.clear();
                self.register_form.clear();
                self.register_mode = false;
            }
            Screen::CreateRfq => self.rfq_form.clear(),
            Screen::CreateQuote { .. } => self.quote_form.clear(),
            Screen::ResearchHub => self.research_form.clear(),
            Screen::RfqDetail { .. } => self.message_form.clear(),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Snapshot(snapshot) => state.apply_snapshot(*snapshot),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the full screen from the current ViewState.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);

    match state.screen() {
        Screen::Login => widgets::login::render(frame, layout.main_panel, state),
        Screen::Dashboard => widgets::dashboard::render(frame, layout.main_panel, state),
        Screen::SellerRfqs => widgets::seller_rfqs::render(frame, layout.main_panel, state),
        Screen::ResearchHub => widgets::research::render(frame, layout.main_panel, state),
        Screen::Profile => widgets::profile::render(frame, layout.main_panel, state),
        Screen::RfqDetail { rfq_id } => {
            widgets::detail::render(frame, layout.main_panel, state, rfq_id)
        }
        Screen::CreateRfq => widgets::create_rfq::render(frame, layout.main_panel, state),
        Screen::CreateQuote { rfq_id } => {
            widgets::create_quote::render(frame, layout.main_panel, state, rfq_id)
        }
        Screen::Blank => widgets::render_blank(frame, layout.main_panel),
    }

    widgets::notice::render(frame, layout.notice, state);
    widgets::nav_bar::render(frame, layout.nav_bar, state);

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, frame.area());
    }
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// Initializes the terminal, then multiplexes snapshots from the app loop,
/// keyboard input, and a ~30fps render tick until the user quits or the app
/// loop goes away. The terminal is restored on exit and on panic.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    // App loop finished.
                    None => break,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            if cmd_tx.send(cmd).await.is_err() || quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    ratatui::restore();

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use xb2bx_app::protocol::{DraftAssist, Notice, RfqDetail};
    use xb2bx_app::router::View;
    use xb2bx_core::model::{Escrow, EscrowStatus, Message, Role, RfqStatus};
    use xb2bx_llm::{ResearchResult, Source};

    pub(crate) fn user(role: Role) -> User {
        User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role,
            is_verified: Some(true),
        }
    }

    pub(crate) fn rfq(id: i64, status: Option<RfqStatus>) -> Rfq {
        Rfq {
            id,
            buyer_id: 1,
            product: format!("Item {id}"),
            quantity: 10,
            specs: "grade A".into(),
            category: "metals".into(),
            image_url: None,
            created_at: None,
            status,
            urgency: None,
        }
    }

    pub(crate) fn quote(id: i64, price: f64) -> Quote {
        Quote {
            id,
            rfq_id: 42,
            seller_id: 2,
            price,
            seller_name: Some("Acme".into()),
            product_name: None,
            created_at: None,
            is_gold_supplier: Some(id == 1),
        }
    }

    pub(crate) fn snapshot(screen: Screen, role: Option<Role>) -> AppSnapshot {
        AppSnapshot {
            user: role.map(user),
            view: View::Home,
            active_rfq_id: None,
            screen,
            rfqs: Vec::new(),
            seller_quotes: Vec::new(),
            insight: None,
            smart_matches: Vec::new(),
            detail: None,
            quote_target: None,
            research: None,
            draft: DraftAssist::default(),
            busy: Vec::new(),
            notice: None,
        }
    }

    pub(crate) fn detail_snapshot(escrow: Option<Escrow>) -> AppSnapshot {
        let mut snap = snapshot(Screen::RfqDetail { rfq_id: 42 }, Some(Role::Buyer));
        snap.detail = Some(RfqDetail {
            rfq: rfq(42, None),
            quotes: vec![quote(1, 120.0), quote(2, 99.5)],
            messages: vec![Message {
                id: 1,
                rfq_id: 42,
                sender_id: 2,
                sender_name: Some("Acme".into()),
                message: "Can ship Monday".into(),
                created_at: Some("2026-01-01T10:00:00Z".into()),
            }],
            escrow,
        });
        snap
    }

    pub(crate) fn state_on(snap: AppSnapshot) -> ViewState {
        let mut state = ViewState::default();
        state.apply_snapshot(snap);
        state
    }

    fn render_to_text(state: &ViewState, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render_frame(frame, state)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn view_state_default_is_sensible() {
        let state = ViewState::default();
        assert!(state.snapshot.is_none());
        assert_eq!(state.screen(), Screen::Blank);
        assert!(!state.is_editing());
        assert!(!state.confirm_quit);
        assert_eq!(state.list_len(), 0);
    }

    #[test]
    fn login_screen_is_always_editing() {
        let state = state_on(snapshot(Screen::Login, None));
        assert!(state.is_editing());
        assert_eq!(state.active_form(), Some(&Form::login()));
    }

    #[test]
    fn apply_ui_update_replaces_snapshot() {
        let mut state = ViewState::default();
        let mut snap = snapshot(Screen::Dashboard, Some(Role::Buyer));
        snap.rfqs = vec![rfq(1, None), rfq(2, None)];
        apply_ui_update(&mut state, UiUpdate::Snapshot(Box::new(snap)));
        assert_eq!(state.screen(), Screen::Dashboard);
        assert_eq!(state.list_len(), 2);
        assert_eq!(state.user().map(|u| u.role), Some(Role::Buyer));
    }

    #[test]
    fn seller_listing_shows_only_open_rfqs() {
        let mut snap = snapshot(Screen::SellerRfqs, Some(Role::Seller));
        snap.rfqs = vec![
            rfq(1, Some(RfqStatus::Open)),
            rfq(2, Some(RfqStatus::Closed)),
            rfq(3, None),
        ];
        let state = state_on(snap);
        let ids: Vec<i64> = state.listed_rfqs().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn selection_is_clamped_when_list_shrinks() {
        let mut snap = snapshot(Screen::Dashboard, Some(Role::Buyer));
        snap.rfqs = vec![rfq(1, None), rfq(2, None), rfq(3, None)];
        let mut state = state_on(snap.clone());
        state.selected = 2;
        snap.rfqs.truncate(1);
        state.apply_snapshot(snap);
        assert_eq!(state.selected, 0);
        assert_eq!(state.selected_rfq().map(|r| r.id), Some(1));
    }

    #[test]
    fn leaving_a_screen_discards_its_form() {
        let mut state = state_on(snapshot(Screen::CreateRfq, Some(Role::Buyer)));
        state.rfq_form.set_value(rfq_field::PRODUCT, "Copper");
        state.editing = true;
        state.apply_snapshot(snapshot(Screen::Dashboard, Some(Role::Buyer)));
        assert!(!state.editing);
        assert_eq!(state.rfq_form.value(rfq_field::PRODUCT), "");
    }

    #[test]
    fn same_screen_snapshot_keeps_form_and_selection() {
        let mut snap = snapshot(Screen::Dashboard, Some(Role::Buyer));
        snap.rfqs = vec![rfq(1, None), rfq(2, None)];
        let mut state = state_on(snap.clone());
        state.selected = 1;
        snap.insight = Some("Prices are rising.".into());
        state.apply_snapshot(snap);
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn generated_specs_fill_the_rfq_form() {
        let mut state = state_on(snapshot(Screen::CreateRfq, Some(Role::Buyer)));
        let mut snap = snapshot(Screen::CreateRfq, Some(Role::Buyer));
        snap.draft.specs = Some("- Purity 99.9%".into());
        state.apply_snapshot(snap.clone());
        assert_eq!(state.rfq_form.value(rfq_field::SPECS), "- Purity 99.9%");

        // A later snapshot with the same specs does not clobber user edits.
        state.rfq_form.set_value(rfq_field::SPECS, "edited");
        state.apply_snapshot(snap);
        assert_eq!(state.rfq_form.value(rfq_field::SPECS), "edited");
    }

    #[test]
    fn logging_in_clears_credentials() {
        let mut state = state_on(snapshot(Screen::Login, None));
        state.login_form.set_value(1, "secret");
        state.apply_snapshot(snapshot(Screen::Dashboard, Some(Role::Buyer)));
        assert_eq!(state.login_form.value(1), "");
    }

    #[test]
    fn every_screen_renders_without_panicking() {
        let mut research = snapshot(Screen::ResearchHub, Some(Role::Buyer));
        research.research = Some(ResearchResult {
            text: "Copper demand is up.".into(),
            sources: vec![Source {
                title: Some("Metals Weekly".into()),
                uri: Some("https://example.com/a".into()),
            }],
        });
        let mut quote_screen = snapshot(Screen::CreateQuote { rfq_id: 42 }, Some(Role::Seller));
        quote_screen.quote_target = Some(rfq(42, None));
        quote_screen.draft.opportunity = Some("Good margin.".into());
        let mut with_notice = snapshot(Screen::Dashboard, Some(Role::Buyer));
        with_notice.notice = Some(Notice::error("Loading RFQs failed: boom"));

        let snaps = vec![
            snapshot(Screen::Login, None),
            with_notice,
            snapshot(Screen::SellerRfqs, Some(Role::Seller)),
            research,
            snapshot(Screen::Profile, Some(Role::Admin)),
            detail_snapshot(None),
            detail_snapshot(Some(Escrow {
                id: 7,
                rfq_id: 42,
                amount: 120.0,
                status: EscrowStatus::Funded,
            })),
            snapshot(Screen::CreateRfq, Some(Role::Buyer)),
            quote_screen,
            snapshot(Screen::Blank, Some(Role::Buyer)),
        ];
        for snap in snaps {
            let state = state_on(snap);
            render_to_text(&state, 100, 30);
            render_to_text(&state, 20, 6);
        }
    }

    #[test]
    fn dashboard_frame_shows_rfqs_and_tabs() {
        let mut snap = snapshot(Screen::Dashboard, Some(Role::Buyer));
        snap.rfqs = vec![rfq(42, None)];
        let text = render_to_text(&state_on(snap), 100, 30);
        assert!(text.contains("Item 42"));
        assert!(text.contains("1:Home"));
        assert!(text.contains("Ada"));
    }

    #[test]
    fn quit_overlay_is_drawn_on_top() {
        let mut state = state_on(snapshot(Screen::Dashboard, Some(Role::Buyer)));
        state.confirm_quit = true;
        let text = render_to_text(&state, 80, 24);
        assert!(text.contains("Really quit?"));
    }
}
