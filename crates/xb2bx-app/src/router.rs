// Screen navigation state machine.
//
// `Router` holds the current view and the RFQ it refers to. Transitions are
// guarded by the view they start from; a transition the current view does
// not offer is ignored and reported as `false`. Rendering is a pure function
// of (view, active id, user), so views that need an RFQ degrade to a blank
// pane when none is set.

use serde::Serialize;
use tracing::{debug, info};

use xb2bx_core::model::{Role, User};

// ---------------------------------------------------------------------------
// View / Tab / Screen
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Home,
    Rfqs,
    Intel,
    Profile,
    RfqDetail,
    CreateRfq,
    CreateQuote,
}

impl View {
    pub fn as_str(self) -> &'static str {
        match self {
            View::Home => "home",
            View::Rfqs => "rfqs",
            View::Intel => "intel",
            View::Profile => "profile",
            View::RfqDetail => "rfq-detail",
            View::CreateRfq => "create-rfq",
            View::CreateQuote => "create-quote",
        }
    }
}

/// Bottom-navigation destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Home,
    Rfqs,
    Intel,
    Profile,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Home, Tab::Rfqs, Tab::Intel, Tab::Profile];

    pub fn view(self) -> View {
        match self {
            Tab::Home => View::Home,
            Tab::Rfqs => View::Rfqs,
            Tab::Intel => View::Intel,
            Tab::Profile => View::Profile,
        }
    }

    /// Tab for a 1-based number key.
    pub fn from_number(n: u32) -> Option<Tab> {
        match n {
            1 => Some(Tab::Home),
            2 => Some(Tab::Rfqs),
            3 => Some(Tab::Intel),
            4 => Some(Tab::Profile),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Rfqs => "RFQs",
            Tab::Intel => "Intel",
            Tab::Profile => "Profile",
        }
    }

    /// The tab highlighted while `view` is shown.
    pub fn for_view(view: View) -> Option<Tab> {
        match view {
            View::Home => Some(Tab::Home),
            View::Rfqs => Some(Tab::Rfqs),
            View::Intel => Some(Tab::Intel),
            View::Profile => Some(Tab::Profile),
            _ => None,
        }
    }
}

/// What the UI draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Screen {
    Login,
    Dashboard,
    SellerRfqs,
    ResearchHub,
    Profile,
    RfqDetail { rfq_id: i64 },
    CreateRfq,
    CreateQuote { rfq_id: i64 },
    /// Nothing to show: a detail view without an RFQ.
    Blank,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    view: View,
    active_rfq_id: Option<i64>,
}

impl Default for Router {
    fn default() -> Self {
        Router {
            view: View::Home,
            active_rfq_id: None,
        }
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn active_rfq_id(&self) -> Option<i64> {
        self.active_rfq_id
    }

    /// Open an RFQ from a listing.
    pub fn select_rfq(&mut self, rfq_id: i64) -> bool {
        match self.view {
            View::Home | View::Rfqs => self.go_with(View::RfqDetail, rfq_id),
            _ => self.ignore("select_rfq"),
        }
    }

    /// Start quoting an RFQ, from its detail page or the seller listing.
    pub fn request_quote(&mut self, rfq_id: i64) -> bool {
        match self.view {
            View::RfqDetail | View::Rfqs => self.go_with(View::CreateQuote, rfq_id),
            _ => self.ignore("request_quote"),
        }
    }

    /// The dashboard's main button: buyers post an RFQ, everyone else goes
    /// to the listing. Buyers see the dashboard on `rfqs` too.
    pub fn primary_action(&mut self, role: Role) -> bool {
        match (self.view, role) {
            (View::Home | View::Rfqs, Role::Buyer) => self.go(View::CreateRfq),
            (View::Home, _) => self.go(View::Rfqs),
            _ => self.ignore("primary_action"),
        }
    }

    pub fn open_intel(&mut self) -> bool {
        match self.view {
            View::Home | View::Rfqs => self.go(View::Intel),
            _ => self.ignore("open_intel"),
        }
    }

    pub fn back(&mut self) -> bool {
        match self.view {
            View::RfqDetail | View::CreateRfq | View::Intel => self.go(View::Home),
            View::CreateQuote => self.go(View::Rfqs),
            _ => self.ignore("back"),
        }
    }

    /// A create form was submitted successfully.
    pub fn succeeded(&mut self) -> bool {
        match self.view {
            View::CreateRfq => self.go(View::Home),
            View::CreateQuote => self.go(View::Rfqs),
            _ => self.ignore("succeeded"),
        }
    }

    /// Bottom navigation. Always allowed; keeps the active RFQ.
    pub fn navigate(&mut self, tab: Tab) -> bool {
        self.go(tab.view())
    }

    pub fn reset(&mut self) {
        *self = Router::default();
    }

    pub fn screen(&self, user: Option<&User>) -> Screen {
        let Some(user) = user else {
            return Screen::Login;
        };
        match (self.view, self.active_rfq_id) {
            (View::Home, _) => Screen::Dashboard,
            (View::Rfqs, _) if user.is_buyer() => Screen::Dashboard,
            (View::Rfqs, _) => Screen::SellerRfqs,
            (View::Intel, _) => Screen::ResearchHub,
            (View::Profile, _) => Screen::Profile,
            (View::CreateRfq, _) => Screen::CreateRfq,
            (View::RfqDetail, Some(rfq_id)) => Screen::RfqDetail { rfq_id },
            (View::CreateQuote, Some(rfq_id)) => Screen::CreateQuote { rfq_id },
            (View::RfqDetail | View::CreateQuote, None) => Screen::Blank,
        }
    }

    fn go(&mut self, view: View) -> bool {
        info!("Navigate {} -> {}", self.view.as_str(), view.as_str());
        self.view = view;
        true
    }

    fn go_with(&mut self, view: View, rfq_id: i64) -> bool {
        self.active_rfq_id = Some(rfq_id);
        self.go(view)
    }

    fn ignore(&self, transition: &str) -> bool {
        debug!("Ignoring {} from {}", transition, self.view.as_str());
        false
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
