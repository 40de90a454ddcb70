// Message types exchanged between the TUI, the app loop, and request tasks.

use std::path::PathBuf;

use xb2bx_api::RequestError;
use xb2bx_core::model::{
    AuthResponse, Escrow, Message, Quote, Registration, Rfq, Urgency, User,
};
use xb2bx_llm::{LlmError, ResearchResult};

use crate::fence::{Slot, Ticket};
use crate::router::{Screen, Tab, View};

// ---------------------------------------------------------------------------
// TUI -> app
// ---------------------------------------------------------------------------

/// Contents of the create-RFQ form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RfqDraft {
    pub product: String,
    pub quantity: u64,
    pub specs: String,
    pub category: String,
    pub urgency: Urgency,
    /// Local image to attach. When absent, a generated render is used if
    /// one exists.
    pub image_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Login { email: String, password: String },
    Register(Registration),
    Logout,
    Navigate(Tab),
    SelectRfq(i64),
    RequestQuote(i64),
    PrimaryAction,
    OpenIntel,
    Back,
    /// Reload the data behind the current screen.
    Refresh,
    SubmitRfq(RfqDraft),
    SubmitQuote { rfq_id: i64, price: f64 },
    SendMessage { rfq_id: i64, text: String },
    FundEscrow { rfq_id: i64, amount: f64 },
    ReleaseEscrow { rfq_id: i64, escrow_id: i64 },
    GenerateSpecs { product: String },
    GenerateImage { product: String },
    Research { query: String },
    /// Analyze the RFQ currently being quoted.
    AnalyzeOpportunity,
    DismissNotice,
    Quit,
}

// ---------------------------------------------------------------------------
// Request tasks -> app
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum AppEvent {
    Completed { ticket: Ticket, outcome: Outcome },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub rfqs: Vec<Rfq>,
    /// Present when the listing was loaded for the seller screen.
    pub seller_quotes: Option<Vec<Quote>>,
    /// Follow up with dashboard insights once the listing is in.
    pub with_insights: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RfqDetail {
    pub rfq: Rfq,
    pub quotes: Vec<Quote>,
    /// Sorted by timestamp.
    pub messages: Vec<Message>,
    /// `None` when the RFQ has no escrow (or the lookup failed).
    pub escrow: Option<Escrow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    RfqCreated(Rfq),
    QuoteCreated(Quote),
    MessageSent(Message),
    EscrowFunded(Escrow),
    EscrowReleased { rfq_id: i64 },
}

#[derive(Debug)]
pub enum Outcome {
    Auth(Result<AuthResponse, RequestError>),
    Listing(Result<Listing, RequestError>),
    Detail(Result<RfqDetail, RequestError>),
    QuoteTarget(Result<Rfq, RequestError>),
    Insights {
        insight: Result<String, LlmError>,
        matches: Result<Vec<String>, LlmError>,
    },
    Research(Result<ResearchResult, LlmError>),
    Specs(Result<String, LlmError>),
    Image(Result<String, LlmError>),
    Opportunity(Result<String, LlmError>),
    Mutation(Result<Mutation, RequestError>),
}

// ---------------------------------------------------------------------------
// App -> TUI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// AI helper output on the create-RFQ and create-quote forms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftAssist {
    pub specs: Option<String>,
    /// `data:` URL of the generated render.
    pub image: Option<String>,
    pub opportunity: Option<String>,
}

/// Everything the TUI needs to draw a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSnapshot {
    pub user: Option<User>,
    pub view: View,
    pub active_rfq_id: Option<i64>,
    pub screen: Screen,
    pub rfqs: Vec<Rfq>,
    pub seller_quotes: Vec<Quote>,
    pub insight: Option<String>,
    pub smart_matches: Vec<String>,
    pub detail: Option<RfqDetail>,
    pub quote_target: Option<Rfq>,
    pub research: Option<ResearchResult>,
    pub draft: DraftAssist,
    pub busy: Vec<Slot>,
    pub notice: Option<Notice>,
}

impl AppSnapshot {
    pub fn is_busy(&self, slot: Slot) -> bool {
        self.busy.contains(&slot)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Snapshot(Box<AppSnapshot>),
}
