// Application state and orchestration logic.
//
// The event loop owns `AppState` and is the only place it changes. User
// commands arrive from the TUI; network and AI calls run as spawned tasks
// that report back over the event channel, tagged with a fence ticket so
// late answers for superseded requests are dropped. After every change the
// loop pushes a full snapshot to the TUI and a frame to the preview feed.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use xb2bx_api::upload::upload_image;
use xb2bx_api::{ApiClient, RequestError};
use xb2bx_core::config::Config;
use xb2bx_core::model::{
    sort_thread, Credentials, Escrow, EscrowStatus, Message, NewEscrow, NewQuote, NewRfq, Quote,
    Rfq, User,
};
use xb2bx_core::session::SessionStore;
use xb2bx_llm::intel::RESEARCH_UNAVAILABLE;
use xb2bx_llm::{LlmError, MarketIntel, ResearchResult};

use crate::fence::{Fence, Slot, Ticket};
use crate::preview::{PreviewFrame, PreviewUser};
use crate::protocol::{
    AppEvent, AppSnapshot, DraftAssist, Listing, Mutation, Notice, Outcome, RfqDetail, RfqDraft,
    UiUpdate, UserCommand,
};
use crate::router::{Router, Screen, View};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub config: Config,
    pub session: SessionStore,
    pub router: Router,
    pub api: Arc<ApiClient>,
    pub intel: Arc<MarketIntel>,
    pub fence: Fence,

    pub rfqs: Vec<Rfq>,
    pub seller_quotes: Vec<Quote>,
    pub insight: Option<String>,
    pub smart_matches: Vec<String>,
    pub detail: Option<RfqDetail>,
    pub quote_target: Option<Rfq>,
    pub research: Option<ResearchResult>,
    pub draft: DraftAssist,

    /// Slots with a request in flight.
    pub busy: HashSet<Slot>,
    /// Mutations in flight; they share one ticket generation.
    pub pending_mutations: usize,
    pub notice: Option<Notice>,

    /// Request tasks report here.
    pub event_tx: mpsc::Sender<AppEvent>,
    pub preview_tx: watch::Sender<PreviewFrame>,
}

impl AppState {
    pub fn new(
        config: Config,
        session: SessionStore,
        api: Arc<ApiClient>,
        intel: Arc<MarketIntel>,
        event_tx: mpsc::Sender<AppEvent>,
        preview_tx: watch::Sender<PreviewFrame>,
    ) -> Self {
        api.set_token(session.token());
        AppState {
            config,
            session,
            router: Router::new(),
            api,
            intel,
            fence: Fence::new(),
            rfqs: Vec::new(),
            seller_quotes: Vec::new(),
            insight: None,
            smart_matches: Vec::new(),
            detail: None,
            quote_target: None,
            research: None,
            draft: DraftAssist::default(),
            busy: HashSet::new(),
            pending_mutations: 0,
            notice: None,
            event_tx,
            preview_tx,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session.current_user()
    }

    pub fn screen(&self) -> Screen {
        self.router.screen(self.user())
    }

    pub fn build_snapshot(&self) -> AppSnapshot {
        let mut busy: Vec<Slot> = self.busy.iter().copied().collect();
        busy.sort_by_key(|slot| *slot as u8);
        if self.pending_mutations > 0 {
            busy.push(Slot::Mutation);
        }
        AppSnapshot {
            user: self.user().cloned(),
            view: self.router.view(),
            active_rfq_id: self.router.active_rfq_id(),
            screen: self.screen(),
            rfqs: self.rfqs.clone(),
            seller_quotes: self.seller_quotes.clone(),
            insight: self.insight.clone(),
            smart_matches: self.smart_matches.clone(),
            detail: self.detail.clone(),
            quote_target: self.quote_target.clone(),
            research: self.research.clone(),
            draft: self.draft.clone(),
            busy,
            notice: self.notice.clone(),
        }
    }

    pub fn preview_frame(&self) -> PreviewFrame {
        PreviewFrame {
            view: self.router.view(),
            active_rfq_id: self.router.active_rfq_id(),
            screen: self.screen(),
            user: self.user().map(PreviewUser::from),
        }
    }

    /// Publish the navigation frame if it changed.
    pub fn publish_preview(&self) {
        let frame = self.preview_frame();
        self.preview_tx.send_if_modified(|current| {
            if *current == frame {
                false
            } else {
                *current = frame;
                true
            }
        });
    }

    // -----------------------------------------------------------------------
    // Request plumbing
    // -----------------------------------------------------------------------

    /// Run `work` on its own task and deliver its outcome with `ticket`.
    fn spawn_request<F>(&self, ticket: Ticket, work: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = work.await;
            if tx.send(AppEvent::Completed { ticket, outcome }).await.is_err() {
                debug!("Event channel closed, dropping {} completion", ticket.slot);
            }
        });
    }

    fn start(&mut self, slot: Slot) -> Ticket {
        self.busy.insert(slot);
        self.fence.begin(slot)
    }

    fn start_mutation(&mut self) -> Option<Ticket> {
        if self.pending_mutations > 0 {
            self.notice = Some(Notice::info("Still saving, please wait."));
            return None;
        }
        self.pending_mutations += 1;
        Some(self.fence.join(Slot::Mutation))
    }

    // -----------------------------------------------------------------------
    // Screen loads
    // -----------------------------------------------------------------------

    /// Kick off the loads the current screen needs.
    pub fn enter_screen(&mut self) {
        match self.screen() {
            Screen::Dashboard => self.load_listing(false, true),
            Screen::SellerRfqs => self.load_listing(true, false),
            Screen::RfqDetail { rfq_id } => self.load_detail(rfq_id),
            Screen::CreateQuote { rfq_id } => self.load_quote_target(rfq_id),
            Screen::CreateRfq
            | Screen::ResearchHub
            | Screen::Profile
            | Screen::Login
            | Screen::Blank => {}
        }
    }

    fn load_listing(&mut self, seller_quotes: bool, with_insights: bool) {
        let ticket = self.start(Slot::Listing);
        let api = Arc::clone(&self.api);
        self.spawn_request(ticket, async move {
            let result: Result<Listing, RequestError> = async {
                let rfqs = api.rfq().get_all().await?;
                let seller_quotes = if seller_quotes {
                    Some(api.quote().get_seller_quotes().await?)
                } else {
                    None
                };
                Ok::<_, RequestError>(Listing {
                    rfqs,
                    seller_quotes,
                    with_insights,
                })
            }
            .await;
            Outcome::Listing(result)
        });
    }

    fn load_insights(&mut self) {
        let Some(role) = self.user().map(|u| u.role) else {
            return;
        };
        let rfq_count = self.rfqs.len();
        let mut interests: Vec<String> = Vec::new();
        for rfq in &self.rfqs {
            if !rfq.category.is_empty() && !interests.contains(&rfq.category) {
                interests.push(rfq.category.clone());
            }
        }

        let ticket = self.start(Slot::Insights);
        let intel = Arc::clone(&self.intel);
        self.spawn_request(ticket, async move {
            let (insight, matches) = tokio::join!(
                intel.get_market_insights(role, rfq_count),
                intel.get_smart_matches(role, &interests),
            );
            Outcome::Insights { insight, matches }
        });
    }

    fn load_detail(&mut self, rfq_id: i64) {
        if self.detail.as_ref().is_some_and(|d| d.rfq.id != rfq_id) {
            self.detail = None;
        }
        let ticket = self.start(Slot::Detail);
        let api = Arc::clone(&self.api);
        self.spawn_request(ticket, async move {
            let (rfqs, quotes, chat, escrows) = (api.rfq(), api.quote(), api.chat(), api.escrow());
            let (rfq, quotes, messages, escrow) = tokio::join!(
                rfqs.get_by_id(rfq_id),
                quotes.get_by_rfq(rfq_id),
                chat.get_messages(rfq_id),
                escrows.get_for_rfq(rfq_id),
            );
            Outcome::Detail(assemble_detail(rfq, quotes, messages, escrow))
        });
    }

    fn load_quote_target(&mut self, rfq_id: i64) {
        if self.quote_target.as_ref().is_some_and(|r| r.id != rfq_id) {
            self.quote_target = None;
            self.draft.opportunity = None;
        }
        let ticket = self.start(Slot::Detail);
        let api = Arc::clone(&self.api);
        self.spawn_request(ticket, async move {
            Outcome::QuoteTarget(api.rfq().get_by_id(rfq_id).await)
        });
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    pub fn handle_command(&mut self, cmd: UserCommand) {
        if !self.session.is_authenticated()
            && !matches!(
                cmd,
                UserCommand::Login { .. }
                    | UserCommand::Register(_)
                    | UserCommand::DismissNotice
                    | UserCommand::Quit
            )
        {
            debug!("Ignoring {:?} while logged out", cmd);
            return;
        }

        match cmd {
            UserCommand::Login { email, password } => {
                info!("Signing in as {}", email);
                let ticket = self.start(Slot::Auth);
                let api = Arc::clone(&self.api);
                let credentials = Credentials { email, password };
                self.spawn_request(ticket, async move {
                    Outcome::Auth(api.auth().login(&credentials).await)
                });
            }
            UserCommand::Register(registration) => {
                info!("Registering {} as {}", registration.email, registration.role);
                let ticket = self.start(Slot::Auth);
                let api = Arc::clone(&self.api);
                self.spawn_request(ticket, async move {
                    Outcome::Auth(api.auth().register(&registration).await)
                });
            }
            UserCommand::Logout => self.logout(),
            UserCommand::Navigate(tab) => {
                if self.router.navigate(tab) {
                    self.notice = None;
                    self.enter_screen();
                }
            }
            UserCommand::SelectRfq(rfq_id) => {
                if self.router.select_rfq(rfq_id) {
                    self.enter_screen();
                }
            }
            UserCommand::RequestQuote(rfq_id) => {
                if self.router.request_quote(rfq_id) {
                    self.draft.opportunity = None;
                    self.enter_screen();
                }
            }
            UserCommand::PrimaryAction => {
                let Some(role) = self.user().map(|u| u.role) else {
                    return;
                };
                if self.router.primary_action(role) {
                    self.enter_screen();
                }
            }
            UserCommand::OpenIntel => {
                self.router.open_intel();
            }
            UserCommand::Back => {
                if self.router.back() {
                    self.enter_screen();
                }
            }
            UserCommand::Refresh => self.enter_screen(),
            UserCommand::SubmitRfq(draft) => self.submit_rfq(draft),
            UserCommand::SubmitQuote { rfq_id, price } => {
                if !(price.is_finite() && price > 0.0) {
                    self.notice = Some(Notice::error("Enter a price above zero."));
                    return;
                }
                let Some(ticket) = self.start_mutation() else {
                    return;
                };
                info!("Submitting quote of {:.2} for RFQ {}", price, rfq_id);
                let api = Arc::clone(&self.api);
                self.spawn_request(ticket, async move {
                    let quote = NewQuote { rfq_id, price };
                    Outcome::Mutation(api.quote().create(&quote).await.map(Mutation::QuoteCreated))
                });
            }
            UserCommand::SendMessage { rfq_id, text } => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return;
                }
                let Some(ticket) = self.start_mutation() else {
                    return;
                };
                let api = Arc::clone(&self.api);
                self.spawn_request(ticket, async move {
                    Outcome::Mutation(
                        api.chat()
                            .send_message(rfq_id, &text)
                            .await
                            .map(Mutation::MessageSent),
                    )
                });
            }
            UserCommand::FundEscrow { rfq_id, amount } => {
                let Some(ticket) = self.start_mutation() else {
                    return;
                };
                info!("Funding escrow of {:.2} for RFQ {}", amount, rfq_id);
                let api = Arc::clone(&self.api);
                self.spawn_request(ticket, async move {
                    let escrow = NewEscrow {
                        rfq_id,
                        amount,
                        status: Some(EscrowStatus::Funded),
                    };
                    Outcome::Mutation(api.escrow().create(&escrow).await.map(Mutation::EscrowFunded))
                });
            }
            UserCommand::ReleaseEscrow { rfq_id, escrow_id } => {
                let Some(ticket) = self.start_mutation() else {
                    return;
                };
                info!("Releasing escrow {} for RFQ {}", escrow_id, rfq_id);
                let api = Arc::clone(&self.api);
                self.spawn_request(ticket, async move {
                    Outcome::Mutation(
                        api.escrow()
                            .release(escrow_id)
                            .await
                            .map(|()| Mutation::EscrowReleased { rfq_id }),
                    )
                });
            }
            UserCommand::GenerateSpecs { product } => {
                if product.trim().is_empty() {
                    self.notice = Some(Notice::error("Enter a product name first."));
                    return;
                }
                let ticket = self.start(Slot::Specs);
                let intel = Arc::clone(&self.intel);
                self.spawn_request(ticket, async move {
                    Outcome::Specs(intel.generate_specs(&product).await)
                });
            }
            UserCommand::GenerateImage { product } => {
                if product.trim().is_empty() {
                    self.notice = Some(Notice::error("Enter a product name first."));
                    return;
                }
                let ticket = self.start(Slot::Image);
                let intel = Arc::clone(&self.intel);
                self.spawn_request(ticket, async move {
                    Outcome::Image(intel.generate_product_image(&product).await)
                });
            }
            UserCommand::Research { query } => {
                let query = query.trim().to_string();
                if query.is_empty() {
                    return;
                }
                info!("Researching {:?}", query);
                let ticket = self.start(Slot::Research);
                let intel = Arc::clone(&self.intel);
                self.spawn_request(ticket, async move {
                    Outcome::Research(intel.research_product(&query).await)
                });
            }
            UserCommand::AnalyzeOpportunity => {
                let Some(rfq) = self.quote_target.clone() else {
                    debug!("No RFQ loaded to analyze");
                    return;
                };
                let ticket = self.start(Slot::Opportunity);
                let intel = Arc::clone(&self.intel);
                self.spawn_request(ticket, async move {
                    Outcome::Opportunity(intel.analyze_opportunity(&rfq.product, &rfq.specs).await)
                });
            }
            UserCommand::DismissNotice => self.notice = None,
            UserCommand::Quit => {}
        }
    }

    fn submit_rfq(&mut self, draft: RfqDraft) {
        if draft.product.trim().is_empty() {
            self.notice = Some(Notice::error("Product is required."));
            return;
        }
        if draft.quantity == 0 {
            self.notice = Some(Notice::error("Quantity must be at least 1."));
            return;
        }
        let Some(ticket) = self.start_mutation() else {
            return;
        };
        info!("Posting RFQ for {} x{}", draft.product, draft.quantity);

        let generated = self.draft.image.clone().filter(|img| !img.is_empty());
        let api = Arc::clone(&self.api);
        self.spawn_request(ticket, async move {
            let image_url = match &draft.image_path {
                Some(path) => Some(upload_image(path).await).filter(|url| !url.is_empty()),
                None => generated,
            };
            let rfq = NewRfq {
                product: draft.product.trim().to_string(),
                quantity: draft.quantity,
                specs: draft.specs,
                category: draft.category,
                image_url,
                urgency: Some(draft.urgency),
            };
            Outcome::Mutation(api.rfq().create(&rfq).await.map(Mutation::RfqCreated))
        });
    }

    fn logout(&mut self) {
        info!("Signing out");
        if let Err(e) = self.session.logout() {
            warn!("Failed to clear stored session: {}", e);
            self.notice = Some(Notice::error(format!("Signed out, but {e}")));
        } else {
            self.notice = None;
        }
        self.api.set_token(None);
        self.router.reset();
        self.fence.advance_all();
        self.clear_data();
    }

    fn clear_data(&mut self) {
        self.rfqs.clear();
        self.seller_quotes.clear();
        self.insight = None;
        self.smart_matches.clear();
        self.detail = None;
        self.quote_target = None;
        self.research = None;
        self.draft = DraftAssist::default();
        self.busy.clear();
        self.pending_mutations = 0;
    }

    // -----------------------------------------------------------------------
    // Completions
    // -----------------------------------------------------------------------

    pub fn handle_event(&mut self, event: AppEvent) {
        let AppEvent::Completed { ticket, outcome } = event;
        if !self.fence.is_current(ticket) {
            debug!(
                "Discarding stale {} completion (gen {})",
                ticket.slot, ticket.generation
            );
            return;
        }
        if ticket.slot == Slot::Mutation {
            self.pending_mutations = self.pending_mutations.saturating_sub(1);
        } else {
            self.busy.remove(&ticket.slot);
        }

        match outcome {
            Outcome::Auth(Ok(auth)) => {
                let name = auth.user.name.clone();
                match self.session.login(&auth.token, auth.user) {
                    Ok(()) => {
                        info!("Signed in as {}", name);
                        self.api.set_token(self.session.token());
                        self.router.reset();
                        self.clear_data();
                        self.notice = Some(Notice::info(format!("Welcome, {name}.")));
                        self.enter_screen();
                    }
                    Err(e) => {
                        warn!("Login rejected: {}", e);
                        self.notice = Some(Notice::error(format!("Sign-in failed: {e}")));
                    }
                }
            }
            Outcome::Auth(Err(e)) => self.request_failed("Sign-in", &e),

            Outcome::Listing(Ok(listing)) => {
                self.rfqs = listing.rfqs;
                if let Some(quotes) = listing.seller_quotes {
                    self.seller_quotes = quotes;
                }
                if listing.with_insights && self.screen() == Screen::Dashboard {
                    self.load_insights();
                }
            }
            Outcome::Listing(Err(e)) => self.request_failed("Loading RFQs", &e),

            Outcome::Detail(Ok(detail)) => self.detail = Some(detail),
            Outcome::Detail(Err(e)) => self.request_failed("Loading RFQ", &e),

            Outcome::QuoteTarget(Ok(rfq)) => self.quote_target = Some(rfq),
            Outcome::QuoteTarget(Err(e)) => self.request_failed("Loading RFQ", &e),

            Outcome::Insights { insight, matches } => {
                self.insight = Some(self.ai_or_default("Market insight", insight));
                self.smart_matches = self.ai_or_default("Smart matches", matches);
            }
            Outcome::Research(result) => {
                let result = self.ai_or_else("Research", result, || ResearchResult {
                    text: RESEARCH_UNAVAILABLE.to_string(),
                    sources: Vec::new(),
                });
                self.research = Some(result);
            }
            Outcome::Specs(result) => {
                self.draft.specs = Some(self.ai_or_default("Spec generation", result));
            }
            Outcome::Image(result) => {
                let image = self.ai_or_default("Image generation", result);
                if image.is_empty() && self.notice.is_none() {
                    self.notice = Some(Notice::info("No image was returned."));
                }
                self.draft.image = Some(image);
            }
            Outcome::Opportunity(result) => {
                self.draft.opportunity = Some(self.ai_or_default("Opportunity analysis", result));
            }

            Outcome::Mutation(Ok(done)) => self.mutation_done(done),
            Outcome::Mutation(Err(e)) => self.request_failed("Saving", &e),
        }
    }

    fn mutation_done(&mut self, done: Mutation) {
        match done {
            Mutation::RfqCreated(rfq) => {
                info!("RFQ {} posted", rfq.id);
                self.draft = DraftAssist::default();
                if self.router.view() == View::CreateRfq {
                    self.router.succeeded();
                }
                self.notice = Some(Notice::info(format!("RFQ posted: {}", rfq.product)));
                self.enter_screen();
            }
            Mutation::QuoteCreated(quote) => {
                info!("Quote {} submitted for RFQ {}", quote.id, quote.rfq_id);
                self.draft.opportunity = None;
                if self.router.view() == View::CreateQuote {
                    self.router.succeeded();
                }
                self.notice = Some(Notice::info("Quote submitted."));
                self.enter_screen();
            }
            Mutation::MessageSent(message) => self.reload_detail_for(message.rfq_id),
            Mutation::EscrowFunded(escrow) => {
                self.notice = Some(Notice::info(format!("Escrow funded: {:.2}", escrow.amount)));
                self.reload_detail_for(escrow.rfq_id);
            }
            Mutation::EscrowReleased { rfq_id } => {
                self.notice = Some(Notice::info("Escrow released."));
                self.reload_detail_for(rfq_id);
            }
        }
    }

    fn reload_detail_for(&mut self, rfq_id: i64) {
        if self.screen() == (Screen::RfqDetail { rfq_id }) {
            self.load_detail(rfq_id);
        }
    }

    fn request_failed(&mut self, what: &str, error: &RequestError) {
        warn!("{} failed: {}", what, error);
        self.notice = Some(Notice::error(format!("{what} failed: {error}")));
    }

    fn ai_or_default<T: Default>(&mut self, what: &str, result: Result<T, LlmError>) -> T {
        self.ai_or_else(what, result, T::default)
    }

    /// Unwrap an AI result, falling back to a placeholder. A missing API key
    /// is logged but not shown as an error.
    fn ai_or_else<T>(
        &mut self,
        what: &str,
        result: Result<T, LlmError>,
        placeholder: impl FnOnce() -> T,
    ) -> T {
        match result {
            Ok(value) => value,
            Err(LlmError::NotConfigured) => {
                debug!("{} skipped: AI not configured", what);
                placeholder()
            }
            Err(e) => {
                warn!("{} failed: {}", what, e);
                self.notice = Some(Notice::error(format!("{what} unavailable: {e}")));
                placeholder()
            }
        }
    }
}

/// Combine the four detail lookups. The RFQ, its quotes, and its thread are
/// required; a failed escrow lookup means the RFQ has no escrow.
fn assemble_detail(
    rfq: Result<Rfq, RequestError>,
    quotes: Result<Vec<Quote>, RequestError>,
    messages: Result<Vec<Message>, RequestError>,
    escrow: Result<Escrow, RequestError>,
) -> Result<RfqDetail, RequestError> {
    let rfq = rfq?;
    let quotes = quotes?;
    let mut messages = messages?;
    sort_thread(&mut messages);
    let escrow = match escrow {
        Ok(escrow) => Some(escrow),
        Err(e) => {
            debug!("No escrow for RFQ {}: {}", rfq.id, e);
            None
        }
    };
    Ok(RfqDetail {
        rfq,
        quotes,
        messages,
        escrow,
    })
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the application event loop until `Quit` or the TUI goes away.
///
/// Selects over user commands and request completions; after each one the
/// current snapshot goes to `ui_tx`.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut event_rx: mpsc::Receiver<AppEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    state.enter_screen();
    push_snapshot(&state, &ui_tx).await;

    let mut events_open = true;

    loop {
        tokio::select! {
            event = event_rx.recv(), if events_open => {
                match event {
                    Some(event) => state.handle_event(event),
                    None => {
                        info!("Event channel closed");
                        events_open = false;
                        continue;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => state.handle_command(cmd),
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }

        push_snapshot(&state, &ui_tx).await;
    }

    info!("Application event loop exiting");
    Ok(())
}

async fn push_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    state.publish_preview();
    let _ = ui_tx
        .send(UiUpdate::Snapshot(Box::new(state.build_snapshot())))
        .await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use xb2bx_api::{HttpRequest, HttpResponse, HttpTransport};
    use xb2bx_core::config::{
        ApiConfig, CredentialsConfig, LlmConfig, PreviewConfig, StorageConfig,
    };
    use xb2bx_core::model::Role;
    use xb2bx_core::store::MemoryStore;
    use xb2bx_llm::client::{GenerateRequest, GenerativeModel};
    use xb2bx_llm::wire::GenerateResponse;

    use crate::router::Tab;

    /// Routes requests by "METHOD path" to canned (status, body) replies.
    #[derive(Default)]
    struct Routes {
        replies: Mutex<Vec<(String, VecDeque<(u16, String)>)>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Routes {
        fn on(self, key: &str, status: u16, body: &str) -> Self {
            {
                let mut replies = self.replies.lock().unwrap();
                match replies.iter_mut().find(|(k, _)| k == key) {
                    Some((_, queue)) => queue.push_back((status, body.to_string())),
                    None => replies.push((
                        key.to_string(),
                        VecDeque::from([(status, body.to_string())]),
                    )),
                }
            }
            self
        }
    }

    #[async_trait]
    impl HttpTransport for Routes {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
            let path = request.url.trim_start_matches("http://api.test").to_string();
            let key = format!("{} {}", request.method.as_str(), path);
            self.seen.lock().unwrap().push(request);
            let mut replies = self.replies.lock().unwrap();
            let Some((_, queue)) = replies.iter_mut().find(|(k, _)| *k == key) else {
                return Ok(HttpResponse {
                    status: 404,
                    body: r#"{"message":"no route"}"#.into(),
                });
            };
            let (status, body) = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            };
            Ok(HttpResponse { status, body })
        }
    }

    struct NoModel;

    #[async_trait]
    impl GenerativeModel for NoModel {
        async fn generate(&self, _: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
            Err(LlmError::NotConfigured)
        }
    }

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                base_url: "http://api.test".into(),
            },
            llm: LlmConfig {
                endpoint: "https://ai.test".into(),
                research_model: "r".into(),
                text_model: "t".into(),
                image_model: "i".into(),
            },
            preview: PreviewConfig::default(),
            storage: StorageConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }

    const BUYER: &str = r#"{"id":1,"name":"Ada","email":"ada@example.com","role":"buyer"}"#;

    fn rfq_json(id: i64, category: &str) -> String {
        format!(
            r#"{{"id":{id},"buyer_id":1,"product":"Valve {id}","quantity":10,"specs":"DN50","category":"{category}"}}"#
        )
    }

    fn state_with(routes: Routes) -> (AppState, mpsc::Receiver<AppEvent>) {
        let config = test_config();
        let (event_tx, event_rx) = mpsc::channel(64);
        let (preview_tx, _) = watch::channel(PreviewFrame::default());
        let session = SessionStore::bootstrap(Arc::new(MemoryStore::new()));
        let api = Arc::new(ApiClient::with_transport(
            &config.api.base_url,
            Arc::new(routes),
        ));
        let intel = Arc::new(MarketIntel::new(Arc::new(NoModel), &config.llm));
        (
            AppState::new(config, session, api, intel, event_tx, preview_tx),
            event_rx,
        )
    }

    fn logged_in(routes: Routes) -> (AppState, mpsc::Receiver<AppEvent>) {
        let (mut state, rx) = state_with(routes);
        let user: User = serde_json::from_str(BUYER).unwrap();
        state.session.login("abc", user).unwrap();
        state.api.set_token(Some("abc"));
        (state, rx)
    }

    async fn settle(state: &mut AppState, rx: &mut mpsc::Receiver<AppEvent>) {
        while let Ok(Some(event)) =
            tokio::time::timeout(std::time::Duration::from_millis(200), rx.recv()).await
        {
            state.handle_event(event);
        }
    }

    #[test]
    fn snapshot_starts_on_login() {
        let (state, _rx) = state_with(Routes::default());
        let snap = state.build_snapshot();
        assert_eq!(snap.screen, Screen::Login);
        assert!(snap.user.is_none());
        assert!(snap.busy.is_empty());
    }

    #[tokio::test]
    async fn commands_ignored_while_logged_out() {
        let (mut state, _rx) = state_with(Routes::default());
        state.handle_command(UserCommand::SelectRfq(3));
        assert_eq!(state.router.view(), View::Home);
        assert_eq!(state.router.active_rfq_id(), None);
    }

    #[tokio::test]
    async fn login_persists_session_and_loads_dashboard() {
        let body = format!(r#"{{"token":"abc","user":{BUYER}}}"#);
        let routes = Routes::default()
            .on("POST /auth/login", 200, &body)
            .on("GET /rfq", 200, &format!("[{}]", rfq_json(7, "metals")));
        let (mut state, mut rx) = state_with(routes);

        state.handle_command(UserCommand::Login {
            email: "ada@example.com".into(),
            password: "pw".into(),
        });
        assert!(state.busy.contains(&Slot::Auth));
        settle(&mut state, &mut rx).await;

        assert_eq!(state.session.token(), Some("abc"));
        assert!(state.api.has_token());
        assert_eq!(state.screen(), Screen::Dashboard);
        assert_eq!(state.rfqs.len(), 1);
        // AI disabled: placeholders, no error notice.
        assert_eq!(state.insight.as_deref(), Some(""));
        assert!(state.smart_matches.is_empty());
        assert!(state.busy.is_empty());
    }

    #[tokio::test]
    async fn failed_login_shows_backend_message() {
        let routes = Routes::default().on(
            "POST /auth/login",
            401,
            r#"{"message":"Invalid credentials"}"#,
        );
        let (mut state, mut rx) = state_with(routes);
        state.handle_command(UserCommand::Login {
            email: "x@example.com".into(),
            password: "bad".into(),
        });
        settle(&mut state, &mut rx).await;

        assert!(!state.session.is_authenticated());
        let notice = state.notice.unwrap();
        assert!(notice.text.contains("Invalid credentials"), "{}", notice.text);
    }

    #[tokio::test]
    async fn stale_detail_is_discarded() {
        let (mut state, _rx) = logged_in(Routes::default());
        let old = state.fence.begin(Slot::Detail);
        let _new = state.fence.begin(Slot::Detail);
        let rfq: Rfq = serde_json::from_str(&rfq_json(1, "x")).unwrap();
        state.handle_event(AppEvent::Completed {
            ticket: old,
            outcome: Outcome::QuoteTarget(Ok(rfq)),
        });
        assert!(state.quote_target.is_none());
    }

    #[tokio::test]
    async fn logout_fences_in_flight_requests() {
        let (mut state, _rx) = logged_in(Routes::default());
        let ticket = state.fence.begin(Slot::Listing);
        state.handle_command(UserCommand::Logout);

        assert!(!state.session.is_authenticated());
        assert!(!state.api.has_token());
        assert_eq!(state.screen(), Screen::Login);

        let rfq: Rfq = serde_json::from_str(&rfq_json(1, "x")).unwrap();
        state.handle_event(AppEvent::Completed {
            ticket,
            outcome: Outcome::Listing(Ok(Listing {
                rfqs: vec![rfq],
                seller_quotes: None,
                with_insights: false,
            })),
        });
        assert!(state.rfqs.is_empty());
    }

    #[tokio::test]
    async fn detail_without_escrow_is_not_an_error() {
        let routes = Routes::default()
            .on("GET /rfq/42", 200, &rfq_json(42, "metals"))
            .on("GET /quote/rfq/42", 200, "[]")
            .on(
                "GET /chat/42",
                200,
                r#"[{"id":2,"rfq_id":42,"sender_id":1,"message":"second","created_at":"2024-05-02T10:00:00Z"},
                    {"id":1,"rfq_id":42,"sender_id":2,"message":"first","created_at":"2024-05-01T10:00:00Z"}]"#,
            )
            .on("GET /escrow/rfq/42", 404, r#"{"message":"not found"}"#);
        let (mut state, mut rx) = logged_in(routes);

        state.handle_command(UserCommand::SelectRfq(42));
        settle(&mut state, &mut rx).await;

        let detail = state.detail.as_ref().unwrap();
        assert_eq!(detail.rfq.id, 42);
        assert!(detail.escrow.is_none());
        assert_eq!(detail.messages[0].message, "first");
        assert!(state.notice.is_none());
    }

    #[tokio::test]
    async fn rfq_not_found_becomes_notice() {
        let routes = Routes::default().on("GET /rfq/9", 404, r#"{"message":"not found"}"#);
        let (mut state, mut rx) = logged_in(routes);
        state.handle_command(UserCommand::SelectRfq(9));
        settle(&mut state, &mut rx).await;
        assert!(state.detail.is_none());
        assert_eq!(state.notice.unwrap().text, "Loading RFQ failed: not found");
    }

    #[tokio::test]
    async fn posting_rfq_returns_home() {
        let routes = Routes::default()
            .on("POST /rfq", 201, &rfq_json(8, "metals"))
            .on("GET /rfq", 200, &format!("[{}]", rfq_json(8, "metals")));
        let (mut state, mut rx) = logged_in(routes);
        state.handle_command(UserCommand::PrimaryAction);
        assert_eq!(state.router.view(), View::CreateRfq);

        state.handle_command(UserCommand::SubmitRfq(RfqDraft {
            product: "Valve 8".into(),
            quantity: 10,
            ..RfqDraft::default()
        }));
        settle(&mut state, &mut rx).await;

        assert_eq!(state.router.view(), View::Home);
        assert_eq!(state.rfqs.len(), 1);
        assert_eq!(state.pending_mutations, 0);
    }

    #[tokio::test]
    async fn invalid_rfq_is_rejected_locally() {
        let (mut state, _rx) = logged_in(Routes::default());
        state.handle_command(UserCommand::PrimaryAction);
        state.handle_command(UserCommand::SubmitRfq(RfqDraft::default()));
        assert_eq!(state.pending_mutations, 0);
        assert_eq!(state.notice.unwrap().text, "Product is required.");
    }

    #[tokio::test]
    async fn navigate_tab_switches_view() {
        let routes = Routes::default().on("GET /rfq", 200, "[]");
        let (mut state, mut rx) = logged_in(routes);
        state.handle_command(UserCommand::Navigate(Tab::Profile));
        assert_eq!(state.screen(), Screen::Profile);
        settle(&mut state, &mut rx).await;
    }

    #[tokio::test]
    async fn event_loop_handles_quit_command() {
        let (state, event_rx) = logged_in(Routes::default().on("GET /rfq", 200, "[]"));
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (ui_tx, mut ui_rx) = mpsc::channel(64);

        let handle = tokio::spawn(run(cmd_rx, event_rx, ui_tx, state));
        cmd_tx.send(UserCommand::Quit).await.unwrap();
        handle.await.unwrap().unwrap();

        let UiUpdate::Snapshot(first) = ui_rx.recv().await.unwrap();
        assert_eq!(first.screen, Screen::Dashboard);
        assert_eq!(first.user.map(|u| u.role), Some(Role::Buyer));
    }
}
