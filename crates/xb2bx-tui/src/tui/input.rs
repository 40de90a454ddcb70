// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// app loop, or into local ViewState mutations (selection, form editing,
// quit confirmation).

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use xb2bx_app::protocol::{RfqDraft, UserCommand};
use xb2bx_app::router::{Screen, Tab};
use xb2bx_core::model::{Registration, Role, Urgency};

use super::form::{register_field, rfq_field};
use super::ViewState;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app loop. Returns `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports both press and release.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c') {
        return Some(UserCommand::Quit);
    }

    if state.confirm_quit {
        return handle_confirm_quit(key_event, state);
    }

    if state.screen() == Screen::Login {
        return handle_login(key_event, state);
    }

    if state.editing {
        return handle_editing(key_event, state);
    }

    handle_normal(key_event, state)
}

/// In quit confirmation mode `y`/`q` confirm, `n`/`Esc` cancel, and every
/// other key is swallowed.
fn handle_confirm_quit(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

fn handle_login(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('r') {
        state.register_mode = !state.register_mode;
        state.local_error = None;
        return None;
    }

    match key_event.code {
        KeyCode::Esc => {
            state.confirm_quit = true;
            None
        }
        KeyCode::Enter => {
            let form = state.active_form_mut()?;
            if !form.is_last() {
                form.next();
                return None;
            }
            submit_login(state)
        }
        _ => {
            edit_key(key_event.code, state);
            None
        }
    }
}

/// Keys while a screen form has focus. Enter on the last field submits.
fn handle_editing(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            state.editing = false;
            None
        }
        KeyCode::Enter => {
            let form = state.active_form_mut()?;
            if !form.is_last() {
                form.next();
                return None;
            }
            state.editing = false;
            submit_form(state)
        }
        code => {
            edit_key(code, state);
            None
        }
    }
}

/// Shared field navigation and typing.
fn edit_key(code: KeyCode, state: &mut ViewState) {
    let Some(form) = state.active_form_mut() else {
        return;
    };
    match code {
        KeyCode::Tab | KeyCode::Down => form.next(),
        KeyCode::BackTab | KeyCode::Up => form.prev(),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) => form.push(c),
        _ => {}
    }
}

fn handle_normal(key_event: KeyEvent, state: &mut ViewState) -> Option<UserCommand> {
    let screen = state.screen();
    match key_event.code {
        KeyCode::Char(c @ '1'..='4') => c.to_digit(10).and_then(Tab::from_number).map(UserCommand::Navigate),

        KeyCode::Down | KeyCode::Char('j') => {
            let len = state.list_len();
            if len > 0 {
                state.selected = (state.selected + 1).min(len - 1);
            }
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.selected = state.selected.saturating_sub(1);
            None
        }

        KeyCode::Enter => match screen {
            Screen::Dashboard | Screen::SellerRfqs => {
                state.selected_rfq().map(|r| UserCommand::SelectRfq(r.id))
            }
            Screen::CreateRfq | Screen::CreateQuote { .. } => submit_form(state),
            Screen::ResearchHub | Screen::RfqDetail { .. } => {
                state.editing = true;
                None
            }
            _ => None,
        },

        // Edit the current screen's form
        KeyCode::Char('e') | KeyCode::Char('/') | KeyCode::Char('m') => {
            if state.active_form().is_some() {
                state.editing = true;
            }
            None
        }

        KeyCode::Char('o') => match screen {
            Screen::Dashboard | Screen::SellerRfqs => {
                state.selected_rfq().map(|r| UserCommand::RequestQuote(r.id))
            }
            Screen::RfqDetail { rfq_id } => Some(UserCommand::RequestQuote(rfq_id)),
            _ => None,
        },
        KeyCode::Char('a') => Some(UserCommand::PrimaryAction),
        KeyCode::Char('i') => Some(UserCommand::OpenIntel),
        KeyCode::Esc | KeyCode::Char('b') => Some(UserCommand::Back),
        KeyCode::Char('r') => Some(UserCommand::Refresh),
        KeyCode::Char('n') => {
            state.local_error = None;
            Some(UserCommand::DismissNotice)
        }

        // AI assists
        KeyCode::Char('s') if screen == Screen::CreateRfq => {
            let product = required_product(state)?;
            Some(UserCommand::GenerateSpecs { product })
        }
        KeyCode::Char('g') if screen == Screen::CreateRfq => {
            let product = required_product(state)?;
            Some(UserCommand::GenerateImage { product })
        }
        KeyCode::Char('g') if matches!(screen, Screen::CreateQuote { .. }) => {
            Some(UserCommand::AnalyzeOpportunity)
        }

        // Escrow
        KeyCode::Char('f') => fund_escrow(state),
        KeyCode::Char('x') => release_escrow(state),

        KeyCode::Char('l') if screen == Screen::Profile => Some(UserCommand::Logout),

        KeyCode::Char('q') => {
            state.confirm_quit = true;
            None
        }

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

fn reject(state: &mut ViewState, message: &str) -> Option<UserCommand> {
    state.local_error = Some(message.to_string());
    None
}

fn submit_login(state: &mut ViewState) -> Option<UserCommand> {
    state.local_error = None;
    if state.register_mode {
        let form = &state.register_form;
        let name = form.value(register_field::NAME).trim().to_string();
        let email = form.value(register_field::EMAIL).trim().to_string();
        let password = form.value(register_field::PASSWORD).to_string();
        let role = match parse_role(form.value(register_field::ROLE)) {
            Some(role) => role,
            None => return reject(state, "Role must be buyer or seller."),
        };
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return reject(state, "Name, email and password are required.");
        }
        return Some(UserCommand::Register(Registration {
            name,
            email,
            password,
            role,
        }));
    }

    let email = state.login_form.value(0).trim().to_string();
    let password = state.login_form.value(1).to_string();
    if email.is_empty() || password.is_empty() {
        return reject(state, "Email and password are required.");
    }
    Some(UserCommand::Login { email, password })
}

/// Accounts are created as buyers unless seller is asked for.
fn parse_role(input: &str) -> Option<Role> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" | "buyer" => Some(Role::Buyer),
        "seller" => Some(Role::Seller),
        _ => None,
    }
}

fn submit_form(state: &mut ViewState) -> Option<UserCommand> {
    state.local_error = None;
    match state.screen() {
        Screen::CreateRfq => submit_rfq(state),
        Screen::CreateQuote { rfq_id } => {
            let raw = state.quote_form.value(0).trim();
            match raw.parse::<f64>() {
                Ok(price) if price.is_finite() => Some(UserCommand::SubmitQuote { rfq_id, price }),
                _ => reject(state, "Price must be a number."),
            }
        }
        Screen::ResearchHub => {
            let query = state.research_form.value(0).trim().to_string();
            if query.is_empty() {
                return None;
            }
            Some(UserCommand::Research { query })
        }
        Screen::RfqDetail { rfq_id } => {
            let text = state.message_form.value(0).trim().to_string();
            if text.is_empty() {
                return None;
            }
            state.message_form.clear();
            Some(UserCommand::SendMessage { rfq_id, text })
        }
        _ => None,
    }
}

fn submit_rfq(state: &mut ViewState) -> Option<UserCommand> {
    let form = &state.rfq_form;
    let quantity = match form.value(rfq_field::QUANTITY).trim().parse::<u64>() {
        Ok(quantity) => quantity,
        Err(_) => return reject(state, "Quantity must be a whole number."),
    };
    let urgency = match Urgency::parse(form.value(rfq_field::URGENCY)) {
        Some(urgency) => urgency,
        None => return reject(state, "Urgency must be normal, high or critical."),
    };
    let image = form.value(rfq_field::IMAGE).trim();
    Some(UserCommand::SubmitRfq(RfqDraft {
        product: form.value(rfq_field::PRODUCT).trim().to_string(),
        quantity,
        specs: form.value(rfq_field::SPECS).trim().to_string(),
        category: form.value(rfq_field::CATEGORY).trim().to_string(),
        urgency,
        image_path: (!image.is_empty()).then(|| PathBuf::from(image)),
    }))
}

fn required_product(state: &mut ViewState) -> Option<String> {
    let product = state.rfq_form.value(rfq_field::PRODUCT).trim().to_string();
    if product.is_empty() {
        state.local_error = Some("Enter a product first.".to_string());
        return None;
    }
    Some(product)
}

/// Fund escrow for the highlighted quote. Buyers only.
fn fund_escrow(state: &mut ViewState) -> Option<UserCommand> {
    let Screen::RfqDetail { rfq_id } = state.screen() else {
        return None;
    };
    if !state.user().is_some_and(|u| u.is_buyer()) {
        return reject(state, "Only buyers can fund escrow.");
    }
    let has_escrow = state
        .snapshot
        .as_ref()
        .and_then(|s| s.detail.as_ref())
        .is_some_and(|d| d.escrow.is_some());
    if has_escrow {
        return reject(state, "This RFQ already has an escrow.");
    }
    let amount = state.selected_quote()?.price;
    Some(UserCommand::FundEscrow { rfq_id, amount })
}

fn release_escrow(state: &mut ViewState) -> Option<UserCommand> {
    let Screen::RfqDetail { rfq_id } = state.screen() else {
        return None;
    };
    let escrow = state.snapshot.as_ref()?.detail.as_ref()?.escrow.as_ref()?;
    Some(UserCommand::ReleaseEscrow {
        rfq_id,
        escrow_id: escrow.id,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
