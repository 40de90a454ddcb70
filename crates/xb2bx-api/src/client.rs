// Typed marketplace API client.
//
// Every call goes through `ApiClient::request`, which attaches the JSON
// content type and (when logged in) the bearer token, then maps non-2xx
// responses to `RequestError::Status`. Resource groups are thin borrowed
// views (`client.rfq().get_all()`) so callers read like the REST table.

use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use xb2bx_core::model::{
    AuthResponse, Credentials, Escrow, Message, NewEscrow, NewMessage, NewQuote, NewRfq, Quote,
    Registration, Rfq,
};

use crate::error::RequestError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Client over the production reqwest transport.
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(base_url: &str, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            token: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set or clear the bearer token attached to subsequent requests. An
    /// empty token is treated as no token.
    pub fn set_token(&self, token: Option<&str>) {
        let token = token.filter(|t| !t.is_empty()).map(str::to_string);
        *self.token.write().expect("token lock poisoned") = token;
    }

    pub fn has_token(&self) -> bool {
        self.token.read().expect("token lock poisoned").is_some()
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    pub fn rfq(&self) -> RfqApi<'_> {
        RfqApi { client: self }
    }

    pub fn quote(&self) -> QuoteApi<'_> {
        QuoteApi { client: self }
    }

    pub fn chat(&self) -> ChatApi<'_> {
        ChatApi { client: self }
    }

    pub fn escrow(&self) -> EscrowApi<'_> {
        EscrowApi { client: self }
    }

    /// Send a request and decode a JSON response body into `T`.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&impl Serialize>,
    ) -> Result<T, RequestError> {
        let response = self.send(method, endpoint, body).await?;
        serde_json::from_str(&response.body).map_err(|e| {
            warn!("Failed to decode {} {} response: {}", method.as_str(), endpoint, e);
            RequestError::Decode(e)
        })
    }

    /// Send a request and return the raw response once it is known to be
    /// 2xx.
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&impl Serialize>,
    ) -> Result<HttpResponse, RequestError> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(RequestError::Encode)?;

        let token = self.token.read().expect("token lock poisoned").clone();
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let request = HttpRequest {
            method,
            url: format!("{}{}", self.base_url, endpoint),
            headers,
            body,
        };

        debug!("{} {}", method.as_str(), endpoint);
        let response = self
            .transport
            .send(request)
            .await
            .map_err(RequestError::Transport)?;

        if !response.is_success() {
            let err = RequestError::from_status(response.status, &response.body);
            warn!(
                "{} {} failed with status {}: {}",
                method.as_str(),
                endpoint,
                response.status,
                err
            );
            return Err(err);
        }
        Ok(response)
    }
}

/// Placeholder body type for requests without a body.
const NO_BODY: Option<&()> = None;

// ---------------------------------------------------------------------------
// Resource groups
// ---------------------------------------------------------------------------

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl AuthApi<'_> {
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, RequestError> {
        self.client
            .request(Method::Post, "/auth/login", Some(credentials))
            .await
    }

    pub async fn register(&self, data: &Registration) -> Result<AuthResponse, RequestError> {
        self.client
            .request(Method::Post, "/auth/register", Some(data))
            .await
    }
}

pub struct RfqApi<'a> {
    client: &'a ApiClient,
}

impl RfqApi<'_> {
    pub async fn get_all(&self) -> Result<Vec<Rfq>, RequestError> {
        self.client.request(Method::Get, "/rfq", NO_BODY).await
    }

    pub async fn create(&self, rfq: &NewRfq) -> Result<Rfq, RequestError> {
        self.client.request(Method::Post, "/rfq", Some(rfq)).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Rfq, RequestError> {
        self.client
            .request(Method::Get, &format!("/rfq/{id}"), NO_BODY)
            .await
    }
}

pub struct QuoteApi<'a> {
    client: &'a ApiClient,
}

impl QuoteApi<'_> {
    pub async fn get_by_rfq(&self, rfq_id: i64) -> Result<Vec<Quote>, RequestError> {
        self.client
            .request(Method::Get, &format!("/quote/rfq/{rfq_id}"), NO_BODY)
            .await
    }

    pub async fn create(&self, quote: &NewQuote) -> Result<Quote, RequestError> {
        self.client.request(Method::Post, "/quote", Some(quote)).await
    }

    pub async fn get_seller_quotes(&self) -> Result<Vec<Quote>, RequestError> {
        self.client.request(Method::Get, "/quote/seller", NO_BODY).await
    }
}

pub struct ChatApi<'a> {
    client: &'a ApiClient,
}

impl ChatApi<'_> {
    pub async fn get_messages(&self, rfq_id: i64) -> Result<Vec<Message>, RequestError> {
        self.client
            .request(Method::Get, &format!("/chat/{rfq_id}"), NO_BODY)
            .await
    }

    pub async fn send_message(&self, rfq_id: i64, message: &str) -> Result<Message, RequestError> {
        let body = NewMessage {
            rfq_id,
            message: message.to_string(),
        };
        self.client.request(Method::Post, "/chat", Some(&body)).await
    }
}

pub struct EscrowApi<'a> {
    client: &'a ApiClient,
}

impl EscrowApi<'_> {
    pub async fn get_for_rfq(&self, rfq_id: i64) -> Result<Escrow, RequestError> {
        self.client
            .request(Method::Get, &format!("/escrow/rfq/{rfq_id}"), NO_BODY)
            .await
    }

    pub async fn create(&self, escrow: &NewEscrow) -> Result<Escrow, RequestError> {
        self.client.request(Method::Post, "/escrow", Some(escrow)).await
    }

    /// Release held funds. The response body has no defined shape, so any
    /// 2xx counts as success and the body is ignored.
    pub async fn release(&self, escrow_id: i64) -> Result<(), RequestError> {
        self.client
            .send(Method::Post, &format!("/escrow/release/{escrow_id}"), NO_BODY)
            .await
            .map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
