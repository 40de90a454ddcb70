// Marketplace backend client: one typed function per (resource, verb) pair
// over a single authenticated JSON request helper.

pub mod client;
pub mod error;
pub mod transport;
pub mod upload;

pub use client::ApiClient;
pub use error::RequestError;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
