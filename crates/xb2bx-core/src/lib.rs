// Core types shared by every XB2BX crate: the marketplace data model,
// key-value persistence, the login session, and client configuration.

pub mod config;
pub mod model;
pub mod session;
pub mod store;
