// Application layer: navigation, request fencing, and the event loop that
// ties the session, the marketplace API, and the AI layer together.

pub mod app;
pub mod fence;
pub mod preview;
pub mod protocol;
pub mod router;
