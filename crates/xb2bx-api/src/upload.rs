// Image "upload": the backend stores images inline, so uploading means
// turning a local file into a `data:` URL that rides along in the RFQ body.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{info, warn};

/// Read `path` and encode it as a `data:<mime>;base64,...` URL.
///
/// Never fails: an unreadable file is logged and yields an empty string,
/// which callers treat as "no image".
pub async fn upload_image(path: &Path) -> String {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            info!("Encoded {} ({} bytes) as data URL", path.display(), bytes.len());
            encode_data_url(mime_for_path(path), &bytes)
        }
        Err(e) => {
            warn!("Failed to read image {}: {}", path.display(), e);
            String::new()
        }
    }
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// MIME type guessed from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
