//! Open a URL in the default browser

use crate::collaborators::CollaboratorError;
use tracing::info;

pub fn open(url: &str) -> Result<(), CollaboratorError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CollaboratorError::Browser {
            url: String::new(),
            reason: "empty URL".to_string(),
        });
    }

    webbrowser::open(url).map_err(|e| CollaboratorError::Browser {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    info!("Opened {}", url);
    Ok(())
}
