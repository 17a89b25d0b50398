//! Static development server with live reload
//!
//! HTML responses get a small polling script injected before `</body>`.
//! The script long-polls [`LIVERELOAD_PATH`], which answers once the
//! [`ReloadHub`] is notified, and then reloads the page.

use crate::collaborators::{CollaboratorError, ResourceHandle};
use crate::core::OperationKind;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

pub const LIVERELOAD_PATH: &str = "/__livereload";

const RELOAD_SNIPPET: &str = "<script>(function poll(){fetch('/__livereload')\
.then(function(r){if(r.ok){location.reload();}else{setTimeout(poll,1000);}})\
.catch(function(){setTimeout(poll,1000);});})();</script>";

/// Fan-out of reload notifications to connected browsers
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<()>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Wake every waiting browser
    pub fn notify(&self) {
        let listeners = self.sender.send(()).unwrap_or(0);
        debug!("Reload sent to {} listeners", listeners);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct ServerState {
    root: Arc<PathBuf>,
    livereload: bool,
    hub: ReloadHub,
}

/// Insert the reload script before the last `</body>`, or append it
pub fn inject_reload_snippet(body: &str) -> String {
    // ASCII lowercasing keeps byte offsets intact
    match body.to_ascii_lowercase().rfind("</body>") {
        Some(at) => format!("{}{}{}", &body[..at], RELOAD_SNIPPET, &body[at..]),
        None => format!("{}{}", body, RELOAD_SNIPPET),
    }
}

fn html_target(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let relative = uri_path.trim_start_matches('/');
    if Path::new(relative)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return None;
    }

    let mut file = root.join(relative);
    if relative.is_empty() || uri_path.ends_with('/') {
        file = file.join("index.html");
    }

    let is_html = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
    (is_html && file.is_file()).then_some(file)
}

async fn wait_for_reload(State(state): State<ServerState>) -> StatusCode {
    let mut receiver = state.hub.subscribe();
    match receiver.recv().await {
        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => StatusCode::OK,
        Err(broadcast::error::RecvError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn serve_file(State(state): State<ServerState>, request: Request) -> Response {
    if state.livereload {
        if let Some(file) = html_target(&state.root, request.uri().path()) {
            match tokio::fs::read_to_string(&file).await {
                Ok(body) => return Html(inject_reload_snippet(&body)).into_response(),
                Err(e) => debug!("Falling back to static file for {}: {}", file.display(), e),
            }
        }
    }

    match ServeDir::new(state.root.as_path()).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Start serving `root` on 127.0.0.1:`port` (0 picks a free port)
pub async fn serve(
    port: u16,
    root: PathBuf,
    livereload: bool,
    hub: ReloadHub,
) -> Result<ServerHandle, CollaboratorError> {
    if !root.is_dir() {
        return Err(CollaboratorError::MissingInput(root.display().to_string()));
    }

    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| CollaboratorError::Server(format!("cannot bind port {}: {}", port, e)))?;
    let addr = listener
        .local_addr()
        .map_err(|e| CollaboratorError::Server(e.to_string()))?;

    let state = ServerState {
        root: Arc::new(root.clone()),
        livereload,
        hub,
    };

    let mut router: Router<ServerState> = Router::new();
    if livereload {
        router = router.route(LIVERELOAD_PATH, get(wait_for_reload));
    }
    let app = router.fallback(serve_file).with_state(state);

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("Server on {} stopped: {}", addr, e);
        }
    });

    info!("Serving {} at http://{}", root.display(), addr);
    Ok(ServerHandle { addr, root, task })
}

/// A running server; aborted on close or drop
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    root: PathBuf,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

impl ResourceHandle for ServerHandle {
    fn kind(&self) -> OperationKind {
        OperationKind::Serve
    }

    fn describe(&self) -> String {
        format!("server {} for {}", self.url(), self.root.display())
    }

    fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    fn close(&mut self) {
        self.task.abort();
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
