//! The web interface: gallery, uploads, manual refresh, bulk actions.
//!
//! Handlers never talk to the panel directly; anything that should change
//! the display is enqueued on the engine's command queue and the response
//! returns immediately. Confirmation is asynchronous by design: a slow
//! e-paper refresh must not hold an HTTP request open.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::mpsc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::engine::FrameCommand;
use crate::photos::PhotoStore;
use crate::render::ScaleMode;
use crate::state::{FrameState, Orientation};

/// Matches the upload cap of the service this replaces.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub frame: Arc<FrameState>,
    pub store: PhotoStore,
    pub tx: mpsc::Sender<FrameCommand>,
    pub panel_attached: bool,
}

#[derive(Serialize)]
struct InfoResponse {
    width: u32,
    height: u32,
    orientation: Orientation,
    photos: usize,
    panel_attached: bool,
}

pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    let photos_dir = state.store.root().to_path_buf();
    let app = Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/update_display", post(update_display))
        .route("/bulk_delete", post(bulk_delete))
        .route("/bulk_display", post(bulk_display))
        .route("/info", get(info_endpoint))
        .nest_service("/photos", ServeDir::new(photos_dir))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind).await?;
    if let Ok(local) = listener.local_addr() {
        info!(address = %format!("http://{local}"), "Web interface listening");
    }
    axum::serve(listener, app).await
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let photos = state.store.list();

    let mut grid = String::new();
    for name in &photos {
        grid.push_str(&format!(
            r#"<label class="photo"><input type="checkbox" name="selected" value="{name}">
<img src="/photos/{name}" alt="{name}" loading="lazy"><span>{name}</span></label>
"#
        ));
    }
    if photos.is_empty() {
        grid.push_str("<p class=\"muted\">No photos yet. Upload some!</p>");
    }

    let html = format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Inky Photo Frame</title>
  <style>
    body {{ font-family: system-ui, -apple-system, Segoe UI, Roboto, sans-serif; margin: 2rem; }}
    h1 {{ font-size: 1.4rem; }}
    .status {{ color: #555; margin-bottom: 1rem; }}
    .actions {{ display: flex; gap: 0.5rem; margin: 1rem 0; flex-wrap: wrap; }}
    button {{ padding: 0.5rem 1rem; }}
    .grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(160px, 1fr)); gap: 1rem; }}
    .photo {{ display: block; border: 1px solid #ddd; border-radius: 6px; padding: 0.4rem; }}
    .photo img {{ width: 100%; height: 120px; object-fit: cover; }}
    .photo span {{ font-size: 0.75rem; word-break: break-all; }}
    .muted {{ color: #888; }}
  </style>
</head>
<body>
  <h1>Inky Photo Frame</h1>
  <div class="status">{count} photos &middot; panel {panel} &middot; orientation {orientation}</div>

  <form action="/upload" method="post" enctype="multipart/form-data">
    <input type="file" name="photos" multiple accept=".png,.jpg,.jpeg" />
    <button type="submit">Upload</button>
  </form>

  <div class="actions">
    <form action="/update_display" method="post"><button type="submit">Show random photo</button></form>
    <button id="show">Show selected</button>
    <button id="delete">Delete selected</button>
  </div>

  <div class="grid">
{grid}  </div>

  <script>
    function selected() {{
      return Array.from(document.querySelectorAll('input[name="selected"]:checked'))
        .map(el => el.value);
    }}
    async function bulk(path) {{
      const files = selected();
      if (files.length === 0) return;
      await fetch(path, {{
        method: 'POST',
        headers: {{ 'Content-Type': 'application/json' }},
        body: JSON.stringify(files),
      }});
      location.reload();
    }}
    document.getElementById('show').addEventListener('click', () => bulk('/bulk_display'));
    document.getElementById('delete').addEventListener('click', () => {{
      if (confirm('Delete the selected photos?')) bulk('/bulk_delete');
    }});
  </script>
</body>
</html>
"#,
        count = photos.len(),
        panel = if state.panel_attached {
            "attached"
        } else {
            "not attached"
        },
        orientation = state.frame.orientation(),
        grid = grid,
    );
    Html(html)
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> impl IntoResponse {
    let mut saved: Vec<String> = Vec::new();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("photos") {
                    continue;
                }
                let Some(original) = field.file_name().map(str::to_owned) else {
                    continue;
                };
                if original.is_empty() {
                    continue;
                }
                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(file = %original, error = %e, "Failed reading upload field");
                        continue;
                    }
                };
                match state.store.save_upload(&original, &bytes) {
                    Ok(name) => {
                        info!(photo = %name, size = bytes.len(), "Photo uploaded");
                        saved.push(name);
                    }
                    Err(e) => {
                        warn!(file = %original, error = %e, "Upload rejected");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Multipart parse error");
                break;
            }
        }
    }

    // Show the last uploaded photo, letterboxed so nothing is cropped off a
    // photo the user explicitly sent.
    if let Some(last) = saved.last() {
        enqueue(
            &state,
            FrameCommand::Show {
                photo: last.clone(),
                mode: ScaleMode::Fit,
            },
        )
        .await;
    }
    Redirect::to("/")
}

async fn update_display(State(state): State<AppState>) -> Redirect {
    info!("Manual display update triggered");
    enqueue(&state, FrameCommand::Refresh).await;
    Redirect::to("/")
}

async fn bulk_delete(
    State(state): State<AppState>,
    Json(names): Json<Vec<String>>,
) -> StatusCode {
    info!(count = names.len(), "Bulk delete requested");
    for name in &names {
        match state.store.delete(name) {
            Ok(()) => info!(photo = %name, "Photo deleted"),
            Err(e) => warn!(photo = %name, error = %e, "Could not delete photo"),
        }
    }
    StatusCode::OK
}

async fn bulk_display(
    State(state): State<AppState>,
    Json(names): Json<Vec<String>>,
) -> StatusCode {
    // Only the first selection is shown; collage composition is out of
    // scope.
    let Some(first) = names.into_iter().next() else {
        return StatusCode::OK;
    };
    info!(photo = %first, "Bulk display requested");
    enqueue(
        &state,
        FrameCommand::Show {
            photo: first,
            mode: ScaleMode::Fill,
        },
    )
    .await;
    StatusCode::OK
}

async fn info_endpoint(State(state): State<AppState>) -> Json<InfoResponse> {
    let geometry = state.frame.geometry();
    Json(InfoResponse {
        width: geometry.width,
        height: geometry.height,
        orientation: state.frame.orientation(),
        photos: state.store.list().len(),
        panel_attached: state.panel_attached,
    })
}

/// Fire-and-forget submit to the engine; a closed queue only happens on
/// shutdown and is logged, never surfaced to the client.
async fn enqueue(state: &AppState, command: FrameCommand) {
    if state.tx.send(command).await.is_err() {
        warn!("Refresh engine is not running, display command dropped");
    }
}
