use crate::bridge;
use crate::error::ApiError;
use crate::negotiate::{self, Admission};
use crate::routes::PromptRequest;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{Method, StatusCode, Version},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::Stream;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Event-stream response body fed by the bridge
pub struct EventStream {
    rx: ReceiverStream<Bytes>,
}

impl EventStream {
    fn new(rx: mpsc::Receiver<Bytes>) -> Self {
        Self {
            rx: ReceiverStream::new(rx),
        }
    }
}

impl Stream for EventStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx).map(|opt| opt.map(Ok))
    }
}

impl IntoResponse for EventStream {
    fn into_response(self) -> Response {
        (negotiate::event_stream_headers(), Body::from_stream(self)).into_response()
    }
}

async fn open_stream(
    state: AppState,
    method: Method,
    version: Version,
    body: Body,
) -> Result<Response, ApiError> {
    if negotiate::admit(&method) == Admission::Preflight {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    negotiate::ensure_streaming(version)?;
    let request = PromptRequest::read(body).await?;

    let (tx, rx) = mpsc::channel(state.stream_buffer);
    tokio::spawn(bridge::stream_prompt(state.engine, request.message, tx));

    Ok(EventStream::new(rx).into_response())
}

/// `POST /chat` and its preflight
pub async fn handler(
    State(state): State<AppState>,
    method: Method,
    version: Version,
    body: Body,
) -> impl IntoResponse {
    (
        negotiate::cors_headers(),
        open_stream(state, method, version, body).await,
    )
}
