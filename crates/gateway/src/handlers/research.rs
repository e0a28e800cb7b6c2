//! Research handlers

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use validator::Validate;

use crate::AppState;
use scout_common::{
    errors::{AppError, Result},
    llm::ChatTurn,
    metrics::RequestMetrics,
    search::SearchResult,
};
use scout_context::{
    check_response_quality, EventBus, EventEnvelope, EventSink, QualityCheckResult, ResearchAnswer,
    ResearchRequest,
};

/// Research request body
#[derive(Debug, Deserialize, Validate)]
pub struct ResearchBody {
    #[validate(length(min = 1))]
    pub query: String,

    /// Prior turns, oldest first
    #[serde(default)]
    #[validate(length(max = 50))]
    pub history: Vec<ChatTurn>,
}

/// Quality check request body
#[derive(Debug, Deserialize, Validate)]
pub struct QualityBody {
    pub response: String,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub sources: Vec<SearchResult>,
}

fn validation_error(e: validator::ValidationErrors) -> AppError {
    let field = e.field_errors().keys().next().map(|f| f.to_string());
    AppError::Validation {
        message: e.to_string(),
        field,
    }
}

fn into_request(state: &AppState, body: ResearchBody) -> Result<ResearchRequest> {
    body.validate().map_err(validation_error)?;

    let max = state.config.server.max_query_chars;
    if body.query.chars().count() as u64 > max {
        return Err(AppError::Validation {
            message: format!("Query exceeds {} characters", max),
            field: Some("query".to_string()),
        });
    }

    Ok(ResearchRequest {
        query: body.query,
        history: body.history,
    })
}

/// Run the pipeline and return the complete answer
pub async fn research(
    State(state): State<AppState>,
    Json(body): Json<ResearchBody>,
) -> Result<Json<ResearchAnswer>> {
    let metrics = RequestMetrics::start("POST", "/v1/research");

    let outcome = match into_request(&state, body) {
        Ok(request) => state.pipeline.run(&request, &EventBus::new()).await,
        Err(e) => Err(e),
    };

    let status = match &outcome {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16(),
    };
    metrics.finish(status);

    if let Ok(answer) = &outcome {
        tracing::info!(
            sources = answer.sources.len(),
            quality_score = answer.quality.score,
            has_mock_search = answer.has_mock_search,
            "Research completed"
        );
    }

    outcome.map(Json)
}

/// Forwards pipeline events to an SSE response
struct SseSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSink for SseSink {
    fn emit(&self, envelope: &EventEnvelope) {
        match Event::default()
            .event(envelope.event.kind())
            .id(envelope.sequence.to_string())
            .json_data(envelope)
        {
            Ok(event) => {
                let _ = self.tx.send(event);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode pipeline event"),
        }
    }
}

/// Run the pipeline, streaming its events, then a final `answer` event
pub async fn research_stream(
    State(state): State<AppState>,
    Json(body): Json<ResearchBody>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let request = into_request(&state, body)?;
    let (tx, rx) = mpsc::unbounded_channel();

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        let metrics = RequestMetrics::start("POST", "/v1/research/stream");
        let bus = EventBus::new().subscribe(Arc::new(SseSink { tx: tx.clone() }));

        // Failures already reached the client as an `error` event
        let status = match pipeline.run(&request, &bus).await {
            Ok(answer) => {
                match Event::default().event("answer").json_data(&answer) {
                    Ok(event) => {
                        let _ = tx.send(event);
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to encode answer"),
                }
                200
            }
            Err(e) => e.status_code().as_u16(),
        };
        metrics.finish(status);
    });

    let stream = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Validate arbitrary text against a numbered source list
pub async fn quality(Json(body): Json<QualityBody>) -> Result<Json<QualityCheckResult>> {
    body.validate().map_err(validation_error)?;
    Ok(Json(check_response_quality(&body.response, &body.sources)))
}
