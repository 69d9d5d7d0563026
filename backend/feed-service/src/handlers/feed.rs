use actix_web::{get, web, HttpMessage, HttpRequest, HttpResponse};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::middleware::ViewerId;
use crate::models::{FeedKind, FeedResponse};
use crate::services::{FeedAssembler, FeedCursor};

#[derive(Debug, Default, Deserialize)]
pub struct FeedQueryParams {
    pub cursor: Option<String>,
    /// Kept as text so a malformed value maps to our own 400 body.
    pub limit: Option<String>,
}

impl FeedQueryParams {
    fn parse_limit(&self) -> Result<Option<usize>> {
        match self.limit.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<usize>()
                .map(Some)
                .map_err(|_| AppError::BadRequest(format!("Invalid limit: {}", raw))),
        }
    }

    fn parse_cursor(&self) -> Result<Option<FeedCursor>> {
        FeedCursor::decode_optional(self.cursor.as_deref())
    }
}

pub struct FeedHandlerState {
    pub assembler: Arc<FeedAssembler>,
}

async fn serve_feed(
    kind: FeedKind,
    query: &FeedQueryParams,
    http_req: &HttpRequest,
    state: &FeedHandlerState,
) -> Result<HttpResponse> {
    let viewer_id = http_req.extensions().get::<ViewerId>().map(|v| v.0);
    let cursor = query.parse_cursor()?;
    let limit = query.parse_limit()?;

    debug!(
        kind = kind.as_str(),
        has_viewer = viewer_id.is_some(),
        has_cursor = cursor.is_some(),
        "Serving feed request"
    );

    let page = state
        .assembler
        .get_feed(viewer_id, kind, cursor, limit)
        .await?;

    Ok(HttpResponse::Ok().json(FeedResponse::from(page)))
}

/// Posts from the viewer's accepted connections and the viewer themself.
#[get("/network")]
pub async fn get_network_feed(
    query: web::Query<FeedQueryParams>,
    http_req: HttpRequest,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    serve_feed(FeedKind::Network, &query, &http_req, &state).await
}

/// Recent posts platform-wide, visibility filtered and ranked.
#[get("/for-you")]
pub async fn get_for_you_feed(
    query: web::Query<FeedQueryParams>,
    http_req: HttpRequest,
    state: web::Data<FeedHandlerState>,
) -> Result<HttpResponse> {
    serve_feed(FeedKind::ForYou, &query, &http_req, &state).await
}
