//! HTTP surface of the matching workflow, served behind API Gateway.

use crate::catalog::{validate_budget, ProductCatalog};
use crate::matcher::{CandidateSource, CatalogFilter, Matcher, OutfitMatches};
use crate::photo::EncodedImage;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub matcher: Matcher,
    pub catalog: Arc<dyn ProductCatalog>,
    pub default_budget: f64,
}

#[derive(Deserialize)]
struct MatchRequest {
    images: Vec<String>,
    #[serde(default)]
    budget: Option<f64>,
    #[serde(default)]
    product_type: Option<String>,
    #[serde(default)]
    top_n: Option<usize>,
}

#[derive(Serialize)]
struct MatchResponse {
    outfits_count: usize,
    results: Vec<OutfitResult>,
}

#[derive(Serialize)]
struct OutfitResult {
    outfit_number: usize,
    #[serde(flatten)]
    matches: OutfitMatches,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/outfit-matches", post(match_outfits))
        .with_state(state)
}

#[axum::debug_handler]
async fn match_outfits(
    State(state): State<AppState>,
    Json(payload): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, StatusCode> {
    if payload.images.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let budget = payload.budget.unwrap_or(state.default_budget);
    let budget = validate_budget(budget).map_err(|err| {
        tracing::warn!(error = %err, "invalid budget");
        StatusCode::BAD_REQUEST
    })?;

    let mut outfits = Vec::with_capacity(payload.images.len());
    for (i, image) in payload.images.iter().enumerate() {
        let bytes = general_purpose::STANDARD.decode(image).map_err(|err| {
            tracing::warn!(image = i + 1, error = %err, "invalid base64 image");
            StatusCode::BAD_REQUEST
        })?;
        let outfit = EncodedImage::from_bytes(&bytes, state.matcher.max_image_bytes())
            .map_err(|err| {
                tracing::warn!(image = i + 1, error = %format!("{err:#}"), "unusable image");
                StatusCode::BAD_REQUEST
            })?;
        outfits.push(outfit);
    }

    let matcher = match payload.top_n {
        Some(n) => state.matcher.clone().with_top_n(n),
        None => state.matcher.clone(),
    };
    let filter = CatalogFilter {
        budget: Some(budget),
        product_type: payload.product_type,
    };
    let source = CandidateSource::Catalog {
        catalog: state.catalog.as_ref(),
        filter: &filter,
    };

    let mut results = Vec::with_capacity(outfits.len());
    for (i, outfit) in outfits.iter().enumerate() {
        let label = format!("outfit-{}", i + 1);
        let matches = matcher.run(source, &label, outfit).await;
        // No description means the model could not be reached at all.
        if matches.description.is_none() {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        results.push(OutfitResult {
            outfit_number: i + 1,
            matches,
        });
    }

    Ok(Json(MatchResponse {
        outfits_count: results.len(),
        results,
    }))
}
