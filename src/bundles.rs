//! Client for the deployed outfit-bundle endpoint.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

/// Bundle generation runs several model calls per outfit behind API Gateway.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Serialize)]
pub struct BundleRequest {
    /// Base64-encoded outfit photos.
    pub images: Vec<String>,
    pub age: String,
    pub gender: String,
    pub occasion: String,
    pub season: String,
    pub budget: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleResponse {
    pub outfits_count: u32,
    #[serde(default)]
    pub bundles: Vec<Bundle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bundle {
    pub bundle_number: u32,
    pub bundle_name: String,
    pub bundle_type: String,
    pub total_cost: f64,
    pub match_score: f64,
    /// Current response shape.
    #[serde(default)]
    pub items: Vec<BundleItem>,
    /// Older deployments return a fixed shoes + handbag pair instead of `items`.
    #[serde(default)]
    pub shoes: Option<BundleItem>,
    #[serde(default)]
    pub handbag: Option<BundleItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleItem {
    #[serde(default)]
    pub category: Option<String>,
    pub product_name: String,
    pub price: f64,
}

impl Bundle {
    /// Items with a category label, whichever shape the endpoint returned.
    pub fn labeled_items(&self) -> Vec<(&str, &BundleItem)> {
        if !self.items.is_empty() {
            return self
                .items
                .iter()
                .map(|item| (item.category.as_deref().unwrap_or("item"), item))
                .collect();
        }
        [("shoes", &self.shoes), ("handbag", &self.handbag)]
            .into_iter()
            .filter_map(|(label, item)| item.as_ref().map(|item| (label, item)))
            .collect()
    }
}

pub struct BundleClient {
    http: reqwest::Client,
    url: String,
}

impl BundleClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub async fn request(&self, request: &BundleRequest) -> Result<BundleResponse> {
        tracing::info!(
            url = %self.url,
            images = request.images.len(),
            budget = request.budget,
            "requesting outfit bundles"
        );
        let res = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("bundle request to {} failed", self.url))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read bundle response body")?;
        if !status.is_success() {
            anyhow::bail!("bundle endpoint returned status={status}: {text}");
        }
        serde_json::from_str(&text)
            .with_context(|| format!("failed to decode bundle response: {text}"))
    }
}

pub fn render(response: &BundleResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Outfits analyzed: {}", response.outfits_count);
    let _ = writeln!(out, "Bundles created: {}", response.bundles.len());
    for bundle in &response.bundles {
        let _ = writeln!(
            out,
            "\n{}. {} ({})",
            bundle.bundle_number, bundle.bundle_name, bundle.bundle_type
        );
        let _ = writeln!(
            out,
            "   Total: ${:.2} | Score: {}/10",
            bundle.total_cost, bundle.match_score
        );
        for (label, item) in bundle.labeled_items() {
            let _ = writeln!(out, "     - {label}: {} (${:.2})", item.product_name, item.price);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/outfit-bundles")
    }

    fn sample_request() -> BundleRequest {
        BundleRequest {
            images: vec!["AAAA".to_string()],
            age: "30".to_string(),
            gender: "male".to_string(),
            occasion: "wedding".to_string(),
            season: "spring".to_string(),
            budget: 300.0,
        }
    }

    #[test]
    fn request_serializes_expected_fields() {
        let request = BundleRequest {
            images: vec!["AAAA".to_string()],
            age: "25".to_string(),
            gender: "female".to_string(),
            occasion: "garden party".to_string(),
            season: "summer".to_string(),
            budget: 500.0,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "images": ["AAAA"],
                "age": "25",
                "gender": "female",
                "occasion": "garden party",
                "season": "summer",
                "budget": 500.0
            })
        );
    }

    #[test]
    fn decodes_items_shape() {
        let response: BundleResponse = serde_json::from_value(json!({
            "outfits_count": 1,
            "bundles": [{
                "bundle_number": 1,
                "bundle_name": "Garden Chic",
                "bundle_type": "premium",
                "total_cost": 245.0,
                "match_score": 9,
                "items": [
                    {"category": "shoes", "product_name": "Strappy Sandal", "price": 120.0},
                    {"category": "handbag", "product_name": "Straw Tote", "price": 125.0}
                ]
            }]
        }))
        .unwrap();

        let text = render(&response);
        assert!(text.contains("1. Garden Chic (premium)"));
        assert!(text.contains("Total: $245.00 | Score: 9/10"));
        assert!(text.contains("- handbag: Straw Tote ($125.00)"));
    }

    #[test]
    fn decodes_shoes_and_handbag_shape() {
        let response: BundleResponse = serde_json::from_value(json!({
            "outfits_count": 2,
            "bundles": [{
                "bundle_number": 1,
                "bundle_name": "Budget Pick",
                "bundle_type": "budget",
                "total_cost": 150.5,
                "match_score": 7.5,
                "shoes": {"product_name": "Loafer", "price": 80.0},
                "handbag": {"product_name": "Clutch", "price": 70.5}
            }]
        }))
        .unwrap();

        let labeled = response.bundles[0].labeled_items();
        let labels: Vec<_> = labeled.iter().map(|(label, _)| *label).collect();
        assert_eq!(labels, ["shoes", "handbag"]);
        assert!(render(&response).contains("- shoes: Loafer ($80.00)"));
    }

    #[tokio::test]
    async fn error_status_carries_status_and_body() {
        let url = serve(Router::new().route(
            "/outfit-bundles",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;

        let err = BundleClient::new(url)
            .unwrap()
            .request(&sample_request())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("500"), "{err}");
        assert!(err.contains("boom"), "{err}");
    }

    #[tokio::test]
    async fn success_reply_decodes() {
        let url = serve(Router::new().route(
            "/outfit-bundles",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["occasion"], "wedding");
                Json(json!({
                    "outfits_count": 1,
                    "bundles": [{
                        "bundle_number": 1,
                        "bundle_name": "Spring Vows",
                        "bundle_type": "premium",
                        "total_cost": 280.0,
                        "match_score": 8,
                        "items": [{"category": "shoes", "product_name": "Oxford", "price": 180.0}]
                    }]
                }))
            }),
        ))
        .await;

        let response = BundleClient::new(url)
            .unwrap()
            .request(&sample_request())
            .await
            .unwrap();
        assert_eq!(response.outfits_count, 1);
        assert_eq!(response.bundles[0].bundle_name, "Spring Vows");
        assert_eq!(response.bundles[0].labeled_items()[0].1.product_name, "Oxford");
    }

    #[tokio::test]
    async fn undecodable_success_reply_is_an_error() {
        let url = serve(Router::new().route(
            "/outfit-bundles",
            post(|| async { "not json" }),
        ))
        .await;

        let err = BundleClient::new(url)
            .unwrap()
            .request(&sample_request())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to decode bundle response"));
    }
}
