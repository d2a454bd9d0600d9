use crate::catalog::validate_budget;
use anyhow::Context;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_MODEL_ID: &str = "us.anthropic.claude-3-5-sonnet-20241022-v2:0";
pub const DEFAULT_IMAGE_BUCKET: &str = "aldo-images";
pub const DEFAULT_PRODUCT_TABLE: &str = "aldo-product-metadata";
pub const DEFAULT_BUDGET: f64 = 200.0;
pub const DEFAULT_TOP_N: usize = 5;

/// Claude on Bedrock rejects images above ~3.75 MB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 3_750_000;

#[derive(Debug, Clone)]
pub struct Settings {
    pub region: String,
    pub model_id: String,
    pub image_bucket: String,
    pub product_table: String,
    pub default_budget: f64,
    pub top_n: usize,
    pub max_image_bytes: usize,
    pub bundles_api_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
            product_table: DEFAULT_PRODUCT_TABLE.to_string(),
            default_budget: DEFAULT_BUDGET,
            top_n: DEFAULT_TOP_N,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            bundles_api_url: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let default_budget = match lookup("DEFAULT_BUDGET") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(anyhow::Error::from)
                .and_then(validate_budget)
                .with_context(|| format!("DEFAULT_BUDGET is not a valid budget: {raw}"))?,
            None => defaults.default_budget,
        };
        let top_n = match lookup("TOP_N") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("TOP_N is not a positive integer: {raw}"))?,
            None => defaults.top_n,
        };
        let max_image_bytes = match lookup("MAX_IMAGE_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("MAX_IMAGE_BYTES is not a positive integer: {raw}"))?,
            None => defaults.max_image_bytes,
        };

        Ok(Self {
            region: lookup("AWS_REGION").unwrap_or(defaults.region),
            model_id: lookup("BEDROCK_MODEL_ID").unwrap_or(defaults.model_id),
            image_bucket: lookup("IMAGE_BUCKET").unwrap_or(defaults.image_bucket),
            product_table: lookup("PRODUCT_TABLE").unwrap_or(defaults.product_table),
            default_budget,
            top_n,
            max_image_bytes,
            bundles_api_url: lookup("BUNDLES_API_URL"),
        })
    }

    pub fn require_bundles_api_url(&self) -> anyhow::Result<&str> {
        self.bundles_api_url
            .as_deref()
            .context("BUNDLES_API_URL is required (or pass --url)")
    }
}
