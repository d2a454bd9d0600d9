use crate::catalog::{of_product_type, within_budget, ImageStore, ProductCatalog};
use crate::config::Settings;
use crate::model::{Prompt, VisionModel};
use crate::photo::EncodedImage;
use crate::rank::{rank, top_n};
use crate::scoring::{score_batch, score_each, ScoredCandidate};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

const DESCRIBE_PROMPT: &str = concat!(
    "Describe this outfit in detail, focusing on colors, style, and formality. ",
    "What type of shoes would complement this outfit best?",
);
const DESCRIBE_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub budget: Option<f64>,
    pub product_type: Option<String>,
}

/// Where candidates come from for one run.
#[derive(Clone, Copy)]
pub enum CandidateSource<'a> {
    /// Every image in a bucket, scored one request per image.
    Bucket(&'a dyn ImageStore),
    /// Priced products from a table, scored in one batched request.
    Catalog {
        catalog: &'a dyn ProductCatalog,
        filter: &'a CatalogFilter,
    },
}

/// Top matches for one outfit photo.
#[derive(Debug, Clone, Serialize)]
pub struct OutfitMatches {
    pub outfit: String,
    pub description: Option<String>,
    pub matches: Vec<ScoredCandidate>,
}

impl OutfitMatches {
    fn empty(outfit: &str) -> Self {
        Self {
            outfit: outfit.to_string(),
            description: None,
            matches: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct Matcher {
    model: Arc<dyn VisionModel>,
    max_image_bytes: usize,
    top_n: usize,
}

impl Matcher {
    pub fn new(model: Arc<dyn VisionModel>, settings: &Settings) -> Self {
        Self {
            model,
            max_image_bytes: settings.max_image_bytes,
            top_n: settings.top_n,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    pub async fn describe(&self, outfit: &EncodedImage) -> Result<String> {
        let prompt = Prompt::with_image(outfit.clone(), DESCRIBE_PROMPT, DESCRIBE_MAX_TOKENS);
        let description = self
            .model
            .complete(&prompt)
            .await
            .context("failed to describe outfit")?;
        tracing::info!(%description, "outfit analysis");
        Ok(description)
    }

    /// Scores every bucket image against the outfit, best first.
    pub async fn match_from_store(
        &self,
        store: &dyn ImageStore,
        description: &str,
    ) -> Result<Vec<ScoredCandidate>> {
        let keys = store.list_image_keys().await?;
        if keys.is_empty() {
            tracing::warn!("no images found in bucket");
            return Ok(Vec::new());
        }
        let scored = score_each(
            self.model.as_ref(),
            store,
            description,
            &keys,
            self.max_image_bytes,
        )
        .await;
        Ok(rank(scored))
    }

    /// Scores affordable catalog products against the outfit, best first.
    pub async fn match_from_catalog(
        &self,
        catalog: &dyn ProductCatalog,
        filter: &CatalogFilter,
        description: &str,
    ) -> Result<Vec<ScoredCandidate>> {
        let products = catalog.products().await?;
        let total = products.len();

        let mut candidates = match filter.budget {
            Some(budget) => {
                let affordable = within_budget(products, budget);
                tracing::info!(
                    budget,
                    affordable = affordable.len(),
                    total,
                    "filtered products by budget"
                );
                affordable
            }
            None => products,
        };
        if let Some(product_type) = filter.product_type.as_deref() {
            candidates = of_product_type(candidates, product_type);
            tracing::info!(%product_type, remaining = candidates.len(), "filtered products by type");
        }

        if candidates.is_empty() {
            if filter.product_type.is_some() {
                tracing::warn!("no products match the budget and product type filter");
            } else {
                tracing::warn!("no products found within budget");
            }
            return Ok(Vec::new());
        }

        let scored = score_batch(self.model.as_ref(), description, candidates).await?;
        Ok(rank(scored))
    }

    async fn find_matches(
        &self,
        source: CandidateSource<'_>,
        description: &str,
    ) -> Result<Vec<ScoredCandidate>> {
        let ranked = match source {
            CandidateSource::Bucket(store) => self.match_from_store(store, description).await?,
            CandidateSource::Catalog { catalog, filter } => {
                self.match_from_catalog(catalog, filter, description).await?
            }
        };
        Ok(top_n(ranked, self.top_n))
    }

    /// Describes, scores and ranks for one outfit. Failures are logged rather
    /// than returned: a failed description leaves `description` empty, a later
    /// failure keeps the description with no matches.
    pub async fn run(
        &self,
        source: CandidateSource<'_>,
        label: &str,
        outfit: &EncodedImage,
    ) -> OutfitMatches {
        let description = match self.describe(outfit).await {
            Ok(description) => description,
            Err(err) => {
                tracing::error!(outfit = %label, error = %format!("{err:#}"), "outfit analysis failed");
                return OutfitMatches::empty(label);
            }
        };

        let matches = match self.find_matches(source, &description).await {
            Ok(matches) => matches,
            Err(err) => {
                tracing::error!(outfit = %label, error = %format!("{err:#}"), "matching failed");
                Vec::new()
            }
        };

        OutfitMatches {
            outfit: label.to_string(),
            description: Some(description),
            matches,
        }
    }

    /// Runs each outfit photo in turn; one entry per path, in order.
    pub async fn run_paths<P: AsRef<Path>>(
        &self,
        source: CandidateSource<'_>,
        paths: &[P],
    ) -> Vec<OutfitMatches> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let label = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            tracing::info!(outfit = %path.display(), "processing outfit");

            match EncodedImage::from_path(path, self.max_image_bytes).await {
                Ok(image) => results.push(self.run(source, &label, &image).await),
                Err(err) => {
                    tracing::error!(outfit = %path.display(), error = %format!("{err:#}"), "skipping outfit");
                    results.push(OutfitMatches::empty(&label));
                }
            }
        }
        results
    }
}
