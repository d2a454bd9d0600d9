pub mod api;
pub mod bundles;
pub mod catalog;
pub mod config;
pub mod extract;
pub mod matcher;
pub mod model;
pub mod photo;
pub mod rank;
pub mod report;
pub mod scoring;

#[cfg(test)]
pub(crate) mod fakes;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use catalog::{DynamoCatalog, S3ImageStore};
use config::Settings;
use model::BedrockModel;

pub use catalog::{Candidate, ImageStore, ProductCatalog};
pub use matcher::{CandidateSource, CatalogFilter, Matcher, OutfitMatches};
pub use model::VisionModel;
pub use scoring::ScoredCandidate;

pub async fn load_aws_config(settings: &Settings) -> SdkConfig {
    aws_config::load_defaults(BehaviorVersion::v2024_03_28())
        .await
        .into_builder()
        .region(Region::new(settings.region.clone()))
        .build()
}

/// The AWS-backed collaborators of the matching workflow.
pub struct AwsServices {
    pub model: BedrockModel,
    pub images: S3ImageStore,
    pub catalog: DynamoCatalog,
}

impl AwsServices {
    pub async fn connect(settings: &Settings) -> Self {
        let config = load_aws_config(settings).await;
        Self {
            model: BedrockModel::new(
                aws_sdk_bedrockruntime::Client::new(&config),
                settings.model_id.clone(),
            ),
            images: S3ImageStore::new(
                aws_sdk_s3::Client::new(&config),
                settings.image_bucket.clone(),
            ),
            catalog: DynamoCatalog::new(
                aws_sdk_dynamodb::Client::new(&config),
                settings.product_table.clone(),
            ),
        }
    }
}
