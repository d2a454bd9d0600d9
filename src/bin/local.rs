use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use clap::{Args, Parser, Subcommand};
use outfit_matcher::bundles::{BundleClient, BundleRequest};
use outfit_matcher::catalog::validate_budget;
use outfit_matcher::config::Settings;
use outfit_matcher::photo::EncodedImage;
use outfit_matcher::{report, AwsServices, CandidateSource, CatalogFilter, Matcher};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "local", about = "Find shoes that match a photographed outfit")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the model's description of an outfit.
    Describe { image: PathBuf },

    /// Score every image in the product image bucket, one request per image.
    Bucket {
        #[command(flatten)]
        common: MatchArgs,

        /// Overrides IMAGE_BUCKET.
        #[arg(long)]
        bucket: Option<String>,
    },

    /// Score affordable products from the product table in one batched request.
    Budget {
        #[command(flatten)]
        common: MatchArgs,

        /// Maximum price. Defaults to DEFAULT_BUDGET.
        #[arg(long, value_parser = parse_budget)]
        budget: Option<f64>,

        /// Only consider products of this type (e.g. SHOES).
        #[arg(long)]
        product_type: Option<String>,

        /// Overrides PRODUCT_TABLE.
        #[arg(long)]
        table: Option<String>,
    },

    /// Request outfit bundles from the deployed endpoint.
    Bundles {
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Overrides BUNDLES_API_URL.
        #[arg(long)]
        url: Option<String>,

        #[arg(long, default_value = "25")]
        age: String,

        #[arg(long, default_value = "female")]
        gender: String,

        #[arg(long, default_value = "garden party")]
        occasion: String,

        #[arg(long, default_value = "summer")]
        season: String,

        #[arg(long, default_value_t = 200.0, value_parser = parse_budget)]
        budget: f64,
    },
}

#[derive(Debug, Args)]
struct MatchArgs {
    /// Outfit photos, processed in order.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// How many matches to show per outfit. Overrides TOP_N.
    #[arg(long)]
    top_n: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;

    match cli.command {
        Command::Describe { image } => {
            let services = AwsServices::connect(&settings).await;
            let matcher = Matcher::new(Arc::new(services.model), &settings);
            let outfit = EncodedImage::from_path(&image, settings.max_image_bytes).await?;
            println!("{}", matcher.describe(&outfit).await?);
        }
        Command::Bucket { common, bucket } => {
            if let Some(bucket) = bucket {
                settings.image_bucket = bucket;
            }
            let services = AwsServices::connect(&settings).await;
            let matcher = matcher_for(services.model, &settings, common.top_n);

            let results = matcher
                .run_paths(CandidateSource::Bucket(&services.images), &common.images)
                .await;
            for result in &results {
                println!("{}", report::render(result, None));
            }
        }
        Command::Budget {
            common,
            budget,
            product_type,
            table,
        } => {
            if let Some(table) = table {
                settings.product_table = table;
            }
            let filter = CatalogFilter {
                budget: Some(budget.unwrap_or(settings.default_budget)),
                product_type,
            };
            let services = AwsServices::connect(&settings).await;
            let matcher = matcher_for(services.model, &settings, common.top_n);

            let results = matcher
                .run_paths(
                    CandidateSource::Catalog {
                        catalog: &services.catalog,
                        filter: &filter,
                    },
                    &common.images,
                )
                .await;
            for result in &results {
                println!("{}", report::render(result, filter.budget));
            }
        }
        Command::Bundles {
            images,
            url,
            age,
            gender,
            occasion,
            season,
            budget,
        } => {
            let url = match url {
                Some(url) => url,
                None => settings.require_bundles_api_url()?.to_string(),
            };
            let mut encoded = Vec::with_capacity(images.len());
            for path in &images {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                encoded.push(general_purpose::STANDARD.encode(bytes));
            }

            let request = BundleRequest {
                images: encoded,
                age,
                gender,
                occasion,
                season,
                budget,
            };
            let response = BundleClient::new(url)?.request(&request).await?;
            println!("{}", outfit_matcher::bundles::render(&response));
        }
    }

    Ok(())
}

fn parse_budget(raw: &str) -> Result<f64, String> {
    let budget = raw.trim().parse::<f64>().map_err(|err| err.to_string())?;
    validate_budget(budget).map_err(|err| err.to_string())
}

fn matcher_for(
    model: outfit_matcher::model::BedrockModel,
    settings: &Settings,
    top_n: Option<usize>,
) -> Matcher {
    let matcher = Matcher::new(Arc::new(model), settings);
    match top_n {
        Some(n) => matcher.with_top_n(n),
        None => matcher,
    }
}
