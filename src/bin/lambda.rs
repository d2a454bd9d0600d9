use lambda_http::{run, Error};
use outfit_matcher::api::{router, AppState};
use outfit_matcher::config::Settings;
use outfit_matcher::{AwsServices, Matcher};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let settings = Settings::from_env()?;
    let services = AwsServices::connect(&settings).await;

    let app_state = AppState {
        matcher: Matcher::new(Arc::new(services.model), &settings),
        catalog: Arc::new(services.catalog),
        default_budget: settings.default_budget,
    };

    run(router(app_state)).await
}
