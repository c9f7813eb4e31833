// Segment Wind API v0.1
use axum::http::{HeaderValue, Method};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod routes;
mod services;

use config::AppConfig;
use routes::segments::AppState;
use services::openweather::OpenWeatherClient;
use services::strava::StravaClient;

/// Timeout applied to every upstream HTTP request.
const UPSTREAM_TIMEOUT_SECS: u64 = 15;

/// Segment Wind API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Segment Wind API",
        version = "0.1.0",
        description = "Rates how favorable the wind is for an athlete's starred Strava \
            segments. Resolves each segment's direction of travel from its endpoints or \
            route polyline and compares it with current and forecast wind from \
            OpenWeatherMap.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Segments", description = "Starred segments with wind ratings"),
    ),
    paths(
        routes::health::health_check,
        routes::segments::get_segments_with_weather,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            services::enrich::EnrichedSegment,
            services::enrich::ForecastWind,
            services::strava::StarredSegment,
            services::strava::SegmentMap,
            services::openweather::WindRecord,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "segment_wind_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // One connection pool shared by both upstream clients
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(UPSTREAM_TIMEOUT_SECS))
        .build()
        .expect("Failed to build HTTP client");

    let strava = StravaClient::new(
        http.clone(),
        &config.strava_api_url,
        &config.strava_access_token,
    )
    .expect("Failed to create Strava client");
    let weather = OpenWeatherClient::new(
        http,
        &config.openweather_api_url,
        &config.openweather_api_key,
    )
    .expect("Failed to create OpenWeatherMap client");

    let app_state = AppState {
        strava,
        weather,
        enrich_concurrency: config.enrich_concurrency,
    };

    // CORS — read-only API for the configured front-end origins
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
        .allow_headers(Any);

    // The un-prefixed path is what the existing front-end calls.
    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route(
            "/api/v1/segments",
            get(routes::segments::get_segments_with_weather),
        )
        .route(
            "/segments_with_weather",
            get(routes::segments::get_segments_with_weather),
        )
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
