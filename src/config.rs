/// Application configuration, parsed from environment variables.
///
/// Built once at start-up and handed to the upstream clients; credentials are
/// never read from global state after that.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Strava API access token, sent as a bearer token.
    pub strava_access_token: String,
    /// OpenWeatherMap API key.
    pub openweather_api_key: String,
    pub strava_api_url: String,
    pub openweather_api_url: String,
    pub port: u16,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Maximum number of segments enriched concurrently.
    pub enrich_concurrency: usize,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

const DEFAULT_STRAVA_API_URL: &str = "https://www.strava.com/api/v3";
const DEFAULT_OPENWEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_CORS_ORIGINS: &str = "http://127.0.0.1:3000,http://localhost:3000";
const DEFAULT_ENRICH_CONCURRENCY: usize = 8;

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            strava_access_token: std::env::var("STRAVA_ACCESS_TOKEN")
                .expect("STRAVA_ACCESS_TOKEN must be set"),
            openweather_api_key: std::env::var("OPENWEATHER_API_KEY")
                .expect("OPENWEATHER_API_KEY must be set"),
            strava_api_url: std::env::var("STRAVA_API_URL")
                .unwrap_or_else(|_| DEFAULT_STRAVA_API_URL.to_string()),
            openweather_api_url: std::env::var("OPENWEATHER_API_URL")
                .unwrap_or_else(|_| DEFAULT_OPENWEATHER_API_URL.to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            cors_origins: parse_origins(
                &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            enrich_concurrency: std::env::var("ENRICH_CONCURRENCY")
                .ok()
                .map(|v| {
                    v.parse::<usize>()
                        .expect("ENRICH_CONCURRENCY must be a positive integer")
                })
                .unwrap_or(DEFAULT_ENRICH_CONCURRENCY)
                .max(1),
            log_json: std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
