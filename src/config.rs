use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Server settings read from the environment. The binaries load `.env`
/// before calling `from_env`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub youtube_api_key: Option<String>,
    pub tracks_path: PathBuf,
    /// Path prefix the router adapter mounts its endpoints under.
    pub api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            youtube_api_key: None,
            tracks_path: PathBuf::from("tracks.json"),
            api_prefix: "/api".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid PORT {:?}, using {}", raw, defaults.port);
                defaults.port
            }),
            Err(_) => defaults.port,
        };

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port,
            youtube_api_key: env::var("YOUTUBE_API_KEY").ok().filter(|k| !k.is_empty()),
            tracks_path: env::var("TRACKS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tracks_path),
            api_prefix: env::var("API_PREFIX")
                .map(|p| normalize_prefix(&p))
                .unwrap_or(defaults.api_prefix),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `api/` and `/api/` both become `/api`; an empty prefix mounts at the root.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Tunables of the widget's resilience layer.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// Base URL of the station API, e.g. `http://127.0.0.1:3000/api`.
    pub base_url: String,
    /// Scope of the persistent cache, like a browser origin.
    pub origin: String,
    pub cache_dir: PathBuf,
    pub requests_per_window: u32,
    pub rate_window: Duration,
    pub cache_ttl: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_jitter_factor: f64,
    pub change_cooldown: Duration,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/api".to_string(),
            origin: "http://127.0.0.1:3000".to_string(),
            cache_dir: env::temp_dir().join("lofi-radio"),
            requests_per_window: 10,
            rate_window: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(60 * 60),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
            retry_jitter_factor: 0.0,
            change_cooldown: Duration::from_millis(5000),
        }
    }
}

impl WidgetConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            base_url: env::var("WIDGET_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            origin: env::var("WIDGET_ORIGIN").unwrap_or(defaults.origin),
            cache_dir: env::var("WIDGET_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            ..defaults
        }
    }
}
