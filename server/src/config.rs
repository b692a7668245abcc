//! Server configuration, read from the environment.
//!
//! `main` loads `.env` through `dotenvy` first, so every variable here can
//! live in a dotenv file during development. Unset or unparsable values fall
//! back to the defaults below.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CANVAS_WIDTH: u32 = 512;
const DEFAULT_CANVAS_HEIGHT: u32 = 512;
const DEFAULT_MAX_BRUSH_SIZE: u32 = 64;
const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;
/// 0 means a log fetch returns every record after the requested index.
const DEFAULT_LOG_FETCH_LIMIT: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Resolution of every room's canvas.
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Strokes are clamped to this brush size.
    pub max_brush_size: u32,
    /// Outbound frames buffered per client before broadcasts are dropped.
    pub client_channel_capacity: usize,
    pub log_fetch_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            max_brush_size: DEFAULT_MAX_BRUSH_SIZE,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
            log_fetch_limit: DEFAULT_LOG_FETCH_LIMIT,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            canvas_width: env_parse("CANVAS_WIDTH", DEFAULT_CANVAS_WIDTH).max(1),
            canvas_height: env_parse("CANVAS_HEIGHT", DEFAULT_CANVAS_HEIGHT).max(1),
            max_brush_size: env_parse("MAX_BRUSH_SIZE", DEFAULT_MAX_BRUSH_SIZE).max(1),
            client_channel_capacity: env_parse("CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY).max(1),
            log_fetch_limit: env_parse("LOG_FETCH_LIMIT", DEFAULT_LOG_FETCH_LIMIT),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
