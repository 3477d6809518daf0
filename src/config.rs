/// Environment variable overriding the compile service base URL.
pub const BASE_URL_ENV: &str = "CODEPOD_API_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Where the compile service lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Config {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST` target for compile requests; tolerates a trailing slash on the base.
    pub fn compile_endpoint(&self) -> String {
        format!("{}/compile", self.base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_points_at_local_service() {
        assert_eq!(
            Config::default().compile_endpoint(),
            "http://localhost:8000/api/compile"
        );
    }

    #[test]
    fn trailing_slash_is_not_doubled() {
        let config = Config::new("https://codepod.example/api/");
        assert_eq!(config.compile_endpoint(), "https://codepod.example/api/compile");
        assert_eq!(config.base_url(), "https://codepod.example/api/");
    }
}
