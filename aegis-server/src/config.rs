pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.into(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: std::env::var("AEGIS_BIND").unwrap_or(defaults.bind),
            allowed_origins: std::env::var("AEGIS_ALLOWED_ORIGINS")
                .ok()
                .map(|v| parse_origins(&v))
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.allowed_origins),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
