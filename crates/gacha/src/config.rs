/// Default number of limited draws a user may make per UTC day.
pub const DEFAULT_DAILY_LIMIT: i64 = 3;

/// Gacha settings.
#[derive(Debug, Clone)]
pub struct GachaConfig {
    /// Draws per user per UTC day, not counting draws that ignore the limit.
    pub daily_limit: i64,
}

impl Default for GachaConfig {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
        }
    }
}

impl GachaConfig {
    /// Load from environment variables with defaults.
    ///
    /// | Env Var             | Default |
    /// |---------------------|---------|
    /// | `GACHA_DAILY_LIMIT` | `3`     |
    pub fn from_env() -> Self {
        let daily_limit: i64 = std::env::var("GACHA_DAILY_LIMIT")
            .unwrap_or_else(|_| DEFAULT_DAILY_LIMIT.to_string())
            .parse()
            .expect("GACHA_DAILY_LIMIT must be a valid i64");

        Self { daily_limit }
    }
}
