/// config.rs — Centralised configuration loaded from .env
///
/// Parameters consumed by the data client, the GARCH estimator and the
/// presentation layer.  Loading happens once at startup; every consumer
/// borrows &EngineConfig.

use std::env;

use thiserror::Error;

/// Trading days per year used in the volatility display transform.
pub const DEFAULT_TRADING_DAYS: f64 = 252.0;
pub const DEFAULT_MARKET_DATA_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Config key {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    // ── Market data ──────────────────────────────────────────────────
    pub market_data_url:   String,
    /// Per-request timeout; the pipeline itself never retries.
    pub http_timeout_secs: u64,
    /// Dividend/split adjusted closes (true) or raw closes (false).
    pub auto_adjust:       bool,

    // ── Volatility display ───────────────────────────────────────────
    pub trading_days: f64,

    // ── GARCH(p,q) estimation ────────────────────────────────────────
    /// Nelder-Mead iteration cap
    pub garch_max_iter:     u64,
    /// Stop when the simplex cost standard deviation falls below this
    pub garch_sd_tolerance: f64,

    // ── Output ───────────────────────────────────────────────────────
    pub report_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            market_data_url:    DEFAULT_MARKET_DATA_URL.into(),
            http_timeout_secs:  30,
            auto_adjust:        true,
            trading_days:       DEFAULT_TRADING_DAYS,
            garch_max_iter:     5_000,
            garch_sd_tolerance: 1e-10,
            report_dir:         "./reports".into(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables (after dotenv).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // ignore missing .env
        let d = Self::default();

        let cfg = Self {
            market_data_url:    env::var("MARKET_DATA_URL").unwrap_or(d.market_data_url),
            http_timeout_secs:  parse_env("HTTP_TIMEOUT_SECS", d.http_timeout_secs)?,
            auto_adjust:        parse_env("AUTO_ADJUST", d.auto_adjust)?,
            trading_days:       parse_env("TRADING_DAYS", d.trading_days)?,
            garch_max_iter:     parse_env("GARCH_MAX_ITER", d.garch_max_iter)?,
            garch_sd_tolerance: parse_env("GARCH_SD_TOLERANCE", d.garch_sd_tolerance)?,
            report_dir:         env::var("REPORT_DIR").unwrap_or(d.report_dir),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http_timeout_secs == 0 {
            return Err(invalid("HTTP_TIMEOUT_SECS", "must be at least 1"));
        }
        if !(self.trading_days.is_finite() && self.trading_days > 0.0) {
            return Err(invalid("TRADING_DAYS", "must be a positive number"));
        }
        if self.garch_max_iter == 0 {
            return Err(invalid("GARCH_MAX_ITER", "must be at least 1"));
        }
        if !(self.garch_sd_tolerance.is_finite() && self.garch_sd_tolerance > 0.0) {
            return Err(invalid("GARCH_SD_TOLERANCE", "must be a positive number"));
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { key: key.into(), reason: reason.into() }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::Invalid { key: key.into(), reason: e.to_string() }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.trading_days, 252.0);
    }

    #[test]
    fn parse_env_reports_key_on_bad_value() {
        // unique key so parallel tests never observe it
        env::set_var("GARCH_ENGINE_TEST_BAD_U64", "abc");
        let err = parse_env::<u64>("GARCH_ENGINE_TEST_BAD_U64", 1).unwrap_err();
        assert!(err.to_string().contains("GARCH_ENGINE_TEST_BAD_U64"));
        env::remove_var("GARCH_ENGINE_TEST_BAD_U64");
    }

    #[test]
    fn parse_env_falls_back_to_default() {
        assert_eq!(parse_env("GARCH_ENGINE_TEST_UNSET", 7u64).unwrap(), 7);
    }

    #[test]
    fn zero_timeout_rejected() {
        let cfg = EngineConfig { http_timeout_secs: 0, ..EngineConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
