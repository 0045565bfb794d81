use std::env;

use serde::{Deserialize, Serialize};

use crate::options::{ChunkOptions, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_TOKENS, DEFAULT_OVERLAP};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Chunker config ────────────────────────────────────────────

/// Process-wide segmentation defaults, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    pub max_chunk_size: usize,
    pub max_tokens: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_tokens: DEFAULT_MAX_TOKENS,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SCHNITT_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("SCHNITT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            max_chunk_size: profiled_env_usize(p, "CHUNK_MAX_SIZE", DEFAULT_MAX_CHUNK_SIZE),
            max_tokens: profiled_env_usize(p, "CHUNK_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            overlap: profiled_env_usize(p, "CHUNK_OVERLAP", DEFAULT_OVERLAP),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Seed per-call options with these limits.
    pub fn to_options(&self) -> ChunkOptions {
        ChunkOptions {
            max_chunk_size: self.max_chunk_size,
            max_tokens: self.max_tokens,
            overlap: self.overlap,
            ..Default::default()
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  chunking:    max_chunk_size={}", self.max_chunk_size);
        tracing::info!("  chunking:    max_tokens={}, overlap={}", self.max_tokens, self.overlap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiled_key_wins_over_plain_key() {
        env::set_var("SCHNITT_CFG_TEST_CHUNK_MAX_SIZE", "1234");
        let cfg = ChunkerConfig::for_profile("schnitt_cfg_test");
        assert_eq!(cfg.profile, "SCHNITT_CFG_TEST");
        assert_eq!(cfg.max_chunk_size, 1234);
        env::remove_var("SCHNITT_CFG_TEST_CHUNK_MAX_SIZE");
    }

    #[test]
    fn unparsable_value_uses_default() {
        env::set_var("BADNUM_CHUNK_MAX_TOKENS", "lots");
        let cfg = ChunkerConfig::for_profile("badnum");
        assert_eq!(cfg.max_tokens, profiled_env_usize("", "CHUNK_MAX_TOKENS", DEFAULT_MAX_TOKENS));
        env::remove_var("BADNUM_CHUNK_MAX_TOKENS");
    }

    #[test]
    fn to_options_copies_limits() {
        let cfg = ChunkerConfig {
            profile: String::new(),
            max_chunk_size: 640,
            max_tokens: 160,
            overlap: 32,
        };
        let opts = cfg.to_options();
        assert_eq!(opts.max_chunk_size, 640);
        assert_eq!(opts.max_tokens, 160);
        assert_eq!(opts.overlap, 32);
        assert_eq!(cfg.profile_label(), "default");
    }
}
