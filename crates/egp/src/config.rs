//! Configuration surface for an embedding worker process (§1 [EXPANSION]).
//!
//! Deliberately small: cache sizes, the type-lattice and gene-pool seed file
//! locations, and (behind the `postgres` feature) a Postgres DSN. No CLI
//! flag parsing lives here (explicit Non-goal) — values are read from
//! environment variables, or set directly on the struct by the embedding
//! application.

use std::env;
use std::path::PathBuf;

use crate::error::{EgpError, Result};

/// Cache sizes and seed locations for one [`crate::Workspace`].
///
/// `l1_max == 0` means an unbounded L1 (§4.7's "configurable (can be 0 =
/// unbounded)").
#[derive(Debug, Clone)]
pub struct Config {
    pub l1_max: usize,
    pub l2_max: usize,
    pub l2_purge: usize,
    pub types_seed_path: Option<PathBuf>,
    pub types_seed_sig_path: Option<PathBuf>,
    pub gene_pool_seed_path: Option<PathBuf>,
    pub gene_pool_seed_sig_path: Option<PathBuf>,
    #[cfg(feature = "postgres")]
    pub postgres_dsn: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            l1_max: 0,
            l2_max: 4096,
            l2_purge: 256,
            types_seed_path: None,
            types_seed_sig_path: None,
            gene_pool_seed_path: None,
            gene_pool_seed_sig_path: None,
            #[cfg(feature = "postgres")]
            postgres_dsn: None,
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().map(PathBuf::from)
}

fn env_usize(key: &str, default: usize) -> Result<usize> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| EgpError::Config(format!("{key} must be an unsigned integer, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Reads `EGP_L1_MAX`, `EGP_L2_MAX`, `EGP_L2_PURGE`, `EGP_TYPES_SEED`,
    /// `EGP_TYPES_SEED_SIG`, `EGP_GENE_POOL_SEED`, `EGP_GENE_POOL_SEED_SIG`
    /// and, with the `postgres` feature, `EGP_POSTGRES_DSN`. Any variable
    /// that is unset falls back to [`Config::default`].
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();
        Ok(Config {
            l1_max: env_usize("EGP_L1_MAX", defaults.l1_max)?,
            l2_max: env_usize("EGP_L2_MAX", defaults.l2_max)?,
            l2_purge: env_usize("EGP_L2_PURGE", defaults.l2_purge)?,
            types_seed_path: env_path("EGP_TYPES_SEED"),
            types_seed_sig_path: env_path("EGP_TYPES_SEED_SIG"),
            gene_pool_seed_path: env_path("EGP_GENE_POOL_SEED"),
            gene_pool_seed_sig_path: env_path("EGP_GENE_POOL_SEED_SIG"),
            #[cfg(feature = "postgres")]
            postgres_dsn: env::var("EGP_POSTGRES_DSN").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_unbounded_l1_and_a_bounded_l2() {
        let config = Config::default();
        assert_eq!(config.l1_max, 0);
        assert!(config.l2_max > 0);
        assert!(config.l2_purge > 0 && config.l2_purge <= config.l2_max);
    }

    #[test]
    fn env_usize_rejects_non_numeric_values() {
        env::set_var("EGP_TEST_NOT_A_NUMBER", "not-a-number");
        let err = env_usize("EGP_TEST_NOT_A_NUMBER", 1).unwrap_err();
        assert!(matches!(err, EgpError::Config(_)));
        env::remove_var("EGP_TEST_NOT_A_NUMBER");
    }

    #[test]
    fn env_usize_falls_back_to_default_when_unset() {
        env::remove_var("EGP_TEST_UNSET_VAR");
        assert_eq!(env_usize("EGP_TEST_UNSET_VAR", 42).unwrap(), 42);
    }
}
