use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString},
    Argon2,
};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Passcode the evaluation form has always shipped with.
pub const DEFAULT_ADMIN_PASSCODE: &str = "travis_gogh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// `video_metadata.csv` and `ratings.csv` in the data directory
    Flat,
    /// SQLite database with transactional deletes and uploads
    Sql,
}

/// Command-line flags. Every flag falls back to an environment variable,
/// which may come from a `.env` file.
#[derive(Parser, Debug, Clone)]
#[command(name = "commentary-eval", version, about = "Human evaluation of match commentary models")]
pub struct Cli {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Directory holding the tables and `uploaded_videos/`
    #[arg(long, env = "DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    #[arg(long, env = "CATALOG_BACKEND", value_enum, default_value_t = Backend::Flat)]
    pub backend: Backend,

    /// Only used by the sql backend; defaults to `catalog.db` in the data directory
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "ADMIN_PASSCODE", hide_env_values = true)]
    pub admin_passcode: Option<String>,

    /// Argon2 hash of the admin passcode, see the `hash_passcode` binary
    #[arg(long, env = "ADMIN_PASSCODE_HASH", hide_env_values = true)]
    pub admin_passcode_hash: Option<String>,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    #[arg(long, env = "ADMIN_TOKEN_TTL_SECS", default_value_t = 900)]
    pub token_ttl_secs: u64,

    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = 512)]
    pub max_upload_mb: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ADMIN_PASSCODE_HASH is not a valid argon2 hash: {0}")]
    InvalidPasscodeHash(String),
    #[error("failed to hash admin passcode: {0}")]
    PasscodeHash(String),
    #[error("ADMIN_PASSCODE must not be empty")]
    EmptyPasscode,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub backend: Backend,
    pub database_url: String,
    pub admin_passcode_hash: String,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let admin_passcode_hash = match (cli.admin_passcode_hash, cli.admin_passcode) {
            (Some(hash), _) => {
                PasswordHash::new(&hash)
                    .map_err(|e| ConfigError::InvalidPasscodeHash(e.to_string()))?;
                hash
            }
            (None, Some(passcode)) => hash_passcode(&passcode)?,
            (None, None) => {
                tracing::warn!("ADMIN_PASSCODE not set, using the built-in default (insecure!)");
                hash_passcode(DEFAULT_ADMIN_PASSCODE)?
            }
        };

        let jwt_secret = cli.jwt_secret.unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, admin tokens will not survive a restart");
            SaltString::generate(&mut OsRng).as_str().to_string()
        });

        let database_url = cli.database_url.unwrap_or_else(|| {
            format!("sqlite://{}?mode=rwc", cli.data_dir.join("catalog.db").display())
        });

        Ok(Self {
            bind_addr: cli.bind,
            data_dir: cli.data_dir,
            backend: cli.backend,
            database_url,
            admin_passcode_hash,
            jwt_secret,
            token_ttl_secs: cli.token_ttl_secs,
            max_upload_bytes: cli.max_upload_mb * 1024 * 1024,
        })
    }
}

/// Argon2 PHC string for `passcode`, so comparisons never touch the plaintext.
pub fn hash_passcode(passcode: &str) -> Result<String, ConfigError> {
    if passcode.is_empty() {
        return Err(ConfigError::EmptyPasscode);
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(passcode.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::PasscodeHash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("commentary-eval").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_cli(cli(&[
            "--data-dir",
            "/srv/eval",
            "--admin-passcode",
            "letmein",
            "--jwt-secret",
            "s3cret",
        ]))
        .unwrap();

        assert_eq!(config.backend, Backend::Flat);
        assert_eq!(config.data_dir, PathBuf::from("/srv/eval"));
        assert_eq!(config.database_url, "sqlite:///srv/eval/catalog.db?mode=rwc");
        assert_eq!(config.max_upload_bytes, 512 * 1024 * 1024);
        assert!(config.admin_passcode_hash.starts_with("$argon2"));
        assert!(!config.admin_passcode_hash.contains("letmein"));
    }

    #[test]
    fn test_passcode_hash_must_parse() {
        let err = Config::from_cli(cli(&["--admin-passcode-hash", "plain-text"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPasscodeHash(_)));

        let hash = hash_passcode("letmein").unwrap();
        let config = Config::from_cli(cli(&["--admin-passcode-hash", hash.as_str(), "--backend", "sql"])).unwrap();
        assert_eq!(config.admin_passcode_hash, hash);
        assert_eq!(config.backend, Backend::Sql);
    }
}
