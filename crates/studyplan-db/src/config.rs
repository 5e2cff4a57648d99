use std::env;
use std::path::PathBuf;

/// Database configuration.
///
/// Reads from the `STUDYPLAN_DATABASE_URL` environment variable, falling back
/// to a SQLite file under the platform data directory when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full SQLite connection URL (`sqlite://path/to/file.db` or `sqlite::memory:`).
    pub database_url: String,
}

impl DbConfig {
    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "STUDYPLAN_DATABASE_URL";

    /// The default connection URL used when no environment variable is set.
    ///
    /// `<data_dir>/studyplan/studyplan.db`, or `./studyplan.db` when the
    /// platform has no data directory.
    pub fn default_url() -> String {
        let path = dirs::data_dir()
            .map(|d| d.join("studyplan").join("studyplan.db"))
            .unwrap_or_else(|| PathBuf::from("studyplan.db"));
        format!("sqlite://{}", path.display())
    }

    /// Build a config from the environment.
    ///
    /// Priority: `STUDYPLAN_DATABASE_URL` env var, then [`DbConfig::default_url`].
    pub fn from_env() -> Self {
        let database_url = env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::default_url());
        Self { database_url }
    }

    /// Build a config from an explicit URL (useful for tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Whether this config points at a transient in-memory database.
    pub fn is_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    /// Filesystem path of the database file.
    ///
    /// Returns `None` for in-memory databases or URLs without a path.
    pub fn database_path(&self) -> Option<PathBuf> {
        if self.is_memory() {
            return None;
        }
        let rest = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().filter(|s| !s.is_empty())?;
        Some(PathBuf::from(path))
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
