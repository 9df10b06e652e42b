use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PLACEHOLDER: char = '#';

/// Runtime configuration
///
/// Builder-style; every setter consumes and returns the config.
#[derive(Debug, Clone)]
pub struct DocketConfig {
    /// Upper bound on waiting for a row lock. `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,

    /// Where the in-memory store is snapshotted between runs
    pub snapshot_path: Option<PathBuf>,

    /// Character marking the numeric run in sequence templates
    pub placeholder: char,

    /// Actor recorded in audit fields for administrative operations
    pub system_actor: String,
}

impl DocketConfig {
    pub fn new() -> Self {
        Self {
            lock_timeout: Some(Duration::from_secs(30)),
            snapshot_path: None,
            placeholder: DEFAULT_PLACEHOLDER,
            system_actor: "system".to_string(),
        }
    }

    /// Set lock wait timeout
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Wait for row locks without a bound
    pub fn no_lock_timeout(mut self) -> Self {
        self.lock_timeout = None;
        self
    }

    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn placeholder(mut self, placeholder: char) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn system_actor(mut self, actor: &str) -> Self {
        self.system_actor = actor.to_string();
        self
    }

    /// Apply `DOCKET_*` environment overrides on top of this config.
    ///
    /// Recognised: `DOCKET_LOCK_TIMEOUT_MS` (0 disables the bound),
    /// `DOCKET_SNAPSHOT`, `DOCKET_PLACEHOLDER`, `DOCKET_ACTOR`.
    pub fn from_env(self) -> Result<Self, String> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        if let Some(raw) = var("DOCKET_LOCK_TIMEOUT_MS") {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|_| format!("DOCKET_LOCK_TIMEOUT_MS must be an integer, got '{raw}'"))?;
            self.lock_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }

        if let Some(path) = var("DOCKET_SNAPSHOT") {
            self.snapshot_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = var("DOCKET_PLACEHOLDER") {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => self.placeholder = c,
                _ => return Err(format!("DOCKET_PLACEHOLDER must be one character, got '{raw}'")),
            }
        }

        if let Some(actor) = var("DOCKET_ACTOR") {
            self.system_actor = actor;
        }

        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.system_actor.trim().is_empty() {
            return Err("system_actor cannot be empty".to_string());
        }

        if self.lock_timeout == Some(Duration::ZERO) {
            return Err("lock_timeout must be > 0; use no_lock_timeout() to wait indefinitely".to_string());
        }

        if self.placeholder.is_alphanumeric() || self.placeholder.is_whitespace() {
            return Err(format!(
                "placeholder '{}' must be a symbol, not a letter, digit or space",
                self.placeholder
            ));
        }

        Ok(())
    }
}

impl Default for DocketConfig {
    fn default() -> Self {
        Self::new()
    }
}
