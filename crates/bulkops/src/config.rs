//! Runtime settings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::errors::{BulkOpsError, BulkOpsResult};

/// Settings shared by the history, the operations and the binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Maximum number of records kept in the undo history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Bound on the storage calls of a single mutating operation
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,

    /// Bound on a single undo
    #[serde(default = "default_undo_timeout_secs")]
    pub undo_timeout_secs: u64,

    /// Bound on validation lookups (tax existence and the like)
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,
}

const fn default_history_capacity() -> usize {
    20
}

const fn default_operation_timeout_secs() -> u64 {
    600
}

const fn default_undo_timeout_secs() -> u64 {
    300
}

const fn default_lookup_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            operation_timeout_secs: default_operation_timeout_secs(),
            undo_timeout_secs: default_undo_timeout_secs(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults when it is missing
    pub async fn load(path: impl AsRef<Path>) -> BulkOpsResult<Self> {
        let path = path.as_ref();
        let settings = match fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str::<Self>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                return Err(BulkOpsError::FileRead {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub async fn save(&self, path: impl AsRef<Path>) -> BulkOpsResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .await
            .map_err(|e| BulkOpsError::FileWrite {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Reject values the history and operations cannot work with
    pub fn validate(&self) -> BulkOpsResult<()> {
        if self.history_capacity == 0 {
            return Err(BulkOpsError::InvalidConfigValue {
                key: "historyCapacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        for (key, value) in [
            ("operationTimeoutSecs", self.operation_timeout_secs),
            ("undoTimeoutSecs", self.undo_timeout_secs),
            ("lookupTimeoutSecs", self.lookup_timeout_secs),
        ] {
            if value == 0 {
                return Err(BulkOpsError::InvalidConfigValue {
                    key: key.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn undo_timeout(&self) -> Duration {
        Duration::from_secs(self.undo_timeout_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}
