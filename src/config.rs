use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Fewest branches a decision may have.
pub const MIN_CONDITIONS: usize = 2;
/// Most branches a decision may have.
pub const MAX_CONDITIONS: usize = 10;

/// Limits and defaults the structural editor reads before every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Hard cap on the number of shapes in a process.
    pub shape_limit: usize,
    /// Percentage of `shape_limit` at which a warning is raised.
    pub warning_threshold_percent: u8,
    pub min_conditions: usize,
    pub max_conditions: usize,
    /// Lifetime requested for images duplicated while copying.
    #[serde(with = "seconds")]
    pub image_copy_expiry: Duration,
    /// Upper bound on the image duplication request. `None` waits indefinitely.
    #[serde(with = "optional_seconds")]
    pub image_copy_timeout: Option<Duration>,
    pub task_size: (f64, f64),
    pub decision_size: (f64, f64),
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            shape_limit: 100,
            warning_threshold_percent: 80,
            min_conditions: MIN_CONDITIONS,
            max_conditions: MAX_CONDITIONS,
            image_copy_expiry: Duration::from_secs(60 * 60),
            image_copy_timeout: Some(Duration::from_secs(10)),
            task_size: (126.0, 150.0),
            decision_size: (120.0, 120.0),
        }
    }
}

impl EditorConfig {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_shape_limit(mut self, shape_limit: usize) -> Self {
        self.shape_limit = shape_limit;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_conditions < 2 || self.min_conditions > self.max_conditions {
            return Err(ConfigError::Invalid(format!(
                "condition bounds {}..={} are not usable",
                self.min_conditions, self.max_conditions
            )));
        }
        if self.warning_threshold_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "warning threshold {}% is above 100%",
                self.warning_threshold_percent
            )));
        }
        Ok(())
    }

    /// Shape count from which the limit warning is raised.
    pub fn warning_threshold(&self) -> usize {
        (self.shape_limit * usize::from(self.warning_threshold_percent)).div_ceil(100)
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod optional_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|secs| secs.map(Duration::from_secs))
    }
}
