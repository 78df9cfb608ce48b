use std::collections::BTreeMap;

use serde::Deserialize;

use super::error::Error;
use super::numerical::DEFAULT_STEP;
use super::tolerance::{Check, TolerancePolicy};

/// Settings of one validation run.
///
/// ```toml
/// step = 1e-5
/// terms = ["bond", "angle", "EVQMMM"]
///
/// [tolerances]
/// polelec = 5e-8
/// ```
///
/// An empty `terms` list selects every check the session supports.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    #[serde(default = "default_step")]
    pub step: f64,
    #[serde(default)]
    pub terms: Vec<String>,
    #[serde(default)]
    pub tolerances: BTreeMap<String, f64>,
}

fn default_step() -> f64 {
    DEFAULT_STEP
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            step: default_step(),
            terms: Vec::new(),
            tolerances: BTreeMap::new(),
        }
    }
}

impl ValidationConfig {
    pub fn from_toml_str(toml: &str) -> Result<Self, Error> {
        let config: ValidationConfig =
            toml::from_str(toml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(Error::InvalidStep(self.step));
        }
        for (name, &threshold) in &self.tolerances {
            if !(threshold.is_finite() && threshold > 0.0) {
                return Err(Error::Config(format!(
                    "tolerance for '{name}' must be positive, got {threshold}"
                )));
            }
        }
        Ok(())
    }

    /// Checks named in `terms`, in the order given, or `available` when the
    /// list is empty. Duplicates are dropped.
    pub fn checks(&self, available: &[Check]) -> Result<Vec<Check>, Error> {
        if self.terms.is_empty() {
            return Ok(available.to_vec());
        }
        let mut checks = Vec::with_capacity(self.terms.len());
        for name in &self.terms {
            let check = name
                .parse::<Check>()
                .map_err(|e| Error::Config(e.to_string()))?;
            if !checks.contains(&check) {
                checks.push(check);
            }
        }
        Ok(checks)
    }

    /// Tolerance policy with the `[tolerances]` overrides applied.
    pub fn policy(&self) -> Result<TolerancePolicy, Error> {
        let mut policy = TolerancePolicy::new();
        for (name, &threshold) in &self.tolerances {
            let check = name
                .parse::<Check>()
                .map_err(|e| Error::Config(e.to_string()))?;
            policy.set_threshold(check, threshold);
        }
        Ok(policy)
    }
}
