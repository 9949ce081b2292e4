//! Configuration for balance computations.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use balance_common::{BalanceError, BalanceResult, GridConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration for a balance run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Grid definition used when the data source does not carry its own axes.
    pub grid: GridConfig,

    /// How the per-time-step loop is executed.
    pub execution: Execution,

    /// Whether flux is reported as a net total or as income/outcome.
    pub flux_mode: FluxMode,

    /// Variable names in the underlying dataset.
    pub variables: VariableNames,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            execution: Execution::Sequential,
            flux_mode: FluxMode::Total,
            variables: VariableNames::default(),
        }
    }
}

impl BalanceConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> BalanceResult<Self> {
        let mut config = Self::default();

        if let Some(width) = env_parse("BALANCE_GRID_WIDTH")? {
            config.grid.width = width;
        }

        if let Some(height) = env_parse("BALANCE_GRID_HEIGHT")? {
            config.grid.height = height;
        }

        if let Some(step) = env_parse("BALANCE_GRID_STEP")? {
            config.grid.step_degrees = step;
        }

        if let Some(base) = env_parse("BALANCE_LON_BASE")? {
            config.grid.lon_base = base;
        }

        if let Ok(val) = std::env::var("BALANCE_LATITUDE_ORIGIN") {
            config.grid.latitude_origin = val.parse()?;
        }

        if let Some(length) = env_parse("BALANCE_DEGREE_LENGTH_M")? {
            config.grid.degree_length_m = length;
        }

        if let Some(offset) = env_parse("BALANCE_LON_INDEX_OFFSET")? {
            config.grid.lon_index_offset = offset;
        }

        if let Ok(val) = std::env::var("BALANCE_EXECUTION") {
            config.execution = val.parse()?;
        }

        if let Ok(val) = std::env::var("BALANCE_FLUX_MODE") {
            config.flux_mode = val.parse()?;
        }

        if let Ok(val) = std::env::var("BALANCE_TARGET_VARIABLE") {
            config.variables.target = val;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document. `${VAR}` and `${VAR:-default}` are expanded first.
    pub fn from_yaml_str(yaml: &str) -> BalanceResult<Self> {
        let expanded = expand_env_vars(yaml)?;
        let mut value: serde_yaml::Value = serde_yaml::from_str(&expanded).map_err(yaml_error)?;

        if value.is_null() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        // The mode is parsed separately so an unknown value surfaces as InvalidMode.
        let flux_mode = match value.as_mapping_mut().and_then(|m| m.remove("flux_mode")) {
            Some(serde_yaml::Value::String(s)) => Some(s.parse::<FluxMode>()?),
            Some(other) => {
                return Err(BalanceError::invalid_mode(format!(
                    "flux_mode must be a string, got {:?}",
                    other
                )))
            }
            None => None,
        };

        let mut config: Self = serde_yaml::from_value(value).map_err(yaml_error)?;
        if let Some(mode) = flux_mode {
            config.flux_mode = mode;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> BalanceResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BalanceError::invalid_config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> BalanceResult<()> {
        self.grid.validate()?;
        self.variables.validate()
    }
}

fn env_parse<T: FromStr>(name: &str) -> BalanceResult<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            BalanceError::invalid_config(format!("{} has an invalid value '{}'", name, val))
        }),
        Err(_) => Ok(None),
    }
}

fn yaml_error(err: serde_yaml::Error) -> BalanceError {
    BalanceError::invalid_config(format!("YAML error: {}", err))
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> BalanceResult<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            BalanceError::invalid_config(format!("unclosed variable substitution: ${{{}", after))
        })?;

        let expr = &after[..end];
        let value = match expr.split_once(":-") {
            Some((name, default)) => match std::env::var(name.trim()) {
                Ok(val) if !val.is_empty() => val,
                _ => default.to_string(),
            },
            None => std::env::var(expr.trim()).map_err(|_| {
                BalanceError::invalid_config(format!("environment variable {} not set", expr))
            })?,
        };

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Execution strategy for the per-time-step loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Execution {
    /// Plain loop on the calling thread.
    #[default]
    Sequential,
    /// Time steps spread over the rayon thread pool.
    Parallel,
}

impl Execution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

impl FromStr for Execution {
    type Err = BalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" | "serial" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            other => Err(BalanceError::invalid_config(format!(
                "unknown execution strategy '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output mode of the boundary flux engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FluxMode {
    /// Net flux (income minus outcome).
    #[default]
    Total,
    /// Income and outcome kept apart.
    Separated,
}

impl FluxMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::Separated => "separated",
        }
    }
}

impl FromStr for FluxMode {
    type Err = BalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "total" | "net" => Ok(Self::Total),
            "separated" | "sep" | "diff" => Ok(Self::Separated),
            other => Err(BalanceError::invalid_mode(format!(
                "unknown flux mode '{}' (expected 'total' or 'separated')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FluxMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Names of the dataset variables holding each quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableNames {
    /// Concentration of the traced substance.
    pub target: String,
    /// Eastward wind component.
    pub u: String,
    /// Northward wind component.
    pub v: String,
    /// Time axis.
    pub time: String,
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            target: "PWV".to_string(),
            u: "U".to_string(),
            v: "V".to_string(),
            time: "stime".to_string(),
        }
    }
}

impl VariableNames {
    pub fn validate(&self) -> BalanceResult<()> {
        for (field, name) in [
            ("target", &self.target),
            ("u", &self.u),
            ("v", &self.v),
            ("time", &self.time),
        ] {
            if name.trim().is_empty() {
                return Err(BalanceError::invalid_config(format!(
                    "variable name '{}' must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}
