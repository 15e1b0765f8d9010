//! Declarative algorithm catalog.
//!
//! Each algorithm is described by an [`AlgorithmDescriptor`]: the name the
//! engine knows it by, what the operator sees, and a table of bounded numeric
//! [`Parameter`]s. Descriptors are pure data and can be loaded from TOML:
//!
//! ```toml
//! [[algorithm]]
//! name = "Foroughi2007"
//! label = "Foroughi2007 (with minor modifications)"
//! action_label = "Extract Bone Features"
//!
//! [algorithm.parameters."Smoothing Sigma"]
//! decimals = 1
//! step = 1.0
//! min = 1.0
//! max = 10.0
//! default = 5.0
//! ```
//!
//! The engine receives parameter values positionally, in the order returned by
//! [`ordered_keys`]. That order is the case-insensitive lexical order of the
//! parameter names and must never change for an existing algorithm.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Catalog shipped with the crate.
const BUILTIN_CATALOG: &str = r#"
[[algorithm]]
name = "Foroughi2007"
label = "Foroughi2007 (with minor modifications)"
tooltip = "Runs Foroughi's algorithm on the input US volume."
action_label = "Extract Bone Features"

[algorithm.parameters."Smoothing Sigma"]
decimals = 1
step = 1.0
min = 1.0
max = 10.0
default = 5.0
tooltip = "Smoothing Sigma ToolTip"

[algorithm.parameters."Transducer Margin"]
decimals = 0
step = 1.0
min = 0.0
max = 100.0
default = 60.0
tooltip = "Transducer Margin ToolTip"

[algorithm.parameters."Shadow Sigma"]
decimals = 1
step = 1.0
min = 1.0
max = 10.0
default = 6.0
tooltip = "Shadow Sigma ToolTip"

[algorithm.parameters."Bone Threshold"]
decimals = 1
step = 0.1
min = 0.0
max = 1.0
default = 0.4
tooltip = "Bone Threshold ToolTip"

[algorithm.parameters."Blurred vs. BLoG"]
decimals = 0
step = 1.0
min = 1.0
max = 10.0
default = 3.0
tooltip = "Blurred vs. BLoG ToolTip"

[algorithm.parameters."Shadow vs. Intensity"]
decimals = 0
step = 1.0
min = 1.0
max = 10.0
default = 5.0
tooltip = "Shadow vs. Intensity ToolTip"
"#;

/// Most decimals a parameter may be rounded to; `10^decimals` stays exact.
pub const MAX_DECIMALS: u32 = 15;

/// A parameter table entry as written in TOML, before validation.
#[derive(Deserialize)]
struct ParameterEntry {
    decimals: u32,
    step: f64,
    min: f64,
    max: f64,
    default: f64,
    #[serde(default)]
    tooltip: String,
}

/// A bounded numeric parameter, rendered as a slider by the UI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ParameterEntry")]
pub struct Parameter {
    key: String,
    decimals: u32,
    step: f64,
    min: f64,
    max: f64,
    default: f64,
    tooltip: String,
}

impl TryFrom<ParameterEntry> for Parameter {
    type Error = Error;

    fn try_from(entry: ParameterEntry) -> Result<Self> {
        Parameter::from_entry(String::new(), entry)
    }
}

impl Parameter {
    pub fn new(
        key: impl Into<String>,
        decimals: u32,
        step: f64,
        min: f64,
        max: f64,
        default: f64,
        tooltip: impl Into<String>,
    ) -> Result<Self> {
        let parameter = Self {
            key: key.into(),
            decimals,
            step,
            min,
            max,
            default,
            tooltip: tooltip.into(),
        };
        parameter.validate()?;
        Ok(parameter)
    }

    fn from_entry(key: String, entry: ParameterEntry) -> Result<Self> {
        Self::new(
            key,
            entry.decimals,
            entry.step,
            entry.min,
            entry.max,
            entry.default,
            entry.tooltip,
        )
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidParameter {
            key: self.key.clone(),
            reason: reason.to_string(),
        };
        if ![self.step, self.min, self.max, self.default]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(invalid("bounds, step and default must be finite"));
        }
        if self.step <= 0.0 {
            return Err(invalid("step must be positive"));
        }
        if self.min > self.max {
            return Err(invalid("min is greater than max"));
        }
        if self.default < self.min || self.default > self.max {
            return Err(invalid("default lies outside [min, max]"));
        }
        if self.decimals > MAX_DECIMALS {
            return Err(invalid("more than 15 decimals"));
        }
        Ok(())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn default_value(&self) -> f64 {
        self.default
    }

    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Round to the configured number of decimals. Values too large to
    /// scale are already integral at that precision and come back unchanged.
    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.decimals as i32);
        let scaled = value * factor;
        if !scaled.is_finite() {
            return value;
        }
        scaled.round() / factor
    }
}

/// Sort parameter keys case-insensitively.
///
/// This is the positional contract with the engine: slot `i` of a serialized
/// parameter vector holds the value of `ordered_keys(..)[i]`. Two keys that
/// are equal after case folding cannot be ordered and are rejected.
pub fn ordered_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Result<Vec<String>> {
    let mut folded: Vec<(String, &str)> = keys
        .into_iter()
        .map(|key| (key.to_lowercase(), key))
        .collect();
    folded.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(pair) = folded.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(Error::DuplicateKey {
            first: pair[0].1.to_string(),
            second: pair[1].1.to_string(),
        });
    }

    Ok(folded.into_iter().map(|(_, key)| key.to_string()).collect())
}

/// An `[[algorithm]]` table as written in TOML, before validation.
#[derive(Deserialize)]
struct DescriptorEntry {
    name: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    tooltip: String,
    action_label: String,
    #[serde(default)]
    parameters: HashMap<String, ParameterEntry>,
}

/// An algorithm the engine can run, with its parameter table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "DescriptorEntry")]
pub struct AlgorithmDescriptor {
    name: String,
    label: String,
    tooltip: String,
    action_label: String,
    parameters: HashMap<String, Parameter>,
    ordered_keys: Vec<String>,
}

impl TryFrom<DescriptorEntry> for AlgorithmDescriptor {
    type Error = Error;

    fn try_from(entry: DescriptorEntry) -> Result<Self> {
        let parameters = entry
            .parameters
            .into_iter()
            .map(|(key, parameter)| Parameter::from_entry(key, parameter))
            .collect::<Result<Vec<_>>>()?;
        AlgorithmDescriptor::new(
            entry.name,
            entry.label,
            entry.tooltip,
            entry.action_label,
            parameters,
        )
    }
}

impl AlgorithmDescriptor {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        tooltip: impl Into<String>,
        action_label: impl Into<String>,
        parameters: impl IntoIterator<Item = Parameter>,
    ) -> Result<Self> {
        let mut table = HashMap::new();
        for parameter in parameters {
            if let Some(previous) = table.insert(parameter.key.clone(), parameter) {
                return Err(Error::DuplicateKey {
                    first: previous.key.clone(),
                    second: previous.key,
                });
            }
        }
        Self {
            name: name.into(),
            label: label.into(),
            tooltip: tooltip.into(),
            action_label: action_label.into(),
            parameters: table,
            ordered_keys: Vec::new(),
        }
        .finish()
    }

    // Parameters are validated on construction; only derived fields remain.
    fn finish(mut self) -> Result<Self> {
        if self.label.is_empty() {
            self.label = self.name.clone();
        }
        self.ordered_keys = ordered_keys(self.parameters.keys().map(String::as_str))?;
        Ok(self)
    }

    /// Name the engine registers the algorithm under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }

    pub fn action_label(&self) -> &str {
        &self.action_label
    }

    pub fn parameter(&self, key: &str) -> Option<&Parameter> {
        self.parameters.get(key)
    }

    pub fn ordered_keys(&self) -> &[String] {
        &self.ordered_keys
    }

    /// Parameters in engine order.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.ordered_keys
            .iter()
            .filter_map(|key| self.parameters.get(key))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(rename = "algorithm", default)]
    algorithms: Vec<AlgorithmDescriptor>,
}

/// The set of algorithms offered to the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmCatalog {
    algorithms: Vec<AlgorithmDescriptor>,
}

impl AlgorithmCatalog {
    pub fn new(algorithms: Vec<AlgorithmDescriptor>) -> Result<Self> {
        let names = ordered_keys(algorithms.iter().map(AlgorithmDescriptor::name))?;
        tracing::debug!(algorithms = ?names, "algorithm catalog loaded");
        Ok(Self { algorithms })
    }

    /// The Foroughi2007 bone surface probability catalog.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(source)?;
        Self::new(file.algorithms)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn get(&self, name: &str) -> Result<&AlgorithmDescriptor> {
        self.algorithms
            .iter()
            .find(|algorithm| algorithm.name == name)
            .ok_or_else(|| Error::UnknownAlgorithm(name.to_string()))
    }

    pub fn algorithms(&self) -> &[AlgorithmDescriptor] {
        &self.algorithms
    }

    pub fn first(&self) -> Option<&AlgorithmDescriptor> {
        self.algorithms.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_sort_case_insensitively() {
        let keys = ordered_keys(["beta", "Alpha", "gamma", "Delta"]).unwrap();
        assert_eq!(keys, vec!["Alpha", "beta", "Delta", "gamma"]);
    }

    #[test]
    fn key_order_ignores_insertion_order() {
        let forward = ordered_keys(["Transducer Margin", "Smoothing Sigma", "bone"]).unwrap();
        let backward = ordered_keys(["bone", "Smoothing Sigma", "Transducer Margin"]).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn case_folded_duplicates_are_rejected() {
        let err = ordered_keys(["Sigma", "other", "sigma"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }

    #[test]
    fn builtin_catalog_matches_engine_slots() {
        let catalog = AlgorithmCatalog::builtin().unwrap();
        let foroughi = catalog.get("Foroughi2007").unwrap();
        assert_eq!(
            foroughi.ordered_keys(),
            [
                "Blurred vs. BLoG",
                "Bone Threshold",
                "Shadow Sigma",
                "Shadow vs. Intensity",
                "Smoothing Sigma",
                "Transducer Margin",
            ]
        );
        assert_eq!(foroughi.label(), "Foroughi2007 (with minor modifications)");
        assert_eq!(foroughi.action_label(), "Extract Bone Features");
        let threshold = foroughi.parameter("Bone Threshold").unwrap();
        assert_eq!(threshold.decimals(), 1);
        assert_eq!(threshold.step(), 0.1);
        assert_eq!(threshold.key(), "Bone Threshold");
    }

    #[test]
    fn default_outside_bounds_is_rejected() {
        let err = Parameter::new("Sigma", 1, 1.0, 1.0, 10.0, 11.0, "").unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
        let err = Parameter::new("Sigma", 1, 0.0, 1.0, 10.0, 5.0, "").unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn descriptor_rejects_colliding_keys() {
        let err = AlgorithmDescriptor::new(
            "Test",
            "",
            "",
            "Run",
            [
                Parameter::new("Margin", 0, 1.0, 0.0, 10.0, 1.0, "").unwrap(),
                Parameter::new("margin", 0, 1.0, 0.0, 10.0, 1.0, "").unwrap(),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }

    #[test]
    fn unknown_algorithm_lookup_fails() {
        let catalog = AlgorithmCatalog::builtin().unwrap();
        assert!(matches!(
            catalog.get("Hacihaliloglu2009"),
            Err(Error::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn rounding_follows_decimals() {
        let p = Parameter::new("Threshold", 1, 0.1, 0.0, 1.0, 0.4, "").unwrap();
        assert_eq!(p.round(0.449), 0.4);
        assert_eq!(p.round(0.45001), 0.5);
        assert_eq!(p.clamp(3.0), 1.0);
    }

    #[test]
    fn deserialized_descriptor_is_validated() {
        let err = toml::from_str::<AlgorithmDescriptor>(
            r#"
name = "Test"
action_label = "Run"

[parameters.Sigma]
decimals = 1
step = 1.0
min = 1.0
max = 10.0
default = 50.0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("default lies outside"));

        let descriptor = toml::from_str::<AlgorithmDescriptor>(
            r#"
name = "Test"
action_label = "Run"

[parameters.sigma]
decimals = 1
step = 1.0
min = 1.0
max = 10.0
default = 5.0

[parameters.Margin]
decimals = 0
step = 1.0
min = 0.0
max = 100.0
default = 60.0
"#,
        )
        .unwrap();
        assert_eq!(descriptor.ordered_keys(), ["Margin", "sigma"]);
        assert_eq!(descriptor.label(), "Test");
        assert_eq!(descriptor.parameter("sigma").unwrap().key(), "sigma");
        assert_eq!(descriptor.parameters().count(), 2);
    }

    #[test]
    fn deserialized_parameter_is_validated() {
        let err = toml::from_str::<Parameter>("decimals = 0\nstep = -1.0\nmin = 0.0\nmax = 1.0\ndefault = 0.0\n")
            .unwrap_err();
        assert!(err.to_string().contains("step must be positive"));
    }

    #[test]
    fn catalog_with_invalid_entry_is_a_config_error() {
        let err = AlgorithmCatalog::from_toml_str(
            r#"
[[algorithm]]
name = "Test"
action_label = "Run"

[algorithm.parameters.Sigma]
decimals = 400
step = 1.0
min = 1.0
max = 10.0
default = 5.0
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn excessive_decimals_are_rejected() {
        let err = Parameter::new("Sigma", 400, 1.0, 1.0, 10.0, 5.0, "").unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
        assert!(Parameter::new("Sigma", MAX_DECIMALS, 1.0, 1.0, 10.0, 5.0, "").is_ok());
    }

    #[test]
    fn rounding_huge_values_stays_finite() {
        let p = Parameter::new("Depth", 10, 1.0, 0.0, 1e300, 1e300, "").unwrap();
        assert_eq!(p.round(1e300), 1e300);
        let p = Parameter::new("Depth", MAX_DECIMALS, 1.0, 0.0, 10.0, 5.0, "").unwrap();
        assert_eq!(p.round(5.0), 5.0);
    }
}
