use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::parameters::{AlgorithmDescriptor, Parameter};

/// Editable values for one algorithm's parameters.
///
/// Values are stored as set. Rounding to each parameter's decimals happens
/// when the set is serialized for the engine or formatted for display.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    descriptor: AlgorithmDescriptor,
    values: HashMap<String, f64>,
}

impl ParameterSet {
    /// Start from every parameter's default.
    pub fn new(descriptor: &AlgorithmDescriptor) -> Self {
        let values = descriptor
            .parameters()
            .map(|p| (p.key().to_string(), p.default_value()))
            .collect();
        Self {
            descriptor: descriptor.clone(),
            values,
        }
    }

    pub fn descriptor(&self) -> &AlgorithmDescriptor {
        &self.descriptor
    }

    pub fn algorithm_name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn ordered_keys(&self) -> &[String] {
        self.descriptor.ordered_keys()
    }

    fn parameter(&self, key: &str) -> Result<&Parameter> {
        self.descriptor
            .parameter(key)
            .ok_or_else(|| Error::UnknownParameter(key.to_string()))
    }

    pub fn value(&self, key: &str) -> Result<f64> {
        let parameter = self.parameter(key)?;
        Ok(self
            .values
            .get(key)
            .copied()
            .unwrap_or(parameter.default_value()))
    }

    /// Programmatic set; values outside the declared bounds are rejected.
    pub fn set_value(&mut self, key: &str, value: f64) -> Result<()> {
        let parameter = self.parameter(key)?;
        if !parameter.contains(value) {
            return Err(Error::OutOfRange {
                key: key.to_string(),
                value,
                min: parameter.min(),
                max: parameter.max(),
            });
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Slider set; values are clamped to the nearest bound. Returns the
    /// value actually stored.
    pub fn set_value_clamped(&mut self, key: &str, value: f64) -> Result<f64> {
        let parameter = self.parameter(key)?;
        if value.is_nan() {
            return Err(Error::OutOfRange {
                key: key.to_string(),
                value,
                min: parameter.min(),
                max: parameter.max(),
            });
        }
        let clamped = parameter.clamp(value);
        self.values.insert(key.to_string(), clamped);
        Ok(clamped)
    }

    pub fn reset_to_defaults(&mut self) {
        for parameter in self.descriptor.parameters() {
            self.values
                .insert(parameter.key().to_string(), parameter.default_value());
        }
    }

    /// Value formatted with the parameter's decimals, as a slider label shows it.
    pub fn display_value(&self, key: &str) -> Result<String> {
        let parameter = self.parameter(key)?;
        let value = parameter.round(parameter.clamp(self.value(key)?));
        Ok(format!("{:.*}", parameter.decimals() as usize, value))
    }

    /// The parameter vector handed to the engine: one clamped, rounded value
    /// per key, in [`ordered_keys`](crate::parameters::ordered_keys) order.
    pub fn serialize(&self) -> Vec<f64> {
        self.descriptor
            .parameters()
            .map(|parameter| {
                let value = self
                    .values
                    .get(parameter.key())
                    .copied()
                    .unwrap_or(parameter.default_value());
                parameter.round(parameter.clamp(value))
            })
            .collect()
    }
}
