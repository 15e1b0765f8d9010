//! Session configuration, read from TOML.
//!
//! ```toml
//! layout_id = 501
//! output_role = "BoneEnhancedImage"
//! cast_policy = "reject"
//! max_scene_volumes = 64
//! default_algorithm = "Foroughi2007"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::enums::CastPolicy;
use crate::error::Result;
use crate::layout::COMPARISON_LAYOUT_ID;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Id the comparison layout is registered under.
    pub layout_id: u32,
    /// Role (and base volume name) of the enhanced output.
    pub output_role: String,
    pub cast_policy: CastPolicy,
    /// Upper bound on volumes held by the scene; `None` is unbounded.
    pub max_scene_volumes: Option<usize>,
    /// Algorithm selected at start-up; the first catalog entry if unset.
    pub default_algorithm: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layout_id: COMPARISON_LAYOUT_ID,
            output_role: "BoneEnhancedImage".to_string(),
            cast_policy: CastPolicy::default(),
            max_scene_volumes: None,
            default_algorithm: None,
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}
