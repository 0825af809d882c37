//! Optional TOML settings overriding demo uniforms at launch.
//!
//! ```toml
//! [demo.ripple]
//! wave_velocity = 45.0
//! progress_damping = 0.1
//!
//! [demo.jelly]
//! elasticity = 0.06
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fieldgraph::Simulation;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub demo: BTreeMap<String, BTreeMap<String, f32>>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies the overrides for one demo. Unknown uniforms are logged and
    /// skipped so a stale settings file cannot prevent a demo from running.
    pub fn apply(&self, demo: &str, sim: &mut Simulation) {
        let Some(overrides) = self.demo.get(demo) else {
            return;
        };
        for (name, value) in overrides {
            if let Err(err) = sim.context_mut().set_float(name, *value) {
                warn!(demo, uniform = %name, error = %err, "ignoring settings override");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldgraph::{
        ComponentWidth, KernelBuilder, SimContext, StateBufferStore, UniformValue,
    };

    fn test_sim() -> Simulation {
        let mut store = StateBufferStore::new(1);
        store.allocate("progress", ComponentWidth::Scalar, 1).unwrap();
        let mut ctx = SimContext::new();
        ctx.declare("wave_velocity", UniformValue::Float(30.0));
        let init = KernelBuilder::new("init").build(&store, &ctx).unwrap();
        let update = KernelBuilder::new("update").build(&store, &ctx).unwrap();
        Simulation::new(store, ctx, init, update)
    }

    #[test]
    fn applies_matching_demo_section() {
        let settings = Settings::from_toml_str(
            r#"
[demo.ripple]
wave_velocity = 55.0
"#,
        )
        .unwrap();
        let mut sim = test_sim();
        settings.apply("ripple", &mut sim);
        assert_eq!(sim.context().get_float("wave_velocity"), Some(55.0));
    }

    #[test]
    fn other_sections_and_unknown_uniforms_are_ignored() {
        let settings = Settings::from_toml_str(
            r#"
[demo.jelly]
elasticity = 0.1

[demo.ripple]
no_such_uniform = 1.0
"#,
        )
        .unwrap();
        let mut sim = test_sim();
        settings.apply("ripple", &mut sim);
        assert_eq!(sim.context().get_float("wave_velocity"), Some(30.0));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Settings::from_toml_str("demo = ").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
