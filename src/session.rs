//! The orchestration object behind the bone enhancer panel.
//!
//! An [`EnhancementSession`] owns everything that outlives a single click:
//! the scene, the parameter values of every algorithm, the derived output
//! volume and the registered comparison layout.

use std::path::Path;

use image::GrayImage;

use crate::config::SessionConfig;
use crate::enums::{CastPolicy, FlipAxis};
use crate::error::{Error, Result};
use crate::gate::{ActionGate, ActionState, RunningGuard, Selection};
use crate::invoker::{ProcessingEngine, ProcessingInvoker, format_runtime};
use crate::layout::{LayoutDescriptor, ViewLayoutRegistry};
use crate::lifecycle::VolumeLifecycleManager;
use crate::parameter_set::ParameterSet;
use crate::parameters::AlgorithmCatalog;
use crate::scene::{Scene, VolumeId};
use crate::volume::Volume;
use crate::volume_loader::VolumeLoader;

/// Runtime label text before the first run.
pub const RUNTIME_PLACEHOLDER: &str = "... s.";

pub struct EnhancementSession<E> {
    config: SessionConfig,
    scene: Scene,
    catalog: AlgorithmCatalog,
    /// One value set per catalog entry, in catalog order.
    parameter_sets: Vec<ParameterSet>,
    selected_algorithm: usize,
    selection: Selection,
    lifecycle: VolumeLifecycleManager,
    layouts: ViewLayoutRegistry,
    invoker: ProcessingInvoker<E>,
    apply_state: ActionState,
    cast_state: ActionState,
    runtime_label: String,
}

impl<E: ProcessingEngine> EnhancementSession<E> {
    /// Set up a session and bring up the comparison layout.
    pub fn new(config: SessionConfig, catalog: AlgorithmCatalog, engine: E) -> Result<Self> {
        let parameter_sets: Vec<_> = catalog
            .algorithms()
            .iter()
            .map(ParameterSet::new)
            .collect();
        let selected_algorithm = match &config.default_algorithm {
            Some(name) => parameter_sets
                .iter()
                .position(|set| set.algorithm_name() == name)
                .ok_or_else(|| Error::UnknownAlgorithm(name.clone()))?,
            None if parameter_sets.is_empty() => {
                return Err(Error::UnknownAlgorithm(String::new()));
            }
            None => 0,
        };

        let mut layouts = ViewLayoutRegistry::new();
        layouts.register_layout(config.layout_id, LayoutDescriptor::comparison())?;
        layouts.activate(config.layout_id)?;

        let scene = match config.max_scene_volumes {
            Some(capacity) => Scene::with_capacity(capacity),
            None => Scene::new(),
        };

        Ok(Self {
            config,
            scene,
            catalog,
            parameter_sets,
            selected_algorithm,
            selection: Selection::default(),
            lifecycle: VolumeLifecycleManager::new(),
            layouts,
            invoker: ProcessingInvoker::new(engine),
            apply_state: ActionState::Idle,
            cast_state: ActionState::Idle,
            runtime_label: RUNTIME_PLACEHOLDER.to_string(),
        })
    }

    /// A session offering the built-in Foroughi2007 catalog.
    pub fn with_builtin_catalog(config: SessionConfig, engine: E) -> Result<Self> {
        Self::new(config, AlgorithmCatalog::builtin()?, engine)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn catalog(&self) -> &AlgorithmCatalog {
        &self.catalog
    }

    pub fn layouts(&self) -> &ViewLayoutRegistry {
        &self.layouts
    }

    pub fn lifecycle(&self) -> &VolumeLifecycleManager {
        &self.lifecycle
    }

    pub fn engine(&self) -> &E {
        self.invoker.engine()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn apply_state(&self) -> ActionState {
        self.apply_state
    }

    pub fn runtime_label(&self) -> &str {
        &self.runtime_label
    }

    /// Enhanced output volume, once one has been allocated.
    pub fn output_volume(&self) -> Option<VolumeId> {
        self.lifecycle.output_volume(&self.config.output_role)
    }

    /// Add a volume to the scene and select it as input.
    pub fn add_volume(&mut self, volume: Volume) -> Result<VolumeId> {
        let id = self.scene.add_volume(volume)?;
        self.selection.input = Some(id);
        Ok(id)
    }

    /// Import a DICOM series and select it as input.
    pub fn load_dicom_directory(&mut self, path: impl AsRef<Path>) -> Result<VolumeId> {
        let volume = VolumeLoader::load_from_directory(path)?;
        self.add_volume(volume)
    }

    pub fn select_input(&mut self, input: Option<VolumeId>) {
        self.selection.input = input;
    }

    /// Target of the cast action.
    pub fn select_output(&mut self, output: Option<VolumeId>) {
        self.selection.output = output;
    }

    pub fn can_apply(&self) -> bool {
        ActionGate::can_run(&self.selection)
    }

    pub fn can_cast(&self) -> bool {
        ActionGate::can_cast(&self.selection)
    }

    pub fn select_algorithm(&mut self, name: &str) -> Result<()> {
        self.selected_algorithm = self
            .parameter_sets
            .iter()
            .position(|set| set.algorithm_name() == name)
            .ok_or_else(|| Error::UnknownAlgorithm(name.to_string()))?;
        Ok(())
    }

    /// Values of the selected algorithm.
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameter_sets[self.selected_algorithm]
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameter_sets[self.selected_algorithm]
    }

    /// Run the selected algorithm on the selected input and show input and
    /// result side by side. Returns the engine runtime in seconds.
    pub fn apply(&mut self) -> Result<f64> {
        let result = self.apply_selected();
        match &result {
            Ok(_) => {}
            Err(err) if err.is_user_recoverable() => tracing::warn!(%err, "apply refused"),
            Err(err) => tracing::error!(%err, "apply failed"),
        }
        result
    }

    fn apply_selected(&mut self) -> Result<f64> {
        if !ActionGate::can_run(&self.selection) {
            return Err(Error::NothingSelected);
        }
        let input = self.selection.input.ok_or(Error::NothingSelected)?;
        if self.apply_state == ActionState::Running {
            return Err(Error::Busy);
        }

        let volume = self.scene.get(input)?;
        if !VolumeLifecycleManager::validate_scalar_type(volume) {
            match self.config.cast_policy {
                CastPolicy::CastWithWarning => {
                    tracing::warn!(
                        volume = volume.name(),
                        scalar_type = %volume.scalar_type(),
                        "Input image scalar type not double! Casting to double."
                    );
                    self.lifecycle.cast_in_place(&mut self.scene, input)?;
                }
                CastPolicy::Reject => VolumeLifecycleManager::require_double(volume)?,
            }
        }

        let output =
            self.lifecycle
                .ensure_output_volume(&mut self.scene, input, &self.config.output_role)?;

        let parameters = &self.parameter_sets[self.selected_algorithm];
        let vector = parameters.serialize();
        let elapsed = self.invoker.run(
            &mut self.scene,
            input,
            output,
            &vector,
            parameters.algorithm_name(),
            &mut self.apply_state,
        )?;
        self.runtime_label = format_runtime(elapsed);

        self.layouts
            .show_rows(self.config.layout_id, &self.scene, &[input, output])?;
        Ok(elapsed)
    }

    /// Cast the selected input into the selected output, optionally flipping
    /// one axis.
    pub fn cast_selected(&mut self, flip: Option<FlipAxis>) -> Result<()> {
        let result = match (self.selection.input, self.selection.output) {
            (Some(input), Some(output)) if !ActionGate::can_cast(&self.selection) => {
                debug_assert_eq!(input, output);
                Err(Error::SameVolume(input))
            }
            (Some(input), Some(output)) => match RunningGuard::start(&mut self.cast_state) {
                Some(_running) => {
                    self.lifecycle
                        .cast_and_flip(&mut self.scene, input, output, flip)
                }
                None => Err(Error::Busy),
            },
            _ => Err(Error::NothingSelected),
        };
        if let Err(err) = &result {
            tracing::warn!(%err, "cast refused");
        }
        result
    }

    /// Current image of a pane of the comparison layout.
    pub fn render_pane(&self, pane: &str) -> Result<Option<GrayImage>> {
        self.layouts.render_pane(pane, &self.scene)
    }
}
