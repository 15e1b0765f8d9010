//! Multi-pane view layouts.
//!
//! A [`LayoutDescriptor`] is registered once under a numeric id and selected
//! by that id afterwards. Panes are addressed by name; after a computation the
//! panes of the active layout are rebound to their volumes and refitted so no
//! pane keeps showing an outdated frame.

use std::collections::HashMap;

use image::GrayImage;

use crate::enums::Orientation;
use crate::error::{Error, Result};
use crate::scene::{Scene, VolumeId};

/// Id the comparison layout is registered under.
pub const COMPARISON_LAYOUT_ID: u32 = 501;

/// Panes showing the input volume.
pub const PRIMARY_PANES: [&str; 3] = ["Red", "Yellow", "Green"];

/// Panes showing the enhanced volume.
pub const COMPARISON_PANES: [&str; 3] = ["RedBone", "YellowBone", "GreenBone"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneSpec {
    name: String,
    orientation: Orientation,
    label: String,
    color: String,
}

impl PaneSpec {
    pub fn new(
        name: impl Into<String>,
        orientation: Orientation,
        label: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            orientation,
            label: label.into(),
            color: color.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

/// Rows of panes, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutDescriptor {
    name: String,
    rows: Vec<Vec<PaneSpec>>,
}

impl LayoutDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, panes: Vec<PaneSpec>) -> Self {
        self.rows.push(panes);
        self
    }

    /// Input on top, enhanced result below, one pane per orientation.
    pub fn comparison() -> Self {
        let row = |names: [&str; 3]| {
            vec![
                PaneSpec::new(names[0], Orientation::Axial, "R", "#F34A33"),
                PaneSpec::new(names[1], Orientation::Sagittal, "Y", "#EDD54C"),
                PaneSpec::new(names[2], Orientation::Coronal, "G", "#6EB04B"),
            ]
        };
        Self::new("BoneEnhancerComparison")
            .with_row(row(PRIMARY_PANES))
            .with_row(row(COMPARISON_PANES))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<PaneSpec>] {
        &self.rows
    }

    pub fn panes(&self) -> impl Iterator<Item = &PaneSpec> {
        self.rows.iter().flatten()
    }

    pub fn pane(&self, name: &str) -> Option<&PaneSpec> {
        self.panes().find(|pane| pane.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    Unregistered,
    Registered,
    Active,
}

/// Result of fitting a pane to its volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaneFit {
    /// In-plane physical extent (width, height) of the content.
    pub field_of_view: (f64, f64),
    pub slice_index: usize,
    /// Volume generation the fit was computed against.
    pub generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaneState {
    pub volume: Option<VolumeId>,
    pub fit: Option<PaneFit>,
}

#[derive(Debug, Default)]
pub struct ViewLayoutRegistry {
    layouts: HashMap<u32, LayoutDescriptor>,
    active: Option<u32>,
    panes: HashMap<String, PaneState>,
}

impl ViewLayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `descriptor` under `id`. Registering the same descriptor
    /// again is a no-op; a different descriptor under a taken id is refused.
    pub fn register_layout(&mut self, id: u32, descriptor: LayoutDescriptor) -> Result<()> {
        match self.layouts.get(&id) {
            Some(existing) if *existing == descriptor => Ok(()),
            Some(_) => Err(Error::LayoutConflict(id)),
            None => {
                tracing::debug!(id, name = descriptor.name(), "layout registered");
                self.layouts.insert(id, descriptor);
                Ok(())
            }
        }
    }

    pub fn state(&self, id: u32) -> LayoutState {
        if self.active == Some(id) {
            LayoutState::Active
        } else if self.layouts.contains_key(&id) {
            LayoutState::Registered
        } else {
            LayoutState::Unregistered
        }
    }

    pub fn activate(&mut self, id: u32) -> Result<()> {
        let descriptor = self.layouts.get(&id).ok_or(Error::UnknownLayout(id))?;
        if self.active == Some(id) {
            return Ok(());
        }
        for pane in descriptor.panes() {
            self.panes.entry(pane.name.clone()).or_default();
        }
        self.active = Some(id);
        tracing::debug!(id, "layout activated");
        Ok(())
    }

    pub fn active_layout(&self) -> Option<(u32, &LayoutDescriptor)> {
        let id = self.active?;
        self.layouts.get(&id).map(|descriptor| (id, descriptor))
    }

    fn active_pane(&self, name: &str) -> Result<&PaneSpec> {
        self.active_layout()
            .and_then(|(_, descriptor)| descriptor.pane(name))
            .ok_or_else(|| Error::UnknownPane(name.to_string()))
    }

    pub fn pane(&self, name: &str) -> Option<&PaneState> {
        self.panes.get(name)
    }

    /// Show `volume` in `pane`. The pane needs refitting afterwards.
    pub fn bind_pane(&mut self, pane: &str, volume: VolumeId) -> Result<()> {
        self.active_pane(pane)?;
        let state = self.panes.entry(pane.to_string()).or_default();
        state.volume = Some(volume);
        state.fit = None;
        Ok(())
    }

    /// Rescale `pane` to its bound volume and centre it on the middle slice.
    pub fn fit_pane_to_content(&mut self, pane: &str, scene: &Scene) -> Result<()> {
        let orientation = self.active_pane(pane)?.orientation;
        let state = self.panes.entry(pane.to_string()).or_default();
        let Some(id) = state.volume else {
            state.fit = None;
            return Ok(());
        };
        let volume = scene.get(id)?;
        let (x, y, z) = volume.extent();
        let field_of_view = match orientation {
            Orientation::Axial => (x, y),
            Orientation::Coronal => (x, z),
            Orientation::Sagittal => (y, z),
        };
        state.fit = Some(PaneFit {
            field_of_view,
            slice_index: volume.slice_count(orientation) / 2,
            generation: volume.generation(),
        });
        Ok(())
    }

    /// Activate layout `id` and show `volumes[row]` in every pane of that row.
    ///
    /// All panes and volumes are checked before anything is rebound, so a
    /// failure leaves the previous bindings untouched.
    pub fn show_rows(&mut self, id: u32, scene: &Scene, volumes: &[VolumeId]) -> Result<()> {
        let descriptor = self.layouts.get(&id).ok_or(Error::UnknownLayout(id))?;
        for volume in volumes {
            scene.get(*volume)?;
        }
        let bindings: Vec<(String, VolumeId)> = descriptor
            .rows
            .iter()
            .zip(volumes)
            .flat_map(|(row, volume)| row.iter().map(move |pane| (pane.name.clone(), *volume)))
            .collect();

        self.activate(id)?;
        for (pane, volume) in &bindings {
            self.bind_pane(pane, *volume)?;
            self.fit_pane_to_content(pane, scene)?;
            tracing::debug!(pane, %volume, "pane rebound");
        }
        Ok(())
    }

    /// True if the pane shows a volume it has not been fitted to since the
    /// volume last changed.
    pub fn is_stale(&self, pane: &str, scene: &Scene) -> bool {
        let Some(state) = self.panes.get(pane) else {
            return false;
        };
        match (state.volume, state.fit) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(id), Some(fit)) => !scene
                .get(id)
                .is_ok_and(|volume| volume.generation() == fit.generation),
        }
    }

    /// Snapshot of the slice a pane currently shows.
    pub fn render_pane(&self, pane: &str, scene: &Scene) -> Result<Option<GrayImage>> {
        let orientation = self.active_pane(pane)?.orientation;
        let Some(state) = self.panes.get(pane) else {
            return Ok(None);
        };
        let (Some(id), Some(fit)) = (state.volume, state.fit) else {
            return Ok(None);
        };
        Ok(scene
            .get(id)?
            .get_image_from_axis(fit.slice_index, orientation))
    }
}
