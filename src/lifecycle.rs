//! Derived volume bookkeeping.
//!
//! Every result slot ("role") owns at most one volume in the scene. The volume
//! is allocated the first time the role is needed, shaped like the input, and
//! reused afterwards: later results replace its samples, never its identity.

use std::collections::HashMap;

use ndarray::Array3;

use crate::enums::{FlipAxis, ScalarType};
use crate::error::{Error, Result};
use crate::scene::{Scene, VolumeId};
use crate::volume::{Volume, VoxelData};

#[derive(Debug, Clone, Copy)]
struct DerivedSlot {
    id: VolumeId,
    dim: (usize, usize, usize),
}

#[derive(Debug, Default)]
pub struct VolumeLifecycleManager {
    roles: HashMap<String, DerivedSlot>,
}

impl VolumeLifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The volume for `role`, allocating it from `input`'s geometry on first use.
    pub fn ensure_output_volume(
        &mut self,
        scene: &mut Scene,
        input: VolumeId,
        role: &str,
    ) -> Result<VolumeId> {
        if let Some(slot) = self.roles.get(role)
            && scene.contains(slot.id)
        {
            return Ok(slot.id);
        }

        let source = scene.get(input)?;
        let volume = Volume::zeros(role, source.dim(), source.spacing(), source.origin());
        let dim = volume.dim();
        let id = scene.add_volume(volume)?;
        tracing::debug!(role, %id, ?dim, "derived volume allocated");
        self.roles.insert(role.to_string(), DerivedSlot { id, dim });
        Ok(id)
    }

    pub fn output_volume(&self, role: &str) -> Option<VolumeId> {
        self.roles.get(role).map(|slot| slot.id)
    }

    /// Shape established for `role` when its volume was allocated.
    pub fn role_shape(&self, role: &str) -> Option<(usize, usize, usize)> {
        self.roles.get(role).map(|slot| slot.dim)
    }

    /// The engine only accepts double precision samples.
    pub fn validate_scalar_type(volume: &Volume) -> bool {
        volume.scalar_type() == ScalarType::Double
    }

    pub fn validate_distinct_volumes(a: VolumeId, b: VolumeId) -> bool {
        a != b
    }

    pub fn require_double(volume: &Volume) -> Result<()> {
        if Self::validate_scalar_type(volume) {
            Ok(())
        } else {
            Err(Error::ScalarTypePrecondition {
                volume: volume.name().to_string(),
                found: volume.scalar_type(),
            })
        }
    }

    /// Double precision copy of `volume` with the same name and geometry.
    pub fn cast_to_double(volume: &Volume) -> Volume {
        Volume::new(
            volume.name(),
            VoxelData::Double(volume.data().to_double()),
            volume.spacing(),
            volume.origin(),
        )
    }

    /// Replace the samples of `id` with their double precision cast.
    pub fn cast_in_place(&self, scene: &mut Scene, id: VolumeId) -> Result<()> {
        let volume = scene.get_mut(id)?;
        if Self::validate_scalar_type(volume) {
            return Ok(());
        }
        let from = volume.scalar_type();
        let data = volume.data().to_double();
        volume.replace_data(VoxelData::Double(data));
        tracing::debug!(%id, %from, "volume cast to double");
        Ok(())
    }

    /// Write a double precision copy of `input` into `output`, optionally
    /// mirrored along one axis. `output` takes over `input`'s spacing and
    /// origin; only its samples are replaced.
    pub fn cast_and_flip(
        &self,
        scene: &mut Scene,
        input: VolumeId,
        output: VolumeId,
        flip: Option<FlipAxis>,
    ) -> Result<()> {
        if !Self::validate_distinct_volumes(input, output) {
            return Err(Error::SameVolume(input));
        }
        let (source, target) = scene.get_pair_mut(input, output)?;

        if let Some((role, slot)) = self.roles.iter().find(|(_, slot)| slot.id == output)
            && slot.dim != source.dim()
        {
            return Err(Error::ShapeMismatch {
                role: role.clone(),
                expected: slot.dim,
                actual: source.dim(),
            });
        }

        let data = match flip {
            Some(axis) => source.data().to_double_flipped(axis),
            None => source.data().to_double(),
        };
        target.set_geometry(source.spacing(), source.origin());
        target.replace_data(VoxelData::Double(data));
        tracing::debug!(%input, %output, ?flip, "cast written to output volume");
        Ok(())
    }

    /// Store a computed result as the samples of `role`'s volume.
    pub fn bind_result(&self, scene: &mut Scene, role: &str, data: Array3<f64>) -> Result<()> {
        let slot = self
            .roles
            .get(role)
            .ok_or_else(|| Error::UnknownRole(role.to_string()))?;
        if data.dim() != slot.dim {
            return Err(Error::ShapeMismatch {
                role: role.to_string(),
                expected: slot.dim,
                actual: data.dim(),
            });
        }
        scene.get_mut(slot.id)?.replace_data(VoxelData::Double(data));
        Ok(())
    }
}
