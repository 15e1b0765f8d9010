//! In-memory volume collection: the volumes the operator can pick from and
//! the derived volumes created for results.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::volume::Volume;

/// Scene-unique identity of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeId(pub u64);

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vol#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    volumes: HashMap<VolumeId, Volume>,
    /// Insertion order, for selector listings.
    order: Vec<VolumeId>,
    next_id: u64,
    capacity: Option<usize>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scene that refuses to hold more than `capacity` volumes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// `base` if no volume uses it yet, else the first free `base_N`.
    pub fn generate_unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.volumes.values().any(|v| v.name() == name);
        if !taken(base) {
            return base.to_string();
        }
        (1u64..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Register a volume, renaming it if its name is already in use.
    pub fn add_volume(&mut self, mut volume: Volume) -> Result<VolumeId> {
        if let Some(capacity) = self.capacity
            && self.volumes.len() >= capacity
        {
            return Err(Error::Allocation(format!(
                "scene is full ({capacity} volumes)"
            )));
        }
        let (depth, height, width) = volume.dim();
        if depth == 0 || height == 0 || width == 0 {
            return Err(Error::Allocation(format!(
                "'{}' has an empty extent {:?}",
                volume.name(),
                volume.dim()
            )));
        }

        let name = self.generate_unique_name(volume.name());
        volume.set_name(name);

        self.next_id += 1;
        let id = VolumeId(self.next_id);
        tracing::debug!(%id, name = volume.name(), dim = ?volume.dim(), "volume added to scene");
        self.order.push(id);
        self.volumes.insert(id, volume);
        Ok(id)
    }

    pub fn remove(&mut self, id: VolumeId) -> Option<Volume> {
        self.order.retain(|&i| i != id);
        self.volumes.remove(&id)
    }

    pub fn contains(&self, id: VolumeId) -> bool {
        self.volumes.contains_key(&id)
    }

    pub fn get(&self, id: VolumeId) -> Result<&Volume> {
        self.volumes.get(&id).ok_or(Error::UnknownVolume(id))
    }

    pub fn get_mut(&mut self, id: VolumeId) -> Result<&mut Volume> {
        self.volumes.get_mut(&id).ok_or(Error::UnknownVolume(id))
    }

    /// Borrow a source volume and a distinct target volume at once.
    pub fn get_pair_mut(
        &mut self,
        source: VolumeId,
        target: VolumeId,
    ) -> Result<(&Volume, &mut Volume)> {
        if source == target {
            return Err(Error::SameVolume(source));
        }
        match self.volumes.get_disjoint_mut([&source, &target]) {
            [Some(source), Some(target)] => Ok((&*source, target)),
            [None, _] => Err(Error::UnknownVolume(source)),
            [_, None] => Err(Error::UnknownVolume(target)),
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<VolumeId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.volumes.get(id).is_some_and(|v| v.name() == name))
    }

    /// (id, name) pairs in insertion order, for volume selectors.
    pub fn volume_names(&self) -> Vec<(VolumeId, String)> {
        self.order
            .iter()
            .filter_map(|id| self.volumes.get(id).map(|v| (*id, v.name().to_string())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}
