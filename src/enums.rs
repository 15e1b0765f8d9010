use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

/// Voxel sample type of a volume's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    U8,
    I16,
    U16,
    F32,
    Double,
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "unsigned char"),
            Self::I16 => write!(f, "short"),
            Self::U16 => write!(f, "unsigned short"),
            Self::F32 => write!(f, "float"),
            Self::Double => write!(f, "double"),
        }
    }
}

/// Spatial axis to mirror while casting, in (x, y, z) volume coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    X,
    Y,
    Z,
}

impl FlipAxis {
    /// Array axis for a (depth, height, width) buffer.
    pub(crate) fn array_axis(self) -> ndarray::Axis {
        match self {
            FlipAxis::X => ndarray::Axis(2),
            FlipAxis::Y => ndarray::Axis(1),
            FlipAxis::Z => ndarray::Axis(0),
        }
    }
}

/// What `apply` does with an input that is not double precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastPolicy {
    /// Cast the input in place and log a warning.
    #[default]
    CastWithWarning,
    /// Refuse with a scalar type precondition error.
    Reject,
}

