//! # Bone enhancer
//!
//! Orchestration layer for bone-surface enhancement of 3D ultrasound
//! volumes. The numerical work is done by an external engine behind the
//! [`ProcessingEngine`] trait; this crate handles everything around it:
//!
//!  - Algorithm catalogs with bounded, tooltipped parameters, serialized
//!    into the positional vector the engine expects
//!  - A scene of named volumes, with scalar type checks and casting to
//!    double precision
//!  - The derived output volume, allocated once and reused on later runs
//!  - A side-by-side comparison layout showing input and result in the
//!    three medical axes:
//!    - Axial
//!    - Sagittal
//!    - Coronal
//!
//! Volumes can be imported from a directory of ".dcm" files. Slices of
//! anisotropic volumes are interpolated to preserve aspect ratios when
//! rendered.
//!
//! # Examples
//!
//! ## Enhancing a DICOM series
//!
//! ```no_run
//! # use bone_enhancer::{EnhancementSession, ProcessingEngine, SessionConfig, Volume};
//! # struct Engine;
//! # impl ProcessingEngine for Engine {
//! #     fn invoke(&mut self, _: &Volume, _: &mut Volume, _: &[f64], _: &str) -> bone_enhancer::Result<f64> {
//! #         Ok(0.0)
//! #     }
//! # }
//! bone_enhancer::init_logging("info").expect("should have installed logging");
//! let mut session = EnhancementSession::with_builtin_catalog(SessionConfig::default(), Engine)
//!     .expect("should have set up session");
//! session
//!     .load_dicom_directory("dicom")
//!     .expect("should have loaded files from directory");
//! session
//!     .parameters_mut()
//!     .set_value("Bone Threshold", 0.5)
//!     .expect("should be within range");
//! session.apply().expect("should have enhanced volume");
//! println!("{}", session.runtime_label());
//! let image = session
//!     .render_pane("RedBone")
//!     .expect("should be a pane of the comparison layout")
//!     .expect("should show the enhanced volume");
//! image.save("result.png");
//! ```

pub mod config;
pub mod enums;
pub mod error;
pub mod gate;
mod interpolator;
pub mod invoker;
pub mod layout;
pub mod lifecycle;
pub mod logging;
pub mod parameter_set;
pub mod parameters;
pub mod scene;
pub mod session;
pub mod volume;
pub mod volume_loader;

pub use config::SessionConfig;
pub use enums::{CastPolicy, FlipAxis, Orientation, ScalarType};
pub use error::{Error, Result};
pub use gate::{ActionGate, ActionState, Selection};
pub use invoker::{ProcessingEngine, ProcessingInvoker, format_runtime};
pub use layout::{COMPARISON_LAYOUT_ID, LayoutDescriptor, LayoutState, ViewLayoutRegistry};
pub use lifecycle::VolumeLifecycleManager;
pub use logging::init_logging;
pub use parameter_set::ParameterSet;
pub use parameters::{AlgorithmCatalog, AlgorithmDescriptor, Parameter};
pub use scene::{Scene, VolumeId};
pub use session::EnhancementSession;
pub use volume::{Volume, VoxelData};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
