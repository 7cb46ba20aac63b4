//! micromodelsim - diffusion-weighted MRI signal simulation
//!
//! Forward simulation of the signal attenuation produced by a distribution
//! of diffusion tensors under a measurement protocol of linear, planar or
//! spherical b-tensors, with optional Rician noise.

pub mod config;
pub mod error;
pub mod noise;
pub mod protocol;
pub mod rotation;
pub mod sh;
pub mod simulation;
pub mod tensor;


// Re-export main types
pub use config::{NoiseConfig, ProtocolConfig, RunConfig, SimulationConfig};
pub use error::{ErrorKind, SimError};
pub use noise::{add_noise, add_noise_array, add_noise_seeded};
pub use protocol::{hemisphere_directions, EncodingShape, Protocol, VERTICES_48};
pub use rotation::vec2vec_rotmat;
pub use simulation::{dtd_simulation, simulate};
