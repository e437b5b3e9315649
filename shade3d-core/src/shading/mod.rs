/// Shading modes, their texture-unit table and the program that implements
/// them.
pub mod descriptor;
pub mod lighting;
pub mod mode;
pub mod program;

pub use descriptor::{ProgramDescriptor, Uniform};
pub use mode::{SamplerBindings, ShadingMode, UnknownShadingMode, PRIMARY_TEXTURE_UNIT};
pub use program::{ShadingProgram, ShadingUniforms, TextureSampler, Varyings};
