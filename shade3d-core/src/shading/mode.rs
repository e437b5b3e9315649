use std::fmt;

use log::warn;
use serde::Deserialize;

/// Fragment shading algorithm, identified on the wire by its ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadingMode {
    /// Vertex color times lighting
    #[default]
    Unlit,
    /// Diffuse texture times lighting
    Textured,
    /// Cubemap sampled along the reflected view ray, times lighting
    Environment,
    /// Tangent-space relighting from a packed normal texture
    Bump,
}

/// Texture unit each sampler reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerBindings {
    pub diffuse: u32,
    pub cubemap: u32,
    pub bump: u32,
}

impl SamplerBindings {
    pub const fn new(diffuse: u32, cubemap: u32, bump: u32) -> Self {
        Self {
            diffuse,
            cubemap,
            bump,
        }
    }
}

/// The unit the active sampler of every mode reads; callers bind the
/// texture the mode needs here.
pub const PRIMARY_TEXTURE_UNIT: u32 = 0;

impl ShadingMode {
    pub const ALL: [ShadingMode; 4] = [
        ShadingMode::Unlit,
        ShadingMode::Textured,
        ShadingMode::Environment,
        ShadingMode::Bump,
    ];

    pub fn ordinal(self) -> i32 {
        match self {
            ShadingMode::Unlit => 0,
            ShadingMode::Textured => 1,
            ShadingMode::Environment => 2,
            ShadingMode::Bump => 3,
        }
    }

    /// Lenient conversion used by loosely typed callers: anything outside
    /// 0..=3 shades as [`ShadingMode::Unlit`].
    pub fn from_ordinal_or_unlit(ordinal: i32) -> Self {
        Self::try_from(ordinal).unwrap_or_else(|UnknownShadingMode(value)| {
            warn!("unknown mapping type {value}, shading unlit");
            ShadingMode::Unlit
        })
    }

    /// Texture-unit table. Unused samplers still get a distinct valid unit
    /// so no sampler is left unbound.
    pub fn sampler_bindings(self) -> SamplerBindings {
        match self {
            ShadingMode::Unlit | ShadingMode::Textured => SamplerBindings::new(0, 1, 2),
            ShadingMode::Environment => SamplerBindings::new(1, 0, 2),
            ShadingMode::Bump => SamplerBindings::new(1, 2, 0),
        }
    }

    /// Whether the per-vertex ambient/directional term feeds the output
    pub fn uses_vertex_lighting(self) -> bool {
        !matches!(self, ShadingMode::Bump)
    }
}

impl fmt::Display for ShadingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShadingMode::Unlit => "unlit",
            ShadingMode::Textured => "textured",
            ShadingMode::Environment => "environment",
            ShadingMode::Bump => "bump",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("mapping type {0} is not one of 0..=3")]
pub struct UnknownShadingMode(pub i32);

impl TryFrom<i32> for ShadingMode {
    type Error = UnknownShadingMode;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShadingMode::Unlit),
            1 => Ok(ShadingMode::Textured),
            2 => Ok(ShadingMode::Environment),
            3 => Ok(ShadingMode::Bump),
            other => Err(UnknownShadingMode(other)),
        }
    }
}
