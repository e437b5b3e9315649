/// CPU-side texture containers and the placeholder-then-swap loading slot
use std::sync::Arc;

use log::{debug, warn};
use nalgebra::{Vector2, Vector3, Vector4};
use parking_lot::Mutex;

use crate::error::TextureError;

/// Texel bound until a real image arrives: opaque blue
pub const PLACEHOLDER_TEXEL: [u8; 4] = [0, 0, 255, 255];

/// An RGBA8 image stored top row first
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2d {
    width: u32,
    height: u32,
    texels: Vec<[u8; 4]>,
}

impl Texture2d {
    pub fn new(width: u32, height: u32, texels: Vec<[u8; 4]>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty);
        }
        if texels.len() != width as usize * height as usize {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                actual: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Build from tightly packed RGBA bytes
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, TextureError> {
        if bytes.len() % 4 != 0 {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                actual: bytes.len() / 4,
            });
        }
        let texels = bytes
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        Self::new(width, height, texels)
    }

    pub fn solid(texel: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![texel],
        }
    }

    pub fn placeholder() -> Self {
        Self::solid(PLACEHOLDER_TEXEL)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        self.texels[(y * self.width + x) as usize]
    }

    /// Nearest-neighbour lookup with repeat wrapping. `v = 0` is the bottom
    /// row, as with images uploaded flipped.
    pub fn sample(&self, uv: &Vector2<f32>) -> Vector4<f32> {
        let x = wrap(uv.x, self.width);
        let y = self.height - 1 - wrap(uv.y, self.height);
        to_color(self.texel(x, y))
    }

    /// Lookup without the vertical flip, used for cube faces
    fn sample_unflipped(&self, s: f32, t: f32) -> Vector4<f32> {
        let x = clamp(s, self.width);
        let y = clamp(t, self.height);
        to_color(self.texel(x, y))
    }
}

/// Cube face order: +X, -X, +Y, -Y, +Z, -Z
#[derive(Debug, Clone, PartialEq)]
pub struct CubeTexture {
    faces: [Texture2d; 6],
}

impl CubeTexture {
    pub fn new(faces: [Texture2d; 6]) -> Self {
        Self { faces }
    }

    pub fn solid(texel: [u8; 4]) -> Self {
        Self::new(std::array::from_fn(|_| Texture2d::solid(texel)))
    }

    pub fn placeholder() -> Self {
        Self::solid(PLACEHOLDER_TEXEL)
    }

    pub fn face(&self, index: usize) -> &Texture2d {
        &self.faces[index]
    }

    /// Sample along a direction using the usual major-axis face selection
    pub fn sample(&self, direction: &Vector3<f32>) -> Vector4<f32> {
        let (x, y, z) = (direction.x, direction.y, direction.z);
        let (ax, ay, az) = (x.abs(), y.abs(), z.abs());
        if ax == 0.0 && ay == 0.0 && az == 0.0 {
            return Vector4::zeros();
        }

        let (face, sc, tc, ma) = if ax >= ay && ax >= az {
            if x > 0.0 {
                (0, -z, -y, ax)
            } else {
                (1, z, -y, ax)
            }
        } else if ay >= az {
            if y > 0.0 {
                (2, x, z, ay)
            } else {
                (3, x, -z, ay)
            }
        } else if z > 0.0 {
            (4, x, -y, az)
        } else {
            (5, -x, -y, az)
        };

        let s = 0.5 * (sc / ma + 1.0);
        let t = 0.5 * (tc / ma + 1.0);
        self.faces[face].sample_unflipped(s, t)
    }
}

fn wrap(coord: f32, size: u32) -> u32 {
    let scaled = (coord.rem_euclid(1.0) * size as f32).floor() as u32;
    scaled.min(size - 1)
}

fn clamp(coord: f32, size: u32) -> u32 {
    let scaled = (coord.clamp(0.0, 1.0) * size as f32).floor() as u32;
    scaled.min(size - 1)
}

fn to_color(texel: [u8; 4]) -> Vector4<f32> {
    Vector4::new(
        texel[0] as f32 / 255.0,
        texel[1] as f32 / 255.0,
        texel[2] as f32 / 255.0,
        texel[3] as f32 / 255.0,
    )
}

type Delivery<T> = Arc<Mutex<Option<Result<T, TextureError>>>>;

/// Texture contents that start as a placeholder and are replaced in place
/// once an asynchronous load delivers.
///
/// The slot is owned by whoever draws. Loaders hold a [`TextureDelivery`]
/// and may finish on any thread; [`TextureSlot::refresh`] picks the result
/// up without blocking.
#[derive(Debug)]
pub struct TextureSlot<T> {
    label: String,
    current: T,
    pending: Delivery<T>,
    loaded: bool,
}

/// Single-use handle a loader completes
#[derive(Debug)]
pub struct TextureDelivery<T> {
    pending: Delivery<T>,
}

impl<T> TextureSlot<T> {
    pub fn new(label: impl Into<String>, placeholder: T) -> (Self, TextureDelivery<T>) {
        let pending = Arc::new(Mutex::new(None));
        let slot = Self {
            label: label.into(),
            current: placeholder,
            pending: Arc::clone(&pending),
            loaded: false,
        };
        (slot, TextureDelivery { pending })
    }

    /// A slot that already holds its final contents
    pub fn ready(label: impl Into<String>, texture: T) -> Self {
        Self {
            label: label.into(),
            current: texture,
            pending: Arc::new(Mutex::new(None)),
            loaded: true,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Swap in a delivered texture. Returns true when the contents changed.
    /// A failed load is logged and the placeholder stays bound.
    pub fn refresh(&mut self) -> bool {
        let Some(result) = self.pending.lock().take() else {
            return false;
        };
        match result {
            Ok(texture) => {
                debug!("texture `{}` loaded", self.label);
                self.current = texture;
                self.loaded = true;
                true
            }
            Err(err) => {
                warn!("texture `{}` keeps its fallback: {err}", self.label);
                false
            }
        }
    }
}

impl<T> TextureDelivery<T> {
    pub fn complete(self, texture: T) {
        *self.pending.lock() = Some(Ok(texture));
    }

    pub fn fail(self, error: TextureError) {
        *self.pending.lock() = Some(Err(error));
    }
}
