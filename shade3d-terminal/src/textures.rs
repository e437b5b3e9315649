/// Demo textures: procedural stand-ins plus image files decoded off the
/// render thread.
use std::path::{Path, PathBuf};
use std::thread;

use log::{error, info};
use shade3d_core::error::TextureError;
use shade3d_core::texture::PLACEHOLDER_TEXEL;
use shade3d_core::{CubeTexture, Texture2d, TextureDelivery, TextureSlot};

/// Cube face file names, in +X, -X, +Y, -Y, +Z, -Z order
pub const CUBE_FACE_FILES: [&str; 6] = [
    "posx.png", "negx.png", "posy.png", "negy.png", "posz.png", "negz.png",
];

/// Two-tone checkerboard, `cells` squares per side
pub fn checkerboard(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Texture2d {
    let cell = (size / cells.max(1)).max(1);
    let texels = (0..size * size)
        .map(|i| {
            let (x, y) = (i % size, i / size);
            if (x / cell + y / cell) % 2 == 0 {
                a
            } else {
                b
            }
        })
        .collect();
    Texture2d::new(size, size, texels).unwrap_or_else(|_| Texture2d::solid(a))
}

/// Packed normal map of raised square tiles; flat areas decode to +Z
pub fn tile_normal_map(size: u32, tiles: u32) -> Texture2d {
    let tile = (size / tiles.max(1)).max(4);
    let bevel = (tile / 6).max(1);
    let flat = [128, 128, 255, 255];
    let texels = (0..size * size)
        .map(|i| {
            let (x, y) = (i % size % tile, i / size % tile);
            if x < bevel {
                [40, 128, 200, 255]
            } else if x >= tile - bevel {
                [215, 128, 200, 255]
            } else if y < bevel {
                [128, 215, 200, 255]
            } else if y >= tile - bevel {
                [128, 40, 200, 255]
            } else {
                flat
            }
        })
        .collect();
    Texture2d::new(size, size, texels).unwrap_or_else(|_| Texture2d::solid(flat))
}

/// Sky-like cubemap: each face a solid tint, brighter towards +Y
pub fn gradient_cube() -> CubeTexture {
    let tints = [
        [200, 120, 90, 255],
        [90, 120, 200, 255],
        [235, 235, 255, 255],
        [60, 50, 40, 255],
        [140, 200, 140, 255],
        [200, 180, 120, 255],
    ];
    CubeTexture::new(tints.map(Texture2d::solid))
}

fn placeholder_cube() -> CubeTexture {
    CubeTexture::solid(PLACEHOLDER_TEXEL)
}

/// Decode an image file to RGBA8
pub fn decode_image(path: &Path) -> Result<Texture2d, TextureError> {
    let image = image::open(path)
        .map_err(|err| TextureError::Load(format!("{}: {err}", path.display())))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Texture2d::from_rgba8(width, height, rgba.as_raw())
}

fn spawn_loader<T, F>(label: &str, delivery: TextureDelivery<T>, load: F)
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TextureError> + Send + 'static,
{
    let thread_label = label.to_string();
    let spawned = thread::Builder::new()
        .name(format!("texture-{label}"))
        .spawn(move || match load() {
            Ok(texture) => {
                info!("loaded texture `{thread_label}`");
                delivery.complete(texture);
            }
            Err(err) => delivery.fail(err),
        });
    if let Err(err) = spawned {
        error!("could not start loader for `{label}`: {err}");
    }
}

/// A slot that shows the placeholder now and the decoded image once ready
pub fn load_texture_2d(label: &str, path: PathBuf) -> TextureSlot<Texture2d> {
    let (slot, delivery) = TextureSlot::new(label, Texture2d::placeholder());
    spawn_loader(label, delivery, move || decode_image(&path));
    slot
}

/// Six face images from `dir`, named as in [`CUBE_FACE_FILES`]
pub fn load_cube_texture(label: &str, dir: PathBuf) -> TextureSlot<CubeTexture> {
    let (slot, delivery) = TextureSlot::new(label, placeholder_cube());
    spawn_loader(label, delivery, move || {
        let mut faces = Vec::with_capacity(6);
        for name in CUBE_FACE_FILES {
            faces.push(decode_image(&dir.join(name))?);
        }
        let faces: [Texture2d; 6] = faces
            .try_into()
            .map_err(|_| TextureError::Load(format!("{}: incomplete cube", dir.display())))?;
        Ok(CubeTexture::new(faces))
    });
    slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;
    use std::time::{Duration, Instant};

    #[test]
    fn test_checkerboard_alternates() {
        let texture = checkerboard(8, 2, [255; 4], [0, 0, 0, 255]);
        assert_eq!(texture.texel(0, 0), [255; 4]);
        assert_eq!(texture.texel(4, 0), [0, 0, 0, 255]);
        assert_eq!(texture.texel(4, 4), [255; 4]);
    }

    #[test]
    fn test_normal_map_center_points_out() {
        let texture = tile_normal_map(32, 2);
        let texel = texture.sample(&Vector2::new(0.25, 0.25));
        assert!(texel.z > 0.99);
        assert!((texel.x - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_keeps_placeholder() {
        let mut slot = load_texture_2d("missing", PathBuf::from("/nonexistent/shade3d.png"));
        assert_eq!(slot.current(), &Texture2d::placeholder());

        let deadline = Instant::now() + Duration::from_millis(500);
        while Instant::now() < deadline {
            slot.refresh();
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!slot.is_loaded());
        assert_eq!(slot.current(), &Texture2d::placeholder());
    }
}
