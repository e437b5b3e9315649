/// Image-backed WebGL textures. Each texture is usable at once with a 1x1
/// placeholder and is filled in when the browser finishes loading.
use std::cell::RefCell;
use std::rc::Rc;

use log::{info, warn};
use shade3d_core::texture::PLACEHOLDER_TEXEL;
use shade3d_core::SamplerBindings;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlImageElement, WebGl2RenderingContext as Gl, WebGlTexture};

/// Cube face targets, in the order face URLs are given
const CUBE_FACES: [u32; 6] = [
    Gl::TEXTURE_CUBE_MAP_POSITIVE_X,
    Gl::TEXTURE_CUBE_MAP_NEGATIVE_X,
    Gl::TEXTURE_CUBE_MAP_POSITIVE_Y,
    Gl::TEXTURE_CUBE_MAP_NEGATIVE_Y,
    Gl::TEXTURE_CUBE_MAP_POSITIVE_Z,
    Gl::TEXTURE_CUBE_MAP_NEGATIVE_Z,
];

fn is_power_of_two(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}

/// Collects the six faces of a cubemap as they arrive. The set is handed
/// out once, when the last face lands, and never after any face failed.
#[derive(Debug)]
pub struct CubeFaces<T> {
    faces: [Option<T>; 6],
    failed: bool,
}

impl<T> Default for CubeFaces<T> {
    fn default() -> Self {
        Self {
            faces: std::array::from_fn(|_| None),
            failed: false,
        }
    }
}

impl<T> CubeFaces<T> {
    /// Record face `index`; returns all six when this completes the set
    pub fn arrive(&mut self, index: usize, face: T) -> Option<[T; 6]> {
        if self.failed || index >= self.faces.len() {
            return None;
        }
        self.faces[index] = Some(face);
        if self.faces.iter().any(Option::is_none) {
            return None;
        }
        let [px, nx, py, ny, pz, nz] = std::mem::replace(&mut self.faces, std::array::from_fn(|_| None));
        Some([px?, nx?, py?, ny?, pz?, nz?])
    }

    /// Give up on the set; faces arriving later are dropped
    pub fn fail(&mut self) {
        self.failed = true;
        self.faces = std::array::from_fn(|_| None);
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }
}

/// Edge length shared by six square faces, `None` if any face differs
pub fn uniform_square(sizes: &[(u32, u32); 6]) -> Option<u32> {
    let (edge, _) = sizes[0];
    let uniform = edge > 0 && sizes.iter().all(|&(w, h)| w == edge && h == edge);
    uniform.then_some(edge)
}

fn upload_placeholder(gl: &Gl, target: u32) -> Result<(), JsValue> {
    gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
        target,
        0,
        Gl::RGBA as i32,
        1,
        1,
        0,
        Gl::RGBA,
        Gl::UNSIGNED_BYTE,
        Some(&PLACEHOLDER_TEXEL[..]),
    )
}

/// A 2D texture holding only the placeholder texel
pub fn placeholder_texture_2d(gl: &Gl) -> Result<WebGlTexture, JsValue> {
    let texture = gl
        .create_texture()
        .ok_or_else(|| JsValue::from_str("unable to create texture"))?;
    gl.bind_texture(Gl::TEXTURE_2D, Some(&texture));
    upload_placeholder(gl, Gl::TEXTURE_2D)?;
    Ok(texture)
}

/// A cubemap whose six faces hold the placeholder texel
pub fn placeholder_cube_texture(gl: &Gl) -> Result<WebGlTexture, JsValue> {
    let texture = gl
        .create_texture()
        .ok_or_else(|| JsValue::from_str("unable to create cube texture"))?;
    gl.bind_texture(Gl::TEXTURE_CUBE_MAP, Some(&texture));
    for face in CUBE_FACES {
        upload_placeholder(gl, face)?;
    }
    gl.tex_parameteri(Gl::TEXTURE_CUBE_MAP, Gl::TEXTURE_MIN_FILTER, Gl::LINEAR as i32);
    gl.tex_parameteri(Gl::TEXTURE_CUBE_MAP, Gl::TEXTURE_WRAP_S, Gl::CLAMP_TO_EDGE as i32);
    gl.tex_parameteri(Gl::TEXTURE_CUBE_MAP, Gl::TEXTURE_WRAP_T, Gl::CLAMP_TO_EDGE as i32);
    Ok(texture)
}

/// Start fetching `url`; exactly one of `on_load` and `on_error` runs
fn fetch_image(
    url: &str,
    on_load: impl FnOnce(&HtmlImageElement) + 'static,
    on_error: impl FnOnce() + 'static,
) -> Result<(), JsValue> {
    let image = HtmlImageElement::new()?;
    image.set_cross_origin(Some("anonymous"));

    let loaded = image.clone();
    let onload = Closure::once(move || on_load(&loaded));
    image.set_onload(Some(onload.as_ref().unchecked_ref()));
    onload.forget();

    let onerror = Closure::once(on_error);
    image.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    image.set_src(url);
    Ok(())
}

/// A 2D texture filled from `url` once it loads. Rows are flipped so that
/// v = 0 is the bottom of the image.
pub fn load_texture_2d(gl: &Gl, url: &str) -> Result<WebGlTexture, JsValue> {
    let texture = placeholder_texture_2d(gl)?;

    let context = gl.clone();
    let target = texture.clone();
    let source = url.to_string();
    let failed_url = url.to_string();
    fetch_image(
        url,
        move |image| {
            context.bind_texture(Gl::TEXTURE_2D, Some(&target));
            context.pixel_storei(Gl::UNPACK_FLIP_Y_WEBGL, 1);
            let uploaded = context.tex_image_2d_with_u32_and_u32_and_html_image_element(
                Gl::TEXTURE_2D,
                0,
                Gl::RGBA as i32,
                Gl::RGBA,
                Gl::UNSIGNED_BYTE,
                image,
            );
            context.pixel_storei(Gl::UNPACK_FLIP_Y_WEBGL, 0);
            if let Err(err) = uploaded {
                warn!("texture {source} could not be uploaded: {err:?}");
                return;
            }

            if is_power_of_two(image.width()) && is_power_of_two(image.height()) {
                context.generate_mipmap(Gl::TEXTURE_2D);
            } else {
                context.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_S, Gl::CLAMP_TO_EDGE as i32);
                context.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_T, Gl::CLAMP_TO_EDGE as i32);
                context.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, Gl::LINEAR as i32);
            }
            info!("texture {source} loaded");
        },
        move || warn!("texture {failed_url} failed to load, keeping placeholder"),
    )?;
    Ok(texture)
}

/// Write all six faces, or restore the placeholder if any upload fails
fn upload_cube_faces(gl: &Gl, texture: &WebGlTexture, images: &[HtmlImageElement; 6]) {
    let sizes = std::array::from_fn(|i| (images[i].width(), images[i].height()));
    let Some(edge) = uniform_square(&sizes) else {
        warn!("cube faces are not equal squares {sizes:?}, keeping placeholder");
        return;
    };

    gl.bind_texture(Gl::TEXTURE_CUBE_MAP, Some(texture));
    for (face, image) in CUBE_FACES.into_iter().zip(images) {
        let uploaded = gl.tex_image_2d_with_u32_and_u32_and_html_image_element(
            face,
            0,
            Gl::RGBA as i32,
            Gl::RGBA,
            Gl::UNSIGNED_BYTE,
            image,
        );
        if let Err(err) = uploaded {
            warn!("cube face could not be uploaded: {err:?}, restoring placeholder");
            for face in CUBE_FACES {
                if let Err(err) = upload_placeholder(gl, face) {
                    warn!("placeholder face upload failed: {err:?}");
                }
            }
            return;
        }
    }
    info!("cubemap loaded, {edge}x{edge} per face");
}

/// A cubemap filled from six URLs in +X, -X, +Y, -Y, +Z, -Z order. The
/// faces are swapped in together once all six have loaded; if any fails
/// the placeholder stays. Faces are not flipped.
pub fn load_cube_texture(gl: &Gl, urls: &[String; 6]) -> Result<WebGlTexture, JsValue> {
    let texture = placeholder_cube_texture(gl)?;
    let pending = Rc::new(RefCell::new(CubeFaces::<HtmlImageElement>::default()));

    for (index, url) in urls.iter().enumerate() {
        let context = gl.clone();
        let target = texture.clone();
        let arrived = Rc::clone(&pending);
        let failed = Rc::clone(&pending);
        let failed_url = url.clone();
        fetch_image(
            url,
            move |image| {
                let complete = arrived.borrow_mut().arrive(index, image.clone());
                if let Some(images) = complete {
                    upload_cube_faces(&context, &target, &images);
                }
            },
            move || {
                let mut faces = failed.borrow_mut();
                if !faces.has_failed() {
                    warn!("cube face {failed_url} failed to load, keeping placeholder");
                }
                faces.fail();
            },
        )?;
    }

    Ok(texture)
}

/// Textures for the three samplers. Each starts as a placeholder, so every
/// unit a mode reads always has something bound.
pub struct TextureSet {
    pub diffuse: WebGlTexture,
    pub environment: WebGlTexture,
    pub bump: WebGlTexture,
}

impl TextureSet {
    pub fn placeholders(gl: &Gl) -> Result<Self, JsValue> {
        Ok(Self {
            diffuse: placeholder_texture_2d(gl)?,
            environment: placeholder_cube_texture(gl)?,
            bump: placeholder_texture_2d(gl)?,
        })
    }

    /// Bind every texture to the unit its sampler reads under `units`
    pub fn bind(&self, gl: &Gl, units: SamplerBindings) {
        gl.active_texture(Gl::TEXTURE0 + units.diffuse);
        gl.bind_texture(Gl::TEXTURE_2D, Some(&self.diffuse));
        gl.active_texture(Gl::TEXTURE0 + units.cubemap);
        gl.bind_texture(Gl::TEXTURE_CUBE_MAP, Some(&self.environment));
        gl.active_texture(Gl::TEXTURE0 + units.bump);
        gl.bind_texture(Gl::TEXTURE_2D, Some(&self.bump));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_of_two() {
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(256));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(300));
    }

    #[test]
    fn test_cube_faces_complete_only_with_all_six() {
        let mut faces = CubeFaces::default();
        for index in [3, 0, 5, 1, 4] {
            assert!(faces.arrive(index, index * 10).is_none());
        }
        assert_eq!(faces.arrive(2, 20), Some([0, 10, 20, 30, 40, 50]));
    }

    #[test]
    fn test_cube_faces_repeated_face_does_not_complete() {
        let mut faces = CubeFaces::default();
        for _ in 0..6 {
            assert!(faces.arrive(0, 'a').is_none());
        }
    }

    #[test]
    fn test_any_failed_face_keeps_placeholder() {
        let mut faces = CubeFaces::default();
        for index in 0..3 {
            assert!(faces.arrive(index, index).is_none());
        }
        faces.fail();
        assert!(faces.has_failed());
        for index in 3..6 {
            assert!(faces.arrive(index, index).is_none());
        }
        // Late arrivals of the early faces change nothing either
        assert!(faces.arrive(0, 0).is_none());
    }

    #[test]
    fn test_uniform_square() {
        assert_eq!(uniform_square(&[(512, 512); 6]), Some(512));
        let mut sizes = [(512, 512); 6];
        sizes[4] = (1, 1);
        assert_eq!(uniform_square(&sizes), None);
        assert_eq!(uniform_square(&[(512, 256); 6]), None);
        assert_eq!(uniform_square(&[(0, 0); 6]), None);
    }
}
