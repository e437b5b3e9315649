/// shade3d web - WebGL2 renderer exported to JavaScript
///
/// The JavaScript side owns the mesh data and calls `draw` once per frame;
/// camera, projection and shading state live here.
use log::{info, warn};
use nalgebra::Matrix4;
use shade3d_core::{ProjectionMode, Renderer, RendererConfig, VertexStreams};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlCanvasElement, WebGl2RenderingContext};

pub mod backend;
pub mod textures;

pub use backend::WebGlBackend;
use textures::TextureSet;

/// Projection by name; anything unrecognised selects perspective
pub fn projection_or_perspective(name: &str) -> ProjectionMode {
    name.parse().unwrap_or_else(|err| {
        warn!("{err}, using perspective");
        ProjectionMode::Perspective
    })
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct WebRenderer {
    renderer: Renderer<WebGlBackend>,
    canvas: HtmlCanvasElement,
    textures: TextureSet,
}

#[wasm_bindgen]
impl WebRenderer {
    /// Attach to the canvas with id `canvas_id`
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<WebRenderer, JsValue> {
        let window = window().ok_or_else(|| JsValue::from_str("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document not available"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str("canvas element not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("element is not a canvas"))?;
        let gl = canvas
            .get_context("webgl2")?
            .ok_or_else(|| JsValue::from_str("WebGL2 not supported"))?
            .dyn_into::<WebGl2RenderingContext>()
            .map_err(|_| JsValue::from_str("context is not WebGL2"))?;

        let config = RendererConfig::default().with_viewport(canvas.width(), canvas.height());
        let backend = WebGlBackend::new(gl);
        backend.set_viewport(canvas.width() as i32, canvas.height() as i32);
        let textures = TextureSet::placeholders(backend.context())?;
        let renderer = Renderer::new(backend, &config).map_err(to_js)?;
        info!("attached to canvas `{canvas_id}`");

        Ok(Self {
            renderer,
            canvas,
            textures,
        })
    }

    #[wasm_bindgen(js_name = moveCameraTo)]
    pub fn move_camera_to(&mut self, distance: f32) {
        self.renderer.move_camera_to(distance);
    }

    /// Set the camera angle in degrees about "x", "y" or "z"
    #[wasm_bindgen(js_name = rotateCamera)]
    pub fn rotate_camera(&mut self, degrees: f32, axis: &str) {
        self.renderer.rotate_camera(degrees, axis);
    }

    /// 0 unlit, 1 textured, 2 environment, 3 bump
    #[wasm_bindgen(js_name = setMappingType)]
    pub fn set_mapping_type(&mut self, mapping_type: i32) {
        self.renderer.set_mapping_type_ordinal(mapping_type);
    }

    /// "perspective", "orthographic" or "oblique"
    #[wasm_bindgen(js_name = setProjection)]
    pub fn set_projection(&mut self, name: &str) -> Result<(), JsValue> {
        self.renderer
            .set_projection(projection_or_perspective(name))
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = setShading)]
    pub fn set_shading(&mut self, enabled: bool) {
        self.renderer.set_shading(enabled);
    }

    /// Follow the canvas after its size changed
    pub fn resize(&mut self) -> Result<(), JsValue> {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        self.renderer
            .backend()
            .set_viewport(width as i32, height as i32);
        self.renderer.resize(width, height).map_err(to_js)
    }

    #[wasm_bindgen(js_name = loadTexture)]
    pub fn load_texture(&mut self, url: &str) -> Result<(), JsValue> {
        let gl = self.renderer.backend().context();
        let texture = textures::load_texture_2d(gl, url)?;
        let replaced = std::mem::replace(&mut self.textures.diffuse, texture);
        gl.delete_texture(Some(&replaced));
        Ok(())
    }

    #[wasm_bindgen(js_name = loadBumpTexture)]
    pub fn load_bump_texture(&mut self, url: &str) -> Result<(), JsValue> {
        let gl = self.renderer.backend().context();
        let texture = textures::load_texture_2d(gl, url)?;
        let replaced = std::mem::replace(&mut self.textures.bump, texture);
        gl.delete_texture(Some(&replaced));
        Ok(())
    }

    /// Six face URLs in +X, -X, +Y, -Y, +Z, -Z order
    #[wasm_bindgen(js_name = loadCubemap)]
    pub fn load_cubemap(&mut self, urls: js_sys::Array) -> Result<(), JsValue> {
        let faces: Vec<String> = urls.iter().filter_map(|url| url.as_string()).collect();
        let faces: [String; 6] = faces
            .try_into()
            .map_err(|faces: Vec<String>| {
                JsValue::from_str(&format!("cubemap needs 6 face URLs, got {}", faces.len()))
            })?;
        let gl = self.renderer.backend().context();
        let texture = textures::load_cube_texture(gl, &faces)?;
        let replaced = std::mem::replace(&mut self.textures.environment, texture);
        gl.delete_texture(Some(&replaced));
        Ok(())
    }

    /// Draw one frame. Every stream holds one entry per vertex; `model` is
    /// 16 floats in column-major order.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        positions: &[f32],
        colors: &[f32],
        normals: &[f32],
        tex_coords: &[f32],
        tangents: &[f32],
        bitangents: &[f32],
        model: &[f32],
    ) -> Result<(), JsValue> {
        if model.len() != 16 {
            return Err(JsValue::from_str("model matrix needs 16 values"));
        }
        let model = Matrix4::from_column_slice(model);
        let streams = VertexStreams {
            positions: positions.to_vec(),
            colors: colors.to_vec(),
            normals: normals.to_vec(),
            tex_coords: tex_coords.to_vec(),
            tangents: tangents.to_vec(),
            bitangents: bitangents.to_vec(),
        };

        let backend = self.renderer.backend();
        backend.clear();
        self.textures
            .bind(backend.context(), self.renderer.sampler_bindings());
        self.renderer.draw(&streams, &model).map_err(to_js)?;
        Ok(())
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_projection_falls_back_to_perspective() {
        assert_eq!(projection_or_perspective("oblique"), ProjectionMode::Oblique);
        assert_eq!(projection_or_perspective("orthographic"), ProjectionMode::Orthographic);
        assert_eq!(projection_or_perspective("isometric"), ProjectionMode::Perspective);
    }
}
