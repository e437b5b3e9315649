/// Graphics backend over a WebGL2 context
use std::collections::HashMap;

use js_sys::Float32Array;
use log::debug;
use shade3d_core::backend::{row_major, GraphicsBackend, ProgramHandle, UniformLocation, UniformValue};
use shade3d_core::error::{BackendError, CompileFailure};
use shade3d_core::{ProgramDescriptor, VertexAttribute};
use web_sys::{WebGl2RenderingContext as Gl, WebGlBuffer, WebGlProgram, WebGlShader, WebGlUniformLocation};

pub struct WebGlBackend {
    gl: Gl,
    /// `None` marks a program that failed to build
    programs: Vec<Option<WebGlProgram>>,
    buffers: HashMap<VertexAttribute, WebGlBuffer>,
    uniforms: Vec<WebGlUniformLocation>,
    uploaded_vertices: usize,
}

impl WebGlBackend {
    pub fn new(gl: Gl) -> Self {
        gl.enable(Gl::DEPTH_TEST);
        Self {
            gl,
            programs: Vec::new(),
            buffers: HashMap::new(),
            uniforms: Vec::new(),
            uploaded_vertices: 0,
        }
    }

    pub fn context(&self) -> &Gl {
        &self.gl
    }

    pub fn clear(&self) {
        self.gl.clear_color(0.0, 0.0, 0.0, 1.0);
        self.gl.clear_depth(1.0);
        self.gl.clear(Gl::COLOR_BUFFER_BIT | Gl::DEPTH_BUFFER_BIT);
    }

    pub fn set_viewport(&self, width: i32, height: i32) {
        self.gl.viewport(0, 0, width, height);
    }

    fn program(&self, handle: ProgramHandle) -> Option<&WebGlProgram> {
        self.programs.get(handle.0 as usize).and_then(Option::as_ref)
    }

    fn build(&self, descriptor: &ProgramDescriptor) -> Result<WebGlProgram, BackendError> {
        let vertex = compile_shader(&self.gl, Gl::VERTEX_SHADER, "vertex", descriptor.vertex_source)?;
        let fragment =
            compile_shader(&self.gl, Gl::FRAGMENT_SHADER, "fragment", descriptor.fragment_source)?;

        let program = self
            .gl
            .create_program()
            .ok_or_else(|| BackendError::Other("unable to create program object".into()))?;
        self.gl.attach_shader(&program, &vertex);
        self.gl.attach_shader(&program, &fragment);
        self.gl.link_program(&program);

        let linked = self
            .gl
            .get_program_parameter(&program, Gl::LINK_STATUS)
            .as_bool()
            .unwrap_or(false);
        if linked {
            Ok(program)
        } else {
            let log = self.gl.get_program_info_log(&program).unwrap_or_default();
            self.gl.delete_program(Some(&program));
            Err(BackendError::ShaderLink { log })
        }
    }
}

fn compile_shader(
    gl: &Gl,
    kind: u32,
    stage: &'static str,
    source: &str,
) -> Result<WebGlShader, BackendError> {
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| BackendError::Other(format!("unable to create {stage} shader")))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    let compiled = gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if compiled {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(BackendError::ShaderCompile { stage, log })
    }
}

impl GraphicsBackend for WebGlBackend {
    fn compile(&mut self, descriptor: &ProgramDescriptor) -> Result<ProgramHandle, CompileFailure> {
        let handle = ProgramHandle(self.programs.len() as u32);
        match self.build(descriptor) {
            Ok(program) => {
                self.programs.push(Some(program));
                Ok(handle)
            }
            Err(source) => {
                self.programs.push(None);
                Err(CompileFailure {
                    program: handle,
                    source,
                })
            }
        }
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let location = self.gl.get_uniform_location(self.program(program)?, name)?;
        self.uniforms.push(location);
        Some(UniformLocation(self.uniforms.len() as u32 - 1))
    }

    fn upload_attribute(
        &mut self,
        program: ProgramHandle,
        attribute: VertexAttribute,
        data: &[f32],
    ) -> Result<(), BackendError> {
        let buffer = match self.buffers.get(&attribute) {
            Some(buffer) => buffer.clone(),
            None => {
                let buffer = self.gl.create_buffer().ok_or_else(|| {
                    BackendError::Other(format!("unable to create `{}` buffer", attribute.name()))
                })?;
                self.buffers.insert(attribute, buffer.clone());
                buffer
            }
        };

        self.gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&buffer));
        let array = Float32Array::from(data);
        self.gl
            .buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &array, Gl::STATIC_DRAW);
        if attribute == VertexAttribute::Position {
            self.uploaded_vertices = data.len() / attribute.components();
        }

        let Some(program) = self.program(program) else {
            return Ok(());
        };
        let location = self.gl.get_attrib_location(program, attribute.name());
        if location < 0 {
            // Unused by the linked program
            debug!("attribute `{}` is inactive", attribute.name());
            return Ok(());
        }
        let location = location as u32;
        self.gl.vertex_attrib_pointer_with_i32(
            location,
            attribute.components() as i32,
            Gl::FLOAT,
            false,
            0,
            0,
        );
        self.gl.enable_vertex_attrib_array(location);
        Ok(())
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), BackendError> {
        let handle = program;
        let program = self
            .program(handle)
            .ok_or(BackendError::InertProgram(handle))?;
        self.gl.use_program(Some(program));
        Ok(())
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), BackendError> {
        let location = self
            .uniforms
            .get(location.0 as usize)
            .ok_or_else(|| BackendError::Other(format!("unknown uniform location {}", location.0)))?;
        match value {
            // Row-major data with transpose set, which WebGL2 accepts
            UniformValue::Mat4(m) => {
                self.gl
                    .uniform_matrix4fv_with_f32_array(Some(location), true, &row_major(&m))
            }
            UniformValue::Vec3(v) => self.gl.uniform3f(Some(location), v.x, v.y, v.z),
            UniformValue::Int(i) => self.gl.uniform1i(Some(location), i),
            UniformValue::Bool(b) => self.gl.uniform1i(Some(location), i32::from(b)),
        }
        Ok(())
    }

    fn draw_triangles(&mut self, first: usize, count: usize) -> Result<(), BackendError> {
        if first + count > self.uploaded_vertices {
            return Err(BackendError::DrawRange {
                first,
                end: first + count,
                available: self.uploaded_vertices,
            });
        }
        self.gl
            .draw_arrays(Gl::TRIANGLES, first as i32, count as i32);
        Ok(())
    }
}
