/// A backend that executes nothing and remembers every call, for headless
/// runs and for checking exactly what a frame pushed.
use std::collections::HashMap;

use super::{GraphicsBackend, ProgramHandle, UniformLocation, UniformValue};
use crate::error::{BackendError, CompileFailure};
use crate::geometry::VertexAttribute;
use crate::shading::ProgramDescriptor;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Compile { label: &'static str, program: ProgramHandle },
    Upload { attribute: VertexAttribute, len: usize },
    UseProgram(ProgramHandle),
    SetUniform { name: String, value: UniformValue },
    Draw { first: usize, count: usize },
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    programs: Vec<ProgramRecord>,
    location_names: Vec<String>,
    attributes: HashMap<VertexAttribute, Vec<f32>>,
    fail_next_compile: Option<BackendError>,
}

#[derive(Debug)]
struct ProgramRecord {
    uniforms: Vec<&'static str>,
    linked: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `compile` fail with `error`
    pub fn fail_next_compile(&mut self, error: BackendError) {
        self.fail_next_compile = Some(error);
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Every value pushed to the uniform called `name`, oldest first
    pub fn uniform_history(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::SetUniform { name: n, value } if n == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn last_uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniform_history(name).pop()
    }

    pub fn uploaded(&self, attribute: VertexAttribute) -> Option<&[f32]> {
        self.attributes.get(&attribute).map(Vec::as_slice)
    }

    pub fn draws(&self) -> Vec<(usize, usize)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Draw { first, count } => Some((*first, *count)),
                _ => None,
            })
            .collect()
    }

    fn program(&self, handle: ProgramHandle) -> Option<&ProgramRecord> {
        self.programs.get(handle.0 as usize)
    }
}

impl GraphicsBackend for RecordingBackend {
    fn compile(&mut self, descriptor: &ProgramDescriptor) -> Result<ProgramHandle, CompileFailure> {
        let program = ProgramHandle(self.programs.len() as u32);
        let failure = self.fail_next_compile.take();
        self.programs.push(ProgramRecord {
            uniforms: descriptor.uniforms.iter().map(|u| u.name()).collect(),
            linked: failure.is_none(),
        });
        self.calls.push(BackendCall::Compile {
            label: descriptor.label,
            program,
        });
        match failure {
            None => Ok(program),
            Some(source) => Err(CompileFailure { program, source }),
        }
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let record = self.program(program)?;
        if !record.linked || !record.uniforms.iter().any(|u| *u == name) {
            return None;
        }
        let location = UniformLocation(self.location_names.len() as u32);
        self.location_names.push(name.to_string());
        Some(location)
    }

    fn upload_attribute(
        &mut self,
        _program: ProgramHandle,
        attribute: VertexAttribute,
        data: &[f32],
    ) -> Result<(), BackendError> {
        self.attributes.insert(attribute, data.to_vec());
        self.calls.push(BackendCall::Upload {
            attribute,
            len: data.len(),
        });
        Ok(())
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), BackendError> {
        self.calls.push(BackendCall::UseProgram(program));
        match self.program(program) {
            Some(record) if record.linked => Ok(()),
            _ => Err(BackendError::InertProgram(program)),
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), BackendError> {
        let name = self
            .location_names
            .get(location.0 as usize)
            .cloned()
            .ok_or_else(|| BackendError::Other(format!("unknown uniform location {}", location.0)))?;
        self.calls.push(BackendCall::SetUniform { name, value });
        Ok(())
    }

    fn draw_triangles(&mut self, first: usize, count: usize) -> Result<(), BackendError> {
        let available = self
            .attributes
            .get(&VertexAttribute::Position)
            .map_or(0, |p| p.len() / 3);
        if first + count > available {
            return Err(BackendError::DrawRange {
                first,
                end: first + count,
                available,
            });
        }
        self.calls.push(BackendCall::Draw { first, count });
        Ok(())
    }
}
