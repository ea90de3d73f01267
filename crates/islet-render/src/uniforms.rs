//! Named uniform blocks over a single wgpu uniform buffer.
//!
//! Fragment shader variants share uniform names but not uniform sets, so the
//! block resolves names to byte offsets lazily and memoizes the result.
//! Asking for a name the layout does not carry is a reportable
//! [`UniformError`], never a panic: the caller logs it and keeps rendering.

use std::collections::HashMap;

use thiserror::Error;

/// Errors from uniform name resolution and writes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UniformError {
    /// The requested name does not exist in this layout.
    #[error("uniform '{name}' not found in block '{block}'")]
    UnknownUniform { name: String, block: String },

    /// The name exists but with a different type.
    #[error("uniform '{name}' is {actual:?}, written as {requested:?}")]
    TypeMismatch {
        name: String,
        actual: UniformKind,
        requested: UniformKind,
    },
}

/// Scalar/vector kinds supported by the simulation shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    F32,
    I32,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    /// WGSL alignment of the kind in a uniform address space struct.
    fn align(self) -> usize {
        match self {
            UniformKind::F32 | UniformKind::I32 => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 | UniformKind::Vec4 => 16,
        }
    }

    fn size(self) -> usize {
        match self {
            UniformKind::F32 | UniformKind::I32 => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
        }
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    kind: UniformKind,
    offset: usize,
}

/// Declarative layout of one WGSL uniform struct, field order matching the
/// shader source.
#[derive(Debug, Clone)]
pub struct UniformLayout {
    label: String,
    fields: Vec<Field>,
    size: usize,
}

impl UniformLayout {
    /// Start a layout for the uniform struct named `label` in the shaders.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fields: Vec::new(),
            size: 0,
        }
    }

    /// Append a field, computing its WGSL-conformant offset.
    pub fn with(mut self, name: impl Into<String>, kind: UniformKind) -> Self {
        let offset = self.size.next_multiple_of(kind.align());
        self.fields.push(Field {
            name: name.into(),
            kind,
            offset,
        });
        self.size = offset + kind.size();
        self
    }

    /// Total buffer size, padded to the 16-byte uniform stride.
    pub fn size(&self) -> usize {
        self.size.next_multiple_of(16)
    }
}

/// A CPU staging block plus its GPU uniform buffer.
///
/// Writes land in staging and are flushed once per frame with
/// [`upload`](Self::upload); resolved name offsets are memoized on first use
/// (locations are stable for the block's lifetime).
pub struct UniformBlock {
    layout: UniformLayout,
    resolved: HashMap<String, (usize, UniformKind)>,
    staging: Vec<u8>,
    buffer: wgpu::Buffer,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(device: &wgpu::Device, layout: UniformLayout) -> Self {
        let size = layout.size();
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&layout.label),
            size: size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            layout,
            resolved: HashMap::new(),
            staging: vec![0u8; size],
            buffer,
            dirty: true,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Resolve a name to (offset, kind), memoizing the lookup.
    fn resolve(&mut self, name: &str, requested: UniformKind) -> Result<usize, UniformError> {
        let (offset, kind) = match self.resolved.get(name) {
            Some(&entry) => entry,
            None => {
                let field = self
                    .layout
                    .fields
                    .iter()
                    .find(|f| f.name == name)
                    .ok_or_else(|| UniformError::UnknownUniform {
                        name: name.to_string(),
                        block: self.layout.label.clone(),
                    })?;
                let entry = (field.offset, field.kind);
                self.resolved.insert(name.to_string(), entry);
                entry
            }
        };

        if kind != requested {
            return Err(UniformError::TypeMismatch {
                name: name.to_string(),
                actual: kind,
                requested,
            });
        }
        Ok(offset)
    }

    fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.staging[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
    }

    pub fn set_f32(&mut self, name: &str, value: f32) -> Result<(), UniformError> {
        let offset = self.resolve(name, UniformKind::F32)?;
        self.write_bytes(offset, &value.to_le_bytes());
        Ok(())
    }

    pub fn set_i32(&mut self, name: &str, value: i32) -> Result<(), UniformError> {
        let offset = self.resolve(name, UniformKind::I32)?;
        self.write_bytes(offset, &value.to_le_bytes());
        Ok(())
    }

    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) -> Result<(), UniformError> {
        let offset = self.resolve(name, UniformKind::Vec2)?;
        self.write_bytes(offset, bytemuck::cast_slice(&value));
        Ok(())
    }

    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) -> Result<(), UniformError> {
        let offset = self.resolve(name, UniformKind::Vec3)?;
        self.write_bytes(offset, bytemuck::cast_slice(&value));
        Ok(())
    }

    pub fn set_vec4(&mut self, name: &str, value: [f32; 4]) -> Result<(), UniformError> {
        let offset = self.resolve(name, UniformKind::Vec4)?;
        self.write_bytes(offset, bytemuck::cast_slice(&value));
        Ok(())
    }

    /// Flush staged writes to the GPU buffer if anything changed.
    pub fn upload(&mut self, queue: &wgpu::Queue) {
        if self.dirty {
            queue.write_buffer(&self.buffer, 0, &self.staging);
            self.dirty = false;
        }
    }
}
