//! GPU layout of the point-light uniform block and the offset table used to
//! write into it.
//!
//! The block mirrors `Lights` in `scene.wgsl`. Instead of looking up fields by
//! name every frame, [`LightUniformSlots`] resolves the byte offset of every
//! `(light, field)` pair once, when the shaded program is linked.

use std::mem::{offset_of, size_of};

use crate::config::{self, LIGHT_COUNT};

use super::point_light::PointLight;

/// One light as laid out in the uniform block (80 bytes, 16-byte aligned).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuPointLight {
    pub position: [f32; 3],
    pub linear: f32,
    pub ambient: [f32; 3],
    pub quadratic: f32,
    pub diffuse: [f32; 3],
    _pad0: f32,
    pub specular: [f32; 3],
    _pad1: f32,
    pub color: [f32; 3],
    _pad2: f32,
}

/// The whole lights block.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsBlock {
    pub lights: [GpuPointLight; LIGHT_COUNT],
    pub shadow_far: f32,
    pub shininess: f32,
    _pad: [f32; 2],
}

/// Fields of a light that the shaded program reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightField {
    Position,
    Ambient,
    Diffuse,
    Specular,
    Linear,
    Quadratic,
    Color,
}

impl LightField {
    pub const ALL: [LightField; 7] = [
        LightField::Position,
        LightField::Ambient,
        LightField::Diffuse,
        LightField::Specular,
        LightField::Linear,
        LightField::Quadratic,
        LightField::Color,
    ];

    fn slot(self) -> usize {
        self as usize
    }

    fn offset_in_light(self) -> usize {
        match self {
            LightField::Position => offset_of!(GpuPointLight, position),
            LightField::Ambient => offset_of!(GpuPointLight, ambient),
            LightField::Diffuse => offset_of!(GpuPointLight, diffuse),
            LightField::Specular => offset_of!(GpuPointLight, specular),
            LightField::Linear => offset_of!(GpuPointLight, linear),
            LightField::Quadratic => offset_of!(GpuPointLight, quadratic),
            LightField::Color => offset_of!(GpuPointLight, color),
        }
    }
}

/// Value written into a light field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightValue {
    Vec3([f32; 3]),
    Scalar(f32),
}

impl LightValue {
    fn bytes(&self) -> &[u8] {
        match self {
            LightValue::Vec3(v) => bytemuck::cast_slice(v),
            LightValue::Scalar(s) => bytemuck::bytes_of(s),
        }
    }
}

/// Byte offsets of every `(light, field)` pair inside [`LightsBlock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightUniformSlots {
    offsets: [[u64; LightField::ALL.len()]; LIGHT_COUNT],
    shadow_far: u64,
    shininess: u64,
}

impl LightUniformSlots {
    pub fn new() -> Self {
        let mut offsets = [[0u64; LightField::ALL.len()]; LIGHT_COUNT];
        for (light, row) in offsets.iter_mut().enumerate() {
            let base = offset_of!(LightsBlock, lights) + light * size_of::<GpuPointLight>();
            for field in LightField::ALL {
                row[field.slot()] = (base + field.offset_in_light()) as u64;
            }
        }
        Self {
            offsets,
            shadow_far: offset_of!(LightsBlock, shadow_far) as u64,
            shininess: offset_of!(LightsBlock, shininess) as u64,
        }
    }

    pub fn offset(&self, light: usize, field: LightField) -> u64 {
        self.offsets[light][field.slot()]
    }

    pub fn shadow_far_offset(&self) -> u64 {
        self.shadow_far
    }

    pub fn shininess_offset(&self) -> u64 {
        self.shininess
    }

    /// Every field write needed to describe `light` at `index`.
    pub fn light_writes(&self, index: usize, light: &PointLight) -> Vec<(u64, LightValue)> {
        let position: [f32; 3] = light.position().into();
        let color: [f32; 3] = light.color().into();
        vec![
            (self.offset(index, LightField::Position), LightValue::Vec3(position)),
            (
                self.offset(index, LightField::Ambient),
                LightValue::Vec3([config::LIGHT_AMBIENT; 3]),
            ),
            (
                self.offset(index, LightField::Diffuse),
                LightValue::Vec3([config::LIGHT_DIFFUSE; 3]),
            ),
            (
                self.offset(index, LightField::Specular),
                LightValue::Vec3([config::LIGHT_SPECULAR; 3]),
            ),
            (
                self.offset(index, LightField::Linear),
                LightValue::Scalar(config::LIGHT_LINEAR),
            ),
            (
                self.offset(index, LightField::Quadratic),
                LightValue::Scalar(config::LIGHT_QUADRATIC),
            ),
            (self.offset(index, LightField::Color), LightValue::Vec3(color)),
        ]
    }

    /// Writes every light, the shadow far plane and the material shininess.
    pub fn upload(
        &self,
        queue: &wgpu::Queue,
        buffer: &wgpu::Buffer,
        lights: &[PointLight],
        shadow_far: f32,
    ) {
        for (index, light) in lights.iter().enumerate().take(LIGHT_COUNT) {
            for (offset, value) in self.light_writes(index, light) {
                queue.write_buffer(buffer, offset, value.bytes());
            }
        }
        queue.write_buffer(buffer, self.shadow_far, bytemuck::bytes_of(&shadow_far));
        queue.write_buffer(
            buffer,
            self.shininess,
            bytemuck::bytes_of(&config::MATERIAL_SHININESS),
        );
    }

    /// Applies a field write to a CPU copy of the block.
    pub fn apply(&self, block: &mut LightsBlock, offset: u64, value: LightValue) {
        let bytes = bytemuck::bytes_of_mut(block);
        let start = offset as usize;
        let src = value.bytes();
        bytes[start..start + src.len()].copy_from_slice(src);
    }
}

impl Default for LightUniformSlots {
    fn default() -> Self {
        Self::new()
    }
}
