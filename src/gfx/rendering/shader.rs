//! WGSL shader loading.
//!
//! Sources are either compiled into the binary or read from the asset
//! directory at startup. Every source is parsed and validated with naga
//! before it reaches the device, so a broken shader fails with a readable
//! diagnostic instead of a device-lost later on.

use std::{
    borrow::Cow,
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::error::ShaderError;

/// A WGSL file shipped inside the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedShader {
    pub file_name: &'static str,
    pub source: &'static str,
}

pub const DEPTH_SHADER: EmbeddedShader = EmbeddedShader {
    file_name: "depth.wgsl",
    source: include_str!("shaders/depth.wgsl"),
};

pub const SCENE_SHADER: EmbeddedShader = EmbeddedShader {
    file_name: "scene.wgsl",
    source: include_str!("shaders/scene.wgsl"),
};

pub const LIGHT_MARKER_SHADER: EmbeddedShader = EmbeddedShader {
    file_name: "light_marker.wgsl",
    source: include_str!("shaders/light_marker.wgsl"),
};

pub const UI_SHADER: EmbeddedShader = EmbeddedShader {
    file_name: "ui.wgsl",
    source: include_str!("shaders/ui.wgsl"),
};

pub const SKYBOX_SHADER: EmbeddedShader = EmbeddedShader {
    file_name: "skybox.wgsl",
    source: include_str!("shaders/skybox.wgsl"),
};

pub const ALL_SHADERS: [EmbeddedShader; 5] = [
    DEPTH_SHADER,
    SCENE_SHADER,
    LIGHT_MARKER_SHADER,
    UI_SHADER,
    SKYBOX_SHADER,
];

/// Where a shader's WGSL text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    Embedded(EmbeddedShader),
    File(PathBuf),
}

impl ShaderSource {
    /// The embedded copy of `shader`, or the file of the same name in
    /// `shader_dir` when one is given.
    pub fn resolve(shader: EmbeddedShader, shader_dir: Option<&Path>) -> Self {
        match shader_dir {
            Some(dir) => ShaderSource::File(dir.join(shader.file_name)),
            None => ShaderSource::Embedded(shader),
        }
    }

    pub fn name(&self) -> String {
        match self {
            ShaderSource::Embedded(shader) => shader.file_name.to_string(),
            ShaderSource::File(path) => path.display().to_string(),
        }
    }

    pub fn read(&self) -> Result<Cow<'static, str>, ShaderError> {
        match self {
            ShaderSource::Embedded(shader) => Ok(Cow::Borrowed(shader.source)),
            ShaderSource::File(path) => fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| ShaderError::Read {
                    path: path.clone(),
                    source,
                }),
        }
    }
}

/// Pipeline stage a [`Shader`] is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    fn from_naga(stage: naga::ShaderStage) -> Option<Self> {
        match stage {
            naga::ShaderStage::Vertex => Some(ShaderStage::Vertex),
            naga::ShaderStage::Fragment => Some(ShaderStage::Fragment),
            _ => None,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of parsing and validating WGSL text, before any GPU object exists.
#[derive(Debug, Clone)]
pub struct ParsedShader {
    name: String,
    entry_points: Vec<(ShaderStage, String)>,
    globals: Vec<(ShaderStage, Vec<String>)>,
}

impl ParsedShader {
    pub fn parse(name: &str, source: &str) -> Result<Self, ShaderError> {
        let module = naga::front::wgsl::parse_str(source).map_err(|err| ShaderError::Parse {
            name: name.to_string(),
            message: err.emit_to_string(source),
        })?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|err| ShaderError::Validation {
                name: name.to_string(),
                message: err.emit_to_string(source),
            })?;

        let mut entry_points = Vec::new();
        let mut globals = Vec::new();
        for ep in &module.entry_points {
            if let Some(stage) = ShaderStage::from_naga(ep.stage) {
                entry_points.push((stage, ep.name.clone()));
                globals.push((stage, referenced_globals(&module, &ep.function)));
            }
        }

        Ok(Self {
            name: name.to_string(),
            entry_points,
            globals,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the first entry point for `stage`.
    pub fn entry_point(&self, stage: ShaderStage) -> Result<&str, ShaderError> {
        self.entry_points
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, name)| name.as_str())
            .ok_or_else(|| ShaderError::MissingStage {
                name: self.name.clone(),
                stage: stage.name(),
            })
    }

    /// Resource variables read directly by the first entry point for
    /// `stage`, sorted by name. Helper functions it calls are not followed.
    pub fn globals_used(&self, stage: ShaderStage) -> &[String] {
        self.globals
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, names)| names.as_slice())
            .unwrap_or_default()
    }
}

fn referenced_globals(module: &naga::Module, function: &naga::Function) -> Vec<String> {
    let mut names: Vec<String> = function
        .expressions
        .iter()
        .filter_map(|(_, expression)| match expression {
            naga::Expression::GlobalVariable(handle) => module.global_variables[*handle].name.clone(),
            _ => None,
        })
        .collect();
    names.sort();
    names.dedup();
    names
}

/// A validated WGSL module uploaded to the device. Hands out one [`Shader`]
/// per stage.
pub struct ShaderModule {
    parsed: ParsedShader,
    module: Arc<wgpu::ShaderModule>,
}

impl ShaderModule {
    pub fn load(device: &wgpu::Device, source: &ShaderSource) -> Result<Self, ShaderError> {
        let name = source.name();
        let text = source.read()?;
        let parsed = ParsedShader::parse(&name, &text)?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&name),
            source: wgpu::ShaderSource::Wgsl(text),
        });
        log::debug!("Loaded shader '{name}'");
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            log::trace!("  {stage} stage reads {:?}", parsed.globals_used(stage));
        }

        Ok(Self {
            parsed,
            module: Arc::new(module),
        })
    }

    pub fn name(&self) -> &str {
        self.parsed.name()
    }

    pub fn stage(&self, stage: ShaderStage) -> Result<Shader, ShaderError> {
        let entry_point = self.parsed.entry_point(stage)?.to_string();
        Ok(Shader {
            name: self.parsed.name().to_string(),
            stage,
            entry_point,
            module: Arc::clone(&self.module),
        })
    }

    /// Vertex and fragment shaders of this module, in link order.
    pub fn vertex_fragment(&self) -> Result<Vec<Shader>, ShaderError> {
        Ok(vec![
            self.stage(ShaderStage::Vertex)?,
            self.stage(ShaderStage::Fragment)?,
        ])
    }
}

/// One stage of a loaded module. Only lives until it is linked into a
/// [`super::program::Program`].
pub struct Shader {
    name: String,
    stage: ShaderStage,
    entry_point: String,
    module: Arc<wgpu::ShaderModule>,
}

impl Shader {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("entry_point", &self.entry_point)
            .finish()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        log::trace!("Released {} shader '{}'", self.stage, self.name);
    }
}
