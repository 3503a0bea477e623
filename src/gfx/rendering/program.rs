//! Linking shaders into render pipelines.
//!
//! A [`Program`] is the wgpu equivalent of a linked shader program: one vertex
//! stage, an optional fragment stage and the fixed-function state they run
//! with. Linking either yields a complete pipeline or an error; there is no
//! half-built program.

use wgpu::*;

use crate::{error::ShaderError, gfx::scene::vertex::Vertex3D};

use super::shader::{Shader, ShaderStage};

/// Vertex input a pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInput {
    /// Interleaved [`Vertex3D`] buffer.
    Mesh,
    /// Positions only, taken from a [`Vertex3D`] buffer.
    MeshPositions,
    /// Vertices generated from `vertex_index` (fullscreen quads).
    None,
}

/// Depth test and write configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthConfig {
    pub format: TextureFormat,
    pub write: bool,
    pub compare: CompareFunction,
}

impl DepthConfig {
    pub fn less(format: TextureFormat) -> Self {
        Self {
            format,
            write: true,
            compare: CompareFunction::Less,
        }
    }
}

/// Configuration for linking a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub vertex_input: VertexInput,
    pub cull_mode: Option<Face>,
    pub polygon_mode: PolygonMode,
    pub depth: Option<DepthConfig>,
    pub sample_count: u32,
    pub color_targets: Vec<Option<ColorTargetState>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            bind_group_layouts: Vec::new(),
            vertex_input: VertexInput::Mesh,
            cull_mode: Some(Face::Back),
            polygon_mode: PolygonMode::Fill,
            depth: None,
            sample_count: 1,
            color_targets: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_polygon_mode(mut self, mode: PolygonMode) -> Self {
        self.polygon_mode = mode;
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_vertex_input(mut self, input: VertexInput) -> Self {
        self.vertex_input = input;
        self
    }

    pub fn with_depth(mut self, depth: DepthConfig) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count.max(1);
        self
    }

    /// Single colour target with replace blending.
    pub fn with_color_target(mut self, format: TextureFormat) -> Self {
        self.color_targets = vec![Some(ColorTargetState {
            format,
            blend: Some(BlendState::REPLACE),
            write_mask: ColorWrites::ALL,
        })];
        self
    }

    fn vertex_buffers(&self) -> Vec<VertexBufferLayout<'static>> {
        match self.vertex_input {
            VertexInput::Mesh => vec![Vertex3D::desc()],
            VertexInput::MeshPositions => vec![Vertex3D::position_only_desc()],
            VertexInput::None => Vec::new(),
        }
    }
}

/// Polygon mode for geometry that honours the wireframe setting. Line mode
/// needs [`Features::POLYGON_MODE_LINE`]; without it polygons stay filled.
pub fn polygon_mode(wireframe: bool, features: Features) -> PolygonMode {
    if !wireframe {
        return PolygonMode::Fill;
    }
    if features.contains(Features::POLYGON_MODE_LINE) {
        PolygonMode::Line
    } else {
        log::warn!("Wireframe requested but the device lacks line polygon mode; drawing filled");
        PolygonMode::Fill
    }
}

/// Checks that an ordered shader list forms a linkable program: exactly one
/// vertex stage and at most one fragment stage.
pub fn check_stages(label: &str, stages: &[ShaderStage]) -> Result<(), ShaderError> {
    let vertex = stages.iter().filter(|s| **s == ShaderStage::Vertex).count();
    let fragment = stages.iter().filter(|s| **s == ShaderStage::Fragment).count();

    match (vertex, fragment) {
        (0, _) => Err(ShaderError::MissingStage {
            name: label.to_string(),
            stage: ShaderStage::Vertex.name(),
        }),
        (1, 0 | 1) => Ok(()),
        (1, n) => Err(ShaderError::Link {
            label: label.to_string(),
            message: format!("{n} fragment stages attached, expected at most one"),
        }),
        (n, _) => Err(ShaderError::Link {
            label: label.to_string(),
            message: format!("{n} vertex stages attached, expected exactly one"),
        }),
    }
}

/// A linked render pipeline.
#[derive(Debug)]
pub struct Program {
    pipeline: RenderPipeline,
}

impl Program {
    /// Links `shaders` into a pipeline described by `config`.
    ///
    /// The shaders are consumed: once the pipeline exists they are no longer
    /// needed and are released whether linking succeeded or not.
    pub fn link(
        device: &Device,
        shaders: Vec<Shader>,
        config: &PipelineConfig,
    ) -> Result<Self, ShaderError> {
        let stages: Vec<ShaderStage> = shaders.iter().map(Shader::stage).collect();
        check_stages(&config.label, &stages)?;

        let vertex = shaders
            .iter()
            .find(|s| s.stage() == ShaderStage::Vertex)
            .ok_or_else(|| ShaderError::MissingStage {
                name: config.label.clone(),
                stage: ShaderStage::Vertex.name(),
            })?;
        let fragment = shaders.iter().find(|s| s.stage() == ShaderStage::Fragment);

        let layout_refs: Vec<&BindGroupLayout> = config.bind_group_layouts.iter().collect();
        let vertex_buffers = config.vertex_buffers();

        let (pipeline, error) = crate::error::capture_validation(device, || {
            let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", config.label)),
                bind_group_layouts: &layout_refs,
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&layout),
                vertex: VertexState {
                    module: vertex.module(),
                    entry_point: Some(vertex.entry_point()),
                    buffers: &vertex_buffers,
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: fragment.map(|fs| FragmentState {
                    module: fs.module(),
                    entry_point: Some(fs.entry_point()),
                    targets: &config.color_targets,
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: config.polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: config.depth.map(|depth| DepthStencilState {
                    format: depth.format,
                    depth_write_enabled: depth.write,
                    depth_compare: depth.compare,
                    stencil: StencilState::default(),
                    bias: DepthBiasState::default(),
                }),
                multisample: MultisampleState {
                    count: config.sample_count,
                    ..Default::default()
                },
                multiview: None,
                cache: None,
            })
        });

        if let Some(error) = error {
            return Err(ShaderError::Link {
                label: config.label.clone(),
                message: error.to_string(),
            });
        }

        log::debug!(
            "Linked program '{}' from {} shader(s)",
            config.label,
            shaders.len()
        );
        drop(shaders);

        Ok(Self { pipeline })
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_and_fragment_link() {
        assert!(check_stages("scene", &[ShaderStage::Vertex, ShaderStage::Fragment]).is_ok());
        assert!(check_stages("depth-only", &[ShaderStage::Vertex]).is_ok());
    }

    #[test]
    fn test_missing_vertex_stage() {
        let err = check_stages("frag-only", &[ShaderStage::Fragment]).unwrap_err();
        assert!(matches!(err, ShaderError::MissingStage { stage: "vertex", .. }));
    }

    #[test]
    fn test_duplicate_stages_fail_to_link() {
        let err = check_stages("double", &[ShaderStage::Vertex, ShaderStage::Vertex]).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));

        let err = check_stages(
            "double-frag",
            &[ShaderStage::Vertex, ShaderStage::Fragment, ShaderStage::Fragment],
        )
        .unwrap_err();
        assert!(err.to_string().contains("2 fragment stages"));
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new("ui")
            .with_vertex_input(VertexInput::None)
            .with_cull_mode(None)
            .with_sample_count(0)
            .with_color_target(TextureFormat::Bgra8UnormSrgb);
        assert_eq!(config.sample_count, 1);
        assert!(config.vertex_buffers().is_empty());
        assert_eq!(config.color_targets.len(), 1);
        assert!(config.depth.is_none());
        assert_eq!(config.polygon_mode, PolygonMode::Fill);
    }

    #[test]
    fn test_wireframe_needs_line_mode_feature() {
        assert_eq!(polygon_mode(false, Features::POLYGON_MODE_LINE), PolygonMode::Fill);
        assert_eq!(polygon_mode(true, Features::POLYGON_MODE_LINE), PolygonMode::Line);
        assert_eq!(polygon_mode(true, Features::empty()), PolygonMode::Fill);

        let config = PipelineConfig::new("scene").with_polygon_mode(PolygonMode::Line);
        assert_eq!(config.polygon_mode, PolygonMode::Line);
    }
}
