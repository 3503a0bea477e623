//! The shared shadow render target.
//!
//! One framebuffer serves every light. At any time at most one light's
//! cubemap faces are attached; binding another light replaces the previous
//! attachment, so a light's passes must all be encoded before the next light
//! is bound.

use crate::gfx::lighting::CubemapFace;

struct Attachment<V> {
    light: usize,
    faces: [V; 6],
}

/// Depth render target shared by all point lights.
///
/// Generic over the face view type so the binding rules can be exercised
/// without a GPU.
pub struct ShadowFramebuffer<V = wgpu::TextureView> {
    resolution: u32,
    attachment: Option<Attachment<V>>,
}

impl<V: Clone> ShadowFramebuffer<V> {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            attachment: None,
        }
    }

    /// Attaches the six face views of `light`, replacing any previous light.
    pub fn bind(&mut self, light: usize, faces: &[V; 6]) {
        if let Some(previous) = self.attached() {
            log::trace!("Shadow framebuffer: light {previous} -> light {light}");
        }
        self.attachment = Some(Attachment {
            light,
            faces: faces.clone(),
        });
    }

    /// Index of the light whose cubemap is attached.
    pub fn attached(&self) -> Option<usize> {
        self.attachment.as_ref().map(|a| a.light)
    }

    /// Depth view of one face of the attached cubemap.
    pub fn face(&self, face: CubemapFace) -> Option<&V> {
        self.attachment.as_ref().map(|a| &a.faces[face.index()])
    }

    pub fn unbind(&mut self) {
        self.attachment = None;
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

impl ShadowFramebuffer<wgpu::TextureView> {
    /// Attaches the depth cubemap owned by `light`.
    pub fn bind_light(&mut self, index: usize, light: &crate::gfx::lighting::PointLight) {
        self.bind(index, light.depth_cubemap().face_views());
    }

    /// Depth attachment for one face, cleared to the far plane.
    pub fn depth_attachment(&self, face: CubemapFace) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
        self.face(face).map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        })
    }
}
