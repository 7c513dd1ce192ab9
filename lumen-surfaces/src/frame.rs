//! Compositor frame data: render passes, draw quads, and frame metadata.
//!
//! A [`CompositorFrame`] is what a producer submits into its surface: a
//! list of render passes (the root pass last), the resources the frame
//! uses, and metadata including the list of other surfaces the frame
//! embeds. The referenced-surface list is what the registry's garbage
//! collector walks for reachability.

use crate::id::SurfaceId;
use crate::resources::{ResourceId, TransferableResource};
use lumen_core::Rect;

/// Identifies a render pass within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderPassId(pub u64);

/// One drawable element of a render pass.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawQuad {
    /// A filled rectangle. Color is packed ARGB.
    SolidColor { rect: Rect<i32>, color: u32 },
    /// Embeds another surface's content at `rect`.
    Surface {
        rect: Rect<i32>,
        surface_id: SurfaceId,
    },
    /// Samples the output of another render pass of the same frame.
    RenderPass {
        rect: Rect<i32>,
        render_pass_id: RenderPassId,
    },
    /// Samples a transferred resource.
    Texture {
        rect: Rect<i32>,
        resource_id: ResourceId,
    },
}

impl DrawQuad {
    /// The quad's target rectangle in pass space.
    pub fn rect(&self) -> Rect<i32> {
        match self {
            DrawQuad::SolidColor { rect, .. }
            | DrawQuad::Surface { rect, .. }
            | DrawQuad::RenderPass { rect, .. }
            | DrawQuad::Texture { rect, .. } => *rect,
        }
    }
}

/// A list of quads rendered into one target.
///
/// Within a frame the root pass is the last entry of the pass list.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPass {
    /// Frame-local pass id.
    pub id: RenderPassId,
    /// The rectangle the pass renders into.
    pub output_rect: Rect<i32>,
    /// The sub-rectangle that changed since the previous frame.
    pub damage_rect: Rect<i32>,
    /// Draw quads, back to front.
    pub quads: Vec<DrawQuad>,
}

impl RenderPass {
    /// Creates an empty pass whose damage covers the whole output.
    pub fn new(id: RenderPassId, output_rect: Rect<i32>) -> Self {
        RenderPass {
            id,
            output_rect,
            damage_rect: output_rect,
            quads: Vec::new(),
        }
    }
}

/// Metadata accompanying a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMetadata {
    /// Scale between layout and physical pixels.
    pub device_scale_factor: f32,
    /// Surfaces this frame embeds. Drives garbage-collection reachability.
    pub referenced_surfaces: Vec<SurfaceId>,
}

impl Default for FrameMetadata {
    fn default() -> Self {
        FrameMetadata {
            device_scale_factor: 1.0,
            referenced_surfaces: Vec::new(),
        }
    }
}

/// A complete frame submitted by a producer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositorFrame {
    /// Frame metadata, including embedded surfaces.
    pub metadata: FrameMetadata,
    /// Resources transferred alongside this frame.
    pub resource_list: Vec<TransferableResource>,
    /// Render passes, root pass last.
    pub render_passes: Vec<RenderPass>,
}

impl CompositorFrame {
    /// Builds a frame from passes and resources, deriving the
    /// referenced-surface list from the surface quads present in the
    /// passes.
    pub fn from_passes(
        render_passes: Vec<RenderPass>,
        resource_list: Vec<TransferableResource>,
    ) -> Self {
        let mut referenced_surfaces = Vec::new();
        for pass in &render_passes {
            for quad in &pass.quads {
                if let DrawQuad::Surface { surface_id, .. } = quad {
                    if !referenced_surfaces.contains(surface_id) {
                        referenced_surfaces.push(*surface_id);
                    }
                }
            }
        }
        CompositorFrame {
            metadata: FrameMetadata {
                device_scale_factor: 1.0,
                referenced_surfaces,
            },
            resource_list,
            render_passes,
        }
    }

    /// The root render pass, by convention the last in the list.
    pub fn root_pass(&self) -> Option<&RenderPass> {
        self.render_passes.last()
    }

    /// Surfaces this frame embeds.
    pub fn referenced_surfaces(&self) -> &[SurfaceId] {
        &self.metadata.referenced_surfaces
    }

    /// Ids of the resources transferred with this frame.
    pub fn resource_ids(&self) -> Vec<ResourceId> {
        self.resource_list.iter().map(|r| r.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{FrameSinkId, LocalFrameId};
    use uuid::Uuid;

    fn surface_id(counter: u64) -> SurfaceId {
        SurfaceId::new(
            FrameSinkId::new(1, 0),
            LocalFrameId::new(counter, Uuid::new_v4()),
        )
    }

    #[test]
    fn test_from_passes_collects_referenced_surfaces() {
        let embedded = surface_id(1);
        let mut pass = RenderPass::new(RenderPassId(1), Rect::from_coords(0, 0, 100, 100));
        pass.quads.push(DrawQuad::SolidColor {
            rect: Rect::from_coords(0, 0, 10, 10),
            color: 0xff00_0000,
        });
        pass.quads.push(DrawQuad::Surface {
            rect: Rect::from_coords(10, 10, 50, 50),
            surface_id: embedded,
        });
        // The same surface referenced twice appears once.
        pass.quads.push(DrawQuad::Surface {
            rect: Rect::from_coords(20, 20, 50, 50),
            surface_id: embedded,
        });

        let frame = CompositorFrame::from_passes(vec![pass], Vec::new());
        assert_eq!(frame.referenced_surfaces(), &[embedded]);
    }

    #[test]
    fn test_root_pass_is_last() {
        let first = RenderPass::new(RenderPassId(1), Rect::from_coords(0, 0, 10, 10));
        let second = RenderPass::new(RenderPassId(2), Rect::from_coords(0, 0, 20, 20));
        let frame = CompositorFrame::from_passes(vec![first, second], Vec::new());
        assert_eq!(frame.root_pass().unwrap().id, RenderPassId(2));
    }

    #[test]
    fn test_empty_frame_has_no_root_pass() {
        let frame = CompositorFrame::default();
        assert!(frame.root_pass().is_none());
        assert!(frame.referenced_surfaces().is_empty());
    }
}
