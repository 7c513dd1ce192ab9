//! Flattens a tree of referenced surfaces into one drawable frame.
//!
//! Aggregation starts from a root surface and inlines every surface quad it
//! meets: the embedded surface's root-pass quads are translated into the
//! embedding pass, its remaining passes are copied into the output with
//! remapped pass ids so no two output passes collide. Missing surfaces and
//! surfaces without a frame contribute nothing; reference cycles are cut at
//! the point of re-entry. Copy requests on every surface the pass touched
//! are collected for the display to fulfill after the swap.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use lumen_core::{Point, Rect};
use lumen_surfaces::frame::{DrawQuad, RenderPass, RenderPassId};
use lumen_surfaces::id::SurfaceId;
use lumen_surfaces::manager::SurfaceManager;
use lumen_surfaces::surface::CopyOutputRequest;

/// The output of one aggregation pass.
pub struct AggregatedFrame {
    /// Flattened pass list, root pass last, pass ids unique.
    pub render_passes: Vec<RenderPass>,
    /// Damage to present; currently the root surface's full output rect.
    pub damage_rect: Rect<i32>,
    /// Every surface whose content is part of this frame, root first.
    pub contained_surfaces: Vec<SurfaceId>,
    /// Pixel-readback requests collected from contained surfaces.
    pub copy_requests: Vec<(SurfaceId, CopyOutputRequest)>,
}

#[derive(Default)]
struct AggregationState {
    output_passes: Vec<RenderPass>,
    contained: Vec<SurfaceId>,
    contained_set: HashSet<SurfaceId>,
    /// Surfaces on the current inline chain, for cutting cycles.
    in_flight: Vec<SurfaceId>,
    /// Root-pass quads of surfaces already inlined once, reused when the
    /// same surface is embedded at several sites.
    inlined_root_quads: HashMap<SurfaceId, Vec<DrawQuad>>,
}

/// Aggregates the surface tree rooted at a given surface id.
pub struct SurfaceAggregator {
    next_output_pass_id: u64,
    pass_id_map: HashMap<(SurfaceId, RenderPassId), RenderPassId>,
    previous_contained_surfaces: HashSet<SurfaceId>,
}

impl SurfaceAggregator {
    /// Creates an aggregator with no history.
    pub fn new() -> Self {
        SurfaceAggregator {
            next_output_pass_id: 1,
            pass_id_map: HashMap::new(),
            previous_contained_surfaces: HashSet::new(),
        }
    }

    /// The surfaces contained in the most recent aggregation.
    pub fn previous_contained_surfaces(&self) -> &HashSet<SurfaceId> {
        &self.previous_contained_surfaces
    }

    /// Flattens the tree rooted at `root_surface_id` into a single frame.
    ///
    /// Returns `None` when the root surface does not exist or has no
    /// submitted frame yet. Notifies `will_draw_surface` for every
    /// contained surface and takes their pending copy requests.
    pub fn aggregate(
        &mut self,
        manager: &mut SurfaceManager,
        root_surface_id: SurfaceId,
    ) -> Option<AggregatedFrame> {
        let root_surface = manager.get_surface(root_surface_id)?;
        let root_frame = root_surface.current_frame()?;
        let root_pass = root_frame.root_pass()?;
        let output_rect = root_pass.output_rect;

        self.pass_id_map.clear();
        let mut state = AggregationState::default();
        state.in_flight.push(root_surface_id);
        state.contained.push(root_surface_id);
        state.contained_set.insert(root_surface_id);

        // Non-root passes of the root frame, then the flattened root pass.
        let non_root: Vec<RenderPass> = root_frame.render_passes
            [..root_frame.render_passes.len() - 1]
            .to_vec();
        let root_pass = root_pass.clone();
        for pass in non_root {
            let pass = self.copy_pass(manager, root_surface_id, &pass, &mut state);
            state.output_passes.push(pass);
        }
        let root_quads = self.process_quads(manager, root_surface_id, &root_pass.quads, &mut state);
        state.output_passes.push(RenderPass {
            id: self.remapped_pass_id(root_surface_id, root_pass.id),
            output_rect,
            damage_rect: output_rect,
            quads: root_quads,
        });
        state.in_flight.pop();

        // Second phase: damage notification and copy-request collection
        // need mutable surface access, so it runs after the walk.
        let mut copy_requests = Vec::new();
        for surface_id in &state.contained {
            let damage = manager
                .get_surface(*surface_id)
                .and_then(|s| s.current_frame())
                .and_then(|f| f.root_pass())
                .map(|p| p.output_rect)
                .unwrap_or(output_rect);
            manager.will_draw_surface(*surface_id, damage);
            if let Some(surface) = manager.get_surface_mut(*surface_id) {
                for request in surface.take_copy_requests() {
                    copy_requests.push((*surface_id, request));
                }
            }
        }

        self.previous_contained_surfaces = state.contained_set.clone();

        Some(AggregatedFrame {
            render_passes: state.output_passes,
            damage_rect: output_rect,
            contained_surfaces: state.contained,
            copy_requests,
        })
    }

    fn remapped_pass_id(&mut self, owner: SurfaceId, pass_id: RenderPassId) -> RenderPassId {
        if let Some(id) = self.pass_id_map.get(&(owner, pass_id)) {
            return *id;
        }
        let id = RenderPassId(self.next_output_pass_id);
        self.next_output_pass_id += 1;
        self.pass_id_map.insert((owner, pass_id), id);
        id
    }

    fn copy_pass(
        &mut self,
        manager: &SurfaceManager,
        owner: SurfaceId,
        pass: &RenderPass,
        state: &mut AggregationState,
    ) -> RenderPass {
        RenderPass {
            id: self.remapped_pass_id(owner, pass.id),
            output_rect: pass.output_rect,
            damage_rect: pass.damage_rect,
            quads: self.process_quads(manager, owner, &pass.quads, state),
        }
    }

    fn process_quads(
        &mut self,
        manager: &SurfaceManager,
        owner: SurfaceId,
        quads: &[DrawQuad],
        state: &mut AggregationState,
    ) -> Vec<DrawQuad> {
        let mut out = Vec::with_capacity(quads.len());
        for quad in quads {
            match quad {
                DrawQuad::SolidColor { .. } | DrawQuad::Texture { .. } => out.push(quad.clone()),
                DrawQuad::RenderPass {
                    rect,
                    render_pass_id,
                } => out.push(DrawQuad::RenderPass {
                    rect: *rect,
                    render_pass_id: self.remapped_pass_id(owner, *render_pass_id),
                }),
                DrawQuad::Surface { rect, surface_id } => {
                    match self.inline_surface(manager, *surface_id, state) {
                        Some(inner) => {
                            let offset = rect.origin;
                            out.extend(inner.into_iter().map(|q| translate_quad(q, offset)));
                        }
                        None => {
                            debug!(%surface_id, "dropping quad for unavailable surface");
                        }
                    }
                }
            }
        }
        out
    }

    /// Inlines an embedded surface, returning its flattened root-pass quads
    /// in the embedded surface's own coordinates. `None` when the surface
    /// cannot contribute (missing, frameless, or already on the inline
    /// chain).
    fn inline_surface(
        &mut self,
        manager: &SurfaceManager,
        surface_id: SurfaceId,
        state: &mut AggregationState,
    ) -> Option<Vec<DrawQuad>> {
        if state.in_flight.contains(&surface_id) {
            debug!(%surface_id, "cutting reference cycle during aggregation");
            return None;
        }
        if let Some(quads) = state.inlined_root_quads.get(&surface_id) {
            return Some(quads.clone());
        }

        let frame = manager.get_surface(surface_id)?.current_frame()?;
        let render_passes = frame.render_passes.clone();
        let (root_pass, non_root) = render_passes.split_last()?;

        if state.contained_set.insert(surface_id) {
            state.contained.push(surface_id);
        }
        state.in_flight.push(surface_id);
        for pass in non_root {
            let pass = self.copy_pass(manager, surface_id, pass, state);
            state.output_passes.push(pass);
        }
        let quads = self.process_quads(manager, surface_id, &root_pass.quads, state);
        state.in_flight.pop();

        state.inlined_root_quads.insert(surface_id, quads.clone());
        Some(quads)
    }
}

impl Default for SurfaceAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn translate_quad(quad: DrawQuad, offset: Point<i32>) -> DrawQuad {
    let shift = |rect: Rect<i32>| {
        Rect::new(
            Point::new(rect.origin.x + offset.x, rect.origin.y + offset.y),
            rect.size,
        )
    };
    match quad {
        DrawQuad::SolidColor { rect, color } => DrawQuad::SolidColor {
            rect: shift(rect),
            color,
        },
        DrawQuad::Surface { rect, surface_id } => DrawQuad::Surface {
            rect: shift(rect),
            surface_id,
        },
        DrawQuad::RenderPass {
            rect,
            render_pass_id,
        } => DrawQuad::RenderPass {
            rect: shift(rect),
            render_pass_id,
        },
        DrawQuad::Texture { rect, resource_id } => DrawQuad::Texture {
            rect: shift(rect),
            resource_id,
        },
    }
}
