//! Offset ring construction.
//!
//! Rings are built iteratively, outermost first. Ring `k` sits at distance
//! `tool_radius + margin + k * stepover` from the outer boundary and has every
//! island keepout (the island grown by `tool_radius + margin`) subtracted.
//! Generation stops when the next offset comes back empty; a final center
//! cleanup ring is then searched by bisection in the remaining gap.
//!
//! Work is bounded: the number of iterations is capped up front from the
//! pocket size, and keepouts are looked up through a grid index instead of
//! being subtracted from every ring.

use crate::backend::{Contour, JoinSpec, OffsetBackend};
use crate::cavalier::CavalierBackend;
use crate::config::{GeometryLimits, JoinStyle, RingParams};
use crate::keepout::{KeepoutGuard, Violation};
use luthcam_core::error::{GeometryError, GeometryOverflowError, ParameterError, PlanError};
use luthcam_core::geometry::{Bounds, PocketInput, Point, Polygon};
use luthcam_core::{CancelToken, GridIndex};
use serde::Serialize;
use tracing::{debug, info};

/// One offset ring.
///
/// A ring may consist of several disjoint loops when islands split the
/// remaining area. Loops are counter-clockwise, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OffsetRing {
    index: usize,
    offset: f64,
    loops: Vec<Polygon>,
}

impl OffsetRing {
    /// Ring index, 0 = outermost.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Distance of the tool center from the outer boundary in mm.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn loops(&self) -> &[Polygon] {
        &self.loops
    }

    /// Points of the primary (largest) loop.
    pub fn points(&self) -> &[Point] {
        self.loops.first().map(Polygon::points).unwrap_or(&[])
    }

    pub fn vertex_count(&self) -> usize {
        self.loops.iter().map(Polygon::len).sum()
    }
}

/// Builds offset rings through a pluggable [`OffsetBackend`].
#[derive(Debug, Clone, Default)]
pub struct GeometryOffsetEngine<B = CavalierBackend> {
    backend: B,
}

impl GeometryOffsetEngine<CavalierBackend> {
    pub fn new() -> Self {
        Self::default()
    }
}

struct Keepouts {
    contours: Vec<Contour>,
    index: GridIndex,
}

impl<B: OffsetBackend> GeometryOffsetEngine<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Builds the ring sequence for a validated pocket.
    pub fn build_rings(
        &self,
        pocket: &PocketInput,
        params: &RingParams,
    ) -> Result<Vec<OffsetRing>, PlanError> {
        self.build_rings_with_cancel(pocket, params, &CancelToken::new())
    }

    /// Like [`build_rings`](Self::build_rings), polling `cancel` between rings.
    pub fn build_rings_with_cancel(
        &self,
        pocket: &PocketInput,
        params: &RingParams,
        cancel: &CancelToken,
    ) -> Result<Vec<OffsetRing>, PlanError> {
        validate_params(params)?;
        let limits = params.limits;
        let islands = pocket.islands();
        if islands.len() > limits.max_islands {
            return Err(GeometryOverflowError::TooManyIslands {
                count: islands.len(),
                limit: limits.max_islands,
            }
            .into());
        }

        let bound = iteration_bound(pocket, params);
        if bound > limits.max_ring_iterations {
            return Err(GeometryOverflowError::IterationBoundExceeded {
                bound,
                cap: limits.max_ring_iterations,
            }
            .into());
        }

        let join = JoinSpec {
            style: params.join_style,
            arc_tolerance: params.arc_tolerance,
            miter_limit: params.miter_limit,
        };
        let keepouts = self.build_keepouts(pocket, params, &join)?;
        let guard = KeepoutGuard::new(pocket, params);
        let clearance = params.clearance();
        let stepover = params.stepover();

        let mut rings: Vec<OffsetRing> = Vec::new();
        let mut vertices = 0usize;
        for k in 0..=bound {
            cancel.check()?;
            let offset = clearance + k as f64 * stepover;
            let Some(loops) = self.ring_at(pocket, &keepouts, offset, k, &join)? else {
                break;
            };
            if k == bound {
                return Err(GeometryOverflowError::IterationCapReached { limit: bound }.into());
            }
            let ring = OffsetRing {
                index: k,
                offset,
                loops,
            };
            self.accept(&guard, &ring, &mut vertices, &limits)?;
            rings.push(ring);
        }

        let Some(last) = rings.last().map(OffsetRing::offset) else {
            return Err(GeometryError::NoClearableArea {
                tool_diameter: params.tool_diameter,
                margin: params.margin,
            }
            .into());
        };

        cancel.check()?;
        if let Some(ring) = self.cleanup_ring(pocket, &keepouts, params, &join, last, rings.len())? {
            self.accept(&guard, &ring, &mut vertices, &limits)?;
            rings.push(ring);
        }

        info!(
            "Built {} offset rings ({} vertices, {} islands) with {} backend",
            rings.len(),
            vertices,
            islands.len(),
            self.backend.name()
        );
        Ok(rings)
    }

    fn build_keepouts(
        &self,
        pocket: &PocketInput,
        params: &RingParams,
        join: &JoinSpec,
    ) -> Result<Keepouts, PlanError> {
        let mut contours = Vec::with_capacity(pocket.islands().len());
        for island in pocket.islands() {
            let grown = self
                .backend
                .offset_polygon(island.points(), -params.clearance(), join)
                .map_err(|e| GeometryError::Backend {
                    ring: 0,
                    reason: e.to_string(),
                })?;
            contours.extend(grown.into_iter().filter(|c| c.len() >= 3));
        }
        let boxes: Vec<Bounds> = contours
            .iter()
            .filter_map(|c| Bounds::from_points(c))
            .collect();
        debug!("Grew {} island keepouts by {:.3}mm", boxes.len(), params.clearance());
        Ok(Keepouts {
            index: GridIndex::build(&boxes),
            contours,
        })
    }

    /// Loops of the ring at `offset`, or `None` once the pocket is cleared.
    fn ring_at(
        &self,
        pocket: &PocketInput,
        keepouts: &Keepouts,
        offset: f64,
        ring: usize,
        join: &JoinSpec,
    ) -> Result<Option<Vec<Polygon>>, PlanError> {
        let backend_err = |e: crate::backend::BackendError| GeometryError::Backend {
            ring,
            reason: e.to_string(),
        };

        let shrunk = self
            .backend
            .offset_polygon(pocket.outer().points(), offset, join)
            .map_err(backend_err)?;
        let Some(extent) = shrunk
            .iter()
            .filter_map(|c| Bounds::from_points(c))
            .reduce(|a, b| a.union(&b))
        else {
            return Ok(None);
        };

        let clips: Vec<Contour> = keepouts
            .index
            .query(&extent)
            .into_iter()
            .map(|i| keepouts.contours[i].clone())
            .collect();
        let raw = if clips.is_empty() {
            shrunk
        } else {
            self.backend
                .difference_polygons(&shrunk, &clips)
                .map_err(backend_err)?
        };

        let min_area = join.arc_tolerance * join.arc_tolerance;
        let mut loops: Vec<Polygon> = raw
            .into_iter()
            .filter_map(|c| Polygon::new(c).ok())
            .filter(|p| p.area() >= min_area)
            .collect();
        if loops.is_empty() {
            return Ok(None);
        }
        loops.sort_by(|a, b| {
            let (ba, bb) = (a.bounds(), b.bounds());
            b.area()
                .total_cmp(&a.area())
                .then(ba.min_x.total_cmp(&bb.min_x))
                .then(ba.min_y.total_cmp(&bb.min_y))
        });
        Ok(Some(loops))
    }

    /// Bisects the gap after the last ring for one more valid ring.
    fn cleanup_ring(
        &self,
        pocket: &PocketInput,
        keepouts: &Keepouts,
        params: &RingParams,
        join: &JoinSpec,
        last: f64,
        index: usize,
    ) -> Result<Option<OffsetRing>, PlanError> {
        let mut hi = last + params.stepover();
        for _ in 0..params.limits.cleanup_steps {
            let mid = (last + hi) / 2.0;
            if mid - last <= params.arc_tolerance {
                break;
            }
            if let Some(loops) = self.ring_at(pocket, keepouts, mid, index, join)? {
                debug!("Center cleanup ring at offset {:.3}mm", mid);
                return Ok(Some(OffsetRing {
                    index,
                    offset: mid,
                    loops,
                }));
            }
            hi = mid;
        }
        Ok(None)
    }

    fn accept(
        &self,
        guard: &KeepoutGuard<'_>,
        ring: &OffsetRing,
        vertices: &mut usize,
        limits: &GeometryLimits,
    ) -> Result<(), PlanError> {
        *vertices += ring.vertex_count();
        if *vertices > limits.max_vertices {
            return Err(GeometryOverflowError::TooManyVertices {
                ring: ring.index,
                count: *vertices,
                limit: limits.max_vertices,
            }
            .into());
        }
        verify_ring(guard, ring)?;
        debug!(
            "Ring {} at offset {:.3}mm: {} loops, {} vertices",
            ring.index,
            ring.offset,
            ring.loops.len(),
            ring.vertex_count()
        );
        Ok(())
    }
}

/// `ceil(max_reasonable_radius / stepover) + islands`, where the radius is
/// half the smaller side of the outer bounding box.
pub fn iteration_bound(pocket: &PocketInput, params: &RingParams) -> usize {
    let b = pocket.outer().bounds();
    let radius = b.width().min(b.height()) / 2.0;
    let rings = (radius / params.stepover()).ceil();
    let rings = if rings.is_finite() && rings > 0.0 {
        rings.min(usize::MAX as f64 / 2.0) as usize
    } else {
        0
    };
    rings.saturating_add(pocket.islands().len())
}

fn validate_params(params: &RingParams) -> Result<(), ParameterError> {
    ParameterError::check_positive("tool_diameter", params.tool_diameter)?;
    if !(params.stepover_fraction > 0.0 && params.stepover_fraction <= 1.0) {
        return Err(ParameterError::OutOfRange {
            name: "stepover_fraction".to_string(),
            value: params.stepover_fraction,
            min: 0.0,
            max: 1.0,
        });
    }
    ParameterError::check_range("margin", params.margin, 0.0, f64::MAX)?;
    ParameterError::check_positive("arc_tolerance", params.arc_tolerance)?;
    ParameterError::check_range("miter_limit", params.miter_limit, 1.0, f64::MAX)?;
    Ok(())
}

/// Checks every ring vertex near an island against that island.
fn verify_ring(guard: &KeepoutGuard<'_>, ring: &OffsetRing) -> Result<(), GeometryError> {
    for polygon in &ring.loops {
        let near = guard.islands_near(&polygon.bounds());
        if near.is_empty() {
            continue;
        }
        let check_island = |&island: &usize| -> Option<(usize, Violation)> {
            let zone = guard.pocket().islands()[island]
                .bounds()
                .expand(guard.required());
            polygon
                .points()
                .iter()
                .filter(|p| zone.contains_point(p))
                .find_map(|p| guard.check_point_island(p, island).err())
                .map(|v| (island, v))
        };

        #[cfg(feature = "parallel")]
        let found = {
            use rayon::prelude::*;
            near.par_iter().find_map_first(check_island)
        };
        #[cfg(not(feature = "parallel"))]
        let found = near.iter().find_map(check_island);

        if let Some((island, v)) = found {
            return Err(GeometryError::KeepoutViolation {
                ring: ring.index,
                island,
                clearance: v.clearance,
                required: v.required,
            });
        }
    }
    Ok(())
}

/// Builds rings directly from polygons and scalar parameters.
///
/// Re-validates containment and overlap, then runs the default engine with
/// default limits and a miter limit of 2.0.
pub fn build_rings(
    outer: &Polygon,
    islands: &[Polygon],
    tool_diameter: f64,
    stepover_fraction: f64,
    margin: f64,
    join_style: JoinStyle,
    arc_tolerance: f64,
) -> Result<Vec<OffsetRing>, PlanError> {
    let pocket = PocketInput::new(outer.clone(), islands.to_vec())?;
    let params = RingParams {
        tool_diameter,
        stepover_fraction,
        margin,
        join_style,
        arc_tolerance,
        miter_limit: 2.0,
        limits: GeometryLimits::default(),
    };
    GeometryOffsetEngine::new().build_rings(&pocket, &params)
}
