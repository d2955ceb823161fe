//! End-to-end planning: rings, linking, timing, classification and energy.

use crate::backend::OffsetBackend;
use crate::bottleneck::{Bottleneck, BottleneckClassifier, BottleneckHistogram};
use crate::cavalier::CavalierBackend;
use crate::config::{PathStrategy, PlanConfig};
use crate::energy::{compute_heat_timeseries, EnergyHeatModel, HeatSeries, SegmentEnergy};
use crate::linker::PathLinker;
use crate::motion::{MotionBranch, MotionProfileEstimator};
use crate::rings::{GeometryOffsetEngine, OffsetRing};
use crate::segment::{MoveKind, ToolpathSegment};
use luthcam_core::data::{MachineProfile, MaterialProfile};
use luthcam_core::error::PlanError;
use luthcam_core::geometry::PocketInput;
use luthcam_core::CancelToken;
use serde::Serialize;
use tracing::{debug, info};

/// A segment with everything the analytics attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlannedSegment {
    pub segment: ToolpathSegment,
    /// Estimated time in seconds.
    pub time: f64,
    pub branch: MotionBranch,
    pub bottleneck: Bottleneck,
    pub energy: SegmentEnergy,
}

/// Totals over a whole plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlanSummary {
    /// mm, vertical moves included.
    pub total_distance: f64,
    pub cutting_distance: f64,
    pub rapid_distance: f64,
    /// Seconds.
    pub total_time: f64,
    pub cutting_time: f64,
    /// J.
    pub total_energy: f64,
    /// mm³.
    pub total_volume: f64,
    /// W.
    pub peak_chip_power: f64,
    pub peak_tool_power: f64,
    pub peak_work_power: f64,
    pub bottlenecks: BottleneckHistogram,
    pub ring_count: usize,
    pub segment_count: usize,
    pub retract_count: usize,
}

impl PlanSummary {
    fn from_parts(
        segments: &[PlannedSegment],
        heat: &HeatSeries,
        ring_count: usize,
        retract_count: usize,
    ) -> Self {
        let mut summary = Self {
            peak_chip_power: heat.peak_chip(),
            peak_tool_power: heat.peak_tool(),
            peak_work_power: heat.peak_work(),
            ring_count,
            segment_count: segments.len(),
            retract_count,
            ..Self::default()
        };
        for planned in segments {
            let length = planned.segment.length();
            summary.total_distance += length;
            summary.total_time += planned.time;
            if planned.segment.is_cutting() {
                summary.cutting_distance += length;
                summary.cutting_time += planned.time;
            }
            if planned.segment.kind == MoveKind::Rapid {
                summary.rapid_distance += length;
            }
            summary.total_volume += planned.energy.volume;
            summary.bottlenecks.record(planned.bottleneck);
        }
        summary.total_energy = segments.last().map(|s| s.energy.cumulative).unwrap_or(0.0);
        summary
    }
}

/// A complete, immutable toolpath plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolpathPlan {
    strategy: PathStrategy,
    rings: Vec<OffsetRing>,
    segments: Vec<PlannedSegment>,
    heat: HeatSeries,
    summary: PlanSummary,
}

impl ToolpathPlan {
    pub fn strategy(&self) -> PathStrategy {
        self.strategy
    }

    pub fn rings(&self) -> &[OffsetRing] {
        &self.rings
    }

    pub fn segments(&self) -> &[PlannedSegment] {
        &self.segments
    }

    /// Bare moves in path order.
    pub fn toolpath(&self) -> impl Iterator<Item = &ToolpathSegment> + '_ {
        self.segments.iter().map(|p| &p.segment)
    }

    pub fn heat(&self) -> &HeatSeries {
        &self.heat
    }

    pub fn summary(&self) -> &PlanSummary {
        &self.summary
    }

    pub fn to_json(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Runs the full pipeline for one pocket.
#[derive(Debug, Clone)]
pub struct ToolpathAssembler<B = CavalierBackend> {
    config: PlanConfig,
    engine: GeometryOffsetEngine<B>,
}

impl ToolpathAssembler<CavalierBackend> {
    pub fn new(config: PlanConfig) -> Self {
        Self {
            config,
            engine: GeometryOffsetEngine::new(),
        }
    }
}

impl<B: OffsetBackend> ToolpathAssembler<B> {
    pub fn with_backend(config: PlanConfig, backend: B) -> Self {
        Self {
            config,
            engine: GeometryOffsetEngine::with_backend(backend),
        }
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    pub fn plan(
        &self,
        pocket: &PocketInput,
        machine: &MachineProfile,
        material: &MaterialProfile,
    ) -> Result<ToolpathPlan, PlanError> {
        self.plan_with_cancel(pocket, machine, material, &CancelToken::new())
    }

    /// Plans `pocket`, polling `cancel` between stages.
    ///
    /// Either the whole plan is returned or an error; a cancelled request
    /// yields [`PlanError::Cancelled`].
    pub fn plan_with_cancel(
        &self,
        pocket: &PocketInput,
        machine: &MachineProfile,
        material: &MaterialProfile,
        cancel: &CancelToken,
    ) -> Result<ToolpathPlan, PlanError> {
        let config = &self.config;
        config.validate()?;
        cancel.check()?;

        let params = config.ring_params();
        let rings = self.engine.build_rings_with_cancel(pocket, &params, cancel)?;
        debug!("Built {} rings", rings.len());
        cancel.check()?;

        let mut linker = PathLinker::new(pocket, &params, config.link_config(machine.rapid_feed()));
        linker.link_rings_with_cancel(&rings, cancel)?;
        let linked = linker.finalize()?;
        let retract_count = linked.retract_count();
        let moves = linked.into_segments();
        cancel.check()?;

        let times = MotionProfileEstimator::new(machine).estimate_times(&moves);
        let bottlenecks = BottleneckClassifier::new(machine).classify_all(&moves);
        let energies = EnergyHeatModel::new(
            material,
            config.tool_diameter,
            config.stepover_fraction,
            config.stepdown,
        )
        .compute_energy(&moves);
        let heat = compute_heat_timeseries(&energies, &times, config.heat_bins)?;
        cancel.check()?;

        let segments: Vec<PlannedSegment> = moves
            .into_iter()
            .zip(times)
            .zip(bottlenecks)
            .zip(energies)
            .map(|(((segment, time), bottleneck), energy)| PlannedSegment {
                segment,
                time: time.time,
                branch: time.branch,
                bottleneck,
                energy,
            })
            .collect();

        let summary = PlanSummary::from_parts(&segments, &heat, rings.len(), retract_count);
        info!(
            "Planned pocket: {} rings, {} segments, {:.1} mm, {:.2} s, {:.2} J",
            summary.ring_count,
            summary.segment_count,
            summary.total_distance,
            summary.total_time,
            summary.total_energy
        );

        Ok(ToolpathPlan {
            strategy: config.strategy,
            rings,
            segments,
            heat,
            summary,
        })
    }
}
