//! Cutting energy and heat partition
//!
//! Removed volume is estimated from the engaged cross section
//! (`stepover_fraction * tool_diameter * stepdown`) swept along each cutting
//! move and scaled by the move's engagement factor. Energy follows from the
//! material's specific cutting energy and is split into chip, tool and
//! workpiece heat.
//!
//! The heat timeseries spreads each segment's mean power over equal-width
//! time bins in proportion to the time the segment spends in each bin.

use crate::config::{MAX_HEAT_BINS, MIN_HEAT_BINS};
use crate::motion::SegmentTime;
use crate::segment::ToolpathSegment;
use luthcam_core::data::MaterialProfile;
use luthcam_core::error::TimelineError;
use serde::Serialize;

/// Energy of one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SegmentEnergy {
    /// Removed volume in mm³.
    pub volume: f64,
    /// Energy in J.
    pub energy: f64,
    pub chip: f64,
    pub tool: f64,
    pub work: f64,
    /// Running total of `energy` up to and including this segment.
    pub cumulative: f64,
}

/// Time-binned heat power per channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatSeries {
    /// Seconds per bin.
    pub bin_width: f64,
    pub total_time: f64,
    /// Watts per bin.
    pub p_chip: Vec<f64>,
    pub p_tool: Vec<f64>,
    pub p_work: Vec<f64>,
}

impl HeatSeries {
    pub fn bins(&self) -> usize {
        self.p_chip.len()
    }

    pub fn peak_chip(&self) -> f64 {
        peak(&self.p_chip)
    }

    pub fn peak_tool(&self) -> f64 {
        peak(&self.p_tool)
    }

    pub fn peak_work(&self) -> f64 {
        peak(&self.p_work)
    }

    /// Energy recovered from the chip channel (power times bin width).
    pub fn chip_energy(&self) -> f64 {
        self.p_chip.iter().sum::<f64>() * self.bin_width
    }
}

fn peak(values: &[f64]) -> f64 {
    values.iter().copied().fold(0.0, f64::max)
}

/// Energy model for one tool, cut depth and material.
#[derive(Debug, Clone, Copy)]
pub struct EnergyHeatModel<'m> {
    material: &'m MaterialProfile,
    tool_diameter: f64,
    stepover_fraction: f64,
    stepdown: f64,
}

impl<'m> EnergyHeatModel<'m> {
    pub fn new(
        material: &'m MaterialProfile,
        tool_diameter: f64,
        stepover_fraction: f64,
        stepdown: f64,
    ) -> Self {
        Self {
            material,
            tool_diameter,
            stepover_fraction,
            stepdown,
        }
    }

    /// Engaged cross section in mm².
    pub fn cross_section(&self) -> f64 {
        self.stepover_fraction * self.tool_diameter * self.stepdown
    }

    /// Volume removed by a segment; zero for non-cutting moves.
    pub fn volume(&self, segment: &ToolpathSegment) -> f64 {
        if !segment.is_cutting() {
            return 0.0;
        }
        segment.planar_length() * self.cross_section() * segment.engagement_factor
    }

    pub fn compute_energy(&self, segments: &[ToolpathSegment]) -> Vec<SegmentEnergy> {
        let sce = self.material.specific_cutting_energy();
        let mut cumulative = 0.0;
        segments
            .iter()
            .map(|segment| {
                let volume = self.volume(segment);
                let energy = volume * sce;
                cumulative += energy;
                SegmentEnergy {
                    volume,
                    energy,
                    chip: energy * self.material.chip_fraction(),
                    tool: energy * self.material.tool_fraction(),
                    work: energy * self.material.work_fraction(),
                    cumulative,
                }
            })
            .collect()
    }
}

/// Per-segment energy with a running total.
pub fn compute_energy(
    segments: &[ToolpathSegment],
    tool_diameter: f64,
    stepover_fraction: f64,
    stepdown: f64,
    material: &MaterialProfile,
) -> Vec<SegmentEnergy> {
    EnergyHeatModel::new(material, tool_diameter, stepover_fraction, stepdown)
        .compute_energy(segments)
}

/// Bins heat power over the path timeline.
pub fn compute_heat_timeseries(
    energies: &[SegmentEnergy],
    times: &[SegmentTime],
    bins: usize,
) -> Result<HeatSeries, TimelineError> {
    if !(MIN_HEAT_BINS..=MAX_HEAT_BINS).contains(&bins) {
        return Err(TimelineError::BinsOutOfRange {
            bins,
            min: MIN_HEAT_BINS,
            max: MAX_HEAT_BINS,
        });
    }
    if energies.len() != times.len() {
        return Err(TimelineError::LengthMismatch {
            segments: energies.len(),
            times: times.len(),
        });
    }
    let total_time: f64 = times.iter().map(|t| t.time).sum();
    if !total_time.is_finite() || total_time <= 0.0 {
        return Err(TimelineError::DegenerateTimeline);
    }

    let width = total_time / bins as f64;
    let mut series = HeatSeries {
        bin_width: width,
        total_time,
        p_chip: vec![0.0; bins],
        p_tool: vec![0.0; bins],
        p_work: vec![0.0; bins],
    };

    let mut t0 = 0.0;
    for (e, t) in energies.iter().zip(times) {
        let t1 = t0 + t.time;
        if t.time > 0.0 && e.energy > 0.0 {
            let first = ((t0 / width).floor() as usize).min(bins - 1);
            for bin in first..bins {
                let lo = bin as f64 * width;
                if lo >= t1 {
                    break;
                }
                let hi = if bin == bins - 1 { total_time.max(t1) } else { lo + width };
                let overlap = t1.min(hi) - t0.max(lo);
                if overlap <= 0.0 {
                    continue;
                }
                let share = overlap / (t.time * width);
                series.p_chip[bin] += e.chip * share;
                series.p_tool[bin] += e.tool * share;
                series.p_work[bin] += e.work * share;
            }
        }
        t0 = t1;
    }
    Ok(series)
}
