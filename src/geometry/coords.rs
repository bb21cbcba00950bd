//! Probe-point grid generation.
//!
//! Converts a calibration offset into one pixel coordinate per (hour, group).
//! Hours at or past the split are drawn in a second table lower on the page,
//! reusing the first table's columns.

use super::{GeometrySpec, Offset};

/// A single pixel sampled for one group at one hour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbePoint {
    pub x: u32,
    pub y: u32,
}

/// All probe points for one image, ordered hour-major: index = hour * groups + group.
#[derive(Clone, Debug)]
pub struct CoordinateMap {
    points: Vec<ProbePoint>,
    group_count: usize,
}

impl CoordinateMap {
    /// Builds the probe grid for a template offset.
    pub fn build(geometry: &GeometrySpec, offset: Offset) -> Self {
        let group_count = geometry.group_count();
        let mut points = Vec::with_capacity(geometry.probe_count());

        // validate() rejects a zero split; treat it as 1 rather than divide by zero
        let split = geometry.split_index.max(1);

        // Saturating arithmetic: a point that overflows lands outside every
        // image and is reported by the sampler as out of bounds.
        for hour in 0..geometry.hour_count {
            let in_second_table = hour >= split;
            let column = (hour % split) as u32;
            let table_shift = if in_second_table {
                geometry.table_delta
            } else {
                0
            };

            for group in 0..group_count {
                points.push(ProbePoint {
                    x: offset
                        .x
                        .saturating_add(geometry.column_width.saturating_mul(column)),
                    y: offset
                        .y
                        .saturating_add(geometry.row_height.saturating_mul(group as u32))
                        .saturating_add(table_shift),
                });
            }
        }

        Self {
            points,
            group_count,
        }
    }

    /// Probe point for a given hour and group index.
    pub fn point(&self, hour: usize, group: usize) -> ProbePoint {
        self.points[hour * self.group_count + group]
    }

    pub fn points(&self) -> &[ProbePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
