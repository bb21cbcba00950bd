//! Static layout of the published schedule grid.
//!
//! A template is described by cell sizes, the group labels, the two-table
//! split, and an ordered registry of calibration entries. Each entry pairs
//! the pixel box where the template prints its date with the grid offset
//! that template uses. Supporting a new template means appending an entry.

pub mod coords;

pub use coords::{CoordinateMap, ProbePoint};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Number of hourly slots in one day.
pub const HOURS_PER_DAY: usize = 24;

/// A pixel rectangle. `right` and `bottom` are exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Clamps the rectangle to an image of the given size.
    /// Returns `None` when nothing of it lies inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<PixelRect> {
        let clamped = PixelRect {
            left: self.left.min(width),
            top: self.top.min(height),
            right: self.right.min(width),
            bottom: self.bottom.min(height),
        };
        if clamped.is_empty() { None } else { Some(clamped) }
    }
}

/// Pixel position of the first probe point (hour 0, first group).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub x: u32,
    pub y: u32,
}

/// One known template: where its date is printed and where its grid starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// Short label used in logs and previews.
    pub name: String,
    /// Box expected to contain the `dd.mm.yyyy` date on this template.
    pub anchor: PixelRect,
    pub offset: Offset,
}

/// Grid geometry shared by all templates plus the calibration registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySpec {
    /// Horizontal distance between hour columns
    pub column_width: u32,
    /// Vertical distance between group rows
    pub row_height: u32,
    /// Number of hourly columns (always 24)
    pub hour_count: usize,
    /// Group labels in row order
    pub groups: Vec<String>,
    /// First hour drawn in the second (lower) table
    pub split_index: usize,
    /// Vertical shift of the second table relative to the first
    pub table_delta: u32,
    /// Templates in priority order; the first one whose anchor date parses wins
    pub calibrations: Vec<CalibrationEntry>,
    /// Box holding the prose date on a "no outages" announcement
    pub no_outage_date_box: PixelRect,
}

impl Default for GeometrySpec {
    fn default() -> Self {
        Self {
            column_width: 58,
            row_height: 43,
            hour_count: HOURS_PER_DAY,
            groups: ["1.1", "1.2", "2.1", "2.2", "3.1", "3.2"]
                .iter()
                .map(|g| g.to_string())
                .collect(),
            split_index: 12,
            table_delta: 335,
            calibrations: vec![
                CalibrationEntry {
                    name: "current".to_string(),
                    anchor: PixelRect::new(282, 42, 439, 79),
                    offset: Offset { x: 146, y: 244 },
                },
                // Earlier layout: the whole sheet sat 42px left and 42px lower.
                CalibrationEntry {
                    name: "shifted-header".to_string(),
                    anchor: PixelRect::new(240, 84, 397, 121),
                    offset: Offset { x: 104, y: 286 },
                },
            ],
            no_outage_date_box: PixelRect::new(60, 150, 1020, 230),
        }
    }
}

impl GeometrySpec {
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of probe points a coordinate map for this geometry must contain.
    pub fn probe_count(&self) -> usize {
        self.hour_count * self.group_count()
    }

    /// Bottom-right probe point of the grid at `offset`, or `None` if it
    /// does not fit in `u32` pixel coordinates.
    pub fn grid_extent(&self, offset: Offset) -> Option<(u32, u32)> {
        let columns = self.split_index.min(self.hour_count).max(1);
        let last_column = u32::try_from(columns - 1).ok()?;
        let last_row = u32::try_from(self.group_count().max(1) - 1).ok()?;
        let table_shift = if self.split_index < self.hour_count {
            self.table_delta
        } else {
            0
        };

        let x = offset.x.checked_add(self.column_width.checked_mul(last_column)?)?;
        let y = offset
            .y
            .checked_add(self.row_height.checked_mul(last_row)?)?
            .checked_add(table_shift)?;
        Some((x, y))
    }

    /// Checks invariants that a hand-edited config.json could break.
    pub fn validate(&self) -> Result<()> {
        if self.hour_count != HOURS_PER_DAY {
            return Err(anyhow!(
                "hour_count must be {}, got {}",
                HOURS_PER_DAY,
                self.hour_count
            ));
        }
        if self.groups.is_empty() {
            return Err(anyhow!("at least one group label is required"));
        }
        if self.split_index == 0 || self.split_index > self.hour_count {
            return Err(anyhow!(
                "split_index must be within 1..={}, got {}",
                self.hour_count,
                self.split_index
            ));
        }
        if self.calibrations.is_empty() {
            return Err(anyhow!("calibration registry is empty"));
        }
        for entry in &self.calibrations {
            if entry.anchor.is_empty() {
                return Err(anyhow!(
                    "calibration '{}' has an empty anchor box",
                    entry.name
                ));
            }
            if self.grid_extent(entry.offset).is_none() {
                return Err(anyhow!(
                    "calibration '{}' places the grid beyond pixel coordinate {}",
                    entry.name,
                    u32::MAX
                ));
            }
        }
        if self.no_outage_date_box.is_empty() {
            return Err(anyhow!("no_outage_date_box is empty"));
        }
        Ok(())
    }
}
