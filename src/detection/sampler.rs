//! Probe-pixel sampling of the schedule grid.

use image::RgbaImage;

use crate::error::ExtractionError;
use crate::geometry::{CoordinateMap, GeometrySpec, Offset};

/// Per-group hourly samples. `true` means the probe pixel read as powered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawStatusVector {
    groups: Vec<(String, Vec<bool>)>,
}

impl RawStatusVector {
    /// States for one group, index = hour.
    pub fn get(&self, group: &str) -> Option<&[bool]> {
        self.groups
            .iter()
            .find(|(label, _)| label == group)
            .map(|(_, states)| states.as_slice())
    }

    /// Groups in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[bool])> {
        self.groups
            .iter()
            .map(|(label, states)| (label.as_str(), states.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Renders the samples as one line per group: 🟩 powered, 🟥 outage.
    pub fn render_grid(&self) -> String {
        let mut out = String::new();
        for (label, states) in self.iter() {
            out.push_str(label);
            out.push(' ');
            for &powered in states {
                out.push(if powered { '🟩' } else { '🟥' });
            }
            out.push('\n');
        }
        out
    }
}

/// Reads the grid at a template offset with a fixed red-channel threshold.
pub struct GridSampler<'a> {
    geometry: &'a GeometrySpec,
    red_threshold: u8,
}

impl<'a> GridSampler<'a> {
    pub fn new(geometry: &'a GeometrySpec, red_threshold: u8) -> Self {
        Self {
            geometry,
            red_threshold,
        }
    }

    /// Samples every (group, hour) probe point.
    ///
    /// A single pixel decides each hour: red channel below the threshold reads
    /// as powered. Any probe outside the image is a calibration defect and
    /// fails the whole sample.
    pub fn sample(&self, img: &RgbaImage, offset: Offset) -> Result<RawStatusVector, ExtractionError> {
        let map = CoordinateMap::build(self.geometry, offset);
        let (width, height) = img.dimensions();

        let mut groups = Vec::with_capacity(self.geometry.group_count());
        for (group_idx, label) in self.geometry.groups.iter().enumerate() {
            let mut states = Vec::with_capacity(self.geometry.hour_count);
            for hour in 0..self.geometry.hour_count {
                let point = map.point(hour, group_idx);
                if point.x >= width || point.y >= height {
                    return Err(ExtractionError::GeometryOutOfBounds {
                        group: label.clone(),
                        hour,
                        x: point.x,
                        y: point.y,
                        width,
                        height,
                    });
                }
                let red = img.get_pixel(point.x, point.y)[0];
                states.push(red < self.red_threshold);
            }
            groups.push((label.clone(), states));
        }

        Ok(RawStatusVector { groups })
    }
}
