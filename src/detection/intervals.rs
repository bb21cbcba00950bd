//! Run-length compression of hourly power states into on/off intervals.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IntervalError;
use crate::geometry::HOURS_PER_DAY;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn from_powered(powered: bool) -> Self {
        if powered { PowerState::On } else { PowerState::Off }
    }

    pub fn is_on(self) -> bool {
        self == PowerState::On
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PowerState::On => "on",
            PowerState::Off => "off",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous span of hours `[start_hour, end_hour)` in one power state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct OnOffInterval {
    state: PowerState,
    start_hour: u8,
    end_hour: u8,
}

#[derive(Deserialize)]
struct RawInterval {
    state: PowerState,
    start_hour: u8,
    end_hour: u8,
}

impl TryFrom<RawInterval> for OnOffInterval {
    type Error = IntervalError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        OnOffInterval::new(raw.state, raw.start_hour, raw.end_hour)
    }
}

impl OnOffInterval {
    pub fn new(state: PowerState, start_hour: u8, end_hour: u8) -> Result<Self, IntervalError> {
        if end_hour as usize > HOURS_PER_DAY || start_hour >= end_hour {
            return Err(IntervalError {
                start_hour,
                end_hour,
            });
        }
        Ok(Self {
            state,
            start_hour,
            end_hour,
        })
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u8 {
        self.end_hour
    }

    pub fn len(&self) -> usize {
        (self.end_hour - self.start_hour) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `hour` falls inside `[start_hour, end_hour)`.
    pub fn contains(&self, hour: u8) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

impl fmt::Display for OnOffInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:00 - {}:00", self.start_hour, self.end_hour)
    }
}

/// Compresses per-hour states (`true` = powered) into ordered intervals.
///
/// Keeps a reference hour and state, closes an interval each time the state
/// changes, and closes the last one at the end of the day. A vector with no
/// change yields one full-day interval. At most 24 hours are accepted.
pub fn compress(states: &[bool]) -> Vec<OnOffInterval> {
    debug_assert!(states.len() <= HOURS_PER_DAY);
    let Some(&first) = states.first() else {
        return Vec::new();
    };

    let mut intervals = Vec::new();
    let mut reference_hour = 0usize;
    let mut reference_state = first;

    for (hour, &state) in states.iter().enumerate().skip(1) {
        if state != reference_state {
            intervals.push(OnOffInterval {
                state: PowerState::from_powered(reference_state),
                start_hour: reference_hour as u8,
                end_hour: hour as u8,
            });
            reference_hour = hour;
            reference_state = state;
        }
    }

    intervals.push(OnOffInterval {
        state: PowerState::from_powered(reference_state),
        start_hour: reference_hour as u8,
        end_hour: states.len() as u8,
    });

    intervals
}

/// Expands intervals back into per-hour states.
pub fn expand(intervals: &[OnOffInterval]) -> Vec<bool> {
    intervals
        .iter()
        .flat_map(|interval| std::iter::repeat_n(interval.state.is_on(), interval.len()))
        .collect()
}

/// True if the intervals are ascending, contiguous, and cover `[0, 24)` exactly.
pub fn partitions_day(intervals: &[OnOffInterval]) -> bool {
    let mut expected_start = 0u8;
    for interval in intervals {
        if interval.start_hour != expected_start || interval.end_hour <= interval.start_hour {
            return false;
        }
        expected_start = interval.end_hour;
    }
    expected_start as usize == HOURS_PER_DAY
}
