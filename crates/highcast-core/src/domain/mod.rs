//! Domain types shared across the fetch, feature, and prediction layers.

mod observation;
mod timestamp;

pub use observation::{Observation, ObservationOverrides};
pub use timestamp::{
    format_calendar_date, parse_calendar_date, today_utc, UtcDateTime,
};
