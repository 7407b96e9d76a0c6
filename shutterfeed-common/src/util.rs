use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::UtcDateTime;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// A point in time as fractional unix seconds, the representation posts are
/// persisted with.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Default, Error)]
#[error("The timestamp does not name a representable point in time: {0}")]
pub struct InvalidTimestampError(f64);

impl Timestamp {
    #[must_use]
    pub fn now() -> Self {
        Self::from_date_time(UtcDateTime::now())
    }

    #[must_use]
    pub fn from_unix_seconds(seconds: f64) -> Self {
        Self(seconds)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_date_time(date_time: UtcDateTime) -> Self {
        let whole = date_time.unix_timestamp() as f64;
        let fraction = f64::from(date_time.nanosecond()) / NANOS_PER_SECOND;
        Self(whole + fraction)
    }

    #[must_use]
    pub fn unix_seconds(self) -> f64 {
        self.0
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn to_date_time(self) -> Result<UtcDateTime, InvalidTimestampError> {
        if !self.0.is_finite() {
            return Err(InvalidTimestampError(self.0));
        }

        let nanos = (self.0 * NANOS_PER_SECOND).round() as i128;
        UtcDateTime::from_unix_timestamp_nanos(nanos).map_err(|_| InvalidTimestampError(self.0))
    }
}

impl From<UtcDateTime> for Timestamp {
    fn from(value: UtcDateTime) -> Self {
        Self::from_date_time(value)
    }
}

impl TryFrom<Timestamp> for UtcDateTime {
    type Error = InvalidTimestampError;

    fn try_from(value: Timestamp) -> Result<Self, Self::Error> {
        value.to_date_time()
    }
}
