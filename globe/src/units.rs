//! Timestamp and duration quantities used by the frame loop

use std::ops::{Add, AddAssign, Mul, Sub};

use serde::Serialize;
use tletypes::prelude::UtcTimestamp;

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_JULIAN_YEAR: f64 = 365.25;
const UNIX_EPOCH_JULIAN_DATE: f64 = 2_440_587.5;
const J2000_JULIAN_DATE: f64 = 2_451_545.0;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct Timestamp {
    utc: UtcTimestamp,
}

impl std::fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.utc)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.utc)
    }
}

impl Timestamp {
    pub fn epoch() -> Timestamp {
        Timestamp::from_utc(UtcTimestamp::default())
    }

    pub fn from_utc(utc: UtcTimestamp) -> Timestamp {
        Timestamp { utc }
    }

    pub fn as_utc(&self) -> &UtcTimestamp {
        &self.utc
    }

    /// Seconds since the Unix epoch, fractional
    pub fn as_unix_secs(&self) -> f64 {
        self.utc.timestamp() as f64 + f64::from(self.utc.timestamp_subsec_nanos()) * 1e-9
    }

    pub fn as_julian_date(&self) -> f64 {
        self.as_unix_secs() / SECONDS_PER_DAY + UNIX_EPOCH_JULIAN_DATE
    }

    /// Julian years since 2000-01-01 12:00 UTC
    pub fn as_j2000_years(&self) -> f64 {
        (self.as_julian_date() - J2000_JULIAN_DATE) / DAYS_PER_JULIAN_YEAR
    }
}

impl std::str::FromStr for Timestamp {
    type Err = chrono::ParseError;

    /// RFC 3339, e.g. `2008-09-20T12:25:40Z`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = chrono::DateTime::parse_from_rfc3339(s.trim())?;
        Ok(Timestamp::from_utc(t.with_timezone(&chrono::Utc)))
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Time;

    fn sub(self, rhs: Timestamp) -> Self::Output {
        Time::from_chrono_duration(*self.as_utc() - *rhs.as_utc())
    }
}

impl Add<Time> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Time) -> Self::Output {
        let mut ts = self;
        ts += rhs;
        ts
    }
}

impl AddAssign<Time> for Timestamp {
    fn add_assign(&mut self, rhs: Time) {
        self.utc += chrono::Duration::nanoseconds(rhs.as_nanos());
    }
}

#[derive(Copy, Clone, PartialEq, PartialOrd, Default)]
pub struct Time {
    seconds: f64,
}

impl std::fmt::Debug for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} s", self.seconds)
    }
}

impl Time {
    pub fn from_chrono_duration(duration: chrono::Duration) -> Time {
        match duration.num_nanoseconds() {
            Some(nanos) => Time::from_secs(nanos as f64 / 1_000_000_000.0),
            None => Time::from_millis(duration.num_milliseconds() as f64),
        }
    }

    pub fn from_std_duration(duration: std::time::Duration) -> Time {
        Time::from_secs(duration.as_secs_f64())
    }

    pub fn from_minutes(minutes: f64) -> Time {
        Self::from_secs(minutes * 60.0)
    }

    pub fn from_secs(seconds: f64) -> Time {
        Time { seconds }
    }

    pub fn from_millis(millis: f64) -> Time {
        Time {
            seconds: millis / 1000.0,
        }
    }

    pub fn as_secs(&self) -> f64 {
        self.seconds
    }

    pub fn as_minutes(&self) -> f64 {
        self.seconds / 60.0
    }

    pub fn as_millis(&self) -> f64 {
        self.seconds * 1_000.0
    }

    pub fn as_nanos(&self) -> i64 {
        (self.seconds * 1_000_000_000.0) as i64
    }
}

impl Add<Time> for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Self::Output {
        Time::from_secs(self.as_secs() + rhs.as_secs())
    }
}

impl Sub<Time> for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Self::Output {
        Time::from_secs(self.as_secs() - rhs.as_secs())
    }
}

impl Mul<f64> for Time {
    type Output = Time;

    fn mul(self, rhs: f64) -> Self::Output {
        Time::from_secs(self.as_secs() * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn j2000_reference() {
        let t: Timestamp = "2000-01-01T12:00:00Z".parse().unwrap();
        assert_relative_eq!(t.as_julian_date(), J2000_JULIAN_DATE);
        assert_relative_eq!(t.as_j2000_years(), 0.0);

        let t: Timestamp = "2001-01-01T18:00:00Z".parse().unwrap();
        assert_relative_eq!(t.as_j2000_years(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn arithmetic() {
        let t0: Timestamp = "2024-03-01T00:00:00Z".parse().unwrap();
        let t1 = t0 + Time::from_minutes(90.0);
        assert_relative_eq!((t1 - t0).as_minutes(), 90.0);
        assert_relative_eq!((t0 - t1).as_secs(), -5400.0);
        assert_eq!(t1.to_string(), "2024-03-01 01:30:00 UTC");
        assert_relative_eq!((Time::from_secs(2.0) * 1.5).as_millis(), 3000.0);
    }

    #[test]
    fn rfc3339_offsets_normalize_to_utc() {
        let a: Timestamp = "2024-03-01T02:00:00+02:00".parse().unwrap();
        let b: Timestamp = "2024-03-01T00:00:00Z".parse().unwrap();
        assert_eq!(a, b);
        assert!("yesterday".parse::<Timestamp>().is_err());
    }
}
