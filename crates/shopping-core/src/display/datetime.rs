//! Timestamp rendering for human-facing output.

use std::fmt;

use jiff::{tz::TimeZone, Timestamp};

const FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Renders a stored timestamp in a chosen zone, local time by default.
pub struct ZonedStamp<'a> {
    at: &'a Timestamp,
    zone: TimeZone,
}

impl<'a> ZonedStamp<'a> {
    pub fn local(at: &'a Timestamp) -> Self {
        Self {
            at,
            zone: TimeZone::system(),
        }
    }

    pub fn utc(at: &'a Timestamp) -> Self {
        Self {
            at,
            zone: TimeZone::UTC,
        }
    }
}

impl fmt::Display for ZonedStamp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zoned = self.at.to_zoned(self.zone.clone());
        write!(f, "{}", zoned.strftime(FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_rendering() {
        let at: Timestamp = "2024-03-05T07:08:09Z".parse().expect("valid timestamp");
        assert_eq!(ZonedStamp::utc(&at).to_string(), "2024-03-05 07:08:09 UTC");
    }
}
