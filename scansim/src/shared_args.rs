//! Argument types shared by the command-line tools

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A span of time given on the command line in humantime form (`90s`,
/// `45m`, `24h`, `2days`, `1h 30m`) or as a bare number of seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationArg(pub f64);

impl DurationArg {
    pub fn seconds(&self) -> f64 {
        self.0
    }
}

impl FromStr for DurationArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let seconds = match s.parse::<f64>() {
            Ok(value) => value,
            Err(_) => humantime::parse_duration(s)
                .map_err(|e| format!("Invalid duration '{s}': {e}"))?
                .as_secs_f64(),
        };
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(format!("Duration must be positive, got '{s}'"));
        }
        Ok(DurationArg(seconds))
    }
}

impl fmt::Display for DurationArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Duration::try_from_secs_f64(self.0) {
            Ok(duration) => write!(f, "{}", humantime::format_duration(duration)),
            Err(_) => write!(f, "{}s", self.0),
        }
    }
}

/// Parse a site given as `spole`, `atacama` or `LAT,LON` in degrees.
pub fn parse_site(s: &str) -> Result<crate::hardware::Site, String> {
    crate::hardware::Site::from_name(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_durations() {
        assert_eq!("24h".parse::<DurationArg>().unwrap().seconds(), 86_400.0);
        assert_eq!("90m".parse::<DurationArg>().unwrap().seconds(), 5400.0);
        assert_eq!("2days".parse::<DurationArg>().unwrap().seconds(), 172_800.0);
        assert_eq!("30s".parse::<DurationArg>().unwrap().seconds(), 30.0);
        assert_eq!(" 120 ".parse::<DurationArg>().unwrap().seconds(), 120.0);
        assert_eq!("2.5".parse::<DurationArg>().unwrap().seconds(), 2.5);
    }

    #[test]
    fn test_parse_compound_durations() {
        assert_eq!("1h30m".parse::<DurationArg>().unwrap().seconds(), 5400.0);
        assert_eq!("1h 30m".parse::<DurationArg>().unwrap().seconds(), 5400.0);
        assert_eq!("1d 2h".parse::<DurationArg>().unwrap().seconds(), 93_600.0);
        assert_eq!("1s 500ms".parse::<DurationArg>().unwrap().seconds(), 1.5);
    }

    #[test]
    fn test_reject_bad_durations() {
        assert!("".parse::<DurationArg>().is_err());
        assert!("h".parse::<DurationArg>().is_err());
        assert!("-3h".parse::<DurationArg>().is_err());
        assert!("0s".parse::<DurationArg>().is_err());
        assert!("0".parse::<DurationArg>().is_err());
        assert!("ten minutes".parse::<DurationArg>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DurationArg(86_400.0).to_string(), "1day");
        assert_eq!(DurationArg(7200.0).to_string(), "2h");
        assert_eq!(DurationArg(5400.0).to_string(), "1h 30m");
        assert_eq!(DurationArg(1.5).to_string(), "1s 500ms");
        let shown = DurationArg(5400.0).to_string();
        assert_eq!(shown.parse::<DurationArg>().unwrap().seconds(), 5400.0);
    }

    #[test]
    fn test_parse_site() {
        assert!(parse_site("spole").is_ok());
        assert!(parse_site("-30.0,21.4").is_ok());
        assert!(parse_site("moon").is_err());
    }
}
