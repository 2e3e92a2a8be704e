// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Wait timeouts

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, WaitError};

const MICROS_PER_SEC: i64 = 1_000_000;

/// How long a wait may block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// Block until something is ready or a signal arrives
    #[default]
    Indefinite,
    /// A total number of microseconds
    Micros(i64),
    /// Whole seconds plus microseconds
    SecsMicros { secs: i64, micros: i64 },
}

impl Timeout {
    /// Don't block at all
    pub const ZERO: Timeout = Timeout::Micros(0);

    /// Validated `timeval` for the OS call; `None` for [`Timeout::Indefinite`]
    ///
    /// A microsecond part of one second or more is carried into the seconds.
    pub fn to_timeval(self) -> Result<Option<libc::timeval>> {
        let (secs, micros) = match self {
            Timeout::Indefinite => return Ok(None),
            Timeout::Micros(micros) if micros < 0 => return Err(self.negative()),
            Timeout::Micros(micros) => (micros / MICROS_PER_SEC, micros % MICROS_PER_SEC),
            Timeout::SecsMicros { secs, micros } if secs < 0 || micros < 0 => {
                return Err(self.negative());
            }
            Timeout::SecsMicros { secs, micros } => (
                secs.saturating_add(micros / MICROS_PER_SEC),
                micros % MICROS_PER_SEC,
            ),
        };
        Ok(Some(libc::timeval {
            tv_sec: libc::time_t::try_from(secs).unwrap_or(libc::time_t::MAX),
            tv_usec: micros as libc::suseconds_t,
        }))
    }

    fn negative(self) -> WaitError {
        WaitError::NegativeTimeout {
            value: self.to_string(),
        }
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeout::Indefinite => write!(f, "none"),
            Timeout::Micros(micros) => write!(f, "{}us", micros),
            Timeout::SecsMicros { secs, micros } => write!(f, "({} {})", secs, micros),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::SecsMicros {
            secs: i64::try_from(duration.as_secs()).unwrap_or(i64::MAX),
            micros: i64::from(duration.subsec_micros()),
        }
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(Timeout::Indefinite, Timeout::from)
    }
}

/// Accepts `none`, `<micros>`, `<secs>,<micros>` and `<secs>:<micros>`
///
/// Negative numbers parse; they are rejected when the timeout is used.
impl FromStr for Timeout {
    type Err = WaitError;

    fn from_str(text: &str) -> Result<Self> {
        let malformed = || WaitError::MalformedTimeout {
            text: text.to_string(),
        };
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Timeout::Indefinite);
        }
        match trimmed.split_once([',', ':']) {
            Some((secs, micros)) => Ok(Timeout::SecsMicros {
                secs: secs.trim().parse().map_err(|_| malformed())?,
                micros: micros.trim().parse().map_err(|_| malformed())?,
            }),
            None => trimmed.parse().map(Timeout::Micros).map_err(|_| malformed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(timeout: Timeout) -> Option<(i64, i64)> {
        timeout
            .to_timeval()
            .unwrap()
            .map(|tv| (tv.tv_sec as i64, tv.tv_usec as i64))
    }

    #[test]
    fn test_indefinite_has_no_timeval() {
        assert_eq!(parts(Timeout::Indefinite), None);
    }

    #[test]
    fn test_micros_split_into_seconds() {
        assert_eq!(parts(Timeout::Micros(0)), Some((0, 0)));
        assert_eq!(parts(Timeout::Micros(2_500_000)), Some((2, 500_000)));
    }

    #[test]
    fn test_large_micros_carried() {
        assert_eq!(
            parts(Timeout::SecsMicros { secs: 1, micros: 1_250_000 }),
            Some((2, 250_000))
        );
    }

    #[test]
    fn test_negative_components_rejected() {
        for timeout in [
            Timeout::Micros(-1),
            Timeout::SecsMicros { secs: -1, micros: 0 },
            Timeout::SecsMicros { secs: 0, micros: -5 },
        ] {
            assert!(matches!(
                timeout.to_timeval(),
                Err(WaitError::NegativeTimeout { .. })
            ));
        }
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!("none".parse::<Timeout>().unwrap(), Timeout::Indefinite);
        assert_eq!("1500".parse::<Timeout>().unwrap(), Timeout::Micros(1500));
        assert_eq!(
            "3,20".parse::<Timeout>().unwrap(),
            Timeout::SecsMicros { secs: 3, micros: 20 }
        );
        assert_eq!(
            "0:-1".parse::<Timeout>().unwrap(),
            Timeout::SecsMicros { secs: 0, micros: -1 }
        );
        assert!(matches!(
            "soon".parse::<Timeout>(),
            Err(WaitError::MalformedTimeout { .. })
        ));
    }

    #[test]
    fn test_from_duration() {
        assert_eq!(
            Timeout::from(Duration::from_millis(1500)),
            Timeout::SecsMicros { secs: 1, micros: 500_000 }
        );
        assert_eq!(Timeout::from(None::<Duration>), Timeout::Indefinite);
    }
}
