//! Time window resolution
//!
//! Requests name either an instant (`time`) or a range (`start`, `end`,
//! `step`). Namespace-scoped queries are additionally clamped to the
//! namespace's creation time so that ranges never reach back before the
//! resource existed.

use crate::error::MonitoringError;
use crate::models::MetricType;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Step used for range queries that do not name one
pub fn default_range_step() -> Duration {
    Duration::minutes(10)
}

/// Evaluation window of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Instant(DateTime<Utc>),
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    },
}

/// Result of clamping a window to a resource's creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clamp {
    /// The (possibly narrowed) window still overlaps the resource's lifetime
    Hit(TimeWindow),
    /// The window lies entirely before the resource existed
    NoHit,
}

impl TimeWindow {
    /// Resolve raw time parameters into a window
    ///
    /// `time` selects an instant, `start` and `end` together select a range.
    /// With none of them the window is the instant `now`. `default_step`
    /// applies to ranges without an explicit `step`.
    pub fn resolve(
        time: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        step: Option<&str>,
        now: DateTime<Utc>,
        default_step: Duration,
    ) -> Result<Self, MonitoringError> {
        match (time, start, end) {
            (None, None, None) => Ok(TimeWindow::Instant(now)),
            (Some(time), None, None) => Ok(TimeWindow::Instant(parse_unix_time("time", time)?)),
            (None, Some(start), Some(end)) => {
                let start = parse_unix_time("start", start)?;
                let end = parse_unix_time("end", end)?;
                if start > end {
                    return Err(MonitoringError::InvalidStartEnd);
                }
                let step = match step {
                    Some(raw) => parse_duration("step", raw)?,
                    None => default_step,
                };
                Ok(TimeWindow::Range { start, end, step })
            }
            _ => Err(MonitoringError::ParamConflict),
        }
    }

    pub fn metric_type(&self) -> MetricType {
        match self {
            TimeWindow::Instant(_) => MetricType::Vector,
            TimeWindow::Range { .. } => MetricType::Matrix,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, TimeWindow::Range { .. })
    }

    /// Clamp the window to a resource created at `created`
    ///
    /// A range whose start precedes `created` is moved forward in whole
    /// steps from `end`, keeping the earliest point strictly after
    /// `created`. The end is never changed.
    pub fn clamp_to_creation(self, created: DateTime<Utc>) -> Clamp {
        match self {
            TimeWindow::Instant(at) if at < created => Clamp::NoHit,
            TimeWindow::Instant(_) => Clamp::Hit(self),
            TimeWindow::Range { end, .. } if end < created => Clamp::NoHit,
            TimeWindow::Range { start, end, step } if start < created => {
                let diff_ms = (end - created).num_milliseconds();
                let step_ms = step.num_milliseconds().max(1);
                let steps = if diff_ms == 0 { 0 } else { (diff_ms - 1) / step_ms };
                Clamp::Hit(TimeWindow::Range {
                    start: end - Duration::milliseconds(steps * step_ms),
                    end,
                    step,
                })
            }
            TimeWindow::Range { .. } => Clamp::Hit(self),
        }
    }
}

/// Parse a unix timestamp in seconds, with an optional fractional part
pub fn parse_unix_time(param: &'static str, raw: &str) -> Result<DateTime<Utc>, MonitoringError> {
    let raw = raw.trim();
    let invalid = || MonitoringError::parse(param, format!("{raw:?} is not a unix timestamp"));

    let (secs, nanos) = if let Ok(secs) = raw.parse::<i64>() {
        (secs, 0)
    } else {
        let value: f64 = raw.parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        let secs = value.trunc();
        let nanos = ((value - secs) * 1e9).round() as u32;
        (secs as i64, nanos.min(999_999_999))
    };

    Utc.timestamp_opt(secs, nanos).single().ok_or_else(invalid)
}

/// Parse a duration such as `10m`, `1h30m`, `500ms` or a plain seconds count
pub fn parse_duration(param: &'static str, raw: &str) -> Result<Duration, MonitoringError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MonitoringError::parse(param, "empty duration"));
    }

    let duration = if let Ok(secs) = raw.parse::<f64>() {
        if !secs.is_finite() {
            return Err(MonitoringError::parse(param, format!("{raw:?} is not finite")));
        }
        let ms = (secs * 1000.0).round();
        if ms <= 0.0 {
            return Err(MonitoringError::parse(param, "duration must be positive"));
        }
        // i64::MAX is not exactly representable; anything at or above it overflows
        if ms >= i64::MAX as f64 {
            return Err(MonitoringError::parse(param, format!("{raw:?} is too large")));
        }
        Duration::milliseconds(ms as i64)
    } else {
        parse_duration_units(raw)
            .ok_or_else(|| MonitoringError::parse(param, format!("{raw:?} is not a duration")))?
    };

    if duration <= Duration::zero() {
        return Err(MonitoringError::parse(param, "duration must be positive"));
    }
    Ok(duration)
}

fn parse_duration_units(raw: &str) -> Option<Duration> {
    let mut total_ms: i64 = 0;
    let mut rest = raw;

    while !rest.is_empty() {
        let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        let amount: i64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.bytes().take_while(|b| b.is_ascii_alphabetic()).count();
        let unit_ms: i64 = match &rest[..unit_len] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            "w" => 604_800_000,
            "y" => 31_536_000_000,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total_ms = total_ms.checked_add(amount.checked_mul(unit_ms)?)?;
    }

    Some(Duration::milliseconds(total_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn resolve(
        time: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        step: Option<&str>,
    ) -> Result<TimeWindow, MonitoringError> {
        TimeWindow::resolve(time, start, end, step, ts(1_600_000_000), default_range_step())
    }

    #[test]
    fn test_resolve_defaults_to_now() {
        assert_eq!(
            resolve(None, None, None, None).unwrap(),
            TimeWindow::Instant(ts(1_600_000_000))
        );
    }

    #[test]
    fn test_resolve_instant_and_range() {
        assert_eq!(
            resolve(Some("1585836666"), None, None, None).unwrap(),
            TimeWindow::Instant(ts(1585836666))
        );

        let window = resolve(None, Some("1585830000"), Some("1585839999"), None).unwrap();
        assert_eq!(
            window,
            TimeWindow::Range {
                start: ts(1585830000),
                end: ts(1585839999),
                step: Duration::minutes(10),
            }
        );
        assert_eq!(window.metric_type(), MetricType::Matrix);
    }

    #[test]
    fn test_resolve_conflicts() {
        let err = resolve(Some("1585831995"), Some("1585830000"), None, None).unwrap_err();
        assert!(matches!(err, MonitoringError::ParamConflict));

        let err = resolve(None, None, Some("1585830000"), None).unwrap_err();
        assert!(matches!(err, MonitoringError::ParamConflict));
    }

    #[test]
    fn test_resolve_start_after_end() {
        let err = resolve(None, Some("1585839999"), Some("1585830000"), None).unwrap_err();
        assert!(matches!(err, MonitoringError::InvalidStartEnd));
    }

    #[test]
    fn test_resolve_parse_errors() {
        let err = resolve(Some("yesterday"), None, None, None).unwrap_err();
        assert!(matches!(err, MonitoringError::Parse { param: "time", .. }));

        let err = resolve(None, Some("1"), Some("2"), Some("0s")).unwrap_err();
        assert!(matches!(err, MonitoringError::Parse { param: "step", .. }));
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("step", "10m").unwrap(), Duration::minutes(10));
        assert_eq!(
            parse_duration("step", "1h30m").unwrap(),
            Duration::minutes(90)
        );
        assert_eq!(
            parse_duration("step", "500ms").unwrap(),
            Duration::milliseconds(500)
        );
        assert_eq!(parse_duration("step", "90").unwrap(), Duration::seconds(90));
        assert!(parse_duration("step", "10x").is_err());
        assert!(parse_duration("step", "h").is_err());
        assert!(parse_duration("step", "-5").is_err());
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        for raw in ["-1e30", "1e300", "1e16", "0.0001"] {
            let err = parse_duration("step", raw).unwrap_err();
            assert!(
                matches!(err, MonitoringError::Parse { param: "step", .. }),
                "{raw} should be a parse error"
            );
        }
        assert_eq!(
            parse_duration("step", "1e9").unwrap(),
            Duration::seconds(1_000_000_000)
        );
    }

    #[test]
    fn test_resolve_rejects_huge_step() {
        let err = resolve(None, Some("1"), Some("2"), Some("-1e30")).unwrap_err();
        assert!(matches!(err, MonitoringError::Parse { param: "step", .. }));
    }

    #[test]
    fn test_parse_fractional_unix_time() {
        let t = parse_unix_time("time", "1585836666.5").unwrap();
        assert_eq!(t.timestamp(), 1585836666);
        assert_eq!(t.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_instant_before_creation_is_no_hit() {
        let window = TimeWindow::Instant(ts(1585830000));
        assert_eq!(window.clamp_to_creation(ts(1585836666)), Clamp::NoHit);

        let window = TimeWindow::Instant(ts(1585836666));
        assert_eq!(window.clamp_to_creation(ts(1585836666)), Clamp::Hit(window));
    }

    #[test]
    fn test_range_start_moves_to_creation_boundary() {
        let window = TimeWindow::Range {
            start: ts(1585830000),
            end: ts(1585839999),
            step: Duration::minutes(1),
        };
        assert_eq!(
            window.clamp_to_creation(ts(1585836666)),
            Clamp::Hit(TimeWindow::Range {
                start: ts(1585836699),
                end: ts(1585839999),
                step: Duration::minutes(1),
            })
        );
    }

    #[test]
    fn test_range_clamp_edges() {
        let before = TimeWindow::Range {
            start: ts(100),
            end: ts(200),
            step: Duration::seconds(10),
        };
        assert_eq!(before.clamp_to_creation(ts(300)), Clamp::NoHit);

        let inside = TimeWindow::Range {
            start: ts(400),
            end: ts(500),
            step: Duration::seconds(10),
        };
        assert_eq!(inside.clamp_to_creation(ts(300)), Clamp::Hit(inside));

        // end exactly at creation collapses to a single point
        let touching = TimeWindow::Range {
            start: ts(100),
            end: ts(300),
            step: Duration::seconds(10),
        };
        assert_eq!(
            touching.clamp_to_creation(ts(300)),
            Clamp::Hit(TimeWindow::Range {
                start: ts(300),
                end: ts(300),
                step: Duration::seconds(10),
            })
        );

        // a step that divides the gap evenly stays strictly after creation
        let even = TimeWindow::Range {
            start: ts(100),
            end: ts(400),
            step: Duration::seconds(50),
        };
        assert_eq!(
            even.clamp_to_creation(ts(300)),
            Clamp::Hit(TimeWindow::Range {
                start: ts(350),
                end: ts(400),
                step: Duration::seconds(50),
            })
        );
    }
}
