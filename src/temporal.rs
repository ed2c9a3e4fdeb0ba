// ⏰ Match Time Model
// "Time must be explicit"
//
// Three clocks exist for one event:
// 1. Period clock: the vendor `timestamp`, restarting at 00:00 every period
// 2. Match clock: minute/second as shown on a broadcast ("47:12" in stoppage time)
// 3. Normalized time: one monotonic millisecond axis across all periods
//
// Only (3) is safe for ordering: the match clock of first-half stoppage time
// overlaps the start of the second half.

use crate::source::SourceEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// PERIOD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    FirstHalf,
    SecondHalf,
    FirstHalfExtratime,
    SecondHalfExtratime,
    Shootout,
    Unknown,
}

impl Period {
    pub fn from_source(period: u8) -> Self {
        match period {
            1 => Period::FirstHalf,
            2 => Period::SecondHalf,
            3 => Period::FirstHalfExtratime,
            4 => Period::SecondHalfExtratime,
            5 => Period::Shootout,
            _ => Period::Unknown,
        }
    }

    /// CDF period name
    pub fn name(&self) -> &'static str {
        match self {
            Period::FirstHalf => "first_half",
            Period::SecondHalf => "second_half",
            Period::FirstHalfExtratime => "first_half_extratime",
            Period::SecondHalfExtratime => "second_half_extratime",
            Period::Shootout => "shootout",
            Period::Unknown => "unknown",
        }
    }

    pub fn is_extratime(&self) -> bool {
        matches!(self, Period::FirstHalfExtratime | Period::SecondHalfExtratime)
    }

    pub fn all() -> [Period; 5] {
        [
            Period::FirstHalf,
            Period::SecondHalf,
            Period::FirstHalfExtratime,
            Period::SecondHalfExtratime,
            Period::Shootout,
        ]
    }
}

// ============================================================================
// CLOCK PARSING / FORMATTING
// ============================================================================

/// "HH:MM:SS.mmm" (fraction optional) -> milliseconds
pub fn parse_timestamp(ts: &str) -> Option<u64> {
    let (hms, frac) = match ts.trim().split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (ts.trim(), None),
    };

    let parts: Vec<&str> = hms.split(':').collect();
    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        [m, s] => (0, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        _ => return None,
    };

    let millis = match frac {
        Some(f) if !f.is_empty() => {
            let digits: String = f.chars().take(3).collect();
            let padded = format!("{:0<3}", digits);
            padded.parse::<u64>().ok()?
        }
        _ => 0,
    };

    Some(((h * 60 + m) * 60 + s) * 1000 + millis)
}

/// milliseconds -> "HH:MM:SS.mmm"
pub fn format_clock(millis: u64) -> String {
    let total_secs = millis / 1000;
    let ms = millis % 1000;
    let (h, rem) = (total_secs / 3600, total_secs % 3600);
    let (m, s) = (rem / 60, rem % 60);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

/// Broadcast match clock of an event: minute/second plus the timestamp's milliseconds
pub fn match_clock_millis(event: &SourceEvent) -> u64 {
    let frac = parse_timestamp(&event.timestamp)
        .map(|ms| ms % 1000)
        .unwrap_or(0);
    (event.minute as u64 * 60 + event.second as u64) * 1000 + frac
}

pub fn match_clock(event: &SourceEvent) -> String {
    format_clock(match_clock_millis(event))
}

// ============================================================================
// PERIOD TIMELINE
// ============================================================================

/// Offsets that lay all periods end to end on one axis.
///
/// Each period lasts as long as its latest event; period p starts where
/// period p-1 ended. Built once per match before events are mapped.
#[derive(Debug, Clone, Default)]
pub struct PeriodTimeline {
    durations: BTreeMap<u8, u64>,
    offsets: BTreeMap<u8, u64>,
}

impl PeriodTimeline {
    pub fn from_events<'e>(events: impl IntoIterator<Item = &'e SourceEvent>) -> Self {
        let mut durations: BTreeMap<u8, u64> = BTreeMap::new();
        for event in events {
            let ts = parse_timestamp(&event.timestamp).unwrap_or(0);
            let entry = durations.entry(event.period).or_insert(0);
            *entry = (*entry).max(ts);
        }

        let mut offsets = BTreeMap::new();
        let mut running = 0u64;
        for (period, duration) in &durations {
            offsets.insert(*period, running);
            // +1ms keeps the last event of a period strictly before the next period's kickoff
            running += duration + 1;
        }

        PeriodTimeline { durations, offsets }
    }

    /// Normalized in-match time for a period-relative timestamp
    pub fn normalize(&self, period: u8, period_millis: u64) -> u64 {
        let offset = match self.offsets.get(&period) {
            Some(offset) => *offset,
            // periods never seen while building sort after everything known
            None => self
                .offsets
                .iter()
                .next_back()
                .map(|(p, o)| o + self.durations.get(p).copied().unwrap_or(0) + 1)
                .unwrap_or(0),
        };
        offset + period_millis
    }

    pub fn normalize_event(&self, event: &SourceEvent) -> u64 {
        self.normalize(event.period, parse_timestamp(&event.timestamp).unwrap_or(0))
    }

    /// (start, end) of a period on the normalized axis
    pub fn bounds(&self, period: u8) -> Option<(u64, u64)> {
        let start = *self.offsets.get(&period)?;
        let duration = *self.durations.get(&period)?;
        Some((start, start + duration))
    }

    pub fn periods(&self) -> impl Iterator<Item = u8> + '_ {
        self.durations.keys().copied()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(period: u8, timestamp: &str, minute: u32, second: u32) -> SourceEvent {
        SourceEvent::from_value(&json!({
            "id": format!("{}-{}", period, timestamp),
            "period": period,
            "timestamp": timestamp,
            "minute": minute,
            "second": second,
            "type": { "id": 30, "name": "Pass" },
            "team": { "id": 1, "name": "A" }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:00:00.000"), Some(0));
        assert_eq!(parse_timestamp("00:12:34.567"), Some(754_567));
        assert_eq!(parse_timestamp("01:00:00"), Some(3_600_000));
        assert_eq!(parse_timestamp("00:00:01.5"), Some(1_500));
        assert_eq!(parse_timestamp("45:00"), Some(2_700_000));
        assert_eq!(parse_timestamp("garbage"), None);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00:00.000");
        assert_eq!(format_clock(754_567), "00:12:34.567");
        assert_eq!(format_clock(3_723_004), "01:02:03.004");
    }

    #[test]
    fn test_match_clock_uses_minute_second() {
        let e = event(2, "00:02:10.250", 47, 10);
        assert_eq!(match_clock(&e), "00:47:10.250");
    }

    #[test]
    fn test_period_names() {
        assert_eq!(Period::from_source(1).name(), "first_half");
        assert_eq!(Period::from_source(4).name(), "second_half_extratime");
        assert!(Period::from_source(3).is_extratime());
        assert_eq!(Period::from_source(9), Period::Unknown);
    }

    #[test]
    fn test_timeline_is_monotonic_across_stoppage_time() {
        // first-half stoppage at 47:00 match clock, second half kicks off at 45:00
        let events = vec![
            event(1, "00:00:00.000", 0, 0),
            event(1, "00:47:00.000", 47, 0),
            event(2, "00:00:00.000", 45, 0),
            event(2, "00:10:00.000", 55, 0),
        ];
        let timeline = PeriodTimeline::from_events(&events);
        let times: Vec<u64> = events.iter().map(|e| timeline.normalize_event(e)).collect();

        assert!(times.windows(2).all(|w| w[0] < w[1]), "times: {:?}", times);
        assert_eq!(timeline.bounds(1), Some((0, 2_820_000)));
        assert_eq!(timeline.bounds(2), Some((2_820_001, 2_820_001 + 600_000)));
    }

    #[test]
    fn test_unknown_period_sorts_last() {
        let events = vec![event(1, "00:10:00.000", 10, 0)];
        let timeline = PeriodTimeline::from_events(&events);
        assert!(timeline.normalize(5, 0) > timeline.normalize(1, 600_000));
    }
}
