//! Evolution records: the computed change between two consecutive snapshots
//!
//! The calculator only emits an entry for a metric when both snapshots carry
//! a value for it. A value that is present but does not parse as the
//! metric's declared type becomes an explicit [`MetricChange::ParseError`]
//! placeholder for that metric alone; the remaining metrics are unaffected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{format_thousands, value_as_f64, value_as_i64, TokenSnapshot};

/// Placeholder text for a metric whose value did not parse
const PARSE_ERROR_TEXT: &str = "Data parsing error";

/// Change in a single metric between the previous and current snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricChange {
    /// Numeric metric with a relative change.
    ///
    /// `percent` is `delta / previous * 100`, kept unrounded; it is omitted
    /// when the previous value was zero or negative, so the record never
    /// encodes a division by zero.
    Percent {
        previous: f64,
        current: f64,
        #[serde(rename = "absolute_delta")]
        delta: f64,
        #[serde(rename = "percent_delta", default, skip_serializing_if = "Option::is_none")]
        percent: Option<f64>,
    },

    /// Numeric metric reported as an absolute delta only (bounded scales
    /// such as the risk score, where a percentage is not meaningful)
    Absolute {
        previous: f64,
        current: f64,
        #[serde(rename = "absolute_delta")]
        delta: f64,
    },

    /// The two raw observation timestamps; elapsed-time arithmetic is a
    /// presentation concern, not part of the record
    Timestamps {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    /// A value was present on both sides but at least one of them did not
    /// parse as the metric's declared type
    ParseError,
}

impl MetricChange {
    /// Renders the change with a metric-specific value formatter, rounding
    /// percentages and deltas to one decimal place for presentation
    fn describe_with(&self, fmt: impl Fn(f64) -> String) -> String {
        match self {
            MetricChange::Percent {
                previous,
                current,
                percent,
                ..
            } => match percent {
                Some(pct) => format!("{} → {} ({:+.1}%)", fmt(*previous), fmt(*current), pct),
                None => format!("{} → {}", fmt(*previous), fmt(*current)),
            },
            MetricChange::Absolute {
                previous,
                current,
                delta,
            } => format!("{} → {} ({:+.1})", fmt(*previous), fmt(*current), delta),
            MetricChange::Timestamps { previous, current } => format!(
                "Last update: {} → Current: {}",
                previous.to_rfc3339(),
                current.to_rfc3339()
            ),
            MetricChange::ParseError => PARSE_ERROR_TEXT.to_string(),
        }
    }
}

/// The computed deltas between two consecutive snapshots of one token
///
/// Each field is `None` when either snapshot lacked that metric entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evolution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<MetricChange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holders: Option<MetricChange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<MetricChange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<MetricChange>,
}

impl Evolution {
    /// True when no metric produced an entry
    pub fn is_empty(&self) -> bool {
        self.market_cap.is_none()
            && self.holders.is_none()
            && self.risk_score.is_none()
            && self.observed_at.is_none()
    }

    /// Human-oriented `(label, change)` lines in a stable order, suitable
    /// for the analyst prompt and for chat messages
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let mut lines = Vec::new();

        if let Some(change) = &self.market_cap {
            let text = change.describe_with(|v| format!("${}", format_thousands(v)));
            lines.push(("Market Cap", text));
        }
        if let Some(change) = &self.holders {
            lines.push(("Holders", change.describe_with(format_thousands)));
        }
        if let Some(change) = &self.risk_score {
            lines.push(("Rug Score", change.describe_with(|v| format!("{:.1}", v))));
        }
        if let Some(change) = &self.observed_at {
            lines.push(("Time Elapsed", change.describe_with(|v| v.to_string())));
        }

        lines
    }
}

impl std::fmt::Display for Evolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines = self.describe();
        for (i, (label, text)) in lines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", label, text)?;
        }
        Ok(())
    }
}

/// Computes the evolution of `current` relative to `previous`
///
/// `previous` is whatever snapshot this observation is measured against,
/// usually the most recent history entry; the caller guarantees it is the
/// older of the two.
pub fn diff(current: &TokenSnapshot, previous: &TokenSnapshot) -> Evolution {
    Evolution {
        market_cap: percent_change(
            previous.market_cap.as_ref(),
            current.market_cap.as_ref(),
            value_as_f64,
        ),
        holders: percent_change(previous.holders.as_ref(), current.holders.as_ref(), |v| {
            value_as_i64(v).map(|n| n as f64)
        }),
        risk_score: absolute_change(
            previous.risk_score.as_ref(),
            current.risk_score.as_ref(),
            value_as_f64,
        ),
        observed_at: Some(MetricChange::Timestamps {
            previous: previous.observed_at,
            current: current.observed_at,
        }),
    }
}

fn percent_change(
    previous: Option<&Value>,
    current: Option<&Value>,
    parse: impl Fn(&Value) -> Option<f64>,
) -> Option<MetricChange> {
    let (previous_raw, current_raw) = (previous?, current?);
    match (parse(previous_raw), parse(current_raw)) {
        (Some(previous), Some(current)) => {
            let delta = current - previous;
            let percent = (previous > 0.0).then(|| delta / previous * 100.0);
            Some(MetricChange::Percent {
                previous,
                current,
                delta,
                percent,
            })
        }
        _ => Some(MetricChange::ParseError),
    }
}

fn absolute_change(
    previous: Option<&Value>,
    current: Option<&Value>,
    parse: impl Fn(&Value) -> Option<f64>,
) -> Option<MetricChange> {
    let (previous_raw, current_raw) = (previous?, current?);
    match (parse(previous_raw), parse(current_raw)) {
        (Some(previous), Some(current)) => Some(MetricChange::Absolute {
            previous,
            current,
            delta: current - previous,
        }),
        _ => Some(MetricChange::ParseError),
    }
}
