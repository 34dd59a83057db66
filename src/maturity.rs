// src/maturity.rs
//! Threshold-based maturity bands, per-metric recommendations, and
//! improvement suggestions for weak sub-scores.

use serde::Serialize;

use crate::catalog::SourceDetails;

/// Scores at or above this value allow a pre-order.
pub const PREORDER_MIN_SCORE: u8 = 80;
/// Sub-scores below this value count as weak points.
pub const WEAK_POINT_BELOW: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Satisfactory,
    NeedsAttention,
    Critical,
}

impl ScoreBand {
    pub fn from_score(value: u8) -> Self {
        match value {
            90.. => Self::Excellent,
            80..=89 => Self::Good,
            70..=79 => Self::Satisfactory,
            60..=69 => Self::NeedsAttention,
            _ => Self::Critical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Satisfactory => "Satisfactory",
            Self::NeedsAttention => "Needs attention",
            Self::Critical => "Critical",
        }
    }

    /// CSS class used by the dashboard progress bars.
    pub fn color_class(self) -> &'static str {
        match self {
            Self::Excellent => "bg-emerald-500",
            Self::Good => "bg-green-500",
            Self::Satisfactory => "bg-yellow-500",
            Self::NeedsAttention => "bg-orange-500",
            Self::Critical => "bg-red-500",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Reliability,
    Accuracy,
    Completeness,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Reliability, Metric::Accuracy, Metric::Completeness];

    pub fn label(self) -> &'static str {
        match self {
            Self::Reliability => "Reliability",
            Self::Accuracy => "Accuracy",
            Self::Completeness => "Completeness",
        }
    }

    pub fn value_in(self, d: &SourceDetails) -> u8 {
        match self {
            Self::Reliability => d.reliability,
            Self::Accuracy => d.accuracy,
            Self::Completeness => d.completeness,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusIcon {
    Ok,
    Warning,
    Error,
}

impl StatusIcon {
    pub fn from_score(value: u8) -> Self {
        if value >= 80 {
            Self::Ok
        } else if value >= 70 {
            Self::Warning
        } else {
            Self::Error
        }
    }
}

/// One-line recommendation shown next to a sub-score.
pub fn recommendation(metric: Metric, value: u8) -> &'static str {
    if value >= 90 {
        return "Keep up the current level";
    }
    match (metric, value) {
        (Metric::Reliability, 80..) => "Improve system monitoring",
        (Metric::Reliability, 70..) => "Back up data more frequently",
        (Metric::Reliability, _) => "Infrastructure needs a full overhaul",
        (Metric::Accuracy, 80..) => "Improve the data validation process",
        (Metric::Accuracy, 70..) => "Introduce automated data checks",
        (Metric::Accuracy, _) => "A full data audit is required",
        (Metric::Completeness, 80..) => "Add the missing data fields",
        (Metric::Completeness, 70..) => "Extend the coverage of the source",
        (Metric::Completeness, _) => "The source needs significant expansion",
    }
}

/// Concrete action items for a weak metric. Scores below 70 get the longer list.
pub fn action_items(metric: Metric, value: u8) -> &'static [&'static str] {
    let severe = value < 70;
    match (metric, severe) {
        (Metric::Reliability, true) => &[
            "Set up availability monitoring",
            "Configure automatic backups",
            "Write a disaster recovery plan",
            "Run health checks more often",
        ],
        (Metric::Reliability, false) => &[
            "Optimise system response time",
            "Improve the data refresh process",
            "Add extra integrity checks",
        ],
        (Metric::Accuracy, true) => &[
            "Introduce automated data validation",
            "Run a full audit of existing data",
            "Define quality control procedures",
            "Train staff in quality control methods",
        ],
        (Metric::Accuracy, false) => &[
            "Improve data verification algorithms",
            "Add further validations",
            "Run regular spot checks",
        ],
        (Metric::Completeness, true) => &[
            "Analyse missing data",
            "Plan how to fill the gaps",
            "Make key fields mandatory on entry",
            "Automate collection of missing data",
        ],
        (Metric::Completeness, false) => &[
            "Collect a wider set of attributes",
            "Keep a deeper history",
            "Add supplementary information sources",
        ],
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeakPoint {
    pub metric: Metric,
    pub label: &'static str,
    pub value: u8,
    pub band: ScoreBand,
    pub icon: StatusIcon,
    pub actions: Vec<&'static str>,
}

/// Metrics below `WEAK_POINT_BELOW`, weakest first.
pub fn improvement_suggestions(details: &SourceDetails) -> Vec<WeakPoint> {
    let mut weak: Vec<WeakPoint> = Metric::ALL
        .iter()
        .map(|&m| (m, m.value_in(details)))
        .filter(|&(_, v)| v < WEAK_POINT_BELOW)
        .map(|(metric, value)| WeakPoint {
            metric,
            label: metric.label(),
            value,
            band: ScoreBand::from_score(value),
            icon: StatusIcon::from_score(value),
            actions: action_items(metric, value).to_vec(),
        })
        .collect();
    // stable: ties keep reliability/accuracy/completeness order
    weak.sort_by_key(|w| w.value);
    weak
}

pub fn can_preorder(score: u8) -> bool {
    score >= PREORDER_MIN_SCORE
}
