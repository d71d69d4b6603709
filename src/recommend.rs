//! Lifestyle recommendations derived from a [`HealthSnapshot`].
//!
//! Rules fire independently per metric; the overall category is computed
//! separately from a few coarse thresholds. Absent metrics never trigger a
//! rule, except sleep quality, where absence means "sleeping fine".

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::{HealthSnapshot, MetricKind};

/// Maximum entries per list.
pub const MAX_ITEMS: usize = 4;

const DEFAULT_DO: [&str; 2] = [
    "Maintain a balanced diet rich in vegetables.",
    "Stay hydrated with at least 8 glasses of water daily.",
];
const DEFAULT_AVOID: &str = "Smoking and excessive alcohol consumption.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    High,
    Moderate,
    Low,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskCategory::High => "High",
            RiskCategory::Moderate => "Moderate",
            RiskCategory::Low => "Low",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub category: RiskCategory,
    pub do_list: Vec<String>,
    pub avoid_list: Vec<String>,
}

/// Overall category. Absent values count as zero.
pub fn categorize(snapshot: &HealthSnapshot) -> RiskCategory {
    let value = |m| snapshot.metric(m).unwrap_or(0.0);
    let glucose = value(MetricKind::Glucose);
    let bp = value(MetricKind::SystolicBp);
    let chol = value(MetricKind::Cholesterol);
    let stress = value(MetricKind::StressLevel);

    if glucose > 140.0 || bp > 140.0 || chol > 240.0 || stress > 8.0 {
        RiskCategory::High
    } else if glucose > 110.0 || bp > 130.0 || chol > 200.0 {
        RiskCategory::Moderate
    } else {
        RiskCategory::Low
    }
}

pub fn recommend(snapshot: &HealthSnapshot) -> Recommendations {
    let mut dos: Vec<&str> = Vec::new();
    let mut avoids: Vec<&str> = Vec::new();
    let above = |m, limit| snapshot.metric(m).is_some_and(|v| v > limit);

    if above(MetricKind::Glucose, 120.0) {
        dos.push("Prioritize complex carbs (oats, quinoa) over refined sugars.");
        dos.push("Take a 15-minute walk after meals to stabilize blood sugar.");
        avoids.push("Sugary drinks and processed snacks.");
    } else if above(MetricKind::Glucose, 100.0) {
        dos.push("Monitor carbohydrate intake to prevent spikes.");
    }

    if above(MetricKind::Bmi, 30.0) {
        dos.push("Aim for 150 minutes of moderate aerobic activity weekly.");
        avoids.push("Sedentary behavior for more than 1 hour at a time.");
    } else if above(MetricKind::Bmi, 25.0) {
        dos.push("Incorporate strength training 2x a week.");
    }

    if above(MetricKind::Cholesterol, 240.0) {
        dos.push("Increase soluble fiber intake (beans, lentils, fruits).");
        avoids.push("Saturated fats (red meat, full-fat dairy).");
    } else if above(MetricKind::Cholesterol, 200.0) {
        dos.push("Choose healthy fats like olive oil and avocados.");
    }

    if above(MetricKind::SystolicBp, 130.0) {
        dos.push("Reduce sodium intake to under 2,300mg daily.");
        dos.push("Practice daily breathing exercises.");
        avoids.push("Excessive caffeine and alcohol.");
    }

    if above(MetricKind::StressLevel, 7.0) {
        dos.push("Dedicate 10 minutes daily to mindfulness or meditation.");
        avoids.push("Screen time 1 hour before bed.");
    }

    if snapshot.metric(MetricKind::SleepQuality).unwrap_or(10.0) < 6.0 {
        dos.push("Establish a consistent sleep schedule (same bed/wake time).");
        avoids.push("Heavy meals before bedtime.");
    }

    if dos.is_empty() {
        dos.extend(DEFAULT_DO);
    }
    if avoids.is_empty() {
        avoids.push(DEFAULT_AVOID);
    }

    let recommendations = Recommendations {
        category: categorize(snapshot),
        do_list: dedup_capped(dos),
        avoid_list: dedup_capped(avoids),
    };
    tracing::debug!(
        category = %recommendations.category,
        dos = recommendations.do_list.len(),
        avoids = recommendations.avoid_list.len(),
        "recommendations built"
    );
    recommendations
}

fn dedup_capped(items: Vec<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(MAX_ITEMS);
    for item in items {
        if out.len() == MAX_ITEMS {
            break;
        }
        if !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}
