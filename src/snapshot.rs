//! Read-only view of the user's latest health measurements.
//!
//! The hosting application owns data entry; the engine only reads. Field
//! names follow the assessment forms (`Glucose`, `chol`, `Total_Bilirubin`,
//! ...) with snake_case aliases. Every value is optional and parsed
//! leniently: numbers and numeric strings are accepted, anything else
//! (text, null, NaN, infinities) is treated as "not measured" rather than
//! failing the whole snapshot.

use std::fmt;
use std::path::Path;

use miette::Diagnostic;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SnapshotError {
    #[error("failed to parse health snapshot: {message}")]
    #[diagnostic(
        code(silentrisk::snapshot::parse),
        help("The snapshot must be a JSON object with optional `diabetes`, `heart`, `liver` and `mental` sections.")
    )]
    Parse { message: String },

    #[error("failed to read health snapshot: {path}")]
    #[diagnostic(code(silentrisk::snapshot::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

// ── Metrics ─────────────────────────────────────────────────────────────

/// Every measurement the snapshot can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Glucose,
    Bmi,
    Insulin,
    DiastolicBp,
    SystolicBp,
    Cholesterol,
    HeartRate,
    TotalBilirubin,
    DirectBilirubin,
    AlkalinePhosphotase,
    Alt,
    Ast,
    TotalProteins,
    Albumin,
    AgRatio,
    StressLevel,
    Workload,
    SleepQuality,
}

/// Inclusive normal range for a metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
}

impl ReferenceRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for ReferenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.min, self.max)
    }
}

impl MetricKind {
    pub const ALL: [MetricKind; 18] = [
        MetricKind::Glucose,
        MetricKind::Bmi,
        MetricKind::Insulin,
        MetricKind::DiastolicBp,
        MetricKind::SystolicBp,
        MetricKind::Cholesterol,
        MetricKind::HeartRate,
        MetricKind::TotalBilirubin,
        MetricKind::DirectBilirubin,
        MetricKind::AlkalinePhosphotase,
        MetricKind::Alt,
        MetricKind::Ast,
        MetricKind::TotalProteins,
        MetricKind::Albumin,
        MetricKind::AgRatio,
        MetricKind::StressLevel,
        MetricKind::Workload,
        MetricKind::SleepQuality,
    ];

    /// Lowercase label used in responses ("Your glucose of ...").
    pub const fn label(&self) -> &'static str {
        match self {
            MetricKind::Glucose => "glucose",
            MetricKind::Bmi => "BMI",
            MetricKind::Insulin => "insulin",
            MetricKind::DiastolicBp => "diastolic blood pressure",
            MetricKind::SystolicBp => "blood pressure",
            MetricKind::Cholesterol => "cholesterol",
            MetricKind::HeartRate => "heart rate",
            MetricKind::TotalBilirubin => "total bilirubin",
            MetricKind::DirectBilirubin => "direct bilirubin",
            MetricKind::AlkalinePhosphotase => "alkaline phosphotase",
            MetricKind::Alt => "ALT",
            MetricKind::Ast => "AST",
            MetricKind::TotalProteins => "total proteins",
            MetricKind::Albumin => "albumin",
            MetricKind::AgRatio => "A/G ratio",
            MetricKind::StressLevel => "stress level",
            MetricKind::Workload => "workload",
            MetricKind::SleepQuality => "sleep quality",
        }
    }

    pub const fn unit(&self) -> &'static str {
        match self {
            MetricKind::Glucose | MetricKind::Cholesterol => "mg/dL",
            MetricKind::Bmi => "kg/m²",
            MetricKind::Insulin => "µU/mL",
            MetricKind::DiastolicBp | MetricKind::SystolicBp => "mmHg",
            MetricKind::HeartRate => "bpm",
            MetricKind::TotalBilirubin | MetricKind::DirectBilirubin => "mg/dL",
            MetricKind::AlkalinePhosphotase | MetricKind::Alt | MetricKind::Ast => "IU/L",
            MetricKind::TotalProteins | MetricKind::Albumin => "g/dL",
            MetricKind::AgRatio => "",
            MetricKind::StressLevel | MetricKind::Workload | MetricKind::SleepQuality => "/10",
        }
    }

    /// Approximate normal range, where one is defined (liver panel only).
    pub const fn reference_range(&self) -> Option<ReferenceRange> {
        match self {
            MetricKind::TotalBilirubin => Some(ReferenceRange::new(0.1, 1.2)),
            MetricKind::DirectBilirubin => Some(ReferenceRange::new(0.1, 0.3)),
            MetricKind::AlkalinePhosphotase => Some(ReferenceRange::new(44.0, 147.0)),
            MetricKind::Alt => Some(ReferenceRange::new(7.0, 56.0)),
            MetricKind::Ast => Some(ReferenceRange::new(10.0, 40.0)),
            MetricKind::TotalProteins => Some(ReferenceRange::new(6.0, 8.3)),
            MetricKind::Albumin => Some(ReferenceRange::new(3.4, 5.4)),
            MetricKind::AgRatio => Some(ReferenceRange::new(0.8, 2.0)),
            _ => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Render a measured value the way users typed it: `150`, `95.5`.
pub fn format_value(value: f64) -> String {
    format!("{value}")
}

// ── Panels ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiabetesPanel {
    #[serde(rename = "Glucose", alias = "glucose", default, deserialize_with = "lenient_number")]
    pub glucose: Option<f64>,
    #[serde(rename = "BMI", alias = "bmi", default, deserialize_with = "lenient_number")]
    pub bmi: Option<f64>,
    #[serde(rename = "Insulin", alias = "insulin", default, deserialize_with = "lenient_number")]
    pub insulin: Option<f64>,
    #[serde(
        rename = "BloodPressure",
        alias = "blood_pressure",
        default,
        deserialize_with = "lenient_number"
    )]
    pub blood_pressure: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartPanel {
    #[serde(rename = "chol", alias = "cholesterol", default, deserialize_with = "lenient_number")]
    pub cholesterol: Option<f64>,
    #[serde(
        rename = "trestbps",
        alias = "resting_bp",
        default,
        deserialize_with = "lenient_number"
    )]
    pub resting_bp: Option<f64>,
    #[serde(rename = "thalach", alias = "heart_rate", default, deserialize_with = "lenient_number")]
    pub heart_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiverPanel {
    #[serde(
        rename = "Total_Bilirubin",
        alias = "total_bilirubin",
        default,
        deserialize_with = "lenient_number"
    )]
    pub total_bilirubin: Option<f64>,
    #[serde(
        rename = "Direct_Bilirubin",
        alias = "direct_bilirubin",
        default,
        deserialize_with = "lenient_number"
    )]
    pub direct_bilirubin: Option<f64>,
    #[serde(
        rename = "Alkaline_Phosphotase",
        alias = "alkaline_phosphotase",
        default,
        deserialize_with = "lenient_number"
    )]
    pub alkaline_phosphotase: Option<f64>,
    #[serde(
        rename = "Alamine_Aminotransferase",
        alias = "alt",
        default,
        deserialize_with = "lenient_number"
    )]
    pub alt: Option<f64>,
    #[serde(
        rename = "Aspartate_Aminotransferase",
        alias = "ast",
        default,
        deserialize_with = "lenient_number"
    )]
    pub ast: Option<f64>,
    #[serde(
        rename = "Total_Protiens",
        alias = "total_proteins",
        default,
        deserialize_with = "lenient_number"
    )]
    pub total_proteins: Option<f64>,
    #[serde(rename = "Albumin", alias = "albumin", default, deserialize_with = "lenient_number")]
    pub albumin: Option<f64>,
    #[serde(
        rename = "Albumin_and_Globulin_Ratio",
        alias = "ag_ratio",
        default,
        deserialize_with = "lenient_number"
    )]
    pub ag_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MentalPanel {
    #[serde(default, deserialize_with = "lenient_number")]
    pub stress_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub workload: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sleep_quality: Option<f64>,
}

fn lenient_number<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(de)?;
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|v| v.is_finite()))
}

// ── Snapshot ────────────────────────────────────────────────────────────

/// The user's latest values, grouped by assessment form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    #[serde(default)]
    pub diabetes: DiabetesPanel,
    #[serde(default)]
    pub heart: HeartPanel,
    #[serde(default)]
    pub liver: LiverPanel,
    #[serde(default)]
    pub mental: MentalPanel,
}

/// A present metric outside its reference range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFlag {
    pub metric: MetricKind,
    pub value: f64,
    pub range: ReferenceRange,
}

impl HealthSnapshot {
    pub fn from_json(json: &str) -> SnapshotResult<Self> {
        serde_json::from_str(json).map_err(|e| SnapshotError::Parse {
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> SnapshotResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Builder-style setter, mostly for callers assembling snapshots in code.
    pub fn with(mut self, metric: MetricKind, value: f64) -> Self {
        self.set(metric, Some(value));
        self
    }

    /// Set or clear a metric. Non-finite values are stored as absent.
    pub fn set(&mut self, metric: MetricKind, value: Option<f64>) {
        *self.slot_mut(metric) = value.filter(|v| v.is_finite());
    }

    pub fn metric(&self, metric: MetricKind) -> Option<f64> {
        match metric {
            MetricKind::Glucose => self.diabetes.glucose,
            MetricKind::Bmi => self.diabetes.bmi,
            MetricKind::Insulin => self.diabetes.insulin,
            MetricKind::DiastolicBp => self.diabetes.blood_pressure,
            MetricKind::SystolicBp => self.heart.resting_bp,
            MetricKind::Cholesterol => self.heart.cholesterol,
            MetricKind::HeartRate => self.heart.heart_rate,
            MetricKind::TotalBilirubin => self.liver.total_bilirubin,
            MetricKind::DirectBilirubin => self.liver.direct_bilirubin,
            MetricKind::AlkalinePhosphotase => self.liver.alkaline_phosphotase,
            MetricKind::Alt => self.liver.alt,
            MetricKind::Ast => self.liver.ast,
            MetricKind::TotalProteins => self.liver.total_proteins,
            MetricKind::Albumin => self.liver.albumin,
            MetricKind::AgRatio => self.liver.ag_ratio,
            MetricKind::StressLevel => self.mental.stress_level,
            MetricKind::Workload => self.mental.workload,
            MetricKind::SleepQuality => self.mental.sleep_quality,
        }
    }

    fn slot_mut(&mut self, metric: MetricKind) -> &mut Option<f64> {
        match metric {
            MetricKind::Glucose => &mut self.diabetes.glucose,
            MetricKind::Bmi => &mut self.diabetes.bmi,
            MetricKind::Insulin => &mut self.diabetes.insulin,
            MetricKind::DiastolicBp => &mut self.diabetes.blood_pressure,
            MetricKind::SystolicBp => &mut self.heart.resting_bp,
            MetricKind::Cholesterol => &mut self.heart.cholesterol,
            MetricKind::HeartRate => &mut self.heart.heart_rate,
            MetricKind::TotalBilirubin => &mut self.liver.total_bilirubin,
            MetricKind::DirectBilirubin => &mut self.liver.direct_bilirubin,
            MetricKind::AlkalinePhosphotase => &mut self.liver.alkaline_phosphotase,
            MetricKind::Alt => &mut self.liver.alt,
            MetricKind::Ast => &mut self.liver.ast,
            MetricKind::TotalProteins => &mut self.liver.total_proteins,
            MetricKind::Albumin => &mut self.liver.albumin,
            MetricKind::AgRatio => &mut self.liver.ag_ratio,
            MetricKind::StressLevel => &mut self.mental.stress_level,
            MetricKind::Workload => &mut self.mental.workload,
            MetricKind::SleepQuality => &mut self.mental.sleep_quality,
        }
    }

    /// Present metrics that have a reference range and fall outside it.
    pub fn out_of_range(&self) -> Vec<RangeFlag> {
        MetricKind::ALL
            .iter()
            .filter_map(|&metric| {
                let range = metric.reference_range()?;
                let value = self.metric(metric)?;
                (!range.contains(value)).then_some(RangeFlag {
                    metric,
                    value,
                    range,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form_field_names() {
        let snap = HealthSnapshot::from_json(
            r#"{
                "diabetes": { "Glucose": 150, "BMI": "27.5" },
                "heart": { "chol": 210, "trestbps": 135 },
                "liver": { "Total_Bilirubin": 1.5, "Total_Protiens": 7 },
                "mental": { "stress_level": 6 }
            }"#,
        )
        .unwrap();
        assert_eq!(snap.metric(MetricKind::Glucose), Some(150.0));
        assert_eq!(snap.metric(MetricKind::Bmi), Some(27.5));
        assert_eq!(snap.metric(MetricKind::SystolicBp), Some(135.0));
        assert_eq!(snap.metric(MetricKind::TotalProteins), Some(7.0));
        assert_eq!(snap.metric(MetricKind::SleepQuality), None);
    }

    #[test]
    fn malformed_values_become_absent() {
        let snap = HealthSnapshot::from_json(
            r#"{ "diabetes": { "glucose": "high", "BMI": null, "Insulin": [1] } }"#,
        )
        .unwrap();
        assert_eq!(snap.metric(MetricKind::Glucose), None);
        assert_eq!(snap.metric(MetricKind::Bmi), None);
        assert_eq!(snap.metric(MetricKind::Insulin), None);
    }

    #[test]
    fn empty_object_is_an_empty_snapshot() {
        let snap = HealthSnapshot::from_json("{}").unwrap();
        assert_eq!(snap, HealthSnapshot::default());
    }

    #[test]
    fn not_json_is_a_parse_error() {
        assert!(matches!(
            HealthSnapshot::from_json("glucose=150"),
            Err(SnapshotError::Parse { .. })
        ));
    }

    #[test]
    fn set_ignores_non_finite() {
        let mut snap = HealthSnapshot::default().with(MetricKind::Glucose, 120.0);
        snap.set(MetricKind::Glucose, Some(f64::NAN));
        assert_eq!(snap.metric(MetricKind::Glucose), None);
    }

    #[test]
    fn set_and_metric_share_slots() {
        let mut snap = HealthSnapshot::default();
        for (i, metric) in MetricKind::ALL.iter().enumerate() {
            snap.set(*metric, Some(i as f64));
        }
        for (i, metric) in MetricKind::ALL.iter().enumerate() {
            assert_eq!(snap.metric(*metric), Some(i as f64), "{metric:?}");
        }
    }

    #[test]
    fn out_of_range_flags_liver_panel() {
        let snap = HealthSnapshot::default()
            .with(MetricKind::TotalBilirubin, 2.4)
            .with(MetricKind::Alt, 30.0)
            .with(MetricKind::Albumin, 3.0)
            .with(MetricKind::Glucose, 400.0);
        let flagged: Vec<MetricKind> = snap.out_of_range().iter().map(|f| f.metric).collect();
        assert_eq!(flagged, vec![MetricKind::TotalBilirubin, MetricKind::Albumin]);
    }

    #[test]
    fn values_render_without_trailing_zero() {
        assert_eq!(format_value(150.0), "150");
        assert_eq!(format_value(95.5), "95.5");
    }
}
