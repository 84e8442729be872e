//! Prompt context supplied by the client for multimodal analysis.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Vital signs the client may attach to an analysis request.
///
/// Each one is a chronologically ordered series; only the most recent
/// measurement ends up in a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalSign {
    HeartRate,
    RespiratoryRate,
    Spo2,
    SystolicBp,
    DiastolicBp,
    MeanArterialPressure,
}

impl VitalSign {
    /// All vital signs, in the order they are summarised.
    pub const ALL: [VitalSign; 6] = [
        VitalSign::HeartRate,
        VitalSign::RespiratoryRate,
        VitalSign::Spo2,
        VitalSign::SystolicBp,
        VitalSign::DiastolicBp,
        VitalSign::MeanArterialPressure,
    ];

    /// Key of the series in the prompt context.
    pub fn key(&self) -> &'static str {
        match self {
            VitalSign::HeartRate => "heart_rate",
            VitalSign::RespiratoryRate => "respiratory_rate",
            VitalSign::Spo2 => "spo2",
            VitalSign::SystolicBp => "systolic_bp",
            VitalSign::DiastolicBp => "diastolic_bp",
            VitalSign::MeanArterialPressure => "mean_arterial_pressure",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VitalSign::HeartRate => "Heart Rate",
            VitalSign::RespiratoryRate => "Respiratory Rate",
            VitalSign::Spo2 => "SpO2",
            VitalSign::SystolicBp => "Systolic Blood Pressure",
            VitalSign::DiastolicBp => "Diastolic Blood Pressure",
            VitalSign::MeanArterialPressure => "Mean Arterial Pressure",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            VitalSign::HeartRate => "bpm",
            VitalSign::RespiratoryRate => "breaths/min",
            VitalSign::Spo2 => "%",
            VitalSign::SystolicBp | VitalSign::DiastolicBp | VitalSign::MeanArterialPressure => {
                "mmHg"
            }
        }
    }
}

/// Free-form key/value payload accompanying an analysis request.
///
/// The `prompt` key carries the user's question; vital-sign series are keyed
/// by [`VitalSign::key`]. Anything else is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptContext(Map<String, Value>);

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly useful in tests and fixtures.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The user's free-text question, if present.
    pub fn prompt(&self) -> Option<&str> {
        self.0.get("prompt").and_then(Value::as_str)
    }

    /// Most recent measurement of a vital sign.
    ///
    /// Series are lists with the newest value last; a bare scalar counts as a
    /// single measurement. Empty lists and nulls are treated as missing.
    pub fn latest_vital(&self, sign: VitalSign) -> Option<&Value> {
        match self.0.get(sign.key())? {
            Value::Array(series) => series.last(),
            Value::Null => None,
            scalar => Some(scalar),
        }
    }

    /// Natural-language summary of the most recent vital signs.
    pub fn vital_signs_summary(&self) -> String {
        VitalSign::ALL
            .iter()
            .map(|sign| match self.latest_vital(*sign) {
                Some(value) => format!("{}: {} {}", sign.label(), display_value(value), sign.unit()),
                None => format!("{}: Not available", sign.label()),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<Map<String, Value>> for PromptContext {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_uses_latest_values() {
        let context = PromptContext::new()
            .with("prompt", "Is there a pneumothorax?")
            .with("heart_rate", json!([80, 84, 91]))
            .with("spo2", json!([97.5, 95]))
            .with("systolic_bp", json!([]));

        assert_eq!(
            context.vital_signs_summary(),
            "Heart Rate: 91 bpm, Respiratory Rate: Not available, SpO2: 95 %, \
             Systolic Blood Pressure: Not available, Diastolic Blood Pressure: Not available, \
             Mean Arterial Pressure: Not available"
        );
    }

    #[test]
    fn test_summary_without_vitals() {
        let summary = PromptContext::new().vital_signs_summary();
        assert_eq!(summary.matches("Not available").count(), VitalSign::ALL.len());
    }

    #[test]
    fn test_scalar_and_string_measurements() {
        let context = PromptContext::new()
            .with("respiratory_rate", 18)
            .with("mean_arterial_pressure", json!(["85"]))
            .with("diastolic_bp", Value::Null);

        assert_eq!(context.latest_vital(VitalSign::RespiratoryRate), Some(&json!(18)));
        assert_eq!(context.latest_vital(VitalSign::DiastolicBp), None);
        assert!(context
            .vital_signs_summary()
            .contains("Mean Arterial Pressure: 85 mmHg"));
    }

    #[test]
    fn test_deserializes_as_plain_object() {
        let context: PromptContext =
            serde_json::from_str(r#"{"prompt": "Describe", "heart_rate": [70]}"#).unwrap();
        assert_eq!(context.prompt(), Some("Describe"));
        assert_eq!(serde_json::to_value(&context).unwrap()["heart_rate"], json!([70]));
    }

    #[test]
    fn test_vital_sign_serialization() {
        let json = serde_json::to_string(&VitalSign::MeanArterialPressure).unwrap();
        assert_eq!(json, format!("\"{}\"", VitalSign::MeanArterialPressure.key()));
    }
}
