//! Core data models for the prediction service

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of input features expected by every classifier
pub const NUM_FEATURES: usize = 8;

/// Wire names of the features, in the order the classifier was trained on.
///
/// Both request validation and vector assembly walk this table, so the
/// positional layout cannot drift from the field names.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "Pregnancies",
    "Glucose",
    "BloodPressure",
    "SkinThickness",
    "Insulin",
    "BMI",
    "DiabetesPedigreeFunction",
    "Age",
];

/// Index of the positive (diabetic) class in probability rows
pub const POSITIVE_CLASS: usize = 1;

/// Probability reported when the classifier cannot estimate one
pub const FALLBACK_PROBABILITY: f64 = 0.5;

/// One row of the classifier input batch
pub type FeatureRow = [f64; NUM_FEATURES];

/// Clinical measurements submitted for a single prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "Pregnancies")]
    pub pregnancies: f64,
    #[serde(rename = "Glucose")]
    pub glucose: f64,
    #[serde(rename = "BloodPressure")]
    pub blood_pressure: f64,
    #[serde(rename = "SkinThickness")]
    pub skin_thickness: f64,
    #[serde(rename = "Insulin")]
    pub insulin: f64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "DiabetesPedigreeFunction")]
    pub diabetes_pedigree_function: f64,
    #[serde(rename = "Age")]
    pub age: f64,
}

impl FeatureRecord {
    /// Build a record from a positional row laid out as [`FEATURE_NAMES`]
    pub fn from_row(row: FeatureRow) -> Self {
        Self {
            pregnancies: row[0],
            glucose: row[1],
            blood_pressure: row[2],
            skin_thickness: row[3],
            insulin: row[4],
            bmi: row[5],
            diabetes_pedigree_function: row[6],
            age: row[7],
        }
    }

    /// Flatten into the positional vector the classifier expects
    pub fn to_row(&self) -> FeatureRow {
        [
            self.pregnancies,
            self.glucose,
            self.blood_pressure,
            self.skin_thickness,
            self.insulin,
            self.bmi,
            self.diabetes_pedigree_function,
            self.age,
        ]
    }

    /// Validate and coerce a decoded JSON body.
    ///
    /// Numbers are taken as-is and numeric strings are parsed. Every missing
    /// or invalid field is reported, not just the first one. Unknown fields
    /// are ignored.
    pub fn from_json(body: &Value) -> Result<Self, ValidationErrors> {
        let object = match body.as_object() {
            Some(object) => object,
            None => {
                return Err(ValidationErrors::single(FieldError {
                    kind: "model_attributes_type".to_string(),
                    loc: vec!["body".to_string()],
                    msg: "Input should be a valid dictionary or object to extract fields from"
                        .to_string(),
                }))
            }
        };

        let mut row = [0.0; NUM_FEATURES];
        let mut errors = Vec::new();

        for (slot, name) in row.iter_mut().zip(FEATURE_NAMES) {
            match object.get(name) {
                None => errors.push(FieldError::new(name, "missing", "Field required")),
                Some(value) => match coerce_f64(value) {
                    Ok(v) => *slot = v,
                    Err((kind, msg)) => errors.push(FieldError::new(name, kind, msg)),
                },
            }
        }

        if errors.is_empty() {
            Ok(Self::from_row(row))
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

fn coerce_f64(value: &Value) -> Result<f64, (&'static str, &'static str)> {
    let parsed = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or(("float_type", "Input should be a valid number"))?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            (
                "float_parsing",
                "Input should be a valid number, unable to parse string as a number",
            )
        })?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => return Err(("float_type", "Input should be a valid number")),
    };

    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(("finite_number", "Input should be a finite number"))
    }
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(rename = "type")]
    pub kind: String,
    pub loc: Vec<String>,
    pub msg: String,
}

impl FieldError {
    fn new(field: &str, kind: &str, msg: &str) -> Self {
        Self {
            kind: kind.to_string(),
            loc: vec!["body".to_string(), field.to_string()],
            msg: msg.to_string(),
        }
    }
}

/// All validation failures found in a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn single(error: FieldError) -> Self {
        Self(vec![error])
    }

    /// The body could not be decoded as JSON at all
    pub fn json_invalid(message: impl Into<String>) -> Self {
        Self::single(FieldError {
            kind: "json_invalid".to_string(),
            loc: vec!["body".to_string()],
            msg: message.into(),
        })
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Names of the offending fields, for logging
    pub fn fields(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|e| e.loc.get(1).map(String::as_str))
            .collect()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.loc.join("."), e.msg))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Classifier output for a single record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub is_diabetic: u8,
    pub probability: f64,
}

/// Body of the liveness endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_body() -> Value {
        json!({
            "Pregnancies": 6,
            "Glucose": 148,
            "BloodPressure": 72,
            "SkinThickness": 35,
            "Insulin": 0,
            "BMI": 33.6,
            "DiabetesPedigreeFunction": 0.627,
            "Age": 50
        })
    }

    #[test]
    fn test_from_json_preserves_feature_order() {
        let record = FeatureRecord::from_json(&sample_body()).unwrap();
        assert_eq!(
            record.to_row(),
            [6.0, 148.0, 72.0, 35.0, 0.0, 33.6, 0.627, 50.0]
        );
    }

    #[test]
    fn test_field_order_matches_serde_names() {
        let record = FeatureRecord::from_row([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let value = serde_json::to_value(record).unwrap();

        for (i, name) in FEATURE_NAMES.iter().enumerate() {
            assert_eq!(value[name], json!((i + 1) as f64), "field {}", name);
        }
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let mut body = sample_body();
        body["Glucose"] = json!(" 148.5 ");
        let record = FeatureRecord::from_json(&body).unwrap();
        assert_eq!(record.glucose, 148.5);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let mut body = sample_body();
        body["Outcome"] = json!(1);
        assert!(FeatureRecord::from_json(&body).is_ok());
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let mut body = sample_body();
        body.as_object_mut().unwrap().remove("BMI");
        body.as_object_mut().unwrap().remove("Age");

        let errors = FeatureRecord::from_json(&body).unwrap_err();
        assert_eq!(errors.fields(), vec!["BMI", "Age"]);
        assert!(errors.errors().iter().all(|e| e.kind == "missing"));
    }

    #[test]
    fn test_non_numeric_values_rejected() {
        let mut body = sample_body();
        body["Insulin"] = json!("lots");
        body["Age"] = json!(null);
        body["BMI"] = json!([33.6]);

        let errors = FeatureRecord::from_json(&body).unwrap_err();
        let kinds: Vec<&str> = errors.errors().iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["float_parsing", "float_type", "float_type"]);
        assert_eq!(errors.fields(), vec!["Insulin", "BMI", "Age"]);
    }

    #[test]
    fn test_booleans_coerced_to_unit_values() {
        let mut body = sample_body();
        body["Pregnancies"] = json!(true);
        body["Insulin"] = json!(false);

        let record = FeatureRecord::from_json(&body).unwrap();
        assert_eq!(record.pregnancies, 1.0);
        assert_eq!(record.insulin, 0.0);
    }

    #[test]
    fn test_non_finite_strings_rejected() {
        let mut body = sample_body();
        body["Glucose"] = json!("NaN");
        body["Insulin"] = json!("inf");

        let errors = FeatureRecord::from_json(&body).unwrap_err();
        assert!(errors.errors().iter().all(|e| e.kind == "finite_number"));
        assert_eq!(errors.errors().len(), 2);
    }

    #[test]
    fn test_non_object_body_rejected() {
        let errors = FeatureRecord::from_json(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(errors.errors()[0].kind, "model_attributes_type");
        assert_eq!(errors.errors()[0].loc, vec!["body"]);
    }

    #[test]
    fn test_validation_errors_serialize_as_list() {
        let errors = ValidationErrors::json_invalid("expected value at line 1 column 1");
        let value = serde_json::to_value(&errors).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["type"], "json_invalid");
        assert_eq!(value[0]["loc"], json!(["body"]));
    }
}
