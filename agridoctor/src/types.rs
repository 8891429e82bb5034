use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use time::OffsetDateTime;

/// Largest image accepted for disease detection (10 MiB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Minimum password length enforced before registration is sent.
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// ACCOUNT TYPES
// =============================================================================

/// Profile of the authenticated user as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque user identifier
    pub id: String,
    pub email: String,
    pub username: String,
    /// Display name, optional at registration
    #[serde(default)]
    pub full_name: Option<String>,
    /// Account creation time
    #[serde(with = "iso_datetime")]
    pub created_at: OffsetDateTime,
}

/// Email/password pair for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Registration form. The confirmation field is checked locally and never sent.
#[must_use]
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub password: String,
    #[serde(skip)]
    pub confirm_password: String,
}

impl Registration {
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            full_name: None,
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    /// Adds a display name
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Checks the password pair locally.
    ///
    /// # Errors
    /// Returns a human-readable message when the passwords differ or the
    /// password is shorter than [`MIN_PASSWORD_LEN`].
    pub fn validate(&self) -> Result<(), String> {
        if self.password != self.confirm_password {
            return Err("Passwords do not match".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            ));
        }
        Ok(())
    }
}

/// Token response from login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: UserProfile,
}

// =============================================================================
// PREDICTION REQUESTS
// =============================================================================

/// The seven soil and climate measurements shared by crop and fertilizer requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoilField {
    Nitrogen,
    Phosphorus,
    Potassium,
    Temperature,
    Humidity,
    Ph,
    Rainfall,
}

impl SoilField {
    pub const ALL: [Self; 7] = [
        Self::Nitrogen,
        Self::Phosphorus,
        Self::Potassium,
        Self::Temperature,
        Self::Humidity,
        Self::Ph,
        Self::Rainfall,
    ];

    /// Key used in request bodies and server validation errors.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Nitrogen => "N",
            Self::Phosphorus => "P",
            Self::Potassium => "K",
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Ph => "ph",
            Self::Rainfall => "rainfall",
        }
    }

    /// Human label shown next to inputs and in validation messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Nitrogen => "Nitrogen (N)",
            Self::Phosphorus => "Phosphorus (P)",
            Self::Potassium => "Potassium (K)",
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::Ph => "pH",
            Self::Rainfall => "Rainfall",
        }
    }

    /// Placeholder hint for the input; the server enforces the real range.
    #[must_use]
    pub const fn hint(self) -> &'static str {
        match self {
            Self::Nitrogen | Self::Phosphorus => "0-200 kg/ha",
            Self::Potassium => "0-300 kg/ha",
            Self::Temperature => "0-60 °C",
            Self::Humidity => "0-100 %",
            Self::Ph => "0-14",
            Self::Rainfall => "0-500 mm",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// Body of `POST /predict/crop`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SoilReadings {
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "K")]
    pub k: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
}

impl SoilReadings {
    /// Builds readings from raw text with `parseFloat`-style coercion.
    /// Unparseable text becomes NaN, which serializes as JSON `null`.
    pub fn coerce<'a>(mut text: impl FnMut(SoilField) -> &'a str) -> Self {
        let mut readings = Self::default();
        for field in SoilField::ALL {
            readings.set(field, coerce_number(text(field)));
        }
        readings
    }

    #[must_use]
    pub const fn get(&self, field: SoilField) -> f64 {
        match field {
            SoilField::Nitrogen => self.n,
            SoilField::Phosphorus => self.p,
            SoilField::Potassium => self.k,
            SoilField::Temperature => self.temperature,
            SoilField::Humidity => self.humidity,
            SoilField::Ph => self.ph,
            SoilField::Rainfall => self.rainfall,
        }
    }

    pub fn set(&mut self, field: SoilField, value: f64) {
        let slot = match field {
            SoilField::Nitrogen => &mut self.n,
            SoilField::Phosphorus => &mut self.p,
            SoilField::Potassium => &mut self.k,
            SoilField::Temperature => &mut self.temperature,
            SoilField::Humidity => &mut self.humidity,
            SoilField::Ph => &mut self.ph,
            SoilField::Rainfall => &mut self.rainfall,
        };
        *slot = value;
    }
}

/// Body of `POST /predict/fertilizer`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FertilizerRequest {
    #[serde(flatten)]
    pub soil: SoilReadings,
    pub crop_type: CropType,
}

/// Crops the fertilizer model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CropType {
    Rice,
    Maize,
    Chickpea,
    KidneyBeans,
    PigeonPeas,
    MothBeans,
    MungBean,
    BlackGram,
    Lentil,
    Pomegranate,
    Banana,
    Mango,
    Grapes,
    Watermelon,
    Muskmelon,
    Apple,
    Orange,
    Papaya,
    Coconut,
    Cotton,
    Jute,
    Coffee,
}

impl CropType {
    pub const ALL: [Self; 22] = [
        Self::Rice,
        Self::Maize,
        Self::Chickpea,
        Self::KidneyBeans,
        Self::PigeonPeas,
        Self::MothBeans,
        Self::MungBean,
        Self::BlackGram,
        Self::Lentil,
        Self::Pomegranate,
        Self::Banana,
        Self::Mango,
        Self::Grapes,
        Self::Watermelon,
        Self::Muskmelon,
        Self::Apple,
        Self::Orange,
        Self::Papaya,
        Self::Coconut,
        Self::Cotton,
        Self::Jute,
        Self::Coffee,
    ];

    /// Display name, e.g. "Kidney Beans".
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rice => "Rice",
            Self::Maize => "Maize",
            Self::Chickpea => "Chickpea",
            Self::KidneyBeans => "Kidney Beans",
            Self::PigeonPeas => "Pigeon Peas",
            Self::MothBeans => "Moth Beans",
            Self::MungBean => "Mung Bean",
            Self::BlackGram => "Black Gram",
            Self::Lentil => "Lentil",
            Self::Pomegranate => "Pomegranate",
            Self::Banana => "Banana",
            Self::Mango => "Mango",
            Self::Grapes => "Grapes",
            Self::Watermelon => "Watermelon",
            Self::Muskmelon => "Muskmelon",
            Self::Apple => "Apple",
            Self::Orange => "Orange",
            Self::Papaya => "Papaya",
            Self::Coconut => "Coconut",
            Self::Cotton => "Cotton",
            Self::Jute => "Jute",
            Self::Coffee => "Coffee",
        }
    }

    /// Lower-cased value sent to the API, e.g. "kidney beans".
    #[must_use]
    pub fn as_api_str(self) -> String {
        self.label().to_ascii_lowercase()
    }
}

impl std::fmt::Display for CropType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for CropType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_api_str())
    }
}

#[derive(Debug, Clone)]
pub struct CropTypeParseError {
    value: String,
}

impl std::fmt::Display for CropTypeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let known: Vec<&str> = CropType::ALL.iter().map(|crop| crop.label()).collect();
        write!(
            f,
            "invalid crop type '{}'; expected one of: {}",
            self.value,
            known.join(", ")
        )
    }
}

impl std::error::Error for CropTypeParseError {}

impl std::str::FromStr for CropType {
    type Err = CropTypeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect();
        CropType::ALL
            .into_iter()
            .find(|crop| crop.as_api_str().replace(' ', "") == normalized)
            .ok_or_else(|| CropTypeParseError {
                value: value.to_string(),
            })
    }
}

/// An image selected for disease detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Size of the payload in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Checks MIME type and size before anything is uploaded.
    ///
    /// # Errors
    /// Returns the message to show when the file is not an image or exceeds
    /// [`MAX_IMAGE_BYTES`].
    pub fn validate(&self) -> Result<(), String> {
        if !self.mime_type.starts_with("image/") {
            return Err("Please select a valid image file".to_string());
        }
        if self.size() > MAX_IMAGE_BYTES {
            return Err("Image file is too large. Maximum size is 10MB.".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// PREDICTION RESPONSES
// =============================================================================

/// Common surface of every prediction reply: a success flag and a message.
pub trait ServiceReply {
    fn success(&self) -> bool;
    fn message(&self) -> &str;
}

/// Response of `POST /predict/crop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPrediction {
    #[serde(default = "default_true")]
    pub success: bool,
    /// Recommended crop, e.g. "Rice"
    pub crop: String,
    #[serde(default)]
    pub crop_id: Option<i64>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Response of `POST /predict/fertilizer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerPrediction {
    #[serde(default = "default_true")]
    pub success: bool,
    /// Recommended fertilizer, e.g. "Urea" or "14-35-14"
    pub fertilizer: String,
    #[serde(default)]
    pub fertilizer_id: Option<i64>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// One ranked candidate from the disease classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPrediction {
    pub disease: String,
    pub plant: String,
    /// Probability in 0..=1
    pub confidence: f64,
}

/// Response of `POST /disease/detect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseDetection {
    #[serde(default = "default_true")]
    pub success: bool,
    pub plant: String,
    pub disease: String,
    /// Probability in 0..=1
    pub confidence: f64,
    pub is_healthy: bool,
    #[serde(default)]
    pub top_predictions: Vec<TopPrediction>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl ServiceReply for CropPrediction {
    fn success(&self) -> bool {
        self.success
    }

    fn message(&self) -> &str {
        &self.message
    }
}

impl ServiceReply for FertilizerPrediction {
    fn success(&self) -> bool {
        self.success
    }

    fn message(&self) -> &str {
        &self.message
    }
}

impl ServiceReply for DiseaseDetection {
    fn success(&self) -> bool {
        self.success
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Result of a prediction as held by a form: the server's reply or a failure message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure { message: String },
}

impl<T> Outcome<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Liveness payload of a model backend, passed through untransformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHealth {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub model_loaded: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub supported_plants: Vec<String>,

    /// Catch-all for any additional fields from the API
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

// =============================================================================
// HISTORY
// =============================================================================

/// A previously recorded prediction, owned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, with = "iso_datetime::lenient")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub input_data: serde_json::Value,
    #[serde(default)]
    pub prediction: serde_json::Value,

    /// Catch-all for any additional fields from the API
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Envelope of the history endpoints; disease history names its list `detections`.
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryPage {
    #[serde(default, alias = "detections")]
    pub predictions: Vec<HistoryEntry>,
}

// =============================================================================
// ERROR PAYLOADS
// =============================================================================

/// The `detail` field of an error response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Fields(Vec<FieldError>),
    Other(serde_json::Value),
}

/// One entry of a request-validation error list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
    pub msg: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl FieldError {
    /// Dotted field path without the leading request-part segment.
    #[must_use]
    pub fn field(&self) -> String {
        let mut parts: Vec<String> = self
            .loc
            .iter()
            .map(|part| match part {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        if parts
            .first()
            .is_some_and(|first| matches!(first.as_str(), "body" | "query" | "path" | "header"))
        {
            parts.remove(0);
        }
        parts.join(".")
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = self.field();
        if field.is_empty() {
            f.write_str(&self.msg)
        } else {
            write!(f, "{field}: {}", self.msg)
        }
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => f.write_str(message),
            Self::Fields(errors) => {
                let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
                f.write_str(&joined.join("; "))
            }
            Self::Other(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<ErrorDetail>,
}

const fn default_true() -> bool {
    true
}

/// Best-effort number parsing with JavaScript `parseFloat` semantics: the
/// longest numeric prefix after leading whitespace, or NaN.
#[must_use]
pub fn coerce_number(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if text[end..].starts_with("Infinity") {
        return if bytes.first() == Some(&b'-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        mantissa_digits += frac_end - frac_start;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end].parse().unwrap_or(f64::NAN)
}

/// Timestamps arrive either as RFC 3339 or as naive ISO 8601 (taken as UTC).
pub(crate) mod iso_datetime {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::{Iso8601, Rfc3339};
    use time::{OffsetDateTime, PrimitiveDateTime};

    pub fn parse(value: &str) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(value, &Rfc3339).ok().or_else(|| {
            PrimitiveDateTime::parse(value, &Iso8601::DEFAULT)
                .ok()
                .map(PrimitiveDateTime::assume_utc)
        })
    }

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    /// Optional timestamps; unreadable values become `None`.
    pub mod lenient {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::OffsetDateTime;

        pub fn serialize<S: Serializer>(
            value: &Option<OffsetDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<OffsetDateTime>, D::Error> {
            let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
            Ok(match raw {
                Some(serde_json::Value::String(s)) => super::parse(&s),
                _ => None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_number_follows_parse_float() {
        assert_eq!(coerce_number("90"), 90.0);
        assert_eq!(coerce_number("  20.5"), 20.5);
        assert_eq!(coerce_number("6.5ph"), 6.5);
        assert_eq!(coerce_number(".5"), 0.5);
        assert_eq!(coerce_number("1e3x"), 1000.0);
        assert_eq!(coerce_number("2e"), 2.0);
        assert_eq!(coerce_number("-Infinity"), f64::NEG_INFINITY);
        assert!(coerce_number("abc").is_nan());
        assert!(coerce_number("").is_nan());
        assert!(coerce_number(".").is_nan());
    }

    #[test]
    fn nan_readings_serialize_as_null() {
        let readings = SoilReadings::coerce(|field| match field {
            SoilField::Nitrogen => "lots",
            _ => "1",
        });
        let body = serde_json::to_value(readings).unwrap();
        assert!(body["N"].is_null());
        assert_eq!(body["P"], 1.0);
    }

    #[test]
    fn crop_type_parses_labels_and_serializes_lowercase() {
        let crop: CropType = "Kidney Beans".parse().unwrap();
        assert_eq!(crop, CropType::KidneyBeans);
        assert_eq!("kidney-beans".parse::<CropType>().unwrap(), CropType::KidneyBeans);
        assert_eq!(serde_json::to_value(crop).unwrap(), "kidney beans");
        assert!("cactus".parse::<CropType>().is_err());
    }

    #[test]
    fn fertilizer_request_flattens_soil() {
        let request = FertilizerRequest {
            soil: SoilReadings {
                n: 90.0,
                ..SoilReadings::default()
            },
            crop_type: CropType::Rice,
        };
        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["N"], 90.0);
        assert_eq!(body["crop_type"], "rice");
    }

    #[test]
    fn registration_checks_mismatch_before_length() {
        let reg = Registration::new("a@b.c", "ann", "abc", "abd");
        assert_eq!(reg.validate().unwrap_err(), "Passwords do not match");
        let reg = Registration::new("a@b.c", "ann", "abc", "abc");
        assert_eq!(
            reg.validate().unwrap_err(),
            "Password must be at least 6 characters long"
        );
        assert!(Registration::new("a@b.c", "ann", "secret", "secret")
            .validate()
            .is_ok());
    }

    #[test]
    fn registration_body_omits_confirmation() {
        let reg = Registration::new("a@b.c", "ann", "secret", "secret");
        let body = serde_json::to_value(&reg).unwrap();
        assert!(body.get("confirm_password").is_none());
        assert_eq!(body["password"], "secret");
    }

    #[test]
    fn image_validation() {
        let pdf = ImageUpload::new("notes.pdf", "application/pdf", vec![0; 10]);
        assert_eq!(pdf.validate().unwrap_err(), "Please select a valid image file");

        let big = ImageUpload::new("leaf.jpg", "image/jpeg", vec![0; 12 * 1024 * 1024]);
        assert_eq!(
            big.validate().unwrap_err(),
            "Image file is too large. Maximum size is 10MB."
        );

        let exact = ImageUpload::new("leaf.png", "image/png", vec![0; 10 * 1024 * 1024]);
        assert!(exact.validate().is_ok());
    }

    #[test]
    fn field_errors_render_without_body_prefix() {
        let detail: ErrorDetail = serde_json::from_value(serde_json::json!([
            {"loc": ["body", "N"], "msg": "field required", "type": "value_error.missing"},
            {"loc": ["body", "ph"], "msg": "ensure this value is less than or equal to 14"}
        ]))
        .unwrap();
        assert_eq!(
            detail.to_string(),
            "N: field required; ph: ensure this value is less than or equal to 14"
        );
    }

    #[test]
    fn string_detail_renders_verbatim() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": "Email already registered"}"#).unwrap();
        assert_eq!(body.detail.unwrap().to_string(), "Email already registered");
    }

    #[test]
    fn naive_and_offset_timestamps_parse() {
        let naive = iso_datetime::parse("2024-03-01T08:15:30.123456").unwrap();
        assert_eq!(naive.offset(), time::UtcOffset::UTC);
        assert_eq!(naive.hour(), 8);
        assert!(iso_datetime::parse("2024-03-01T08:15:30Z").is_some());
        assert!(iso_datetime::parse("yesterday").is_none());
    }

    #[test]
    fn history_page_accepts_detections_key() {
        let page: HistoryPage = serde_json::from_value(serde_json::json!({
            "success": true,
            "count": 1,
            "detections": [{"_id": "x", "created_at": "2024-03-01T08:15:30", "prediction": {"disease": "healthy"}}]
        }))
        .unwrap();
        assert_eq!(page.predictions.len(), 1);
        assert!(page.predictions[0].created_at.is_some());
        assert_eq!(page.predictions[0].extra["_id"], "x");
    }
}
