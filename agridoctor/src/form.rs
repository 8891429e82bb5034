//! Prediction forms and the submit state machine that drives them.
//!
//! A [`FormController`] moves `Idle -> Submitting -> Succeeded | Failed` and
//! back to `Idle` on reset or edit. At most one request is in flight per
//! controller: [`FormController::begin_submit`] refuses while submitting.

use crate::types::{
    CropPrediction, CropType, DiseaseDetection, FertilizerPrediction, FertilizerRequest,
    ImageUpload, Outcome, ServiceReply, SoilField, SoilReadings,
};
use crate::{AgriClient, Error};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// A form that turns its fields into one request against the service.
#[allow(async_fn_in_trait)]
pub trait PredictionForm {
    type Request;
    type Response: ServiceReply;

    /// Error shown when the failure carries no readable detail.
    const FALLBACK_ERROR: &'static str;
    /// Message stored in the failure outcome when there is no detail.
    const FALLBACK_RESULT: &'static str;

    /// Validates the fields and builds the request.
    ///
    /// # Errors
    /// Returns the message to display when a field is missing or malformed.
    fn build_request(&self) -> Result<Self::Request, String>;

    /// Sends the request.
    ///
    /// # Errors
    /// Propagates the client error.
    async fn send(client: &AgriClient, request: &Self::Request) -> Result<Self::Response, Error>;

    /// Empties every field.
    fn clear(&mut self);
}

/// Holds a form's fields together with its status, result and error.
pub struct FormController<F: PredictionForm> {
    form: F,
    status: FormStatus,
    result: Option<Outcome<F::Response>>,
    error: Option<String>,
}

impl<F: PredictionForm + Default> Default for FormController<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F: PredictionForm> FormController<F> {
    pub const fn new(form: F) -> Self {
        Self {
            form,
            status: FormStatus::Idle,
            result: None,
            error: None,
        }
    }

    pub const fn form(&self) -> &F {
        &self.form
    }

    pub const fn status(&self) -> FormStatus {
        self.status
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self.status, FormStatus::Submitting)
    }

    pub const fn result(&self) -> Option<&Outcome<F::Response>> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Applies a field edit. Clears a shown error but keeps a shown result.
    pub fn edit(&mut self, change: impl FnOnce(&mut F)) {
        change(&mut self.form);
        self.error = None;
        if !self.is_loading() {
            self.status = FormStatus::Idle;
        }
    }

    /// Clears fields, result and error.
    pub fn reset(&mut self) {
        self.form.clear();
        self.result = None;
        self.error = None;
        self.status = FormStatus::Idle;
    }

    /// Validates and enters `Submitting`, handing back the request to send.
    ///
    /// Returns `None` without side effects while a request is in flight, or
    /// with the validation message stored when the fields are invalid.
    pub fn begin_submit(&mut self) -> Option<F::Request> {
        if self.is_loading() {
            debug!("submit ignored; request already in flight");
            return None;
        }
        match self.form.build_request() {
            Ok(request) => {
                self.error = None;
                self.status = FormStatus::Submitting;
                Some(request)
            }
            Err(message) => {
                self.error = Some(message);
                None
            }
        }
    }

    /// Records the reply of the in-flight request. Ignored when nothing is in
    /// flight, e.g. after a reset.
    pub fn finish(&mut self, reply: Result<F::Response, Error>) {
        if !self.is_loading() {
            debug!("dropping reply for a form that is no longer submitting");
            return;
        }
        match reply {
            Ok(response) if response.success() => {
                self.status = FormStatus::Succeeded;
                self.error = None;
                self.result = Some(Outcome::Success(response));
            }
            Ok(response) => {
                let message = if response.message().is_empty() {
                    F::FALLBACK_RESULT.to_string()
                } else {
                    response.message().to_string()
                };
                self.status = FormStatus::Failed;
                self.error = Some(message.clone());
                self.result = Some(Outcome::Failure { message });
            }
            Err(err) => {
                debug!(error = %err, "submission failed");
                let detail = err.detail_message();
                self.status = FormStatus::Failed;
                self.error = Some(
                    detail
                        .clone()
                        .unwrap_or_else(|| F::FALLBACK_ERROR.to_string()),
                );
                self.result = Some(Outcome::Failure {
                    message: detail.unwrap_or_else(|| F::FALLBACK_RESULT.to_string()),
                });
            }
        }
    }

    /// Runs a full submission: validate, send, record the reply.
    pub async fn submit(&mut self, client: &AgriClient) -> FormStatus {
        let Some(request) = self.begin_submit() else {
            return self.status;
        };
        let reply = F::send(client, &request).await;
        self.finish(reply);
        self.status
    }
}

// =============================================================================
// SOIL INPUTS
// =============================================================================

/// Raw text of the seven soil and climate inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoilInputs {
    values: [String; 7],
}

impl SoilInputs {
    pub fn set(&mut self, field: SoilField, value: impl Into<String>) {
        self.values[field.index()] = value.into();
    }

    #[must_use]
    pub fn get(&self, field: SoilField) -> &str {
        &self.values[field.index()]
    }

    /// Fills every input from typed readings.
    pub fn fill(&mut self, readings: &SoilReadings) {
        for field in SoilField::ALL {
            self.set(field, readings.get(field).to_string());
        }
    }

    /// Checks that every input is a finite number, then coerces.
    ///
    /// # Errors
    /// Names the first missing or non-numeric input.
    pub fn parse(&self) -> Result<SoilReadings, String> {
        for field in SoilField::ALL {
            let text = self.get(field).trim();
            if text.is_empty() {
                return Err(format!("{} is required", field.label()));
            }
            if !text.parse::<f64>().is_ok_and(f64::is_finite) {
                return Err(format!("{} must be a number", field.label()));
            }
        }
        Ok(SoilReadings::coerce(|field| self.get(field)))
    }

    pub fn clear(&mut self) {
        self.values = Default::default();
    }
}

// =============================================================================
// FORMS
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct CropForm {
    pub soil: SoilInputs,
}

impl PredictionForm for CropForm {
    type Request = SoilReadings;
    type Response = CropPrediction;

    const FALLBACK_ERROR: &'static str = "Failed to get crop prediction. Please try again.";
    const FALLBACK_RESULT: &'static str = "Prediction failed";

    fn build_request(&self) -> Result<SoilReadings, String> {
        self.soil.parse()
    }

    async fn send(client: &AgriClient, request: &SoilReadings) -> Result<CropPrediction, Error> {
        client.predict_crop(request).await
    }

    fn clear(&mut self) {
        self.soil.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct FertilizerForm {
    pub soil: SoilInputs,
    pub crop_type: Option<CropType>,
}

impl PredictionForm for FertilizerForm {
    type Request = FertilizerRequest;
    type Response = FertilizerPrediction;

    const FALLBACK_ERROR: &'static str = "Failed to get fertilizer prediction. Please try again.";
    const FALLBACK_RESULT: &'static str = "Prediction failed";

    fn build_request(&self) -> Result<FertilizerRequest, String> {
        let crop_type = self
            .crop_type
            .ok_or_else(|| "Please select a crop type".to_string())?;
        Ok(FertilizerRequest {
            soil: self.soil.parse()?,
            crop_type,
        })
    }

    async fn send(
        client: &AgriClient,
        request: &FertilizerRequest,
    ) -> Result<FertilizerPrediction, Error> {
        client.predict_fertilizer(request).await
    }

    fn clear(&mut self) {
        self.soil.clear();
        self.crop_type = None;
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiseaseForm {
    image: Option<ImageUpload>,
}

impl DiseaseForm {
    pub const fn image(&self) -> Option<&ImageUpload> {
        self.image.as_ref()
    }
}

impl PredictionForm for DiseaseForm {
    type Request = ImageUpload;
    type Response = DiseaseDetection;

    const FALLBACK_ERROR: &'static str = "Failed to detect disease. Please try again.";
    const FALLBACK_RESULT: &'static str = "Detection failed";

    fn build_request(&self) -> Result<ImageUpload, String> {
        self.image
            .clone()
            .ok_or_else(|| "Please select an image first".to_string())
    }

    async fn send(client: &AgriClient, request: &ImageUpload) -> Result<DiseaseDetection, Error> {
        client.detect_disease(request).await
    }

    fn clear(&mut self) {
        self.image = None;
    }
}

impl FormController<DiseaseForm> {
    /// Selects an image. Non-images and files over 10 MiB are rejected with
    /// an error and leave the previous selection untouched. An accepted image
    /// clears any error and any previous result.
    pub fn select_image(&mut self, upload: ImageUpload) -> bool {
        if let Err(message) = upload.validate() {
            self.error = Some(message);
            return false;
        }
        self.form.image = Some(upload);
        self.error = None;
        self.result = None;
        if !self.is_loading() {
            self.status = FormStatus::Idle;
        }
        true
    }
}
