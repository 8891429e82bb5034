//! Renders a form outcome into a view model any front end can draw.

use crate::types::{CropPrediction, DiseaseDetection, FertilizerPrediction, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Success,
    Failure,
}

/// A labelled line under the headline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub label: &'static str,
    pub value: String,
}

impl Detail {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub kind: ViewKind,
    pub title: &'static str,
    /// Which service produced the result, e.g. "Crop Recommendation"
    pub subtitle: &'static str,
    /// Predicted label on success, failure message otherwise
    pub headline: String,
    pub details: Vec<Detail>,
    /// Ranked alternatives, disease detection only
    pub alternatives: Vec<String>,
}

/// A successful reply that knows how to present itself.
pub trait Present {
    const SERVICE: &'static str;
    const SUCCESS_TITLE: &'static str = "Prediction Successful";
    const FAILURE_TITLE: &'static str = "Prediction Failed";

    fn headline(&self) -> String;

    fn details(&self) -> Vec<Detail>;

    fn alternatives(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Builds the view for an outcome.
pub fn present<T: Present>(outcome: &Outcome<T>) -> ResultView {
    match outcome {
        Outcome::Success(reply) => ResultView {
            kind: ViewKind::Success,
            title: T::SUCCESS_TITLE,
            subtitle: T::SERVICE,
            headline: reply.headline(),
            details: reply.details(),
            alternatives: reply.alternatives(),
        },
        Outcome::Failure { message } => ResultView {
            kind: ViewKind::Failure,
            title: T::FAILURE_TITLE,
            subtitle: T::SERVICE,
            headline: message.clone(),
            details: Vec::new(),
            alternatives: Vec::new(),
        },
    }
}

/// Formats a 0..=1 probability as a percentage with one decimal.
#[must_use]
pub fn percent(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

fn message_and_explanation(message: &str, explanation: Option<&String>) -> Vec<Detail> {
    let mut details = Vec::new();
    if !message.is_empty() {
        details.push(Detail::new("Message", message));
    }
    if let Some(explanation) = explanation.filter(|e| !e.is_empty()) {
        details.push(Detail::new("Explanation", explanation.as_str()));
    }
    details
}

impl Present for CropPrediction {
    const SERVICE: &'static str = "Crop Recommendation";

    fn headline(&self) -> String {
        self.crop.clone()
    }

    fn details(&self) -> Vec<Detail> {
        message_and_explanation(&self.message, self.explanation.as_ref())
    }
}

impl Present for FertilizerPrediction {
    const SERVICE: &'static str = "Fertilizer Recommendation";

    fn headline(&self) -> String {
        self.fertilizer.clone()
    }

    fn details(&self) -> Vec<Detail> {
        message_and_explanation(&self.message, self.explanation.as_ref())
    }
}

impl Present for DiseaseDetection {
    const SERVICE: &'static str = "Disease Detection";
    const SUCCESS_TITLE: &'static str = "Detection Complete";
    const FAILURE_TITLE: &'static str = "Detection Failed";

    fn headline(&self) -> String {
        if self.is_healthy {
            format!("{} (Healthy)", self.plant)
        } else {
            format!("{} - {}", self.plant, self.disease)
        }
    }

    fn details(&self) -> Vec<Detail> {
        let mut details = vec![
            Detail::new("Plant", self.plant.as_str()),
            Detail::new(
                "Status",
                if self.is_healthy { "Healthy" } else { "Diseased" },
            ),
            Detail::new("Confidence", percent(self.confidence)),
        ];
        if !self.is_healthy {
            details.insert(1, Detail::new("Disease", self.disease.as_str()));
        }
        if let Some(recommendation) = &self.recommendation {
            details.push(Detail::new("Recommendation", recommendation.as_str()));
        }
        details
    }

    fn alternatives(&self) -> Vec<String> {
        self.top_predictions
            .iter()
            .map(|p| format!("{} ({}) {}", p.disease, p.plant, percent(p.confidence)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TopPrediction;

    fn rice() -> CropPrediction {
        CropPrediction {
            success: true,
            crop: "Rice".to_string(),
            crop_id: Some(20),
            confidence: None,
            message: "Rice is recommended.".to_string(),
            explanation: None,
        }
    }

    #[test]
    fn crop_success_view() {
        let view = present(&Outcome::Success(rice()));
        assert_eq!(view.kind, ViewKind::Success);
        assert_eq!(view.title, "Prediction Successful");
        assert_eq!(view.subtitle, "Crop Recommendation");
        assert_eq!(view.headline, "Rice");
        assert_eq!(view.details, vec![Detail::new("Message", "Rice is recommended.")]);
    }

    #[test]
    fn failure_view_shows_message() {
        let outcome: Outcome<FertilizerPrediction> = Outcome::Failure {
            message: "N: field required".to_string(),
        };
        let view = present(&outcome);
        assert_eq!(view.kind, ViewKind::Failure);
        assert_eq!(view.title, "Prediction Failed");
        assert_eq!(view.subtitle, "Fertilizer Recommendation");
        assert_eq!(view.headline, "N: field required");
    }

    #[test]
    fn disease_view_lists_alternatives() {
        let detection = DiseaseDetection {
            success: true,
            plant: "Tomato".to_string(),
            disease: "Early blight".to_string(),
            confidence: 0.95,
            is_healthy: false,
            top_predictions: vec![
                TopPrediction {
                    disease: "Early blight".to_string(),
                    plant: "Tomato".to_string(),
                    confidence: 0.95,
                },
                TopPrediction {
                    disease: "Late blight".to_string(),
                    plant: "Tomato".to_string(),
                    confidence: 0.03,
                },
            ],
            message: String::new(),
            recommendation: Some("Remove affected leaves".to_string()),
        };
        let view = present(&Outcome::Success(detection));
        assert_eq!(view.title, "Detection Complete");
        assert_eq!(view.headline, "Tomato - Early blight");
        assert_eq!(view.details[1], Detail::new("Disease", "Early blight"));
        assert!(view.details.contains(&Detail::new("Confidence", "95.0%")));
        assert_eq!(view.alternatives[1], "Late blight (Tomato) 3.0%");
    }
}
