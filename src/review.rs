use serde::{Deserialize, Serialize};

/// Above this confidence a headline is shown as reliable.
pub const RELIABLE_CONFIDENCE: u8 = 85;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsHeadline {
    pub title: String,
    pub category: String,
    pub source: String,
    pub content: String,
    /// Percentage as sent by the model; may be fractional or out of range.
    pub confidence: f64,
    #[serde(default, rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl NewsHeadline {
    /// Confidence clamped to 0..=100.
    pub fn confidence_percent(&self) -> u8 {
        if self.confidence.is_nan() {
            return 0;
        }
        self.confidence.round().clamp(0.0, 100.0) as u8
    }

    pub fn is_reliable(&self) -> bool {
        self.confidence_percent() > RELIABLE_CONFIDENCE
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Opportunity {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub deadline: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Innovation {
    pub title: String,
    pub description: String,
    #[serde(default, rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateDetails {
    pub pro: String,
    pub con: String,
    pub pro_expert: String,
    pub con_expert: String,
}

/// The daily digest as produced by the text model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredReview {
    pub date: String,
    pub debate_question: String,
    pub summary: String,
    pub headlines: Vec<NewsHeadline>,
    pub opportunities: Vec<Opportunity>,
    pub innovation: Innovation,
    pub debate_details: DebateDetails,
    pub mot_enseignant: String,
    pub sources: Vec<String>,
    pub caricature_caption: String,
}

impl StructuredReview {
    /// Text read aloud by the audio player.
    pub fn narration(&self) -> String {
        format!(
            "{} ... Aujourd'hui, je vous pose cette question : {}",
            self.summary, self.debate_question
        )
    }
}

/// Everything the page needs once loading succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPage {
    pub review: StructuredReview,
    pub caricature_url: String,
}

pub const LOAD_FAILED_MESSAGE: &str =
    "Impossible de charger la revue de presse. Veuillez réessayer.";

#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    Loading,
    Ready(ReviewPage),
    Failed(String),
}
