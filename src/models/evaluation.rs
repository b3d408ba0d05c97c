//! Domain types shared by both catalog backends and the HTTP layer.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::CatalogError;
pub use crate::entities::rating::PreferredModel;

pub const SCORE_MIN: u8 = 1;
pub const SCORE_MAX: u8 = 10;
pub const SCORE_DEFAULT: u8 = 5;

/// Extensions accepted for uploads and shown when listing the video directory.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// The fixed rubric every commentary pair is scored against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Metric {
    #[serde(rename = "Action Accuracy")]
    ActionAccuracy,
    #[serde(rename = "Player Identification")]
    PlayerIdentification,
    #[serde(rename = "Scorecard Relevance")]
    ScorecardRelevance,
    #[serde(rename = "Event Chronology")]
    EventChronology,
    #[serde(rename = "Commentary Quality")]
    CommentaryQuality,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::ActionAccuracy,
        Metric::PlayerIdentification,
        Metric::ScorecardRelevance,
        Metric::EventChronology,
        Metric::CommentaryQuality,
    ];

    /// Column header used in `ratings.csv`.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::ActionAccuracy => "Action Accuracy",
            Metric::PlayerIdentification => "Player Identification",
            Metric::ScorecardRelevance => "Scorecard Relevance",
            Metric::EventChronology => "Event Chronology",
            Metric::CommentaryQuality => "Commentary Quality",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Metric::ActionAccuracy => "How well the commentary captures the action in the video.",
            Metric::PlayerIdentification => {
                "How accurately the commentary identifies the players involved."
            }
            Metric::ScorecardRelevance => {
                "How well the commentary reflects the score or state of the game."
            }
            Metric::EventChronology => {
                "How well the sequence of events in the commentary matches the video."
            }
            Metric::CommentaryQuality => {
                "The overall relevance, fluency, and engagement level of the commentary."
            }
        }
    }
}

/// One score per rubric metric. Accepts both the column names and snake_case keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Scores {
    #[serde(rename = "Action Accuracy", alias = "action_accuracy")]
    pub action_accuracy: u8,
    #[serde(rename = "Player Identification", alias = "player_identification")]
    pub player_identification: u8,
    #[serde(rename = "Scorecard Relevance", alias = "scorecard_relevance")]
    pub scorecard_relevance: u8,
    #[serde(rename = "Event Chronology", alias = "event_chronology")]
    pub event_chronology: u8,
    #[serde(rename = "Commentary Quality", alias = "commentary_quality")]
    pub commentary_quality: u8,
}

impl Scores {
    pub fn get(&self, metric: Metric) -> u8 {
        match metric {
            Metric::ActionAccuracy => self.action_accuracy,
            Metric::PlayerIdentification => self.player_identification,
            Metric::ScorecardRelevance => self.scorecard_relevance,
            Metric::EventChronology => self.event_chronology,
            Metric::CommentaryQuality => self.commentary_quality,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for metric in Metric::ALL {
            let score = self.get(metric);
            if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
                return Err(CatalogError::Validation(format!(
                    "{} must be between {} and {}, got {}",
                    metric.column(),
                    SCORE_MIN,
                    SCORE_MAX,
                    score
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VideoMetadata {
    pub video_name: String,
    /// Commentary produced by MatchTime.
    pub commentary_a: String,
    /// Commentary produced by Llava-Qwen-Interleave.
    pub commentary_b: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Rating {
    pub video_name: String,
    pub scores: Scores,
    pub preferred_model: PreferredModel,
}

impl Rating {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.video_name.trim().is_empty() {
            return Err(CatalogError::Validation("Video name is required".to_string()));
        }
        self.scores.validate()
    }
}

/// Everything the upload form collects before a video enters the catalog.
#[derive(Clone, Debug)]
pub struct NewVideo {
    pub video_name: String,
    pub data: Vec<u8>,
    pub commentary_a: String,
    pub commentary_b: String,
}

impl NewVideo {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.data.is_empty()
            || self.commentary_a.trim().is_empty()
            || self.commentary_b.trim().is_empty()
        {
            return Err(CatalogError::Validation(
                "Please upload a video and provide both commentaries".to_string(),
            ));
        }
        validate_video_name(&self.video_name)
    }

    pub fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            video_name: self.video_name.clone(),
            commentary_a: self.commentary_a.clone(),
            commentary_b: self.commentary_b.clone(),
        }
    }
}

/// Lowercased extension of `name` if it is one of [`VIDEO_EXTENSIONS`].
pub fn video_extension(name: &str) -> Option<String> {
    let ext = Path::new(name)
        .extension()
        .and_then(std::ffi::OsStr::to_str)?
        .to_ascii_lowercase();
    VIDEO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// A video name doubles as the on-disk file name, so it must be a bare file name.
pub fn validate_video_name(name: &str) -> Result<(), CatalogError> {
    validate_file_name(name)?;
    if video_extension(name).is_none() {
        return Err(CatalogError::Validation(format!(
            "Unsupported video type for '{}', expected one of: {}",
            name,
            VIDEO_EXTENSIONS.join(", ")
        )));
    }
    Ok(())
}

/// A name that can only ever address a file directly inside the video directory.
pub fn validate_file_name(name: &str) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::Validation("Video name is required".to_string()));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(CatalogError::Validation(format!("Invalid video name '{}'", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(value: u8) -> Scores {
        Scores {
            action_accuracy: value,
            player_identification: value,
            scorecard_relevance: value,
            event_chronology: value,
            commentary_quality: value,
        }
    }

    #[test]
    fn test_score_bounds() {
        assert!(scores(1).validate().is_ok());
        assert!(scores(10).validate().is_ok());
        assert!(matches!(scores(0).validate(), Err(CatalogError::Validation(_))));
        assert!(matches!(scores(11).validate(), Err(CatalogError::Validation(_))));

        let mut one_bad = scores(5);
        one_bad.event_chronology = 11;
        let err = one_bad.validate().unwrap_err();
        assert!(err.to_string().contains("Event Chronology"));
    }

    #[test]
    fn test_scores_accept_column_and_snake_case_keys() {
        let by_column: Scores = serde_json::from_str(
            r#"{"Action Accuracy":8,"Player Identification":7,"Scorecard Relevance":9,
                "Event Chronology":6,"Commentary Quality":8}"#,
        )
        .unwrap();
        let by_field: Scores = serde_json::from_str(
            r#"{"action_accuracy":8,"player_identification":7,"scorecard_relevance":9,
                "event_chronology":6,"commentary_quality":8}"#,
        )
        .unwrap();
        assert_eq!(by_column, by_field);
        assert_eq!(by_column.get(Metric::ScorecardRelevance), 9);
    }

    #[test]
    fn test_preferred_model_labels() {
        let model: PreferredModel = serde_json::from_str("\"Llava-Qwen-Interleave\"").unwrap();
        assert_eq!(model, PreferredModel::LlavaQwenInterleave);
        assert_eq!(serde_json::to_string(&PreferredModel::MatchTime).unwrap(), "\"MatchTime\"");
        assert!(serde_json::from_str::<PreferredModel>("\"GPT\"").is_err());
    }

    #[test]
    fn test_video_name_rules() {
        assert!(validate_video_name("match1.mp4").is_ok());
        assert!(validate_video_name("Final Highlights.MOV").is_ok());
        assert!(validate_video_name("clip.avi").is_ok());

        assert!(validate_video_name("").is_err());
        assert!(validate_video_name("notes.txt").is_err());
        assert!(validate_video_name("no_extension").is_err());
        assert!(validate_video_name("../escape.mp4").is_err());
        assert!(validate_video_name("dir\\clip.mp4").is_err());
    }

    #[test]
    fn test_file_name_rejects_traversal() {
        assert!(validate_file_name("match1.mp4").is_ok());
        assert!(validate_file_name("legacy.webm").is_ok());

        for bad in ["", " ", ".", "..", "../ratings.csv", "a/b.mp4", "a\\b.mp4", "a\0.mp4"] {
            assert!(
                matches!(validate_file_name(bad), Err(CatalogError::Validation(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_new_video_requires_every_field() {
        let complete = NewVideo {
            video_name: "match1.mp4".to_string(),
            data: vec![1, 2, 3],
            commentary_a: "Goal!".to_string(),
            commentary_b: "Shot scored".to_string(),
        };
        assert!(complete.validate().is_ok());

        let mut blank = complete.clone();
        blank.commentary_b = "   ".to_string();
        assert!(blank.validate().is_err());

        let mut empty_file = complete.clone();
        empty_file.data.clear();
        assert!(empty_file.validate().is_err());
    }
}
