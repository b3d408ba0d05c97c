//! CSV encoding of the two catalog tables.
//!
//! Column names are part of the download format and stay stable:
//! `video_metadata.csv` and `ratings.csv` always start with a header row,
//! even when they hold no data.

use serde::{Deserialize, Serialize};

use super::CatalogResult;
use crate::models::evaluation::PreferredModel;
use crate::models::{Rating, Scores, VideoMetadata};

pub const METADATA_HEADERS: [&str; 3] =
    ["Video Name", "MatchTime Commentary", "Llava-Qwen Commentary"];

pub const RATINGS_HEADERS: [&str; 7] = [
    "Video Name",
    "Action Accuracy",
    "Player Identification",
    "Scorecard Relevance",
    "Event Chronology",
    "Commentary Quality",
    "Preferred Model",
];

#[derive(Serialize, Deserialize)]
struct MetadataRow {
    #[serde(rename = "Video Name")]
    video_name: String,
    #[serde(rename = "MatchTime Commentary")]
    commentary_a: String,
    #[serde(rename = "Llava-Qwen Commentary")]
    commentary_b: String,
}

#[derive(Serialize, Deserialize)]
struct RatingRow {
    #[serde(rename = "Video Name")]
    video_name: String,
    #[serde(rename = "Action Accuracy")]
    action_accuracy: u8,
    #[serde(rename = "Player Identification")]
    player_identification: u8,
    #[serde(rename = "Scorecard Relevance")]
    scorecard_relevance: u8,
    #[serde(rename = "Event Chronology")]
    event_chronology: u8,
    #[serde(rename = "Commentary Quality")]
    commentary_quality: u8,
    #[serde(rename = "Preferred Model")]
    preferred_model: PreferredModel,
}

impl From<MetadataRow> for VideoMetadata {
    fn from(row: MetadataRow) -> Self {
        Self {
            video_name: row.video_name,
            commentary_a: row.commentary_a,
            commentary_b: row.commentary_b,
        }
    }
}

impl From<&VideoMetadata> for MetadataRow {
    fn from(meta: &VideoMetadata) -> Self {
        Self {
            video_name: meta.video_name.clone(),
            commentary_a: meta.commentary_a.clone(),
            commentary_b: meta.commentary_b.clone(),
        }
    }
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Self {
            video_name: row.video_name,
            scores: Scores {
                action_accuracy: row.action_accuracy,
                player_identification: row.player_identification,
                scorecard_relevance: row.scorecard_relevance,
                event_chronology: row.event_chronology,
                commentary_quality: row.commentary_quality,
            },
            preferred_model: row.preferred_model,
        }
    }
}

impl From<&Rating> for RatingRow {
    fn from(rating: &Rating) -> Self {
        Self {
            video_name: rating.video_name.clone(),
            action_accuracy: rating.scores.action_accuracy,
            player_identification: rating.scores.player_identification,
            scorecard_relevance: rating.scores.scorecard_relevance,
            event_chronology: rating.scores.event_chronology,
            commentary_quality: rating.scores.commentary_quality,
            preferred_model: rating.preferred_model,
        }
    }
}

pub fn read_metadata(content: &[u8]) -> CatalogResult<Vec<VideoMetadata>> {
    read_rows::<MetadataRow, VideoMetadata>(content)
}

pub fn read_ratings(content: &[u8]) -> CatalogResult<Vec<Rating>> {
    read_rows::<RatingRow, Rating>(content)
}

pub fn write_metadata(rows: &[VideoMetadata]) -> CatalogResult<Vec<u8>> {
    write_rows(&METADATA_HEADERS, rows.iter().map(MetadataRow::from))
}

pub fn write_ratings(rows: &[Rating]) -> CatalogResult<Vec<u8>> {
    write_rows(&RATINGS_HEADERS, rows.iter().map(RatingRow::from))
}

fn read_rows<R, T>(content: &[u8]) -> CatalogResult<Vec<T>>
where
    R: for<'de> Deserialize<'de>,
    T: From<R>,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content);

    let mut rows = Vec::new();
    for record in reader.deserialize::<R>() {
        rows.push(T::from(record?));
    }
    Ok(rows)
}

fn write_rows<R: Serialize>(
    headers: &[&str],
    rows: impl Iterator<Item = R>,
) -> CatalogResult<Vec<u8>> {
    // Header is written by hand so an empty table still carries it
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| super::CatalogError::Io(std::io::Error::new(e.error().kind(), e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tables_keep_headers() {
        let ratings = write_ratings(&[]).unwrap();
        assert_eq!(
            String::from_utf8(ratings.clone()).unwrap(),
            "Video Name,Action Accuracy,Player Identification,Scorecard Relevance,\
             Event Chronology,Commentary Quality,Preferred Model\n"
        );
        assert!(read_ratings(&ratings).unwrap().is_empty());

        let metadata = write_metadata(&[]).unwrap();
        assert_eq!(
            String::from_utf8(metadata.clone()).unwrap(),
            "Video Name,MatchTime Commentary,Llava-Qwen Commentary\n"
        );
        assert!(read_metadata(&metadata).unwrap().is_empty());
        assert!(read_metadata(b"").unwrap().is_empty());
    }

    #[test]
    fn test_commentary_with_commas_and_quotes() {
        let meta = VideoMetadata {
            video_name: "derby, second half.mp4".to_string(),
            commentary_a: "Kane shoots, and \"scores\"!\nWhat a finish.".to_string(),
            commentary_b: "Shot scored".to_string(),
        };
        let content = write_metadata(std::slice::from_ref(&meta)).unwrap();
        let text = String::from_utf8(content.clone()).unwrap();
        assert!(text.contains("\"derby, second half.mp4\""));
        assert!(text.contains("\"\"scores\"\""));

        assert_eq!(read_metadata(&content).unwrap(), vec![meta]);
    }

    #[test]
    fn test_reads_existing_ratings_file() {
        let content = b"Video Name,Action Accuracy,Player Identification,Scorecard Relevance,Event Chronology,Commentary Quality,Preferred Model\n\
match1.mp4,8,7,9,6,8,MatchTime\n\
match2.mp4,3,4,5,6,7,Llava-Qwen-Interleave\n";

        let ratings = read_ratings(content).unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].video_name, "match1.mp4");
        assert_eq!(ratings[0].scores.scorecard_relevance, 9);
        assert_eq!(ratings[0].preferred_model, PreferredModel::MatchTime);
        assert_eq!(ratings[1].preferred_model, PreferredModel::LlavaQwenInterleave);

        assert_eq!(write_ratings(&ratings).unwrap(), content.to_vec());
    }

    #[test]
    fn test_rejects_unknown_model() {
        let content = b"Video Name,Action Accuracy,Player Identification,Scorecard Relevance,Event Chronology,Commentary Quality,Preferred Model\n\
match1.mp4,8,7,9,6,8,Other\n";
        assert!(read_ratings(content).is_err());
    }
}
