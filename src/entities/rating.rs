use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "ratings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub video_name: String,
    pub action_accuracy: u8,
    pub player_identification: u8,
    pub scorecard_relevance: u8,
    pub event_chronology: u8,
    pub commentary_quality: u8,
    pub preferred_model: PreferredModel,
    pub submitted_at: DateTime,
}

/// The two commentary generators under comparison.
#[derive(
    EnumIter, DeriveActiveEnum, Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum PreferredModel {
    #[sea_orm(string_value = "MatchTime")]
    #[serde(rename = "MatchTime")]
    MatchTime,
    #[sea_orm(string_value = "Llava-Qwen-Interleave")]
    #[serde(rename = "Llava-Qwen-Interleave")]
    LlavaQwenInterleave,
}

impl PreferredModel {
    pub fn label(&self) -> &'static str {
        match self {
            PreferredModel::MatchTime => "MatchTime",
            PreferredModel::LlavaQwenInterleave => "Llava-Qwen-Interleave",
        }
    }
}

impl std::fmt::Display for PreferredModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
