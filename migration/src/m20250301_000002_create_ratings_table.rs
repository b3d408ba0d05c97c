use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ratings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ratings::VideoName).string().not_null())
                    .col(ColumnDef::new(Ratings::ActionAccuracy).tiny_unsigned().not_null())
                    .col(ColumnDef::new(Ratings::PlayerIdentification).tiny_unsigned().not_null())
                    .col(ColumnDef::new(Ratings::ScorecardRelevance).tiny_unsigned().not_null())
                    .col(ColumnDef::new(Ratings::EventChronology).tiny_unsigned().not_null())
                    .col(ColumnDef::new(Ratings::CommentaryQuality).tiny_unsigned().not_null())
                    .col(ColumnDef::new(Ratings::PreferredModel).string().not_null())
                    .col(ColumnDef::new(Ratings::SubmittedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Cascade is done by the catalog itself, the index keeps it cheap
        manager
            .create_index(
                Index::create()
                    .name("idx_ratings_video_name")
                    .table(Ratings::Table)
                    .col(Ratings::VideoName)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ratings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    Id,
    VideoName,
    ActionAccuracy,
    PlayerIdentification,
    ScorecardRelevance,
    EventChronology,
    CommentaryQuality,
    PreferredModel,
    SubmittedAt,
}
