//! Create `organizations` table.
//! Balance is kept as TEXT so it round-trips as an exact decimal string;
//! profile lists and structures live in JSONB columns defaulting to empty values.
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organizations::Name).text().not_null())
                    .col(ColumnDef::new(Organizations::RubBalance).text().not_null().default("0"))
                    .col(ColumnDef::new(Organizations::VideoCutDescriptionEndSample).text().not_null().default(""))
                    .col(ColumnDef::new(Organizations::PublicationTextEndSample).text().not_null().default(""))
                    .col(empty_json_array(Organizations::ToneOfVoice))
                    .col(empty_json_array(Organizations::BrandRules))
                    .col(empty_json_array(Organizations::ComplianceRules))
                    .col(empty_json_array(Organizations::AudienceInsights))
                    .col(empty_json_array(Organizations::Products))
                    .col(
                        ColumnDef::new(Organizations::Locale)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(empty_json_array(Organizations::AdditionalInfo))
                    .col(
                        ColumnDef::new(Organizations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // fetch-all orders newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_organizations_created_at")
                    .table(Organizations::Table)
                    .col(Organizations::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Organizations::Table).if_exists().cascade().to_owned())
            .await
    }
}

fn empty_json_array(col: Organizations) -> ColumnDef {
    ColumnDef::new(col)
        .json_binary()
        .not_null()
        .default(Expr::cust("'[]'::jsonb"))
        .to_owned()
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    RubBalance,
    VideoCutDescriptionEndSample,
    PublicationTextEndSample,
    ToneOfVoice,
    BrandRules,
    ComplianceRules,
    AudienceInsights,
    Products,
    Locale,
    AdditionalInfo,
    CreatedAt,
}
