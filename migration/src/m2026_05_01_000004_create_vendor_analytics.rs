//! Migration to create the vendor_analytics table.
//!
//! Zero-initialized metrics row seeded alongside the vendor profile at
//! approval time. Non-critical: approval proceeds even when this table is
//! unavailable.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VendorAnalytics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VendorAnalytics::IdentityId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VendorAnalytics::ListingsCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VendorAnalytics::TotalViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VendorAnalytics::TotalContacts)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VendorAnalytics::ConversionRate)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(VendorAnalytics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VendorAnalytics::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VendorAnalytics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VendorAnalytics {
    Table,
    IdentityId,
    ListingsCount,
    TotalViews,
    TotalContacts,
    ConversionRate,
    CreatedAt,
    UpdatedAt,
}
