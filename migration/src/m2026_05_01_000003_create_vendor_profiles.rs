//! Migration to create the vendor_profiles table.
//!
//! The unique index on identity_id is load-bearing: the approval cascade
//! relies on the resulting conflict to make repeated approvals a no-op.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VendorProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VendorProfiles::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VendorProfiles::IdentityId).uuid().not_null())
                    .col(
                        ColumnDef::new(VendorProfiles::BusinessName)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorProfiles::BusinessDescription)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorProfiles::ContactEmail)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorProfiles::ContactPhone)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(VendorProfiles::Address).text().not_null())
                    .col(ColumnDef::new(VendorProfiles::Website).text().null())
                    .col(
                        ColumnDef::new(VendorProfiles::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(VendorProfiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vendor_profiles_identity_id")
                    .table(VendorProfiles::Table)
                    .col(VendorProfiles::IdentityId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VendorProfiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VendorProfiles {
    Table,
    Id,
    IdentityId,
    BusinessName,
    BusinessDescription,
    ContactEmail,
    ContactPhone,
    Address,
    Website,
    Status,
    CreatedAt,
}
