//! Migration to create the vendor_applications table.
//!
//! Applications are keyed by the owning identity ID rather than the internal
//! user ID, since the identity ID is stable across both linkage shapes.
//! Rows are never hard-deleted; reviewed applications remain as audit trail.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VendorApplications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VendorApplications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VendorApplications::IdentityId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorApplications::Categories)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorApplications::BusinessName)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorApplications::BusinessDescription)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorApplications::ContactEmail)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorApplications::ContactPhone)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(VendorApplications::Address).text().not_null())
                    .col(ColumnDef::new(VendorApplications::Website).text().null())
                    .col(
                        ColumnDef::new(VendorApplications::VerificationData)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VendorApplications::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(VendorApplications::ReviewerId).uuid().null())
                    .col(
                        ColumnDef::new(VendorApplications::ReviewedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(VendorApplications::AdminNotes).text().null())
                    .col(
                        ColumnDef::new(VendorApplications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VendorApplications::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Deliberately not unique: an identity may hold several pending
        // applications at once.
        manager
            .create_index(
                Index::create()
                    .name("idx_vendor_applications_identity_id")
                    .table(VendorApplications::Table)
                    .col(VendorApplications::IdentityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vendor_applications_status")
                    .table(VendorApplications::Table)
                    .col(VendorApplications::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VendorApplications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VendorApplications {
    Table,
    Id,
    IdentityId,
    Categories,
    BusinessName,
    BusinessDescription,
    ContactEmail,
    ContactPhone,
    Address,
    Website,
    VerificationData,
    Status,
    ReviewerId,
    ReviewedAt,
    AdminNotes,
    CreatedAt,
    UpdatedAt,
}
