use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_companies_and_users::Companies;
use super::m20250101_000003_create_orders_tables::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Invoices::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Invoices::OrderId).uuid().not_null())
                    .col(ColumnDef::new(Invoices::CustomerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Invoices::Reference)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Invoices::Status)
                            .string()
                            .not_null()
                            .default("processing"),
                    )
                    .col(ColumnDef::new(Invoices::Number).string().null())
                    .col(ColumnDef::new(Invoices::Series).string().null())
                    .col(ColumnDef::new(Invoices::AccessKey).string_len(44).null())
                    .col(ColumnDef::new(Invoices::XmlUrl).string().null())
                    .col(ColumnDef::new(Invoices::DanfeUrl).string().null())
                    .col(ColumnDef::new(Invoices::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(Invoices::TotalAmount)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::IssuedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_company")
                            .from(Invoices::Table, Invoices::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_order")
                            .from(Invoices::Table, Invoices::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CompanyIntegrations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CompanyIntegrations::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CompanyIntegrations::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(CompanyIntegrations::Provider).string().not_null())
                    .col(
                        ColumnDef::new(CompanyIntegrations::Environment)
                            .string()
                            .not_null()
                            .default("sandbox"),
                    )
                    .col(ColumnDef::new(CompanyIntegrations::ApiKey).string().not_null())
                    .col(ColumnDef::new(CompanyIntegrations::WebhookToken).string().null())
                    .col(
                        ColumnDef::new(CompanyIntegrations::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(CompanyIntegrations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CompanyIntegrations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_company_integrations_company")
                            .from(CompanyIntegrations::Table, CompanyIntegrations::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_company_integrations_provider")
                    .table(CompanyIntegrations::Table)
                    .col(CompanyIntegrations::CompanyId)
                    .col(CompanyIntegrations::Provider)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(Notifications::UserId).uuid().null())
                    .col(ColumnDef::new(Notifications::Title).string().not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(
                        ColumnDef::new(Notifications::Kind)
                            .string()
                            .not_null()
                            .default("info"),
                    )
                    .col(
                        ColumnDef::new(Notifications::Read)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_company")
                            .from(Notifications::Table, Notifications::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CompanyIntegrations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Invoices {
    Table,
    Id,
    CompanyId,
    OrderId,
    CustomerId,
    Reference,
    Status,
    Number,
    Series,
    AccessKey,
    XmlUrl,
    DanfeUrl,
    ErrorMessage,
    TotalAmount,
    IssuedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum CompanyIntegrations {
    Table,
    Id,
    CompanyId,
    Provider,
    Environment,
    ApiKey,
    WebhookToken,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Notifications {
    Table,
    Id,
    CompanyId,
    UserId,
    Title,
    Message,
    Kind,
    Read,
    CreatedAt,
}
