use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_companies_and_users::Companies;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FinancialRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FinancialRecords::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FinancialRecords::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(FinancialRecords::RecordType).string().not_null())
                    .col(ColumnDef::new(FinancialRecords::CustomerId).uuid().null())
                    .col(ColumnDef::new(FinancialRecords::SupplierId).uuid().null())
                    .col(ColumnDef::new(FinancialRecords::OrderId).uuid().null())
                    .col(ColumnDef::new(FinancialRecords::Description).string().not_null())
                    .col(
                        ColumnDef::new(FinancialRecords::Amount)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FinancialRecords::TotalPayed)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(FinancialRecords::DueDate).date().not_null())
                    .col(ColumnDef::new(FinancialRecords::PaymentDate).date().null())
                    .col(
                        ColumnDef::new(FinancialRecords::Status)
                            .string()
                            .not_null()
                            .default("Pending"),
                    )
                    .col(ColumnDef::new(FinancialRecords::PaymentMethod).string().null())
                    .col(ColumnDef::new(FinancialRecords::AsaasPaymentId).string().null())
                    .col(ColumnDef::new(FinancialRecords::BoletoUrl).string().null())
                    .col(ColumnDef::new(FinancialRecords::InvoiceUrl).string().null())
                    .col(
                        ColumnDef::new(FinancialRecords::MercadopagoPaymentId)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(FinancialRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FinancialRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_financial_records_company")
                            .from(FinancialRecords::Table, FinancialRecords::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_financial_records_customer_status")
                    .table(FinancialRecords::Table)
                    .col(FinancialRecords::CompanyId)
                    .col(FinancialRecords::CustomerId)
                    .col(FinancialRecords::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_financial_records_asaas_payment")
                    .table(FinancialRecords::Table)
                    .col(FinancialRecords::AsaasPaymentId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FinancialRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum FinancialRecords {
    Table,
    Id,
    CompanyId,
    RecordType,
    CustomerId,
    SupplierId,
    OrderId,
    Description,
    Amount,
    TotalPayed,
    DueDate,
    PaymentDate,
    Status,
    PaymentMethod,
    AsaasPaymentId,
    BoletoUrl,
    InvoiceUrl,
    MercadopagoPaymentId,
    CreatedAt,
    UpdatedAt,
}
