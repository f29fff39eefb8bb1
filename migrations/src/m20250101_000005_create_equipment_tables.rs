use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_companies_and_users::Companies;
use super::m20250101_000002_create_catalog_tables::{Customers, Products};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EquipmentLoans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EquipmentLoans::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EquipmentLoans::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(EquipmentLoans::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(EquipmentLoans::ProductId).uuid().not_null())
                    .col(ColumnDef::new(EquipmentLoans::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(EquipmentLoans::ReturnedQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(EquipmentLoans::LoanDate).date().not_null())
                    .col(
                        ColumnDef::new(EquipmentLoans::ExpectedReturnDate)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EquipmentLoans::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(EquipmentLoans::Notes).text().null())
                    .col(
                        ColumnDef::new(EquipmentLoans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EquipmentLoans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_equipment_loans_company")
                            .from(EquipmentLoans::Table, EquipmentLoans::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_equipment_loans_customer")
                            .from(EquipmentLoans::Table, EquipmentLoans::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_equipment_loans_product")
                            .from(EquipmentLoans::Table, EquipmentLoans::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EquipmentReturns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EquipmentReturns::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EquipmentReturns::CompanyId).uuid().not_null())
                    .col(ColumnDef::new(EquipmentReturns::LoanId).uuid().not_null())
                    .col(ColumnDef::new(EquipmentReturns::Quantity).integer().not_null())
                    .col(ColumnDef::new(EquipmentReturns::ReturnDate).date().not_null())
                    .col(ColumnDef::new(EquipmentReturns::Condition).string().null())
                    .col(ColumnDef::new(EquipmentReturns::Notes).text().null())
                    .col(ColumnDef::new(EquipmentReturns::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(EquipmentReturns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_equipment_returns_loan")
                            .from(EquipmentReturns::Table, EquipmentReturns::LoanId)
                            .to(EquipmentLoans::Table, EquipmentLoans::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EquipmentReturns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EquipmentLoans::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum EquipmentLoans {
    Table,
    Id,
    CompanyId,
    CustomerId,
    ProductId,
    Quantity,
    ReturnedQuantity,
    LoanDate,
    ExpectedReturnDate,
    Status,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum EquipmentReturns {
    Table,
    Id,
    CompanyId,
    LoanId,
    Quantity,
    ReturnDate,
    Condition,
    Notes,
    CreatedBy,
    CreatedAt,
}
