pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_companies_and_users;
mod m20250101_000002_create_catalog_tables;
mod m20250101_000003_create_orders_tables;
mod m20250101_000004_create_financial_records_table;
mod m20250101_000005_create_equipment_tables;
mod m20250101_000006_create_invoices_and_integrations;
mod m20250101_000007_add_active_invoice_index;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_companies_and_users::Migration),
            Box::new(m20250101_000002_create_catalog_tables::Migration),
            Box::new(m20250101_000003_create_orders_tables::Migration),
            Box::new(m20250101_000004_create_financial_records_table::Migration),
            Box::new(m20250101_000005_create_equipment_tables::Migration),
            Box::new(m20250101_000006_create_invoices_and_integrations::Migration),
            Box::new(m20250101_000007_add_active_invoice_index::Migration),
        ]
    }
}
