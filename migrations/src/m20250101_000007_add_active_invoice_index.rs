use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// At most one processing or authorized NF-e per order. Failed and cancelled
/// invoices stay outside the index so an order can be invoiced again.
const CREATE_ACTIVE_INVOICE_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS ux_invoices_active_order \
     ON invoices (order_id) WHERE status IN ('processing', 'authorized')";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(CREATE_ACTIVE_INVOICE_INDEX)
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("ux_invoices_active_order")
                    .table(Alias::new("invoices"))
                    .to_owned(),
            )
            .await
    }
}
