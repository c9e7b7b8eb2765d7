use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Printer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Printer::PrinterId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Printer::Brand).string())
                    .col(ColumnDef::new(Printer::Model).string())
                    .col(ColumnDef::new(Printer::Name).string())
                    .col(ColumnDef::new(Printer::PowerConsumption).double())
                    .col(ColumnDef::new(Printer::PurchasePrice).double())
                    .col(ColumnDef::new(Printer::EstimatedLifespan).double())
                    .col(ColumnDef::new(Printer::MaintenanceCosts).double())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Printer::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Printer {
    #[iden = "Printer"]
    Table,
    PrinterId,
    Brand,
    Model,
    Name,
    PowerConsumption,
    PurchasePrice,
    EstimatedLifespan,
    MaintenanceCosts,
}
