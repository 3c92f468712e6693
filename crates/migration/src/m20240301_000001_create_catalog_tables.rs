//! Areas, their departments, and job titles.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Areas::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Areas::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Areas::Nombre)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Departamentos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Departamentos::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Departamentos::Nombre).string_len(100).not_null())
                    .col(ColumnDef::new(Departamentos::AreaId).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_departamentos_area_id")
                            .from(Departamentos::Table, Departamentos::AreaId)
                            .to(Areas::Table, Areas::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_departamentos_nombre_area_id")
                    .table(Departamentos::Table)
                    .col(Departamentos::Nombre)
                    .col(Departamentos::AreaId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Cargos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Cargos::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Cargos::Nombre)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cargos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Departamentos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Areas::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Areas {
    Table,
    Id,
    Nombre,
}

#[derive(Iden)]
enum Departamentos {
    Table,
    Id,
    Nombre,
    AreaId,
}

#[derive(Iden)]
enum Cargos {
    Table,
    Id,
    Nombre,
}
