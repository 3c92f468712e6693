//! Worker records with their emergency contacts and family dependents.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trabajadores::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Trabajadores::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Trabajadores::IdentityId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Trabajadores::Nombres).string_len(100).not_null())
                    .col(ColumnDef::new(Trabajadores::Apellidos).string_len(100).not_null())
                    .col(ColumnDef::new(Trabajadores::Rut).string_len(12).null())
                    .col(ColumnDef::new(Trabajadores::Sexo).string_len(1).not_null())
                    .col(ColumnDef::new(Trabajadores::FechaIngreso).date().null())
                    .col(ColumnDef::new(Trabajadores::AreaId).big_integer().null())
                    .col(ColumnDef::new(Trabajadores::DepartamentoId).big_integer().null())
                    .col(ColumnDef::new(Trabajadores::CargoId).big_integer().null())
                    .col(
                        ColumnDef::new(Trabajadores::Telefono)
                            .string_len(20)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Trabajadores::Direccion).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trabajadores_identity_id")
                            .from(Trabajadores::Table, Trabajadores::IdentityId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trabajadores_area_id")
                            .from(Trabajadores::Table, Trabajadores::AreaId)
                            .to(Areas::Table, Areas::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trabajadores_departamento_id")
                            .from(Trabajadores::Table, Trabajadores::DepartamentoId)
                            .to(Departamentos::Table, Departamentos::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trabajadores_cargo_id")
                            .from(Trabajadores::Table, Trabajadores::CargoId)
                            .to(Cargos::Table, Cargos::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContactosEmergencia::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContactosEmergencia::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContactosEmergencia::TrabajadorId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContactosEmergencia::Nombre)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContactosEmergencia::Parentesco)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContactosEmergencia::Telefono)
                            .string_len(20)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contactos_emergencia_trabajador_id")
                            .from(ContactosEmergencia::Table, ContactosEmergencia::TrabajadorId)
                            .to(Trabajadores::Table, Trabajadores::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contactos_emergencia_trabajador_id")
                    .table(ContactosEmergencia::Table)
                    .col(ContactosEmergencia::TrabajadorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CargasFamiliares::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CargasFamiliares::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CargasFamiliares::TrabajadorId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CargasFamiliares::Nombre)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CargasFamiliares::Parentesco)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(ColumnDef::new(CargasFamiliares::FechaNacimiento).date().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cargas_familiares_trabajador_id")
                            .from(CargasFamiliares::Table, CargasFamiliares::TrabajadorId)
                            .to(Trabajadores::Table, Trabajadores::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cargas_familiares_trabajador_id")
                    .table(CargasFamiliares::Table)
                    .col(CargasFamiliares::TrabajadorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CargasFamiliares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContactosEmergencia::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Trabajadores::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Trabajadores {
    Table,
    Id,
    IdentityId,
    Nombres,
    Apellidos,
    Rut,
    Sexo,
    FechaIngreso,
    AreaId,
    DepartamentoId,
    CargoId,
    Telefono,
    Direccion,
}

#[derive(Iden)]
enum ContactosEmergencia {
    Table,
    Id,
    TrabajadorId,
    Nombre,
    Parentesco,
    Telefono,
}

#[derive(Iden)]
enum CargasFamiliares {
    Table,
    Id,
    TrabajadorId,
    Nombre,
    Parentesco,
    FechaNacimiento,
}

#[derive(Iden)]
enum Identities {
    Table,
    Id,
}

#[derive(Iden)]
enum Areas {
    Table,
    Id,
}

#[derive(Iden)]
enum Departamentos {
    Table,
    Id,
}

#[derive(Iden)]
enum Cargos {
    Table,
    Id,
}
