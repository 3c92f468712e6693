use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

/// Worker row. `sexo` holds the one-letter code; placement references are nulled when the
/// referenced catalog row goes away.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "trabajadores")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub identity_id: i64,
    pub nombres: String,
    pub apellidos: String,
    pub rut: Option<String>,
    pub sexo: String,
    pub fecha_ingreso: Option<NaiveDate>,
    pub area_id: Option<i64>,
    pub departamento_id: Option<i64>,
    pub cargo_id: Option<i64>,
    pub telefono: String,
    pub direccion: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::identity::Entity",
        from = "Column::IdentityId",
        to = "super::identity::Column::Id",
        on_delete = "Cascade"
    )]
    Identity,
    #[sea_orm(
        belongs_to = "super::area::Entity",
        from = "Column::AreaId",
        to = "super::area::Column::Id",
        on_delete = "SetNull"
    )]
    Area,
    #[sea_orm(
        belongs_to = "super::departamento::Entity",
        from = "Column::DepartamentoId",
        to = "super::departamento::Column::Id",
        on_delete = "SetNull"
    )]
    Departamento,
    #[sea_orm(
        belongs_to = "super::cargo::Entity",
        from = "Column::CargoId",
        to = "super::cargo::Column::Id",
        on_delete = "SetNull"
    )]
    Cargo,
    #[sea_orm(has_many = "super::contacto::Entity")]
    Contacto,
    #[sea_orm(has_many = "super::carga::Entity")]
    Carga,
}

impl Related<super::contacto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contacto.def()
    }
}

impl Related<super::carga::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carga.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
