use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cargas_familiares")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub trabajador_id: i64,
    pub nombre: String,
    pub parentesco: String,
    pub fecha_nacimiento: Option<NaiveDate>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trabajador::Entity",
        from = "Column::TrabajadorId",
        to = "super::trabajador::Column::Id",
        on_delete = "Cascade"
    )]
    Trabajador,
}

impl Related<super::trabajador::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trabajador.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
