use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

/// Account row. Group membership lives in `identity_groups`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "identities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub date_joined: NaiveDate,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::identity_group::Entity")]
    IdentityGroup,
    #[sea_orm(has_many = "super::session::Entity")]
    Session,
}

impl Related<super::identity_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IdentityGroup.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
