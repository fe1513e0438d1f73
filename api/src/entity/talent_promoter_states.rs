use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "talent_promoter_states")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub talent_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub promoter_id: i64,
    pub trust_score: i32,
    pub last_contacted: Option<DateTimeWithTimeZone>,
    pub last_reply: Option<DateTimeWithTimeZone>,
    pub opted_out: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
