use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "campaign_invitations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub campaign_id: i64,
    pub talent_id: i64,
    pub promoter_id: i64,
    pub event_id: i64,
    pub batch: i32,
    pub status: String,
    pub invitation_at: Option<DateTimeWithTimeZone>,
    pub followup: bool,
    pub followup_sent: bool,
    pub thank_you_sent: bool,
    pub has_replied: bool,
    pub is_seen: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
