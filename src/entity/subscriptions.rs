use chrono::{Days, Months};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[sea_orm(string_value = "weekly")]
    Weekly,
    #[sea_orm(string_value = "biweekly")]
    Biweekly,
    #[sea_orm(string_value = "monthly")]
    Monthly,
}

impl Frequency {
    /// Date of the delivery after `from`. Monthly keeps the day of month,
    /// clamped to the last day of shorter months.
    pub fn next_after(self, from: Date) -> Option<Date> {
        match self {
            Frequency::Weekly => from.checked_add_days(Days::new(7)),
            Frequency::Biweekly => from.checked_add_days(Days::new(14)),
            Frequency::Monthly => from.checked_add_months(Months::new(1)),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "paused")]
    Paused,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_location_id: Uuid,
    pub frequency: Frequency,
    pub status: SubscriptionStatus,
    pub next_delivery: Date,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::delivery_locations::Entity",
        from = "Column::DeliveryLocationId",
        to = "super::delivery_locations::Column::Id"
    )]
    DeliveryLocations,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        super::subscription_products::Relation::Products.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::subscription_products::Relation::Subscriptions.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
