//! `SeaORM` Entity for transactions table. Rows are never updated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub tenant_id: Uuid,
    pub customer_id: Uuid,
    pub account_type_id: Uuid,
    pub transaction_type_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((28, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((28, 4)))")]
    pub effective_delta: Decimal,
    #[sea_orm(column_type = "Decimal(Some((28, 4)))")]
    pub balance_after: Decimal,
    pub tier_after: String,
    pub reason: Option<String>,
    pub reference_id: Option<String>,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub performed_by: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
