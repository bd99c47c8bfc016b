use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ticket")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: String,
    pub from_location: String,
    pub to_location: String,
    pub fare: f64,
    pub ticket_date: Date,
    pub is_validated: bool,
    pub is_active: bool,
    pub destination_latitude: f64,
    pub destination_longitude: f64,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    pub is_arrived: bool,
    /// Set once the ticket has been taken off its date's onboard counter.
    pub is_released: bool,
    pub qr_code_path: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
