use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per physical printer. Columns are nullable so a sparse insert can
/// leave unspecified attributes empty; `printer_id` is assigned by the
/// database on insert.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "Printer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub printer_id: i32,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub name: Option<String>,
    pub power_consumption: Option<f64>,
    pub purchase_price: Option<f64>,
    pub estimated_lifespan: Option<f64>,
    pub maintenance_costs: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
