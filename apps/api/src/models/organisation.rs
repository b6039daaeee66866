use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organisation {
    pub id: i64,
    pub email: String,
    /// Never serialized back to clients.
    #[serde(skip_serializing)]
    pub recruit_api_key: Option<String>,
    pub organisation_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Credits {
    pub organisation_id: i64,
    pub total_credit: i64,
    pub purchase_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrganisationOverview {
    pub organisation: Organisation,
    pub credits: Credits,
}
