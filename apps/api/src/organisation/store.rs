use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::organisation::{Credits, Organisation, OrganisationOverview};

/// Credit balance granted the first time an organisation is looked up.
pub const INITIAL_CREDITS: i64 = 10_000;
const INITIAL_PURCHASE_TYPE: &str = "initial";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Organisation-scoped ATS credentials and credit balances.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// The RecruitCRM key for `email`'s organisation, or for the first organisation
    /// holding a key when no email is given.
    async fn recruit_api_key(&self, email: Option<&str>) -> Result<Option<String>, CredentialError>;

    /// Stores `api_key` for the organisation identified by `email`, creating it if needed.
    /// Last writer wins; the organisation name is only replaced when one is supplied.
    async fn upsert_api_key(
        &self,
        email: &str,
        api_key: &str,
        organisation_name: Option<&str>,
    ) -> Result<Organisation, CredentialError>;

    /// Organisation plus credits. A missing credits row is provisioned with
    /// `INITIAL_CREDITS` before returning.
    async fn organisation_overview(
        &self,
        email: &str,
    ) -> Result<Option<OrganisationOverview>, CredentialError>;
}

pub struct PgCredentialStore {
    pool: PgPool,
    fallback_key: Option<String>,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, fallback_key: Option<String>) -> Self {
        Self { pool, fallback_key }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn recruit_api_key(&self, email: Option<&str>) -> Result<Option<String>, CredentialError> {
        let stored: Option<String> = match email {
            Some(email) => {
                sqlx::query_scalar(
                    "SELECT recruit_api_key FROM organisations WHERE email = $1 AND recruit_api_key IS NOT NULL",
                )
                .bind(email)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT recruit_api_key FROM organisations WHERE recruit_api_key IS NOT NULL ORDER BY id LIMIT 1",
                )
                .fetch_optional(&self.pool)
                .await?
            }
        };

        let key = stored
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.fallback_key.clone());
        if key.is_none() {
            warn!("No RecruitCRM API key stored or configured");
        }
        Ok(key)
    }

    async fn upsert_api_key(
        &self,
        email: &str,
        api_key: &str,
        organisation_name: Option<&str>,
    ) -> Result<Organisation, CredentialError> {
        let organisation = sqlx::query_as::<_, Organisation>(
            r#"
            INSERT INTO organisations (email, recruit_api_key, organisation_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
            SET recruit_api_key = EXCLUDED.recruit_api_key,
                organisation_name = COALESCE(EXCLUDED.organisation_name, organisations.organisation_name)
            RETURNING id, email, recruit_api_key, organisation_name, created_at
            "#,
        )
        .bind(email)
        .bind(api_key)
        .bind(organisation_name)
        .fetch_one(&self.pool)
        .await?;

        info!("Stored RecruitCRM API key for organisation {}", organisation.id);
        Ok(organisation)
    }

    async fn organisation_overview(
        &self,
        email: &str,
    ) -> Result<Option<OrganisationOverview>, CredentialError> {
        let organisation = sqlx::query_as::<_, Organisation>(
            "SELECT id, email, recruit_api_key, organisation_name, created_at FROM organisations WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(organisation) = organisation else {
            return Ok(None);
        };

        let provisioned = sqlx::query(
            r#"
            INSERT INTO credits (organisation_id, total_credit, purchase_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (organisation_id) DO NOTHING
            "#,
        )
        .bind(organisation.id)
        .bind(INITIAL_CREDITS)
        .bind(INITIAL_PURCHASE_TYPE)
        .execute(&self.pool)
        .await?;

        if provisioned.rows_affected() == 1 {
            info!(
                "Provisioned {INITIAL_CREDITS} initial credits for organisation {}",
                organisation.id
            );
        }

        let credits = sqlx::query_as::<_, Credits>(
            "SELECT organisation_id, total_credit, purchase_type, created_at FROM credits WHERE organisation_id = $1",
        )
        .bind(organisation.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(OrganisationOverview {
            organisation,
            credits,
        }))
    }
}

/// Masks all but the last four characters of an API key for display.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len().max(4));
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{visible}", "*".repeat(chars.len() - 4))
}
