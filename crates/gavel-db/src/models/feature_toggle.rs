//! Database-held feature toggles.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;

use gavel_core::{Feature, FeatureFlags};

/// One stored toggle row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeatureToggle {
    pub feature: String,
    pub enabled: bool,
}

impl FeatureToggle {
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM feature_toggles ORDER BY feature")
            .fetch_all(pool)
            .await
    }

    pub async fn set(pool: &PgPool, feature: Feature, enabled: bool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r"
            INSERT INTO feature_toggles (feature, enabled)
            VALUES ($1, $2)
            ON CONFLICT (feature) DO UPDATE SET enabled = EXCLUDED.enabled
            ",
        )
        .bind(feature.to_string())
        .bind(enabled)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Load all toggles into the per-run flag map. Rows naming a feature
    /// this build does not know are skipped with a warning.
    pub async fn load_flags(pool: &PgPool) -> Result<FeatureFlags, sqlx::Error> {
        let rows = Self::list_all(pool).await?;
        let mut flags = FeatureFlags::default();
        for row in rows {
            match row.feature.parse::<Feature>() {
                Ok(feature) => flags.set(feature, row.enabled),
                Err(_) => warn!(feature = %row.feature, "Skipping unrecognised feature toggle"),
            }
        }
        Ok(flags)
    }
}
