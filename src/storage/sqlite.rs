use anyhow::Context;
use chrono::Utc;
use entities::persisted_state;
use entities::prelude::PersistedState;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait};

use super::StateRepo;

/// Slices stored as JSON text in the `persisted_state` table.
#[derive(Clone, Debug)]
pub struct SeaOrmStateRepo {
    db: DatabaseConnection,
}

impl SeaOrmStateRepo {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl StateRepo for SeaOrmStateRepo {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn load(&self, name: &str) -> anyhow::Result<Option<String>> {
        let row = PersistedState::find_by_id(name.to_string())
            .one(&self.db)
            .await
            .with_context(|| format!("Failed to load state slice {}", name))?;
        Ok(row.map(|r| r.value))
    }

    #[tracing::instrument(level = "debug", skip(self, value))]
    async fn save(&self, name: &str, value: String) -> anyhow::Result<()> {
        let row = persisted_state::ActiveModel {
            name: Set(name.to_string()),
            value: Set(value),
            updated_at: Set(Utc::now()),
        };
        PersistedState::insert(row)
            .on_conflict(
                OnConflict::column(persisted_state::Column::Name)
                    .update_columns([
                        persisted_state::Column::Value,
                        persisted_state::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .with_context(|| format!("Failed to save state slice {}", name))?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn remove(&self, name: &str) -> anyhow::Result<()> {
        PersistedState::delete_by_id(name.to_string())
            .exec(&self.db)
            .await
            .with_context(|| format!("Failed to remove state slice {}", name))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::MigratorTrait;
    use sea_orm::Database;

    use crate::storage::{PLAYER_SLICE, PlayerStore};

    async fn repo() -> SeaOrmStateRepo {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        SeaOrmStateRepo::new(db)
    }

    #[tokio::test]
    async fn save_overwrites_whole_slice() {
        let repo = repo().await;
        assert_eq!(repo.load("a").await.unwrap(), None);

        repo.save("a", "{\"v\":1}".into()).await.unwrap();
        repo.save("a", "{\"v\":2}".into()).await.unwrap();
        assert_eq!(repo.load("a").await.unwrap().as_deref(), Some("{\"v\":2}"));

        repo.remove("a").await.unwrap();
        assert_eq!(repo.load("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn player_store_restores_from_sqlite() {
        let repo = std::sync::Arc::new(repo().await);
        let store = PlayerStore::restore(repo.clone()).await.unwrap();
        store.upsert_session("b1", 120.0, 1200.0).await.unwrap();
        assert!(repo.load(PLAYER_SLICE).await.unwrap().is_some());

        let restored = PlayerStore::restore(repo).await.unwrap();
        assert_eq!(restored.session("b1").await.unwrap().progress, 0.1);
    }
}
