use std::collections::HashMap;

use tokio::sync::Mutex;

use super::StateRepo;

/// Process-local repo for ephemeral runs; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStateRepo {
    slices: Mutex<HashMap<String, String>>,
}

#[async_trait::async_trait]
impl StateRepo for MemoryStateRepo {
    async fn load(&self, name: &str) -> anyhow::Result<Option<String>> {
        Ok(self.slices.lock().await.get(name).cloned())
    }

    async fn save(&self, name: &str, value: String) -> anyhow::Result<()> {
        self.slices.lock().await.insert(name.to_string(), value);
        Ok(())
    }

    async fn remove(&self, name: &str) -> anyhow::Result<()> {
        self.slices.lock().await.remove(name);
        Ok(())
    }
}
