//! Health checks for the serving capabilities.

use crate::embeddings::EmbeddingProvider;
use crate::vector_index::VectorIndex;
use ragline_llm::LlmClient;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub detail: String,
}

impl ComponentHealth {
    fn new(name: &str, status: HealthStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// `healthy` when every component is, otherwise `degraded`
    pub status: HealthStatus,
    pub components: Vec<ComponentHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    pub fn component(&self, name: &str) -> Option<&ComponentHealth> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// Probe the index, the embedder and (without generating) the language model.
pub async fn check_health(
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingProvider,
    llm: Option<&dyn LlmClient>,
) -> HealthReport {
    let mut components = Vec::with_capacity(3);

    let index_dimension = match index.stats().await {
        Ok(stats) => {
            components.push(ComponentHealth::new(
                "index",
                HealthStatus::Healthy,
                format!("{}: {} vectors", stats.backend, stats.total_vector_count),
            ));
            stats.dimension
        }
        Err(e) => {
            components.push(ComponentHealth::new("index", HealthStatus::Unhealthy, e.to_string()));
            None
        }
    };

    let embedding = match embedder.embed("health check").await {
        Ok(vector) if vector.len() != embedder.dimensions() => ComponentHealth::new(
            "embedding",
            HealthStatus::Unhealthy,
            format!(
                "{} returned {} dimensions, expected {}",
                embedder.provider_name(),
                vector.len(),
                embedder.dimensions()
            ),
        ),
        Ok(_) => match index_dimension {
            Some(dim) if dim != embedder.dimensions() => ComponentHealth::new(
                "embedding",
                HealthStatus::Unhealthy,
                format!(
                    "{} produces {} dimensions but the index holds {}",
                    embedder.model_name(),
                    embedder.dimensions(),
                    dim
                ),
            ),
            _ => ComponentHealth::new(
                "embedding",
                HealthStatus::Healthy,
                format!("{} ({})", embedder.provider_name(), embedder.model_name()),
            ),
        },
        Err(e) => ComponentHealth::new("embedding", HealthStatus::Unhealthy, e.to_string()),
    };
    components.push(embedding);

    components.push(match llm {
        Some(client) if client.is_available() => {
            ComponentHealth::new("llm", HealthStatus::Healthy, client.provider_name())
        }
        Some(client) => ComponentHealth::new(
            "llm",
            HealthStatus::Unhealthy,
            format!("{} is not available", client.provider_name()),
        ),
        None => ComponentHealth::new("llm", HealthStatus::Unhealthy, "not configured"),
    });

    let status = if components.iter().all(|c| c.status == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    if status != HealthStatus::Healthy {
        tracing::warn!("Health check degraded");
    }

    HealthReport { status, components }
}
