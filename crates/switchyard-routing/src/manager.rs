//! Router registry
//!
//! Builds every enabled router from configuration once at startup and serves
//! lookups by router ID afterwards. The registry is immutable after construction.

use crate::config::{ModelConfig, RoutersConfig};
use crate::model::ModelHandle;
use crate::router::LangRouter;
use std::collections::HashMap;
use std::sync::Arc;
use switchyard_core::{ChatClient, Error, Result};
use switchyard_observability::RoutingMetrics;
use tracing::{debug, info};

/// Turns a model's provider configuration into a concrete client
pub trait ClientFactory: Send + Sync {
    fn build(&self, model: &ModelConfig) -> Result<Arc<dyn ChatClient>>;
}

#[derive(Default)]
pub struct RouterManager {
    lang_routers: HashMap<String, Arc<LangRouter>>,
}

impl RouterManager {
    /// Validate the configuration and build one language router per enabled router
    pub fn from_config(
        config: &RoutersConfig,
        factory: &dyn ClientFactory,
        metrics: Option<Arc<RoutingMetrics>>,
    ) -> Result<Self> {
        config.validate()?;

        let mut lang_routers = HashMap::new();

        for router_config in &config.language {
            if !router_config.enabled {
                info!(router = %router_config.id, "Router disabled, skipping");
                continue;
            }

            let mut models = Vec::new();
            for model_config in &router_config.models {
                if !model_config.enabled {
                    debug!(
                        router = %router_config.id,
                        model = %model_config.id,
                        "Model disabled, skipping"
                    );
                    continue;
                }

                let client = factory.build(model_config)?;
                models.push(Arc::new(ModelHandle::from_config(model_config, client)));
            }

            let router =
                LangRouter::from_config(router_config, models).with_metrics(metrics.clone());

            info!(
                router = router.id(),
                strategy = router.strategy().as_str(),
                models = router.chat_models().len(),
                streaming_models = router.chat_stream_models().len(),
                "Language router ready"
            );

            lang_routers.insert(router_config.id.clone(), Arc::new(router));
        }

        Ok(Self { lang_routers })
    }

    pub fn get_lang_router(&self, router_id: &str) -> Result<Arc<LangRouter>> {
        self.lang_routers
            .get(router_id)
            .cloned()
            .ok_or_else(|| Error::RouterNotFound(router_id.to_string()))
    }

    /// All language routers, ordered by ID
    pub fn lang_routers(&self) -> Vec<Arc<LangRouter>> {
        let mut routers: Vec<Arc<LangRouter>> =
            self.lang_routers.values().cloned().collect();
        routers.sort_by(|a, b| a.id().cmp(b.id()));
        routers
    }
}
