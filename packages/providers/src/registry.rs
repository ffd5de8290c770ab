//! Provider registry and instance cache
//!
//! Providers are registered under short names through constructor
//! closures at startup; nothing registers itself as a side effect of
//! being linked in. The registry caches one instance per
//! (name, model, credential) triple behind a reader-writer lock: many
//! concurrent readers, an exclusive writer on first insertion.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use cadence_shared_config::ProviderSettings;

use crate::anthropic::AnthropicProvider;
use crate::error::{ProviderError, ProviderResult};
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::provider::Provider;

type Constructor =
    Arc<dyn Fn(&ProviderSettings) -> ProviderResult<Arc<dyn Provider>> + Send + Sync>;

/// Registry of provider constructors with a shared instance cache
pub struct ProviderRegistry {
    constructors: HashMap<String, Constructor>,
    instances: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Register a constructor under a short name
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&ProviderSettings) -> ProviderResult<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(name.into().to_lowercase(), Arc::new(constructor));
    }

    /// Known aliases for provider names
    fn canonical(name: &str) -> &str {
        match name {
            "claude" => "anthropic",
            "gpt" | "chatgpt" => "openai",
            other => other,
        }
    }

    /// Create or retrieve a cached provider instance
    ///
    /// # Errors
    /// `ProviderError::UnknownProvider` (listing the registered names)
    /// when nothing is registered under the name or its aliases.
    pub fn create(
        &self,
        name: &str,
        settings: &ProviderSettings,
    ) -> ProviderResult<Arc<dyn Provider>> {
        let name = Self::canonical(&name.to_lowercase()).to_string();

        let constructor = self.constructors.get(&name).ok_or_else(|| {
            ProviderError::UnknownProvider {
                name: name.clone(),
                available: self.list(),
            }
        })?;

        let key_prefix: String = settings.api_key.chars().take(8).collect();
        let cache_key = format!(
            "{}:{}:{}",
            name,
            settings.model,
            if key_prefix.is_empty() {
                "nokey"
            } else {
                &key_prefix
            }
        );

        {
            let instances = self.instances.read().expect("registry lock poisoned");
            if let Some(instance) = instances.get(&cache_key) {
                return Ok(Arc::clone(instance));
            }
        }

        let instance = constructor(settings)?;

        let mut instances = self.instances.write().expect("registry lock poisoned");
        // Another writer may have raced us; keep the first insertion
        let entry = instances
            .entry(cache_key)
            .or_insert_with(|| Arc::clone(&instance));
        Ok(Arc::clone(entry))
    }

    /// Registered provider names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop all cached instances
    pub fn clear_cache(&self) {
        self.instances
            .write()
            .expect("registry lock poisoned")
            .clear();
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the builtin providers registered
pub fn builtin_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register("anthropic", |settings| {
        Ok(Arc::new(AnthropicProvider::new(settings)?) as Arc<dyn Provider>)
    });
    registry.register("openai", |settings| {
        Ok(Arc::new(OpenAiProvider::new(settings)?) as Arc<dyn Provider>)
    });
    registry.register("ollama", |settings| {
        Ok(Arc::new(OllamaProvider::new(settings)?) as Arc<dyn Provider>)
    });
    registry
}
