//! Model cache keyed by model name.
//!
//! Generation is comparatively expensive and, more importantly, must be
//! stable: every caller asking for `"Settings"` has to get the very same
//! [`Model`]. The registry is an ordinary value owned by whoever manages
//! configs (usually a [`ConfigStore`](crate::ConfigStore)); there is no
//! process-wide instance.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::InifigError;
use crate::model::Model;
use crate::template::{Template, ValidationInfo};

#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the model cached under `name`, generating it from `template`
    /// on first use.
    ///
    /// Once a name is cached the template is not looked at again, so later
    /// calls return the same `Arc` even if they pass a different template.
    pub fn get_model(&mut self, name: &str, template: &Template) -> Result<Arc<Model>, InifigError> {
        if let Some(model) = self.models.get(name) {
            debug!(model = name, "model cache hit");
            return Ok(Arc::clone(model));
        }

        let info = ValidationInfo::extract(name, template)?;
        let model = Arc::new(Model::from_info(name, &info)?);
        debug!(
            model = name,
            flat = model.is_flat(),
            fields = model.keys().len(),
            "generated model"
        );
        self.models.insert(name.to_string(), Arc::clone(&model));
        Ok(model)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Model>> {
        self.models.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Drop a cached model so the next [`get_model`](Self::get_model) regenerates it.
    pub fn remove(&mut self, name: &str) -> Option<Arc<Model>> {
        self.models.remove(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
