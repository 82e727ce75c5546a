use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;
use super::backends::{BlobBackend, StubBackend};

type BackendFactory = Box<dyn Fn() -> Box<dyn DetectorBackend> + Send + Sync>;

/// Registry of detector backend constructors.
///
/// The daemon registers the built-in backends at startup and constructs the
/// one named in configuration. Each `create` call yields a fresh backend
/// instance, exclusively owned by its capture worker.
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry with the built-in backends: `blob` (default) and `stub`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("blob", || Box::new(BlobBackend::default()));
        registry.register("stub", || Box::new(StubBackend::default()));
        registry
    }

    /// Register a backend constructor. The first registered name becomes the
    /// default.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn DetectorBackend> + Send + Sync + 'static,
    {
        if self.default_name.is_none() {
            self.default_name = Some(name.to_string());
        }
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.factories.contains_key(name) {
            return Err(anyhow!("detector backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Construct a backend by name.
    pub fn create(&self, name: &str) -> Result<Box<dyn DetectorBackend>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            anyhow!(
                "detector backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })?;
        Ok(factory())
    }

    /// Construct the default backend.
    pub fn create_default(&self) -> Result<Box<dyn DetectorBackend>> {
        let name = self
            .default_name
            .as_deref()
            .ok_or_else(|| anyhow!("no detector backends registered"))?;
        self.create(name)
    }

    /// Registered backend names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_backends_are_constructible() {
        let registry = BackendRegistry::builtin();
        assert_eq!(registry.list(), vec!["blob".to_string(), "stub".to_string()]);
        assert_eq!(registry.create("blob").unwrap().name(), "blob");
        assert_eq!(registry.create("stub").unwrap().name(), "stub");
    }

    #[test]
    fn first_registered_is_default() {
        let registry = BackendRegistry::builtin();
        assert_eq!(registry.create_default().unwrap().name(), "blob");
    }

    #[test]
    fn unknown_name_errors_with_available_list() {
        let registry = BackendRegistry::builtin();
        let err = registry.create("hog").err().unwrap().to_string();
        assert!(err.contains("blob, stub"));
    }

    #[test]
    fn each_create_yields_a_fresh_instance() {
        let registry = BackendRegistry::builtin();
        let frame = crate::frame::Frame::filled(8, 8, [10, 10, 10]);
        let mut first = registry.create("blob").unwrap();
        // Seed the first instance's background; a second instance must not
        // share that state.
        assert!(first.detect(&frame).unwrap().is_empty());
        let mut second = registry.create("blob").unwrap();
        assert!(second.detect(&frame).unwrap().is_empty());
    }
}
