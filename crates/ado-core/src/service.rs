//! Service registry.
//!
//! Maps a repository URL to the configured service covering its
//! `host/owner`, connects to that service once, and hands out repository
//! adapters through a bounded LRU cache keyed by `(context, url)`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AdoSettings;
use crate::error::{Result, VcsError};
use crate::host::HostClient;
use crate::repo::{AdoRepository, VcsRepository};
use crate::repo_url::parse_repo_url;
use crate::resolver::RepositoryProvider;

/// Entries kept by default in each lookup cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// One configured host connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// Organization URL, e.g. `https://dev.azure.com/myorg`
    pub url: String,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

impl ServiceConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// `host/owner` this service covers.
    pub fn key(&self) -> Result<String> {
        Ok(parse_repo_url(self.url.as_str())?.service_key())
    }
}

/// Opens an authenticated client for a service.
pub trait Connector: std::fmt::Debug {
    fn connect(&self, service: &ServiceConfig) -> Result<Rc<dyn HostClient>>;
}

/// Bounded LRU of `(context, url)` lookups.
#[derive(Debug)]
pub struct LookupCache<V> {
    entries: RefCell<LruCache<(String, String), V>>,
}

impl<V: Clone> LookupCache<V> {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| VcsError::validation("cache capacity must be greater than zero"))?;
        Ok(Self {
            entries: RefCell::new(LruCache::new(capacity)),
        })
    }

    pub fn get(&self, context: &str, url: &str) -> Option<V> {
        self.entries
            .borrow_mut()
            .get(&(context.to_string(), url.to_string()))
            .cloned()
    }

    pub fn put(&self, context: &str, url: &str, value: V) {
        self.entries
            .borrow_mut()
            .put((context.to_string(), url.to_string()), value);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.borrow().cap().get()
    }
}

pub type RepositoryCache = LookupCache<Rc<dyn VcsRepository>>;

/// Resolves repository URLs to services and repository adapters.
#[derive(Debug)]
pub struct ServiceRegistry {
    services: Vec<(String, ServiceConfig)>,
    connector: Box<dyn Connector>,
    settings: AdoSettings,
    connections: RefCell<HashMap<String, Rc<dyn HostClient>>>,
    service_cache: LookupCache<Option<ServiceConfig>>,
    repositories: RepositoryCache,
}

impl ServiceRegistry {
    /// Build a registry; two services covering the same URL are rejected.
    pub fn new(
        services: Vec<ServiceConfig>,
        connector: Box<dyn Connector>,
        settings: AdoSettings,
    ) -> Result<Self> {
        Self::with_cache_capacity(services, connector, settings, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(
        services: Vec<ServiceConfig>,
        connector: Box<dyn Connector>,
        settings: AdoSettings,
        capacity: usize,
    ) -> Result<Self> {
        let mut keyed: Vec<(String, ServiceConfig)> = Vec::with_capacity(services.len());
        for service in services {
            let key = service.key()?;
            if let Some((_, existing)) = keyed.iter().find(|(k, _)| *k == key) {
                return Err(VcsError::validation(format!(
                    "Duplicate service URL {} (services '{}' and '{}')",
                    service.url, existing.name, service.name
                )));
            }
            keyed.push((key, service));
        }

        Ok(Self {
            services: keyed,
            connector,
            settings,
            connections: RefCell::new(HashMap::new()),
            service_cache: LookupCache::new(capacity)?,
            repositories: LookupCache::new(capacity)?,
        })
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.iter().map(|(_, service)| service)
    }

    pub fn repository_cache(&self) -> &RepositoryCache {
        &self.repositories
    }

    /// Service covering `url`, or `None` when no service matches.
    pub fn get_service_for_url(&self, context: &str, url: &str) -> Result<Option<ServiceConfig>> {
        if let Some(cached) = self.service_cache.get(context, url) {
            return Ok(cached);
        }

        let key = parse_repo_url(url)?.service_key();
        let found = self
            .services
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, service)| service.clone());
        if found.is_none() {
            debug!(url, key = %key, "No service configured for URL");
        }
        self.service_cache.put(context, url, found.clone());
        Ok(found)
    }

    /// Repository adapter for `url`, connecting on first use.
    pub fn get_repository(&self, context: &str, url: &str) -> Result<Rc<dyn VcsRepository>> {
        if let Some(repo) = self.repositories.get(context, url) {
            return Ok(repo);
        }

        let service = self.get_service_for_url(context, url)?.ok_or_else(|| {
            VcsError::resolution(format!("Could not find a service for URL {}", url))
        })?;
        let client = self.connection(&service)?;
        let repo: Rc<dyn VcsRepository> =
            Rc::new(AdoRepository::connect(client, url, self.settings.clone())?);
        self.repositories.put(context, url, Rc::clone(&repo));
        Ok(repo)
    }

    fn connection(&self, service: &ServiceConfig) -> Result<Rc<dyn HostClient>> {
        if let Some(client) = self.connections.borrow().get(&service.name) {
            return Ok(Rc::clone(client));
        }
        let client = self.connector.connect(service)?;
        info!(service = %service.name, url = %service.url, "Connected to service");
        self.connections
            .borrow_mut()
            .insert(service.name.clone(), Rc::clone(&client));
        Ok(client)
    }
}

impl RepositoryProvider for ServiceRegistry {
    fn get_repository(&self, context: &str, url: &str) -> Result<Rc<dyn VcsRepository>> {
        ServiceRegistry::get_repository(self, context, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_key_is_host_and_owner() {
        let service = ServiceConfig::new("main", "https://dev.azure.com/myorg");
        assert_eq!(service.key().unwrap(), "dev.azure.com/myorg");
    }

    #[test]
    fn lookup_cache_evicts_least_recent() {
        let cache: LookupCache<u32> = LookupCache::new(2).unwrap();
        cache.put("ctx", "a", 1);
        cache.put("ctx", "b", 2);
        assert_eq!(cache.get("ctx", "a"), Some(1));
        cache.put("ctx", "c", 3);
        assert_eq!(cache.get("ctx", "b"), None);
        assert_eq!(cache.get("ctx", "a"), Some(1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(LookupCache::<u32>::new(0).is_err());
    }

    #[test]
    fn context_is_part_of_the_key() {
        let cache: LookupCache<u32> = LookupCache::new(4).unwrap();
        cache.put("one", "url", 1);
        assert_eq!(cache.get("two", "url"), None);
    }
}
