//! # Cache
//!
//! Read-only view over a `kube_runtime` reflector store.

use kube::Resource;
use kube_runtime::reflector::{store::WriterDropped, ObjectRef, Store};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Point lookups and namespace listing over a watch-populated store.
///
/// Objects handed out are shared with the store; never mutate them, clone first.
pub struct Cache<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    store: Store<K>,
}

impl<K> Clone for Cache<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<K> fmt::Debug for Cache<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("kind", &K::kind(&()))
            .field("len", &self.store.len())
            .finish()
    }
}

impl<K> Cache<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    #[must_use]
    pub fn new(store: Store<K>) -> Self {
        Self { store }
    }

    /// Look up an object by namespace and name
    #[must_use]
    pub fn get(&self, namespace: &str, name: &str) -> Option<Arc<K>> {
        self.store.get(&ObjectRef::new(name).within(namespace))
    }

    /// Wait for the initial list to be applied
    ///
    /// # Errors
    ///
    /// Returns an error if the watch feeding this cache was dropped before it synced.
    pub async fn wait_until_ready(&self) -> Result<(), WriterDropped> {
        self.store.wait_until_ready().await
    }
}

/// Error returned for keys that are not `namespace/name` or `name`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid resource key: {0:?}")]
pub struct InvalidKey(pub String);

/// Parsed form of a `namespace/name` reconcile key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key for a namespaced object; `None` if the object has no name
    pub fn from_object<K: Resource>(obj: &K) -> Option<Self> {
        let meta = obj.meta();
        let name = meta.name.clone()?;
        Some(Self {
            namespace: meta.namespace.clone().unwrap_or_default(),
            name,
        })
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

impl FromStr for ObjectKey {
    type Err = InvalidKey;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = key.split('/').collect();
        let (namespace, name) = match parts.as_slice() {
            [name] => ("", *name),
            [namespace, name] => (*namespace, *name),
            _ => return Err(InvalidKey(key.to_string())),
        };
        if name.is_empty() {
            return Err(InvalidKey(key.to_string()));
        }
        Ok(Self::new(namespace, name))
    }
}
