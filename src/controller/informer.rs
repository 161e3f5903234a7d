//! # Informer
//!
//! Drives a `kube_runtime` watch stream into a reflector store and turns each
//! watch event into a typed [`ResourceEvent`].
//!
//! The cache is updated before the event is sent, so a consumer that looks an
//! object up after receiving its event always sees at least that version.
//!
//! A re-list (`Init` .. `InitDone`) is diffed against the cache contents it
//! replaces: listed objects become `Added` or `Updated`, and objects that were
//! cached but are no longer listed become `DeletedWithLastKnownState`.

use crate::observability;
use crate::store::Cache;
use futures::StreamExt;
use kube::{Api, Resource};
use kube_runtime::reflector::store::Writer;
use kube_runtime::reflector::{ObjectRef, Store};
use kube_runtime::watcher;
use kube_runtime::WatchStreamExt;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A change to a watched object
#[derive(Debug, Clone)]
pub enum ResourceEvent<K> {
    Added(Arc<K>),
    Updated { old: Arc<K>, new: Arc<K> },
    Deleted(Arc<K>),
    /// The delete itself was missed; this is the last state the cache held
    DeletedWithLastKnownState(Arc<K>),
}

impl<K> ResourceEvent<K> {
    /// The object the event is about (the new one for updates)
    pub fn object(&self) -> &Arc<K> {
        match self {
            ResourceEvent::Added(obj)
            | ResourceEvent::Deleted(obj)
            | ResourceEvent::DeletedWithLastKnownState(obj) => obj,
            ResourceEvent::Updated { new, .. } => new,
        }
    }

    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            ResourceEvent::Added(_) => "added",
            ResourceEvent::Updated { .. } => "updated",
            ResourceEvent::Deleted(_) => "deleted",
            ResourceEvent::DeletedWithLastKnownState(_) => "tombstone",
        }
    }
}

/// Applies watch events to a reflector writer and emits the matching typed events
pub struct EventTranslator<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    writer: Writer<K>,
    reader: Store<K>,
    relist: Option<Vec<K>>,
}

impl<K> fmt::Debug for EventTranslator<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTranslator")
            .field("kind", &K::kind(&()))
            .field("relisting", &self.relist.is_some())
            .finish_non_exhaustive()
    }
}

impl<K> EventTranslator<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    #[must_use]
    pub fn new(writer: Writer<K>) -> Self {
        let reader = writer.as_reader();
        Self {
            writer,
            reader,
            relist: None,
        }
    }

    /// Read handle onto the store this translator writes
    #[must_use]
    pub fn cache(&self) -> Cache<K> {
        Cache::new(self.reader.clone())
    }

    pub fn translate(&mut self, event: watcher::Event<K>) -> Vec<ResourceEvent<K>> {
        match event {
            watcher::Event::Apply(obj) => {
                let old = self.reader.get(&ObjectRef::from_obj(&obj));
                self.writer
                    .apply_watcher_event(&watcher::Event::Apply(obj.clone()));
                let new = Arc::new(obj);
                vec![match old {
                    Some(old) => ResourceEvent::Updated { old, new },
                    None => ResourceEvent::Added(new),
                }]
            }
            watcher::Event::Delete(obj) => {
                self.writer
                    .apply_watcher_event(&watcher::Event::Delete(obj.clone()));
                vec![ResourceEvent::Deleted(Arc::new(obj))]
            }
            watcher::Event::Init => {
                self.writer.apply_watcher_event(&watcher::Event::Init);
                self.relist = Some(Vec::new());
                Vec::new()
            }
            watcher::Event::InitApply(obj) => {
                self.writer
                    .apply_watcher_event(&watcher::Event::InitApply(obj.clone()));
                self.relist.get_or_insert_with(Vec::new).push(obj);
                Vec::new()
            }
            watcher::Event::InitDone => {
                let mut previous: HashMap<ObjectRef<K>, Arc<K>> = self
                    .reader
                    .state()
                    .into_iter()
                    .map(|obj| (ObjectRef::from_obj(obj.as_ref()), obj))
                    .collect();
                self.writer.apply_watcher_event(&watcher::Event::InitDone);

                let listed = self.relist.take().unwrap_or_default();
                let mut events = Vec::with_capacity(listed.len() + previous.len());
                for obj in listed {
                    let old = previous.remove(&ObjectRef::from_obj(&obj));
                    let new = Arc::new(obj);
                    events.push(match old {
                        Some(old) => ResourceEvent::Updated { old, new },
                        None => ResourceEvent::Added(new),
                    });
                }
                events.extend(
                    previous
                        .into_values()
                        .map(ResourceEvent::DeletedWithLastKnownState),
                );
                events
            }
        }
    }
}

/// Watches one resource kind, keeps its cache current and forwards typed events
pub struct Informer<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    api: Api<K>,
    translator: EventTranslator<K>,
    sender: mpsc::Sender<ResourceEvent<K>>,
}

impl<K> fmt::Debug for Informer<K>
where
    K: Resource<DynamicType = ()> + Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Informer")
            .field("kind", &K::kind(&()))
            .field("translator", &self.translator)
            .finish_non_exhaustive()
    }
}

impl<K> Informer<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    /// Build an informer plus the cache it fills and the channel it feeds
    #[must_use]
    pub fn new(api: Api<K>, capacity: usize) -> (Self, Cache<K>, mpsc::Receiver<ResourceEvent<K>>) {
        let translator = EventTranslator::new(Writer::default());
        let cache = translator.cache();
        let (sender, receiver) = mpsc::channel(capacity);
        (
            Self {
                api,
                translator,
                sender,
            },
            cache,
            receiver,
        )
    }

    /// Run until the event receiver is dropped
    ///
    /// Watch errors are logged and retried with the watcher's default backoff.
    pub async fn run(mut self) {
        let kind = K::kind(&()).to_string();
        let mut stream = watcher::watcher(self.api.clone(), watcher::Config::default())
            .default_backoff()
            .boxed();

        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => {
                    for resource_event in self.translator.translate(event) {
                        if self.sender.send(resource_event).await.is_err() {
                            debug!("{} event receiver dropped, stopping informer", kind);
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!("Watch error for {}: {}", kind, e);
                    observability::metrics::increment_watch_errors(&kind);
                }
            }
        }
        debug!("{} watch stream ended", kind);
    }
}
