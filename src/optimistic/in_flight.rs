use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Ids currently being mutated. An id submitted twice stays pending until
/// both mutations complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InFlightIds {
    pending: BTreeMap<String, usize>,
}

impl InFlightIds {
    pub fn contains(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }

    fn insert(&mut self, id: &str) {
        *self.pending.entry(id.to_string()).or_insert(0) += 1;
    }

    fn remove(&mut self, id: &str) {
        if let Some(count) = self.pending.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(id);
            }
        }
    }
}

/// Observable in-flight set, scoped to one view-model.
#[derive(Debug, Clone)]
pub struct InFlightSet {
    ids: Arc<watch::Sender<InFlightIds>>,
}

impl Default for InFlightSet {
    fn default() -> Self {
        Self::new()
    }
}

impl InFlightSet {
    pub fn new() -> Self {
        let (ids, _) = watch::channel(InFlightIds::default());
        Self { ids: Arc::new(ids) }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.borrow().contains(id)
    }

    pub fn snapshot(&self) -> InFlightIds {
        self.ids.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<InFlightIds> {
        self.ids.subscribe()
    }

    /// Marks `id` as in flight until the returned guard is dropped.
    pub fn begin(&self, id: &str) -> InFlightGuard {
        self.ids.send_modify(|ids| ids.insert(id));
        InFlightGuard {
            ids: Arc::clone(&self.ids),
            id: id.to_string(),
        }
    }
}

/// Clears its id on drop, including on early return, panic or cancellation.
#[must_use = "the id is cleared as soon as the guard is dropped"]
pub struct InFlightGuard {
    ids: Arc<watch::Sender<InFlightIds>>,
    id: String,
}

impl InFlightGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let id = std::mem::take(&mut self.id);
        self.ids.send_modify(|ids| ids.remove(&id));
    }
}
