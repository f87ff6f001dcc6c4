use crate::config::layout::HostLayout;
use crate::reflect::class::ClassRegistry;
use crate::reflect::handle::{Binding, FieldHandle, Unavailable};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type CacheKey = (String, String, TypeId);

/// Resolves logical fields to typed handles through a version-pinned layout.
///
/// Every (owner, name, value type) triple is resolved at most once; failed
/// resolutions are cached too, so a missing field fails the same way on every
/// later lookup without touching the host again.
pub struct FieldLocator {
    layout: HostLayout,
    classes: Arc<dyn ClassRegistry>,
    cache: Mutex<HashMap<CacheKey, Result<Binding, Unavailable>>>,
    resolutions: AtomicUsize,
}

impl FieldLocator {
    pub fn new(layout: HostLayout, classes: Arc<dyn ClassRegistry>) -> Self {
        if layout.version == classes.host_version() {
            info!("Using field layout for host {}", layout.version);
        } else {
            warn!(
                "Field layout {} does not match host {}, internal access disabled",
                layout.version,
                classes.host_version()
            );
        }
        Self {
            layout,
            classes,
            cache: Mutex::new(HashMap::new()),
            resolutions: AtomicUsize::new(0),
        }
    }

    pub fn layout(&self) -> &HostLayout {
        &self.layout
    }

    pub fn classes(&self) -> &Arc<dyn ClassRegistry> {
        &self.classes
    }

    /// Number of lookups that actually went to the host's declarations.
    pub fn resolution_count(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn resolve<T: Any + Send + Sync>(&self, owner: &str, name: &str) -> FieldHandle<T> {
        let key = (owner.to_string(), name.to_string(), TypeId::of::<T>());
        let state = self
            .cache
            .lock()
            .entry(key)
            .or_insert_with(|| {
                self.resolutions.fetch_add(1, Ordering::Relaxed);
                let state = self.lookup::<T>(owner, name);
                if let Err(reason) = &state {
                    debug!("{}.{} unavailable: {}", owner, name, reason);
                }
                state
            })
            .clone();
        FieldHandle::new(owner, name, state)
    }

    fn lookup<T: Any>(&self, owner: &str, name: &str) -> Result<Binding, Unavailable> {
        let host = self.classes.host_version();
        if self.layout.version != host {
            return Err(Unavailable::VersionMismatch {
                layout: self.layout.version.clone(),
                host: host.to_string(),
            });
        }

        let symbol = self
            .layout
            .symbol(owner, name)
            .ok_or(Unavailable::NoMapping)?;
        let class = self
            .classes
            .class(owner)
            .ok_or_else(|| Unavailable::UnknownClass(owner.to_string()))?;
        let field = class
            .field(symbol)
            .ok_or_else(|| Unavailable::MissingField(symbol.to_string()))?;
        if field.type_id != TypeId::of::<T>() {
            return Err(Unavailable::WrongType {
                symbol: symbol.to_string(),
                declared: field.type_name,
                expected: type_name::<T>(),
            });
        }

        let accepted: HashSet<String> = self
            .classes
            .class_names()
            .into_iter()
            .filter(|class| self.classes.is_subclass(class, owner))
            .collect();
        Ok(Binding {
            symbol: symbol.to_string(),
            accepted: Arc::new(accepted),
        })
    }
}
