use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// The erased value stored in a host object's field.
pub type FieldValue = dyn Any + Send + Sync;

/// A host object whose internal fields can be looked up by symbol.
pub trait Introspect {
    /// Runtime class name of this instance.
    fn class_name(&self) -> &str;

    fn field(&self, symbol: &str) -> Option<Arc<FieldValue>>;

    /// Returns false if the instance has no field named `symbol`.
    fn replace_field(&self, symbol: &str, value: Arc<FieldValue>) -> bool;
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub symbol: String,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl FieldDecl {
    pub fn of<T: Any>(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub superclass: Option<String>,
    pub fields: Vec<FieldDecl>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            fields: Vec::new(),
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, symbol: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|field| field.symbol == symbol)
    }
}

/// Class declarations published by a running host.
pub trait ClassRegistry: Send + Sync {
    fn host_version(&self) -> &str;

    fn class(&self, name: &str) -> Option<&ClassDecl>;

    fn class_names(&self) -> Vec<String>;

    /// True if `class` is `ancestor` or inherits from it.
    fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        let mut current = Some(class);
        // bounded walk in case a host publishes a cyclic hierarchy
        for _ in 0..64 {
            match current {
                Some(name) if name == ancestor => return true,
                Some(name) => {
                    current = self
                        .class(name)
                        .and_then(|decl| decl.superclass.as_deref());
                }
                None => return false,
            }
        }
        false
    }
}

/// Symbol-addressed storage backing an `Introspect` implementation.
#[derive(Default)]
pub struct FieldTable {
    fields: RwLock<HashMap<String, Arc<FieldValue>>>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, symbol: impl Into<String>, value: Arc<FieldValue>) -> Self {
        self.fields.write().insert(symbol.into(), value);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<Arc<FieldValue>> {
        self.fields.read().get(symbol).cloned()
    }

    pub fn replace(&self, symbol: &str, value: Arc<FieldValue>) -> bool {
        match self.fields.write().get_mut(symbol) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for FieldTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self.fields.read();
        let mut symbols: Vec<_> = fields.keys().collect();
        symbols.sort();
        f.debug_struct("FieldTable").field("symbols", &symbols).finish()
    }
}
