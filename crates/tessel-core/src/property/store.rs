//! Layered per-instance property storage

use crate::value::Value;
use rustc_hash::FxHashMap;

/// Storage layer of a property value, highest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Explicitly set by the user
    User,
    /// Set by styling
    Theme,
    /// Derived by the compute member
    Computed,
    /// Class default
    Init,
}

impl Layer {
    /// All layers in precedence order
    pub const ALL: [Layer; 4] = [Layer::User, Layer::Theme, Layer::Computed, Layer::Init];
}

/// The four value layers of one property
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayeredValue {
    user: Option<Value>,
    theme: Option<Value>,
    computed: Option<Value>,
    init: Option<Value>,
}

impl LayeredValue {
    fn slot(&self, layer: Layer) -> &Option<Value> {
        match layer {
            Layer::User => &self.user,
            Layer::Theme => &self.theme,
            Layer::Computed => &self.computed,
            Layer::Init => &self.init,
        }
    }

    fn slot_mut(&mut self, layer: Layer) -> &mut Option<Value> {
        match layer {
            Layer::User => &mut self.user,
            Layer::Theme => &mut self.theme,
            Layer::Computed => &mut self.computed,
            Layer::Init => &mut self.init,
        }
    }

    /// Value of one layer
    pub fn layer(&self, layer: Layer) -> Option<&Value> {
        self.slot(layer).as_ref()
    }

    /// First present layer in precedence order
    pub fn effective(&self) -> Option<&Value> {
        Layer::ALL.iter().find_map(|layer| self.layer(*layer))
    }

    /// Replace one layer, returning its previous content
    pub fn replace(&mut self, layer: Layer, value: Option<Value>) -> Option<Value> {
        std::mem::replace(self.slot_mut(layer), value)
    }

    /// Whether no layer holds a value
    pub fn is_empty(&self) -> bool {
        Layer::ALL.iter().all(|layer| self.slot(*layer).is_none())
    }
}

/// Result of a layer write
#[derive(Debug, Clone, PartialEq)]
pub struct LayerChange {
    /// Effective value before the write
    pub old: Option<Value>,
    /// Effective value after the write
    pub new: Option<Value>,
}

impl LayerChange {
    /// Whether the effective value differs
    pub fn is_change(&self) -> bool {
        self.old != self.new
    }
}

/// All property values of one instance
#[derive(Debug, Default)]
pub struct PropertyStore {
    values: FxHashMap<String, LayeredValue>,
}

impl PropertyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers of a property, if any was ever written
    pub fn layers(&self, name: &str) -> Option<&LayeredValue> {
        self.values.get(name)
    }

    /// Effective value of a property
    pub fn effective(&self, name: &str) -> Option<Value> {
        self.values.get(name).and_then(|v| v.effective()).cloned()
    }

    /// Write (or clear, with `None`) one layer of a property
    pub fn write(&mut self, name: &str, layer: Layer, value: Option<Value>) -> LayerChange {
        let entry = self.values.entry(name.to_string()).or_default();
        let old = entry.effective().cloned();
        entry.replace(layer, value);
        let new = entry.effective().cloned();
        LayerChange { old, new }
    }

    /// Drop every layer of a property
    pub fn clear(&mut self, name: &str) -> Option<LayeredValue> {
        self.values.remove(name)
    }

    /// Drop everything
    pub fn clear_all(&mut self) {
        self.values.clear();
    }

    /// Number of properties holding at least one layer
    pub fn len(&self) -> usize {
        self.values.values().filter(|v| !v.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
