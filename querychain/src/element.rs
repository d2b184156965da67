use crate::errors::AutomationError;
use crate::types::Bounds;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

/// Represents a UI element in the scene under test
#[derive(Debug)]
pub struct UIElement {
    inner: Box<dyn UIElementImpl>,
}

/// Helper functions for clean serialization
fn is_empty_string(opt: &Option<String>) -> bool {
    match opt {
        Some(s) => s.is_empty(),
        None => true,
    }
}

/// Attributes associated with a UI element
#[derive(Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UIElementAttributes {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl fmt::Debug for UIElementAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug_struct = f.debug_struct("UIElementAttributes");

        if !self.role.is_empty() {
            debug_struct.field("role", &self.role);
        }
        for (label, value) in [
            ("id", &self.id),
            ("name", &self.name),
            ("text", &self.text),
            ("class_name", &self.class_name),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                debug_struct.field(label, &value);
            }
        }
        if let Some(false) = self.enabled {
            debug_struct.field("enabled", &false);
        }

        debug_struct.finish()
    }
}

/// Interface for backend-specific element implementations
pub trait UIElementImpl: Send + Sync + Debug {
    /// Identity of the underlying node; equal ids mean the same node.
    fn object_id(&self) -> usize;
    fn id(&self) -> Option<String>;
    fn role(&self) -> String;
    fn attributes(&self) -> UIElementAttributes;
    fn name(&self) -> Option<String> {
        self.attributes().name
    }
    fn text(&self) -> Option<String> {
        self.attributes().text
    }
    fn class_name(&self) -> Option<String> {
        self.attributes().class_name
    }
    fn children(&self) -> Result<Vec<UIElement>, AutomationError>;
    fn bounds(&self) -> Result<Bounds, AutomationError>;
    fn is_visible(&self) -> Result<bool, AutomationError>;
    fn is_enabled(&self) -> Result<bool, AutomationError> {
        Ok(self.attributes().enabled.unwrap_or(true))
    }
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn UIElementImpl>;

    /// Name of the concrete element type, used in type-mismatch reports.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl UIElement {
    /// Create a new UI element from a backend-specific implementation
    pub fn new(impl_: Box<dyn UIElementImpl>) -> Self {
        Self { inner: impl_ }
    }

    pub fn object_id(&self) -> usize {
        self.inner.object_id()
    }

    /// Get the element's ID
    pub fn id(&self) -> Option<String> {
        self.inner.id()
    }

    /// Get the element's role (e.g., "button", "textfield")
    pub fn role(&self) -> String {
        self.inner.role()
    }

    pub fn name(&self) -> Option<String> {
        self.inner.name()
    }

    pub fn text(&self) -> Option<String> {
        self.inner.text()
    }

    pub fn class_name(&self) -> Option<String> {
        self.inner.class_name()
    }

    /// Get all attributes of the element
    pub fn attributes(&self) -> UIElementAttributes {
        self.inner.attributes()
    }

    /// Get child elements
    pub fn children(&self) -> Result<Vec<UIElement>, AutomationError> {
        self.inner.children()
    }

    /// Get element bounds in screen coordinates
    pub fn bounds(&self) -> Result<Bounds, AutomationError> {
        self.inner.bounds()
    }

    pub fn is_visible(&self) -> Result<bool, AutomationError> {
        self.inner.is_visible()
    }

    pub fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.inner.is_enabled()
    }

    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Borrow the backend element as its concrete type, if it is one.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }

    /// Like [`UIElement::downcast_ref`], reporting a `TypeMismatch` on failure.
    pub fn cast<T: 'static>(&self) -> Result<&T, AutomationError> {
        self.downcast_ref::<T>()
            .ok_or_else(|| AutomationError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                actual: self.type_name(),
            })
    }

    /// A short human-readable label: role plus id or name when present.
    pub fn label(&self) -> String {
        let role = self.role();
        match (self.id(), self.name()) {
            (Some(id), _) if !id.is_empty() => format!("{role}#{id}"),
            (_, Some(name)) if !name.is_empty() => format!("{role} \"{name}\""),
            _ => role,
        }
    }
}

impl Clone for UIElement {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
        }
    }
}

impl PartialEq for UIElement {
    fn eq(&self, other: &Self) -> bool {
        self.object_id() == other.object_id()
    }
}

impl Eq for UIElement {}

impl Hash for UIElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object_id().hash(state);
    }
}

impl fmt::Display for UIElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
