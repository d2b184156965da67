use crate::input::{Key, MouseButton};
use crate::types::{Point, ScreenshotResult, Target};
use crate::{AutomationError, Selector, UIElement};
use std::collections::HashSet;
use std::sync::Arc;

pub mod headless;

/// The lookup, geometry and capture side of a UI backend
pub trait AccessibilityEngine: Send + Sync {
    /// Live set of elements currently matching `selector`.
    ///
    /// Implementations must not return the same element twice.
    fn find_elements(&self, selector: &Selector) -> Result<Vec<UIElement>, AutomationError>;

    /// Resolve `selector` to exactly one element.
    ///
    /// Zero matches is `ElementNotFound`, more than one is `AmbiguousMatch`.
    fn find_element(&self, selector: &Selector) -> Result<UIElement, AutomationError> {
        let mut found = self.find_elements(selector)?;
        match found.len() {
            0 => Err(AutomationError::ElementNotFound(selector.describe())),
            1 => Ok(found.remove(0)),
            count => Err(AutomationError::AmbiguousMatch {
                description: selector.describe(),
                count,
            }),
        }
    }

    /// Whether `element` is currently rendered.
    fn is_visible(&self, element: &UIElement) -> Result<bool, AutomationError> {
        element.is_visible()
    }

    /// Screen point for a target; elements and bounds resolve to their centre.
    fn point_of(&self, target: &Target) -> Result<Point, AutomationError> {
        match target {
            Target::Point(point) => Ok(*point),
            Target::Bounds(bounds) => Ok(bounds.center()),
            Target::Element(element) => Ok(element.bounds()?.center()),
        }
    }

    /// Capture the on-screen pixels of an element.
    fn capture(&self, element: &UIElement) -> Result<ScreenshotResult, AutomationError>;

    /// A fresh robot instance. Called once per driver, i.e. once per calling thread.
    fn create_robot(&self) -> Result<Arc<dyn Robot>, AutomationError>;

    /// Enable downcasting to concrete engine types
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Primitive synthetic input.
///
/// Each call is one discrete device event; composition (clicks, drags, typing)
/// lives in [`crate::Driver`].
pub trait Robot: Send + Sync {
    fn press_key(&self, key: Key) -> Result<(), AutomationError>;
    fn release_key(&self, key: Key) -> Result<(), AutomationError>;
    fn write_char(&self, character: char) -> Result<(), AutomationError>;
    fn press_button(&self, button: MouseButton) -> Result<(), AutomationError>;
    fn release_button(&self, button: MouseButton) -> Result<(), AutomationError>;
    fn move_pointer(&self, point: Point) -> Result<(), AutomationError>;
    fn pointer_position(&self) -> Result<Point, AutomationError>;
    /// One signed scroll tick: positive is down/right, negative is up/left.
    fn scroll(&self, tick: i32) -> Result<(), AutomationError>;

    /// Robots bound to the UI toolkit must be driven from the UI thread.
    fn requires_ui_thread(&self) -> bool {
        false
    }
}

/// Drops repeated elements while keeping first-seen order.
pub(crate) fn dedupe_elements(elements: Vec<UIElement>) -> Vec<UIElement> {
    let mut seen = HashSet::new();
    elements
        .into_iter()
        .filter(|e| seen.insert(e.object_id()))
        .collect()
}
