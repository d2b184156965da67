use tracing::{debug, instrument};

use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::platforms::{dedupe_elements, AccessibilityEngine};
use crate::selector::Selector;
use std::sync::Arc;

/// A lazy query bound to one selector.
///
/// Nothing is looked up at construction; every call re-evaluates the selector
/// against the current UI state.
#[derive(Clone)]
pub struct Locator {
    engine: Arc<dyn AccessibilityEngine>,
    selector: Selector,
}

impl Locator {
    pub(crate) fn new(engine: Arc<dyn AccessibilityEngine>, selector: Selector) -> Self {
        Self { engine, selector }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn describe(&self) -> String {
        self.selector.describe()
    }

    /// All elements currently matching the selector.
    pub fn all(&self) -> Result<Vec<UIElement>, AutomationError> {
        self.selector.validate()?;
        let found = self.engine.find_elements(&self.selector)?;
        Ok(dedupe_elements(found))
    }

    /// Exactly one matching element, per the engine's single-result contract.
    pub fn one(&self) -> Result<UIElement, AutomationError> {
        self.selector.validate()?;
        self.engine.find_element(&self.selector)
    }

    /// The single on-screen element a positional action should target.
    ///
    /// Fails with `NoMatchingElement` when nothing matches and with
    /// `NoVisibleElement` when matches exist but none is rendered.
    #[instrument(level = "debug", skip(self), fields(selector = %self.selector))]
    pub fn first_visible(&self) -> Result<UIElement, AutomationError> {
        let matches = self.all()?;
        if matches.is_empty() {
            return Err(AutomationError::NoMatchingElement {
                description: self.describe(),
            });
        }

        let count = matches.len();
        let visible = matches.into_iter().find(|element| {
            self.engine.is_visible(element).unwrap_or_else(|e| {
                debug!("Visibility check failed for {element}, treating as hidden: {e}");
                false
            })
        });

        match visible {
            Some(element) => {
                debug!("Resolved {} to {element}", self.describe());
                Ok(element)
            }
            None => Err(AutomationError::NoVisibleElement {
                description: self.describe(),
                count,
            }),
        }
    }
}

impl std::fmt::Debug for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}
