use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::locator::Locator;
use crate::matchers::Condition;
use tracing::debug;

/// Checks `condition` against the single element behind `locator`.
///
/// Lookup errors pass through unchanged; a failed check is an `AssertionFailed`
/// describing the expectation and the element's actual attributes.
pub fn verify_that(
    locator: &Locator,
    condition: &Condition<UIElement>,
) -> Result<(), AutomationError> {
    let element = locator.one()?;
    if condition.test(&element) {
        debug!("Verified {} against {}", locator.describe(), condition.describe());
        return Ok(());
    }
    Err(AutomationError::AssertionFailed(format!(
        "\nExpected: {} {}\n     but: was {:?}",
        locator.describe(),
        condition.describe(),
        element.attributes()
    )))
}
