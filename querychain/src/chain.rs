use crate::driver::Driver;
use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::input::{HorizontalDirection, Key, KeyCombination, MouseButton, VerticalDirection};
use crate::locator::Locator;
use crate::matchers::Condition;
use crate::selector::Selector;
use crate::types::{Point, ScreenshotResult, Target};
use crate::{assertions, Desktop};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, instrument};

/// A fluent sequence of actions over one lazily evaluated selector.
///
/// Every action re-resolves the selector against the live UI, runs to
/// completion on the calling thread's timeline and hands the chain back, so
/// consecutive calls observe each other's effects without extra synchronisation:
///
/// ```ignore
/// desktop
///     .select("#name")
///     .click(&[])?
///     .write("Ada")?
///     .select("role:button|Save")
///     .click(&[])?;
/// ```
#[derive(Clone, Debug)]
pub struct QueryChain {
    desktop: Desktop,
    locator: Locator,
}

impl QueryChain {
    pub(crate) fn new(desktop: Desktop, selector: Selector) -> Self {
        let locator = desktop.locator(selector);
        Self { desktop, locator }
    }

    /// A new chain over `selector` sharing this chain's desktop.
    pub fn select(&self, selector: impl Into<Selector>) -> QueryChain {
        QueryChain::new(self.desktop.clone(), selector.into())
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn description(&self) -> String {
        self.locator.describe()
    }

    /// The calling thread's driver.
    pub fn driver(&self) -> Result<Rc<Driver>, AutomationError> {
        self.desktop.driver()
    }

    /// The single element the selector currently matches.
    pub fn node(&self) -> Result<UIElement, AutomationError> {
        self.locator.one()
    }

    pub fn nodes(&self) -> Result<Vec<UIElement>, AutomationError> {
        self.locator.all()
    }

    pub fn capture(&self) -> Result<ScreenshotResult, AutomationError> {
        let node = self.node()?;
        self.driver()?.capture(&node)
    }

    fn point_of_visible(&self, locator: &Locator) -> Result<Point, AutomationError> {
        let element = locator.first_visible()?;
        let point = self.driver()?.point(&Target::Element(element))?;
        debug!("{} resolves to {point}", locator.describe());
        Ok(point)
    }

    // ---- Interaction ----

    /// Runs `f` on the UI thread, then drains the UI event queue. Whatever `f`
    /// returns is discarded.
    #[instrument(level = "debug", skip_all)]
    pub fn interact<R, F>(&self, f: F) -> Result<&Self, AutomationError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let driver = self.driver()?;
        driver.run_on_ui(f)?;
        driver.wait_for_ui_events(driver.config().drain_attempts)?;
        Ok(self)
    }

    /// Like [`QueryChain::interact`] for fallible work; its error comes back as
    /// `Interaction` with the original as source.
    #[instrument(level = "debug", skip_all)]
    pub fn interact_call<R, E, F>(&self, f: F) -> Result<&Self, AutomationError>
    where
        R: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
        F: FnOnce() -> Result<R, E> + Send + 'static,
    {
        let driver = self.driver()?;
        driver
            .run_on_ui(f)?
            .map_err(|e| AutomationError::Interaction {
                source: Box::new(e),
            })?;
        driver.wait_for_ui_events(driver.config().drain_attempts)?;
        Ok(self)
    }

    /// Resolves the node on the UI thread and hands it to `f` as a `T`.
    ///
    /// Fails with `TypeMismatch` when the backend element is not a `T`.
    #[instrument(level = "debug", skip_all, fields(selector = %self.locator.selector()))]
    pub fn interact_with<T, R, F>(&self, f: F) -> Result<&Self, AutomationError>
    where
        T: 'static,
        R: Send + 'static,
        F: FnOnce(&T) -> R + Send + 'static,
    {
        self.locator.selector().validate()?;
        let driver = self.driver()?;
        let locator = self.locator.clone();
        driver.run_on_ui(move || -> Result<R, AutomationError> {
            let element = locator.one()?;
            let typed = element.cast::<T>()?;
            Ok(f(typed))
        })??;
        driver.wait_for_ui_events(driver.config().drain_attempts)?;
        Ok(self)
    }

    /// Drains the UI event queue with the configured number of rounds.
    pub fn interrupt(&self) -> Result<&Self, AutomationError> {
        let driver = self.driver()?;
        driver.wait_for_ui_events(driver.config().drain_attempts)?;
        Ok(self)
    }

    pub fn interrupt_with(&self, attempts: u32) -> Result<&Self, AutomationError> {
        self.driver()?.wait_for_ui_events(attempts)?;
        Ok(self)
    }

    // ---- Typing ----

    pub fn push(&self, keys: &[Key]) -> Result<&Self, AutomationError> {
        self.driver()?.push(keys)?;
        Ok(self)
    }

    pub fn push_combination(&self, combination: &KeyCombination) -> Result<&Self, AutomationError> {
        self.driver()?.push_combination(combination)?;
        Ok(self)
    }

    pub fn type_keys(&self, keys: &[Key]) -> Result<&Self, AutomationError> {
        self.driver()?.type_keys(keys)?;
        Ok(self)
    }

    pub fn type_key(&self, key: Key, times: u32) -> Result<&Self, AutomationError> {
        self.driver()?.type_key(key, times)?;
        Ok(self)
    }

    /// Backspace, `amount` times.
    pub fn erase_text(&self, amount: u32) -> Result<&Self, AutomationError> {
        self.type_key(Key::BackSpace, amount)
    }

    /// Pushes the platform close-window shortcut, then sleeps for the configured
    /// settle time. The sleep is a fixed delay and does not confirm the window closed.
    #[instrument(level = "debug", skip(self))]
    pub fn close_current_window(&self) -> Result<&Self, AutomationError> {
        let driver = self.driver()?;
        let config = driver.config();
        driver.push_combination(&config.close_window_combination)?;
        driver.sleep(config.close_window_settle());
        Ok(self)
    }

    pub fn write(&self, text: &str) -> Result<&Self, AutomationError> {
        self.driver()?.write(text)?;
        Ok(self)
    }

    pub fn write_char(&self, character: char) -> Result<&Self, AutomationError> {
        self.driver()?.write_char(character)?;
        Ok(self)
    }

    // ---- Timing ----

    pub fn sleep(&self, milliseconds: u64) -> Result<&Self, AutomationError> {
        self.sleep_for(Duration::from_millis(milliseconds))
    }

    pub fn sleep_for(&self, duration: Duration) -> Result<&Self, AutomationError> {
        self.driver()?.sleep(duration);
        Ok(self)
    }

    // ---- Scrolling ----

    pub fn scroll(&self, amount: u32, direction: VerticalDirection) -> Result<&Self, AutomationError> {
        self.driver()?.scroll_vertical(amount, direction)?;
        Ok(self)
    }

    pub fn scroll_once(&self, direction: VerticalDirection) -> Result<&Self, AutomationError> {
        self.scroll(1, direction)
    }

    pub fn scroll_horizontal(
        &self,
        amount: u32,
        direction: HorizontalDirection,
    ) -> Result<&Self, AutomationError> {
        self.driver()?.scroll_horizontal(amount, direction)?;
        Ok(self)
    }

    pub fn scroll_horizontal_once(
        &self,
        direction: HorizontalDirection,
    ) -> Result<&Self, AutomationError> {
        self.scroll_horizontal(1, direction)
    }

    // ---- Keyboard and mouse ----

    pub fn press_keys(&self, keys: &[Key]) -> Result<&Self, AutomationError> {
        self.driver()?.press_keys(keys)?;
        Ok(self)
    }

    pub fn release_keys(&self, keys: &[Key]) -> Result<&Self, AutomationError> {
        self.driver()?.release_keys(keys)?;
        Ok(self)
    }

    pub fn press_buttons(&self, buttons: &[MouseButton]) -> Result<&Self, AutomationError> {
        self.driver()?.press_buttons(buttons)?;
        Ok(self)
    }

    pub fn release_buttons(&self, buttons: &[MouseButton]) -> Result<&Self, AutomationError> {
        self.driver()?.release_buttons(buttons)?;
        Ok(self)
    }

    // ---- Clicking ----

    #[instrument(level = "debug", skip(self), fields(selector = %self.locator.selector()))]
    pub fn click(&self, buttons: &[MouseButton]) -> Result<&Self, AutomationError> {
        let point = self.point_of_visible(&self.locator)?;
        self.driver()?.click_on(point, buttons)?;
        Ok(self)
    }

    #[instrument(level = "debug", skip(self), fields(selector = %self.locator.selector()))]
    pub fn double_click(&self, buttons: &[MouseButton]) -> Result<&Self, AutomationError> {
        let point = self.point_of_visible(&self.locator)?;
        self.driver()?.double_click_on(point, buttons)?;
        Ok(self)
    }

    pub fn right_click(&self) -> Result<&Self, AutomationError> {
        let point = self.point_of_visible(&self.locator)?;
        self.driver()?.right_click_on(point)?;
        Ok(self)
    }

    // ---- Drag and drop ----

    #[instrument(level = "debug", skip(self), fields(selector = %self.locator.selector()))]
    pub fn drag(&self, buttons: &[MouseButton]) -> Result<&Self, AutomationError> {
        let point = self.point_of_visible(&self.locator)?;
        self.driver()?.drag(point, buttons)?;
        Ok(self)
    }

    pub fn drop(&self) -> Result<&Self, AutomationError> {
        let driver = self.driver()?;
        Driver::drop(&driver)?;
        Ok(self)
    }

    /// Drops at a point, a region or an element (windows and scenes included).
    pub fn drop_to(&self, target: impl Into<Target>) -> Result<&Self, AutomationError> {
        let driver = self.driver()?;
        let point = driver.point(&target.into())?;
        driver.drop_to(point)?;
        Ok(self)
    }

    /// Drops on the visible element `selector` resolves to.
    pub fn drop_to_match(&self, selector: impl Into<Selector>) -> Result<&Self, AutomationError> {
        let locator = self.desktop.locator(selector.into());
        let point = self.point_of_visible(&locator)?;
        self.driver()?.drop_to(point)?;
        Ok(self)
    }

    pub fn drop_by(&self, dx: f64, dy: f64) -> Result<&Self, AutomationError> {
        self.driver()?.drop_by(dx, dy)?;
        Ok(self)
    }

    // ---- Movement ----

    pub fn move_to(&self, target: impl Into<Target>) -> Result<&Self, AutomationError> {
        let driver = self.driver()?;
        let point = driver.point(&target.into())?;
        driver.move_to(point)?;
        Ok(self)
    }

    pub fn move_to_match(&self, selector: impl Into<Selector>) -> Result<&Self, AutomationError> {
        let locator = self.desktop.locator(selector.into());
        let point = self.point_of_visible(&locator)?;
        self.driver()?.move_to(point)?;
        Ok(self)
    }

    pub fn move_by(&self, dx: f64, dy: f64) -> Result<&Self, AutomationError> {
        self.driver()?.move_by(dx, dy)?;
        Ok(self)
    }

    // ---- Waiting ----

    /// Waits up to `timeout_secs` for the node to satisfy `condition`.
    pub fn wait_until(
        &self,
        condition: &Condition<UIElement>,
        timeout_secs: u64,
    ) -> Result<&Self, AutomationError> {
        self.wait_node(None, condition, timeout_secs)
    }

    /// Like [`QueryChain::wait_until`]; `message` is carried by the failure.
    pub fn wait_until_with_message(
        &self,
        message: &str,
        condition: &Condition<UIElement>,
        timeout_secs: u64,
    ) -> Result<&Self, AutomationError> {
        self.wait_node(Some(message), condition, timeout_secs)
    }

    fn wait_node(
        &self,
        message: Option<&str>,
        condition: &Condition<UIElement>,
        timeout_secs: u64,
    ) -> Result<&Self, AutomationError> {
        self.locator.selector().validate()?;
        self.driver()?
            .wait_until_node(&self.locator, condition, timeout_secs, message)?;
        Ok(self)
    }

    pub fn wait_until_value<T>(
        &self,
        value: T,
        condition: &Condition<T>,
        timeout_secs: u64,
    ) -> Result<&Self, AutomationError>
    where
        T: Send + 'static,
    {
        self.driver()?
            .wait_until_value(value, condition, timeout_secs, None)?;
        Ok(self)
    }

    pub fn wait_until_value_with_message<T>(
        &self,
        message: &str,
        value: T,
        condition: &Condition<T>,
        timeout_secs: u64,
    ) -> Result<&Self, AutomationError>
    where
        T: Send + 'static,
    {
        self.driver()?
            .wait_until_value(value, condition, timeout_secs, Some(message))?;
        Ok(self)
    }

    /// Waits until the value produced by `compute` satisfies `condition`.
    pub fn wait_until_computed<T, F>(
        &self,
        compute: F,
        condition: &Condition<T>,
        timeout_secs: u64,
    ) -> Result<&Self, AutomationError>
    where
        T: 'static,
        F: FnMut() -> T + Send + 'static,
    {
        self.driver()?
            .wait_until_computed(compute, condition, timeout_secs, None)?;
        Ok(self)
    }

    pub fn wait_until_computed_with_message<T, F>(
        &self,
        message: &str,
        compute: F,
        condition: &Condition<T>,
        timeout_secs: u64,
    ) -> Result<&Self, AutomationError>
    where
        T: 'static,
        F: FnMut() -> T + Send + 'static,
    {
        self.driver()?
            .wait_until_computed(compute, condition, timeout_secs, Some(message))?;
        Ok(self)
    }

    // ---- Verification ----

    /// Asserts `condition` on the node; assertion failures are returned unchanged.
    pub fn verify_that(&self, condition: &Condition<UIElement>) -> Result<&Self, AutomationError> {
        assertions::verify_that(&self.locator, condition)?;
        Ok(self)
    }
}
