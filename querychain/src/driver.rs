//! The automation driver
//!
//! Composes robot primitives into gestures, marshals work onto the UI thread and
//! runs bounded waits. A driver keeps per-thread input state (held keys and
//! buttons) and is therefore `!Sync`; [`crate::Desktop::driver`] hands out one
//! instance per calling thread.
//!
//! A driver only holds a weak handle on the UI thread. The desktop keeps it
//! alive, so dropping the last desktop handle stops its event loop even while
//! drivers for it are still cached on other threads.

use crate::config::ChainConfig;
use crate::dispatch::{blocking_section, panic_message, UiThread};
use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::input::{HorizontalDirection, Key, KeyCombination, MouseButton, VerticalDirection};
use crate::locator::Locator;
use crate::matchers::Condition;
use crate::platforms::{AccessibilityEngine, Robot};
use crate::selector::Selector;
use crate::types::{Point, ScreenshotResult, Target};
use crate::wait::{wait_for, WaitOptions};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, instrument};

pub struct Driver {
    engine: Arc<dyn AccessibilityEngine>,
    ui: Weak<dyn UiThread>,
    robot: Arc<dyn Robot>,
    config: ChainConfig,
    pressed_keys: RefCell<Vec<Key>>,
    pressed_buttons: RefCell<Vec<MouseButton>>,
}

impl Driver {
    pub fn new(
        engine: Arc<dyn AccessibilityEngine>,
        ui: Arc<dyn UiThread>,
        config: ChainConfig,
    ) -> Result<Self, AutomationError> {
        let robot = engine.create_robot()?;
        Ok(Self {
            engine,
            ui: Arc::downgrade(&ui),
            robot,
            config,
            pressed_keys: RefCell::new(Vec::new()),
            pressed_buttons: RefCell::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn AccessibilityEngine> {
        &self.engine
    }

    /// The UI thread, unless every handle on it has been dropped.
    pub fn ui(&self) -> Result<Arc<dyn UiThread>, AutomationError> {
        self.ui.upgrade().ok_or_else(|| {
            AutomationError::Internal("The UI thread of this driver has been shut down".to_string())
        })
    }

    /// Whether the UI thread this driver marshals onto is still alive.
    pub fn is_attached(&self) -> bool {
        self.ui.strong_count() > 0
    }

    fn on_ui_thread(&self) -> bool {
        self.ui.upgrade().is_some_and(|ui| ui.is_ui_thread())
    }

    /// Keys pressed through this driver and not yet released, in press order.
    pub fn pressed_keys(&self) -> Vec<Key> {
        self.pressed_keys.borrow().clone()
    }

    pub fn pressed_buttons(&self) -> Vec<MouseButton> {
        self.pressed_buttons.borrow().clone()
    }

    pub fn lookup(&self, selector: impl Into<Selector>) -> Locator {
        Locator::new(self.engine.clone(), selector.into())
    }

    // ---- UI thread hand-off ----

    /// Run `f` on the UI thread and block until it has returned.
    ///
    /// Runs inline when already called from the UI thread.
    pub fn run_on_ui<R, F>(&self, f: F) -> Result<R, AutomationError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let ui = self.ui()?;
        if ui.is_ui_thread() {
            return Ok(f());
        }

        let (tx, rx) = oneshot::channel();
        ui.run_later(Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| panic_message(payload.as_ref()));
            let _ = tx.send(outcome);
        }))?;
        drop(ui);

        match blocking_section(move || rx.blocking_recv())? {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(panic)) => Err(AutomationError::Internal(format!(
                "UI job panicked: {panic}"
            ))),
            Err(_) => Err(AutomationError::Internal(
                "UI job was dropped before it completed".to_string(),
            )),
        }
    }

    /// Block until events queued on the UI thread so far have been dispatched.
    ///
    /// Each round queues a no-op behind pending work, waits for it, then pauses so
    /// work scheduled by those events gets queued too. A no-op on the UI thread.
    pub fn wait_for_ui_events(&self, attempts: u32) -> Result<(), AutomationError> {
        if self.on_ui_thread() {
            return Ok(());
        }
        for _ in 0..attempts {
            self.drain_round()?;
            std::thread::sleep(self.config.drain_pause());
        }
        Ok(())
    }

    fn drain_round(&self) -> Result<(), AutomationError> {
        self.run_on_ui(|| ())
    }

    fn robot_call<R, F>(&self, call: F) -> Result<R, AutomationError>
    where
        R: Send + 'static,
        F: FnOnce(&dyn Robot) -> Result<R, AutomationError> + Send + 'static,
    {
        if self.robot.requires_ui_thread() {
            let robot = self.robot.clone();
            self.run_on_ui(move || call(robot.as_ref()))?
        } else {
            call(self.robot.as_ref())
        }
    }

    /// One robot primitive followed by the configured settle step.
    fn input<F>(&self, call: F) -> Result<(), AutomationError>
    where
        F: FnOnce(&dyn Robot) -> Result<(), AutomationError> + Send + 'static,
    {
        self.robot_call(call)?;
        if self.config.settle_after_input && !self.on_ui_thread() {
            self.drain_round()?;
        }
        Ok(())
    }

    // ---- Keyboard ----

    #[instrument(level = "debug", skip(self))]
    pub fn press_keys(&self, keys: &[Key]) -> Result<(), AutomationError> {
        for &key in keys {
            self.input(move |robot| robot.press_key(key))?;
            self.pressed_keys.borrow_mut().push(key);
        }
        Ok(())
    }

    /// Releases `keys`, or every held key (latest first) when `keys` is empty.
    #[instrument(level = "debug", skip(self))]
    pub fn release_keys(&self, keys: &[Key]) -> Result<(), AutomationError> {
        let keys: Vec<Key> = if keys.is_empty() {
            self.pressed_keys.borrow().iter().rev().copied().collect()
        } else {
            keys.to_vec()
        };
        for key in keys {
            self.input(move |robot| robot.release_key(key))?;
            let mut pressed = self.pressed_keys.borrow_mut();
            if let Some(pos) = pressed.iter().rposition(|k| *k == key) {
                pressed.remove(pos);
            }
        }
        Ok(())
    }

    /// Presses `keys` in order, then releases them in reverse order.
    #[instrument(level = "debug", skip(self))]
    pub fn push(&self, keys: &[Key]) -> Result<(), AutomationError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.press_keys(keys)?;
        let reversed: Vec<Key> = keys.iter().rev().copied().collect();
        self.release_keys(&reversed)
    }

    pub fn push_combination(&self, combination: &KeyCombination) -> Result<(), AutomationError> {
        self.push(combination.keys())
    }

    /// Pushes each key on its own, one after another.
    pub fn type_keys(&self, keys: &[Key]) -> Result<(), AutomationError> {
        for &key in keys {
            self.push(&[key])?;
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn type_key(&self, key: Key, times: u32) -> Result<(), AutomationError> {
        for _ in 0..times {
            self.push(&[key])?;
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn write(&self, text: &str) -> Result<(), AutomationError> {
        for character in text.chars() {
            self.write_char(character)?;
        }
        Ok(())
    }

    pub fn write_char(&self, character: char) -> Result<(), AutomationError> {
        self.input(move |robot| robot.write_char(character))
    }

    // ---- Mouse ----

    /// Presses `buttons`, or the primary button when `buttons` is empty.
    #[instrument(level = "debug", skip(self))]
    pub fn press_buttons(&self, buttons: &[MouseButton]) -> Result<(), AutomationError> {
        for button in or_primary(buttons) {
            self.input(move |robot| robot.press_button(button))?;
            self.pressed_buttons.borrow_mut().push(button);
        }
        Ok(())
    }

    /// Releases `buttons`, or every held button when `buttons` is empty.
    #[instrument(level = "debug", skip(self))]
    pub fn release_buttons(&self, buttons: &[MouseButton]) -> Result<(), AutomationError> {
        let buttons: Vec<MouseButton> = if buttons.is_empty() {
            self.pressed_buttons.borrow().clone()
        } else {
            buttons.to_vec()
        };
        for button in buttons {
            self.input(move |robot| robot.release_button(button))?;
            self.pressed_buttons.borrow_mut().retain(|b| *b != button);
        }
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn click_on(&self, point: Point, buttons: &[MouseButton]) -> Result<(), AutomationError> {
        let buttons = or_primary(buttons);
        self.move_to(point)?;
        self.press_buttons(&buttons)?;
        self.release_buttons(&buttons)
    }

    pub fn double_click_on(
        &self,
        point: Point,
        buttons: &[MouseButton],
    ) -> Result<(), AutomationError> {
        self.click_on(point, buttons)?;
        self.click_on(point, buttons)
    }

    pub fn right_click_on(&self, point: Point) -> Result<(), AutomationError> {
        self.click_on(point, &[MouseButton::Secondary])
    }

    #[instrument(level = "debug", skip(self))]
    pub fn move_to(&self, point: Point) -> Result<(), AutomationError> {
        self.input(move |robot| robot.move_pointer(point))
    }

    pub fn move_by(&self, dx: f64, dy: f64) -> Result<(), AutomationError> {
        let current = self.robot_call(|robot| robot.pointer_position())?;
        self.move_to(current.offset(dx, dy))
    }

    /// Moves to `point` and holds `buttons` (primary when empty) until a drop.
    #[instrument(level = "debug", skip(self))]
    pub fn drag(&self, point: Point, buttons: &[MouseButton]) -> Result<(), AutomationError> {
        self.move_to(point)?;
        self.press_buttons(buttons)
    }

    /// Releases every held button where the pointer is.
    pub fn drop(&self) -> Result<(), AutomationError> {
        self.release_buttons(&[])
    }

    pub fn drop_to(&self, point: Point) -> Result<(), AutomationError> {
        self.move_to(point)?;
        self.drop()
    }

    pub fn drop_by(&self, dx: f64, dy: f64) -> Result<(), AutomationError> {
        self.move_by(dx, dy)?;
        self.drop()
    }

    // ---- Scrolling ----

    /// Issues `amount` single ticks, each as its own robot call.
    #[instrument(level = "debug", skip(self))]
    pub fn scroll_vertical(
        &self,
        amount: u32,
        direction: VerticalDirection,
    ) -> Result<(), AutomationError> {
        self.scroll_ticks(amount, direction.tick())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn scroll_horizontal(
        &self,
        amount: u32,
        direction: HorizontalDirection,
    ) -> Result<(), AutomationError> {
        self.scroll_ticks(amount, direction.tick())
    }

    fn scroll_ticks(&self, amount: u32, tick: i32) -> Result<(), AutomationError> {
        for _ in 0..amount {
            self.input(move |robot| robot.scroll(tick))?;
        }
        Ok(())
    }

    // ---- Misc ----

    pub fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    pub fn capture(&self, element: &UIElement) -> Result<ScreenshotResult, AutomationError> {
        self.engine.capture(element)
    }

    pub fn point(&self, target: &Target) -> Result<Point, AutomationError> {
        self.engine.point_of(target)
    }

    // ---- Waiting ----

    /// Polls `condition` for up to `timeout`; see [`wait_for`] for failure semantics.
    pub fn wait_until<F>(
        &self,
        timeout: Duration,
        message: Option<&str>,
        condition: F,
    ) -> Result<(), AutomationError>
    where
        F: FnMut() -> Result<bool, AutomationError> + Send + 'static,
    {
        let mut options = WaitOptions::new(timeout).with_poll_interval(self.config.poll_interval());
        if let Some(message) = message {
            options = options.with_message(message);
        }
        wait_for(&options, condition)
    }

    /// Waits until the single element behind `locator` satisfies `condition`.
    ///
    /// While nothing matches the wait keeps polling; any other lookup error ends it.
    #[instrument(level = "debug", skip(self, condition), fields(selector = %locator.selector()))]
    pub fn wait_until_node(
        &self,
        locator: &Locator,
        condition: &Condition<UIElement>,
        timeout_secs: u64,
        message: Option<&str>,
    ) -> Result<(), AutomationError> {
        let locator = locator.clone();
        let condition = condition.clone();
        self.wait_until(Duration::from_secs(timeout_secs), message, move || {
            match locator.one() {
                Ok(element) => Ok(condition.test(&element)),
                Err(AutomationError::ElementNotFound(description)) => {
                    debug!("{description} not present yet");
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        })
    }

    pub fn wait_until_value<T>(
        &self,
        value: T,
        condition: &Condition<T>,
        timeout_secs: u64,
        message: Option<&str>,
    ) -> Result<(), AutomationError>
    where
        T: Send + 'static,
    {
        let condition = condition.clone();
        self.wait_until(Duration::from_secs(timeout_secs), message, move || {
            Ok(condition.test(&value))
        })
    }

    /// Recomputes the value on every poll and tests it against `condition`.
    pub fn wait_until_computed<T, F>(
        &self,
        mut compute: F,
        condition: &Condition<T>,
        timeout_secs: u64,
        message: Option<&str>,
    ) -> Result<(), AutomationError>
    where
        T: 'static,
        F: FnMut() -> T + Send + 'static,
    {
        let condition = condition.clone();
        self.wait_until(Duration::from_secs(timeout_secs), message, move || {
            Ok(condition.test(&compute()))
        })
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .field("pressed_keys", &self.pressed_keys.borrow())
            .field("pressed_buttons", &self.pressed_buttons.borrow())
            .finish_non_exhaustive()
    }
}

fn or_primary(buttons: &[MouseButton]) -> Vec<MouseButton> {
    if buttons.is_empty() {
        vec![MouseButton::Primary]
    } else {
        buttons.to_vec()
    }
}
