//! Fluent query/action chains for driving desktop UI tests
//!
//! A [`Desktop`] binds an accessibility backend to the thread that owns the UI.
//! [`Desktop::select`] starts a [`QueryChain`]: each action re-resolves its
//! selector against the live UI, delegates the gesture to the calling thread's
//! [`Driver`] and returns the chain for the next step.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

pub mod assertions;
pub mod chain;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod element;
pub mod errors;
pub mod input;
pub mod locator;
pub mod matchers;
pub mod platforms;
pub mod selector;
#[cfg(test)]
mod tests;
pub mod types;
pub mod wait;

pub use chain::QueryChain;
pub use config::ChainConfig;
pub use dispatch::{EventLoop, UiThread};
pub use driver::Driver;
pub use element::{UIElement, UIElementAttributes, UIElementImpl};
pub use errors::AutomationError;
pub use input::{HorizontalDirection, Key, KeyCombination, MouseButton, VerticalDirection};
pub use locator::Locator;
pub use matchers::{Condition, Matcher};
pub use platforms::{AccessibilityEngine, Robot};
pub use selector::Selector;
pub use types::{Bounds, Point, ScreenshotResult, Target};

use platforms::headless::HeadlessEngine;

static NEXT_DESKTOP_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static DRIVERS: RefCell<HashMap<u64, CachedDriver>> = RefCell::new(HashMap::new());
}

struct CachedDriver {
    owner: Weak<DesktopId>,
    driver: Rc<Driver>,
}

/// Identity shared by the clones of one desktop configuration.
///
/// Dropping the last clone evicts the driver cached on the dropping thread.
/// Entries on other threads go at their next driver lookup.
#[derive(Debug)]
struct DesktopId(u64);

impl DesktopId {
    fn next() -> Arc<Self> {
        Arc::new(Self(NEXT_DESKTOP_ID.fetch_add(1, Ordering::Relaxed)))
    }
}

impl Drop for DesktopId {
    fn drop(&mut self) {
        let _ = DRIVERS.try_with(|drivers| {
            if let Ok(mut drivers) = drivers.try_borrow_mut() {
                drivers.remove(&self.0);
            }
        });
    }
}

/// The main entry point for UI automation
#[derive(Clone)]
pub struct Desktop {
    id: Arc<DesktopId>,
    engine: Arc<dyn AccessibilityEngine>,
    ui: Arc<dyn UiThread>,
    config: ChainConfig,
}

impl Desktop {
    pub fn new(engine: Arc<dyn AccessibilityEngine>, ui: Arc<dyn UiThread>) -> Self {
        Self {
            id: DesktopId::next(),
            engine,
            ui,
            config: ChainConfig::default(),
        }
    }

    /// An in-memory desktop with its own UI event loop thread.
    pub fn headless(engine: HeadlessEngine) -> Result<Self, AutomationError> {
        let ui = EventLoop::spawn()?;
        Ok(Self::new(Arc::new(engine), Arc::new(ui)))
    }

    /// Replaces the configuration. Drivers already created for the old
    /// configuration are not reused.
    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self.id = DesktopId::next();
        self
    }

    pub fn engine(&self) -> &Arc<dyn AccessibilityEngine> {
        &self.engine
    }

    pub fn ui(&self) -> &Arc<dyn UiThread> {
        &self.ui
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn locator(&self, selector: impl Into<Selector>) -> Locator {
        Locator::new(self.engine.clone(), selector.into())
    }

    /// Starts a chain over `selector`: a textual query, `Selector::matcher(..)`
    /// or `Selector::predicate(..)`.
    pub fn select(&self, selector: impl Into<Selector>) -> QueryChain {
        QueryChain::new(self.clone(), selector.into())
    }

    /// The calling thread's driver for this desktop, created on first use.
    pub fn driver(&self) -> Result<Rc<Driver>, AutomationError> {
        let cached = DRIVERS.with(|drivers| {
            let mut drivers = drivers.borrow_mut();
            drivers.retain(|_, cached| cached.owner.strong_count() > 0);
            drivers.get(&self.id.0).map(|cached| cached.driver.clone())
        });
        if let Some(driver) = cached {
            return Ok(driver);
        }

        let driver = Rc::new(Driver::new(
            self.engine.clone(),
            self.ui.clone(),
            self.config.clone(),
        )?);
        debug!(
            desktop = self.id.0,
            "Created driver for thread {:?}",
            std::thread::current().id()
        );
        DRIVERS.with(|drivers| {
            drivers.borrow_mut().insert(
                self.id.0,
                CachedDriver {
                    owner: Arc::downgrade(&self.id),
                    driver: driver.clone(),
                },
            );
        });
        Ok(driver)
    }

    /// Drops the calling thread's driver; the next call to [`Desktop::driver`]
    /// starts from a fresh robot with nothing held.
    pub fn release_driver(&self) {
        DRIVERS.with(|drivers| {
            drivers.borrow_mut().remove(&self.id.0);
        });
    }
}

#[cfg(test)]
pub(crate) fn cached_driver_count() -> usize {
    DRIVERS.with(|drivers| drivers.borrow().len())
}

impl fmt::Debug for Desktop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Desktop")
            .field("id", &self.id.0)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
