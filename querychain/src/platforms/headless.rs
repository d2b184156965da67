//! In-memory backend
//!
//! A scene of [`HeadlessElement`]s with interior-mutable state, an engine that
//! evaluates every selector kind over it, and a robot that records the input it
//! is given instead of sending it to a display.

use crate::element::{UIElement, UIElementAttributes, UIElementImpl};
use crate::errors::AutomationError;
use crate::input::{Key, MouseButton};
use crate::platforms::{dedupe_elements, AccessibilityEngine, Robot};
use crate::selector::{Selector, TextSelector};
use crate::types::{Bounds, Point, ScreenshotResult};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tracing::debug;

static NEXT_NODE_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Debug)]
struct NodeState {
    role: String,
    id: Option<String>,
    name: Option<String>,
    text: Option<String>,
    class_name: Option<String>,
    bounds: Bounds,
    visible: bool,
    enabled: bool,
    children: Vec<HeadlessElement>,
}

struct HeadlessNode {
    object_id: usize,
    state: RwLock<NodeState>,
    parent: RwLock<Weak<HeadlessNode>>,
}

/// A node in a [`HeadlessScene`].
///
/// Cloning yields another handle to the same node; state changes made through any
/// handle are seen by all of them.
#[derive(Clone)]
pub struct HeadlessElement {
    node: Arc<HeadlessNode>,
}

impl HeadlessElement {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            node: Arc::new(HeadlessNode {
                object_id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
                state: RwLock::new(NodeState {
                    role: role.into(),
                    id: None,
                    name: None,
                    text: None,
                    class_name: None,
                    bounds: Bounds::new(0.0, 0.0, 100.0, 30.0),
                    visible: true,
                    enabled: true,
                    children: Vec::new(),
                }),
                parent: RwLock::new(Weak::new()),
            }),
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.write().id = Some(id.into());
        self
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    pub fn with_class(self, class_name: impl Into<String>) -> Self {
        self.write().class_name = Some(class_name.into());
        self
    }

    pub fn with_bounds(self, bounds: impl Into<Bounds>) -> Self {
        self.set_bounds(bounds);
        self
    }

    pub fn hidden(self) -> Self {
        self.set_visible(false);
        self
    }

    pub fn disabled(self) -> Self {
        self.write().enabled = false;
        self
    }

    pub fn with_child(self, child: HeadlessElement) -> Self {
        self.add_child(child);
        self
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.write().text = Some(text.into());
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.write().name = Some(name.into());
    }

    pub fn set_visible(&self, visible: bool) {
        self.write().visible = visible;
    }

    pub fn set_bounds(&self, bounds: impl Into<Bounds>) {
        self.write().bounds = bounds.into();
    }

    /// Attaches `child` below this node, detaching it from any previous parent.
    pub fn add_child(&self, child: HeadlessElement) {
        if let Some(previous) = child.parent() {
            previous.remove_child(&child);
        }
        *child
            .node
            .parent
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(&self.node);
        self.write().children.push(child);
    }

    pub fn remove_child(&self, child: &HeadlessElement) {
        let removed = {
            let mut state = self.write();
            let before = state.children.len();
            state
                .children
                .retain(|c| c.node.object_id != child.node.object_id);
            before != state.children.len()
        };
        if removed {
            *child
                .node
                .parent
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Weak::new();
        }
    }

    pub fn parent(&self) -> Option<HeadlessElement> {
        self.node
            .parent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
            .map(|node| HeadlessElement { node })
    }

    pub fn child_elements(&self) -> Vec<HeadlessElement> {
        self.read().children.clone()
    }

    pub fn text_value(&self) -> Option<String> {
        self.read().text.clone()
    }

    /// Visible itself and along every ancestor.
    pub fn is_shown(&self) -> bool {
        if !self.read().visible {
            return false;
        }
        let mut current = self.parent();
        while let Some(ancestor) = current {
            if !ancestor.read().visible {
                return false;
            }
            current = ancestor.parent();
        }
        true
    }

    fn descendants(&self, out: &mut Vec<HeadlessElement>) {
        for child in self.child_elements() {
            out.push(child.clone());
            child.descendants(out);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, NodeState> {
        self.node.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, NodeState> {
        self.node.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for HeadlessElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("HeadlessElement")
            .field("object_id", &self.node.object_id)
            .field("role", &state.role)
            .field("id", &state.id)
            .field("children", &state.children.len())
            .finish()
    }
}

impl UIElementImpl for HeadlessElement {
    fn object_id(&self) -> usize {
        self.node.object_id
    }

    fn id(&self) -> Option<String> {
        self.read().id.clone()
    }

    fn role(&self) -> String {
        self.read().role.clone()
    }

    fn attributes(&self) -> UIElementAttributes {
        let state = self.read();
        UIElementAttributes {
            role: state.role.clone(),
            id: state.id.clone(),
            name: state.name.clone(),
            text: state.text.clone(),
            class_name: state.class_name.clone(),
            enabled: Some(state.enabled),
        }
    }

    fn children(&self) -> Result<Vec<UIElement>, AutomationError> {
        Ok(self.child_elements().into_iter().map(UIElement::from).collect())
    }

    fn bounds(&self) -> Result<Bounds, AutomationError> {
        Ok(self.read().bounds)
    }

    fn is_visible(&self) -> Result<bool, AutomationError> {
        Ok(self.is_shown())
    }

    fn is_enabled(&self) -> Result<bool, AutomationError> {
        Ok(self.read().enabled)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn UIElementImpl> {
        Box::new(self.clone())
    }
}

impl From<HeadlessElement> for UIElement {
    fn from(element: HeadlessElement) -> Self {
        UIElement::new(Box::new(element))
    }
}

/// The root set of an in-memory UI
#[derive(Clone, Default, Debug)]
pub struct HeadlessScene {
    roots: Arc<RwLock<Vec<HeadlessElement>>>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&self, root: HeadlessElement) {
        self.roots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(root);
    }

    pub fn roots(&self) -> Vec<HeadlessElement> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every node in depth-first, pre-order.
    pub fn all_elements(&self) -> Vec<HeadlessElement> {
        let mut out = Vec::new();
        for root in self.roots() {
            out.push(root.clone());
            root.descendants(&mut out);
        }
        out
    }
}

/// One primitive received by a [`RecordingRobot`]
#[derive(Debug, Clone, PartialEq)]
pub enum RobotEvent {
    KeyPressed(Key),
    KeyReleased(Key),
    CharWritten(char),
    ButtonPressed(MouseButton),
    ButtonReleased(MouseButton),
    PointerMoved(Point),
    Scrolled(i32),
}

/// Shared, append-only record of robot input
#[derive(Clone, Default, Debug)]
pub struct RobotLog {
    events: Arc<Mutex<Vec<RobotEvent>>>,
}

impl RobotLog {
    fn record(&self, event: RobotEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<RobotEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// A robot that logs input and tracks the pointer
#[derive(Debug)]
pub struct RecordingRobot {
    log: RobotLog,
    pointer: Mutex<Point>,
    ui_bound: bool,
}

impl RecordingRobot {
    pub fn new(log: RobotLog) -> Self {
        Self {
            log,
            pointer: Mutex::new(Point::default()),
            ui_bound: false,
        }
    }
}

impl Robot for RecordingRobot {
    fn press_key(&self, key: Key) -> Result<(), AutomationError> {
        self.log.record(RobotEvent::KeyPressed(key));
        Ok(())
    }

    fn release_key(&self, key: Key) -> Result<(), AutomationError> {
        self.log.record(RobotEvent::KeyReleased(key));
        Ok(())
    }

    fn write_char(&self, character: char) -> Result<(), AutomationError> {
        self.log.record(RobotEvent::CharWritten(character));
        Ok(())
    }

    fn press_button(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.log.record(RobotEvent::ButtonPressed(button));
        Ok(())
    }

    fn release_button(&self, button: MouseButton) -> Result<(), AutomationError> {
        self.log.record(RobotEvent::ButtonReleased(button));
        Ok(())
    }

    fn move_pointer(&self, point: Point) -> Result<(), AutomationError> {
        *self.pointer.lock().unwrap_or_else(PoisonError::into_inner) = point;
        self.log.record(RobotEvent::PointerMoved(point));
        Ok(())
    }

    fn pointer_position(&self) -> Result<Point, AutomationError> {
        Ok(*self.pointer.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn scroll(&self, tick: i32) -> Result<(), AutomationError> {
        self.log.record(RobotEvent::Scrolled(tick));
        Ok(())
    }

    fn requires_ui_thread(&self) -> bool {
        self.ui_bound
    }
}

/// Evaluates selectors over a [`HeadlessScene`] and hands out recording robots
#[derive(Clone, Default, Debug)]
pub struct HeadlessEngine {
    scene: HeadlessScene,
    log: RobotLog,
    ui_bound_robot: bool,
}

impl HeadlessEngine {
    pub fn new(scene: HeadlessScene) -> Self {
        Self {
            scene,
            log: RobotLog::default(),
            ui_bound_robot: false,
        }
    }

    /// Robots created from now on ask to be driven from the UI thread.
    pub fn with_ui_bound_robot(mut self) -> Self {
        self.ui_bound_robot = true;
        self
    }

    pub fn scene(&self) -> &HeadlessScene {
        &self.scene
    }

    /// The log every robot created by this engine writes to.
    pub fn robot_log(&self) -> &RobotLog {
        &self.log
    }

    fn evaluate(&self, selector: &TextSelector) -> Vec<HeadlessElement> {
        match selector {
            TextSelector::Chain(steps) => {
                let mut current: Option<Vec<HeadlessElement>> = None;
                for step in steps {
                    let next = match (step, current) {
                        (TextSelector::Nth(_) | TextSelector::Visible(_), Some(set)) => {
                            filter_set(step, set)
                        }
                        (_, None) => self.evaluate(step),
                        (_, Some(set)) => {
                            let mut below = Vec::new();
                            for element in &set {
                                element.descendants(&mut below);
                            }
                            filter_set(step, below)
                        }
                    };
                    if next.is_empty() {
                        return next;
                    }
                    current = Some(next);
                }
                current.unwrap_or_default()
            }
            other => filter_set(other, self.scene.all_elements()),
        }
    }
}

fn filter_set(step: &TextSelector, set: Vec<HeadlessElement>) -> Vec<HeadlessElement> {
    match step {
        TextSelector::Nth(index) => {
            let len = set.len() as i64;
            let index = if *index < 0 {
                len + *index as i64
            } else {
                *index as i64
            };
            if index < 0 || index >= len {
                Vec::new()
            } else {
                set.into_iter().skip(index as usize).take(1).collect()
            }
        }
        _ => set
            .into_iter()
            .filter(|e| step.matches_element(&UIElement::from(e.clone())))
            .collect(),
    }
}

impl AccessibilityEngine for HeadlessEngine {
    fn find_elements(&self, selector: &Selector) -> Result<Vec<UIElement>, AutomationError> {
        let found: Vec<UIElement> = match selector {
            Selector::Query(query) => {
                selector.validate()?;
                self.evaluate(&TextSelector::from(query.as_str()))
                    .into_iter()
                    .map(UIElement::from)
                    .collect()
            }
            Selector::Matcher(matcher) => self
                .scene
                .all_elements()
                .into_iter()
                .map(UIElement::from)
                .filter(|e| matcher.matches(e))
                .collect(),
            Selector::Predicate(predicate) => self
                .scene
                .all_elements()
                .into_iter()
                .map(UIElement::from)
                .filter(|e| predicate(e))
                .collect(),
        };
        debug!("{} matched {} element(s)", selector.describe(), found.len());
        Ok(dedupe_elements(found))
    }

    fn capture(&self, element: &UIElement) -> Result<ScreenshotResult, AutomationError> {
        if !self.is_visible(element)? {
            return Err(AutomationError::PlatformError(format!(
                "Cannot capture hidden element {element}"
            )));
        }
        let bounds = element.bounds()?;
        let (width, height) = (bounds.width.round() as u32, bounds.height.round() as u32);
        if width == 0 || height == 0 {
            return Err(AutomationError::PlatformError(format!(
                "Element {element} has empty bounds"
            )));
        }
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        Ok(ScreenshotResult {
            image_data: image.into_raw(),
            width,
            height,
        })
    }

    fn create_robot(&self) -> Result<Arc<dyn Robot>, AutomationError> {
        let mut robot = RecordingRobot::new(self.log.clone());
        robot.ui_bound = self.ui_bound_robot;
        Ok(Arc::new(robot))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::has_text;

    fn form() -> (HeadlessEngine, HeadlessElement) {
        let ok = HeadlessElement::new("button").with_id("ok").with_name("OK");
        let list = HeadlessElement::new("list")
            .with_id("items")
            .with_child(HeadlessElement::new("listitem").with_text("one"))
            .with_child(HeadlessElement::new("listitem").with_text("two"))
            .with_child(HeadlessElement::new("listitem").with_text("three"));
        let window = HeadlessElement::new("window")
            .with_name("Main")
            .with_child(ok.clone())
            .with_child(list);
        let scene = HeadlessScene::new();
        scene.add_root(window);
        (HeadlessEngine::new(scene), ok)
    }

    fn texts(found: Vec<UIElement>) -> Vec<String> {
        found.into_iter().filter_map(|e| e.text()).collect()
    }

    #[test]
    fn test_query_kinds_resolve_over_the_scene() {
        let (engine, ok) = form();

        let by_id = engine.find_element(&Selector::from("#ok")).unwrap();
        assert_eq!(by_id, UIElement::from(ok));

        let items = engine.find_elements(&Selector::from("role:listitem")).unwrap();
        assert_eq!(items.len(), 3);

        let two = engine
            .find_elements(&Selector::matcher(has_text("two")))
            .unwrap();
        assert_eq!(texts(two), vec!["two"]);

        let named = engine
            .find_elements(&Selector::predicate(|e| e.name().is_some()))
            .unwrap();
        assert_eq!(named.len(), 2);
    }

    #[test]
    fn test_chain_and_nth() {
        let (engine, _) = form();
        let last = engine
            .find_elements(&Selector::from("#items >> role:listitem >> nth=-1"))
            .unwrap();
        assert_eq!(texts(last), vec!["three"]);

        let out_of_range = engine
            .find_elements(&Selector::from("#items >> role:listitem >> nth=7"))
            .unwrap();
        assert!(out_of_range.is_empty());
    }

    #[test]
    fn test_visibility_is_inherited() {
        let (engine, _) = form();
        let list = engine.find_element(&Selector::from("#items")).unwrap();
        list.downcast_ref::<HeadlessElement>().unwrap().set_visible(false);

        let visible_items = engine
            .find_elements(&Selector::from("role:listitem >> visible:true"))
            .unwrap();
        assert!(visible_items.is_empty());
        assert!(!engine.is_visible(&list).unwrap());
    }

    #[test]
    fn test_find_element_is_strict() {
        let (engine, _) = form();
        assert!(matches!(
            engine.find_element(&Selector::from("role:listitem")),
            Err(AutomationError::AmbiguousMatch { count: 3, .. })
        ));
        assert!(matches!(
            engine.find_element(&Selector::from("#missing")),
            Err(AutomationError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_reparenting_moves_the_node() {
        let a = HeadlessElement::new("pane");
        let b = HeadlessElement::new("pane");
        let leaf = HeadlessElement::new("label");
        a.add_child(leaf.clone());
        b.add_child(leaf.clone());

        assert!(a.child_elements().is_empty());
        assert_eq!(b.child_elements().len(), 1);
        assert_eq!(
            leaf.parent().map(|p| p.node.object_id),
            Some(b.node.object_id)
        );
    }

    #[test]
    fn test_capture_matches_bounds() {
        let (engine, ok) = form();
        ok.set_bounds((10.0, 10.0, 40.0, 20.0));
        let shot = engine.capture(&UIElement::from(ok)).unwrap();
        assert_eq!((shot.width, shot.height), (40, 20));
        assert!(shot.to_image().is_some());
    }

    #[test]
    fn test_robots_share_one_log() {
        let (engine, _) = form();
        let first = engine.create_robot().unwrap();
        let second = engine.create_robot().unwrap();
        first.scroll(1).unwrap();
        second.press_key(Key::Enter).unwrap();
        assert_eq!(
            engine.robot_log().events(),
            vec![RobotEvent::Scrolled(1), RobotEvent::KeyPressed(Key::Enter)]
        );
    }
}
