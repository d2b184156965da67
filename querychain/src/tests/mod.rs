mod lifecycle_tests;
mod resolution_tests;

use crate::platforms::headless::{HeadlessElement, HeadlessEngine, HeadlessScene, RobotLog};
use crate::Desktop;

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_test_writer()
        .try_init();
}

/// A small form: a text field, a save button, a status label and three hidden
/// "ghost" buttons, all under one window.
pub struct FormFixture {
    pub desktop: Desktop,
    pub log: RobotLog,
    pub name_field: HeadlessElement,
    pub save: HeadlessElement,
    pub status: HeadlessElement,
}

impl FormFixture {
    pub fn new() -> Self {
        Self::with_engine(|engine| engine)
    }

    pub fn with_engine(customize: impl FnOnce(HeadlessEngine) -> HeadlessEngine) -> Self {
        init_tracing();

        let name_field = HeadlessElement::new("textfield")
            .with_id("name")
            .with_bounds((10.0, 10.0, 200.0, 24.0));
        let save = HeadlessElement::new("button")
            .with_id("save")
            .with_name("Save")
            .with_bounds((10.0, 50.0, 80.0, 30.0));
        let status = HeadlessElement::new("label")
            .with_id("status")
            .with_text("idle")
            .with_bounds((10.0, 100.0, 200.0, 20.0));

        let mut window = HeadlessElement::new("window")
            .with_name("Form")
            .with_bounds((0.0, 0.0, 400.0, 300.0))
            .with_child(name_field.clone())
            .with_child(save.clone())
            .with_child(status.clone());
        for i in 0..3 {
            window = window.with_child(
                HeadlessElement::new("button")
                    .with_id(format!("ghost-{i}"))
                    .with_class("ghost")
                    .hidden(),
            );
        }

        let scene = HeadlessScene::new();
        scene.add_root(window);
        let engine = customize(HeadlessEngine::new(scene));
        let log = engine.robot_log().clone();
        let desktop = Desktop::headless(engine).expect("Failed to start headless desktop");

        FormFixture {
            desktop,
            log,
            name_field,
            save,
            status,
        }
    }
}
