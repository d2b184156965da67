use super::FormFixture;
use crate::matchers::has_text;
use crate::{cached_driver_count, AutomationError, ChainConfig, Condition, Key, MouseButton};
use std::cell::RefCell;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct SignalOnExit(mpsc::Sender<()>);

impl Drop for SignalOnExit {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

thread_local! {
    static EXIT_SIGNAL: RefCell<Option<SignalOnExit>> = const { RefCell::new(None) };
}

#[test]
fn test_dropping_the_desktop_stops_its_ui_loop() {
    let fixture = FormFixture::new();
    let (tx, rx) = mpsc::channel();
    let chain = fixture.desktop.select("#save");

    chain.click(&[]).unwrap();
    chain
        .interact(move || EXIT_SIGNAL.with(|signal| *signal.borrow_mut() = Some(SignalOnExit(tx))))
        .unwrap();
    let ui = Arc::downgrade(fixture.desktop.ui());

    drop(chain);
    drop(fixture);

    assert!(ui.upgrade().is_none());
    rx.recv_timeout(Duration::from_secs(5))
        .expect("UI thread kept running after its desktop was dropped");
}

#[test]
fn test_driver_cache_does_not_outlive_desktops() {
    for _ in 0..20 {
        let fixture = FormFixture::new();
        fixture.desktop.select("#save").click(&[]).unwrap();
        assert_eq!(cached_driver_count(), 1);
    }
    assert_eq!(cached_driver_count(), 0);

    let mut desktop = FormFixture::new().desktop;
    for _ in 0..5 {
        desktop = desktop.with_config(ChainConfig::default().with_settle_after_input(false));
        desktop.select("#save").click(&[MouseButton::Primary]).unwrap();
        assert_eq!(cached_driver_count(), 1);
    }
}

#[test]
fn test_driver_held_past_its_desktop_reports_shutdown() {
    let fixture = FormFixture::new();
    let driver = fixture.desktop.driver().unwrap();
    assert!(driver.is_attached());

    drop(fixture);

    assert!(!driver.is_attached());
    assert!(matches!(driver.ui(), Err(AutomationError::Internal(_))));
    assert!(matches!(
        driver.run_on_ui(|| ()),
        Err(AutomationError::Internal(_))
    ));
}

#[test]
fn test_drivers_cached_on_other_threads_do_not_keep_the_loop_alive() {
    let fixture = FormFixture::new();
    let desktop = fixture.desktop.clone();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let (ready_tx, ready_rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        desktop.select("#name").press_keys(&[Key::Shift]).unwrap();
        let driver = desktop.driver().unwrap();
        drop(desktop);
        ready_tx.send(()).unwrap();
        let _ = done_rx.recv();
        driver.is_attached()
    });

    ready_rx.recv().unwrap();
    let ui = Arc::downgrade(fixture.desktop.ui());
    drop(fixture);
    assert!(ui.upgrade().is_none());

    drop(done_tx);
    assert!(!worker.join().unwrap());
}

#[tokio::test]
async fn test_chain_inside_a_current_thread_runtime() {
    let fixture = FormFixture::new();
    let status = fixture.status.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        status.set_text("ready");
    });

    fixture
        .desktop
        .select("#status")
        .click(&[])
        .unwrap()
        .wait_until(&Condition::matcher(has_text("ready")), 5)
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_chain_inside_a_multi_thread_runtime() {
    let fixture = FormFixture::with_engine(|engine| engine.with_ui_bound_robot());
    let status = fixture.status.clone();

    fixture
        .desktop
        .select("#status")
        .click(&[])
        .unwrap()
        .interact(move || status.set_text("ready"))
        .unwrap()
        .wait_until(&Condition::matcher(has_text("ready")), 1)
        .unwrap();

    let err = fixture
        .desktop
        .select("#status")
        .wait_until(&Condition::matcher(has_text("never")), 1)
        .unwrap_err();
    assert!(matches!(err.condition_cause(), Some(AutomationError::Timeout(_))), "{err:?}");
}
