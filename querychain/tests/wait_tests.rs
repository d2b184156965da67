use anyhow::Result;
use querychain::matchers::{equal_to, has_text, matcher_fn};
use querychain::platforms::headless::{HeadlessElement, HeadlessEngine, HeadlessScene};
use querychain::{AutomationError, Condition, Desktop, UIElement};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn page() -> Result<(Desktop, HeadlessElement)> {
    let body = HeadlessElement::new("pane")
        .with_id("body")
        .with_child(HeadlessElement::new("label").with_id("status").with_text("loading"))
        .with_child(HeadlessElement::new("button").with_name("One"))
        .with_child(HeadlessElement::new("button").with_name("Two"));
    let scene = HeadlessScene::new();
    scene.add_root(body.clone());
    Ok((Desktop::headless(HeadlessEngine::new(scene))?, body))
}

fn set_status_later(desktop: &Desktop, text: &'static str, delay: Duration) {
    let status = desktop
        .select("#status")
        .node()
        .ok()
        .and_then(|node| node.downcast_ref::<HeadlessElement>().cloned());
    thread::spawn(move || {
        thread::sleep(delay);
        if let Some(status) = status {
            status.set_text(text);
        }
    });
}

#[test]
fn test_wait_returns_once_the_node_matches() -> Result<()> {
    let (desktop, _) = page()?;
    set_status_later(&desktop, "ready", Duration::from_millis(300));

    let start = Instant::now();
    desktop
        .select("#status")
        .wait_until(&Condition::matcher(has_text("ready")), 5)?
        .verify_that(&Condition::matcher(has_text("ready")))?;

    assert!(start.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[test]
fn test_wait_keeps_polling_until_the_node_appears() -> Result<()> {
    let (desktop, body) = page()?;
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        body.add_child(HeadlessElement::new("label").with_id("toast").with_text("saved"));
    });

    let shown = Condition::predicate(|e: &UIElement| e.is_visible().unwrap_or(false));
    desktop.select("#toast").wait_until(&shown, 5)?;
    Ok(())
}

#[test]
fn test_wait_times_out_with_message_and_cause() -> Result<()> {
    let (desktop, _) = page()?;
    let start = Instant::now();

    let err = desktop
        .select("#status")
        .wait_until_with_message(
            "status never became ready",
            &Condition::matcher(has_text("ready")),
            1,
        )
        .unwrap_err();

    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(err.to_string(), "status never became ready");
    match err {
        AutomationError::ConditionTimeout { message, cause } => {
            assert_eq!(message.as_deref(), Some("status never became ready"));
            assert!(matches!(*cause, AutomationError::Timeout(_)), "{cause:?}");
        }
        other => panic!("Expected ConditionTimeout, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_failing_lookup_ends_the_wait_at_once() -> Result<()> {
    let (desktop, _) = page()?;
    let start = Instant::now();

    let err = desktop
        .select("role:button")
        .wait_until(&Condition::matcher(has_text("never")), 10)
        .unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(
        matches!(
            err.condition_cause(),
            Some(AutomationError::AmbiguousMatch { count: 2, .. })
        ),
        "{err:?}"
    );
    Ok(())
}

#[test]
fn test_raising_condition_is_wrapped_not_retried() -> Result<()> {
    let (desktop, _) = page()?;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let start = Instant::now();

    let err = desktop
        .select("#status")
        .wait_until(
            &Condition::predicate(move |_: &UIElement| {
                counter.fetch_add(1, Ordering::SeqCst);
                panic!("condition exploded")
            }),
            10,
        )
        .unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match err.condition_cause() {
        Some(AutomationError::Internal(msg)) => assert!(msg.contains("condition exploded")),
        other => panic!("Expected Internal cause, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_invalid_query_is_rejected_before_waiting() -> Result<()> {
    let (desktop, _) = page()?;

    let err = desktop
        .select("")
        .wait_until(&Condition::matcher(has_text("x")), 5)
        .unwrap_err();

    assert!(matches!(err, AutomationError::InvalidArgument(_)), "{err:?}");
    Ok(())
}

#[test]
fn test_value_and_computed_waits() -> Result<()> {
    let (desktop, _) = page()?;
    let chain = desktop.select("#status");

    chain.wait_until_value(42, &Condition::matcher(equal_to(42)), 1)?;

    let err = chain
        .wait_until_value_with_message("wrong answer", 41, &Condition::matcher(equal_to(42)), 1)
        .unwrap_err();
    assert_eq!(err.to_string(), "wrong answer");

    let ticks = Arc::new(AtomicUsize::new(0));
    let source = ticks.clone();
    chain.wait_until_computed(
        move || source.fetch_add(1, Ordering::SeqCst),
        &Condition::matcher(matcher_fn("at least 3", |n: &usize| *n >= 3)),
        5,
    )?;
    assert!(ticks.load(Ordering::SeqCst) >= 4);

    let err = chain
        .wait_until_computed_with_message(
            "never odd",
            || 2,
            &Condition::predicate(|n: &i32| n % 2 == 1),
            1,
        )
        .unwrap_err();
    assert!(matches!(
        err.condition_cause(),
        Some(AutomationError::Timeout(_))
    ));
    Ok(())
}
