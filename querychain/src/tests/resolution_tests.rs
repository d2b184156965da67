//! Position resolution: existence first, then visibility

use super::FormFixture;
use crate::matchers::has_text;
use crate::platforms::headless::RobotEvent;
use crate::{AutomationError, MouseButton, Point, Selector, Target};

#[test]
fn test_no_match_names_the_selector() {
    let fixture = FormFixture::new();

    let err = fixture.desktop.select("#missing").click(&[]).unwrap_err();
    assert!(
        matches!(err, AutomationError::NoMatchingElement { .. }),
        "{err:?}"
    );
    assert_eq!(err.to_string(), "the query \"#missing\" returned no nodes.");

    let err = fixture
        .desktop
        .select(Selector::matcher(has_text("nowhere")))
        .drag(&[])
        .unwrap_err();
    assert!(err.to_string().contains("the matcher \"has text \"nowhere\"\""));

    let err = fixture
        .desktop
        .select(Selector::predicate(|_| false))
        .right_click()
        .unwrap_err();
    assert!(err.to_string().starts_with("the predicate returned no nodes"));

    assert!(fixture.log.events().is_empty(), "no input may be sent");
}

#[test]
fn test_hidden_matches_are_counted() {
    let fixture = FormFixture::new();

    let err = fixture.desktop.select(".ghost").double_click(&[]).unwrap_err();
    match &err {
        AutomationError::NoVisibleElement { count, .. } => assert_eq!(*count, 3),
        other => panic!("Expected NoVisibleElement, got {other:?}"),
    }
    assert!(err.to_string().contains("3 nodes"), "{err}");
    assert!(fixture.log.events().is_empty());
}

#[test]
fn test_visible_match_resolves_to_its_point() {
    let fixture = FormFixture::new();
    let chain = fixture.desktop.select("#save");

    let expected = chain
        .driver()
        .unwrap()
        .point(&Target::from(chain.node().unwrap()))
        .unwrap();
    assert_eq!(expected, Point::new(50.0, 65.0));

    chain.click(&[]).unwrap();
    assert_eq!(
        fixture.log.events(),
        vec![
            RobotEvent::PointerMoved(expected),
            RobotEvent::ButtonPressed(MouseButton::Primary),
            RobotEvent::ButtonReleased(MouseButton::Primary),
        ]
    );
}

#[test]
fn test_hidden_siblings_do_not_block_the_visible_one() {
    let fixture = FormFixture::new();

    fixture
        .desktop
        .select("role:button")
        .move_to_match("role:button")
        .unwrap();
    assert_eq!(
        fixture.log.events(),
        vec![RobotEvent::PointerMoved(Point::new(50.0, 65.0))]
    );
}

#[test]
fn test_drop_to_match_uses_the_same_resolution() {
    let fixture = FormFixture::new();
    let chain = fixture.desktop.select("#name");

    let err = chain.drop_to_match(".ghost").unwrap_err();
    assert!(matches!(err, AutomationError::NoVisibleElement { count: 3, .. }));

    fixture.log.clear();
    chain.drag(&[]).unwrap().drop_to_match("#status").unwrap();
    assert_eq!(
        fixture.log.events(),
        vec![
            RobotEvent::PointerMoved(Point::new(110.0, 22.0)),
            RobotEvent::ButtonPressed(MouseButton::Primary),
            RobotEvent::PointerMoved(Point::new(110.0, 110.0)),
            RobotEvent::ButtonReleased(MouseButton::Primary),
        ]
    );
}

#[test]
fn test_node_requires_exactly_one_match() {
    let fixture = FormFixture::new();

    assert!(matches!(
        fixture.desktop.select("role:button").node(),
        Err(AutomationError::AmbiguousMatch { count: 4, .. })
    ));
    assert_eq!(fixture.desktop.select("role:button").nodes().unwrap().len(), 4);
    assert_eq!(
        fixture.desktop.select("#status").node().unwrap().text().as_deref(),
        Some("idle")
    );
}

#[test]
fn test_bad_queries_are_rejected_before_any_input() {
    let fixture = FormFixture::new();

    for query in ["", "   ", "no such format"] {
        match fixture.desktop.select(query).click(&[]) {
            Err(AutomationError::InvalidArgument(msg)) => {
                assert!(msg.contains("'query'"), "{msg}")
            }
            other => panic!("Expected InvalidArgument for {query:?}, got {other:?}"),
        }
    }
    assert!(fixture.log.events().is_empty());
}

#[test]
fn test_selecting_from_a_chain_keeps_the_desktop() {
    let fixture = FormFixture::new();
    let first = fixture.desktop.select("#name");
    let second = first.select("#save");

    assert_eq!(second.description(), "the query \"#save\"");
    assert_eq!(first.description(), "the query \"#name\"");
    assert!(std::rc::Rc::ptr_eq(
        &first.driver().unwrap(),
        &second.driver().unwrap()
    ));
}
