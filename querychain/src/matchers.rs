//! Structural matchers and conditions
//!
//! A [`Matcher`] is a self-describing test over a value; a predicate is a bare
//! closure. [`Condition`] carries either one so waits and verifications can accept
//! both without caring which kind the caller handed over.

use crate::element::UIElement;
use std::fmt::Debug;
use std::sync::Arc;

/// A self-describing test over a value
pub trait Matcher<T: ?Sized>: Send + Sync {
    fn matches(&self, item: &T) -> bool;

    /// Description used in selector labels and assertion messages.
    fn describe(&self) -> String;
}

/// A closure-backed predicate
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Either a matcher or a predicate
pub enum Condition<T: ?Sized> {
    Matcher(Arc<dyn Matcher<T>>),
    Predicate(Predicate<T>),
}

impl<T: ?Sized> Clone for Condition<T> {
    fn clone(&self) -> Self {
        match self {
            Condition::Matcher(m) => Condition::Matcher(m.clone()),
            Condition::Predicate(p) => Condition::Predicate(p.clone()),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Condition").field(&self.describe()).finish()
    }
}

impl<T: ?Sized + 'static> Condition<T> {
    pub fn matcher(matcher: impl Matcher<T> + 'static) -> Self {
        Condition::Matcher(Arc::new(matcher))
    }

    pub fn predicate(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Condition::Predicate(Arc::new(predicate))
    }
}

impl<T: ?Sized> Condition<T> {
    pub fn test(&self, item: &T) -> bool {
        match self {
            Condition::Matcher(m) => m.matches(item),
            Condition::Predicate(p) => p(item),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Condition::Matcher(m) => m.describe(),
            Condition::Predicate(_) => "a predicate".to_string(),
        }
    }
}

/// Matcher built from a closure and a fixed description
pub struct FnMatcher<F> {
    func: F,
    description: String,
}

impl<F> std::fmt::Debug for FnMatcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMatcher")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized, F> Matcher<T> for FnMatcher<F>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn matches(&self, item: &T) -> bool {
        (self.func)(item)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Wraps a closure as a matcher with the given description.
pub fn matcher_fn<F>(description: impl Into<String>, func: F) -> FnMatcher<F> {
    FnMatcher {
        func,
        description: description.into(),
    }
}

/// Matches values equal to `expected`.
pub fn equal_to<T>(expected: T) -> EqualTo<T>
where
    T: PartialEq + Debug + Send + Sync,
{
    EqualTo(expected)
}

#[derive(Debug, Clone)]
pub struct EqualTo<T>(T);

impl<T: PartialEq + Debug + Send + Sync> Matcher<T> for EqualTo<T> {
    fn matches(&self, item: &T) -> bool {
        *item == self.0
    }

    fn describe(&self) -> String {
        format!("{:?}", self.0)
    }
}

/// Inverts another matcher.
pub fn not<M>(inner: M) -> Not<M> {
    Not(inner)
}

#[derive(Debug, Clone)]
pub struct Not<M>(M);

impl<T: ?Sized, M: Matcher<T>> Matcher<T> for Not<M> {
    fn matches(&self, item: &T) -> bool {
        !self.0.matches(item)
    }

    fn describe(&self) -> String {
        format!("not {}", self.0.describe())
    }
}

// Element matchers

#[derive(Debug, Clone)]
enum ElementField {
    Text,
    Name,
    Role,
    Id,
}

/// Matches elements whose text, name, role or id equals a fixed string
#[derive(Debug, Clone)]
pub struct AttributeMatcher {
    field: ElementField,
    expected: String,
}

impl Matcher<UIElement> for AttributeMatcher {
    fn matches(&self, element: &UIElement) -> bool {
        let actual = match self.field {
            ElementField::Text => element.text(),
            ElementField::Name => element.name(),
            ElementField::Role => Some(element.role()),
            ElementField::Id => element.id(),
        };
        match self.field {
            ElementField::Role => actual.is_some_and(|r| r.eq_ignore_ascii_case(&self.expected)),
            _ => actual.as_deref() == Some(self.expected.as_str()),
        }
    }

    fn describe(&self) -> String {
        let field = match self.field {
            ElementField::Text => "text",
            ElementField::Name => "name",
            ElementField::Role => "role",
            ElementField::Id => "id",
        };
        format!("has {field} \"{}\"", self.expected)
    }
}

pub fn has_text(text: impl Into<String>) -> AttributeMatcher {
    AttributeMatcher {
        field: ElementField::Text,
        expected: text.into(),
    }
}

pub fn has_name(name: impl Into<String>) -> AttributeMatcher {
    AttributeMatcher {
        field: ElementField::Name,
        expected: name.into(),
    }
}

pub fn has_role(role: impl Into<String>) -> AttributeMatcher {
    AttributeMatcher {
        field: ElementField::Role,
        expected: role.into(),
    }
}

pub fn has_id(id: impl Into<String>) -> AttributeMatcher {
    AttributeMatcher {
        field: ElementField::Id,
        expected: id.into(),
    }
}

/// Matches elements that are currently rendered. Backend errors count as not visible.
#[derive(Debug, Clone, Copy)]
pub struct IsVisible;

impl Matcher<UIElement> for IsVisible {
    fn matches(&self, element: &UIElement) -> bool {
        element.is_visible().unwrap_or(false)
    }

    fn describe(&self) -> String {
        "is visible".to_string()
    }
}

pub fn is_visible() -> IsVisible {
    IsVisible
}

#[derive(Debug, Clone, Copy)]
pub struct IsEnabled;

impl Matcher<UIElement> for IsEnabled {
    fn matches(&self, element: &UIElement) -> bool {
        element.is_enabled().unwrap_or(false)
    }

    fn describe(&self) -> String {
        "is enabled".to_string()
    }
}

pub fn is_enabled() -> IsEnabled {
    IsEnabled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_describes_its_kind() {
        let by_matcher: Condition<i32> = Condition::matcher(equal_to(3));
        let by_predicate: Condition<i32> = Condition::predicate(|v| *v > 2);

        assert_eq!(by_matcher.describe(), "3");
        assert_eq!(by_predicate.describe(), "a predicate");
        assert!(by_matcher.test(&3));
        assert!(!by_matcher.test(&4));
        assert!(by_predicate.test(&4));
    }

    #[test]
    fn test_not_inverts_and_describes() {
        let m = not(equal_to("a".to_string()));
        assert!(m.matches(&"b".to_string()));
        assert!(!m.matches(&"a".to_string()));
        assert_eq!(m.describe(), "not \"a\"");
    }

    #[test]
    fn test_matcher_fn_keeps_description() {
        let m = matcher_fn("is even", |v: &u32| v % 2 == 0);
        assert!(m.matches(&10));
        assert_eq!(Matcher::<u32>::describe(&m), "is even");
    }
}
