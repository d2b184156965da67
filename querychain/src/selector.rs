use crate::element::UIElement;
use crate::errors::AutomationError;
use crate::matchers::{Matcher, Predicate};
use std::fmt;
use std::sync::Arc;

/// Describes which UI element(s) a chain targets
#[derive(Clone)]
pub enum Selector {
    /// Textual path expression, e.g. `"role:button|OK"` or `"#submit"`
    Query(String),
    /// Structural matcher over elements
    Matcher(Arc<dyn Matcher<UIElement>>),
    /// Boolean predicate over elements
    Predicate(Predicate<UIElement>),
}

impl Selector {
    pub fn query(query: impl Into<String>) -> Self {
        Selector::Query(query.into())
    }

    pub fn matcher(matcher: impl Matcher<UIElement> + 'static) -> Self {
        Selector::Matcher(Arc::new(matcher))
    }

    pub fn predicate(predicate: impl Fn(&UIElement) -> bool + Send + Sync + 'static) -> Self {
        Selector::Predicate(Arc::new(predicate))
    }

    /// Human-readable label used in resolution errors.
    pub fn describe(&self) -> String {
        match self {
            Selector::Query(query) => format!("the query \"{query}\""),
            Selector::Matcher(matcher) => format!("the matcher \"{}\"", matcher.describe()),
            Selector::Predicate(_) => "the predicate".to_string(),
        }
    }

    /// Call-boundary validation; runs before any lookup or UI-thread work.
    pub fn validate(&self) -> Result<(), AutomationError> {
        match self {
            Selector::Query(query) if query.trim().is_empty() => Err(
                AutomationError::invalid_argument("query", "must not be empty"),
            ),
            Selector::Query(query) => match TextSelector::from(query.as_str()).invalid_reason() {
                Some(reason) => Err(AutomationError::invalid_argument(
                    "query",
                    &format!("is not a valid selector: {reason}"),
                )),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Query(query) => f.debug_tuple("Query").field(query).finish(),
            Selector::Matcher(matcher) => {
                f.debug_tuple("Matcher").field(&matcher.describe()).finish()
            }
            Selector::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

impl From<&str> for Selector {
    fn from(query: &str) -> Self {
        Selector::Query(query.to_string())
    }
}

impl From<String> for Selector {
    fn from(query: String) -> Self {
        Selector::Query(query)
    }
}

impl From<&String> for Selector {
    fn from(query: &String) -> Self {
        Selector::Query(query.clone())
    }
}

/// Parsed textual selector grammar
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextSelector {
    /// Select by role and optional name
    Role { role: String, name: Option<String> },
    /// Select by element ID
    Id(String),
    /// Select by name/label
    Name(String),
    /// Select by text content
    Text(String),
    /// Select by class name
    ClassName(String),
    /// Filter by visibility on screen
    Visible(bool),
    /// Select the n-th element from the matches; negative counts from the end
    Nth(i32),
    /// Each step searches below the matches of the previous one
    Chain(Vec<TextSelector>),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

impl TextSelector {
    /// First parse error found in this selector or any of its chain steps.
    pub fn invalid_reason(&self) -> Option<&str> {
        match self {
            TextSelector::Invalid(reason) => Some(reason.as_str()),
            TextSelector::Chain(steps) => steps.iter().find_map(|s| s.invalid_reason()),
            _ => None,
        }
    }

    /// Tests a single element against a non-structural selector.
    ///
    /// `Nth` and `Chain` depend on the whole match set and never match a lone element.
    pub fn matches_element(&self, element: &UIElement) -> bool {
        match self {
            TextSelector::Role { role, name } => {
                element.role().eq_ignore_ascii_case(role)
                    && name
                        .as_ref()
                        .map_or(true, |n| element.name().as_deref() == Some(n.as_str()))
            }
            TextSelector::Id(id) => element.id().as_deref() == Some(id.as_str()),
            TextSelector::Name(name) => element.name().as_deref() == Some(name.as_str()),
            TextSelector::Text(text) => element.text().as_deref() == Some(text.as_str()),
            TextSelector::ClassName(class) => element
                .class_name()
                .is_some_and(|c| c.split_whitespace().any(|part| part == class)),
            TextSelector::Visible(visible) => element.is_visible().unwrap_or(false) == *visible,
            TextSelector::Nth(_) | TextSelector::Chain(_) | TextSelector::Invalid(_) => false,
        }
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s.is_char_boundary(prefix.len()) {
        let (head, tail) = s.split_at(prefix.len());
        if head.eq_ignore_ascii_case(prefix) {
            return Some(tail);
        }
    }
    None
}

impl From<&str> for TextSelector {
    fn from(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return TextSelector::Invalid("empty selector".to_string());
        }

        // Handle chained selectors first
        let parts: Vec<&str> = s.split(">>").map(|p| p.trim()).collect();
        if parts.len() > 1 {
            return TextSelector::Chain(parts.into_iter().map(TextSelector::from).collect());
        }

        // role|name is the precise form
        if let Some((role_part, name_part)) = s.split_once('|') {
            let role_part = role_part.trim();
            let name_part = name_part.trim();
            let role = strip_prefix_ignore_case(role_part, "role:").unwrap_or(role_part);
            let name = strip_prefix_ignore_case(name_part, "name:").unwrap_or(name_part);
            return TextSelector::Role {
                role: role.to_string(),
                name: Some(name.to_string()),
            };
        }

        if let Some(role) = strip_prefix_ignore_case(s, "role:") {
            return TextSelector::Role {
                role: role.to_string(),
                name: None,
            };
        }
        if let Some(name) = strip_prefix_ignore_case(s, "name:") {
            return TextSelector::Name(name.to_string());
        }
        if let Some(text) = strip_prefix_ignore_case(s, "text:") {
            return TextSelector::Text(text.to_string());
        }
        if let Some(id) = strip_prefix_ignore_case(s, "id:") {
            return TextSelector::Id(id.to_string());
        }
        if let Some(class) = strip_prefix_ignore_case(s, "classname:") {
            return TextSelector::ClassName(class.trim().to_string());
        }
        if let Some(value) = strip_prefix_ignore_case(s, "visible:") {
            return TextSelector::Visible(value.trim().eq_ignore_ascii_case("true"));
        }
        if let Some(index_str) =
            strip_prefix_ignore_case(s, "nth=").or_else(|| strip_prefix_ignore_case(s, "nth:"))
        {
            return match index_str.trim().parse::<i32>() {
                Ok(index) => TextSelector::Nth(index),
                Err(_) => {
                    TextSelector::Invalid(format!("Invalid index for nth selector: '{index_str}'"))
                }
            };
        }
        if let Some(id) = s.strip_prefix('#') {
            return TextSelector::Id(id.to_string());
        }
        if let Some(class) = s.strip_prefix('.') {
            return TextSelector::ClassName(class.to_string());
        }

        match s.to_ascii_lowercase().as_str() {
            "app" | "application" | "window" | "button" | "checkbox" | "menu" | "menuitem"
            | "menubar" | "textfield" | "label" | "list" | "listitem" => TextSelector::Role {
                role: s.to_string(),
                name: None,
            },
            _ if s.contains(':') => {
                let (role, name) = s.split_once(':').unwrap_or((s, ""));
                TextSelector::Role {
                    role: role.to_string(),
                    name: Some(name.to_string()),
                }
            }
            _ => TextSelector::Invalid(format!(
                "Unknown selector format: \"{s}\". Use prefixes like 'role:', 'name:', 'id:', 'text:', 'classname:', '#' or '.' to specify the selector type."
            )),
        }
    }
}
