use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::tree::types::Element;

/// Element selector.
///
/// Grammar: `text:<s>`, `id:<s>`, `class:<s>`, or a bare `<s>` which
/// behaves like `text:<s>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Case-insensitive substring of text or content description.
    Text(String),
    /// Case-sensitive substring of the resource identifier.
    Id(String),
    /// Case-insensitive substring of the class name.
    Class(String),
}

impl Selector {
    pub fn parse(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("text:") {
            Selector::Text(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("id:") {
            Selector::Id(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("class:") {
            Selector::Class(rest.to_string())
        } else {
            Selector::Text(raw.to_string())
        }
    }

    pub fn needle(&self) -> &str {
        match self {
            Selector::Text(s) | Selector::Id(s) | Selector::Class(s) => s,
        }
    }

    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Selector::Text(s) => {
                contains_ignore_case(&element.text, s)
                    || contains_ignore_case(&element.content_description, s)
            }
            Selector::Id(s) => element.id.contains(s.as_str()),
            Selector::Class(s) => contains_ignore_case(&element.class_name, s),
        }
    }
}

impl FromStr for Selector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Selector::parse(s))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Text(s) => write!(f, "text:{s}"),
            Selector::Id(s) => write!(f, "id:{s}"),
            Selector::Class(s) => write!(f, "class:{s}"),
        }
    }
}

/// Matches a raw selector string against an element. A missing element
/// never matches.
pub fn matches(element: Option<&Element>, selector: &str) -> bool {
    element.is_some_and(|e| Selector::parse(selector).matches(e))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
