//! Tool selection and pointer routing

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controllers::ResizeHandle;
use crate::overlay::ElementId;

/// Annotation tool currently selected in the toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Select,
    TextBox,
    Redact,
    Highlight,
    Checkbox,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Select,
        Tool::TextBox,
        Tool::Redact,
        Tool::Highlight,
        Tool::Checkbox,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Select => "select",
            Tool::TextBox => "textbox",
            Tool::Redact => "redact",
            Tool::Highlight => "highlight",
            Tool::Checkbox => "checkbox",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tool '{0}'")]
pub struct UnknownTool(pub String);

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "select" => Ok(Tool::Select),
            "textbox" | "text" => Ok(Tool::TextBox),
            "redact" | "whiteout" => Ok(Tool::Redact),
            "highlight" => Ok(Tool::Highlight),
            "checkbox" => Ok(Tool::Checkbox),
            other => Err(UnknownTool(other.to_string())),
        }
    }
}

/// What the pointer landed on, as hit-tested by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty page area
    Page,
    /// Body of an overlay element
    Element(ElementId),
    /// One of the eight resize handles of an element
    Handle(ElementId, ResizeHandle),
}

/// Gesture a pointer-down starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Draw,
    Move(ElementId),
    Resize(ElementId, ResizeHandle),
    PlaceCheckbox,
    Deselect,
}

/// Map a pointer-down to a gesture. Element targets take precedence over the
/// active tool.
pub fn route(tool: Tool, target: PointerTarget) -> Route {
    match target {
        PointerTarget::Handle(element, handle) => Route::Resize(element, handle),
        PointerTarget::Element(element) => Route::Move(element),
        PointerTarget::Page => match tool {
            Tool::Select => Route::Deselect,
            Tool::Checkbox => Route::PlaceCheckbox,
            Tool::TextBox | Tool::Redact | Tool::Highlight => Route::Draw,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tool_names() {
        assert_eq!("redact".parse::<Tool>().unwrap(), Tool::Redact);
        assert_eq!(" TextBox ".parse::<Tool>().unwrap(), Tool::TextBox);
        let err = "Lasso".parse::<Tool>().unwrap_err();
        assert_eq!(err.to_string(), "unknown tool 'lasso'");
        for tool in Tool::ALL {
            assert_eq!(tool.as_str().parse::<Tool>().unwrap(), tool);
        }
    }

    #[test]
    fn test_route_by_target() {
        let el = ElementId(3);
        assert_eq!(route(Tool::Redact, PointerTarget::Element(el)), Route::Move(el));
        assert_eq!(
            route(Tool::Select, PointerTarget::Handle(el, ResizeHandle::East)),
            Route::Resize(el, ResizeHandle::East)
        );
        assert_eq!(route(Tool::Highlight, PointerTarget::Page), Route::Draw);
        assert_eq!(route(Tool::Checkbox, PointerTarget::Page), Route::PlaceCheckbox);
        assert_eq!(route(Tool::Select, PointerTarget::Page), Route::Deselect);
    }

    #[test]
    fn test_tool_serde_uses_lowercase() {
        assert_eq!(serde_json::to_string(&Tool::TextBox).unwrap(), "\"textbox\"");
    }
}
