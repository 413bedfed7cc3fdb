use serde::{Deserialize, Serialize};

/// Opaque platform identifier for a live node. Only meaningful to the
/// platform that produced the snapshot containing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeHandle(pub u64);

/// Screen bounds in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// One element of a tree snapshot.
///
/// Serializes to the shape the bridge exposes from `findElements`; the
/// handle and the extra capability flags stay internal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(skip_serializing)]
    pub handle: NodeHandle,
    pub id: String,
    pub text: String,
    pub content_description: String,
    pub class_name: String,
    pub package_name: String,
    pub bounds: Bounds,
    pub visible: bool,
    pub enabled: bool,
    pub clickable: bool,
    #[serde(skip_serializing)]
    pub editable: bool,
    #[serde(skip_serializing)]
    pub scrollable: bool,
    #[serde(skip_serializing)]
    pub focusable: bool,
}

impl Element {
    /// First non-empty of text, content description, identifier, class.
    pub fn label(&self) -> &str {
        [&self.text, &self.content_description, &self.id, &self.class_name]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Summary of the active window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    pub package_name: String,
    pub activity_name: String,
    pub element_count: usize,
    pub windows_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_geometry() {
        let b = Bounds::new(10, 20, 110, 70);
        assert_eq!(b.width(), 100);
        assert_eq!(b.height(), 50);
        assert_eq!(b.center(), (60, 45));
        assert!(!b.is_empty());
        assert!(Bounds::new(5, 5, 5, 40).is_empty());
    }

    #[test]
    fn element_json_matches_bridge_shape() {
        let element = Element {
            handle: NodeHandle(7),
            id: "com.mail:id/send".into(),
            text: "Send".into(),
            class_name: "android.widget.Button".into(),
            package_name: "com.mail".into(),
            bounds: Bounds::new(0, 0, 100, 40),
            visible: true,
            enabled: true,
            clickable: true,
            editable: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["contentDescription"], "");
        assert_eq!(json["bounds"]["right"], 100);
        assert_eq!(json["clickable"], true);
        assert!(json.get("handle").is_none());
        assert!(json.get("editable").is_none());
    }

    #[test]
    fn label_falls_back_through_attributes() {
        let element = Element {
            content_description: "Compose".into(),
            class_name: "android.widget.ImageButton".into(),
            ..Default::default()
        };
        assert_eq!(element.label(), "Compose");
        assert_eq!(Element::default().label(), "");
    }
}
