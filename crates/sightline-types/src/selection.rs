use serde::{Deserialize, Serialize};

/// Host element reference. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub path: String,
    pub urn: String,
}

/// A selection split by the host into volume-capable and area-capable elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSelection {
    pub volume_elements: Vec<ElementRef>,
    pub area_elements: Vec<ElementRef>,
}

impl ElementSelection {
    pub fn len(&self) -> usize {
        self.volume_elements.len() + self.area_elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A selected path together with the host's category for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedPath {
    pub path: String,
    pub category: Option<String>,
}

/// Replace floor paths with their parent path and drop duplicates,
/// keeping first-occurrence order.
pub fn scene_paths(paths: &[CategorizedPath]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(paths.len());
    for entry in paths {
        let path = if entry.category.as_deref() == Some("floor") {
            match entry.path.rsplit_once('/') {
                Some((parent, _)) => parent.to_string(),
                None => String::new(),
            }
        } else {
            entry.path.clone()
        };
        if !out.contains(&path) {
            out.push(path);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp(path: &str, category: Option<&str>) -> CategorizedPath {
        CategorizedPath {
            path: path.to_string(),
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn test_floors_collapse_to_parent() {
        let paths = vec![
            cp("root/building/floor1", Some("floor")),
            cp("root/building/floor2", Some("floor")),
            cp("root/tree", Some("vegetation")),
            cp("root/building", None),
        ];
        assert_eq!(scene_paths(&paths), vec!["root/building", "root/tree"]);
    }

    #[test]
    fn test_selection_len() {
        let sel = ElementSelection {
            volume_elements: vec![ElementRef {
                path: "root/a".into(),
                urn: "urn:a".into(),
            }],
            area_elements: Vec::new(),
        };
        assert_eq!(sel.len(), 1);
        assert!(!sel.is_empty());
        assert!(ElementSelection::default().is_empty());
    }
}
