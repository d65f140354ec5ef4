use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of subject a detection box was produced for.
///
/// Detector labels outside the known set are kept verbatim in `Other` so a
/// configuration can still opt into them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubjectClass {
    Person,
    Dog,
    Cat,
    Other(String),
}

impl SubjectClass {
    /// Default set of classes the detection loop tracks.
    pub fn defaults() -> Vec<SubjectClass> {
        vec![SubjectClass::Person, SubjectClass::Dog, SubjectClass::Cat]
    }

    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "person" => SubjectClass::Person,
            "dog" => SubjectClass::Dog,
            "cat" => SubjectClass::Cat,
            _ => SubjectClass::Other(label),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SubjectClass::Person => "person",
            SubjectClass::Dog => "dog",
            SubjectClass::Cat => "cat",
            SubjectClass::Other(label) => label,
        }
    }

    /// Label shown next to a tracked box: people are framed as "Face".
    pub fn display_label(&self) -> String {
        match self {
            SubjectClass::Person => "Face".to_string(),
            other => {
                let label = other.label();
                let mut chars = label.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

impl From<String> for SubjectClass {
    fn from(label: String) -> Self {
        SubjectClass::from_label(&label)
    }
}

impl From<SubjectClass> for String {
    fn from(class: SubjectClass) -> Self {
        class.label().to_string()
    }
}

impl fmt::Display for SubjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
