use serde::{Deserialize, Serialize};

/// Type and constraints of a collection field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        only_int: bool,
    },
    Bool,
    Email,
    Url,
    Date,
    Json,
    Select {
        values: Vec<String>,
        max_select: usize,
    },
    Relation {
        collection: String,
        max_select: usize,
    },
    File {
        max_select: usize,
    },
}

/// A named field in a collection schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number { min: None, only_int: false })
    }

    /// Non-negative integer (stock counters, thresholds).
    pub fn count(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number { min: Some(0.0), only_int: true })
    }

    /// Non-negative decimal (money amounts).
    pub fn amount(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number { min: Some(0.0), only_int: false })
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Email)
    }

    pub fn url(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Url)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    /// Single-choice select.
    pub fn select(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(
            name,
            FieldKind::Select {
                values: values.iter().map(|v| v.to_string()).collect(),
                max_select: 1,
            },
        )
    }

    pub fn relation(name: impl Into<String>, collection: impl Into<String>, max_select: usize) -> Self {
        Self::new(
            name,
            FieldKind::Relation {
                collection: collection.into(),
                max_select,
            },
        )
    }

    pub fn file(name: impl Into<String>, max_select: usize) -> Self {
        Self::new(name, FieldKind::File { max_select })
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}
