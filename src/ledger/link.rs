use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ledger::meta::Meta;

const CANONICAL_FIELDS: [&str; 3] = ["type", "id", "detail"];

/// Ownership-free reference to another entity (population role, building,
/// resource, stat, phase, action, ...).
///
/// Two links are the same link when `(type, id, detail)` match; `extra` is
/// carried along but never compared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

impl Link {
    pub fn new(link_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            link_type: Some(link_type.into()),
            id: Some(id.into()),
            detail: None,
            extra: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Trim the canonical fields and drop the empty ones. Returns `None` when
    /// nothing canonical is left.
    pub fn normalized(self) -> Option<Self> {
        let link = Self {
            link_type: trimmed(self.link_type),
            id: trimmed(self.id),
            detail: trimmed(self.detail),
            extra: self.extra.filter(|extra| !extra.is_empty()),
        };
        if link.link_type.is_none() && link.id.is_none() && link.detail.is_none() {
            return None;
        }
        Some(link)
    }

    fn identity(&self) -> (Option<&str>, Option<&str>, Option<&str>) {
        (
            self.link_type.as_deref(),
            self.id.as_deref(),
            self.detail.as_deref(),
        )
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Link {}

impl Hash for Link {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

fn canonical_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Build a canonical link from a loosely-typed record.
pub fn normalize_link(raw: &Value) -> Option<Link> {
    let Value::Object(fields) = raw else {
        return None;
    };

    let mut extra = Map::new();
    for (key, value) in fields {
        if !CANONICAL_FIELDS.contains(&key.as_str()) {
            extra.insert(key.clone(), value.clone());
        }
    }

    Link {
        link_type: fields.get("type").and_then(canonical_text),
        id: fields.get("id").and_then(canonical_text),
        detail: fields.get("detail").and_then(canonical_text),
        extra: Some(extra),
    }
    .normalized()
}

/// Normalize a scalar-or-array of raw links. `None` means "no links"; an
/// empty vector is never returned.
pub fn normalize_links(raw: &Value) -> Option<Vec<Link>> {
    let links: Vec<Link> = match raw {
        Value::Array(items) => items.iter().filter_map(normalize_link).collect(),
        other => normalize_link(other).into_iter().collect(),
    };
    if links.is_empty() {
        None
    } else {
        Some(links)
    }
}

/// Append every incoming link not already present in `base`, keeping base
/// order. Returns how many links were appended.
pub fn merge_link_collections(base: &mut Option<Vec<Link>>, incoming: &[Link]) -> usize {
    if incoming.is_empty() {
        return 0;
    }
    let links = base.get_or_insert_with(Vec::new);
    let mut appended = 0;
    for link in incoming {
        if !links.contains(link) {
            links.push(link.clone());
            appended += 1;
        }
    }
    appended
}

/// Normalize `link` and add it to `meta.depends_on` unless it is already
/// there.
pub fn append_dependency_link(meta: &mut Meta, link: Link) -> bool {
    let Some(link) = link.normalized() else {
        return false;
    };
    merge_link_collections(&mut meta.depends_on, std::slice::from_ref(&link)) > 0
}
