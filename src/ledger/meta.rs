use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ledger::link::{normalize_link, normalize_links, Link};

/// Whether a contribution's cause persists only while some condition holds
/// or is a one-time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Longevity {
    Ongoing,
    Permanent,
}

impl Longevity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "ongoing" => Some(Longevity::Ongoing),
            "permanent" => Some(Longevity::Permanent),
            _ => None,
        }
    }
}

/// The effect path (type + method) that produced a contribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRef {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub effect_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl EffectRef {
    pub fn is_empty(&self) -> bool {
        self.effect_type.is_none() && self.method.is_none()
    }
}

/// Provenance record attached to one ledger contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub source_key: String,
    pub longevity: Longevity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<EffectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

impl Meta {
    pub fn new(source_key: impl Into<String>, longevity: Longevity) -> Self {
        Self {
            source_key: source_key.into(),
            longevity,
            kind: None,
            id: None,
            detail: None,
            instance: None,
            depends_on: None,
            removal: None,
            effect: None,
            extra: None,
        }
    }

    /// View this record as a partial so it can be merged into another Meta.
    pub fn to_patch(&self) -> MetaPatch {
        MetaPatch {
            source_key: Some(self.source_key.clone()),
            longevity: Some(self.longevity),
            kind: self.kind.clone(),
            id: self.id.clone(),
            detail: self.detail.clone(),
            instance: self.instance.clone(),
            depends_on: self.depends_on.clone(),
            removal: self.removal.clone(),
            effect: self.effect.clone(),
            extra: self.extra.clone(),
        }
    }
}

/// Partial metadata, as returned by frames or embedded in an effect
/// definition. Every field is optional.
///
/// Deserialization never fails: fields with the wrong shape are dropped and
/// link fields go through the link normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct MetaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longevity: Option<Longevity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<Link>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<EffectRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

impl MetaPatch {
    pub fn longevity(mut self, longevity: Longevity) -> Self {
        self.longevity = Some(longevity);
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn removal(mut self, link: Link) -> Self {
        self.removal = Some(link);
        self
    }

    pub fn depends_on(mut self, links: Vec<Link>) -> Self {
        self.depends_on = if links.is_empty() { None } else { Some(links) };
        self
    }

    pub fn extra_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }
}

impl From<Value> for MetaPatch {
    fn from(value: Value) -> Self {
        let Value::Object(fields) = value else {
            return MetaPatch::default();
        };

        let text = |key: &str| -> Option<String> {
            match fields.get(key)? {
                Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            }
        };

        let effect = fields.get("effect").and_then(Value::as_object).map(|effect| EffectRef {
            effect_type: effect.get("type").and_then(Value::as_str).map(str::to_string),
            method: effect.get("method").and_then(Value::as_str).map(str::to_string),
        });

        MetaPatch {
            source_key: text("sourceKey"),
            longevity: fields
                .get("longevity")
                .and_then(Value::as_str)
                .and_then(Longevity::parse),
            kind: text("kind"),
            id: text("id"),
            detail: text("detail"),
            instance: text("instance"),
            depends_on: fields.get("dependsOn").and_then(normalize_links),
            removal: fields.get("removal").and_then(normalize_link),
            effect: effect.filter(|effect| !effect.is_empty()),
            extra: fields
                .get("extra")
                .and_then(Value::as_object)
                .filter(|extra| !extra.is_empty())
                .cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_from_json_drops_malformed_fields() {
        let patch: MetaPatch = serde_json::from_value(json!({
            "kind": "building",
            "id": "  ",
            "longevity": "forever",
            "dependsOn": { "type": "population", "id": "legion" },
            "removal": "nope",
            "effect": { "type": 7 },
            "extra": { "note": "x" },
        }))
        .expect("patch deserializes");

        assert_eq!(patch.kind.as_deref(), Some("building"));
        assert_eq!(patch.id, None);
        assert_eq!(patch.longevity, None);
        assert_eq!(patch.depends_on.as_ref().map(Vec::len), Some(1));
        assert_eq!(patch.removal, None);
        assert_eq!(patch.effect, None);
        assert_eq!(patch.extra.unwrap().get("note"), Some(&json!("x")));
    }

    #[test]
    fn patch_from_non_object_is_empty() {
        let patch: MetaPatch = serde_json::from_value(json!([1, 2])).expect("patch");
        assert_eq!(patch, MetaPatch::default());
    }

    #[test]
    fn meta_serializes_without_absent_fields() {
        let meta = Meta::new("stat:add:happiness", Longevity::Ongoing);
        let value = serde_json::to_value(&meta).expect("serialize");
        assert_eq!(
            value,
            json!({ "sourceKey": "stat:add:happiness", "longevity": "ongoing" })
        );
    }

    #[test]
    fn cloned_meta_is_independent() {
        let mut original = Meta::new("resource:add:gold", Longevity::Permanent);
        original.depends_on = Some(vec![Link::new("population", "legion")]);
        original.extra = Some(Map::from_iter([("phase".to_string(), json!("growth"))]));

        let mut copy = original.clone();
        copy.depends_on
            .as_mut()
            .unwrap()
            .push(Link::new("resource", "gold"));
        copy.extra
            .as_mut()
            .unwrap()
            .insert("phase".to_string(), json!("upkeep"));

        assert_eq!(original.depends_on.as_ref().unwrap().len(), 1);
        assert_eq!(original.extra.unwrap().get("phase"), Some(&json!("growth")));
        assert!(copy.removal.is_none());
    }
}
