//! Declarative entity descriptions (`doctype.json`).

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ModelResult;

/// One declarative entity: a name and an ordered list of typed fields.
///
/// ```json
/// {"name": "Customer", "fields": [{"fieldname": "email", "fieldtype": "Email", "reqd": 1}]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescription>,
}

/// One field of an entity description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescription {
    #[serde(default)]
    pub fieldname: String,
    #[serde(default)]
    pub fieldtype: String,
    /// Accepts `0`/`1` as written by most tooling, or a plain boolean.
    #[serde(rename = "reqd", default, deserialize_with = "deserialize_flag")]
    pub required: bool,
    /// Newline-separated list of allowed values (used by `Select`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

impl EntityDescription {
    /// Parses a description from its JSON text.
    pub fn from_json(text: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds a description from an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> ModelResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

impl FieldDescription {
    pub fn new(fieldname: &str, fieldtype: &str, required: bool) -> Self {
        Self {
            fieldname: fieldname.into(),
            fieldtype: fieldtype.into(),
            required,
            options: None,
        }
    }

    /// The non-empty entries of `options`, in declaration order.
    pub fn option_list(&self) -> Option<Vec<String>> {
        let raw = self.options.as_deref()?;
        let list: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if list.is_empty() { None } else { Some(list) }
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Int(n)) => n != 0,
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reqd_accepts_int_and_bool() {
        let d = EntityDescription::from_json(
            r#"{"name":"X","fields":[
                {"fieldname":"a","fieldtype":"Data","reqd":1},
                {"fieldname":"b","fieldtype":"Data","reqd":true},
                {"fieldname":"c","fieldtype":"Data","reqd":0},
                {"fieldname":"d","fieldtype":"Data"}
            ]}"#,
        )
        .unwrap();
        let flags: Vec<bool> = d.fields.iter().map(|f| f.required).collect();
        assert_eq!(flags, vec![true, true, false, false]);
    }

    #[test]
    fn extra_keys_are_ignored() {
        let d = EntityDescription::from_json(
            r#"{"name":"X","doctype":"DocType","fields":[]}"#,
        )
        .unwrap();
        assert_eq!(d.name, "X");
    }

    #[test]
    fn option_list_splits_lines() {
        let mut f = FieldDescription::new("status", "Select", false);
        f.options = Some("Active\n\nInactive\n".into());
        assert_eq!(
            f.option_list(),
            Some(vec!["Active".to_string(), "Inactive".to_string()])
        );
    }
}
