//! `{{name}}` placeholder resolution for tool configs.
//!
//! Catalog configs are stored with provisioning-time placeholders such as
//! `{{city}}`. Before a per-user copy is written every placeholder must be
//! resolved; an unregistered name is an error rather than being left in the
//! stored config. Single-brace `{arg}` tokens belong to the tool runtime and
//! are never touched here.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::{Error, Result};

type Resolver = Box<dyn Fn() -> String + Send + Sync>;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// Maps placeholder names to the functions producing their values.
#[derive(Default)]
pub struct PlaceholderResolver {
    resolvers: BTreeMap<String, Resolver>,
}

impl std::fmt::Debug for PlaceholderResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceholderResolver")
            .field("supported", &self.supported())
            .finish()
    }
}

impl PlaceholderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// The resolver used by provisioning: only `city` is defined.
    pub fn with_city(city: impl Into<String>) -> Self {
        let city = city.into();
        let mut r = Self::new();
        r.register("city", move || city.clone());
        r
    }

    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.resolvers.insert(name.to_owned(), Box::new(f));
    }

    pub fn supported(&self) -> Vec<&str> {
        self.resolvers.keys().map(String::as_str).collect()
    }

    /// Substitute every placeholder in `input`.
    pub fn resolve_str(&self, input: &str) -> Result<String> {
        let re = placeholder_re();
        if let Some(unknown) = re
            .captures_iter(input)
            .map(|c| c[1].to_owned())
            .find(|name| !self.resolvers.contains_key(name))
        {
            return Err(Error::UnknownPlaceholder(unknown));
        }
        let out = re.replace_all(input, |caps: &Captures| (self.resolvers[&caps[1]])());
        Ok(out.into_owned())
    }

    /// Substitute placeholders in every string value of `config`, recursing
    /// through arrays and objects. Keys and non-string values are kept as is.
    pub fn resolve(&self, config: &Value) -> Result<Value> {
        Ok(match config {
            Value::String(s) => Value::String(self.resolve_str(s)?),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.resolve(v))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.resolve(v)?);
                }
                Value::Object(out)
            }
            other => other.clone(),
        })
    }
}

/// Names of all placeholders appearing in string values of `config`.
pub fn placeholders_in(config: &Value) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect(config, &mut names);
    names
}

fn collect(v: &Value, names: &mut BTreeSet<String>) {
    match v {
        Value::String(s) => {
            for caps in placeholder_re().captures_iter(s) {
                names.insert(caps[1].to_owned());
            }
        }
        Value::Array(items) => items.iter().for_each(|i| collect(i, names)),
        Value::Object(map) => map.values().for_each(|i| collect(i, names)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn city_replaced_everywhere_other_keys_unchanged() {
        let cfg = json!({
            "method": "GET",
            "url": "https://wttr.in/{{city}}",
            "query": { "format": "j1", "label": "weather in {{ city }}" },
            "timeout_s": 15,
            "tags": ["{{city}}", "static"],
            "allowed_hosts": ["wttr.in"]
        });
        let out = PlaceholderResolver::with_city("chicago").resolve(&cfg).unwrap();

        assert_eq!(out["url"], "https://wttr.in/chicago");
        assert_eq!(out["query"]["label"], "weather in chicago");
        assert_eq!(out["tags"], json!(["chicago", "static"]));
        assert_eq!(out["method"], "GET");
        assert_eq!(out["query"]["format"], "j1");
        assert_eq!(out["timeout_s"], 15);
        assert_eq!(out["allowed_hosts"], json!(["wttr.in"]));
        assert!(placeholders_in(&out).is_empty());
    }

    #[test]
    fn runtime_arguments_left_alone() {
        let cfg = json!({ "url": "https://ipinfo.io/{ip}/json" });
        let out = PlaceholderResolver::with_city("x").resolve(&cfg).unwrap();
        assert_eq!(out, cfg);
    }

    #[test]
    fn unknown_placeholder_fails_loudly() {
        let cfg = json!({ "url": "https://example.com/{{country}}/{{city}}" });
        let err = PlaceholderResolver::with_city("x").resolve(&cfg).unwrap_err();
        assert!(matches!(err, Error::UnknownPlaceholder(ref n) if n == "country"));
    }

    #[test]
    fn custom_resolvers_can_be_registered() {
        let mut r = PlaceholderResolver::with_city("oslo");
        r.register("units", || "metric".into());
        assert_eq!(r.supported(), vec!["city", "units"]);
        assert_eq!(
            r.resolve_str("{{city}}?u={{units}}").unwrap(),
            "oslo?u=metric"
        );
    }

    #[test]
    fn collects_placeholder_names() {
        let cfg = json!({ "a": "{{city}}", "b": ["{{zip}}"], "c": 1 });
        let names: Vec<_> = placeholders_in(&cfg).into_iter().collect();
        assert_eq!(names, vec!["city", "zip"]);
    }
}
