use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Insertion-ordered, multi-valued HTTP header map.
///
/// A header name may appear more than once; insertion order is preserved for
/// both names and values. Serializes as a JSON object mapping each name to
/// an array of its values, names in first-occurrence order, which is the
/// shape the manifest contract requires.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a header entry, keeping any existing values for the name.
    pub fn add(&mut self, name: &str, value: &str) -> &mut Self {
        self.0.push((name.to_string(), value.to_string()));
        self
    }

    /// First value recorded for `name`, compared case-insensitively.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values recorded for `name`, in insertion order.
    pub fn all_values(&self, name: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Group values under their name, names in first-occurrence order.
        let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
        for (name, value) in &self.0 {
            match grouped.iter_mut().find(|(n, _)| *n == name.as_str()) {
                Some((_, values)) => values.push(value.as_str()),
                None => grouped.push((name.as_str(), vec![value.as_str()])),
            }
        }

        let mut map = serializer.serialize_map(Some(grouped.len()))?;
        for (name, values) in grouped {
            map.serialize_entry(name, &values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header name to array of values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, values)) = access.next_entry::<String, Vec<String>>()? {
                    for value in values {
                        entries.push((name.clone(), value));
                    }
                }
                Ok(Headers(entries))
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "application/json");
        headers.add("X-Req", "a");

        assert_eq!(headers.first_value("content-type"), Some("application/json"));
        assert_eq!(headers.first_value("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(headers.first_value("missing"), None);
    }

    #[test]
    fn serializes_grouped_in_first_occurrence_order() {
        let mut headers = Headers::new();
        headers.add("b", "1");
        headers.add("a", "2");
        headers.add("b", "3");

        let json = serde_json::to_string(&headers).unwrap();
        assert_eq!(json, r#"{"b":["1","3"],"a":["2"]}"#);
    }

    #[test]
    fn deserializes_back_to_flat_entries() {
        let headers: Headers = serde_json::from_str(r#"{"b":["1","3"],"a":["2"]}"#).unwrap();
        assert_eq!(headers.all_values("b"), vec!["1", "3"]);
        assert_eq!(headers.all_values("a"), vec!["2"]);
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn repeated_names_keep_every_value() {
        let mut headers = Headers::new();
        headers.add("set-cookie", "a=1");
        headers.add("set-cookie", "b=2");

        assert_eq!(headers.all_values("set-cookie"), vec!["a=1", "b=2"]);
        assert_eq!(headers.first_value("set-cookie"), Some("a=1"));
    }
}
