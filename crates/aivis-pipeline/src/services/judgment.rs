use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Judge output as received. Every field is optional and parsed leniently:
/// wrong types collapse to `None` rather than failing the whole judgment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawJudgment {
    #[serde(
        alias = "mentionDetected",
        alias = "mentioned",
        deserialize_with = "lenient_bool"
    )]
    pub mention_detected: Option<bool>,

    #[serde(
        alias = "mention_position",
        alias = "mentionPosition",
        deserialize_with = "lenient_string"
    )]
    pub position: Option<String>,

    #[serde(deserialize_with = "lenient_string")]
    pub sentiment: Option<String>,

    #[serde(deserialize_with = "lenient_score")]
    pub confidence: Option<f64>,

    #[serde(
        alias = "excerpt",
        alias = "context_excerpt",
        alias = "contextExcerpt",
        deserialize_with = "lenient_string"
    )]
    pub context: Option<String>,

    #[serde(deserialize_with = "lenient_citations")]
    pub citations: Option<Vec<RawCitationJudgment>>,

    #[serde(
        alias = "competitors_mentioned",
        alias = "competitorsMentioned",
        deserialize_with = "lenient_names"
    )]
    pub competitors: Option<Vec<String>>,
}

/// The judge's view of one cited source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawCitationJudgment {
    #[serde(alias = "source", deserialize_with = "lenient_string")]
    pub url: Option<String>,

    #[serde(deserialize_with = "lenient_string")]
    pub domain: Option<String>,

    #[serde(
        alias = "classification",
        alias = "category",
        deserialize_with = "lenient_string"
    )]
    pub bucket: Option<String>,

    #[serde(
        alias = "influence",
        alias = "influenceScore",
        deserialize_with = "lenient_score"
    )]
    pub influence_score: Option<f64>,
}

fn lenient_bool<'de, D: Deserializer<'de>>(de: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

/// Numbers or numeric strings. Values in `(1, 100]` are read as percentages.
fn lenient_score<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let raw = match Option::<Value>::deserialize(de)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(raw.map(|v| if v > 1.0 && v <= 100.0 { v / 100.0 } else { v }))
}

fn lenient_citations<'de, D: Deserializer<'de>>(
    de: D,
) -> Result<Option<Vec<RawCitationJudgment>>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(url) => Some(RawCitationJudgment {
                        url: Some(url),
                        ..RawCitationJudgment::default()
                    }),
                    other => serde_json::from_value(other).ok(),
                })
                .collect(),
        ),
        _ => None,
    })
}

/// Accepts `["Name", ...]` or `[{"name": "Name"}, ...]`.
fn lenient_names<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<String>>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    Value::Object(map) => match map.get("name") {
                        Some(Value::String(name)) => Some(name.clone()),
                        _ => None,
                    },
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}
