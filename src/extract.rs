//! # Field Extraction
//!
//! Turns a parsed page into values. Each [`FieldRule`] names a column and says
//! where its node lives, which text to read and how to clean it up.
//!
//! ## Failure Modes
//!
//! - **Missing node**: the field becomes [`FieldValue::Unavailable`]. The cycle
//!   carries on; a row with `N/A` is still worth recording.
//! - **Malformed number**: [`ExtractError::Malformed`]. The node exists but the
//!   text no longer parses, so the layout changed under the selector. This
//!   aborts the cycle.

use crate::xpath::{LocationPath, PathError};
use crate::{FieldValue, Record, SENTINEL};
use scraper::{ElementRef, Html};
use std::fmt;
use thiserror::Error;

/// Errors that abort extraction of a whole record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    /// A numeric field held text that is not a number
    #[error("field `{field}`: expected a number, found {text:?}")]
    Malformed { field: String, text: String },

    /// A rule built at extraction time had a bad path
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Which text of the matched node to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextMode {
    /// Text before the node's first child element (lxml's `.text`)
    Own,
    /// All descendant text concatenated (lxml's `.text_content()`)
    Deep,
}

/// What to turn the cleaned text into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conversion {
    /// Keep as text
    None,
    /// Parse as `f64`
    Float,
    /// Map a one-letter `L`/`M`/`H` code through [`map_level`]
    Level,
}

/// Descriptive level for the pollen, pollution and UV codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    Medium,
    High,
    Unknown,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "Low",
            Level::Medium => "Medium",
            Level::High => "High",
            Level::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a single-letter code to its level.
///
/// # Example
/// ```
/// use weather_logger_lib::extract::{map_level, Level};
///
/// assert_eq!(map_level(Some("M")), Level::Medium);
/// assert_eq!(map_level(Some("N/A")), Level::Unknown);
/// assert_eq!(map_level(None), Level::Unknown);
/// ```
pub fn map_level(code: Option<&str>) -> Level {
    match code {
        Some("L") => Level::Low,
        Some("M") => Level::Medium,
        Some("H") => Level::High,
        _ => Level::Unknown,
    }
}

/// How to find and clean one column.
#[derive(Clone, Debug)]
pub struct FieldRule {
    pub name: String,
    pub path: LocationPath,
    pub text: TextMode,
    /// Removed from the end of the trimmed text when present
    pub suffix: Option<&'static str>,
    pub conversion: Conversion,
}

impl FieldRule {
    /// Plain text rule reading the node's own text.
    pub fn text(name: &str, path: &str) -> Result<Self, PathError> {
        Ok(FieldRule {
            name: name.to_string(),
            path: LocationPath::parse(path)?,
            text: TextMode::Own,
            suffix: None,
            conversion: Conversion::None,
        })
    }

    /// Numeric rule; `suffix` is stripped before parsing.
    pub fn float(name: &str, path: &str, suffix: &'static str) -> Result<Self, PathError> {
        Ok(FieldRule {
            suffix: Some(suffix),
            conversion: Conversion::Float,
            ..Self::text(name, path)?
        })
    }

    /// Level-code rule.
    pub fn level(name: &str, path: &str) -> Result<Self, PathError> {
        Ok(FieldRule {
            conversion: Conversion::Level,
            ..Self::text(name, path)?
        })
    }

    pub fn with_suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub fn deep(mut self) -> Self {
        self.text = TextMode::Deep;
        self
    }
}

/// Apply every rule to `doc`, in order.
pub fn extract(doc: &Html, rules: &[FieldRule]) -> Result<Record, ExtractError> {
    let fields = rules
        .iter()
        .map(|rule| extract_field(doc, rule).map(|value| (rule.name.clone(), value)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Record::new(fields))
}

/// Apply a single rule.
pub fn extract_field(doc: &Html, rule: &FieldRule) -> Result<FieldValue, ExtractError> {
    let Some(node) = rule.path.select_first(doc) else {
        return Ok(match rule.conversion {
            // The sentinel goes through the level table like any other code
            Conversion::Level => FieldValue::Text(map_level(Some(SENTINEL)).to_string()),
            _ => FieldValue::Unavailable,
        });
    };

    let raw = match rule.text {
        TextMode::Own => own_text(node),
        TextMode::Deep => node.text().collect::<String>(),
    };
    let trimmed = raw.trim();
    let cleaned = rule
        .suffix
        .and_then(|suffix| trimmed.strip_suffix(suffix))
        .unwrap_or(trimmed);

    match rule.conversion {
        Conversion::None => Ok(FieldValue::Text(cleaned.to_string())),
        Conversion::Level => Ok(FieldValue::Text(map_level(Some(cleaned)).to_string())),
        Conversion::Float => {
            cleaned
                .trim()
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| ExtractError::Malformed {
                    field: rule.name.clone(),
                    text: raw.trim().to_string(),
                })
        }
    }
}

/// Leading text nodes up to the first child element.
fn own_text(node: ElementRef<'_>) -> String {
    node.children()
        .map_while(|child| child.value().as_text().map(|text| &**text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn test_missing_node_yields_sentinel() {
        let page = doc(r#"<div id="other">x</div>"#);
        let rule = FieldRule::text("Location", r#"//*[@id="loc"]"#).unwrap();
        assert_eq!(extract_field(&page, &rule), Ok(FieldValue::Unavailable));

        // Even a numeric rule does not fail when the node is absent
        let rule = FieldRule::float("High", r#"//*[@id="loc"]/span"#, "°").unwrap();
        assert_eq!(extract_field(&page, &rule), Ok(FieldValue::Unavailable));
    }

    #[test]
    fn test_suffix_is_stripped_before_parsing() {
        let page = doc(r#"<span id="t"> 21° </span><span id="h">71%</span>"#);

        let rule = FieldRule::float("High", r#"//*[@id="t"]"#, "°").unwrap();
        assert_eq!(extract_field(&page, &rule), Ok(FieldValue::Float(21.0)));

        let rule = FieldRule::float("Humidity", r#"//*[@id="h"]"#, "%").unwrap();
        assert_eq!(extract_field(&page, &rule), Ok(FieldValue::Float(71.0)));
    }

    #[test]
    fn test_suffix_only_removed_when_present() {
        let page = doc(r#"<span id="p">1012 mb</span><span id="q">1012</span>"#);

        let rule = FieldRule::text("Pressure", r#"//*[@id="p"]"#).unwrap().with_suffix(" mb");
        assert_eq!(extract_field(&page, &rule), Ok(FieldValue::Text("1012".into())));

        let rule = FieldRule::text("Pressure", r#"//*[@id="q"]"#).unwrap().with_suffix(" mb");
        assert_eq!(extract_field(&page, &rule), Ok(FieldValue::Text("1012".into())));
    }

    #[test]
    fn test_malformed_number_propagates() {
        let page = doc(r#"<span id="t">--°</span>"#);
        let rule = FieldRule::float("High Temperature(°C)", r#"//*[@id="t"]"#, "°").unwrap();

        let err = extract_field(&page, &rule).unwrap_err();
        assert_eq!(
            err,
            ExtractError::Malformed {
                field: "High Temperature(°C)".into(),
                text: "--°".into()
            }
        );

        // One bad field fails the whole record
        let rules = vec![FieldRule::text("Ok", r#"//*[@id="t"]"#).unwrap(), rule];
        assert!(extract(&page, &rules).is_err());
    }

    #[test]
    fn test_map_level_codes() {
        assert_eq!(map_level(Some("L")), Level::Low);
        assert_eq!(map_level(Some("M")), Level::Medium);
        assert_eq!(map_level(Some("H")), Level::High);
        for code in [Some("X"), Some(""), Some("N/A"), Some("l"), Some("Low"), None] {
            assert_eq!(map_level(code), Level::Unknown, "{code:?}");
        }
        assert_eq!(Level::Medium.to_string(), "Medium");
    }

    #[test]
    fn test_level_rule_maps_present_and_missing_nodes() {
        let page = doc(r#"<span id="pollen"><span>H</span></span><span id="uv">L</span>"#);

        let uv = FieldRule::level("UV Index", r#"//*[@id="uv"]"#).unwrap();
        assert_eq!(extract_field(&page, &uv), Ok(FieldValue::Text("Low".into())));

        let pollen = FieldRule::level("Pollen", r#"//*[@id="pollen"]"#).unwrap().deep();
        assert_eq!(extract_field(&page, &pollen), Ok(FieldValue::Text("High".into())));

        let missing = FieldRule::level("Pollution", r#"//*[@id="nope"]"#).unwrap();
        assert_eq!(extract_field(&page, &missing), Ok(FieldValue::Text("Unknown".into())));
    }

    #[test]
    fn test_own_text_stops_at_first_child_element() {
        let page = doc(r#"<div id="d"> South <span>westerly</span> tail</div>"#);

        let own = FieldRule::text("Wind", r#"//*[@id="d"]"#).unwrap();
        assert_eq!(extract_field(&page, &own), Ok(FieldValue::Text("South".into())));

        let deep = FieldRule::text("Wind", r#"//*[@id="d"]"#).unwrap().deep();
        assert_eq!(
            extract_field(&page, &deep),
            Ok(FieldValue::Text("South westerly tail".into()))
        );
    }

    #[test]
    fn test_extract_keeps_rule_order() {
        let page = doc(r#"<b id="a">1</b><b id="b">2</b>"#);
        let rules = vec![
            FieldRule::text("B", r#"//*[@id="b"]"#).unwrap(),
            FieldRule::text("Missing", r#"//*[@id="c"]"#).unwrap(),
            FieldRule::float("A", r#"//*[@id="a"]"#, "").unwrap(),
        ];

        let record = extract(&page, &rules).unwrap();
        assert_eq!(record.columns().collect::<Vec<_>>(), ["B", "Missing", "A"]);
        assert_eq!(record.get("A"), Some(&FieldValue::Float(1.0)));
        assert_eq!(record.unavailable(), ["Missing"]);
    }
}
