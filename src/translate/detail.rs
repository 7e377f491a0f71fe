//! Detailed translation record returned for `translationType = "detailed"`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormalityLevel {
    Formal,
    #[default]
    Neutral,
    Informal,
}

/// A source/target pair (example sentence or related expression).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPair {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Direction {
    pub source: TextDirection,
    pub target: TextDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PhraseTranslation {
    pub phrase: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LanguageInfo {
    pub source: String,
    pub target: String,
}

/// Linguistic analysis written in the target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LinguisticData {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    /// noun, verb, idiom, phrasal verb, expression, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub definition: String,
    #[serde(default)]
    pub pronunciation: String,
    #[serde(default)]
    pub formality_level: FormalityLevel,
    #[serde(default)]
    pub examples: Vec<TextPair>,
    #[serde(default)]
    pub related_expressions: Vec<TextPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LanguageLearningData {
    #[serde(default)]
    pub phrase: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub direction: Direction,
    pub translation: PhraseTranslation,
    #[serde(default)]
    pub language_info: LanguageInfo,
    pub linguistic_data: LinguisticData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_shape() {
        let raw = serde_json::json!({
            "direction": { "source": "ltr", "target": "rtl" },
            "translation": { "phrase": "قطة", "context": "قطة سوداء" },
            "language_info": { "source": "en", "target": "ar" },
            "linguistic_data": {
                "isValid": true,
                "type": "noun",
                "definition": "حيوان أليف",
                "pronunciation": "qiṭṭa",
                "formality_level": "neutral",
                "examples": [{ "source": "The cat sleeps.", "target": "القطة نائمة." }],
                "related_expressions": []
            }
        });
        let data: LanguageLearningData = serde_json::from_value(raw).unwrap();
        assert_eq!(data.direction.target, TextDirection::Rtl);
        assert_eq!(data.linguistic_data.kind, "noun");
        assert_eq!(data.linguistic_data.examples.len(), 1);
        assert!(data.phrase.is_empty(), "phrase is filled in by the service");
    }
}
