//! Indexable payload of a content object.
//!
//! A [`FullTextData`] carries everything the indexer needs to know about one
//! content object: its identity, the metadata copied onto every link row, and
//! the ordered list of field values ([`FullTextValue`]) whose text is indexed.
//! Field order matters: token placement runs across the fields in the order
//! they appear here.

use serde::{Deserialize, Serialize};

/// Identifier of a content object.
pub type ContentId = u64;

/// Identifier of a content type.
pub type ContentTypeId = u64;

/// Identifier of a section.
pub type SectionId = u64;

/// Identifier of a field definition.
pub type FieldDefinitionId = u64;

/// One field's contribution to the index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTextValue {
    /// Raw field text.
    pub value: String,

    /// Field definition the text belongs to.
    pub field_definition_id: FieldDefinitionId,

    /// Field definition identifier, e.g. `"title"`.
    pub field_definition_identifier: String,

    /// Language of this value, e.g. `"eng-GB"`.
    pub language_code: String,

    /// Whether the text is split into words (`true`) or indexed as one token.
    pub split: bool,

    /// Transformation commands overriding the engine default.
    #[serde(default)]
    pub transformation_rules: Option<Vec<String>>,

    /// Whether this value is in the main language and always available.
    #[serde(default)]
    pub is_main_and_always_available: bool,
}

impl FullTextValue {
    /// Create a splittable value for the given field and language.
    pub fn new<V, I, L>(
        value: V,
        field_definition_id: FieldDefinitionId,
        field_definition_identifier: I,
        language_code: L,
    ) -> Self
    where
        V: Into<String>,
        I: Into<String>,
        L: Into<String>,
    {
        FullTextValue {
            value: value.into(),
            field_definition_id,
            field_definition_identifier: field_definition_identifier.into(),
            language_code: language_code.into(),
            split: true,
            transformation_rules: None,
            is_main_and_always_available: false,
        }
    }

    /// Index the whole value as a single token.
    pub fn unsplit(mut self) -> Self {
        self.split = false;
        self
    }

    /// Use these transformation commands instead of the engine default.
    pub fn with_transformation_rules<S: Into<String>>(
        mut self,
        rules: impl IntoIterator<Item = S>,
    ) -> Self {
        self.transformation_rules = Some(rules.into_iter().map(Into::into).collect());
        self
    }

    /// Mark the value as main-language and always available.
    pub fn always_available(mut self) -> Self {
        self.is_main_and_always_available = true;
        self
    }
}

/// The indexable payload of one content object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTextData {
    /// Content object identifier.
    pub content_id: ContentId,

    /// Content type identifier.
    pub content_type_id: ContentTypeId,

    /// Section identifier.
    pub section_id: SectionId,

    /// Whether the content object is published.
    pub published: bool,

    /// Field values in field order.
    pub values: Vec<FullTextValue>,
}

impl FullTextData {
    /// Create an empty payload for a content object.
    pub fn new(content_id: ContentId) -> Self {
        FullTextData {
            content_id,
            content_type_id: 0,
            section_id: 0,
            published: false,
            values: Vec::new(),
        }
    }

    /// Create a builder for constructing payloads.
    pub fn builder(content_id: ContentId) -> FullTextDataBuilder {
        FullTextDataBuilder::new(content_id)
    }

    /// Check whether the payload has no field values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A builder for constructing [`FullTextData`] in a fluent manner.
#[derive(Debug, Clone)]
pub struct FullTextDataBuilder {
    data: FullTextData,
}

impl FullTextDataBuilder {
    /// Create a new builder for the given content object.
    pub fn new(content_id: ContentId) -> Self {
        FullTextDataBuilder {
            data: FullTextData::new(content_id),
        }
    }

    /// Set the content type.
    pub fn content_type(mut self, content_type_id: ContentTypeId) -> Self {
        self.data.content_type_id = content_type_id;
        self
    }

    /// Set the section.
    pub fn section(mut self, section_id: SectionId) -> Self {
        self.data.section_id = section_id;
        self
    }

    /// Set the published flag.
    pub fn published(mut self, published: bool) -> Self {
        self.data.published = published;
        self
    }

    /// Append a field value.
    pub fn add_value(mut self, value: FullTextValue) -> Self {
        self.data.values.push(value);
        self
    }

    /// Append a splittable text value.
    pub fn add_text<I, V, L>(
        self,
        field_definition_id: FieldDefinitionId,
        field_definition_identifier: I,
        value: V,
        language_code: L,
    ) -> Self
    where
        I: Into<String>,
        V: Into<String>,
        L: Into<String>,
    {
        self.add_value(FullTextValue::new(
            value,
            field_definition_id,
            field_definition_identifier,
            language_code,
        ))
    }

    /// Build the payload.
    pub fn build(self) -> FullTextData {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let data = FullTextData::builder(10)
            .content_type(2)
            .section(1)
            .published(true)
            .add_text(1, "title", "Hello World", "eng-GB")
            .add_value(FullTextValue::new("www.example.com", 2, "url", "eng-GB").unsplit())
            .build();

        assert_eq!(data.content_id, 10);
        assert!(!data.is_empty());
        assert!(FullTextData::new(11).is_empty());
        assert_eq!(data.content_type_id, 2);
        assert!(data.published);
        assert_eq!(data.values.len(), 2);
        assert!(data.values[0].split);
        assert!(!data.values[1].split);
    }

    #[test]
    fn test_value_options() {
        let value = FullTextValue::new("Text", 3, "body", "ger-DE")
            .with_transformation_rules(["lowercase"])
            .always_available();

        assert_eq!(value.transformation_rules, Some(vec!["lowercase".to_string()]));
        assert!(value.is_main_and_always_available);
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "value": "Hello",
            "field_definition_id": 1,
            "field_definition_identifier": "title",
            "language_code": "eng-GB",
            "split": true
        }"#;
        let value: FullTextValue = serde_json::from_str(json).unwrap();
        assert!(value.transformation_rules.is_none());
        assert!(!value.is_main_and_always_available);
    }
}
