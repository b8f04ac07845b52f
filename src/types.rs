//! Shared types used across the content pipeline.
//!
//! Records are produced by [`extract`](crate::extract), memoized by
//! [`cache`](crate::cache), and projected into [`ListItem`]s by
//! [`query`](crate::query). They are serialized into the scan manifest, so
//! every type here round-trips through JSON.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Parsed front matter of a content file.
///
/// `title` and `slug` are required for a record to exist at all; the
/// extractor drops documents missing either. Keys the pipeline does not know
/// about are kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    /// Publication date as written. Parsed lazily; see [`crate::feed::parse_date`].
    #[serde(
        default,
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Site-root-relative cover image path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    /// Loose reference to [`CategoryDescriptor::slug`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Slug of the calculator this post promotes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculator: Option<String>,
    #[serde(
        default,
        rename = "relatedPosts",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub related_posts: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One discovered document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub absolute_path: PathBuf,
    /// Raw body with the front matter block removed.
    pub body: String,
    pub metadata: Metadata,
}

impl ContentRecord {
    pub fn slug(&self) -> &str {
        &self.metadata.slug
    }

    pub fn list_item(&self) -> ListItem {
        let meta = &self.metadata;
        ListItem {
            title: meta.title.clone(),
            slug: meta.slug.clone(),
            date: meta.date.clone().unwrap_or_default(),
            excerpt: meta.excerpt.clone(),
            cover: meta.cover.clone(),
            category: meta.category.clone(),
            calculator: meta.calculator.clone(),
        }
    }
}

/// Listing projection of a [`ContentRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub title: String,
    pub slug: String,
    /// Empty when the record has no date.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculator: Option<String>,
}

/// A blog category, read from the static categories resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDescriptor {
    pub slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_calculator: Option<String>,
}

/// Accept `date: 2024-01-01` and `date: 20240101` alike.
///
/// YAML has no date type in serde_yaml's model, but unquoted numbers do
/// deserialize as numbers; both are kept as their textual form.
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_front_matter_keys_are_preserved() {
        let meta: Metadata = serde_yaml::from_str(
            "title: Pouring\nslug: pouring\nauthor: Sam\nreadingMinutes: 4\n",
        )
        .unwrap();
        assert_eq!(meta.extra["author"], serde_json::json!("Sam"));
        assert_eq!(meta.extra["readingMinutes"], serde_json::json!(4));
    }

    #[test]
    fn related_posts_use_camel_case_key() {
        let meta: Metadata =
            serde_yaml::from_str("title: A\nslug: a\nrelatedPosts: [b, c]\n").unwrap();
        assert_eq!(meta.related_posts, vec!["b", "c"]);
        assert!(!meta.extra.contains_key("relatedPosts"));
    }

    #[test]
    fn numeric_date_becomes_text() {
        let meta: Metadata = serde_yaml::from_str("title: A\nslug: a\ndate: 2024\n").unwrap();
        assert_eq!(meta.date.as_deref(), Some("2024"));
    }

    #[test]
    fn list_item_defaults_missing_date_to_empty() {
        let record = ContentRecord {
            absolute_path: PathBuf::from("/content/blog/a.mdx"),
            body: String::new(),
            metadata: Metadata {
                title: "A".into(),
                slug: "a".into(),
                ..Metadata::default()
            },
        };
        let item = record.list_item();
        assert_eq!(item.date, "");
        assert_eq!(item.slug, "a");
    }

    #[test]
    fn category_descriptor_reads_camel_case() {
        let cat: CategoryDescriptor = serde_json::from_str(
            r#"{"slug":"slabs","name":"Slabs","featureCalculator":"slab"}"#,
        )
        .unwrap();
        assert_eq!(cat.feature_calculator.as_deref(), Some("slab"));
        assert_eq!(cat.description, None);
    }
}
