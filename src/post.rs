use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const BUILTIN_POSTS: &str = include_str!("../content/posts.yaml");

/// One blog article. Every field is free text; nothing is validated and a
/// missing field simply renders empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("post file {0} has an unsupported extension (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            _ => Err(ContentError::UnsupportedFormat(path.display().to_string()).into()),
        }
    }
}

/// Ordered, immutable list of posts loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Store {
    posts: Vec<Post>,
    dropped_duplicates: usize,
}

impl Store {
    pub fn from_posts(posts: Vec<Post>, dedupe_ids: bool) -> Self {
        if !dedupe_ids {
            return Self {
                posts,
                dropped_duplicates: 0,
            };
        }

        let before = posts.len();
        let mut seen: HashSet<String> = HashSet::new();
        let posts: Vec<Post> = posts
            .into_iter()
            .filter(|post| post.id.is_empty() || seen.insert(post.id.clone()))
            .collect();
        let dropped_duplicates = before - posts.len();
        if dropped_duplicates > 0 {
            log::warn!("post store: dropped {dropped_duplicates} entries with duplicate ids");
        }
        Self {
            posts,
            dropped_duplicates,
        }
    }

    pub fn parse(data: &str, format: Format, dedupe_ids: bool) -> Result<Self> {
        let posts: Vec<Post> = match format {
            Format::Yaml => serde_yaml::from_str(data).context("post store: parse yaml")?,
            Format::Json => serde_json::from_str(data).context("post store: parse json")?,
        };
        Ok(Self::from_posts(posts, dedupe_ids))
    }

    pub fn load(path: &Path, dedupe_ids: bool) -> Result<Self> {
        let format = Format::from_path(path)?;
        let data = fs::read_to_string(path)
            .with_context(|| format!("post store: read {}", path.display()))?;
        let store = Self::parse(&data, format, dedupe_ids)
            .with_context(|| format!("post store: load {}", path.display()))?;
        log::info!(
            "post store: loaded {} posts from {}",
            store.len(),
            path.display()
        );
        Ok(store)
    }

    pub fn builtin(dedupe_ids: bool) -> Result<Self> {
        Self::parse(BUILTIN_POSTS, Format::Yaml, dedupe_ids).context("post store: builtin posts")
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// First post carrying `id`. Later duplicates are never returned.
    pub fn get(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn dropped_duplicates(&self) -> usize {
        self.dropped_duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn post(id: &str, title: &str) -> Post {
        Post {
            id: id.into(),
            title: title.into(),
            category: "Health".into(),
            ..Post::default()
        }
    }

    #[test]
    fn builtin_posts_parse() {
        let store = Store::builtin(true).unwrap();
        assert!(store.len() >= 2);
        assert_eq!(store.posts()[0].id, "post-20251209-891");
        assert_eq!(store.dropped_duplicates(), 0);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let store = Store::from_posts(
            vec![post("a", "first"), post("b", "other"), post("a", "second")],
            true,
        );
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").unwrap().title, "first");
        assert_eq!(store.dropped_duplicates(), 1);
    }

    #[test]
    fn duplicates_preserved_when_dedupe_disabled() {
        let store = Store::from_posts(vec![post("a", "first"), post("a", "second")], false);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").unwrap().title, "first");
    }

    #[test]
    fn empty_ids_are_never_deduplicated() {
        let store = Store::from_posts(vec![post("", "one"), post("", "two")], true);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let store = Store::parse("- id: x\n  title: Only a title\n", Format::Yaml, true).unwrap();
        let post = store.get("x").unwrap();
        assert_eq!(post.excerpt, "");
        assert_eq!(post.content, "");
    }

    #[test]
    fn load_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("posts.json");
        fs::write(
            &path,
            r#"[{"id":"j1","title":"Json","category":"Education","date":"today"}]"#,
        )
        .unwrap();
        let store = Store::load(&path, true).unwrap();
        assert_eq!(store.get("j1").unwrap().category, "Education");
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("posts.txt");
        fs::write(&path, "[]").unwrap();
        assert!(Store::load(&path, true).is_err());
    }
}
