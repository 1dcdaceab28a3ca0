use std::collections::{HashMap, HashSet};

use crate::post::Post;

pub const DEFAULT_FEATURED_CAP: usize = 4;

/// Partition of the post store into the featured grid and the archive.
///
/// `featured` holds at most `cap` posts with pairwise distinct categories;
/// `archived` holds everything else. Both keep post store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySet {
    pub featured: Vec<Post>,
    pub archived: Vec<Post>,
}

/// Splits `posts` into featured and archived sets.
///
/// A post is featured when fewer than `cap` posts have been featured so far
/// and its category has not been featured yet. Once the cap is reached every
/// remaining post is archived, even one with a category never seen before.
pub fn select(posts: &[Post], cap: usize) -> DisplaySet {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut set = DisplaySet::default();

    for post in posts {
        if set.featured.len() < cap && !seen.contains(post.category.as_str()) {
            seen.insert(post.category.as_str());
            set.featured.push(post.clone());
        } else {
            set.archived.push(post.clone());
        }
    }

    set
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub category: String,
    pub posts: Vec<Post>,
}

/// Archived posts grouped by category, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveGrouping {
    groups: Vec<CategoryGroup>,
}

impl ArchiveGrouping {
    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    pub fn get(&self, category: &str) -> Option<&[Post]> {
        self.groups
            .iter()
            .find(|group| group.category == category)
            .map(|group| group.posts.as_slice())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.category.as_str())
    }

    /// Flattened archive entries in display order.
    pub fn entries(&self) -> impl Iterator<Item = &Post> {
        self.groups.iter().flat_map(|group| group.posts.iter())
    }

    pub fn post_count(&self) -> usize {
        self.groups.iter().map(|group| group.posts.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub fn group(archived: &[Post]) -> ArchiveGrouping {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<CategoryGroup> = Vec::new();

    for post in archived {
        let slot = *index.entry(post.category.as_str()).or_insert_with(|| {
            groups.push(CategoryGroup {
                category: post.category.clone(),
                posts: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].posts.push(post.clone());
    }

    ArchiveGrouping { groups }
}
