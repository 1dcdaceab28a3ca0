use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

pub const DEFAULT_HEADER_IMAGE: &str = "technology_community.png";

struct Rule {
    keywords: &'static [&'static str],
    asset: &'static str,
}

// Checked in order; the first rule with a keyword contained in the category wins.
const RULES: &[Rule] = &[
    Rule {
        keywords: &["woman", "women", "empowerment", "gender"],
        asset: "woman_empowerment.png",
    },
    Rule {
        keywords: &["health"],
        asset: "health.png",
    },
    Rule {
        keywords: &["agriculture"],
        asset: "agriculture.png",
    },
    Rule {
        keywords: &["education", "learning"],
        asset: "education.png",
    },
    Rule {
        keywords: &["governance"],
        asset: "governance.png",
    },
    Rule {
        keywords: &["environment", "climate"],
        asset: "environment.png",
    },
    Rule {
        keywords: &["social", "impact"],
        asset: "social_impact.png",
    },
];

/// Header image file name for a post category.
pub fn header_asset(category: &str) -> &'static str {
    let needle = category.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| needle.contains(*kw)))
        .map(|rule| rule.asset)
        .unwrap_or(DEFAULT_HEADER_IMAGE)
}

#[derive(Debug, Clone)]
pub struct Resolver {
    header_dir: PathBuf,
}

impl Resolver {
    pub fn new(header_dir: impl Into<PathBuf>) -> Self {
        Self {
            header_dir: header_dir.into(),
        }
    }

    pub fn resolve(&self, category: &str) -> PathBuf {
        self.header_dir.join(header_asset(category))
    }

    pub fn default_image(&self) -> PathBuf {
        self.header_dir.join(DEFAULT_HEADER_IMAGE)
    }
}

/// Image source for one rendered card. The category fallback is resolved at
/// most once per slot, so a failing fallback never triggers another lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    category: String,
    current: PathBuf,
    fell_back: bool,
}

impl ImageSlot {
    pub fn new(category: impl Into<String>, primary: PathBuf) -> Self {
        Self {
            category: category.into(),
            current: primary,
            fell_back: false,
        }
    }

    pub fn current(&self) -> &Path {
        &self.current
    }

    pub fn fell_back(&self) -> bool {
        self.fell_back
    }

    /// Returns the replacement source on the first failure and `None` on
    /// every later one.
    pub fn on_error(&mut self, resolver: &Resolver) -> Option<&Path> {
        if self.fell_back {
            return None;
        }
        self.fell_back = true;
        self.current = resolver.resolve(&self.category);
        Some(&self.current)
    }
}

/// Outcome of a [`Chain`]: the value plus which attempt produced it.
#[derive(Debug)]
pub struct Resolved<T> {
    pub value: T,
    pub label: String,
    pub index: usize,
}

type Attempt<'a, T> = Box<dyn FnOnce() -> Result<T> + 'a>;

/// Ordered list of provider attempts consumed first-success-wins.
pub struct Chain<'a, T> {
    attempts: Vec<(String, Attempt<'a, T>)>,
}

impl<'a, T> Default for Chain<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> Chain<'a, T> {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    pub fn then<F>(mut self, label: impl Into<String>, attempt: F) -> Self
    where
        F: FnOnce() -> Result<T> + 'a,
    {
        self.attempts.push((label.into(), Box::new(attempt)));
        self
    }

    /// Runs attempts in order and stops at the first success. Later
    /// attempts are never invoked.
    pub fn resolve(self) -> Result<Resolved<T>> {
        let mut last_err = None;
        for (index, (label, attempt)) in self.attempts.into_iter().enumerate() {
            match attempt() {
                Ok(value) => {
                    return Ok(Resolved {
                        value,
                        label,
                        index,
                    })
                }
                Err(err) => {
                    log::debug!("fallback: {label} failed: {err:#}");
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("fallback: no providers configured")))
    }
}

/// Provider that succeeds with `path` when the file exists.
pub fn existing_file(path: PathBuf) -> impl FnOnce() -> Result<PathBuf> {
    move || {
        if path.is_file() {
            Ok(path)
        } else {
            Err(anyhow!("missing file {}", path.display()))
        }
    }
}

/// Picks a card image: the post infographic, then the category header, then
/// the default header, which is returned even when it is absent on disk.
pub fn card_image(infographic: PathBuf, category: &str, resolver: &Resolver) -> PathBuf {
    let default_image = resolver.default_image();
    Chain::new()
        .then("infographic", existing_file(infographic))
        .then("category header", existing_file(resolver.resolve(category)))
        .resolve()
        .map(|resolved| resolved.value)
        .unwrap_or(default_image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn women_empowerment_maps_to_empowerment_header() {
        assert_eq!(header_asset("Women Empowerment"), "woman_empowerment.png");
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        assert_eq!(header_asset("Public HEALTH"), "health.png");
        assert_eq!(header_asset("Agriculture & Livelihood"), "agriculture.png");
        assert_eq!(header_asset("Environment & Climate"), "environment.png");
        assert_eq!(header_asset("e-learning"), "education.png");
    }

    #[test]
    fn first_rule_wins() {
        // both the empowerment and social rules match
        assert_eq!(header_asset("Social Empowerment"), "woman_empowerment.png");
        assert_eq!(header_asset("Social Impact"), "social_impact.png");
    }

    #[test]
    fn unknown_category_uses_default() {
        assert_eq!(header_asset("Robotics"), DEFAULT_HEADER_IMAGE);
        assert_eq!(header_asset(""), DEFAULT_HEADER_IMAGE);
    }

    #[test]
    fn image_slot_resolves_only_once() {
        let resolver = Resolver::new("/headers");
        let mut slot = ImageSlot::new(
            "Women Empowerment",
            PathBuf::from("/blog/infographics/p.png"),
        );
        let first = slot.on_error(&resolver).map(Path::to_path_buf);
        assert_eq!(
            first,
            Some(PathBuf::from("/headers/woman_empowerment.png"))
        );
        assert!(slot.on_error(&resolver).is_none());
        assert_eq!(slot.current(), Path::new("/headers/woman_empowerment.png"));
        assert!(slot.fell_back());
    }

    #[test]
    fn chain_stops_at_first_success() {
        let calls = Cell::new(0);
        let resolved = Chain::<i32>::new()
            .then("broken", || {
                calls.set(calls.get() + 1);
                Err(anyhow!("nope"))
            })
            .then("works", || {
                calls.set(calls.get() + 1);
                Ok(7)
            })
            .then("never", || {
                calls.set(calls.get() + 1);
                Ok(9)
            })
            .resolve()
            .unwrap();
        assert_eq!(resolved.value, 7);
        assert_eq!(resolved.label, "works");
        assert_eq!(resolved.index, 1);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn chain_reports_last_failure() {
        let err = Chain::<()>::new()
            .then("a", || Err(anyhow!("first")))
            .then("b", || Err(anyhow!("second")))
            .resolve()
            .unwrap_err();
        assert_eq!(err.to_string(), "second");
        assert!(Chain::<()>::new().resolve().is_err());
    }

    #[test]
    fn card_image_walks_the_chain() {
        let dir = tempdir().unwrap();
        let headers = dir.path().join("headers");
        fs::create_dir_all(&headers).unwrap();
        let resolver = Resolver::new(&headers);
        let infographic = dir.path().join("post.png");

        assert_eq!(
            card_image(infographic.clone(), "Health", &resolver),
            headers.join(DEFAULT_HEADER_IMAGE)
        );

        fs::write(headers.join("health.png"), b"png").unwrap();
        assert_eq!(
            card_image(infographic.clone(), "Health", &resolver),
            headers.join("health.png")
        );

        fs::write(&infographic, b"png").unwrap();
        assert_eq!(card_image(infographic.clone(), "Health", &resolver), infographic);
    }
}
