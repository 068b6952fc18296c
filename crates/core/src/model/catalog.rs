use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CourseId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("invalid catalog document: {0}")]
    Parse(String),

    #[error("course {0} appears more than once")]
    DuplicateCourse(CourseId),
}

/// One video of a course, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseVideo {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Marketing hint shown on the listing; actual playability comes from
    /// the unlock policy.
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEntry {
    pub id: CourseId,
    pub title: String,
    pub videos: Vec<CourseVideo>,
}

#[derive(Deserialize)]
struct CatalogDocument {
    courses: Vec<CourseEntry>,
}

/// Static course → video list table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseCatalog {
    courses: Vec<CourseEntry>,
}

impl CourseCatalog {
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateCourse` if two entries share an id.
    pub fn new(courses: Vec<CourseEntry>) -> Result<Self, CatalogError> {
        for (pos, entry) in courses.iter().enumerate() {
            if courses[..pos].iter().any(|other| other.id == entry.id) {
                return Err(CatalogError::DuplicateCourse(entry.id.clone()));
            }
        }
        Ok(Self { courses })
    }

    /// Parses `{"courses": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON and
    /// `CatalogError::DuplicateCourse` for repeated ids.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument =
            serde_json::from_str(raw).map_err(|err| CatalogError::Parse(err.to_string()))?;
        Self::new(doc.courses)
    }

    /// Built-in catalog used when no catalog file is configured.
    #[must_use]
    pub fn demo() -> Self {
        fn video(id: &str, title: &str, description: &str, locked: bool) -> CourseVideo {
            CourseVideo {
                url: format!("https://www.youtube.com/watch?v={id}"),
                title: title.to_owned(),
                description: description.to_owned(),
                locked,
            }
        }
        fn course(id: &str, title: &str, videos: Vec<CourseVideo>) -> CourseEntry {
            CourseEntry {
                id: CourseId(id.to_owned()),
                title: title.to_owned(),
                videos,
            }
        }

        Self {
            courses: vec![
                course(
                    "shopify-starter",
                    "Shopify Starter",
                    vec![
                        video("Zr7Ad2wE3kQ", "Opening your store", "Account and plan setup.", false),
                        video("p1Q5sRcT2wE", "Themes and pages", "Picking a theme and core pages.", true),
                        video("m4Nd8xLz0aB", "Your first product", "Listing, pricing and stock.", true),
                    ],
                ),
                course(
                    "tiktok-ads-mini",
                    "TikTok Ads Mini Course",
                    vec![
                        video("tK9dWq2Lm3s", "Ads Manager tour", "Where everything lives.", false),
                        video("hY6vBn1Qe7r", "Creative that converts", "Hooks and formats.", true),
                        video("cX3zAs5Df8g", "Budgets and bidding", "Scaling without waste.", true),
                    ],
                ),
                course(
                    "dropshipping-basics",
                    "Dropshipping Basics",
                    vec![
                        video("aB2cD3eF4gH", "How dropshipping works", "The business model.", false),
                        video("iJ5kL6mN7oP", "Finding suppliers", "Vetting and sampling.", true),
                        video("qR8sT9uV0wX", "Product research", "Spotting winners.", true),
                        video("yZ1aB2cD3eF", "Fulfilment flow", "From order to doorstep.", true),
                    ],
                ),
            ],
        }
    }

    #[must_use]
    pub fn courses(&self) -> &[CourseEntry] {
        &self.courses
    }

    #[must_use]
    pub fn course(&self, id: &CourseId) -> Option<&CourseEntry> {
        self.courses.iter().find(|entry| &entry.id == id)
    }

    /// Ordered videos of a course; empty for unknown courses.
    #[must_use]
    pub fn videos(&self, id: &CourseId) -> &[CourseVideo] {
        self.course(id).map_or(&[], |entry| entry.videos.as_slice())
    }

    /// Video count of a course; 0 for unknown courses.
    #[must_use]
    pub fn total_videos(&self, id: &CourseId) -> u32 {
        u32::try_from(self.videos(id).len()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> CourseId {
        CourseId::new(raw).unwrap()
    }

    #[test]
    fn demo_catalog_sizes() {
        let catalog = CourseCatalog::demo();
        assert_eq!(catalog.total_videos(&id("shopify-starter")), 3);
        assert_eq!(catalog.total_videos(&id("tiktok-ads-mini")), 3);
        assert_eq!(catalog.total_videos(&id("dropshipping-basics")), 4);
    }

    #[test]
    fn unknown_course_has_no_videos() {
        let catalog = CourseCatalog::demo();
        assert_eq!(catalog.total_videos(&id("nope")), 0);
        assert!(catalog.videos(&id("nope")).is_empty());
    }

    #[test]
    fn parses_catalog_document() {
        let raw = r#"{"courses":[{"id":"intro","title":"Intro","videos":[
            {"url":"https://youtu.be/abc","title":"One"},
            {"url":"https://youtu.be/def","title":"Two","locked":true}]}]}"#;
        let catalog = CourseCatalog::from_json(raw).unwrap();
        let videos = catalog.videos(&id("intro"));
        assert_eq!(videos.len(), 2);
        assert!(videos[1].locked);
        assert_eq!(videos[0].description, "");
    }

    #[test]
    fn rejects_duplicate_courses() {
        let raw = r#"{"courses":[{"id":"a","title":"A","videos":[]},
            {"id":"a","title":"A again","videos":[]}]}"#;
        assert_eq!(
            CourseCatalog::from_json(raw),
            Err(CatalogError::DuplicateCourse(id("a")))
        );
    }

    #[test]
    fn rejects_malformed_document() {
        assert!(matches!(
            CourseCatalog::from_json("{not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
