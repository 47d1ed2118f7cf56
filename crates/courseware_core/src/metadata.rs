use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("unknown content type {0:?}")]
    UnknownKind(String),
    #[error("field {field} must be an integer, got {value:?}")]
    NotAnInteger { field: &'static str, value: String },
}

/// Kind of content a course module carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Text,
    Video,
    Pdf,
}

impl ContentKind {
    pub fn as_tag(self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Video => "video",
            ContentKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for ContentKind {
    type Err = MetadataError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let tag = raw.trim();
        if tag.eq_ignore_ascii_case("text") || tag.eq_ignore_ascii_case("texto") {
            Ok(ContentKind::Text)
        } else if tag.eq_ignore_ascii_case("video") {
            Ok(ContentKind::Video)
        } else if tag.eq_ignore_ascii_case("pdf") {
            Ok(ContentKind::Pdf)
        } else {
            Err(MetadataError::UnknownKind(raw.to_string()))
        }
    }
}

/// Raw module form values as typed by an author.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleForm {
    pub title: String,
    pub type_tag: String,
    pub order: String,
    pub course_id: String,
}

/// Module metadata with numeric fields coerced to integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMetadata {
    pub title: String,
    pub kind: ContentKind,
    pub order: u32,
    pub course_id: i64,
}

impl ModuleForm {
    pub fn parse(&self) -> Result<ModuleMetadata, MetadataError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(MetadataError::EmptyTitle);
        }
        let kind = self.type_tag.parse()?;
        let order = parse_integer("order", &self.order)?;
        let course_id = parse_integer("course_id", &self.course_id)?;
        Ok(ModuleMetadata {
            title: title.to_string(),
            kind,
            order,
            course_id,
        })
    }
}

fn parse_integer<T: FromStr>(field: &'static str, raw: &str) -> Result<T, MetadataError> {
    raw.trim()
        .parse()
        .map_err(|_| MetadataError::NotAnInteger {
            field,
            value: raw.to_string(),
        })
}
