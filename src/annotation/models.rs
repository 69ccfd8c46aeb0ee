use crate::annotation::error::AnnotationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Suffix of every sidecar annotation object
pub const ANNOTATION_SUFFIX: &str = ".json";

/// Content type annotation objects are stored with
pub const ANNOTATION_CONTENT_TYPE: &str = "application/json";

/// Image file types the annotator lists, matched case-insensitively on the key suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpg,
    Jpeg,
    Bmp,
    Gif,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 5] = [
        ImageFormat::Png,
        ImageFormat::Jpg,
        ImageFormat::Jpeg,
        ImageFormat::Bmp,
        ImageFormat::Gif,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Gif => "gif",
        }
    }

    /// Recognize the format of an object key, if it is an image at all
    pub fn from_key(key: &str) -> Option<Self> {
        let lower = key.to_lowercase();
        Self::ALL.into_iter().find(|format| {
            lower
                .strip_suffix(format.extension())
                .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// Categories an image can be labeled with.
///
/// Serialized with the spelling the annotation bucket has always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "sánta")]
    Lame,
    #[serde(rename = "nem sánta")]
    NotLame,
    #[serde(rename = "nem eldönthető")]
    Undecidable,
    #[serde(rename = "súlypontáthelyezés")]
    WeightShift,
    #[serde(rename = "O-lábú")]
    BowLegged,
    #[serde(rename = "széttárt lábú")]
    SplayLegged,
    #[serde(rename = "nincs tehén a képen")]
    NoCow,
}

impl Label {
    pub const ALL: [Label; 7] = [
        Label::Lame,
        Label::NotLame,
        Label::Undecidable,
        Label::WeightShift,
        Label::BowLegged,
        Label::SplayLegged,
        Label::NoCow,
    ];

    /// The stored spelling of the label
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Lame => "sánta",
            Label::NotLame => "nem sánta",
            Label::Undecidable => "nem eldönthető",
            Label::WeightShift => "súlypontáthelyezés",
            Label::BowLegged => "O-lábú",
            Label::SplayLegged => "széttárt lábú",
            Label::NoCow => "nincs tehén a képen",
        }
    }

    /// ASCII alias accepted on the command line
    pub fn slug(&self) -> &'static str {
        match self {
            Label::Lame => "lame",
            Label::NotLame => "not-lame",
            Label::Undecidable => "undecidable",
            Label::WeightShift => "weight-shift",
            Label::BowLegged => "bow-legged",
            Label::SplayLegged => "splay-legged",
            Label::NoCow => "no-cow",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = AnnotationError;

    /// Accepts the stored spelling, the ASCII slug or a 1-based index into [`Label::ALL`]
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AnnotationError::UnknownLabel(String::new()));
        }

        if let Ok(index) = input.parse::<usize>() {
            return index
                .checked_sub(1)
                .and_then(|i| Self::ALL.get(i).copied())
                .ok_or_else(|| AnnotationError::UnknownLabel(input.to_string()));
        }

        let lower = input.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().to_lowercase() == lower || label.slug() == lower)
            .ok_or_else(|| AnnotationError::UnknownLabel(input.to_string()))
    }
}

/// One sidecar record. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Key of the image this record labels
    pub file: String,
    pub label: Label,
    pub comment: String,
    /// Email of the signed-in user who saved the record
    pub annotator: String,
}

impl AnnotationRecord {
    /// Encode as compact UTF-8 JSON; non-ASCII characters are written literally
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, AnnotationError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json_bytes(data: &[u8]) -> Result<Self, AnnotationError> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Strip the final extension from an object key.
///
/// Only the last path segment is considered and leading dots of that segment
/// never start an extension, so `a/.hidden` and `a/b` are returned unchanged.
pub fn base_name(key: &str) -> &str {
    let file_start = key.rfind('/').map(|i| i + 1).unwrap_or(0);
    let file = &key[file_start..];
    let leading_dots = file.len() - file.trim_start_matches('.').len();

    match file[leading_dots..].rfind('.') {
        Some(dot) => &key[..file_start + leading_dots + dot],
        None => key,
    }
}

/// Key of the sidecar record for an image: its base name plus `.json`
pub fn annotation_key(image_key: &str) -> String {
    format!("{}{}", base_name(image_key), ANNOTATION_SUFFIX)
}
