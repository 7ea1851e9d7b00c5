//! Entry check for a lesson test.
//!
//! Students must finish every kind of prerequisite content the lesson has;
//! teachers and admins may always enter to preview.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl Role {
    #[must_use]
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Teacher | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(ParseRoleError(other.to_owned())),
        }
    }
}

/// Prerequisite content kinds a lesson may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Video,
    Text,
    Slides,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentKind::Video => "video",
            ContentKind::Text => "text",
            ContentKind::Slides => "slides",
        })
    }
}

/// Which content the lesson has and which of it the learner has consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ContentConsumption {
    pub has_video: bool,
    pub video_done: bool,
    pub has_text: bool,
    pub text_done: bool,
    pub has_slides: bool,
    pub slides_done: bool,
}

impl ContentConsumption {
    /// Content present in the lesson but not yet consumed.
    #[must_use]
    pub fn pending(&self) -> Vec<ContentKind> {
        [
            (self.has_video, self.video_done, ContentKind::Video),
            (self.has_text, self.text_done, ContentKind::Text),
            (self.has_slides, self.slides_done, ContentKind::Slides),
        ]
        .into_iter()
        .filter(|(present, done, _)| *present && !*done)
        .map(|(_, _, kind)| kind)
        .collect()
    }
}

/// Result of the gate check, with the content still blocking a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    pub pending: Vec<ContentKind>,
}

#[must_use]
pub fn evaluate(role: Role, consumption: &ContentConsumption) -> GateDecision {
    let pending = consumption.pending();
    GateDecision {
        allowed: role.is_privileged() || pending.is_empty(),
        pending,
    }
}

#[must_use]
pub fn can_enter_test(role: Role, consumption: &ContentConsumption) -> bool {
    evaluate(role, consumption).allowed
}
