use serde::Deserialize;

use crate::{
    application::confirm::Confirmation,
    domain::content::{Badge, parse_date},
};

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmForm {
    pub(crate) outcome: Confirmation,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExperienceForm {
    #[serde(default)]
    pub(crate) company: String,
    #[serde(default)]
    pub(crate) position: String,
    #[serde(default)]
    pub(crate) start_date: String,
    #[serde(default)]
    pub(crate) end_date: String,
    #[serde(default)]
    pub(crate) description: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EducationForm {
    #[serde(default)]
    pub(crate) institution: String,
    #[serde(default)]
    pub(crate) degree: String,
    #[serde(default)]
    pub(crate) start_date: String,
    #[serde(default)]
    pub(crate) end_date: String,
}

/// Collects the messages shown above an editor when a submission is rejected.
#[derive(Debug, Default)]
pub(super) struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub(super) fn required(mut self, label: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors.push(format!("{label} is required."));
        }
        self
    }

    /// A blank value passes; anything else must be a `YYYY-MM-DD` date.
    pub(super) fn date(mut self, label: &str, value: &str) -> Self {
        if !value.trim().is_empty() && parse_date(value.trim()).is_none() {
            self.errors
                .push(format!("{label} must be a date (YYYY-MM-DD)."));
        }
        self
    }

    pub(super) fn finish(self) -> Vec<String> {
        self.errors
    }
}

/// Comma separated tags, trimmed and de-duplicated in order.
pub(super) fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()) {
        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

pub(super) fn split_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// One badge per `name|icon|color` line; icon and color may be omitted.
pub(super) fn parse_badges(raw: &str) -> Vec<Badge> {
    split_lines(raw)
        .into_iter()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '|').map(str::trim);
            let name = parts.next().filter(|name| !name.is_empty())?;
            Some(Badge {
                name: name.to_string(),
                icon: parts.next().unwrap_or("").to_string(),
                color: parts.next().unwrap_or("").to_string(),
            })
        })
        .collect()
}

pub(super) fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_unique() {
        assert_eq!(split_tags(" rust, web ,, rust,wasm "), ["rust", "web", "wasm"]);
        assert!(split_tags("  ").is_empty());
    }

    #[test]
    fn badges_tolerate_missing_parts() {
        let badges = parse_badges("Rust|rust|#dea584\n\nGo\n|orphan|#fff");
        assert_eq!(badges.len(), 2);
        assert_eq!(badges[0].color, "#dea584");
        assert_eq!(badges[1].name, "Go");
        assert_eq!(badges[1].icon, "");
    }

    #[test]
    fn validator_reports_every_problem() {
        let errors = Validator::default()
            .required("Title", " ")
            .required("Date", "2024-01-01")
            .date("Date", "01/02/2024")
            .date("End date", "")
            .finish();
        assert_eq!(
            errors,
            ["Title is required.", "Date must be a date (YYYY-MM-DD)."]
        );
    }
}
