//! Human-readable identifiers for portfolio entries and blog posts.
//!
//! A slug is the normalized title followed by a random five digit suffix
//! (`hello-world-48213`). Repeated calls with the same title yield different
//! slugs, and no uniqueness check is made against stored records.

use rand::Rng;
use thiserror::Error;

const SUFFIX_MIN: u32 = 10_000;
const SUFFIX_MAX: u32 = 99_999;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Normalize a title into the deterministic part of a slug.
///
/// Lowercases, drops everything outside `[a-z0-9 -]`, turns whitespace runs
/// into a single hyphen and collapses repeated hyphens.
pub fn slug_base(title: &str) -> Result<String, SlugError> {
    if title.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let lowered = title.to_lowercase();
    let mut base = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for ch in lowered.chars() {
        match ch {
            'a'..='z' | '0'..='9' => {
                if pending_space {
                    push_hyphen(&mut base);
                    pending_space = false;
                }
                base.push(ch);
            }
            ' ' => pending_space = true,
            '-' => {
                if pending_space {
                    pending_space = false;
                }
                push_hyphen(&mut base);
            }
            _ => {}
        }
    }

    let trimmed = base.trim_matches('-');
    if trimmed.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: title.to_string(),
        });
    }

    Ok(trimmed.to_string())
}

/// Derive a slug from `title` and append a random suffix in `10000..=99999`.
pub fn slugify(title: &str) -> Result<String, SlugError> {
    let base = slug_base(title)?;
    let suffix = rand::thread_rng().gen_range(SUFFIX_MIN..=SUFFIX_MAX);
    Ok(format!("{base}-{suffix}"))
}

fn push_hyphen(buffer: &mut String) {
    if !buffer.ends_with('-') {
        buffer.push('-');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_suffix(slug: &str) -> (&str, &str) {
        slug.rsplit_once('-').expect("suffix separator")
    }

    #[test]
    fn hello_world_matches_expected_shape() {
        let slug = slugify("Hello, World!").expect("slug");
        let (base, suffix) = split_suffix(&slug);
        assert_eq!(base, "hello-world");
        assert_eq!(suffix.len(), 5);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        let value: u32 = suffix.parse().expect("numeric suffix");
        assert!((SUFFIX_MIN..=SUFFIX_MAX).contains(&value));
    }

    #[test]
    fn successive_calls_differ() {
        // Ten draws from 90_000 values colliding every time is not a realistic outcome.
        let first = slugify("Same Title").expect("slug");
        let distinct = (0..10)
            .map(|_| slugify("Same Title").expect("slug"))
            .any(|slug| slug != first);
        assert!(distinct);
    }

    #[test]
    fn whitespace_and_hyphen_runs_collapse() {
        assert_eq!(
            slug_base("Rust   --  Axum Guide").expect("base"),
            "rust-axum-guide"
        );
        assert_eq!(slug_base("tab\tseparated").expect("base"), "tabseparated");
        assert_eq!(slug_base("a - - b").expect("base"), "a-b");
    }

    #[test]
    fn non_ascii_characters_are_dropped() {
        assert_eq!(slug_base("Café Über 2024").expect("base"), "caf-ber-2024");
    }

    #[test]
    fn edge_hyphens_are_trimmed() {
        assert_eq!(slug_base("  (Draft) notes  ").expect("base"), "draft-notes");
    }

    #[test]
    fn empty_and_unrepresentable_titles_fail() {
        assert_eq!(slug_base("   "), Err(SlugError::EmptyInput));
        assert_eq!(
            slugify("!!!"),
            Err(SlugError::Unrepresentable {
                input: "!!!".to_string()
            })
        );
    }
}
