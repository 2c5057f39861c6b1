//! Search, tag filtering, date ordering and pagination of content lists.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use time::Date;

use crate::domain::content::{BlogPost, License, Portfolio, parse_date};

/// Items per page when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(6) {
    Some(size) => size,
    None => unreachable!(),
};

/// Content that can appear in a public list page.
pub trait Listable {
    fn title(&self) -> &str;

    /// Secondary text searched alongside the title.
    fn body(&self) -> &str;

    fn tags(&self) -> &[String];

    /// Raw date string the list is ordered by.
    fn sort_date(&self) -> &str;
}

impl Listable for Portfolio {
    fn title(&self) -> &str {
        &self.title
    }

    fn body(&self) -> &str {
        &self.description
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn sort_date(&self) -> &str {
        &self.start_date
    }
}

impl Listable for BlogPost {
    fn title(&self) -> &str {
        &self.title
    }

    fn body(&self) -> &str {
        &self.content
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn sort_date(&self) -> &str {
        &self.date
    }
}

impl Listable for License {
    fn title(&self) -> &str {
        &self.name
    }

    fn body(&self) -> &str {
        &self.issuing_organization
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn sort_date(&self) -> &str {
        &self.issue_date
    }
}

/// Filter inputs taken from the list page query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub search: Option<String>,
    pub tag: Option<String>,
}

impl ListingQuery {
    pub fn new(search: Option<String>, tag: Option<String>) -> Self {
        Self {
            search: search
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            tag: tag
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.tag.is_none()
    }

    fn matches<T: Listable>(&self, item: &T, needle: Option<&str>) -> bool {
        let tagged = match self.tag.as_deref() {
            Some(tag) => item.tags().iter().any(|candidate| candidate == tag),
            None => true,
        };
        if !tagged {
            return false;
        }

        match needle {
            Some(needle) => {
                item.title().to_lowercase().contains(needle)
                    || item.body().to_lowercase().contains(needle)
            }
            None => true,
        }
    }
}

/// Keep the items matching `query`, newest first.
///
/// The sort is stable, so items sharing a date keep their input order. Items
/// whose date does not parse come after every dated item.
pub fn filter_and_sort<T: Listable>(items: Vec<T>, query: &ListingQuery) -> Vec<T> {
    let needle = query.search.as_deref().map(str::to_lowercase);
    let mut matched: Vec<(Option<Date>, T)> = items
        .into_iter()
        .filter(|item| query.matches(item, needle.as_deref()))
        .map(|item| (parse_date(item.sort_date()), item))
        .collect();

    matched.sort_by(|(left, _), (right, _)| compare_newest_first(*left, *right));
    matched.into_iter().map(|(_, item)| item).collect()
}

fn compare_newest_first(left: Option<Date>, right: Option<Date>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Distinct tags across `items`, sorted.
pub fn all_tags<T: Listable>(items: &[T]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| item.tags().iter().cloned())
        .filter(|tag| !tag.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One page of a filtered list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// One-based page number that was requested.
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1 && self.page_count > 0
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }

    pub fn page_numbers(&self) -> Vec<usize> {
        (1..=self.page_count).collect()
    }
}

/// Slice out page `page` (one-based; zero is treated as one).
///
/// A page past the last one is empty rather than an error.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: NonZeroUsize) -> Page<T> {
    let page = page.max(1);
    let per_page = per_page.get();
    let total = items.len();
    let page_count = total.div_ceil(per_page);
    let start = (page - 1).saturating_mul(per_page);

    let items = items.into_iter().skip(start).take(per_page).collect();

    Page {
        items,
        page,
        page_count,
        total,
    }
}
