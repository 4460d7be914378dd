//! Search bar filtering over a fetched subject snapshot.
//!
//! Stages run name, major, university, then tags. Only the tag stage needs
//! the backend: one stats lookup per remaining subject, issued together.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;

use crate::backend::RatingBackend;
use crate::Subject;

/// Subjects shown per "page" of the subject grid.
pub const PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectQuery {
    pub name: String,
    pub major: Option<String>,
    pub university: Option<String>,
    pub tags: Vec<String>,
}

pub fn matches_name(subject: &Subject, query: &str) -> bool {
    subject
        .name
        .trim()
        .to_lowercase()
        .contains(&query.trim().to_lowercase())
}

fn matches_exact(value: Option<&str>, selected: Option<&str>) -> bool {
    match selected {
        None => true,
        Some(selected) => value.is_some_and(|value| value.to_lowercase() == selected.to_lowercase()),
    }
}

pub fn matches_major(subject: &Subject, major: Option<&str>) -> bool {
    matches_exact(subject.major.as_deref(), major)
}

pub fn matches_university(subject: &Subject, university: Option<&str>) -> bool {
    matches_exact(subject.university.as_deref(), university)
}

/// Every requested tag has to be among the subject's top tags.
pub fn matches_tags(requested: &[String], top_tags: &[String]) -> bool {
    requested.iter().all(|tag| top_tags.contains(tag))
}

/// The stages that need nothing but the snapshot.
pub fn filter_local(subjects: &[Subject], query: &SubjectQuery) -> Vec<Subject> {
    subjects
        .iter()
        .filter(|subject| matches_name(subject, &query.name))
        .filter(|subject| matches_major(subject, query.major.as_deref()))
        .filter(|subject| matches_university(subject, query.university.as_deref()))
        .cloned()
        .collect()
}

/// Keeps subjects whose current top tags contain every requested tag.
///
/// A subject whose stats can't be fetched is dropped from the result.
pub async fn filter_by_tags<B: RatingBackend + ?Sized>(
    backend: &B,
    subjects: Vec<Subject>,
    tags: &[String],
) -> Vec<Subject> {
    if tags.is_empty() {
        return subjects;
    }

    let lookups = subjects.into_iter().map(|subject| async move {
        match backend.subject_stats(&subject.id).await {
            Ok(stats) => {
                let top_tags = stats.map(|s| s.top_tags()).unwrap_or_default();
                matches_tags(tags, &top_tags).then_some(subject)
            }
            Err(err) => {
                tracing::warn!(subject = %subject.name, %err, "can't fetch stats for tag filter");
                None
            }
        }
    });

    join_all(lookups).await.into_iter().flatten().collect()
}

pub async fn filter_subjects<B: RatingBackend + ?Sized>(
    backend: &B,
    subjects: &[Subject],
    query: &SubjectQuery,
) -> Vec<Subject> {
    let narrowed = filter_local(subjects, query);
    filter_by_tags(backend, narrowed, &query.tags).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterTicket(u64);

/// Hands out tickets so only the newest filter run gets to publish.
#[derive(Debug, Clone, Default)]
pub struct FilterSession {
    generation: Arc<AtomicU64>,
}

impl FilterSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> FilterTicket {
        FilterTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: FilterTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Runs a filter under `ticket` and returns its result, or `None` if a
    /// newer ticket was issued meanwhile.
    ///
    /// Take the ticket with [`FilterSession::begin`] when the request is made,
    /// not when the future is first polled.
    pub async fn run<B: RatingBackend + ?Sized>(
        &self,
        ticket: FilterTicket,
        backend: &B,
        subjects: &[Subject],
        query: &SubjectQuery,
    ) -> Option<Vec<Subject>> {
        let filtered = filter_subjects(backend, subjects, query).await;

        if self.is_current(ticket) {
            Some(filtered)
        } else {
            tracing::debug!("discarding superseded filter result");
            None
        }
    }
}

/// What the subject grid shows.
#[derive(Debug, PartialEq)]
pub enum ListingView<'a> {
    Loading,
    Empty,
    Subjects(&'a [Subject]),
}

/// Filtered subjects plus whether the first current result is still pending.
#[derive(Debug, Clone)]
pub struct Listing {
    filtered: Vec<Subject>,
    loading: bool,
}

impl Default for Listing {
    fn default() -> Self {
        Self {
            filtered: Vec::new(),
            loading: true,
        }
    }
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a filter result; superseded (`None`) results change nothing.
    pub fn apply(&mut self, result: Option<Vec<Subject>>) -> bool {
        match result {
            Some(filtered) => {
                self.filtered = filtered;
                self.loading = false;
                true
            }
            None => false,
        }
    }

    /// The subject fetch failed; there is nothing left to wait for.
    pub fn fail(&mut self) {
        self.loading = false;
    }

    pub fn filtered(&self) -> &[Subject] {
        &self.filtered
    }

    pub fn view(&self) -> ListingView<'_> {
        if self.loading {
            ListingView::Loading
        } else if self.filtered.is_empty() {
            ListingView::Empty
        } else {
            ListingView::Subjects(&self.filtered)
        }
    }
}

/// Distinct non-empty values in first-seen order.
pub fn distinct_values<'a, F>(subjects: &'a [Subject], field: F) -> Vec<String>
where
    F: Fn(&'a Subject) -> Option<&'a str>,
{
    let mut values: Vec<String> = Vec::new();

    for value in subjects.iter().filter_map(field) {
        let value = value.trim();
        if !value.is_empty() && !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }

    values
}

pub fn majors(subjects: &[Subject]) -> Vec<String> {
    distinct_values(subjects, |s| s.major.as_deref())
}

pub fn universities(subjects: &[Subject]) -> Vec<String> {
    distinct_values(subjects, |s| s.university.as_deref())
}

#[derive(Debug, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub has_more: bool,
}

/// The first `pages_shown` pages of `items`.
pub fn paginate<T>(items: &[T], pages_shown: usize, per_page: usize) -> Page<'_, T> {
    let visible = pages_shown.max(1).saturating_mul(per_page).min(items.len());

    Page {
        items: &items[..visible],
        has_more: visible < items.len(),
    }
}
