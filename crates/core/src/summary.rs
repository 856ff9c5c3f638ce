//! Confirmation text for a pending membership change

use crate::codec::GrantAtom;
use serde::{Deserialize, Serialize};

/// Countries and datasets touched by the added grants, deduplicated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub countries: Vec<String>,
    pub unique_datasets: Vec<String>,
}

/// Summarize added grants.
///
/// Input is sorted before deduplication, so the result is the same no matter
/// how the caller's collection happens to iterate.
pub fn summarize<'a, I>(added_grants: I) -> Summary
where
    I: IntoIterator<Item = &'a GrantAtom>,
{
    let mut grants: Vec<&GrantAtom> = added_grants.into_iter().collect();
    grants.sort();

    let mut summary = Summary::default();
    for grant in grants {
        push_unique(&mut summary.countries, &grant.country);
        push_unique(&mut summary.unique_datasets, &grant.dataset);
    }
    summary
}

fn push_unique(items: &mut Vec<String>, value: &str) {
    if !items.iter().any(|item| item == value) {
        items.push(value.to_string());
    }
}

/// Singular for exactly one, plural for anything else (zero included)
#[must_use]
pub const fn pluralize<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 { singular } else { plural }
}

/// Join items as `a`, `a and b`, `a, b and c`
#[must_use]
pub fn join_with_and<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [head @ .., last] => {
            let head = head
                .iter()
                .map(|item| item.as_ref())
                .collect::<Vec<&str>>()
                .join(", ");
            format!("{head} and {}", last.as_ref())
        }
    }
}

impl Summary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// `School QoS dataset`, `School Coverage and School QoS datasets`
    #[must_use]
    pub fn datasets_phrase(&self) -> String {
        format!(
            "{} {}",
            join_with_and(&self.unique_datasets),
            pluralize(self.unique_datasets.len(), "dataset", "datasets")
        )
    }

    #[must_use]
    pub fn countries_phrase(&self) -> String {
        join_with_and(&self.countries)
    }

    /// Sentence shown before the change is submitted
    #[must_use]
    pub fn confirmation_message(&self, email: &str) -> String {
        if self.is_empty() {
            return format!("This will update the access of the user with email {email}.");
        }
        format!(
            "This will give the user with email {email} access to Giga data for {} across {} {}: {}.",
            self.datasets_phrase(),
            self.countries.len(),
            pluralize(self.countries.len(), "country", "countries"),
            self.countries_phrase(),
        )
    }
}
