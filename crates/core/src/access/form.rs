//! Row-oriented edit state behind the "edit user" form.
//!
//! The form lists countries as ordered rows, so while editing it may hold
//! blank rows or the same country twice. It is validated and merged into
//! an [`AccessSet`] in one step before anything is diffed.

use super::AccessSet;
use crate::error::{AccessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display};

/// One country row of the form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRow {
    pub country: String,
    pub datasets: Vec<String>,
}

impl CountryRow {
    pub fn new<I, S>(country: impl Into<String>, datasets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            country: country.into(),
            datasets: datasets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Selectable values offered by the form. An empty list accepts any value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormOptions {
    pub roles: BTreeSet<String>,
    pub countries: BTreeSet<String>,
    pub datasets: BTreeSet<String>,
}

/// A single validation problem, reported against a row where relevant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormIssue {
    NoRoles,
    UnknownRole { role: String },
    MissingCountry { row: usize },
    NoDatasets { row: usize },
    UnknownCountry { row: usize, country: String },
    UnknownDataset { row: usize, dataset: String },
}

impl Display for FormIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRoles => write!(f, "select at least one role"),
            Self::UnknownRole { role } => write!(f, "unknown role {role:?}"),
            Self::MissingCountry { row } => write!(f, "row {row}: select a country"),
            Self::NoDatasets { row } => write!(f, "row {row}: select at least one dataset"),
            Self::UnknownCountry { row, country } => {
                write!(f, "row {row}: unknown country {country:?}")
            }
            Self::UnknownDataset { row, dataset } => {
                write!(f, "row {row}: unknown dataset {dataset:?}")
            }
        }
    }
}

/// Editable form state seeded from an access set.
///
/// Values the user already holds are accepted even when they fall outside
/// the option lists, so an untouched form always validates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingForm {
    roles: Vec<String>,
    rows: Vec<CountryRow>,
    #[serde(default)]
    carried: BTreeSet<String>,
    #[serde(default)]
    held: AccessSet,
}

impl PendingForm {
    /// Seed the form with one row per country currently granted
    #[must_use]
    pub fn from_access_set(set: &AccessSet) -> Self {
        Self {
            roles: set.roles().iter().cloned().collect(),
            rows: set
                .grants()
                .iter()
                .map(|(country, datasets)| CountryRow::new(country.as_str(), datasets.iter().cloned()))
                .collect(),
            carried: set.unrecognized().clone(),
            held: set.clone(),
        }
    }

    /// Treat `held` as the access the user already has. Only values outside
    /// it are checked against the option lists.
    #[must_use]
    pub fn with_held(mut self, held: &AccessSet) -> Self {
        self.held = held.clone();
        self
    }

    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    #[must_use]
    pub fn rows(&self) -> &[CountryRow] {
        &self.rows
    }

    pub fn set_roles<I, S>(&mut self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
    }

    /// Append a blank row and return its index
    pub fn add_row(&mut self) -> usize {
        self.rows.push(CountryRow::default());
        self.rows.len() - 1
    }

    /// Append a filled row and return its index
    pub fn push_row(&mut self, row: CountryRow) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub fn remove_row(&mut self, index: usize) -> Result<CountryRow> {
        self.check_index(index)?;
        Ok(self.rows.remove(index))
    }

    pub fn set_country(&mut self, index: usize, country: impl Into<String>) -> Result<()> {
        self.check_index(index)?;
        self.rows[index].country = country.into();
        Ok(())
    }

    pub fn set_datasets<I, S>(&mut self, index: usize, datasets: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_index(index)?;
        self.rows[index].datasets = datasets.into_iter().map(Into::into).collect();
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.rows.len() {
            Ok(())
        } else {
            Err(AccessError::RowOutOfRange {
                index,
                len: self.rows.len(),
            })
        }
    }

    /// Collect every issue that prevents this form from being submitted
    #[must_use]
    pub fn issues(&self, options: &FormOptions) -> Vec<FormIssue> {
        let mut issues = Vec::new();

        if self.roles.is_empty() {
            issues.push(FormIssue::NoRoles);
        }
        if !options.roles.is_empty() {
            issues.extend(
                self.roles
                    .iter()
                    .filter(|role| !options.roles.contains(*role) && !self.held.has_role(role))
                    .map(|role| FormIssue::UnknownRole { role: role.clone() }),
            );
        }

        for (row, entry) in self.rows.iter().enumerate() {
            if entry.country.trim().is_empty() {
                issues.push(FormIssue::MissingCountry { row });
            } else if !options.countries.is_empty()
                && !options.countries.contains(&entry.country)
                && self.held.datasets(&entry.country).is_none()
            {
                issues.push(FormIssue::UnknownCountry {
                    row,
                    country: entry.country.clone(),
                });
            }

            if entry.datasets.is_empty() {
                issues.push(FormIssue::NoDatasets { row });
            }
            if !options.datasets.is_empty() {
                issues.extend(
                    entry
                        .datasets
                        .iter()
                        .filter(|dataset| {
                            !options.datasets.contains(*dataset)
                                && !self.held.has_grant(&entry.country, dataset)
                        })
                        .map(|dataset| FormIssue::UnknownDataset {
                            row,
                            dataset: dataset.clone(),
                        }),
                );
            }
        }

        issues
    }

    pub fn validate(&self, options: &FormOptions) -> Result<()> {
        let issues = self.issues(options);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AccessError::InvalidForm(issues))
        }
    }

    /// Validate, then merge rows into a normalized access set. Rows naming
    /// the same country are folded together.
    pub fn to_access_set(&self, options: &FormOptions) -> Result<AccessSet> {
        self.validate(options)?;

        let mut set = AccessSet::new();
        set.set_roles(self.roles.iter().cloned());
        for row in &self.rows {
            for dataset in &row.datasets {
                set.add_grant(row.country.as_str(), dataset.as_str());
            }
        }
        set.carry_unrecognized(self.carried.iter().cloned());
        Ok(set)
    }

    /// Consuming form of [`Self::to_access_set`]
    pub fn into_access_set(self, options: &FormOptions) -> Result<AccessSet> {
        self.to_access_set(options)
    }
}
