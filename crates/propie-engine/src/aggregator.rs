//! Progress aggregator.
//!
//! A pure function of a project's components; recomputed after every
//! accepted event.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use propie_core::entities::{Component, Project};
use propie_core::enums::ComponentCategory;
use propie_core::responses::{CategoryProgress, Deadline, ProjectProgress};

/// Share of required components in a success status, in `[0, 100]`.
///
/// 100 when no component is required.
#[must_use]
pub fn completion_percentage<'a>(components: impl IntoIterator<Item = &'a Component>) -> f64 {
    let (required, completed) = components
        .into_iter()
        .filter(|c| c.required)
        .fold((0u32, 0u32), |(required, completed), c| {
            (
                required + 1,
                completed + u32::from(c.status.is_success()),
            )
        });
    percentage(completed, required)
}

/// [`completion_percentage`] over compliance components only.
#[must_use]
pub fn compliance_rate(components: &[Component]) -> f64 {
    completion_percentage(
        components
            .iter()
            .filter(|c| c.category == ComponentCategory::Compliance),
    )
}

fn percentage(completed: u32, required: u32) -> f64 {
    if required == 0 {
        return 100.0;
    }
    f64::from(completed) / f64::from(required) * 100.0
}

/// Lazy sequence of upcoming deadlines, soonest first.
///
/// Finite and single-pass: it borrows the components and yields each open,
/// dated component once.
pub struct UpcomingDeadlines<'a> {
    pending: std::vec::IntoIter<&'a Component>,
    now: DateTime<Utc>,
}

impl Iterator for UpcomingDeadlines<'_> {
    type Item = Deadline;

    fn next(&mut self) -> Option<Self::Item> {
        let component = self.pending.next()?;
        let due_at = component.due_at?;
        Some(Deadline {
            component_id: component.id.clone(),
            name: component.name.clone(),
            category: component.category,
            status: component.status,
            due_at,
            days_remaining: (due_at - self.now).num_days(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pending.size_hint()
    }
}

/// Non-terminal components with a due date, sorted by due date then id.
#[must_use]
pub fn upcoming_deadlines(components: &[Component], now: DateTime<Utc>) -> UpcomingDeadlines<'_> {
    let mut pending: Vec<&Component> = components
        .iter()
        .filter(|c| c.due_at.is_some() && !c.status.is_terminal())
        .collect();
    pending.sort_by(|a, b| a.due_at.cmp(&b.due_at).then_with(|| a.id.cmp(&b.id)));
    UpcomingDeadlines {
        pending: pending.into_iter(),
        now,
    }
}

/// Full progress picture for `project` at `now`.
///
/// `deadline_limit` caps the number of deadlines taken from the lazy sequence.
#[must_use]
pub fn aggregate(
    project: &Project,
    now: DateTime<Utc>,
    deadline_limit: Option<usize>,
) -> ProjectProgress {
    let components = &project.components;

    let mut by_category: BTreeMap<ComponentCategory, CategoryProgress> = BTreeMap::new();
    let mut by_status: BTreeMap<String, u32> = BTreeMap::new();
    let mut total = 0u32;
    let mut required = 0u32;
    let mut completed = 0u32;

    for component in components {
        let entry = by_category.entry(component.category).or_default();
        entry.total += 1;
        total += 1;
        if component.required {
            entry.required += 1;
            required += 1;
            if component.status.is_success() {
                entry.completed += 1;
                completed += 1;
            }
        }
        *by_status.entry(component.status.to_string()).or_default() += 1;
    }
    for entry in by_category.values_mut() {
        entry.completion_percentage = percentage(entry.completed, entry.required);
    }

    let deadlines = upcoming_deadlines(components, now);
    let upcoming_deadlines = match deadline_limit {
        Some(limit) => deadlines.take(limit).collect(),
        None => deadlines.collect(),
    };

    ProjectProgress {
        project_id: project.id.clone(),
        phase: project.phase,
        version: project.version,
        completion_percentage: percentage(completed, required),
        compliance_rate: compliance_rate(components),
        total_components: total,
        required_components: required,
        completed_components: completed,
        by_category,
        by_status,
        upcoming_deadlines,
        uncovered_roles: project.uncovered_roles(),
        computed_at: now,
    }
}
