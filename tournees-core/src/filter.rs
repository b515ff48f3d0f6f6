//! Producer/day/vehicle filters and the choices offered for them.

use std::collections::BTreeSet;
use std::mem;

use chrono::{Datelike, NaiveDate};

use crate::model::{MapPath, MapPoint, TourMetric, UNDEFINED_DAY};

const FRENCH_WEEK: [&str; 7] = [
    "Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi", "Dimanche",
];
const ENGLISH_WEEK: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const UNKNOWN_DAY_RANK: usize = 99;

/// Values a dashboard item can be filtered on.
pub trait Facets {
    /// Producer name.
    fn producer(&self) -> &str;
    /// Day label.
    fn day(&self) -> &str;
    /// Vehicle type.
    fn vehicle_type(&self) -> &str;
}

impl Facets for TourMetric {
    fn producer(&self) -> &str {
        &self.producer
    }

    fn day(&self) -> &str {
        &self.day
    }

    fn vehicle_type(&self) -> &str {
        &self.vehicle_type
    }
}

impl Facets for MapPoint {
    fn producer(&self) -> &str {
        &self.producer
    }

    fn day(&self) -> &str {
        &self.day
    }

    fn vehicle_type(&self) -> &str {
        &self.vehicle_type
    }
}

impl Facets for MapPath {
    fn producer(&self) -> &str {
        &self.producer
    }

    fn day(&self) -> &str {
        &self.day
    }

    fn vehicle_type(&self) -> &str {
        &self.vehicle_type
    }
}

/// Accepted values for one facet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Every value passes.
    #[default]
    All,
    /// Only the listed values pass.
    Only(BTreeSet<String>),
}

impl Selection {
    /// Whether `value` passes the selection.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(values) => values.contains(value),
        }
    }

    /// Flip `value` in or out of the selection.
    ///
    /// `choices` is the full list of values on offer; selecting all of them
    /// collapses back to [`Selection::All`].
    pub fn toggle(&mut self, value: &str, choices: &[String]) {
        let mut selected = match self {
            Selection::All => choices.iter().cloned().collect(),
            Selection::Only(values) => mem::take(values),
        };

        if !selected.remove(value) {
            selected.insert(value.to_owned());
        }

        *self = if choices.iter().all(|choice| selected.contains(choice)) {
            Selection::All
        } else {
            Selection::Only(selected)
        };
    }
}

/// Combined producer/day/vehicle filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TourFilter {
    /// Accepted producers.
    pub producers: Selection,
    /// Accepted days.
    pub days: Selection,
    /// Accepted vehicle types.
    pub vehicles: Selection,
}

impl TourFilter {
    /// Whether `item` passes all three selections.
    #[must_use]
    pub fn matches<T: Facets>(&self, item: &T) -> bool {
        self.producers.contains(item.producer())
            && self.days.contains(item.day())
            && self.vehicles.contains(item.vehicle_type())
    }

    /// Clone the items passing the filter, keeping their order.
    #[must_use]
    pub fn apply<T: Facets + Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .filter(|item| self.matches(*item))
            .cloned()
            .collect()
    }
}

/// Distinct values available for each facet, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetChoices {
    /// Producers, alphabetical.
    pub producers: Vec<String>,
    /// Days in week order; unrecognised labels follow in order of appearance.
    pub days: Vec<String>,
    /// Vehicle types, alphabetical.
    pub vehicles: Vec<String>,
}

impl FacetChoices {
    /// Collect the choices present in `metrics`.
    #[must_use]
    pub fn from_metrics(metrics: &[TourMetric]) -> Self {
        let producers = metrics
            .iter()
            .map(|metric| metric.producer.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let vehicles = metrics
            .iter()
            .map(|metric| metric.vehicle_type.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut days: Vec<String> = Vec::new();
        for metric in metrics {
            if !days.contains(&metric.day) {
                days.push(metric.day.clone());
            }
        }
        days.sort_by_key(|day| weekday_rank(day));

        Self {
            producers,
            days,
            vehicles,
        }
    }
}

/// French weekday label of `date`, as producers write it.
#[must_use]
pub fn weekday_label(date: NaiveDate) -> &'static str {
    let index = usize::try_from(date.weekday().num_days_from_monday()).unwrap_or(usize::MAX);
    FRENCH_WEEK.get(index).copied().unwrap_or(UNDEFINED_DAY)
}

/// Position of a day label in the week, French or English.
#[must_use]
pub fn weekday_rank(day: &str) -> usize {
    let day = day.trim();
    FRENCH_WEEK
        .iter()
        .position(|name| name.eq_ignore_ascii_case(day))
        .or_else(|| {
            ENGLISH_WEEK
                .iter()
                .position(|name| name.eq_ignore_ascii_case(day))
        })
        .unwrap_or(UNKNOWN_DAY_RANK)
}
