use std::sync::Arc;

use tournees_core::{
    dataset::Dataset,
    filter::{FacetChoices, Selection, TourFilter},
    model::{LonLat, SourceId},
    ports::PortError,
    service::DashboardService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    SourceSelect,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    Map,
    Charts,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Facet {
    Producers,
    Days,
    Vehicles,
}

/// Why the last refresh produced no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Failure {
    /// Transport error or error status from the record store.
    Unreachable,
    /// The source answered but its content could not be read.
    Unreadable,
}

/// Rows moved by one page of the tour table.
pub(crate) const TABLE_PAGE: isize = 10;

impl View {
    pub(crate) fn next(self) -> Self {
        match self {
            View::Map => View::Charts,
            View::Charts => View::Table,
            View::Table => View::Map,
        }
    }
}

impl Facet {
    pub(crate) fn next(self) -> Self {
        match self {
            Facet::Producers => Facet::Days,
            Facet::Days => Facet::Vehicles,
            Facet::Vehicles => Facet::Producers,
        }
    }
}

pub(crate) struct App {
    pub service: Arc<DashboardService>,

    pub screen: Screen,
    pub sources: Vec<(SourceId, String)>,
    pub source_list_index: usize,
    pub selected_source: Option<SourceId>,

    pub dataset: Dataset,
    pub choices: FacetChoices,
    pub filter: TourFilter,
    pub focus: Facet,
    pub producer_index: usize,
    pub day_index: usize,
    pub vehicle_index: usize,
    pub view: View,
    pub table_row: usize,
    pub fallback_center: LonLat,

    pub is_loading: bool,
    pub failure: Option<Failure>,
    pub error_message: Option<String>,
}

impl App {
    pub(crate) fn new(service: Arc<DashboardService>, fallback_center: LonLat) -> Self {
        let sources = service.sources();
        Self {
            service,
            screen: Screen::SourceSelect,
            sources,
            source_list_index: 0,
            selected_source: None,
            dataset: Dataset::default(),
            choices: FacetChoices::default(),
            filter: TourFilter::default(),
            focus: Facet::Producers,
            producer_index: 0,
            day_index: 0,
            vehicle_index: 0,
            view: View::Map,
            table_row: 0,
            fallback_center,
            is_loading: false,
            failure: None,
            error_message: None,
        }
    }

    pub(crate) fn select_current_source(&mut self) -> Option<SourceId> {
        let (id, _name) = self.sources.get(self.source_list_index)?;
        self.selected_source = Some(id.clone());
        self.screen = Screen::Dashboard;
        Some(id.clone())
    }

    pub(crate) fn select_source_by_id(&mut self, wanted: &str) -> Option<SourceId> {
        self.source_list_index = self.sources.iter().position(|(id, _)| id.0 == wanted)?;
        self.select_current_source()
    }

    pub(crate) fn selected_source_name(&self) -> &str {
        self.selected_source
            .as_ref()
            .and_then(|selected| self.sources.iter().find(|(id, _)| id == selected))
            .map_or("<source>", |(_, name)| name.as_str())
    }

    pub(crate) fn start_loading(&mut self) {
        self.is_loading = true;
        self.failure = None;
        self.error_message = None;
    }

    /// Replace the data after a successful refresh. Filters reset.
    pub(crate) fn apply_dataset(&mut self, dataset: Dataset) {
        self.choices = dataset.facets();
        self.dataset = dataset;
        self.filter = TourFilter::default();
        self.producer_index = 0;
        self.day_index = 0;
        self.vehicle_index = 0;
        self.table_row = 0;
        self.is_loading = false;
        self.failure = None;
        self.error_message = None;
    }

    /// Drop the data after a failed refresh.
    pub(crate) fn load_failed(&mut self, err: &PortError) {
        self.dataset = Dataset::default();
        self.choices = FacetChoices::default();
        self.filter = TourFilter::default();
        self.table_row = 0;
        self.is_loading = false;
        if err.is_connectivity() {
            self.failure = Some(Failure::Unreachable);
            self.error_message = Some(format!("Connection error: {err}"));
        } else {
            self.failure = Some(Failure::Unreadable);
            self.error_message = Some(format!("Failed to load tours: {err}"));
        }
    }

    pub(crate) fn back_to_sources(&mut self) {
        self.screen = Screen::SourceSelect;
        self.selected_source = None;
        self.dataset = Dataset::default();
        self.choices = FacetChoices::default();
        self.filter = TourFilter::default();
        self.table_row = 0;
        self.failure = None;
        self.error_message = None;
    }

    /// Rows and geometry passing the current filter.
    pub(crate) fn visible(&self) -> Dataset {
        self.dataset.filtered(&self.filter)
    }

    pub(crate) fn facet_choices(&self, facet: Facet) -> &[String] {
        match facet {
            Facet::Producers => &self.choices.producers,
            Facet::Days => &self.choices.days,
            Facet::Vehicles => &self.choices.vehicles,
        }
    }

    pub(crate) fn facet_selection(&self, facet: Facet) -> &Selection {
        match facet {
            Facet::Producers => &self.filter.producers,
            Facet::Days => &self.filter.days,
            Facet::Vehicles => &self.filter.vehicles,
        }
    }

    pub(crate) fn facet_index(&self, facet: Facet) -> usize {
        match facet {
            Facet::Producers => self.producer_index,
            Facet::Days => self.day_index,
            Facet::Vehicles => self.vehicle_index,
        }
    }

    fn focused_index_mut(&mut self) -> &mut usize {
        match self.focus {
            Facet::Producers => &mut self.producer_index,
            Facet::Days => &mut self.day_index,
            Facet::Vehicles => &mut self.vehicle_index,
        }
    }

    pub(crate) fn move_cursor_up(&mut self) {
        let index = self.focused_index_mut();
        *index = index.saturating_sub(1);
    }

    pub(crate) fn move_cursor_down(&mut self) {
        let len = self.facet_choices(self.focus).len();
        let index = self.focused_index_mut();
        if *index + 1 < len {
            *index += 1;
        }
    }

    pub(crate) fn toggle_focused(&mut self) {
        let facet = self.focus;
        let Some(value) = self
            .facet_choices(facet)
            .get(self.facet_index(facet))
            .cloned()
        else {
            return;
        };

        let (selection, choices) = match facet {
            Facet::Producers => (&mut self.filter.producers, &self.choices.producers),
            Facet::Days => (&mut self.filter.days, &self.choices.days),
            Facet::Vehicles => (&mut self.filter.vehicles, &self.choices.vehicles),
        };
        selection.toggle(&value, choices);
        self.table_row = 0;
    }

    pub(crate) fn select_all_focused(&mut self) {
        match self.focus {
            Facet::Producers => self.filter.producers = Selection::All,
            Facet::Days => self.filter.days = Selection::All,
            Facet::Vehicles => self.filter.vehicles = Selection::All,
        }
        self.table_row = 0;
    }

    /// Move the highlighted table row, staying on the visible rows.
    pub(crate) fn scroll_table(&mut self, delta: isize) {
        let last = self.visible().metrics.len().saturating_sub(1);
        self.table_row = self.table_row.saturating_add_signed(delta).min(last);
    }
}
