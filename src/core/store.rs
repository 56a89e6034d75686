use super::engine::{DEFAULT_DOWNLOADS, project, seed_months};
use super::persist::PersistedState;
use super::types::{
    GlobalParams, GlobalParamsPatch, MonthField, MonthPatch, MonthlyRecord, Preset, PresetRates,
    Scenario,
};

const HISTORY_CAP: usize = 50;

// Fallback input rates when a sequence is grown from empty; matches the
// Custom preset.
const FALLBACK_RATES: PresetRates = PresetRates {
    loan_page_rate: 0.5,
    underwriting_rate: 0.8,
    disbursal_rate: 0.3,
    conversion_rate: 0.02,
};

#[derive(Debug, Clone)]
pub struct Store {
    scenarios: Vec<Scenario>,
    active_scenario_id: String,
    dark_mode: bool,
    history: Vec<Vec<Scenario>>,
    history_index: Option<usize>,
    next_id: u64,
}

impl Store {
    pub fn new() -> Self {
        let scenarios = vec![
            default_scenario("1", "Optimistic", Preset::Optimistic),
            default_scenario("2", "Conservative", Preset::Conservative),
        ];
        Self {
            active_scenario_id: scenarios[0].id.clone(),
            scenarios,
            dark_mode: false,
            history: Vec::new(),
            history_index: None,
            next_id: 3,
        }
    }

    pub fn from_persisted(state: PersistedState) -> Self {
        if state.scenarios.is_empty() {
            return Self::new();
        }

        let next_id = state
            .scenarios
            .iter()
            .filter_map(|s| s.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let active_scenario_id = if state.scenarios.iter().any(|s| s.id == state.active_scenario_id)
        {
            state.active_scenario_id
        } else {
            state.scenarios[0].id.clone()
        };

        Self {
            scenarios: state.scenarios,
            active_scenario_id,
            dark_mode: state.dark_mode,
            history: Vec::new(),
            history_index: None,
            next_id,
        }
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            scenarios: self.scenarios.clone(),
            active_scenario_id: self.active_scenario_id.clone(),
            dark_mode: self.dark_mode,
        }
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn scenario(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn active_scenario_id(&self) -> &str {
        &self.active_scenario_id
    }

    pub fn active_scenario(&self) -> Option<&Scenario> {
        self.scenario(self.active_scenario_id.as_str())
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.history_index, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        match self.history_index {
            Some(i) => i + 1 < self.history.len(),
            None => false,
        }
    }

    pub fn add_scenario(&mut self, name: &str, preset: Preset) {
        let id = self.fresh_id();
        let scenario = default_scenario(&id, name, preset);
        self.scenarios.push(scenario);
        self.active_scenario_id = id;
        self.save_history();
    }

    pub fn delete_scenario(&mut self, id: &str) {
        let position = self.scenarios.iter().position(|s| s.id == id);
        if let Some(position) = position {
            // The last remaining scenario cannot be deleted.
            if self.scenarios.len() > 1 {
                self.scenarios.remove(position);
                if self.active_scenario_id == id {
                    self.active_scenario_id = self.scenarios[0].id.clone();
                }
            }
        }
        self.save_history();
    }

    pub fn duplicate_scenario(&mut self, id: &str) {
        let Some(mut duplicated) = self.scenario(id).cloned() else {
            return;
        };

        duplicated.id = self.fresh_id();
        duplicated.name = format!("{} (Copy)", duplicated.name);
        self.active_scenario_id = duplicated.id.clone();
        self.scenarios.push(duplicated);
        self.save_history();
    }

    pub fn rename_scenario(&mut self, id: &str, name: &str) {
        if let Some(scenario) = self.scenario_mut(id) {
            scenario.name = name.to_string();
        }
        self.save_history();
    }

    pub fn set_active_scenario(&mut self, id: &str) {
        if self.scenario(id).is_some() {
            self.active_scenario_id = id.to_string();
        }
    }

    pub fn update_global_params(&mut self, id: &str, patch: GlobalParamsPatch) {
        if let Some(scenario) = self.scenario_mut(id) {
            let mut params = scenario.global_params;
            if let Some(v) = patch.avg_ticket_size {
                params.avg_ticket_size = v;
            }
            if let Some(v) = patch.repeat_ticket_size {
                params.repeat_ticket_size = v;
            }
            if let Some(v) = patch.repeat_conversion_rate {
                params.repeat_conversion_rate = v;
            }
            if let Some(v) = patch.number_of_months {
                if v != scenario.global_params.number_of_months {
                    resize_months(&mut scenario.monthly_data, v as usize);
                }
                params.number_of_months = v;
            }

            scenario.global_params = params;
            scenario.monthly_data = project(&scenario.monthly_data, &params);
        }
        self.save_history();
    }

    pub fn update_monthly_data(&mut self, id: &str, month_index: usize, patch: MonthPatch) {
        if let Some(scenario) = self.scenario_mut(id) {
            if let Some(month) = scenario.monthly_data.get_mut(month_index) {
                if let Some(v) = patch.downloads {
                    month.downloads = v;
                }
                if let Some(v) = patch.loan_page_rate {
                    month.loan_page_rate = v;
                }
                if let Some(v) = patch.underwriting_rate {
                    month.underwriting_rate = v;
                }
                if let Some(v) = patch.disbursal_rate {
                    month.disbursal_rate = v;
                }
                if let Some(v) = patch.conversion_rate {
                    month.conversion_rate = v;
                }
            }
            scenario.monthly_data = project(&scenario.monthly_data, &scenario.global_params);
        }
        self.save_history();
    }

    pub fn bulk_update_monthly_data(
        &mut self,
        id: &str,
        month_indices: &[usize],
        field: MonthField,
        value: f64,
    ) {
        if let Some(scenario) = self.scenario_mut(id) {
            for &index in month_indices {
                if let Some(month) = scenario.monthly_data.get_mut(index) {
                    match field {
                        MonthField::Downloads => month.downloads = value,
                        MonthField::LoanPageRate => month.loan_page_rate = value,
                        MonthField::UnderwritingRate => month.underwriting_rate = value,
                        MonthField::DisbursalRate => month.disbursal_rate = value,
                        MonthField::ConversionRate => month.conversion_rate = value,
                    }
                }
            }
            scenario.monthly_data = project(&scenario.monthly_data, &scenario.global_params);
        }
        self.save_history();
    }

    pub fn reset_scenario(&mut self, id: &str) {
        if let Some(scenario) = self.scenario_mut(id) {
            let months = seed_months(
                scenario.global_params.number_of_months,
                Preset::Custom.rates(),
            );
            scenario.monthly_data = project(&months, &scenario.global_params);
        }
        self.save_history();
    }

    // Replaces the month sequence wholesale; `number_of_months` is left
    // untouched even when the imported row count differs.
    pub fn import_scenario_data(&mut self, id: &str, rows: Vec<MonthlyRecord>) {
        if let Some(scenario) = self.scenario_mut(id) {
            scenario.monthly_data = project(&rows, &scenario.global_params);
        }
        self.save_history();
    }

    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
    }

    pub fn undo(&mut self) {
        if let Some(index) = self.history_index {
            if index > 0 {
                self.scenarios = self.history[index - 1].clone();
                self.history_index = Some(index - 1);
                self.repair_active_id();
            }
        }
    }

    pub fn redo(&mut self) {
        if let Some(index) = self.history_index {
            if index + 1 < self.history.len() {
                self.scenarios = self.history[index + 1].clone();
                self.history_index = Some(index + 1);
                self.repair_active_id();
            }
        }
    }

    // Undo/redo restore the scenario set only. If the restored set no
    // longer contains the active id, fall back to the first scenario so the
    // active id always references a live scenario.
    fn repair_active_id(&mut self) {
        if self.scenario(self.active_scenario_id.as_str()).is_none() {
            if let Some(first) = self.scenarios.first() {
                self.active_scenario_id = first.id.clone();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn history_len(&self) -> usize {
        self.history.len()
    }

    fn scenario_mut(&mut self, id: &str) -> Option<&mut Scenario> {
        self.scenarios.iter_mut().find(|s| s.id == id)
    }

    fn fresh_id(&mut self) -> String {
        let id = self.next_id.to_string();
        self.next_id += 1;
        id
    }

    fn save_history(&mut self) {
        let keep = self.history_index.map_or(0, |i| i + 1);
        self.history.truncate(keep);
        self.history.push(self.scenarios.clone());
        if self.history.len() > HISTORY_CAP {
            self.history.remove(0);
        }
        self.history_index = Some(self.history.len() - 1);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

fn default_scenario(id: &str, name: &str, preset: Preset) -> Scenario {
    let global_params = GlobalParams::default();
    let months = seed_months(global_params.number_of_months, preset.rates());
    Scenario {
        id: id.to_string(),
        name: name.to_string(),
        monthly_data: project(&months, &global_params),
        global_params,
    }
}

fn resize_months(months: &mut Vec<MonthlyRecord>, target: usize) {
    if target > months.len() {
        // New months copy the last existing month's inputs so a trend edit
        // carries forward when the horizon is extended.
        let template = months.last().copied();
        for i in months.len()..target {
            let (downloads, rates) = match template {
                Some(last) => (
                    last.downloads,
                    PresetRates {
                        loan_page_rate: last.loan_page_rate,
                        underwriting_rate: last.underwriting_rate,
                        disbursal_rate: last.disbursal_rate,
                        conversion_rate: last.conversion_rate,
                    },
                ),
                None => (DEFAULT_DOWNLOADS, FALLBACK_RATES),
            };
            months.push(MonthlyRecord {
                month: i as u32 + 1,
                downloads,
                loan_page_rate: rates.loan_page_rate,
                underwriting_rate: rates.underwriting_rate,
                disbursal_rate: rates.disbursal_rate,
                conversion_rate: rates.conversion_rate,
                total_new_loans: 0.0,
                disbursal_from_new: 0.0,
                cumulative_new_users: 0.0,
                repeat_disbursal: 0.0,
                total: 0.0,
            });
        }
    } else {
        months.truncate(target);
    }
}
