use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Preset {
    Optimistic,
    Conservative,
    Custom,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PresetRates {
    pub loan_page_rate: f64,
    pub underwriting_rate: f64,
    pub disbursal_rate: f64,
    pub conversion_rate: f64,
}

impl Preset {
    pub fn rates(self) -> PresetRates {
        match self {
            Preset::Optimistic => PresetRates {
                loan_page_rate: 0.9,
                underwriting_rate: 0.95,
                disbursal_rate: 0.6,
                conversion_rate: 0.03,
            },
            Preset::Conservative => PresetRates {
                loan_page_rate: 0.4,
                underwriting_rate: 0.85,
                disbursal_rate: 0.15,
                conversion_rate: 0.01,
            },
            Preset::Custom => PresetRates {
                loan_page_rate: 0.5,
                underwriting_rate: 0.8,
                disbursal_rate: 0.3,
                conversion_rate: 0.02,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalParams {
    pub avg_ticket_size: f64,
    pub repeat_ticket_size: f64,
    pub repeat_conversion_rate: f64,
    pub number_of_months: u32,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            avg_ticket_size: 100_000.0,
            repeat_ticket_size: 50_000.0,
            repeat_conversion_rate: 0.1,
            number_of_months: 25,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalParamsPatch {
    pub avg_ticket_size: Option<f64>,
    pub repeat_ticket_size: Option<f64>,
    pub repeat_conversion_rate: Option<f64>,
    pub number_of_months: Option<u32>,
}

// Rates are stored as fractions; they only become 0-100 percentages at the
// CSV/report/UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecord {
    pub month: u32,
    pub downloads: f64,
    pub loan_page_rate: f64,
    pub underwriting_rate: f64,
    pub disbursal_rate: f64,
    pub conversion_rate: f64,
    pub total_new_loans: f64,
    pub disbursal_from_new: f64,
    pub cumulative_new_users: f64,
    pub repeat_disbursal: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthPatch {
    pub downloads: Option<f64>,
    pub loan_page_rate: Option<f64>,
    pub underwriting_rate: Option<f64>,
    pub disbursal_rate: Option<f64>,
    pub conversion_rate: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonthField {
    Downloads,
    LoanPageRate,
    UnderwritingRate,
    DisbursalRate,
    ConversionRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub global_params: GlobalParams,
    pub monthly_data: Vec<MonthlyRecord>,
}
