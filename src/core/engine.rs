use serde::Serialize;

use super::types::{GlobalParams, MonthlyRecord, PresetRates};

const CRORE: f64 = 10_000_000.0;

pub const DEFAULT_DOWNLOADS: f64 = 1000.0;

// Derived values are rounded half-away-from-zero to two decimals, and the
// rounded cumulative feeds the next month, so rounding compounds across the
// series on purpose.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn project(months: &[MonthlyRecord], params: &GlobalParams) -> Vec<MonthlyRecord> {
    let mut projected = Vec::with_capacity(months.len());
    let mut cum_prev = 0.0;

    for (i, month) in months.iter().enumerate() {
        let total_new_loans =
            month.downloads * month.loan_page_rate * month.underwriting_rate * month.disbursal_rate;
        let disbursal_from_new = total_new_loans * params.avg_ticket_size / CRORE;
        let cumulative_new_users = cum_prev + total_new_loans;

        // Month 1 has no repeat book; later months draw on the previous
        // month's cumulative users, never the current month's own loans.
        let repeat_disbursal = if i == 0 {
            0.0
        } else {
            cum_prev * params.repeat_conversion_rate * params.repeat_ticket_size / CRORE
        };
        let total = disbursal_from_new + repeat_disbursal;

        let mut record = *month;
        record.total_new_loans = round2(total_new_loans);
        record.disbursal_from_new = round2(disbursal_from_new);
        record.cumulative_new_users = round2(cumulative_new_users);
        record.repeat_disbursal = round2(repeat_disbursal);
        record.total = round2(total);

        cum_prev = record.cumulative_new_users;
        projected.push(record);
    }

    projected
}

pub fn seed_months(count: u32, rates: PresetRates) -> Vec<MonthlyRecord> {
    (1..=count)
        .map(|month| MonthlyRecord {
            month,
            downloads: DEFAULT_DOWNLOADS,
            loan_page_rate: rates.loan_page_rate,
            underwriting_rate: rates.underwriting_rate,
            disbursal_rate: rates.disbursal_rate,
            conversion_rate: rates.conversion_rate,
            total_new_loans: 0.0,
            disbursal_from_new: 0.0,
            cumulative_new_users: 0.0,
            repeat_disbursal: 0.0,
            total: 0.0,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetrics {
    pub total_disbursals: f64,
    pub final_cumulative_users: f64,
    pub avg_monthly_disbursal: f64,
}

pub fn summary_metrics(months: &[MonthlyRecord]) -> SummaryMetrics {
    if months.is_empty() {
        return SummaryMetrics {
            total_disbursals: 0.0,
            final_cumulative_users: 0.0,
            avg_monthly_disbursal: 0.0,
        };
    }

    let total_disbursals: f64 = months.iter().map(|m| m.total).sum();
    let final_cumulative_users = months.last().map_or(0.0, |m| m.cumulative_new_users);

    SummaryMetrics {
        total_disbursals: round2(total_disbursals),
        final_cumulative_users: round2(final_cumulative_users),
        avg_monthly_disbursal: round2(total_disbursals / months.len() as f64),
    }
}
