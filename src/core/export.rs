use super::types::{MonthlyRecord, Scenario};

const CSV_HEADER: &str = "Month,Downloads,Loan Page %,Underwriting %,Disbursal %,% Conversion,\
Total New Loans,Disbursal from New (Cr),Cumulative New Users,Repeat Disbursal (Cr),Total (Cr)";

// Rates cross this boundary as 0-100 percentages; everywhere inside the
// core they stay fractions.
pub fn export_csv(scenario: &Scenario) -> String {
    let mut out = String::with_capacity(64 * (scenario.monthly_data.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for row in &scenario.monthly_data {
        out.push_str(&format!(
            "{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}\n",
            row.month,
            row.downloads,
            row.loan_page_rate * 100.0,
            row.underwriting_rate * 100.0,
            row.disbursal_rate * 100.0,
            row.conversion_rate * 100.0,
            row.total_new_loans,
            row.disbursal_from_new,
            row.cumulative_new_users,
            row.repeat_disbursal,
            row.total,
        ));
    }
    out
}

// Header-keyed CSV import. Rows are renumbered 1..n, derived columns are
// discarded, and anything unparseable falls back to zero.
pub fn parse_csv(text: &str) -> Vec<MonthlyRecord> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    lines
        .enumerate()
        .map(|(idx, line)| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let field = |name: &str| {
                columns
                    .iter()
                    .position(|c| *c == name)
                    .and_then(|i| fields.get(i).copied())
                    .unwrap_or("")
            };

            MonthlyRecord {
                month: idx as u32 + 1,
                downloads: parse_count(field("Downloads")),
                loan_page_rate: parse_percent(field("Loan Page %")),
                underwriting_rate: parse_percent(field("Underwriting %")),
                disbursal_rate: parse_percent(field("Disbursal %")),
                conversion_rate: parse_percent(field("% Conversion")),
                total_new_loans: 0.0,
                disbursal_from_new: 0.0,
                cumulative_new_users: 0.0,
                repeat_disbursal: 0.0,
                total: 0.0,
            }
        })
        .collect()
}

pub fn render_report(scenario: &Scenario) -> String {
    let params = &scenario.global_params;
    let mut out = String::new();

    out.push_str(&format!(
        "Disbursal Simulator Report - {}\n\n",
        scenario.name
    ));
    out.push_str("Global Parameters:\n");
    out.push_str(&format!(
        "  Avg Ticket Size: \u{20b9}{}\n",
        group_thousands(params.avg_ticket_size)
    ));
    out.push_str(&format!(
        "  Repeat Ticket Size: \u{20b9}{}\n",
        group_thousands(params.repeat_ticket_size)
    ));
    out.push_str(&format!(
        "  Repeat Conversion Rate: {:.2}%\n\n",
        params.repeat_conversion_rate * 100.0
    ));

    out.push_str(&format!(
        "{:>5}  {:>10}  {:>7}  {:>7}  {:>7}  {:>10}  {:>9}  {:>10}  {:>11}  {:>10}\n",
        "Month",
        "Downloads",
        "Loan %",
        "UW %",
        "Disb %",
        "New Loans",
        "New (Cr)",
        "Cumul.",
        "Repeat (Cr)",
        "Total (Cr)",
    ));
    for row in &scenario.monthly_data {
        out.push_str(&format!(
            "{:>5}  {:>10}  {:>6.2}%  {:>6.2}%  {:>6.2}%  {:>10.2}  {:>9.2}  {:>10.2}  {:>11.2}  {:>10.2}\n",
            row.month,
            row.downloads,
            row.loan_page_rate * 100.0,
            row.underwriting_rate * 100.0,
            row.disbursal_rate * 100.0,
            row.total_new_loans,
            row.disbursal_from_new,
            row.cumulative_new_users,
            row.repeat_disbursal,
            row.total,
        ));
    }
    out
}

fn parse_count(raw: &str) -> f64 {
    raw.parse::<f64>().map(f64::trunc).unwrap_or(0.0)
}

fn parse_percent(raw: &str) -> f64 {
    raw.parse::<f64>().map(|v| v / 100.0).unwrap_or(0.0)
}

fn group_thousands(value: f64) -> String {
    let digits = format!("{}", value.trunc().abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::{project, seed_months};
    use crate::core::types::{GlobalParams, Preset};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_scenario() -> Scenario {
        let global_params = GlobalParams::default();
        let months = seed_months(3, Preset::Custom.rates());
        Scenario {
            id: "1".to_string(),
            name: "Base case".to_string(),
            monthly_data: project(&months, &global_params),
            global_params,
        }
    }

    #[test]
    fn export_header_lists_all_eleven_columns() {
        let csv = export_csv(&sample_scenario());
        let header = csv.lines().next().expect("header line");
        assert_eq!(
            header,
            "Month,Downloads,Loan Page %,Underwriting %,Disbursal %,% Conversion,\
Total New Loans,Disbursal from New (Cr),Cumulative New Users,Repeat Disbursal (Cr),Total (Cr)"
        );
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn export_writes_percentages_and_two_decimal_values() {
        let csv = export_csv(&sample_scenario());
        let month_one = csv.lines().nth(1).expect("first data row");
        assert_eq!(
            month_one,
            "1,1000,50.00,80.00,30.00,2.00,120.00,1.20,120.00,0.00,1.20"
        );
        let month_two = csv.lines().nth(2).expect("second data row");
        assert_eq!(
            month_two,
            "2,1000,50.00,80.00,30.00,2.00,120.00,1.20,240.00,0.06,1.26"
        );
    }

    #[test]
    fn exported_csv_reimports_to_the_same_inputs() {
        let scenario = sample_scenario();
        let rows = parse_csv(&export_csv(&scenario));

        assert_eq!(rows.len(), scenario.monthly_data.len());
        for (parsed, original) in rows.iter().zip(scenario.monthly_data.iter()) {
            assert_eq!(parsed.month, original.month);
            assert_approx(parsed.downloads, original.downloads);
            assert_approx(parsed.loan_page_rate, original.loan_page_rate);
            assert_approx(parsed.underwriting_rate, original.underwriting_rate);
            assert_approx(parsed.disbursal_rate, original.disbursal_rate);
            assert_approx(parsed.conversion_rate, original.conversion_rate);
            assert_approx(parsed.total_new_loans, 0.0);
            assert_approx(parsed.cumulative_new_users, 0.0);
        }
    }

    #[test]
    fn parse_handles_reordered_columns() {
        let rows = parse_csv("Loan Page %,Downloads\n40,2000\n10,500\n");
        assert_eq!(rows.len(), 2);
        assert_approx(rows[0].downloads, 2000.0);
        assert_approx(rows[0].loan_page_rate, 0.4);
        assert_approx(rows[1].downloads, 500.0);
        assert_approx(rows[1].loan_page_rate, 0.1);
    }

    #[test]
    fn parse_defaults_missing_and_garbage_fields_to_zero() {
        let rows = parse_csv("Month,Downloads,Loan Page %\n1,abc\n2,1500,oops\n");
        assert_eq!(rows.len(), 2);
        assert_approx(rows[0].downloads, 0.0);
        assert_approx(rows[0].loan_page_rate, 0.0);
        assert_approx(rows[0].underwriting_rate, 0.0);
        assert_approx(rows[1].downloads, 1500.0);
        assert_approx(rows[1].loan_page_rate, 0.0);
    }

    #[test]
    fn parse_renumbers_months_sequentially() {
        let rows = parse_csv("Month,Downloads\n9,100\n42,200\n");
        assert_eq!(rows[0].month, 1);
        assert_eq!(rows[1].month, 2);
    }

    #[test]
    fn parse_truncates_fractional_downloads() {
        let rows = parse_csv("Downloads\n1200.9\n");
        assert_approx(rows[0].downloads, 1200.0);
    }

    #[test]
    fn parse_of_empty_input_yields_no_rows() {
        assert!(parse_csv("").is_empty());
        assert!(parse_csv("Month,Downloads\n").is_empty());
    }

    #[test]
    fn report_carries_name_params_and_one_line_per_month() {
        let report = render_report(&sample_scenario());

        assert!(report.starts_with("Disbursal Simulator Report - Base case\n"));
        assert!(report.contains("Avg Ticket Size: \u{20b9}100,000"));
        assert!(report.contains("Repeat Ticket Size: \u{20b9}50,000"));
        assert!(report.contains("Repeat Conversion Rate: 10.00%"));
        assert!(report.contains("New Loans"));

        // Header block is 6 lines, then the column header, then 3 months.
        let month_lines = report
            .lines()
            .filter(|line| line.trim_start().starts_with(['1', '2', '3']))
            .count();
        assert_eq!(month_lines, 3);
    }

    #[test]
    fn group_thousands_inserts_separators() {
        assert_eq!(group_thousands(100_000.0), "100,000");
        assert_eq!(group_thousands(1_234_567.0), "1,234,567");
        assert_eq!(group_thousands(999.0), "999");
        assert_eq!(group_thousands(-50_000.0), "-50,000");
    }
}
