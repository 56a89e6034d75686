mod engine;
mod export;
mod persist;
mod store;
mod types;

pub use engine::{DEFAULT_DOWNLOADS, SummaryMetrics, project, seed_months, summary_metrics};
pub use export::{export_csv, parse_csv, render_report};
pub use persist::{DEFAULT_STATE_FILE, PersistedState, load_state, save_state};
pub use store::Store;
pub use types::{
    GlobalParams, GlobalParamsPatch, MonthField, MonthPatch, MonthlyRecord, Preset, PresetRates,
    Scenario,
};
