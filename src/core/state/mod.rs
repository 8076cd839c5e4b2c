mod app_state;
mod settings;

pub use app_state::{default_registries, AppState};
pub use settings::{Settings, SETTINGS_ENV};
