//! Joint server and plugin selection from a manifest, and reconciliation of
//! the selection with what is already on disk.
//!
//! [`plan_install`] only queries registries. [`apply_plan`] is the only part
//! that writes to the destination directory.

mod apply;
mod plan;
mod report;

pub use apply::{
    apply_plan, installed_plugin_versions, installed_servers, InstallOptions, PLUGIN_DIR,
};
pub use plan::{plan_install, InstallPlan, PlannedPlugin};
pub use report::{Action, InstallReport, PluginOutcome, ServerOutcome};
