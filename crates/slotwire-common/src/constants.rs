//! Workspace-wide constants.

/// Collector group that every `Runnable` result is contributed to.
///
/// Reserved for the framework: declarations may not name it explicitly.
pub const RUNNABLE_GROUP: &str = "slotwire_runnable";

/// Scope name used for the root (un-moduled) scope in graphs and plans.
pub const ROOT_SCOPE: &str = "root";

/// Graph name written in the DOT header.
pub const DOT_GRAPH_NAME: &str = "DI";

/// Default DOT layout direction.
pub const DEFAULT_RANKDIR: &str = "LR";

/// Layout directions accepted in DOT output.
pub const RANKDIRS: [&str; 4] = ["LR", "RL", "TB", "BT"];

/// Default DOT node font.
pub const DEFAULT_FONT: &str = "Helvetica";

/// Application name used in CLI output.
pub const APP_NAME: &str = "slotwire";
