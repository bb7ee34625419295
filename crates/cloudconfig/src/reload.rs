//! Reload command for nodes that re-apply the document after it is written.

/// Invocation prefix; the document path is appended directly.
pub const CLOUD_INIT_COMMAND: &str = "/usr/bin/coreos-cloudinit --from-file=";

/// Command that re-applies the document stored at `path`, if one is configured.
pub fn reload_command(path: Option<&str>) -> Option<String> {
    path.map(|p| format!("{CLOUD_INIT_COMMAND}{p}"))
}
