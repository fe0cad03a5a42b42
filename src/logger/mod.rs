/**
 * Telemetry sink shared by every handler and cross-reference pass.
 *
 * Every recoverable condition named in spec §7 (truncation, decompression
 * failure, schema mismatch, corrupt record) is *reported* here rather than
 * raised. Embedding applications that want these events surfaced (a UI log
 * pane, a scan report) read them back with `get_logger().get_logs()`; the
 * engine itself does not install a sink, matching "logging sinks" being an
 * out-of-scope external collaborator (spec §1).
 */

pub mod logger;

pub use logger::{get_logger, LogLevel, Logger};
