pub mod batch_submitter;
pub mod cargo_allocation;
pub mod cargo_transfer_manager;
pub mod configuration;
pub mod fleet_commander;
pub mod fleet_state;
pub mod in_memory_ledger;
pub mod retry_policy;
pub mod sage_client;
pub mod telemetry;
pub mod transition_planner;

use chrono::TimeDelta;

#[cfg(test)]
pub mod test_objects;

/// Formats a duration as `hh:mm:ss`, with a leading `-` for negative deltas.
pub fn format_time_delta_hh_mm_ss(delta: TimeDelta) -> String {
    let total_seconds = delta.num_seconds();
    let sign = if total_seconds < 0 { "-" } else { "" };
    let total_seconds = total_seconds.abs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{sign}{:02}:{:02}:{:02}", hours, minutes, seconds)
}
