use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::notify::{Notification, NotificationLevel, Notifier};
use crate::rides::{Confirm, Ride};

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(response), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                response.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: [] }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Output a serializable value as pretty JSON
pub fn output_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One line per ride for text output
pub fn format_ride_line(ride: &Ride) -> String {
    let fare = ride
        .actual_fare
        .or(ride.estimated_fare)
        .map(|f| format!("₹{}", f.round_dp(2)))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:<24}  {:<11}  {}  {} -> {}  {}",
        ride.id,
        ride.status.as_str(),
        ride.schedule_time.format("%Y-%m-%d %H:%M"),
        ride.pickup,
        ride.drop,
        fare
    )
}

pub fn output_rides(output_format: &OutputFormat, rides: &[Ride], pagination: Option<Value>) -> anyhow::Result<()> {
    if rides.is_empty() {
        return output_empty_collection(output_format, "rides", "No rides found");
    }

    match output_format {
        OutputFormat::Json => output_json(&json!({ "rides": rides, "pagination": pagination })),
        OutputFormat::Text => {
            for ride in rides {
                println!("{}", format_ride_line(ride));
            }
            if let Some(p) = pagination {
                println!(
                    "Page {} of {} ({} rides)",
                    p["page"].as_u64().unwrap_or(1),
                    p["totalPages"].as_u64().unwrap_or(1),
                    p["total"].as_u64().unwrap_or(rides.len() as u64)
                );
            }
            Ok(())
        }
    }
}

/// Notification sink for the terminal.
///
/// Text mode prints to stderr so stdout stays clean for data. JSON mode stays
/// quiet; failures are reported in the JSON envelope instead.
#[derive(Debug)]
pub struct ConsoleNotifier {
    output: OutputFormat,
    enabled: bool,
    errors: AtomicUsize,
}

impl ConsoleNotifier {
    pub fn new(output: OutputFormat, enabled: bool) -> Self {
        Self {
            output,
            enabled,
            errors: AtomicUsize::new(0),
        }
    }

    /// Errors shown to the user so far
    pub fn reported_errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!(level = ?notification.level, "{}", notification.message);
        if !self.enabled || self.output == OutputFormat::Json {
            return;
        }
        match notification.level {
            NotificationLevel::Success => eprintln!("✓ {}", notification.message),
            NotificationLevel::Info => eprintln!("{}", notification.message),
            NotificationLevel::Error => {
                self.errors.fetch_add(1, Ordering::SeqCst);
                eprintln!("✗ {}", notification.message);
            }
        }
    }
}

/// Prompts on stderr and reads the answer from stdin; anything but yes declines
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{} [y/N] ", prompt);
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Read a secret from stdin when it was not passed on the command line
pub fn prompt_value(label: &str, provided: Option<String>) -> anyhow::Result<String> {
    if let Some(value) = provided {
        return Ok(value);
    }

    eprint!("{}: ", label);
    io::stderr().flush()?;
    let mut value = String::new();
    io::stdin().lock().read_line(&mut value)?;
    let value = value.trim_end_matches(['\r', '\n']).to_string();
    if value.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(value)
}
