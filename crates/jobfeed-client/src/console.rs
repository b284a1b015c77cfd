use std::io::Write;

use jobfeed_core::error::AppError;
use jobfeed_core::models::{Destination, Job};
use jobfeed_core::traits::Messenger;

/// Prints messages to stdout; used by the CLI when no webhook is configured.
#[derive(Clone, Default)]
pub struct ConsoleMessenger;

impl ConsoleMessenger {
    pub fn new() -> Self {
        Self
    }
}

/// Plain-text rendering of one job, one line per present field.
pub fn render_job(job: &Job) -> String {
    let mut out = format!("* {}\n  {}", job.title, job.link);
    for (label, value) in [
        ("Company", &job.company),
        ("Location", &job.location),
        ("Qualification", &job.qualification),
        ("Experience", &job.experience),
    ] {
        if let Some(value) = value {
            out.push_str(&format!("\n  {label}: {value}"));
        }
    }
    out
}

fn write_out(text: &str) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}").map_err(|e| AppError::DeliveryError(format!("stdout: {e}")))
}

impl Messenger for ConsoleMessenger {
    async fn send_text(&self, destination: &Destination, text: &str) -> Result<(), AppError> {
        write_out(&format!("[{}] {text}", destination.id))
    }

    async fn send_jobs(&self, _destination: &Destination, jobs: &[Job]) -> Result<(), AppError> {
        let rendered: Vec<String> = jobs.iter().map(render_job).collect();
        write_out(&rendered.join("\n"))
    }
}
