use jobfeed_client::{ConsoleMessenger, WebhookMessenger};
use jobfeed_core::error::AppError;
use jobfeed_core::models::{Destination, Job};
use jobfeed_core::traits::Messenger;

/// Endpoint value that routes a destination to stdout.
pub const CONSOLE_ENDPOINT: &str = "stdout";
pub const CONSOLE_DESTINATION: &str = "console";

/// Picks the transport per destination: `stdout` prints, anything else is a webhook URL.
#[derive(Clone)]
pub struct RoutedMessenger {
    webhook: WebhookMessenger,
    console: ConsoleMessenger,
}

impl RoutedMessenger {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            webhook: WebhookMessenger::new()?,
            console: ConsoleMessenger::new(),
        })
    }
}

fn is_console(destination: &Destination) -> bool {
    destination.endpoint == CONSOLE_ENDPOINT
}

impl Messenger for RoutedMessenger {
    fn max_batch_size(&self) -> usize {
        self.webhook.max_batch_size()
    }

    async fn send_text(&self, destination: &Destination, text: &str) -> Result<(), AppError> {
        if is_console(destination) {
            self.console.send_text(destination, text).await
        } else {
            self.webhook.send_text(destination, text).await
        }
    }

    async fn send_jobs(&self, destination: &Destination, jobs: &[Job]) -> Result<(), AppError> {
        if is_console(destination) {
            self.console.send_jobs(destination, jobs).await
        } else {
            self.webhook.send_jobs(destination, jobs).await
        }
    }
}

/// Parse `JOBFEED_WEBHOOKS`-style `id=url,id=url` lists.
pub fn parse_destinations(list: &str) -> Result<Vec<Destination>, AppError> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse)
        .collect()
}

/// A `--daily id=HH:MM[@Area/City]` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySpec {
    pub destination_id: String,
    pub hour: u32,
    pub minute: u32,
    pub timezone: Option<String>,
}

impl std::str::FromStr for DailySpec {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, rest) = s.split_once('=').ok_or_else(|| {
            AppError::ScheduleValidation(format!("expected id=HH:MM[@timezone], got '{s}'"))
        })?;
        let (time, timezone) = match rest.split_once('@') {
            Some((time, tz)) => (time, Some(tz.trim().to_string())),
            None => (rest, None),
        };
        let (hour, minute) = jobfeed_core::scheduler::parse_hhmm(time)?;
        let id = id.trim();
        if id.is_empty() {
            return Err(AppError::ScheduleValidation(format!(
                "missing destination id in '{s}'"
            )));
        }
        Ok(Self {
            destination_id: id.to_string(),
            hour,
            minute,
            timezone,
        })
    }
}
