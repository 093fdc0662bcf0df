use std::fmt::Write as _;

use crate::workflows::jobs::domain::{Job, Trade};

/// Rendered e-mail style alert for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl NotificationMessage {
    /// Returns `None` when the trade has no address to send to.
    pub fn render(job: &Job, trade: &Trade, is_premium: bool, base_url: &str) -> Option<Self> {
        let recipient = trade.email.as_deref()?.trim();
        if recipient.is_empty() {
            return None;
        }

        let priority = if is_premium {
            "PREMIUM EARLY ACCESS"
        } else {
            "NEW JOB ALERT"
        };
        let subject = format!(
            "TradeSOS {priority}: {} - {}",
            job.urgency.headline(),
            job.fields.title
        );

        let mut body = String::new();
        if is_premium {
            let _ = writeln!(body, "PREMIUM EARLY ACCESS");
        }
        let _ = writeln!(body, "{}", job.urgency.label());
        let _ = writeln!(body);
        let _ = writeln!(body, "{}", job.fields.title);
        let _ = writeln!(body, "Category: {}", title_case(&job.fields.category));
        let _ = writeln!(body, "Location: {}", job.postcode.full());
        let _ = writeln!(body, "Description:");
        let _ = writeln!(body, "{}", job.fields.description);
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "To accept this job, log in to your TradeSOS dashboard: {}/trade/dashboard",
            base_url.trim_end_matches('/')
        );
        let _ = write!(
            body,
            "This job was sent to you because it matches your coverage area. First trade to accept gets the job!"
        );

        Some(Self {
            recipient: recipient.to_string(),
            subject,
            body,
        })
    }
}

fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
