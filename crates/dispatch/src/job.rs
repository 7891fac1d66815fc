//! Job requests and validated dispatch jobs

use transport::Destination;

use crate::error::{Error, Result};

/// Unvalidated bulk send request as received from the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub count: String,
    pub template: String,
    pub destination: Destination,
}

impl JobRequest {
    pub fn new(
        count: impl Into<String>,
        template: impl Into<String>,
        destination: impl Into<Destination>,
    ) -> Self {
        Self {
            count: count.into(),
            template: template.into(),
            destination: destination.into(),
        }
    }

    /// Check the request against `max_messages` and assign a job id.
    pub fn validate(self, max_messages: u32) -> Result<DispatchJob> {
        let count: i64 = self
            .count
            .trim()
            .parse()
            .map_err(|_| Error::InvalidCount(self.count.clone()))?;

        if count < 1 || count > i64::from(max_messages) {
            return Err(Error::CountOutOfRange {
                count,
                max: max_messages,
            });
        }

        if self.template.trim().is_empty() {
            return Err(Error::EmptyTemplate);
        }

        Ok(DispatchJob {
            id: format!("job_{}", uuid::Uuid::new_v4().as_simple()),
            count: count as u32,
            template: self.template,
            destination: self.destination,
        })
    }
}

/// A validated job: `count` messages built from `template`, all sent to
/// `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchJob {
    pub id: String,
    pub count: u32,
    pub template: String,
    pub destination: Destination,
}

impl DispatchJob {
    /// Text of message `seq` (1-based): the template tagged with its sequence
    /// number.
    pub fn message_text(&self, seq: u32) -> String {
        format!("{} [{seq}]", self.template)
    }
}
