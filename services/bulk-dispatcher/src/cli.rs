//! Command line parsing
//!
//! `bulk-dispatcher [--config PATH] [--status-chat ID] <chat_id> <count> <message...>`
//!
//! The count is passed through unparsed; `JobRequest::validate` owns the
//! numeric and range checks.

use dispatch::JobRequest;
use thiserror::Error;

pub const USAGE: &str =
    "usage: bulk-dispatcher [--config PATH] [--status-chat ID] <chat_id> <count> <message...>";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("{0} requires a value\n{usage}", usage = USAGE)]
    MissingValue(&'static str),

    #[error("unknown option {0}\n{usage}", usage = USAGE)]
    UnknownOption(String),

    #[error("{usage}", usage = USAGE)]
    Usage,
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: Option<String>,
    pub status_chat: Option<String>,
    pub destination: String,
    pub count: String,
    pub message: String,
}

impl CliArgs {
    pub fn job_request(&self) -> JobRequest {
        JobRequest::new(
            self.count.clone(),
            self.message.clone(),
            self.destination.as_str(),
        )
    }
}

/// Parse arguments (without the program name). Options may appear anywhere
/// before the message words; everything after `<count>` is the message.
pub fn parse_args(args: &[String]) -> Result<CliArgs, CliError> {
    let mut config_path = None;
    let mut status_chat = None;
    let mut positional: Vec<&str> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        // Once chat id and count are known, the rest is message text verbatim
        if positional.len() >= 2 {
            positional.push(arg);
            continue;
        }
        match arg.as_str() {
            "--config" => {
                config_path = Some(iter.next().ok_or(CliError::MissingValue("--config"))?.clone());
            }
            "--status-chat" => {
                status_chat = Some(
                    iter.next()
                        .ok_or(CliError::MissingValue("--status-chat"))?
                        .clone(),
                );
            }
            "-h" | "--help" => return Err(CliError::Usage),
            flag if flag.starts_with("--") => return Err(CliError::UnknownOption(flag.into())),
            value => positional.push(value),
        }
    }

    if positional.len() < 3 {
        return Err(CliError::Usage);
    }

    Ok(CliArgs {
        config_path,
        status_chat,
        destination: positional[0].to_string(),
        count: positional[1].to_string(),
        message: positional[2..].join(" "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_positionals_and_joins_message() {
        let cli = parse_args(&args(&["-1001234", "5000", "hello", "there", "world"])).unwrap();
        assert_eq!(cli.destination, "-1001234");
        assert_eq!(cli.count, "5000");
        assert_eq!(cli.message, "hello there world");
        assert_eq!(cli.config_path, None);
        assert_eq!(cli.status_chat, None);
    }

    #[test]
    fn parses_options_before_positionals() {
        let cli = parse_args(&args(&[
            "--config",
            "/etc/bulk.toml",
            "--status-chat",
            "99",
            "42",
            "10",
            "hi",
        ]))
        .unwrap();
        assert_eq!(cli.config_path.as_deref(), Some("/etc/bulk.toml"));
        assert_eq!(cli.status_chat.as_deref(), Some("99"));
        assert_eq!(cli.destination, "42");
    }

    #[test]
    fn message_words_may_look_like_flags() {
        let cli = parse_args(&args(&["42", "3", "--config", "is", "text"])).unwrap();
        assert_eq!(cli.message, "--config is text");
        assert_eq!(cli.config_path, None);
    }

    #[test]
    fn count_is_not_interpreted_here() {
        let cli = parse_args(&args(&["42", "many", "hi"])).unwrap();
        assert_eq!(cli.count, "many");
        assert!(cli.job_request().validate(100).is_err());
    }

    #[test]
    fn missing_message_is_usage_error() {
        assert_eq!(parse_args(&args(&["42", "10"])), Err(CliError::Usage));
        assert_eq!(parse_args(&args(&[])), Err(CliError::Usage));
    }

    #[test]
    fn option_without_value_is_rejected() {
        assert_eq!(
            parse_args(&args(&["--config"])),
            Err(CliError::MissingValue("--config"))
        );
    }

    #[test]
    fn unknown_option_is_rejected() {
        assert_eq!(
            parse_args(&args(&["--turbo", "42", "10", "hi"])),
            Err(CliError::UnknownOption("--turbo".into()))
        );
    }

    #[test]
    fn job_request_carries_all_fields() {
        let cli = parse_args(&args(&["42", "7", "rocket"])).unwrap();
        let job = cli.job_request().validate(10_000).unwrap();
        assert_eq!(job.count, 7);
        assert_eq!(job.template, "rocket");
        assert_eq!(job.destination.as_str(), "42");
    }
}
