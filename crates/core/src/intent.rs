//! Intent Results
//!
//! The classified outcome of interpreting a single command string. An
//! `IntentResult` is what the dispatcher turns into a `response` envelope, and
//! a `Timer` intent additionally carries the number of seconds to arm.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The tag identifying which rule produced an `IntentResult`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Help,
    Time,
    Date,
    Timer,
    Joke,
    Math,
    Password,
    Motivation,
    Coin,
    Dice,
    Unknown,
    /// Speech was captured but could not be turned into a transcript.
    Error,
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            CommandType::Help => "help",
            CommandType::Time => "time",
            CommandType::Date => "date",
            CommandType::Timer => "timer",
            CommandType::Joke => "joke",
            CommandType::Math => "math",
            CommandType::Password => "password",
            CommandType::Motivation => "motivation",
            CommandType::Coin => "coin",
            CommandType::Dice => "dice",
            CommandType::Unknown => "unknown",
            CommandType::Error => "error",
        };
        f.write_str(tag)
    }
}

/// The response payload produced for one command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IntentResult {
    pub text: String,
    pub success: bool,
    pub command_type: CommandType,
    /// Seconds to wait before a timer completes. Only set for `CommandType::Timer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl IntentResult {
    /// A successful result with no timer attached.
    pub fn ok(command_type: CommandType, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
            command_type,
            duration: None,
        }
    }

    /// A result reporting that the command was not understood.
    pub fn failed(command_type: CommandType, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
            command_type,
            duration: None,
        }
    }

    /// A timer confirmation for `duration` seconds.
    pub fn timer(duration: u64) -> Self {
        let minutes = duration / 60;
        Self {
            text: format!(
                "Timer set for {} {}. I'll notify you when it's done!",
                minutes,
                minute_noun(minutes)
            ),
            success: true,
            command_type: CommandType::Timer,
            duration: Some(duration),
        }
    }

    /// Returns the timer duration if this result should arm a timer.
    pub fn timer_duration(&self) -> Option<u64> {
        match self.command_type {
            CommandType::Timer => self.duration,
            _ => None,
        }
    }
}

/// The notification text sent when a timer of `duration` seconds completes.
pub fn timer_finished_text(duration: u64) -> String {
    let minutes = duration / 60;
    format!("Timer finished! {} {} is up!", minutes, minute_noun(minutes))
}

/// "minute" or "minutes" depending on the count.
pub fn minute_noun(minutes: u64) -> &'static str {
    if minutes == 1 { "minute" } else { "minutes" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CommandType::Motivation).unwrap(),
            r#""motivation""#
        );
        assert_eq!(serde_json::to_string(&CommandType::Error).unwrap(), r#""error""#);
        assert_eq!(CommandType::Dice.to_string(), "dice");
    }

    #[test]
    fn test_duration_omitted_when_absent() {
        let result = IntentResult::ok(CommandType::Joke, "ha");
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"text":"ha","success":true,"command_type":"joke"}"#
        );
    }

    #[test]
    fn test_timer_result_pluralization() {
        let one = IntentResult::timer(60);
        assert_eq!(
            one.text,
            "Timer set for 1 minute. I'll notify you when it's done!"
        );
        assert_eq!(one.timer_duration(), Some(60));

        let five = IntentResult::timer(300);
        assert!(five.text.starts_with("Timer set for 5 minutes."));
        assert_eq!(five.duration, Some(300));
    }

    #[test]
    fn test_timer_finished_text() {
        assert_eq!(timer_finished_text(60), "Timer finished! 1 minute is up!");
        assert_eq!(timer_finished_text(120), "Timer finished! 2 minutes is up!");
        assert_eq!(timer_finished_text(30), "Timer finished! 0 minutes is up!");
    }

    #[test]
    fn test_timer_duration_ignored_for_other_types() {
        let mut result = IntentResult::ok(CommandType::Math, "The answer is 4");
        result.duration = Some(10);
        assert_eq!(result.timer_duration(), None);
    }
}
