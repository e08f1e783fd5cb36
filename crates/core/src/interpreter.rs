//! Command Interpreter
//!
//! Turns a short natural-language command into an `IntentResult`. Matching is
//! keyword based and ordered: the first rule in `RULES` whose predicate accepts
//! the normalized command produces the result. The order of `RULES` is the
//! precedence policy, so "is it time for a joke" is a time query while
//! "tell me a joke about time" is a joke.
//!
//! Interpretation never fails. Commands nobody claims fall through to an
//! `unknown` result, and math that cannot be evaluated degrades to a usage hint.

use crate::intent::{CommandType, IntentResult};
use chrono::{Local, NaiveDateTime, Timelike};
use rand::{Rng, RngCore};
use regex::Regex;
use std::sync::LazyLock;

pub const HELP_TEXT: &str = "I can help you with: Ask for the time, Get today's date, Set timers, Tell jokes, Do math calculations, Generate passwords, Get motivational quotes, Flip coins, Roll dice, or say 'help' anytime!";

pub const FALLBACK_TEXT: &str =
    "I didn't understand that command. Say 'help' to hear what I can do!";

pub const MATH_HINT_TEXT: &str =
    "I can do simple math! Try saying 'calculate 25 plus 17' or 'what's 8 times 9'.";

/// Timer length used when a timer command does not name a number of minutes.
pub const DEFAULT_TIMER_SECONDS: u64 = 60;

pub const PASSWORD_LENGTH: usize = 12;

pub const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%";

pub const JOKES: &[&str] = &[
    "Why don't scientists trust atoms? Because they make up everything!",
    "I told my wife she was drawing her eyebrows too high. She looked surprised!",
    "Why don't programmers like nature? It has too many bugs!",
    "What do you call a fake noodle? An impasta!",
    "Why did the scarecrow win an award? He was outstanding in his field!",
    "I told my computer a joke about UDP. It didn't get it.",
    "Why do programmers prefer dark mode? Because light attracts bugs!",
];

pub const QUOTES: &[&str] = &[
    "The only way to do great work is to love what you do.",
    "Innovation distinguishes between a leader and a follower.",
    "The future belongs to those who believe in the beauty of their dreams.",
    "Success is not final, failure is not fatal: it is the courage to continue that counts.",
    "It is during our darkest moments that we must focus to see the light.",
];

pub const COIN_FACES: &[&str] = &["Heads", "Tails"];

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("number pattern is valid"));

/// Inputs a rule may need besides the command text itself.
pub struct InterpretContext<'a> {
    /// Local wall-clock time used by the time and date rules.
    pub now: NaiveDateTime,
    /// Randomness source for jokes, quotes, passwords, coins and dice.
    pub rng: &'a mut dyn RngCore,
}

/// One entry of the ordered rule list.
pub struct Rule {
    pub command_type: CommandType,
    matches: fn(&str) -> bool,
    respond: fn(&str, &mut InterpretContext<'_>) -> IntentResult,
}

impl Rule {
    /// Whether this rule claims an already normalized command.
    pub fn matches(&self, command: &str) -> bool {
        (self.matches)(command)
    }
}

/// The precedence list. Earlier entries win.
pub static RULES: [Rule; 10] = [
    Rule {
        command_type: CommandType::Help,
        matches: is_help,
        respond: respond_help,
    },
    Rule {
        command_type: CommandType::Time,
        matches: is_time,
        respond: respond_time,
    },
    Rule {
        command_type: CommandType::Date,
        matches: is_date,
        respond: respond_date,
    },
    Rule {
        command_type: CommandType::Timer,
        matches: is_timer,
        respond: respond_timer,
    },
    Rule {
        command_type: CommandType::Joke,
        matches: is_joke,
        respond: respond_joke,
    },
    Rule {
        command_type: CommandType::Math,
        matches: is_math,
        respond: respond_math,
    },
    Rule {
        command_type: CommandType::Password,
        matches: is_password,
        respond: respond_password,
    },
    Rule {
        command_type: CommandType::Motivation,
        matches: is_motivation,
        respond: respond_motivation,
    },
    Rule {
        command_type: CommandType::Coin,
        matches: is_coin,
        respond: respond_coin,
    },
    Rule {
        command_type: CommandType::Dice,
        matches: is_dice,
        respond: respond_dice,
    },
];

/// Stateless front door to the rule list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandInterpreter;

impl CommandInterpreter {
    pub fn new() -> Self {
        Self
    }

    /// The ordered rules this interpreter evaluates.
    pub fn rules(&self) -> &'static [Rule] {
        &RULES
    }

    /// Interprets `command` against the local clock and the thread RNG.
    pub fn interpret(&self, command: &str) -> IntentResult {
        let mut rng = rand::rng();
        let mut ctx = InterpretContext {
            now: Local::now().naive_local(),
            rng: &mut rng,
        };
        self.interpret_with(command, &mut ctx)
    }

    /// Interprets `command` with an explicit clock and randomness source.
    pub fn interpret_with(&self, command: &str, ctx: &mut InterpretContext<'_>) -> IntentResult {
        let normalized = command.trim().to_lowercase();
        match self.rules().iter().find(|rule| rule.matches(&normalized)) {
            Some(rule) => (rule.respond)(&normalized, ctx),
            None => IntentResult::failed(CommandType::Unknown, FALLBACK_TEXT),
        }
    }
}

fn contains_any(command: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| command.contains(needle))
}

fn is_help(command: &str) -> bool {
    contains_any(command, &["help", "what can you do", "commands"])
}

fn is_time(command: &str) -> bool {
    command.contains("time") && command.contains("is")
}

fn is_date(command: &str) -> bool {
    command.contains("date")
}

fn is_timer(command: &str) -> bool {
    command.contains("timer")
}

fn is_joke(command: &str) -> bool {
    command.contains("joke")
}

// Spoken operator words only claim a command that actually carries a calculation,
// so "roll dice two times" still reaches the dice rule.
fn is_math(command: &str) -> bool {
    contains_any(command, &["calculate", "math", "+", "-"])
        || (contains_any(command, &["plus", "minus", "times", "multiply", "divide"])
            && evaluate(command).is_some())
}

fn is_password(command: &str) -> bool {
    command.contains("password")
}

fn is_motivation(command: &str) -> bool {
    contains_any(command, &["motivate", "motivation", "inspire"])
}

fn is_coin(command: &str) -> bool {
    contains_any(command, &["flip coin", "coin flip"])
}

fn is_dice(command: &str) -> bool {
    contains_any(command, &["roll dice", "dice roll"])
}

fn respond_help(_: &str, _: &mut InterpretContext<'_>) -> IntentResult {
    IntentResult::ok(CommandType::Help, HELP_TEXT)
}

fn respond_time(_: &str, ctx: &mut InterpretContext<'_>) -> IntentResult {
    IntentResult::ok(
        CommandType::Time,
        format!("The time is {}:{:02}", ctx.now.hour(), ctx.now.minute()),
    )
}

fn respond_date(_: &str, ctx: &mut InterpretContext<'_>) -> IntentResult {
    IntentResult::ok(
        CommandType::Date,
        format!("Today is {}", ctx.now.format("%A, %B %d, %Y")),
    )
}

fn respond_timer(command: &str, _: &mut InterpretContext<'_>) -> IntentResult {
    IntentResult::timer(timer_seconds(command))
}

fn respond_joke(_: &str, ctx: &mut InterpretContext<'_>) -> IntentResult {
    IntentResult::ok(CommandType::Joke, pick(JOKES, ctx.rng))
}

fn respond_math(command: &str, _: &mut InterpretContext<'_>) -> IntentResult {
    match evaluate(command) {
        Some(answer) => IntentResult::ok(CommandType::Math, format!("The answer is {}", answer)),
        None => IntentResult::ok(CommandType::Math, MATH_HINT_TEXT),
    }
}

fn respond_password(_: &str, ctx: &mut InterpretContext<'_>) -> IntentResult {
    IntentResult::ok(
        CommandType::Password,
        format!(
            "Here's a secure password: {}. Make sure to save it somewhere safe!",
            generate_password(ctx.rng)
        ),
    )
}

fn respond_motivation(_: &str, ctx: &mut InterpretContext<'_>) -> IntentResult {
    IntentResult::ok(CommandType::Motivation, pick(QUOTES, ctx.rng))
}

fn respond_coin(_: &str, ctx: &mut InterpretContext<'_>) -> IntentResult {
    IntentResult::ok(
        CommandType::Coin,
        format!("The coin landed on {}!", pick(COIN_FACES, ctx.rng)),
    )
}

fn respond_dice(_: &str, ctx: &mut InterpretContext<'_>) -> IntentResult {
    let roll: u8 = ctx.rng.random_range(1..=6);
    IntentResult::ok(CommandType::Dice, format!("You rolled a {}!", roll))
}

fn pick(items: &[&'static str], rng: &mut dyn RngCore) -> &'static str {
    items[rng.random_range(0..items.len())]
}

/// Seconds for a timer command: the first all-digit token in minutes, or one minute.
pub fn timer_seconds(command: &str) -> u64 {
    command
        .split_whitespace()
        .filter(|token| token.chars().all(|c| c.is_ascii_digit()))
        .find_map(|token| token.parse::<u64>().ok()?.checked_mul(60))
        .unwrap_or(DEFAULT_TIMER_SECONDS)
}

/// Evaluates the first two integers in `command` with the operator it names.
///
/// Returns `None` when fewer than two numbers are present or the arithmetic
/// is undefined (overflow, division by zero).
pub fn evaluate(command: &str) -> Option<String> {
    let mut numbers = NUMBER.find_iter(command).map(|m| m.as_str());
    let a: i128 = numbers.next()?.parse().ok()?;
    let b: i128 = numbers.next()?.parse().ok()?;

    if contains_any(command, &["plus", "+"]) {
        a.checked_add(b).map(|r| r.to_string())
    } else if contains_any(command, &["minus", "-"]) {
        a.checked_sub(b).map(|r| r.to_string())
    } else if contains_any(command, &["times", "multiply"]) {
        a.checked_mul(b).map(|r| r.to_string())
    } else if command.contains("divide") {
        if b == 0 {
            return None;
        }
        // Debug keeps the fractional part, so 10 / 2 reads "5.0".
        Some(format!("{:?}", a as f64 / b as f64))
    } else {
        a.checked_add(b).map(|r| r.to_string())
    }
}

/// A random password drawn uniformly from `PASSWORD_ALPHABET`.
pub fn generate_password(rng: &mut dyn RngCore) -> String {
    (0..PASSWORD_LENGTH)
        .map(|_| PASSWORD_ALPHABET[rng.random_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}
