//! Question and configuration types.

use crate::error::{TriviaError, TriviaResult};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// A single trivia question.
///
/// Serialized with capitalised keys, e.g.
/// `{"Points": 50, "Game": "celeste", "Question": "...", "Answers": ["..."]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "Points", deserialize_with = "points")]
    pub points: u64,
    #[serde(rename = "Game")]
    pub game: String,
    #[serde(rename = "Question")]
    pub text: String,
    #[serde(rename = "Answers")]
    pub answers: Vec<String>,
}

/// Points were sometimes written as strings.
fn points<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Points {
        Number(u64),
        Text(String),
    }

    match Points::deserialize(deserializer)? {
        Points::Number(n) => Ok(n),
        Points::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

impl Question {
    pub fn new(
        game: impl Into<String>,
        points: u64,
        text: impl Into<String>,
        answers: Vec<String>,
    ) -> Self {
        Self {
            points,
            game: game.into(),
            text: text.into(),
            answers,
        }
    }

    /// Parse the body of an `add` subcommand.
    ///
    /// Format: `game:<g>|points:<p>|question:<q>|answers:<a,b,c>`. Only
    /// `question` and `answers` are required.
    pub fn parse_add(input: &str, default_game: &str, default_points: u64) -> TriviaResult<Self> {
        let mut game = None;
        let mut points = None;
        let mut text = None;
        let mut answers = None;

        for part in input.split('|') {
            let part = part.trim();
            if let Some(value) = strip_key(part, "points:") {
                points = Some(parse_points(value)?);
            } else if let Some(value) = strip_key(part, "game:") {
                game = Some(value.to_string());
            } else if let Some(value) = strip_key(part, "question:") {
                text = Some(value.to_string());
            } else if let Some(value) = strip_key(part, "answers:") {
                answers = Some(split_answers(value));
            }
        }

        let (Some(text), Some(answers)) = (text, answers) else {
            return Err(TriviaError::InvalidInput(
                "a question and answers are required".into(),
            ));
        };
        if text.is_empty() || answers.is_empty() {
            return Err(TriviaError::InvalidInput(
                "the question and answers must not be empty".into(),
            ));
        }

        let game = game
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| default_game.to_string());

        Ok(Self::new(game, points.unwrap_or(default_points), text, answers))
    }

    /// Whether a chat message body is a correct answer.
    pub fn is_answer(&self, body: &str) -> bool {
        let body = body.trim().to_lowercase();
        self.answers
            .iter()
            .any(|answer| answer.trim().to_lowercase() == body)
    }

    /// Announcement text, without the leading question number.
    pub fn describe(&self, point_name: &str) -> String {
        format!(
            "for {} {}: In {}, {}",
            self.points, point_name, self.game, self.text
        )
    }

    /// Apply an edit.
    pub fn apply(&mut self, edit: &QuestionEdit) -> TriviaResult<()> {
        match edit {
            QuestionEdit::Game(game) => self.game = game.clone(),
            QuestionEdit::Points(points) => self.points = *points,
            QuestionEdit::Text(text) => self.text = text.clone(),
            QuestionEdit::Answers(answers) => self.answers = answers.clone(),
            QuestionEdit::AddAnswer(answer) => {
                let answer = answer.to_lowercase();
                if self.answers.iter().any(|a| a.to_lowercase() == answer) {
                    return Err(TriviaError::InvalidInput(format!(
                        "\"{}\" is already an answer",
                        answer
                    )));
                }
                self.answers.push(answer);
            }
            QuestionEdit::DelAnswer(answer) => {
                let answer = answer.to_lowercase();
                let Some(pos) = self.answers.iter().position(|a| a.to_lowercase() == answer) else {
                    return Err(TriviaError::InvalidInput(format!(
                        "\"{}\" is not an answer",
                        answer
                    )));
                };
                self.answers.remove(pos);
            }
        }
        Ok(())
    }
}

/// A change to one field of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionEdit {
    Game(String),
    Points(u64),
    Text(String),
    Answers(Vec<String>),
    AddAnswer(String),
    DelAnswer(String),
}

impl QuestionEdit {
    pub const FIELDS: [&'static str; 6] = [
        "game",
        "points",
        "question",
        "answers",
        "addanswer",
        "delanswer",
    ];

    /// Parse a `<field> <value>` pair from the `modify` subcommand.
    pub fn parse(field: &str, value: &str) -> TriviaResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(TriviaError::InvalidInput("a new value is required".into()));
        }

        match field.to_lowercase().as_str() {
            "game" => Ok(Self::Game(value.to_string())),
            "points" => Ok(Self::Points(parse_points(value)?)),
            "question" => Ok(Self::Text(value.to_string())),
            "answers" => Ok(Self::Answers(split_answers(value))),
            "addanswer" => Ok(Self::AddAnswer(value.to_string())),
            "delanswer" => Ok(Self::DelAnswer(value.to_string())),
            other => Err(TriviaError::InvalidInput(format!(
                "unknown field \"{}\", expected one of {}",
                other,
                Self::FIELDS.join(", ")
            ))),
        }
    }
}

fn strip_key<'a>(part: &'a str, key: &str) -> Option<&'a str> {
    match part.get(..key.len()) {
        Some(head) if head.eq_ignore_ascii_case(key) => Some(part[key.len()..].trim()),
        _ => None,
    }
}

fn parse_points(value: &str) -> TriviaResult<u64> {
    value.trim().parse().map_err(|_| {
        TriviaError::InvalidInput(format!(
            "the points supplied, {}, were not a positive integer",
            value.trim()
        ))
    })
}

fn split_answers(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}

/// Trivia settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TriviaConfig {
    /// Command word that addresses the trivia handler.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Ignore ticks and commands while the channel is offline.
    #[serde(default = "default_true")]
    pub run_only_when_live: bool,

    /// Level needed to play (`everyone` for no restriction).
    #[serde(default = "default_player_permission")]
    pub player_permission: String,

    /// Level needed for admin subcommands.
    #[serde(default = "default_admin_permission")]
    pub admin_permission: String,

    /// How long a question stays open.
    #[serde(default = "default_question_duration", with = "humantime_serde")]
    pub question_duration: Duration,

    /// Pause between questions.
    #[serde(default = "default_cooldown", with = "humantime_serde")]
    pub cooldown: Duration,

    #[serde(default)]
    pub randomize_cooldown: bool,

    #[serde(default = "default_cooldown_lower", with = "humantime_serde")]
    pub cooldown_lower: Duration,

    #[serde(default = "default_cooldown_upper", with = "humantime_serde")]
    pub cooldown_upper: Duration,

    /// Start questions from the tick loop. When off, `!trivia` starts them.
    #[serde(default = "default_true")]
    pub automatically_run_questions: bool,

    /// Filter the pool by the channel's current game.
    #[serde(default)]
    pub enable_game_detection: bool,

    /// Name of the reward shown in announcements.
    #[serde(default = "default_point_name")]
    pub point_name: String,

    #[serde(default = "default_points")]
    pub default_points: u64,

    /// Winners accepted before a question ends early (0 = unlimited).
    #[serde(default = "default_number_of_winners")]
    pub number_of_winners: usize,

    #[serde(default)]
    pub use_grace_period: bool,

    /// Time left for further answers after the first correct one.
    #[serde(default = "default_grace_period", with = "humantime_serde")]
    pub grace_period: Duration,
}

impl Default for TriviaConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            run_only_when_live: default_true(),
            player_permission: default_player_permission(),
            admin_permission: default_admin_permission(),
            question_duration: default_question_duration(),
            cooldown: default_cooldown(),
            randomize_cooldown: false,
            cooldown_lower: default_cooldown_lower(),
            cooldown_upper: default_cooldown_upper(),
            automatically_run_questions: default_true(),
            enable_game_detection: false,
            point_name: default_point_name(),
            default_points: default_points(),
            number_of_winners: default_number_of_winners(),
            use_grace_period: false,
            grace_period: default_grace_period(),
        }
    }
}

fn default_command_prefix() -> String {
    "!trivia".into()
}

fn default_true() -> bool {
    true
}

fn default_player_permission() -> String {
    "everyone".into()
}

fn default_admin_permission() -> String {
    "moderator".into()
}

fn default_question_duration() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_cooldown() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_cooldown_lower() -> Duration {
    Duration::from_secs(2 * 60)
}

fn default_cooldown_upper() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_point_name() -> String {
    "Points".into()
}

fn default_points() -> u64 {
    50
}

fn default_number_of_winners() -> usize {
    1
}

fn default_grace_period() -> Duration {
    Duration::from_secs(2)
}
