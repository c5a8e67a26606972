//! Trivia round state machine.

use crate::error::{TriviaError, TriviaResult};
use crate::types::{Question, QuestionEdit, TriviaConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Delay before retrying when the pool is empty.
const EMPTY_POOL_RETRY: Duration = Duration::from_secs(60);

/// Observable engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaState {
    /// No question and the next one is due.
    Idle,
    /// Waiting for the cooldown to elapse.
    CountingDown,
    /// A question is open for answers.
    Active,
    /// Halted by an admin.
    Paused,
}

#[derive(Debug, Clone)]
struct Round {
    question: Question,
    /// 1-based position in the current pool when selected.
    number: usize,
    /// Index into the master list, cleared if the question is removed.
    master_index: Option<usize>,
    expires_at: Instant,
    /// User id and display name, in answer order.
    winners: Vec<(String, String)>,
    grace_armed: bool,
}

/// Question pool plus the single active round.
///
/// Every time-dependent method takes `now` from the caller so one tick sees
/// one consistent instant.
pub struct TriviaEngine {
    config: TriviaConfig,
    master: Vec<Question>,
    /// Indices into `master` that pass the game filter.
    current: Vec<usize>,
    detected_game: String,
    game_override: Option<String>,
    channel_live: bool,
    paused: bool,
    round: Option<Round>,
    last_number: Option<usize>,
    next_start: Instant,
    rng: StdRng,
}

impl TriviaEngine {
    pub fn new(config: TriviaConfig, questions: Vec<Question>, now: Instant) -> Self {
        Self::with_rng(config, questions, now, StdRng::from_entropy())
    }

    /// Engine with a fixed random source.
    pub fn with_rng(
        config: TriviaConfig,
        questions: Vec<Question>,
        now: Instant,
        rng: StdRng,
    ) -> Self {
        let mut engine = Self {
            config,
            master: questions,
            current: Vec::new(),
            detected_game: String::new(),
            game_override: None,
            channel_live: false,
            paused: false,
            round: None,
            last_number: None,
            next_start: now,
            rng,
        };
        engine.refresh_pool();
        engine
    }

    pub fn config(&self) -> &TriviaConfig {
        &self.config
    }

    pub fn state(&self, now: Instant) -> TriviaState {
        if self.paused {
            TriviaState::Paused
        } else if self.round.is_some() {
            TriviaState::Active
        } else if now < self.next_start {
            TriviaState::CountingDown
        } else {
            TriviaState::Idle
        }
    }

    /// Whether the live gate currently blocks trivia.
    pub fn is_gated(&self) -> bool {
        self.config.run_only_when_live && !self.channel_live
    }

    pub fn set_channel_live(&mut self, live: bool) {
        if live != self.channel_live {
            info!("Channel is now {}", if live { "live" } else { "offline" });
        }
        self.channel_live = live;
    }

    /// Advance the state machine. Returns messages to announce.
    pub fn tick(&mut self, now: Instant) -> Vec<String> {
        if self.paused || self.is_gated() {
            return Vec::new();
        }

        let expired = self.round.as_ref().map(|r| now >= r.expires_at);
        match expired {
            Some(true) => {
                debug!("Question time exceeded, ending question");
                self.end_question(now).into_iter().collect()
            }
            Some(false) => Vec::new(),
            None if now >= self.next_start && self.config.automatically_run_questions => {
                match self.start_question(None, now) {
                    Ok(announcement) => vec![announcement],
                    Err(_) => {
                        warn!("No questions available, trying again in 60 seconds");
                        self.next_start = now + EMPTY_POOL_RETRY;
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        }
    }

    /// Open a question. `number` is 1-based in the current pool; `None`
    /// picks at random, avoiding the previous question when possible.
    pub fn start_question(&mut self, number: Option<usize>, now: Instant) -> TriviaResult<String> {
        let len = self.current.len();
        if len == 0 {
            return Err(TriviaError::NoQuestions);
        }

        let number = match number {
            Some(n) if n == 0 || n > len => {
                return Err(TriviaError::NotFound { number: n, max: len })
            }
            Some(n) => n,
            None => self.pick_random(len),
        };

        let master_index = self.current[number - 1];
        let question = self.master[master_index].clone();
        let announcement = format!(
            "Question {} {}",
            number,
            question.describe(&self.config.point_name)
        );

        self.round = Some(Round {
            question,
            number,
            master_index: Some(master_index),
            expires_at: now + self.config.question_duration,
            winners: Vec::new(),
            grace_armed: false,
        });
        self.last_number = Some(number);

        debug!("Started question {}", number);
        Ok(announcement)
    }

    fn pick_random(&mut self, len: usize) -> usize {
        loop {
            let candidate = self.rng.gen_range(0..len) + 1;
            if len == 1 || Some(candidate) != self.last_number {
                return candidate;
            }
        }
    }

    /// Close the active round and schedule the next one.
    pub fn end_question(&mut self, now: Instant) -> Option<String> {
        let cooldown = self.next_cooldown();
        self.next_start = now + cooldown;

        let round = self.round.take()?;
        let names: Vec<&str> = round.winners.iter().map(|(_, name)| name.as_str()).collect();

        let message = match names.as_slice() {
            [] => format!(
                "Trivia: Nobody answered the previous question. The answers were {}.",
                round.question.answers.join(", ")
            ),
            [one] => format!("Trivia: {} answered correctly!", one),
            [first, second] => format!("Trivia: {} and {} answered correctly!", first, second),
            [rest @ .., last] => format!(
                "Trivia: {}, and {} answered correctly!",
                rest.join(", "),
                last
            ),
        };

        info!(
            "Question {} ended with {} winners, next in {:?}",
            round.number,
            names.len(),
            cooldown
        );
        Some(message)
    }

    fn next_cooldown(&mut self) -> Duration {
        if !self.config.randomize_cooldown {
            return self.config.cooldown;
        }
        let lower = self.config.cooldown_lower.as_secs();
        let upper = self.config.cooldown_upper.as_secs();
        let (lower, upper) = if lower <= upper { (lower, upper) } else { (upper, lower) };
        Duration::from_secs(self.rng.gen_range(lower..=upper))
    }

    /// Check a chat message against the active question.
    ///
    /// Returns the end-of-round announcement when this answer closes it.
    pub fn check_answer(
        &mut self,
        user_id: &str,
        display_name: &str,
        body: &str,
        now: Instant,
    ) -> Option<String> {
        if self.paused || self.is_gated() {
            return None;
        }
        let round = self.round.as_mut()?;
        if !round.question.is_answer(body) {
            return None;
        }

        match round.winners.iter_mut().find(|(id, _)| id == user_id) {
            Some(entry) => entry.1 = display_name.to_string(),
            None => round.winners.push((user_id.to_string(), display_name.to_string())),
        }
        debug!("{} answered question {} correctly", display_name, round.number);

        let limit = self.config.number_of_winners;
        if limit > 0 && round.winners.len() >= limit {
            return self.end_question(now);
        }

        if self.config.use_grace_period && !round.grace_armed {
            round.expires_at = now + self.config.grace_period;
            round.grace_armed = true;
        }
        None
    }

    /// Returns false if already paused.
    pub fn pause(&mut self) -> bool {
        !std::mem::replace(&mut self.paused, true)
    }

    /// Returns false if not paused.
    pub fn resume(&mut self) -> bool {
        std::mem::replace(&mut self.paused, false)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The active question and its number.
    pub fn active_question(&self) -> Option<(usize, &Question)> {
        self.round.as_ref().map(|r| (r.number, &r.question))
    }

    pub fn winner_count(&self) -> usize {
        self.round.as_ref().map(|r| r.winners.len()).unwrap_or(0)
    }

    pub fn time_remaining(&self, now: Instant) -> Option<Duration> {
        self.round
            .as_ref()
            .map(|r| r.expires_at.saturating_duration_since(now))
    }

    pub fn time_until_next(&self, now: Instant) -> Duration {
        self.next_start.saturating_duration_since(now)
    }

    pub fn announcement_for(&self, number: usize, question: &Question) -> String {
        format!("Question {} {}", number, question.describe(&self.config.point_name))
    }

    // Pool maintenance

    pub fn pool_len(&self) -> usize {
        self.current.len()
    }

    pub fn master_len(&self) -> usize {
        self.master.len()
    }

    pub fn questions(&self) -> &[Question] {
        &self.master
    }

    /// Question `number` (1-based) in the current pool.
    pub fn question(&self, number: usize) -> TriviaResult<&Question> {
        let index = self.pool_index(number)?;
        Ok(&self.master[index])
    }

    /// Answers of question `number`, or of the active question.
    pub fn answers(&self, number: Option<usize>) -> TriviaResult<&[String]> {
        match number {
            Some(n) => Ok(&self.question(n)?.answers),
            None => self
                .round
                .as_ref()
                .map(|r| r.question.answers.as_slice())
                .ok_or(TriviaError::NoActiveQuestion),
        }
    }

    pub fn add_question(&mut self, question: Question) {
        info!("Adding question for {}: {}", question.game, question.text);
        self.master.push(question);
        self.refresh_pool();
    }

    /// Remove question `number` from the pool. An active round keeps its copy.
    pub fn remove_question(&mut self, number: usize) -> TriviaResult<Question> {
        let index = self.pool_index(number)?;
        let removed = self.master.remove(index);

        if let Some(round) = self.round.as_mut() {
            round.master_index = match round.master_index {
                Some(i) if i == index => None,
                Some(i) if i > index => Some(i - 1),
                other => other,
            };
        }

        self.refresh_pool();
        info!("Removed question: {}", removed.text);
        Ok(removed)
    }

    /// Apply `edit` to question `number`, and to the active round if it is
    /// the same question.
    pub fn modify_question(&mut self, number: usize, edit: &QuestionEdit) -> TriviaResult<()> {
        let index = self.pool_index(number)?;
        self.master[index].apply(edit)?;

        if let Some(round) = self.round.as_mut() {
            if round.master_index == Some(index) {
                round.question = self.master[index].clone();
            }
        }

        self.refresh_pool();
        debug!("Modified question {}: {:?}", number, edit);
        Ok(())
    }

    fn pool_index(&self, number: usize) -> TriviaResult<usize> {
        if number == 0 || number > self.current.len() {
            return Err(TriviaError::NotFound {
                number,
                max: self.current.len(),
            });
        }
        Ok(self.current[number - 1])
    }

    // Game filter

    /// Game the pool is filtered by: the override, else the detected game.
    pub fn current_game(&self) -> &str {
        self.game_override.as_deref().unwrap_or(&self.detected_game)
    }

    pub fn game_override(&self) -> Option<&str> {
        self.game_override.as_deref()
    }

    pub fn detected_game(&self) -> &str {
        &self.detected_game
    }

    /// Record the game reported by the channel.
    pub fn set_detected_game(&mut self, game: &str) {
        let game = game.trim().to_lowercase();
        if game != self.detected_game {
            debug!("Detected game changed to \"{}\"", game);
            self.detected_game = game;
            self.refresh_pool();
        }
    }

    /// Set or clear the game override.
    pub fn set_game_override(&mut self, game: Option<&str>) {
        self.game_override = game
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty());
        self.refresh_pool();
    }

    /// Whether the pool is currently narrowed by game.
    pub fn is_filtered(&self) -> bool {
        self.config.enable_game_detection
    }

    fn refresh_pool(&mut self) {
        self.current = if self.config.enable_game_detection {
            let game = self.current_game().to_lowercase();
            self.master
                .iter()
                .enumerate()
                .filter(|(_, q)| q.game.to_lowercase() == game)
                .map(|(i, _)| i)
                .collect()
        } else {
            (0..self.master.len()).collect()
        };
    }
}

/// Format a duration as `H hours, M minutes, S seconds`, leaving out zero
/// leading units.
pub fn format_remaining(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{} hours, {} minutes, {} seconds", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{} minutes, {} seconds", minutes, seconds)
    } else {
        format!("{} seconds", seconds)
    }
}
