//! Trivia command and answer detection.

use crate::commands::{Context, MessageListener};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use tracing::{debug, info};
use trivia::{format_remaining, Question, QuestionEdit, TriviaError};

/// Handles `!trivia ...` and checks every other message for answers.
pub struct TriviaHandler {
    /// Full command word, e.g. `!trivia`.
    command: String,
    name: String,
}

impl TriviaHandler {
    pub fn new(command: &str) -> Self {
        let command = command.trim().to_lowercase();
        let name = command
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .to_string();
        Self { command, name }
    }

    fn is_command(&self, text: &str) -> bool {
        text.split_whitespace()
            .next()
            .map(|word| word.eq_ignore_ascii_case(&self.command))
            .unwrap_or(false)
    }

    fn require_admin(&self, ctx: &Context<'_>) -> AppResult<()> {
        let level = &ctx.state.trivia_config().admin_permission;
        if ctx.caller.has(level) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied {
                required: vec![level.clone()],
            })
        }
    }

    fn require_player(&self, ctx: &Context<'_>) -> AppResult<()> {
        let level = &ctx.state.trivia_config().player_permission;
        if ctx.caller.has(level) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied {
                required: vec![level.clone()],
            })
        }
    }

    async fn run(&self, ctx: &mut Context<'_>, args: &str) -> AppResult<()> {
        let subcommand = args.split_whitespace().next().map(str::to_lowercase);
        let rest = after_word(args);

        match subcommand.as_deref() {
            None => self.status(ctx),
            Some("start") | Some("unpause") => {
                self.require_admin(ctx)?;
                if ctx.state.trivia.resume() {
                    info!("Trivia started by {}", ctx.caller.login);
                    ctx.reply("Trivia: Trivia started.");
                } else {
                    ctx.reply("Trivia: Trivia is already running.");
                }
                Ok(())
            }
            Some("stop") | Some("pause") => {
                self.require_admin(ctx)?;
                if ctx.state.trivia.pause() {
                    info!("Trivia paused by {}", ctx.caller.login);
                    ctx.mention("Trivia paused.");
                } else {
                    ctx.mention("Trivia is already paused.");
                }
                Ok(())
            }
            Some("load") => self.load(ctx, rest),
            Some("game") => self.game(ctx, rest).await,
            Some("count") => {
                let trivia = &ctx.state.trivia;
                let text = if trivia.is_filtered() {
                    format!(
                        "There are {} questions from the current game and {} questions total.",
                        trivia.pool_len(),
                        trivia.master_len()
                    )
                } else {
                    format!("There are {} questions total.", trivia.master_len())
                };
                ctx.mention(text);
                Ok(())
            }
            Some("answers") => {
                self.require_admin(ctx)?;
                let number = parse_number(rest.split_whitespace().next())?;
                let answers = ctx.state.trivia.answers(number)?.join(", ");
                let text = match number {
                    Some(_) => format!("The answers to that question are: {}.", answers),
                    None => format!("The answers to the current question are: {}.", answers),
                };
                ctx.mention(text);
                Ok(())
            }
            Some("add") => self.add(ctx, rest).await,
            Some("remove") => {
                self.require_admin(ctx)?;
                let number = parse_number(rest.split_whitespace().next())?.ok_or_else(|| {
                    AppError::UserInput(format!(
                        "Syntax for remove command is \"{} remove <index>\".",
                        self.command
                    ))
                })?;
                ctx.state.trivia.remove_question(number)?;
                ctx.state.save_questions().await;
                ctx.mention("Question removed.");
                Ok(())
            }
            Some("modify") => self.modify(ctx, rest).await,
            Some(other) => Err(AppError::UserInput(format!(
                "Unknown trivia subcommand \"{}\".",
                other
            ))),
        }
    }

    /// Bare command: show, start or schedule a question.
    fn status(&self, ctx: &mut Context<'_>) -> AppResult<()> {
        self.require_player(ctx)?;
        let now = ctx.now;
        let trivia = &mut ctx.state.trivia;

        if trivia.is_paused() {
            ctx.mention("Trivia is currently paused.");
            return Ok(());
        }
        if trivia.pool_len() == 0 {
            let text = if trivia.is_filtered() && trivia.master_len() > 0 {
                "Could not load trivia. No questions exist for the current game."
            } else {
                "Could not load trivia. No questions exist."
            };
            ctx.mention(text);
            return Ok(());
        }

        if let Some((number, question)) = trivia.active_question() {
            let announcement = trivia.announcement_for(number, question);
            let remaining = trivia.time_remaining(now).unwrap_or_default();
            ctx.reply(announcement);
            ctx.mention(format!(
                "Time remaining on current question: {}",
                format_remaining(remaining)
            ));
        } else if !trivia.config().automatically_run_questions {
            let announcement = trivia.start_question(None, now)?;
            ctx.reply(announcement);
        } else {
            let wait = trivia.time_until_next(now);
            ctx.mention(format!(
                "There is no active trivia question. The next trivia question arrives in {}.",
                format_remaining(wait)
            ));
        }
        Ok(())
    }

    fn load(&self, ctx: &mut Context<'_>, rest: &str) -> AppResult<()> {
        self.require_admin(ctx)?;
        if ctx.state.trivia.is_paused() {
            ctx.mention("Trivia is currently paused.");
            return Ok(());
        }

        let number = parse_number(rest.split_whitespace().next())?;
        match ctx.state.trivia.start_question(number, ctx.now) {
            Ok(announcement) => {
                ctx.reply(announcement);
                Ok(())
            }
            Err(TriviaError::NoQuestions) => {
                let trivia = &ctx.state.trivia;
                let text = if trivia.is_filtered() && trivia.master_len() > 0 {
                    "No applicable questions exist for the currently detected game."
                } else {
                    "There are no questions available."
                };
                ctx.mention(text);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn game(&self, ctx: &mut Context<'_>, rest: &str) -> AppResult<()> {
        self.require_admin(ctx)?;
        let rest = rest.trim();

        if rest.is_empty() {
            let text = format!(
                "The currently active game is \"{}\".",
                ctx.state.trivia.current_game()
            );
            ctx.mention(text);
            return Ok(());
        }

        if rest.eq_ignore_ascii_case("detect") {
            let info = ctx.transport.fetch_channel_info().await?;
            let reported = info.game_name.trim().to_lowercase();
            let previous = ctx.state.trivia.current_game().to_string();

            let trivia = &mut ctx.state.trivia;
            trivia.set_channel_live(info.is_live);
            trivia.set_game_override(None);
            trivia.set_detected_game(&reported);

            let text = if previous == reported {
                format!(
                    "The channel reports the current game as \"{}\". Currently showing trivia for \"{}\".",
                    reported, reported
                )
            } else {
                format!(
                    "The channel reports the current game as \"{}\". Trivia game has been updated from \"{}\" to \"{}\".",
                    reported, previous, reported
                )
            };
            ctx.mention(text);
            return Ok(());
        }

        match rest.get(..4) {
            Some(head) if head.eq_ignore_ascii_case("set:") => {
                let game = rest[4..].trim();
                if game.is_empty() {
                    ctx.state.trivia.set_game_override(None);
                    ctx.mention("Game detection override disabled.");
                } else {
                    ctx.state.trivia.set_game_override(Some(game));
                    let text = format!(
                        "Game detection override updated to {}.",
                        ctx.state.trivia.current_game()
                    );
                    ctx.mention(text);
                }
                Ok(())
            }
            _ => Err(AppError::UserInput(format!(
                "Syntax for game command is \"{} game (detect|set:<game>)\".",
                self.command
            ))),
        }
    }

    async fn add(&self, ctx: &mut Context<'_>, rest: &str) -> AppResult<()> {
        self.require_admin(ctx)?;
        let syntax = format!(
            "Syntax for add command is \"{} add (game:<name of game>|)(points:<positive integer number of points>|)question:<question>|answers:<comma-separated list of answers>\".",
            self.command
        );
        if rest.trim().is_empty() {
            return Err(AppError::UserInput(syntax));
        }

        let default_game = match ctx.state.trivia.current_game() {
            "" => "none".to_string(),
            game => game.to_string(),
        };
        let default_points = ctx.state.trivia_config().default_points;

        let question = match Question::parse_add(rest, &default_game, default_points) {
            Ok(question) => question,
            Err(TriviaError::InvalidInput(reason)) => {
                return Err(AppError::UserInput(format!(
                    "Could not add the question: {}. {}",
                    reason, syntax
                )))
            }
            Err(e) => return Err(e.into()),
        };

        ctx.state.trivia.add_question(question);
        ctx.state.save_questions().await;
        ctx.mention("Question added.");
        Ok(())
    }

    async fn modify(&self, ctx: &mut Context<'_>, rest: &str) -> AppResult<()> {
        self.require_admin(ctx)?;
        let syntax = || {
            AppError::UserInput(format!(
                "Syntax for modify command is \"{} modify <index> <{}> <new value>\".",
                self.command,
                QuestionEdit::FIELDS.join("/")
            ))
        };

        let mut words = rest.split_whitespace();
        let number = parse_number(words.next())?.ok_or_else(syntax)?;
        let field = words.next().ok_or_else(syntax)?;
        let value = after_word(after_word(rest));
        if value.is_empty() {
            return Err(syntax());
        }

        let edit = QuestionEdit::parse(field, value)?;
        ctx.state.trivia.modify_question(number, &edit)?;
        ctx.state.save_questions().await;
        ctx.mention("Question modified.");
        Ok(())
    }
}

#[async_trait]
impl MessageListener for TriviaHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_message(&self, ctx: &mut Context<'_>) -> AppResult<()> {
        if ctx.state.trivia.is_gated() {
            return Ok(());
        }

        let message = ctx.message;
        let text = message.text.trim();
        if self.is_command(text) {
            debug!("Trivia command from {}: {}", ctx.caller.login, text);
            return self.run(ctx, after_word(text)).await;
        }

        if !ctx.caller.has(&ctx.state.trivia_config().player_permission) {
            return Ok(());
        }

        let ended = ctx.state.trivia.check_answer(
            &ctx.caller.user_id,
            &ctx.caller.display_name,
            text,
            ctx.now,
        );
        if let Some(announcement) = ended {
            ctx.reply(announcement);
        }
        Ok(())
    }
}

/// Text after the first word, trimmed.
fn after_word(text: &str) -> &str {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(pos) => text[pos..].trim(),
        None => "",
    }
}

fn parse_number(raw: Option<&str>) -> AppResult<Option<usize>> {
    match raw {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(Some(n)),
            _ => Err(AppError::UserInput(
                "The index value supplied must be a positive integer.".into(),
            )),
        },
    }
}
