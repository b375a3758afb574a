//! Line-oriented review screen over any async reader and writer.

use std::io::Write;
use std::str::FromStr;

use flashdeck_core::model::CardId;
use services::{DeleteEvent, DeleteSubmission, Navigation, ReviewController, SessionView};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewCommand {
    Next,
    Previous,
    Flip,
    /// Zero-based, converted from the 1-based number the user typed.
    Jump(usize),
    List,
    Delete(Option<CardId>),
    Refresh,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command {0:?}, type `h` for help")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("{0:?} is not a valid number")]
    InvalidNumber(String),
}

impl FromStr for ReviewCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            return Ok(Self::Next);
        };
        let arg = parts.next();
        match head {
            "n" | "next" => Ok(Self::Next),
            "p" | "prev" | "previous" => Ok(Self::Previous),
            "f" | "flip" => Ok(Self::Flip),
            "l" | "list" => Ok(Self::List),
            "r" | "refresh" => Ok(Self::Refresh),
            "h" | "help" | "?" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            "j" | "jump" => {
                let raw = arg.ok_or(CommandError::MissingArgument("j"))?;
                match raw.parse::<usize>() {
                    Ok(n) if n > 0 => Ok(Self::Jump(n - 1)),
                    _ => Err(CommandError::InvalidNumber(raw.to_owned())),
                }
            }
            "d" | "delete" => match arg {
                None => Ok(Self::Delete(None)),
                Some(raw) => raw
                    .parse::<CardId>()
                    .map(|id| Self::Delete(Some(id)))
                    .map_err(|_| CommandError::InvalidNumber(raw.to_owned())),
            },
            other => Err(CommandError::Unknown(other.to_owned())),
        }
    }
}

const HELP: &str = "\
commands:
  n, next       next card (Enter does the same)
  p, prev       previous card
  f, flip       show question/answer
  j <n>         jump to card n
  l, list       list all cards
  d [id]        delete the current card or the given id
  r, refresh    reload from the database
  q, quit       leave the session";

pub fn render(view: &SessionView, out: &mut impl Write) -> std::io::Result<()> {
    if view.is_empty {
        writeln!(out, "No flashcards yet. Add one with `flashdeck add`.")?;
        return Ok(());
    }
    let side = if view.answer_revealed { "A" } else { "Q" };
    if let (Some(position), Some(text)) = (view.position, view.display_text.as_deref()) {
        writeln!(out, "[{position}/{}] {side}: {text}", view.total)?;
    }
    if let Some(deleting) = view.deleting {
        writeln!(out, "  (deleting card {deleting}...)")?;
    }
    Ok(())
}

pub fn render_list(view: &SessionView, out: &mut impl Write) -> std::io::Result<()> {
    for (idx, item) in view.cards.iter().enumerate() {
        let marker = if item.is_current { '>' } else { ' ' };
        writeln!(
            out,
            "{marker} {:>3}. #{:<5} {}",
            idx + 1,
            item.id.to_string(),
            item.question
        )?;
    }
    Ok(())
}

async fn confirm<R>(lines: &mut Lines<R>, out: &mut impl Write, id: CardId) -> anyhow::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    write!(out, "Delete card {id}? [y/N] ")?;
    out.flush()?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn delete(ctrl: &ReviewController, id: CardId, out: &mut impl Write) -> anyhow::Result<()> {
    let submission = ctrl.submit_delete(id);
    writeln!(out, "{}", submission.event())?;
    let event = match submission {
        DeleteSubmission::Pending(handle) => handle.await?,
        DeleteSubmission::DeniedBusy => return Ok(()),
    };
    writeln!(out, "{event}")?;
    if event == DeleteEvent::Completed {
        render(&ctrl.projection(), out)?;
    }
    Ok(())
}

fn navigate(
    ctrl: &ReviewController,
    navigation: Navigation,
    out: &mut impl Write,
) -> std::io::Result<()> {
    match ctrl.navigate(navigation) {
        Ok(_) => render(&ctrl.projection(), out),
        Err(err) => writeln!(out, "{err}"),
    }
}

/// Drive a review session until `quit` or end of input.
pub async fn run<R>(ctrl: &ReviewController, input: R, out: &mut impl Write) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    writeln!(out, "Reviewing as {}. Type `h` for help.", ctrl.user().email)?;
    render(&ctrl.projection(), out)?;

    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        let command = match line.parse::<ReviewCommand>() {
            Ok(command) => command,
            Err(err) => {
                writeln!(out, "{err}")?;
                continue;
            }
        };

        match command {
            ReviewCommand::Quit => break,
            ReviewCommand::Help => writeln!(out, "{HELP}")?,
            ReviewCommand::Next => navigate(ctrl, Navigation::Next, out)?,
            ReviewCommand::Previous => navigate(ctrl, Navigation::Previous, out)?,
            ReviewCommand::Jump(index) => navigate(ctrl, Navigation::Index(index), out)?,
            ReviewCommand::Flip => {
                ctrl.toggle_answer();
                render(&ctrl.projection(), out)?;
            }
            ReviewCommand::List => render_list(&ctrl.projection(), out)?,
            ReviewCommand::Refresh => match ctrl.refresh().await {
                Ok(count) => {
                    writeln!(out, "Loaded {count} cards.")?;
                    render(&ctrl.projection(), out)?;
                }
                Err(err) => writeln!(out, "Refresh failed: {err}")?,
            },
            ReviewCommand::Delete(target) => {
                let view = ctrl.projection();
                let Some(id) = target.or_else(|| view.current.as_ref().map(|c| c.id)) else {
                    writeln!(out, "Nothing to delete.")?;
                    continue;
                };
                if confirm(&mut lines, out, id).await? {
                    delete(ctrl, id, out).await?;
                } else {
                    writeln!(out, "Kept card {id}.")?;
                }
            }
        }
    }

    Ok(())
}
