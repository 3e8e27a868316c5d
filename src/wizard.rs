//! Interactive prompts for `watermarker add`.
//!
//! When `--input` or a watermark source is missing and stdin is a terminal,
//! the CLI asks for whatever was not given on the command line:
//!
//! ```text
//! Select mode [single/batch] (single):
//! Input image path:
//! Watermark type [image/text] (image):
//! Watermark image path:
//! Position [tl/tr/bl/br/c] (br):
//! Opacity (0-100) (35):
//! Output path (leave blank for default):
//! ```
//!
//! Answers that are already known are kept and their prompt is skipped.
//! Invalid choices are asked again. Prompting goes through the [`Prompt`]
//! trait so the flow is testable with scripted answers.

use crate::types::{Opacity, Position};
use console::{Term, style};
use std::io::{self, IsTerminal};
use std::path::PathBuf;

/// A source of answers to questions.
pub trait Prompt {
    /// Show `question` and return the raw answer line.
    fn ask_line(&mut self, question: &str) -> io::Result<String>;
}

impl Prompt for Term {
    fn ask_line(&mut self, question: &str) -> io::Result<String> {
        self.write_str(&format!("{} ", style(question).bold()))?;
        self.read_line()
    }
}

/// Whether prompting makes sense: stdin must be a terminal.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// The options of `watermarker add` the wizard can fill in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Answers {
    pub input: Option<String>,
    pub output: Option<PathBuf>,
    pub watermark: Option<PathBuf>,
    pub text: Option<String>,
    pub position: Option<Position>,
    pub opacity: Option<u32>,
    pub recursive: bool,
}

impl Answers {
    /// True when the CLI cannot proceed without asking.
    pub fn needs_wizard(&self) -> bool {
        self.input.is_none() || (self.watermark.is_none() && self.text.is_none())
    }
}

fn ask(prompt: &mut impl Prompt, question: &str, default: Option<&str>) -> io::Result<String> {
    loop {
        let q = match default {
            Some(d) if !d.is_empty() => format!("{question} ({d}):"),
            _ => format!("{question}:"),
        };
        let answer = prompt.ask_line(&q)?.trim().to_string();
        match (answer.is_empty(), default) {
            (false, _) => return Ok(answer),
            (true, Some(d)) => return Ok(d.to_string()),
            (true, None) => continue,
        }
    }
}

fn choose(
    prompt: &mut impl Prompt,
    question: &str,
    options: &[&str],
    default: &str,
) -> io::Result<String> {
    let question = format!("{question} [{}]", options.join("/"));
    loop {
        let answer = ask(prompt, &question, Some(default))?.to_ascii_lowercase();
        if options.contains(&answer.as_str()) {
            return Ok(answer);
        }
    }
}

fn confirm(prompt: &mut impl Prompt, question: &str, default: bool) -> io::Result<bool> {
    let hint = if default { "Y/n" } else { "y/N" };
    loop {
        let answer = prompt
            .ask_line(&format!("{question} [{hint}]:"))?
            .trim()
            .to_ascii_lowercase();
        match answer.as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => continue,
        }
    }
}

/// Fill in the missing answers. `position` and `opacity` defaults come from
/// the effective configuration.
pub fn run_wizard(
    prompt: &mut impl Prompt,
    mut answers: Answers,
    default_position: Position,
    default_opacity: u32,
) -> io::Result<Answers> {
    if answers.input.is_none() {
        let mode = choose(prompt, "Select mode", &["single", "batch"], "single")?;
        if mode == "single" {
            answers.input = Some(ask(prompt, "Input image path", None)?);
        } else {
            answers.input = Some(ask(prompt, "Input folder path or glob pattern", None)?);
            if !answers.recursive {
                answers.recursive = confirm(prompt, "Search folders recursively?", true)?;
            }
        }
    }

    if answers.watermark.is_none() && answers.text.is_none() {
        let kind = choose(prompt, "Watermark type", &["image", "text"], "image")?;
        if kind == "image" {
            answers.watermark = Some(PathBuf::from(ask(prompt, "Watermark image path", None)?));
        } else {
            answers.text = Some(ask(prompt, "Watermark text", None)?);
        }
    }

    if answers.position.is_none() {
        let codes: Vec<&str> = Position::ALL.iter().map(|p| p.code()).collect();
        let code = choose(prompt, "Position", &codes, default_position.code())?;
        answers.position = code.parse().ok();
    }

    if answers.opacity.is_none() {
        let default = default_opacity.to_string();
        loop {
            let answer = ask(prompt, "Opacity (0-100)", Some(&default))?;
            if let Some(value) = answer.parse::<u32>().ok().filter(|v| Opacity::new(*v).is_ok()) {
                answers.opacity = Some(value);
                break;
            }
        }
    }

    if answers.output.is_none() {
        let answer = ask(prompt, "Output path (leave blank for default)", Some(""))?;
        if !answer.is_empty() {
            answers.output = Some(PathBuf::from(answer));
        }
    }

    Ok(answers)
}
