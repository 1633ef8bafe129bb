//! Operator refinement of drafts.
//!
//! The synthesis pipeline talks to a [`RefinementSession`]: it asks a typed
//! [`Question`] and gets back an already-validated [`Answer`]. The textual
//! question/answer protocol lives in [`PromptSession`], which sits on top of
//! any [`Operator`] (a terminal, an answers file, a test script).

use crate::draft::ConstraintDraft;
use crate::graph::{Literal, Term};
use crate::vocab::{integer_value_space, xsd, LiteralKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question {
    Required,
    Functional,
    IntegerBounds,
    LengthBounds,
    DateBounds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    IntegerBounds { min: i64, max: i64 },
    LengthBounds { min: u64, max: u64 },
    DateBounds { min: NaiveDate, max: NaiveDate },
}

/// The pair being refined, shown to the operator.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub class: &'a Term,
    pub property: &'a Term,
    pub draft: &'a ConstraintDraft,
}

#[derive(Debug, thiserror::Error)]
pub enum RefineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("refinement aborted: {reason}")]
    Aborted { reason: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RefineError {
    fn aborted(reason: impl Into<String>) -> Self {
        RefineError::Aborted {
            reason: reason.into(),
        }
    }
}

pub trait RefinementSession {
    fn ask(&mut self, ctx: &PromptContext<'_>, question: Question) -> Result<Answer, RefineError>;

    /// False for sessions that decline everything without asking anyone;
    /// the pipeline skips refinement for those.
    fn has_operator(&self) -> bool {
        true
    }
}

/// Runs the refinement questions for one draft.
///
/// Answers are applied to a staged copy; `draft` only changes once every
/// question has been answered, so an error leaves it untouched.
pub fn refine_draft(
    draft: &mut ConstraintDraft,
    class: &Term,
    property: &Term,
    session: &mut dyn RefinementSession,
) -> Result<(), RefineError> {
    let mut staged = draft.clone();
    let ctx = PromptContext {
        class,
        property,
        draft,
    };

    if confirm(session, &ctx, Question::Required)? {
        staged.mark_required();
    }
    if confirm(session, &ctx, Question::Functional)? {
        staged.mark_functional();
    }

    if let (Some(kind), Some(datatype)) = (draft.literal_kind(), draft.datatype()) {
        let question = match kind {
            LiteralKind::Integer => Question::IntegerBounds,
            LiteralKind::String => Question::LengthBounds,
            LiteralKind::Date => Question::DateBounds,
        };
        match (question, session.ask(&ctx, question)?) {
            (_, Answer::No) => {}
            (Question::IntegerBounds, Answer::IntegerBounds { min, max }) => {
                check_value_space(datatype, min, max)?;
                staged.set_inclusive(
                    Literal::typed(min.to_string(), datatype),
                    Literal::typed(max.to_string(), datatype),
                );
            }
            (Question::LengthBounds, Answer::LengthBounds { min, max }) => {
                staged.set_length(min, max);
            }
            (Question::DateBounds, Answer::DateBounds { min, max }) => {
                staged.set_inclusive(date_literal(min), date_literal(max));
            }
            (question, answer) => {
                return Err(RefineError::InvalidInput(format!(
                    "answer {answer:?} does not fit question {question:?}"
                )))
            }
        }
    }

    *draft = staged;
    Ok(())
}

fn confirm(
    session: &mut dyn RefinementSession,
    ctx: &PromptContext<'_>,
    question: Question,
) -> Result<bool, RefineError> {
    match session.ask(ctx, question)? {
        Answer::Yes => Ok(true),
        Answer::No => Ok(false),
        other => Err(RefineError::InvalidInput(format!(
            "expected yes or no for {question:?}, got {other:?}"
        ))),
    }
}

fn date_literal(date: NaiveDate) -> Literal {
    Literal::typed(date.format("%Y-%m-%d").to_string(), xsd::DATE)
}

// ============================================================================
// Sessions without an operator
// ============================================================================

/// Declines every question; drafts keep their inferred facets.
#[derive(Debug, Default, Clone, Copy)]
pub struct InferOnly;

impl RefinementSession for InferOnly {
    fn ask(&mut self, _ctx: &PromptContext<'_>, _question: Question) -> Result<Answer, RefineError> {
        Ok(Answer::No)
    }

    fn has_operator(&self) -> bool {
        false
    }
}

/// Replays a fixed queue of answers and records the questions asked.
#[derive(Debug, Default)]
pub struct ScriptedSession {
    answers: VecDeque<Answer>,
    pub asked: Vec<(Term, Question)>,
}

impl ScriptedSession {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

impl RefinementSession for ScriptedSession {
    fn ask(&mut self, ctx: &PromptContext<'_>, question: Question) -> Result<Answer, RefineError> {
        self.asked.push((ctx.property.clone(), question));
        self.answers
            .pop_front()
            .ok_or_else(|| RefineError::aborted("answer script exhausted"))
    }
}

// ============================================================================
// Text protocol
// ============================================================================

/// Something that can be asked a line of text.
pub trait Operator {
    /// Shows `prompt` and reads one answer; `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    fn notify(&mut self, message: &str) -> io::Result<()>;
}

/// An operator over any reader/writer pair (stdin/stdout, an answers file).
pub struct LineOperator<R, W> {
    reader: R,
    writer: W,
    echo: bool,
}

impl<R: BufRead, W: Write> LineOperator<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            echo: false,
        }
    }

    /// Writes each answer after its prompt, for non-terminal input.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R: BufRead, W: Write> Operator for LineOperator<R, W> {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.writer, "{prompt}")?;
        self.writer.flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim_end_matches(['\r', '\n']).to_string();
        if self.echo {
            writeln!(self.writer, "{answer}")?;
        }
        Ok(Some(answer))
    }

    fn notify(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.writer, "{message}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Answers that end refinement for every remaining pair.
    pub abort_words: Vec<String>,
    /// Invalid answers tolerated on one question before the session aborts.
    /// `None` re-asks forever.
    pub max_attempts: Option<u32>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            abort_words: vec!["exit".to_string(), "end".to_string(), "done".to_string()],
            max_attempts: Some(5),
        }
    }
}

pub struct PromptSession<O> {
    operator: O,
    config: PromptConfig,
}

impl<O: Operator> PromptSession<O> {
    pub fn new(operator: O, config: PromptConfig) -> Self {
        Self { operator, config }
    }

    pub fn into_operator(self) -> O {
        self.operator
    }

    fn read(&mut self, prompt: &str) -> Result<String, RefineError> {
        let Some(line) = self.operator.read_line(prompt)? else {
            return Err(RefineError::aborted("end of input"));
        };
        let answer = line.trim();
        if self
            .config
            .abort_words
            .iter()
            .any(|w| w.eq_ignore_ascii_case(answer))
        {
            return Err(RefineError::aborted(format!("operator entered `{answer}`")));
        }
        Ok(answer.to_string())
    }

    fn reject(&mut self, attempts: &mut u32, message: &str) -> Result<(), RefineError> {
        *attempts += 1;
        tracing::debug!(attempts = *attempts, reason = message, "rejected operator answer");
        if let Some(max) = self.config.max_attempts {
            if *attempts >= max {
                return Err(RefineError::aborted(format!(
                    "{attempts} invalid answers in a row"
                )));
            }
        }
        self.operator.notify(message)?;
        Ok(())
    }

    fn yes_no(&mut self, prompt: &str) -> Result<bool, RefineError> {
        let mut attempts = 0;
        loop {
            let answer = self.read(prompt)?;
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.reject(&mut attempts, "Please answer y or n.")?,
            }
        }
    }

    fn bounded(
        &mut self,
        gate: &str,
        prompts: [&str; 2],
        parse: impl Fn(&str, &str) -> Result<Answer, RefineError>,
    ) -> Result<Answer, RefineError> {
        let mut attempts = 0;
        loop {
            if !self.yes_no(gate)? {
                return Ok(Answer::No);
            }
            let min = self.read(prompts[0])?;
            let max = self.read(prompts[1])?;
            match parse(&min, &max) {
                Ok(answer) => return Ok(answer),
                Err(RefineError::InvalidInput(message)) => {
                    self.reject(&mut attempts, &format!("Invalid input: {message}"))?
                }
                Err(other) => return Err(other),
            }
        }
    }
}

impl<O: Operator> RefinementSession for PromptSession<O> {
    fn ask(&mut self, ctx: &PromptContext<'_>, question: Question) -> Result<Answer, RefineError> {
        let property = ctx.property.display_name();
        let class = ctx.class.display_name();
        let yes = |b: bool| if b { Answer::Yes } else { Answer::No };
        match question {
            Question::Required => self
                .yes_no(&format!(
                    "Do you want to make {property} required on {class}? (y|n): "
                ))
                .map(yes),
            Question::Functional => self
                .yes_no(&format!(
                    "Do you want to make {property} functional? (y|n): "
                ))
                .map(yes),
            Question::IntegerBounds => self.bounded(
                &format!(
                    "Do you want to set a bottom and an upper limit for {property}? (y|n): "
                ),
                ["Set bottom limit (included): ", "Set upper limit (included): "],
                |min: &str, max: &str| {
                    let answer = parse_integer_bounds(min, max)?;
                    if let (Some(datatype), Answer::IntegerBounds { min, max }) =
                        (ctx.draft.datatype(), &answer)
                    {
                        check_value_space(datatype, *min, *max)?;
                    }
                    Ok(answer)
                },
            ),
            Question::LengthBounds => self.bounded(
                &format!(
                    "Do you want to set a minimum and a maximum length for {property}? (y|n): "
                ),
                ["Set minimum length: ", "Set maximum length: "],
                parse_length_bounds,
            ),
            Question::DateBounds => self.bounded(
                &format!("Do you want to add date boundaries for {property}? (y|n): "),
                [
                    "Set minimum date (YYYY-MM-DD): ",
                    "Set maximum date (YYYY-MM-DD): ",
                ],
                parse_date_bounds,
            ),
        }
    }
}

fn ordered<T: PartialOrd + std::fmt::Display>(min: T, max: T) -> Result<(T, T), RefineError> {
    if min > max {
        return Err(RefineError::InvalidInput(format!(
            "lower bound {min} is greater than upper bound {max}"
        )));
    }
    Ok((min, max))
}

pub fn parse_integer_bounds(min: &str, max: &str) -> Result<Answer, RefineError> {
    let parse = |s: &str| {
        s.trim()
            .parse::<i64>()
            .map_err(|_| RefineError::InvalidInput(format!("`{s}` is not an integer")))
    };
    let (min, max) = ordered(parse(min)?, parse(max)?)?;
    Ok(Answer::IntegerBounds { min, max })
}

/// Rejects bounds outside the value space of `datatype` (e.g. a negative
/// bound on `xsd:nonNegativeInteger`).
pub fn check_value_space(datatype: &str, min: i64, max: i64) -> Result<(), RefineError> {
    let Some(space) = integer_value_space(datatype) else {
        return Ok(());
    };
    for bound in [min, max] {
        if !space.contains(&i128::from(bound)) {
            return Err(RefineError::InvalidInput(format!(
                "{bound} is outside the value space of {}",
                crate::graph::local_name(datatype)
            )));
        }
    }
    Ok(())
}

pub fn parse_length_bounds(min: &str, max: &str) -> Result<Answer, RefineError> {
    let parse = |s: &str| {
        s.trim().parse::<u64>().map_err(|_| {
            RefineError::InvalidInput(format!("`{s}` is not a non-negative integer"))
        })
    };
    let (min, max) = ordered(parse(min)?, parse(max)?)?;
    Ok(Answer::LengthBounds { min, max })
}

pub fn parse_date_bounds(min: &str, max: &str) -> Result<Answer, RefineError> {
    let parse = |s: &str| {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| RefineError::InvalidInput(format!("`{s}` is not a YYYY-MM-DD date")))
    };
    let (min, max) = ordered(parse(min)?, parse(max)?)?;
    Ok(Answer::DateBounds { min, max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::ValueConstraint;

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/onto#{local}"))
    }

    fn datatype_draft(datatype: &str) -> ConstraintDraft {
        ConstraintDraft {
            value: Some(ValueConstraint::Datatype(datatype.to_string())),
            ..ConstraintDraft::default()
        }
    }

    fn prompt_session(script: &str) -> PromptSession<LineOperator<&[u8], Vec<u8>>> {
        PromptSession::new(
            LineOperator::new(script.as_bytes(), Vec::new()),
            PromptConfig::default(),
        )
    }

    #[test]
    fn required_and_functional_answers_merge_into_draft() {
        let mut draft = ConstraintDraft {
            max_count: Some(1),
            ..datatype_draft(xsd::DATE)
        };
        let mut session = ScriptedSession::new([Answer::Yes, Answer::Yes, Answer::No]);
        refine_draft(&mut draft, &ex("Match"), &ex("kickoffDate"), &mut session)
            .expect("refine");
        assert_eq!(draft.min_count, Some(1));
        assert_eq!(draft.max_count, Some(1));
        assert_eq!(draft.inclusive, None);
    }

    #[test]
    fn class_drafts_only_get_cardinality_questions() {
        let mut draft = ConstraintDraft {
            value: Some(ValueConstraint::Class(ex("Team"))),
            ..ConstraintDraft::default()
        };
        let mut session = ScriptedSession::new([Answer::No, Answer::No]);
        refine_draft(&mut draft, &ex("Match"), &ex("homeTeam"), &mut session).expect("refine");
        let asked: Vec<_> = session.asked.iter().map(|(_, q)| *q).collect();
        assert_eq!(asked, vec![Question::Required, Question::Functional]);
    }

    #[test]
    fn integer_bounds_are_typed_with_the_draft_datatype() {
        let mut draft = datatype_draft(xsd::INT);
        let mut session = ScriptedSession::new([
            Answer::No,
            Answer::No,
            Answer::IntegerBounds { min: 0, max: 120 },
        ]);
        refine_draft(&mut draft, &ex("Person"), &ex("age"), &mut session).expect("refine");
        let bounds = draft.inclusive.expect("bounds");
        assert_eq!(bounds.min, Literal::typed("0", xsd::INT));
        assert_eq!(bounds.max, Literal::typed("120", xsd::INT));
    }

    #[test]
    fn integer_bounds_outside_the_value_space_are_invalid() {
        let mut draft = datatype_draft(xsd::NON_NEGATIVE_INTEGER);
        let before = draft.clone();
        let mut session = ScriptedSession::new([
            Answer::Yes,
            Answer::No,
            Answer::IntegerBounds { min: -5, max: 10 },
        ]);
        let err = refine_draft(&mut draft, &ex("Team"), &ex("capacity"), &mut session)
            .expect_err("negative bound");
        assert!(matches!(err, RefineError::InvalidInput(_)));
        assert_eq!(draft, before);
    }

    #[test]
    fn prompt_session_reprompts_on_bound_outside_value_space() {
        let mut draft = datatype_draft(xsd::NON_NEGATIVE_INTEGER);
        let mut session = prompt_session("n\nn\ny\n-5\n10\ny\n0\n10\n");
        refine_draft(&mut draft, &ex("Team"), &ex("capacity"), &mut session).expect("refine");
        let bounds = draft.inclusive.expect("bounds");
        assert_eq!(bounds.min, Literal::typed("0", xsd::NON_NEGATIVE_INTEGER));

        let transcript = String::from_utf8(session.into_operator().into_writer()).expect("utf8");
        assert!(transcript.contains("-5 is outside the value space of nonNegativeInteger"));
    }

    #[test]
    fn infer_only_has_no_operator() {
        assert!(!InferOnly.has_operator());
        assert!(ScriptedSession::default().has_operator());
    }

    #[test]
    fn abort_leaves_draft_untouched() {
        let mut draft = datatype_draft(xsd::STRING);
        let before = draft.clone();
        let mut session = ScriptedSession::new([Answer::Yes]);
        let err = refine_draft(&mut draft, &ex("Team"), &ex("name"), &mut session)
            .expect_err("script runs out");
        assert!(matches!(err, RefineError::Aborted { .. }));
        assert_eq!(draft, before);
    }

    #[test]
    fn mismatched_answer_is_invalid_input() {
        let mut draft = datatype_draft(xsd::STRING);
        let mut session = ScriptedSession::new([
            Answer::No,
            Answer::No,
            Answer::IntegerBounds { min: 1, max: 2 },
        ]);
        let err = refine_draft(&mut draft, &ex("Team"), &ex("name"), &mut session)
            .expect_err("mismatch");
        assert!(matches!(err, RefineError::InvalidInput(_)));
        assert_eq!(draft.length, None);
    }

    #[test]
    fn prompt_session_reprompts_after_non_integer_bound() {
        let mut draft = datatype_draft(xsd::INTEGER);
        let mut session = prompt_session("n\nn\ny\n1.5\n10\ny\n1\n10\n");
        refine_draft(&mut draft, &ex("Team"), &ex("founded"), &mut session).expect("refine");
        let bounds = draft.inclusive.expect("bounds");
        assert_eq!(bounds.min.lexical, "1");
        assert_eq!(bounds.max.lexical, "10");

        let transcript = String::from_utf8(session.into_operator().into_writer()).expect("utf8");
        assert!(transcript.contains("Invalid input: `1.5` is not an integer"));
    }

    #[test]
    fn prompt_session_declining_after_bad_input_sets_no_bounds() {
        let mut draft = datatype_draft(xsd::INTEGER);
        let mut session = prompt_session("n\nn\ny\nabc\n5\nn\n");
        refine_draft(&mut draft, &ex("Team"), &ex("founded"), &mut session).expect("refine");
        assert_eq!(draft.inclusive, None);
    }

    #[test]
    fn prompt_session_parses_dates_and_lengths() {
        let mut date_draft = datatype_draft(xsd::DATE);
        let mut session = prompt_session("y\nn\ny\n2020-01-01\n2030-01-01\n");
        refine_draft(&mut date_draft, &ex("Match"), &ex("kickoffDate"), &mut session)
            .expect("refine");
        let bounds = date_draft.inclusive.expect("bounds");
        assert_eq!(bounds.min, Literal::typed("2020-01-01", xsd::DATE));
        assert_eq!(bounds.max, Literal::typed("2030-01-01", xsd::DATE));
        assert_eq!(date_draft.min_count, Some(1));

        let mut string_draft = datatype_draft(xsd::STRING);
        let mut session = prompt_session("n\nn\nyes\n-1\n3\ny\n2\n40\n");
        refine_draft(&mut string_draft, &ex("Team"), &ex("name"), &mut session)
            .expect("refine");
        let length = string_draft.length.expect("length");
        assert_eq!((length.min, length.max), (2, 40));
    }

    #[test]
    fn prompt_session_aborts_on_sentinel_and_end_of_input() {
        let mut draft = datatype_draft(xsd::STRING);
        let err = refine_draft(&mut draft, &ex("Team"), &ex("name"), &mut prompt_session("EXIT\n"))
            .expect_err("sentinel");
        assert!(matches!(err, RefineError::Aborted { .. }));

        let err = refine_draft(&mut draft, &ex("Team"), &ex("name"), &mut prompt_session("y\n"))
            .expect_err("eof");
        assert!(matches!(err, RefineError::Aborted { reason } if reason == "end of input"));
    }

    #[test]
    fn prompt_session_gives_up_after_max_attempts() {
        let mut draft = datatype_draft(xsd::STRING);
        let mut session = PromptSession::new(
            LineOperator::new("maybe\nperhaps\n".as_bytes(), Vec::new()),
            PromptConfig {
                max_attempts: Some(2),
                ..PromptConfig::default()
            },
        );
        let err = refine_draft(&mut draft, &ex("Team"), &ex("name"), &mut session)
            .expect_err("too many");
        assert!(matches!(err, RefineError::Aborted { .. }));
    }

    #[test]
    fn bound_parsers_reject_inverted_ranges() {
        assert!(parse_integer_bounds("10", "1").is_err());
        assert!(parse_length_bounds("1", "-3").is_err());
        assert!(parse_date_bounds("2030-01-01", "2020-01-01").is_err());
        assert!(parse_date_bounds("01/01/2020", "2030-01-01").is_err());
        assert_eq!(
            parse_integer_bounds(" -5 ", "5").expect("parse"),
            Answer::IntegerBounds { min: -5, max: 5 }
        );
    }
}
