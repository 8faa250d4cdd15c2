//! Bilingual alignment of a Russian translation with its English source.
//!
//! Both texts are split into sections on blank lines. An [`AlignSession`]
//! builds pairs of Russian and English chunks that cover the same passage;
//! [`auto_align`] proposes pairs by comparing plain-text lengths and hands
//! anything it cannot decide to a [`Resolver`].

use std::collections::VecDeque;

use tracing::debug;

use crate::util::{collapse_whitespace, strip_tags};

/// Accept a pair when `MIN_RATIO * english < russian < MAX_RATIO * english`.
pub const MAX_RATIO: f64 = 1.25;
pub const MIN_RATIO: f64 = 0.96;
/// Russian shorter than this share of the English takes another section.
pub const RUSSIAN_SHORT_RATIO: f64 = 0.97;

const SEPARATOR: &str = "\n\n";

/// One reversible step of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    TookRussian(String),
    TookEnglish(String),
}

/// What to do with the pair under consideration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    TakeRussian,
    TakeEnglish,
    Undo,
    Accept,
    Abort,
}

/// Decides pairs the length heuristic cannot.
pub trait Resolver {
    fn resolve(&mut self, session: &AlignSession) -> Decision;
}

impl<F> Resolver for F
where
    F: FnMut(&AlignSession) -> Decision,
{
    fn resolve(&mut self, session: &AlignSession) -> Decision {
        self(session)
    }
}

/// Result of an alignment run. Both variants carry the merged text;
/// an aborted run holds only the pairs accepted so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(String),
    Aborted(String),
}

impl Outcome {
    pub fn text(&self) -> &str {
        match self {
            Outcome::Completed(text) | Outcome::Aborted(text) => text,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

/// Split a text into trimmed, non-empty sections.
pub fn split_sections(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split(SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Visible text of a chunk on one line.
pub fn plain_text(html: &str) -> String {
    collapse_whitespace(&strip_tags(html))
}

/// Length of the visible text, in characters.
pub fn text_len(html: &str) -> usize {
    strip_tags(html).chars().count()
}

pub fn has_ellipsis(html: &str) -> bool {
    let text = strip_tags(html);
    text.contains('…') || text.contains("...")
}

pub fn in_range(russian: usize, english: usize) -> bool {
    let (r, e) = (russian as f64, english as f64);
    r < MAX_RATIO * e && r > MIN_RATIO * e
}

/// State of an alignment in progress.
#[derive(Debug, Clone, Default)]
pub struct AlignSession {
    russian: VecDeque<String>,
    english: VecDeque<String>,
    pending_russian: Vec<String>,
    pending_english: Vec<String>,
    output: Vec<String>,
    history: Vec<Edit>,
}

impl AlignSession {
    /// Start a session with the first section of each text pending.
    pub fn new(russian: &str, english: &str) -> Self {
        let mut session = Self {
            russian: split_sections(russian).into(),
            english: split_sections(english).into(),
            ..Self::default()
        };
        session.prime();
        session
    }

    fn prime(&mut self) {
        if let Some(section) = self.russian.pop_front() {
            self.pending_russian.push(section);
        }
        if let Some(section) = self.english.pop_front() {
            self.pending_english.push(section);
        }
    }

    /// Pending Russian chunk.
    pub fn pending_russian(&self) -> String {
        self.pending_russian.join(SEPARATOR)
    }

    /// Pending English chunk.
    pub fn pending_english(&self) -> String {
        self.pending_english.join(SEPARATOR)
    }

    pub fn remaining_russian(&self) -> usize {
        self.russian.len()
    }

    pub fn remaining_english(&self) -> usize {
        self.english.len()
    }

    pub fn history(&self) -> &[Edit] {
        &self.history
    }

    /// Whether both sides have a pending chunk.
    pub fn has_pair(&self) -> bool {
        !self.pending_russian.is_empty() && !self.pending_english.is_empty()
    }

    /// Add the next Russian section to the pending chunk.
    pub fn take_russian(&mut self) -> bool {
        let Some(section) = self.russian.pop_front() else {
            return false;
        };
        self.history.push(Edit::TookRussian(section.clone()));
        self.pending_russian.push(section);
        true
    }

    /// Add the next English section to the pending chunk.
    pub fn take_english(&mut self) -> bool {
        let Some(section) = self.english.pop_front() else {
            return false;
        };
        self.history.push(Edit::TookEnglish(section.clone()));
        self.pending_english.push(section);
        true
    }

    /// Return the most recently taken section to the front of its stream.
    pub fn undo(&mut self) -> Option<Edit> {
        let edit = self.history.pop()?;
        match &edit {
            Edit::TookRussian(section) => {
                self.pending_russian.pop();
                self.russian.push_front(section.clone());
            }
            Edit::TookEnglish(section) => {
                self.pending_english.pop();
                self.english.push_front(section.clone());
            }
        }
        Some(edit)
    }

    /// Emit the pending pair, clear the history and prime the next pair.
    pub fn commit(&mut self) {
        self.output.append(&mut self.pending_russian);
        self.output.append(&mut self.pending_english);
        self.history.clear();
        self.prime();
    }

    /// Emit the pending Russian chunk on its own and take the next one.
    pub fn pass_russian(&mut self) {
        self.output.append(&mut self.pending_russian);
        self.history.clear();
        if let Some(section) = self.russian.pop_front() {
            self.pending_russian.push(section);
        }
    }

    /// Merged text accepted so far.
    pub fn merged(&self) -> String {
        join_sections(&self.output)
    }

    /// Append everything still pending or unread and return the merged text.
    pub fn finish(mut self) -> String {
        self.output.append(&mut self.pending_russian);
        self.output.append(&mut self.pending_english);
        self.output.extend(self.russian.drain(..));
        self.output.extend(self.english.drain(..));
        join_sections(&self.output)
    }
}

fn join_sections(sections: &[String]) -> String {
    sections.iter().map(|s| format!("{s}{SEPARATOR}")).collect()
}

/// Let the resolver work on the pending pair until it accepts or aborts.
/// Returns `false` on abort.
fn resolve_manually<R: Resolver + ?Sized>(session: &mut AlignSession, resolver: &mut R) -> bool {
    loop {
        match resolver.resolve(session) {
            Decision::TakeRussian => {
                session.take_russian();
            }
            Decision::TakeEnglish => {
                session.take_english();
            }
            Decision::Undo => {
                session.undo();
            }
            Decision::Accept => {
                session.commit();
                return true;
            }
            Decision::Abort => return false,
        }
    }
}

/// Align two texts, pairing sections by length and deferring to `resolver`
/// where the heuristic fails or a chunk contains an ellipsis.
pub fn auto_align<R: Resolver + ?Sized>(russian: &str, english: &str, resolver: &mut R) -> Outcome {
    let mut session = AlignSession::new(russian, english);
    let mut automatic = 0usize;
    let mut manual = 0usize;

    while session.has_pair() {
        let r_chunk = session.pending_russian();
        let e_chunk = session.pending_english();

        if has_ellipsis(&r_chunk) || has_ellipsis(&e_chunk) {
            manual += 1;
            if !resolve_manually(&mut session, resolver) {
                return Outcome::Aborted(session.merged());
            }
            continue;
        }

        if r_chunk.contains("<b>") {
            session.pass_russian();
            continue;
        }

        let r_len = text_len(&r_chunk);
        let mut e_len = text_len(&e_chunk);

        if in_range(r_len, e_len) {
            session.commit();
            automatic += 1;
            continue;
        }

        if (e_len as f64) * MAX_RATIO < r_len as f64 {
            if session.take_english() {
                e_len = text_len(&session.pending_english());
                if in_range(r_len, e_len) {
                    session.commit();
                    automatic += 1;
                    continue;
                }
            }
        } else if (r_len as f64) < RUSSIAN_SHORT_RATIO * e_len as f64 && session.take_russian() {
            let r_len = text_len(&session.pending_russian());
            if in_range(r_len, e_len) {
                session.commit();
                automatic += 1;
                continue;
            }
        }

        manual += 1;
        if !resolve_manually(&mut session, resolver) {
            return Outcome::Aborted(session.merged());
        }
    }

    debug!(automatic, manual, "alignment finished");
    Outcome::Completed(session.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sections() {
        assert_eq!(
            split_sections("a\n\n\n\n b \r\n\r\nc"),
            vec!["a".to_string(), "b".into(), "c".into()]
        );
    }

    #[test]
    fn test_text_len_counts_chars() {
        assert_eq!(text_len("<p>мир</p>"), 3);
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(in_range(100, 100));
        assert!(!in_range(125, 100));
        assert!(!in_range(96, 100));
        assert!(in_range(97, 100));
    }

    #[test]
    fn test_undo_restores_stream_order() {
        let mut session = AlignSession::new("r1\n\nr2\n\nr3", "e1");
        assert!(session.take_russian());
        assert!(session.take_russian());
        assert_eq!(session.pending_russian(), "r1\n\nr2\n\nr3");

        assert_eq!(session.undo(), Some(Edit::TookRussian("r3".into())));
        assert_eq!(session.undo(), Some(Edit::TookRussian("r2".into())));
        assert_eq!(session.undo(), None);
        assert_eq!(session.pending_russian(), "r1");
        assert_eq!(session.remaining_russian(), 2);

        session.take_russian();
        assert_eq!(session.pending_russian(), "r1\n\nr2");
    }

    #[test]
    fn test_commit_clears_history() {
        let mut session = AlignSession::new("r1\n\nr2", "e1\n\ne2");
        session.take_english();
        session.commit();
        assert!(session.history().is_empty());
        assert_eq!(session.merged(), "r1\n\ne1\n\ne2\n\n");
        assert_eq!(session.pending_russian(), "r2");
        assert!(!session.has_pair());
    }
}
