use crate::data::{Code, MAX_WIDTH};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Indicates that an error occurred while configuring or running a guesser.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum MastermindError {
    /// The game settings cannot produce any valid code.
    #[error("Invalid game config: {0}")]
    InvalidConfig(String),
    /// The genetic solver's parameters are out of range.
    #[error("Invalid solver parameters: {0}")]
    InvalidParams(String),
    /// Two codes that must have the same width did not.
    #[error("Code width mismatch: expected {expected}, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
    /// A code could not be parsed.
    #[error("Invalid code: {0}")]
    InvalidCode(String),
    /// A score could not be parsed or cannot occur.
    #[error("Invalid score: {0}")]
    InvalidScore(String),
    /// The genetic solver gave up after its configured number of attempts. This usually means the
    /// history is inconsistent, i.e. no code satisfies every recorded score.
    #[error("No feasible code found after {attempts} attempt(s)")]
    NoFeasibleCode { attempts: u32 },
    /// The caller cancelled the search.
    #[error("Guess generation was cancelled")]
    Cancelled,
}

/// The feedback for a single guess: the number of black and white pegs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Score {
    /// Positions where the guess has the same color as the reference (black pegs).
    pub exact: u8,
    /// Colors that are present in the reference at a different position (white pegs).
    pub color_only: u8,
}

impl Score {
    pub fn new(exact: u8, color_only: u8) -> Score {
        Score { exact, color_only }
    }

    /// Whether this score means the guess was the secret.
    pub fn is_win(&self, width: usize) -> bool {
        self.exact as usize == width
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} exact, {} color-only", self.exact, self.color_only)
    }
}

impl FromStr for Score {
    type Err = MastermindError;

    /// Parses `"<exact>,<color_only>"` or `"<exact> <color_only>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect();
        if parts.len() != 2 {
            return Err(MastermindError::InvalidScore(format!(
                "expected two numbers, got '{s}'"
            )));
        }
        let parse = |part: &str| {
            part.parse::<u8>()
                .map_err(|_| MastermindError::InvalidScore(format!("'{part}' is not a peg count")))
        };
        Ok(Score::new(parse(parts[0])?, parse(parts[1])?))
    }
}

/// Scores `candidate` against `reference` as if `reference` were the secret.
///
/// Exact matches are found first and removed from further consideration. Each remaining
/// candidate position is then matched, in order, against the first unconsumed reference position
/// with the same color. Empty positions never match.
///
/// ```
/// use mastermind_solver::{compute_score, Code, Color::*, Score};
///
/// let score = compute_score(
///     &Code::new(vec![Red, Green, Blue, Yellow]),
///     &Code::new(vec![Red, Green, Yellow, Blue]),
/// );
/// assert_eq!(score, Score::new(2, 2));
/// ```
///
/// # Panics
///
/// Panics if the codes have different widths, or are wider than [`MAX_WIDTH`]. Use
/// [`try_compute_score`] to get an error instead.
pub fn compute_score(candidate: &Code, reference: &Code) -> Score {
    assert_eq!(
        candidate.width(),
        reference.width(),
        "Candidate ({}) must have the same width as the reference ({})",
        candidate,
        reference
    );
    let candidate = candidate.pegs();
    let reference = reference.pegs();
    let width = candidate.len();
    assert!(
        width <= MAX_WIDTH,
        "Codes must be at most {} wide, got {}",
        MAX_WIDTH,
        width
    );

    let mut candidate_used = [false; MAX_WIDTH];
    let mut reference_used = [false; MAX_WIDTH];
    let mut exact = 0;
    for index in 0..width {
        if candidate[index].is_some() && candidate[index] == reference[index] {
            exact += 1;
            candidate_used[index] = true;
            reference_used[index] = true;
        }
    }

    let mut color_only = 0;
    for index in 0..width {
        if candidate_used[index] {
            continue;
        }
        let Some(color) = candidate[index] else {
            continue;
        };
        if let Some(other) =
            (0..width).find(|&other| !reference_used[other] && reference[other] == Some(color))
        {
            color_only += 1;
            reference_used[other] = true;
        }
    }
    Score { exact, color_only }
}

/// Like [`compute_score`], but returns an error if the widths differ or exceed [`MAX_WIDTH`].
pub fn try_compute_score(candidate: &Code, reference: &Code) -> Result<Score, MastermindError> {
    if candidate.width() != reference.width() {
        return Err(MastermindError::WidthMismatch {
            expected: reference.width(),
            actual: candidate.width(),
        });
    }
    if reference.width() > MAX_WIDTH {
        return Err(MastermindError::InvalidCode(format!(
            "{} is wider than {} positions",
            reference, MAX_WIDTH
        )));
    }
    Ok(compute_score(candidate, reference))
}

/// The color-only count computed from per-color tallies rather than greedy matching.
///
/// This always agrees with [`compute_score`].
#[cfg(test)]
fn color_only_by_counts(candidate: &Code, reference: &Code) -> u8 {
    let mut candidate_counts = [0u8; crate::data::MAX_COLORS];
    let mut reference_counts = [0u8; crate::data::MAX_COLORS];
    for (ours, theirs) in candidate.pegs().iter().zip(reference.pegs()) {
        if ours.is_some() && ours == theirs {
            continue;
        }
        if let Some(color) = ours {
            candidate_counts[color.index()] += 1;
        }
        if let Some(color) = theirs {
            reference_counts[color.index()] += 1;
        }
    }
    candidate_counts
        .iter()
        .zip(reference_counts.iter())
        .map(|(a, b)| *a.min(b))
        .sum()
}

/// Whether the game was won or lost by the guesser.
#[derive(Debug, Eq, PartialEq)]
pub enum GameResult {
    /// Indicates that the guesser won the game, and provides the guesses that were given.
    Success(Vec<Code>),
    /// Indicates that the guesser failed to guess the code, and provides the guesses that were given.
    Failure(Vec<Code>),
}

/// One completed turn: a guess and the score it received.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Turn {
    pub guess: Code,
    pub score: Score,
}

impl Turn {
    pub fn new(guess: Code, score: Score) -> Turn {
        Turn { guess, score }
    }
}

/// Read-only access to the turns played so far.
///
/// The game controller owns the history; the guessers only read it.
pub trait History {
    /// The number of completed turns.
    fn num_turns(&self) -> usize;
    /// The guess made on the given turn, for `turn < num_turns()`.
    fn guess_at(&self, turn: usize) -> &Code;
    /// The score received on the given turn, for `turn < num_turns()`.
    fn score_at(&self, turn: usize) -> Score;
}

impl<T> History for T
where
    T: AsRef<[Turn]>,
{
    fn num_turns(&self) -> usize {
        self.as_ref().len()
    }

    fn guess_at(&self, turn: usize) -> &Code {
        &self.as_ref()[turn].guess
    }

    fn score_at(&self, turn: usize) -> Score {
        self.as_ref()[turn].score
    }
}

/// Copies the history so that it stays consistent for the duration of a computation.
pub fn snapshot(history: &dyn History) -> Vec<Turn> {
    (0..history.num_turns())
        .map(|turn| Turn::new(history.guess_at(turn).clone(), history.score_at(turn)))
        .collect()
}

/// Returns `true` iff `candidate` could be the secret given everything learned so far.
///
/// ```
/// use mastermind_solver::{is_feasible, Code, Color::*, Score, Turn};
///
/// let history = vec![Turn::new(Code::new(vec![Red, Green, Blue, Yellow]), Score::new(2, 2))];
///
/// assert!(is_feasible(&Code::new(vec![Yellow, Green, Blue, Red]), &history));
/// assert!(!is_feasible(&Code::new(vec![Red, Red, Red, Red]), &history));
/// ```
pub fn is_feasible(candidate: &Code, history: &dyn History) -> bool {
    (0..history.num_turns())
        .all(|turn| compute_score(candidate, history.guess_at(turn)) == history.score_at(turn))
}

/// The total absolute difference between the scores `candidate` would have received and the
/// scores actually recorded. Zero means the candidate is feasible.
pub fn fitness(candidate: &Code, turns: &[Turn]) -> u32 {
    turns
        .iter()
        .map(|turn| {
            let score = compute_score(candidate, &turn.guess);
            score.exact.abs_diff(turn.score.exact) as u32
                + score.color_only.abs_diff(turn.score.color_only) as u32
        })
        .sum()
}
