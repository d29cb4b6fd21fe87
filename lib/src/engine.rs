use crate::data::*;
use crate::results::*;
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use std::result::Result;

/// Produces guesses from the history of a game.
pub trait Guesser {
    /// Returns the next code to guess, given every turn completed so far.
    fn select_next_guess(&mut self, history: &dyn History) -> Result<Code, MastermindError>;
}

impl<G: Guesser + ?Sized> Guesser for &mut G {
    fn select_next_guess(&mut self, history: &dyn History) -> Result<Code, MastermindError> {
        (**self).select_next_guess(history)
    }
}

impl<G: Guesser + ?Sized> Guesser for Box<G> {
    fn select_next_guess(&mut self, history: &dyn History) -> Result<Code, MastermindError> {
        (**self).select_next_guess(history)
    }
}

/// Attempts to guess the secret within the maximum number of guesses, using the given guesser.
///
/// This plays the role of the game controller: it owns the history, scores every guess against
/// the secret, and stops once a guess is fully correct.
///
/// ```
/// use mastermind_solver::*;
///
/// let config = GameConfig::new(2, 3, true).unwrap();
/// let secret = Code::new(vec![Color::Blue, Color::Green]);
///
/// let result = play_game_with_guesser(&secret, 9, ExhaustiveGuesser::new(config)).unwrap();
/// assert!(matches!(result, GameResult::Success(_)));
/// ```
pub fn play_game_with_guesser<G: Guesser>(
    secret: &Code,
    max_num_guesses: u32,
    mut guesser: G,
) -> Result<GameResult, MastermindError> {
    let mut history: Vec<Turn> = Vec::new();
    for _ in 1..=max_num_guesses {
        let guess = guesser.select_next_guess(&history)?;
        let score = try_compute_score(&guess, secret)?;
        debug!("Turn {}: {} scored {}", history.len() + 1, guess, score);
        history.push(Turn::new(guess, score));
        if score.is_win(secret.width()) {
            return Ok(GameResult::Success(
                history.into_iter().map(|turn| turn.guess).collect(),
            ));
        }
    }
    Ok(GameResult::Failure(
        history.into_iter().map(|turn| turn.guess).collect(),
    ))
}

/// Returns the lowest valid code: the first color everywhere, or the first `width` colors in
/// order if repeats are not allowed.
pub fn first_code(config: &GameConfig) -> Code {
    let palette = config.palette();
    if config.allow_repeats() {
        Code::new(vec![palette[0]; config.width()])
    } else {
        Code::new(palette[..config.width()].to_vec())
    }
}

/// Returns the valid code that follows `previous` when counting through all codes.
///
/// The code is treated as a number in base `color_count`, with the rightmost position as the
/// least significant digit. Codes with repeated colors are skipped if the config forbids them.
/// After the highest code, this wraps around to [`first_code`]. Positions that are empty or hold
/// a color outside the palette count as one below the first color, and become the first color if
/// the carry never reaches them.
///
/// If there is no previous code, or it has the wrong width, this returns [`first_code`].
pub fn next_code(previous: Option<&Code>, config: &GameConfig) -> Code {
    let previous = match previous {
        Some(code) if code.width() == config.width() => code,
        _ => return first_code(config),
    };
    let palette = config.palette();
    let radix = palette.len();
    let mut digits: Vec<usize> = previous
        .pegs()
        .iter()
        .map(|peg| match peg {
            Some(color) if color.index() < radix => color.index(),
            _ => usize::MAX,
        })
        .collect();

    loop {
        increment(&mut digits, radix);
        for digit in digits.iter_mut().filter(|digit| **digit >= radix) {
            *digit = 0;
        }
        if config.allow_repeats() || !has_repeated_digit(&digits) {
            break;
        }
    }
    digits.into_iter().map(|digit| palette[digit]).collect()
}

fn increment(digits: &mut [usize], radix: usize) {
    for digit in digits.iter_mut().rev() {
        *digit = digit.wrapping_add(1);
        if *digit < radix {
            return;
        }
        *digit = 0;
    }
}

fn has_repeated_digit(digits: &[usize]) -> bool {
    let mut seen = [false; MAX_COLORS];
    digits.iter().any(|digit| std::mem::replace(&mut seen[*digit], true))
}

/// Counts through every valid code in order, one guess at a time.
///
/// The first guess of a game is [`first_code`]; each later guess is the [`next_code`] after the
/// previous one, ignoring the scores entirely.
#[derive(Clone, Debug)]
pub struct ExhaustiveGuesser {
    config: GameConfig,
    last_guess: Option<Code>,
}

impl ExhaustiveGuesser {
    pub fn new(config: GameConfig) -> ExhaustiveGuesser {
        ExhaustiveGuesser {
            config,
            last_guess: None,
        }
    }
}

impl Guesser for ExhaustiveGuesser {
    fn select_next_guess(&mut self, history: &dyn History) -> Result<Code, MastermindError> {
        let num_turns = history.num_turns();
        if num_turns == 0 {
            self.last_guess = None;
        } else if self.last_guess.is_none() {
            // Pick up from a game that was started elsewhere.
            self.last_guess = Some(history.guess_at(num_turns - 1).clone());
        }
        let guess = next_code(self.last_guess.as_ref(), &self.config);
        self.last_guess = Some(guess.clone());
        Ok(guess)
    }
}

/// Draws a random valid code.
///
/// Each position is filled left to right with a uniformly drawn color from the palette. If repeats
/// are not allowed, colors that are already used are drawn again.
pub fn random_code<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Code {
    let palette = config.palette();
    let mut colors: Vec<Color> = Vec::with_capacity(config.width());
    while colors.len() < config.width() {
        let color = palette[rng.gen_range(0..palette.len())];
        if config.allow_repeats() || !colors.contains(&color) {
            colors.push(color);
        }
    }
    Code::new(colors)
}

/// Guesses a random valid code every turn, ignoring the history.
#[derive(Clone, Debug)]
pub struct RandomGuesser<R = StdRng> {
    config: GameConfig,
    rng: R,
}

impl<R: Rng> RandomGuesser<R> {
    /// Constructs a guesser that draws from the given random source.
    ///
    /// ```
    /// use mastermind_solver::{GameConfig, Guesser, RandomGuesser, Turn};
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let config = GameConfig::default();
    /// let mut guesser = RandomGuesser::new(config, StdRng::seed_from_u64(1));
    ///
    /// let guess = guesser.select_next_guess(&Vec::<Turn>::new()).unwrap();
    /// assert!(config.is_valid_code(&guess));
    /// ```
    pub fn new(config: GameConfig, rng: R) -> RandomGuesser<R> {
        RandomGuesser { config, rng }
    }
}

impl<R: Rng> Guesser for RandomGuesser<R> {
    fn select_next_guess(&mut self, _history: &dyn History) -> Result<Code, MastermindError> {
        Ok(random_code(&self.config, &mut self.rng))
    }
}
