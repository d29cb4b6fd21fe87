#![cfg_attr(feature = "unstable", feature(test))]

//! Codebreaking strategies for Mastermind-style games.
//!
//! Every strategy implements [`Guesser`]: given the history of guesses and their black/white peg
//! scores, it produces the next guess.
//!
//! * [`ExhaustiveGuesser`] counts through every valid code in order.
//! * [`RandomGuesser`] guesses random valid codes.
//! * [`GeneticGuesser`] evolves populations of codes until it finds one that is consistent with
//!   every score so far.
//!
//! All of them share [`compute_score`], and [`is_feasible`] can check any proposed guess against
//! the history.
//!
//! ```
//! use mastermind_solver::*;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let config = GameConfig::default();
//! let secret: Code = "blue, blue, orange, red".parse().unwrap();
//! let guesser = GeneticGuesser::new(config, StdRng::seed_from_u64(0));
//!
//! let result = play_game_with_guesser(&secret, 100, guesser).unwrap();
//!
//! assert!(matches!(result, GameResult::Success(_)));
//! ```

mod data;
mod engine;
pub mod genetic;
mod results;

pub use data::*;
pub use engine::*;
pub use genetic::CancelToken;
pub use genetic::GeneticGuesser;
pub use results::*;
