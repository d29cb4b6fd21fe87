//! A genetic algorithm that searches for codes consistent with the history of a game.
//!
//! Each guess request evolves a fresh population of random codes. Members are ranked by their
//! [`fitness`], the total deviation between the scores they would have received and the scores
//! actually recorded, so a fitness of zero means the code could be the secret. Parents are drawn
//! from the fittest part of the population, recombined with one- or two-point crossover, and the
//! children are occasionally mutated, permuted or inverted. The search stops once enough feasible
//! codes have been found, and one of them is returned at random.
//!
//! The approach follows *Efficient solutions for Mastermind using genetic algorithms* (Berghman,
//! Goossens & Leus, 2009).

use crate::data::*;
use crate::engine::{random_code, Guesser};
use crate::results::*;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use std::collections::HashSet;
use std::result::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the mutation, permutation and inversion rates combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VariationPolicy {
    /// The operators are tried in order, each with its own draw, and only the first one that
    /// succeeds is applied. With the default rates, about 3% of children are mutated, 2.9% are
    /// permuted, and 1.9% are inverted.
    #[default]
    Tiered,
    /// Each operator is applied independently at its own rate, so a child may receive more than
    /// one of them.
    Independent,
}

/// Tuning parameters for the [`GeneticGuesser`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct GeneticParams {
    /// The number of codes in each generation.
    pub population_size: usize,
    /// The maximum number of generations in one attempt before starting over.
    pub max_generations: u32,
    /// The search stops once this many distinct feasible codes have been found.
    pub feasible_target: usize,
    /// Parents are drawn from the fittest `1 / elite_divisor` of the population.
    pub elite_divisor: usize,
    /// The parent selector advances by a random step in `0..=max_parent_step`.
    pub max_parent_step: usize,
    /// Chance, in percent, that a child has one position replaced by a random color.
    pub mutation_percent: u8,
    /// Chance, in percent, that a child has two positions swapped.
    pub permutation_percent: u8,
    /// Chance, in percent, that a child has a segment reversed.
    pub inversion_percent: u8,
    pub variation_policy: VariationPolicy,
    /// Gives up with [`MastermindError::NoFeasibleCode`] after this many attempts. `None` keeps
    /// trying forever.
    pub max_attempts: Option<u32>,
}

impl Default for GeneticParams {
    fn default() -> Self {
        GeneticParams {
            population_size: 2000,
            max_generations: 500,
            feasible_target: 1,
            elite_divisor: 5,
            max_parent_step: 6,
            mutation_percent: 3,
            permutation_percent: 3,
            inversion_percent: 2,
            variation_policy: VariationPolicy::Tiered,
            max_attempts: None,
        }
    }
}

impl GeneticParams {
    /// Checks that a search with these parameters can make progress.
    pub fn validate(&self) -> Result<(), MastermindError> {
        if self.population_size < 2 {
            return Err(MastermindError::InvalidParams(format!(
                "population size must be at least 2, got {}",
                self.population_size
            )));
        }
        if self.max_generations == 0 {
            return Err(MastermindError::InvalidParams(
                "max generations must be at least 1".to_string(),
            ));
        }
        if self.feasible_target == 0 {
            return Err(MastermindError::InvalidParams(
                "feasible target must be at least 1".to_string(),
            ));
        }
        if self.elite_divisor == 0 {
            return Err(MastermindError::InvalidParams(
                "elite divisor must be at least 1".to_string(),
            ));
        }
        for (name, percent) in [
            ("mutation", self.mutation_percent),
            ("permutation", self.permutation_percent),
            ("inversion", self.inversion_percent),
        ] {
            if percent > 100 {
                return Err(MastermindError::InvalidParams(format!(
                    "{name} rate must be at most 100%, got {percent}%"
                )));
            }
        }
        if self.max_attempts == Some(0) {
            return Err(MastermindError::InvalidParams(
                "max attempts must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lets another thread stop a running [`GeneticGuesser`].
///
/// The guesser checks the token before every attempt and every generation.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Clears a previous cancellation so the token can be reused.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Relaxed);
    }
}

/// A member of a population along with its fitness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Individual {
    pub code: Code,
    pub fitness: u32,
}

/// One generation of candidate codes, ranked from fittest to least fit.
///
/// A population is never modified in place: [`Population::evolve`] produces the next generation
/// as a new value.
#[derive(Clone, Debug)]
pub struct Population {
    members: Vec<Individual>,
}

impl Population {
    /// Evaluates the given codes against the history and ranks them.
    ///
    /// Members with equal fitness keep their relative order.
    pub fn from_codes(codes: Vec<Code>, turns: &[Turn]) -> Population {
        let mut members: Vec<Individual> = codes
            .into_par_iter()
            .map(|code| {
                let fitness = fitness(&code, turns);
                Individual { code, fitness }
            })
            .collect();
        members.sort_by_key(|member| member.fitness);
        Population { members }
    }

    /// Creates a ranked population of `size` random valid codes.
    pub fn random<R: Rng + ?Sized>(
        size: usize,
        config: &GameConfig,
        turns: &[Turn],
        rng: &mut R,
    ) -> Population {
        let codes = (0..size).map(|_| random_code(config, rng)).collect();
        Population::from_codes(codes, turns)
    }

    /// The members, fittest first.
    pub fn members(&self) -> &[Individual] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The lowest fitness in the population.
    pub fn best_fitness(&self) -> Option<u32> {
        self.members.first().map(|member| member.fitness)
    }

    /// The members that are consistent with the whole history.
    pub fn feasible(&self) -> impl Iterator<Item = &Code> + '_ {
        self.members
            .iter()
            .take_while(|member| member.fitness == 0)
            .map(|member| &member.code)
    }

    /// Breeds the next generation.
    ///
    /// Pairs of parents are drawn from the elite part of this population and crossed over, then
    /// each child may be varied. Children that duplicate an earlier child, or that break the
    /// config's repeat rule, are replaced with fresh random codes. The result is evaluated and
    /// ranked.
    ///
    /// # Panics
    ///
    /// Panics if `params.elite_divisor` is zero. [`GeneticParams::validate`] rejects such params.
    pub fn evolve<R: Rng + ?Sized>(
        &self,
        config: &GameConfig,
        params: &GeneticParams,
        turns: &[Turn],
        rng: &mut R,
    ) -> Population {
        let size = self.members.len();
        let mut selector =
            ParentSelector::new((size / params.elite_divisor).max(1), params.max_parent_step);
        let mut children: Vec<Code> = Vec::with_capacity(size);
        while children.len() < size {
            let mother = &self.members[selector.next_parent(rng)].code;
            let father = &self.members[selector.next_parent(rng)].code;
            let (first, second) = if rng.gen_bool(0.5) {
                single_point_crossover(mother, father, rng)
            } else {
                two_point_crossover(mother, father, rng)
            };
            children.push(first);
            if children.len() < size {
                children.push(second);
            }
        }

        for child in children.iter_mut() {
            vary(child, config, params, rng);
        }
        replace_duplicates(&mut children, config, rng);

        Population::from_codes(children, turns)
    }
}

/// Walks through the elite pool of a ranked population, choosing parents.
///
/// Each call advances a running index by a random step. Once the index would leave the pool, it
/// starts over at the fittest member.
#[derive(Clone, Debug)]
pub struct ParentSelector {
    position: usize,
    pool_size: usize,
    max_step: usize,
}

impl ParentSelector {
    pub fn new(pool_size: usize, max_step: usize) -> ParentSelector {
        ParentSelector {
            position: 0,
            pool_size,
            max_step,
        }
    }

    /// Returns the index of the next parent, always less than the pool size.
    pub fn next_parent<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        self.position += rng.gen_range(0..=self.max_step);
        if self.position >= self.pool_size {
            self.position = 0;
        }
        self.position
    }
}

/// Splits both parents after a random position. The first child takes the mother's colors up to
/// and including the split and the father's after it; the second child is the reverse.
///
/// # Panics
///
/// Panics if the parents have different widths, or are empty.
pub fn single_point_crossover<R: Rng + ?Sized>(
    mother: &Code,
    father: &Code,
    rng: &mut R,
) -> (Code, Code) {
    assert_eq!(mother.width(), father.width());
    let split = rng.gen_range(0..mother.width());
    let mut first = mother.clone();
    let mut second = father.clone();
    first.pegs_mut()[split + 1..].copy_from_slice(&father.pegs()[split + 1..]);
    second.pegs_mut()[split + 1..].copy_from_slice(&mother.pegs()[split + 1..]);
    (first, second)
}

/// Picks two random positions and swaps the segment after the first, up to and including the
/// second, between the parents. Everything else passes through from the same parent.
///
/// # Panics
///
/// Panics if the parents have different widths, or are empty.
pub fn two_point_crossover<R: Rng + ?Sized>(
    mother: &Code,
    father: &Code,
    rng: &mut R,
) -> (Code, Code) {
    assert_eq!(mother.width(), father.width());
    let (start, end) = ordered_positions(mother.width(), rng);
    let mut first = mother.clone();
    let mut second = father.clone();
    first.pegs_mut()[start + 1..=end].copy_from_slice(&father.pegs()[start + 1..=end]);
    second.pegs_mut()[start + 1..=end].copy_from_slice(&mother.pegs()[start + 1..=end]);
    (first, second)
}

/// Replaces the color at one random position with a random color from the palette.
pub fn mutate<R: Rng + ?Sized>(code: &mut Code, config: &GameConfig, rng: &mut R) {
    let palette = config.palette();
    let position = rng.gen_range(0..code.width());
    code.set(position, palette[rng.gen_range(0..palette.len())]);
}

/// Swaps the colors at two random positions.
pub fn permute<R: Rng + ?Sized>(code: &mut Code, rng: &mut R) {
    let first = rng.gen_range(0..code.width());
    let second = rng.gen_range(0..code.width());
    code.pegs_mut().swap(first, second);
}

/// Reverses the colors between two random positions, inclusive.
pub fn invert<R: Rng + ?Sized>(code: &mut Code, rng: &mut R) {
    let (start, end) = ordered_positions(code.width(), rng);
    code.pegs_mut()[start..=end].reverse();
}

fn ordered_positions<R: Rng + ?Sized>(width: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.gen_range(0..width);
    let b = rng.gen_range(0..width);
    (a.min(b), a.max(b))
}

fn roll<R: Rng + ?Sized>(percent: u8, rng: &mut R) -> bool {
    rng.gen_range(0..100) < percent
}

fn vary<R: Rng + ?Sized>(code: &mut Code, config: &GameConfig, params: &GeneticParams, rng: &mut R) {
    match params.variation_policy {
        VariationPolicy::Tiered => {
            if roll(params.mutation_percent, rng) {
                mutate(code, config, rng);
            } else if roll(params.permutation_percent, rng) {
                permute(code, rng);
            } else if roll(params.inversion_percent, rng) {
                invert(code, rng);
            }
        }
        VariationPolicy::Independent => {
            if roll(params.mutation_percent, rng) {
                mutate(code, config, rng);
            }
            if roll(params.permutation_percent, rng) {
                permute(code, rng);
            }
            if roll(params.inversion_percent, rng) {
                invert(code, rng);
            }
        }
    }
}

/// Replaces every child that is invalid under the config, or equal to an earlier child, with a
/// fresh random code. Replacements are not checked again, since small code spaces may not have
/// enough distinct codes to fill the population.
fn replace_duplicates<R: Rng + ?Sized>(children: &mut [Code], config: &GameConfig, rng: &mut R) {
    let mut seen: HashSet<Code> = HashSet::with_capacity(children.len());
    for child in children.iter_mut() {
        if !config.is_valid_code(child) || seen.contains(child) {
            *child = random_code(config, rng);
        }
        seen.insert(child.clone());
    }
}

/// Adds feasible members of the population to `found`, skipping codes already there, until
/// `found` holds `target` codes. Returns whether the target was reached.
fn harvest(population: &Population, found: &mut Vec<Code>, target: usize) -> bool {
    for code in population.feasible() {
        if found.len() >= target {
            break;
        }
        if !found.contains(code) {
            found.push(code.clone());
        }
    }
    found.len() >= target
}

/// Guesses codes that are consistent with every score so far, found with a genetic algorithm.
///
/// The first guess of a game is random. After that, each guess evolves populations until at least
/// one feasible code is found.
///
/// **This may run for a long time.** If the history is inconsistent (no code matches every
/// score), and [`GeneticParams::max_attempts`] is `None`, the search never ends. Set an attempt
/// cap, or run the guesser on a worker thread with a [`CancelToken`], if that matters.
///
/// ```
/// use mastermind_solver::*;
/// use mastermind_solver::genetic::GeneticParams;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let config = GameConfig::default();
/// let params = GeneticParams { population_size: 200, ..GeneticParams::default() };
/// let mut guesser = GeneticGuesser::with_params(config, params, StdRng::seed_from_u64(5)).unwrap();
///
/// let history = vec![Turn::new(
///     "red, green, blue, yellow".parse().unwrap(),
///     Score::new(2, 2),
/// )];
/// let guess = guesser.select_next_guess(&history).unwrap();
/// assert!(is_feasible(&guess, &history));
/// ```
#[derive(Clone, Debug)]
pub struct GeneticGuesser<R = StdRng> {
    config: GameConfig,
    params: GeneticParams,
    rng: R,
    cancel_token: Option<CancelToken>,
}

impl<R: Rng> GeneticGuesser<R> {
    /// Constructs a guesser with the default [`GeneticParams`].
    pub fn new(config: GameConfig, rng: R) -> GeneticGuesser<R> {
        GeneticGuesser {
            config,
            params: GeneticParams::default(),
            rng,
            cancel_token: None,
        }
    }

    /// Constructs a guesser with the given parameters, if they are valid.
    pub fn with_params(
        config: GameConfig,
        params: GeneticParams,
        rng: R,
    ) -> Result<GeneticGuesser<R>, MastermindError> {
        params.validate()?;
        Ok(GeneticGuesser {
            config,
            params,
            rng,
            cancel_token: None,
        })
    }

    /// Makes the guesser stop with [`MastermindError::Cancelled`] once the token is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> GeneticGuesser<R> {
        self.cancel_token = Some(token);
        self
    }

    pub fn params(&self) -> &GeneticParams {
        &self.params
    }

    fn check_cancelled(&self) -> Result<(), MastermindError> {
        match &self.cancel_token {
            Some(token) if token.is_cancelled() => Err(MastermindError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Runs one attempt: a fresh population evolved until enough feasible codes are found or the
    /// generation limit is reached.
    fn run_attempt(&mut self, turns: &[Turn]) -> Result<Vec<Code>, MastermindError> {
        let mut population =
            Population::random(self.params.population_size, &self.config, turns, &mut self.rng);
        let mut found: Vec<Code> = Vec::new();
        for generation in 1..=self.params.max_generations {
            self.check_cancelled()?;
            population = population.evolve(&self.config, &self.params, turns, &mut self.rng);
            trace!(
                "Generation {}: best fitness {:?}",
                generation,
                population.best_fitness()
            );
            if harvest(&population, &mut found, self.params.feasible_target) {
                break;
            }
        }
        Ok(found)
    }
}

impl<R: Rng> Guesser for GeneticGuesser<R> {
    fn select_next_guess(&mut self, history: &dyn History) -> Result<Code, MastermindError> {
        let turns = snapshot(history);
        if turns.is_empty() {
            return Ok(random_code(&self.config, &mut self.rng));
        }
        if let Some(turn) = turns
            .iter()
            .find(|turn| turn.guess.width() != self.config.width())
        {
            return Err(MastermindError::WidthMismatch {
                expected: self.config.width(),
                actual: turn.guess.width(),
            });
        }

        let mut attempts = 0;
        loop {
            self.check_cancelled()?;
            if self.params.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(MastermindError::NoFeasibleCode { attempts });
            }
            attempts += 1;
            let found = self.run_attempt(&turns)?;
            if let Some(guess) = found.choose(&mut self.rng) {
                debug!(
                    "Found {} feasible code(s) in attempt {}; guessing {}",
                    found.len(),
                    attempts,
                    guess
                );
                return Ok(guess.clone());
            }
            debug!(
                "No feasible code found in attempt {}. Retrying with a new population.",
                attempts
            );
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::data::Color::*;
    use assert_matches::assert_matches;
    use rand::SeedableRng;

    fn small_params() -> GeneticParams {
        GeneticParams {
            population_size: 200,
            max_generations: 100,
            ..GeneticParams::default()
        }
    }

    fn code(colors: &[Color]) -> Code {
        Code::new(colors.to_vec())
    }

    #[test]
    fn default_params_validate() {
        assert_eq!(GeneticParams::default().validate(), Ok(()));
    }

    #[test]
    fn invalid_params_are_rejected() {
        let cases = [
            GeneticParams {
                population_size: 1,
                ..GeneticParams::default()
            },
            GeneticParams {
                max_generations: 0,
                ..GeneticParams::default()
            },
            GeneticParams {
                feasible_target: 0,
                ..GeneticParams::default()
            },
            GeneticParams {
                elite_divisor: 0,
                ..GeneticParams::default()
            },
            GeneticParams {
                inversion_percent: 101,
                ..GeneticParams::default()
            },
            GeneticParams {
                max_attempts: Some(0),
                ..GeneticParams::default()
            },
        ];
        for params in cases {
            assert_matches!(params.validate(), Err(MastermindError::InvalidParams(_)));
        }
    }

    #[test]
    fn parent_selector_stays_in_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut selector = ParentSelector::new(10, 6);
        for _ in 0..1000 {
            assert!(selector.next_parent(&mut rng) < 10);
        }

        let mut single = ParentSelector::new(1, 6);
        for _ in 0..100 {
            assert_eq!(single.next_parent(&mut rng), 0);
        }
    }

    #[test]
    fn single_point_crossover_splits_once() {
        let mut rng = StdRng::seed_from_u64(2);
        let mother = code(&[Red, Red, Red, Red, Red]);
        let father = code(&[Blue, Blue, Blue, Blue, Blue]);
        for _ in 0..100 {
            let (first, second) = single_point_crossover(&mother, &father, &mut rng);

            let split = first.colors().take_while(|color| *color == Red).count();
            assert!(split >= 1);
            assert!(first.colors().skip(split).all(|color| color == Blue));
            for index in 0..5 {
                assert_ne!(first.get(index), second.get(index));
            }
        }
    }

    #[test]
    fn two_point_crossover_swaps_one_segment() {
        let mut rng = StdRng::seed_from_u64(3);
        let mother = code(&[Red, Red, Red, Red, Red, Red]);
        let father = code(&[Blue, Blue, Blue, Blue, Blue, Blue]);
        for _ in 0..100 {
            let (first, second) = two_point_crossover(&mother, &father, &mut rng);

            assert_eq!(first.get(0), Some(Red));
            let changes = (1..6)
                .filter(|index| first.get(*index) != first.get(index - 1))
                .count();
            assert!(changes <= 2);
            for index in 0..6 {
                assert_ne!(first.get(index), second.get(index));
            }
        }
    }

    #[test]
    fn mutate_changes_at_most_one_position() {
        let mut rng = StdRng::seed_from_u64(4);
        let config = GameConfig::new(4, 6, true).unwrap();
        let original = code(&[Red, Green, Blue, Yellow]);
        for _ in 0..100 {
            let mut mutated = original.clone();
            mutate(&mut mutated, &config, &mut rng);

            let differences = (0..4)
                .filter(|index| mutated.get(*index) != original.get(*index))
                .count();
            assert!(differences <= 1);
            assert!(mutated.colors().all(|color| color.index() < 6));
        }
    }

    #[test]
    fn permute_and_invert_keep_colors() {
        let mut rng = StdRng::seed_from_u64(5);
        let original = code(&[Red, Green, Blue, Yellow, Orange]);
        let mut sorted_original: Vec<Color> = original.colors().collect();
        sorted_original.sort();
        for _ in 0..100 {
            let mut permuted = original.clone();
            permute(&mut permuted, &mut rng);
            let mut inverted = original.clone();
            invert(&mut inverted, &mut rng);

            for changed in [permuted, inverted] {
                let mut colors: Vec<Color> = changed.colors().collect();
                colors.sort();
                assert_eq!(colors, sorted_original);
            }
        }
    }

    #[test]
    fn invert_reverses_contiguous_segment() {
        let mut rng = StdRng::seed_from_u64(6);
        let original = code(&[Red, Green, Blue, Yellow, Orange, Purple]);
        for _ in 0..100 {
            let mut inverted = original.clone();
            invert(&mut inverted, &mut rng);

            let changed: Vec<usize> = (0..6)
                .filter(|index| inverted.get(*index) != original.get(*index))
                .collect();
            if let (Some(start), Some(end)) = (changed.first(), changed.last()) {
                for offset in 0..=(end - start) {
                    assert_eq!(inverted.get(start + offset), original.get(end - offset));
                }
            }
        }
    }

    fn variation_params(
        policy: VariationPolicy,
        mutation: u8,
        permutation: u8,
        inversion: u8,
    ) -> GeneticParams {
        GeneticParams {
            mutation_percent: mutation,
            permutation_percent: permutation,
            inversion_percent: inversion,
            variation_policy: policy,
            ..GeneticParams::default()
        }
    }

    fn changed_positions(a: &Code, b: &Code) -> usize {
        (0..a.width()).filter(|index| a.get(*index) != b.get(*index)).count()
    }

    fn sorted_colors(code: &Code) -> Vec<Color> {
        let mut colors: Vec<Color> = code.colors().collect();
        colors.sort();
        colors
    }

    #[test]
    fn tiered_variation_applies_only_first_operator() {
        let mut rng = StdRng::seed_from_u64(20);
        let config = GameConfig::new(6, 8, true).unwrap();
        let params = variation_params(VariationPolicy::Tiered, 100, 100, 100);
        let original = code(&[Red, Green, Blue, Yellow, Orange, Purple]);
        for _ in 0..500 {
            let mut varied = original.clone();
            vary(&mut varied, &config, &params, &mut rng);

            assert!(changed_positions(&original, &varied) <= 1, "{}", varied);
        }
    }

    #[test]
    fn tiered_variation_falls_through_to_inversion() {
        let mut rng = StdRng::seed_from_u64(21);
        let config = GameConfig::new(6, 8, true).unwrap();
        let params = variation_params(VariationPolicy::Tiered, 0, 0, 100);
        let original = code(&[Red, Green, Blue, Yellow, Orange, Purple]);
        let mut num_changed = 0;
        for _ in 0..200 {
            let mut varied = original.clone();
            vary(&mut varied, &config, &params, &mut rng);

            assert_eq!(sorted_colors(&varied), sorted_colors(&original));
            if varied != original {
                num_changed += 1;
            }
        }
        assert!(num_changed > 0);
    }

    #[test]
    fn independent_variation_stacks_operators() {
        let mut rng = StdRng::seed_from_u64(22);
        let config = GameConfig::new(6, 8, true).unwrap();
        let params = variation_params(VariationPolicy::Independent, 100, 100, 100);
        let original = code(&[Red, Green, Blue, Yellow, Orange, Purple]);
        let mut num_multi_changes = 0;
        for _ in 0..200 {
            let mut varied = original.clone();
            vary(&mut varied, &config, &params, &mut rng);

            if changed_positions(&original, &varied) > 1 {
                num_multi_changes += 1;
            }
        }
        assert!(num_multi_changes > 0);

        let rearrange_only = variation_params(VariationPolicy::Independent, 0, 100, 100);
        let mut num_rearranged = 0;
        for _ in 0..200 {
            let mut varied = original.clone();
            vary(&mut varied, &config, &rearrange_only, &mut rng);

            assert_eq!(sorted_colors(&varied), sorted_colors(&original));
            if changed_positions(&original, &varied) > 2 {
                num_rearranged += 1;
            }
        }
        assert!(num_rearranged > 0);
    }

    #[test]
    fn replace_duplicates_keeps_first_occurrences() {
        let mut rng = StdRng::seed_from_u64(23);
        let config = GameConfig::new(5, 8, false).unwrap();
        let first = code(&[Red, Green, Blue, Yellow, Orange]);
        let second = code(&[Purple, Pink, Olive, Red, Green]);
        let invalid = code(&[Red, Red, Blue, Yellow, Orange]);
        let mut children = vec![first.clone(), first.clone(), second.clone(), invalid.clone()];

        replace_duplicates(&mut children, &config, &mut rng);

        assert_eq!(children[0], first);
        assert_eq!(children[2], second);
        assert_ne!(children[1], first);
        assert_ne!(children[3], invalid);
        assert!(children.iter().all(|child| config.is_valid_code(child)));
    }

    #[test]
    #[should_panic]
    fn evolve_with_zero_elite_divisor_panics() {
        let mut rng = StdRng::seed_from_u64(24);
        let config = GameConfig::default();
        let params = GeneticParams {
            elite_divisor: 0,
            ..small_params()
        };
        let population = Population::random(10, &config, &[], &mut rng);

        population.evolve(&config, &params, &[], &mut rng);
    }

    #[test]
    fn population_is_ranked() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = GameConfig::default();
        let turns = vec![Turn::new(code(&[Red, Green, Blue, Yellow]), Score::new(1, 1))];

        let population = Population::random(300, &config, &turns, &mut rng);

        assert_eq!(population.len(), 300);
        assert!(population
            .members()
            .windows(2)
            .all(|pair| pair[0].fitness <= pair[1].fitness));
        for member in population.members() {
            assert_eq!(member.fitness, fitness(&member.code, &turns));
        }
        assert!(population.feasible().all(|code| is_feasible(code, &turns)));
    }

    #[test]
    fn evolve_keeps_size_validity_and_uniqueness() {
        let mut rng = StdRng::seed_from_u64(8);
        let config = GameConfig::new(5, 8, false).unwrap();
        let params = GeneticParams {
            population_size: 301,
            ..GeneticParams::default()
        };
        let turns = vec![Turn::new(
            code(&[Red, Green, Blue, Yellow, Orange]),
            Score::new(2, 1),
        )];
        let population = Population::random(params.population_size, &config, &turns, &mut rng);

        let next = population.evolve(&config, &params, &turns, &mut rng);

        assert_eq!(next.len(), 301);
        assert!(next
            .members()
            .iter()
            .all(|member| config.is_valid_code(&member.code)));
        let distinct: HashSet<&Code> = next.members().iter().map(|member| &member.code).collect();
        // Replacements are random, so a handful of collisions may remain.
        assert!(distinct.len() > 280);
    }

    #[test]
    fn evolve_handles_tiny_code_space() {
        let mut rng = StdRng::seed_from_u64(9);
        let config = GameConfig::new(1, 2, true).unwrap();
        let params = small_params();
        let turns = vec![Turn::new(code(&[Red]), Score::new(0, 0))];
        let population = Population::random(params.population_size, &config, &turns, &mut rng);

        let next = population.evolve(&config, &params, &turns, &mut rng);

        assert_eq!(next.len(), params.population_size);
        assert!(next.feasible().all(|code| *code == self::code(&[Green])));
    }

    #[test]
    fn harvest_stops_at_target() {
        let mut rng = StdRng::seed_from_u64(10);
        let config = GameConfig::new(2, 3, true).unwrap();
        // Every code without red is feasible: four of them.
        let turns = vec![Turn::new(code(&[Red, Red]), Score::new(0, 0))];
        let population = Population::random(100, &config, &turns, &mut rng);
        let mut found = Vec::new();

        assert!(harvest(&population, &mut found, 2));
        assert_eq!(found.len(), 2);
        assert_ne!(found[0], found[1]);

        let mut all = Vec::new();
        assert!(!harvest(&population, &mut all, 10));
        assert!(all.len() <= 4);
    }

    #[test]
    fn first_guess_is_random_valid_code() {
        let config = GameConfig::new(4, 6, false).unwrap();
        let mut guesser = GeneticGuesser::new(config, StdRng::seed_from_u64(11));

        let guess = guesser.select_next_guess(&Vec::<Turn>::new()).unwrap();

        assert!(config.is_valid_code(&guess));
    }

    #[test]
    fn guess_is_feasible() {
        let config = GameConfig::new(4, 4, true).unwrap();
        let mut guesser =
            GeneticGuesser::with_params(config, small_params(), StdRng::seed_from_u64(12))
                .unwrap();
        let history = vec![Turn::new(code(&[Red, Green, Blue, Yellow]), Score::new(2, 2))];

        for _ in 0..5 {
            let guess = guesser.select_next_guess(&history).unwrap();
            assert!(is_feasible(&guess, &history), "{} is not feasible", guess);
        }
    }

    #[test]
    fn guess_respects_no_repeats() {
        let config = GameConfig::new(4, 6, false).unwrap();
        let mut guesser =
            GeneticGuesser::with_params(config, small_params(), StdRng::seed_from_u64(13))
                .unwrap();
        let history = vec![Turn::new(code(&[Red, Green, Blue, Yellow]), Score::new(0, 2))];

        for _ in 0..5 {
            let guess = guesser.select_next_guess(&history).unwrap();
            assert!(config.is_valid_code(&guess));
            assert!(is_feasible(&guess, &history));
        }
    }

    #[test]
    fn independent_variation_still_finds_feasible_codes() {
        let config = GameConfig::default();
        let params = GeneticParams {
            variation_policy: VariationPolicy::Independent,
            feasible_target: 3,
            ..small_params()
        };
        let mut guesser =
            GeneticGuesser::with_params(config, params, StdRng::seed_from_u64(14)).unwrap();
        let history = vec![Turn::new(code(&[Red, Red, Green, Green]), Score::new(1, 0))];

        let guess = guesser.select_next_guess(&history).unwrap();

        assert!(is_feasible(&guess, &history));
    }

    #[test]
    fn inconsistent_history_hits_attempt_cap() {
        let config = GameConfig::default();
        let params = GeneticParams {
            population_size: 50,
            max_generations: 5,
            max_attempts: Some(2),
            ..GeneticParams::default()
        };
        let mut guesser =
            GeneticGuesser::with_params(config, params, StdRng::seed_from_u64(15)).unwrap();
        let history = vec![
            Turn::new(code(&[Red, Red, Red, Red]), Score::new(4, 0)),
            Turn::new(code(&[Red, Red, Red, Red]), Score::new(0, 0)),
        ];

        assert_eq!(
            guesser.select_next_guess(&history),
            Err(MastermindError::NoFeasibleCode { attempts: 2 })
        );
    }

    #[test]
    fn cancelled_guesser_stops() {
        let config = GameConfig::default();
        let token = CancelToken::new();
        let mut guesser = GeneticGuesser::new(config, StdRng::seed_from_u64(16))
            .with_cancel_token(token.clone());
        let history = vec![Turn::new(code(&[Red, Red, Red, Red]), Score::new(0, 0))];

        token.cancel();
        assert_eq!(
            guesser.select_next_guess(&history),
            Err(MastermindError::Cancelled)
        );

        token.reset();
        assert!(guesser.select_next_guess(&history).is_ok());
    }

    #[test]
    fn history_with_wrong_width_is_rejected() {
        let config = GameConfig::default();
        let mut guesser = GeneticGuesser::new(config, StdRng::seed_from_u64(17));
        let history = vec![Turn::new(code(&[Red, Red]), Score::new(0, 0))];

        assert_eq!(
            guesser.select_next_guess(&history),
            Err(MastermindError::WidthMismatch {
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn seeded_guessers_agree() {
        let config = GameConfig::default();
        let history = vec![Turn::new(code(&[Red, Green, Blue, Yellow]), Score::new(1, 2))];
        let mut a = GeneticGuesser::with_params(config, small_params(), StdRng::seed_from_u64(18))
            .unwrap();
        let mut b = GeneticGuesser::with_params(config, small_params(), StdRng::seed_from_u64(18))
            .unwrap();

        assert_eq!(
            a.select_next_guess(&history).unwrap(),
            b.select_next_guess(&history).unwrap()
        );
    }
}
