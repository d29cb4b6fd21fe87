use clap::{Parser, Subcommand, ValueEnum};
use dyn_clone::DynClone;
use log::{info, warn, LevelFilter};
use mastermind_solver::genetic::GeneticParams;
use mastermind_solver::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Simple program to play Mastermind in reverse, where the computer breaks the code.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of positions in a code.
    #[arg(short, long, default_value_t = 4)]
    width: u8,

    /// Number of colors in play.
    #[arg(short, long, default_value_t = 6)]
    colors: u8,

    /// Forbid the same color from appearing twice in one code.
    #[arg(long)]
    no_repeats: bool,

    /// Maximum number of guesses before the game is lost.
    #[arg(short, long, default_value_t = 8)]
    max_tries: u32,

    /// Which guessing strategy to use.
    #[arg(short, long, value_enum, default_value_t = Strategy::Genetic)]
    strategy: Strategy,

    /// Seed for the random number generator. A random seed is used if not set.
    #[arg(long)]
    seed: Option<u64>,

    /// Path to a RON file with genetic solver parameters. Missing fields keep their defaults.
    #[arg(long)]
    genetic_params: Option<PathBuf>,

    /// Log more detail. Repeat for even more. `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play many games against random secrets and report how many guesses were needed.
    Benchmark {
        #[arg(short, long, default_value_t = 100)]
        games: u32,
    },
    /// Run a single game with the given secret, e.g. "red, green, blue, yellow".
    Single { secret: String },
    /// Run an interactive game: keep a secret in mind and score each guess.
    Interactive,
    /// Check whether a candidate code is consistent with the given turns.
    Check {
        candidate: String,
        /// A past turn as "<guess>=<exact>,<color_only>", e.g. "red green blue yellow=2,1".
        #[arg(short, long = "turn")]
        turns: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Strategy {
    Genetic,
    Exhaustive,
    Random,
}

/// A guesser that can be chosen at runtime and cloned fresh for each game.
trait CloneGuesser: Guesser + DynClone {}

impl<G: Guesser + Clone> CloneGuesser for G {}

dyn_clone::clone_trait_object!(CloneGuesser);

fn main() -> Result<(), Box<dyn Error>> {
    let start_time = Instant::now();
    let args = Args::parse();
    init_logging(args.verbose);

    let config = GameConfig::new(args.width, args.colors, !args.no_repeats)?;
    println!(
        "Playing with {} positions and {} colors, repeats {}.",
        config.width(),
        config.color_count(),
        if config.allow_repeats() {
            "allowed"
        } else {
            "forbidden"
        }
    );

    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Using seed {}", seed);
    let params = match &args.genetic_params {
        Some(path) => load_genetic_params(path)?,
        None => GeneticParams::default(),
    };
    let guesser = build_guesser(args.strategy, config, params, seed)?;

    match args.command {
        Command::Benchmark { games } => {
            run_benchmark(&config, games, args.max_tries, guesser, seed)?
        }
        Command::Single { secret } => play_single_game(&secret, &config, args.max_tries, guesser)?,
        Command::Interactive => play_interactive_game(&config, args.max_tries, guesser)?,
        Command::Check { candidate, turns } => check_candidate(&candidate, &turns, &config)?,
    }

    println!(
        "Command executed in {:.3}s.",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_genetic_params(path: &Path) -> Result<GeneticParams, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let params: GeneticParams = ron::from_str(&contents)?;
    params.validate()?;
    info!("Loaded genetic parameters from {}", path.display());
    Ok(params)
}

fn build_guesser(
    strategy: Strategy,
    config: GameConfig,
    params: GeneticParams,
    seed: u64,
) -> Result<Box<dyn CloneGuesser>, MastermindError> {
    let guesser: Box<dyn CloneGuesser> = match strategy {
        Strategy::Genetic => Box::new(GeneticGuesser::with_params(
            config,
            params,
            StdRng::seed_from_u64(seed),
        )?),
        Strategy::Exhaustive => Box::new(ExhaustiveGuesser::new(config)),
        Strategy::Random => Box::new(RandomGuesser::new(config, StdRng::seed_from_u64(seed))),
    };
    Ok(guesser)
}

fn parse_code(input: &str, config: &GameConfig) -> Result<Code, Box<dyn Error>> {
    let code: Code = input.parse()?;
    if code.width() != config.width() {
        return Err(MastermindError::WidthMismatch {
            expected: config.width(),
            actual: code.width(),
        }
        .into());
    }
    if !config.is_valid_code(&code) {
        return Err(MastermindError::InvalidCode(format!(
            "{} is not a valid code for this game",
            code
        ))
        .into());
    }
    Ok(code)
}

fn run_benchmark(
    config: &GameConfig,
    num_games: u32,
    max_tries: u32,
    prototype: Box<dyn CloneGuesser>,
    seed: u64,
) -> Result<(), MastermindError> {
    let mut secrets_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let mut num_guesses_per_game: Vec<u32> = Vec::new();
    let mut num_lost = 0;
    let mut total_time = Duration::ZERO;
    for game in 1..=num_games {
        let secret = random_code(config, &mut secrets_rng);
        let guesser = dyn_clone::clone_box(&*prototype);
        let game_start = Instant::now();
        let result = play_game_with_guesser(&secret, max_tries, guesser)?;
        let elapsed = game_start.elapsed();
        total_time += elapsed;
        match result {
            GameResult::Success(guesses) => {
                info!(
                    "Game {}: solved {} in {} guesses ({:.3}s)",
                    game,
                    secret,
                    guesses.len(),
                    elapsed.as_secs_f64()
                );
                num_guesses_per_game.push(guesses.len() as u32);
            }
            GameResult::Failure(_) => {
                warn!("Game {}: could not solve {}", game, secret);
                num_lost += 1;
            }
        }
    }
    println!(
        "Played {} games: {} won, {} lost.",
        num_games,
        num_guesses_per_game.len(),
        num_lost
    );
    if num_games > 0 {
        println!(
            "Total time {:.3}s, {:.3}s per game.",
            total_time.as_secs_f64(),
            total_time.as_secs_f64() / num_games as f64
        );
    }
    if num_guesses_per_game.is_empty() {
        return Ok(());
    }

    let mut num_games_per_round: HashMap<u32, u32> = HashMap::new();
    for num_guesses in num_guesses_per_game.iter() {
        *(num_games_per_round.entry(*num_guesses).or_insert(0)) += 1;
    }

    println!("|Num guesses|Num games|");
    println!("|-----------|---------|");
    let mut num_rounds = num_games_per_round.keys().copied().collect::<Vec<u32>>();
    num_rounds.sort_unstable();
    for num_round in num_rounds.iter() {
        println!("|{}|{}|", num_round, num_games_per_round[num_round]);
    }

    let average: f64 = num_guesses_per_game.iter().sum::<u32>() as f64
        / num_guesses_per_game.len() as f64;
    let std_dev: f64 = (num_guesses_per_game
        .iter()
        .map(|num_guesses| (*num_guesses as f64 - average).powi(2))
        .sum::<f64>()
        / num_guesses_per_game.len() as f64)
        .sqrt();

    println!(
        "\n**Average number of guesses:** {:.2} +/- {:.2}",
        average, std_dev
    );
    Ok(())
}

fn play_single_game(
    secret: &str,
    config: &GameConfig,
    max_tries: u32,
    guesser: Box<dyn CloneGuesser>,
) -> Result<(), Box<dyn Error>> {
    let secret = parse_code(secret, config)?;
    match play_game_with_guesser(&secret, max_tries, guesser)? {
        GameResult::Success(guesses) => {
            println!("Solved it! It took me {} guesses.", guesses.len());
            for guess in guesses.iter() {
                println!("\t{}", guess);
            }
        }
        GameResult::Failure(guesses) => {
            println!(
                "I still couldn't solve it after {} guesses :(",
                guesses.len()
            );
            for guess in guesses.iter() {
                println!("\t{}", guess);
            }
        }
    }
    Ok(())
}

fn play_interactive_game(
    config: &GameConfig,
    max_tries: u32,
    mut guesser: Box<dyn CloneGuesser>,
) -> Result<(), Box<dyn Error>> {
    let palette = config
        .palette()
        .iter()
        .map(|color| color.to_string())
        .collect::<Vec<String>>()
        .join(", ");
    println!(
        "Choose a secret of {} colors from: {}. Press enter once you've chosen.",
        config.width(),
        palette
    );

    {
        let mut buffer = String::new();
        io::stdin().read_line(&mut buffer)?;
    }

    println!(
        "I will now try to guess your secret.\n\n\
         For each guess, enter the number of exact matches (right color, right position) and\n\
         color-only matches (right color, wrong position), separated by a comma.\n\n\
         For example, if your secret was \"red, green, blue, yellow\" and the guess was\n\
         \"red, blue, orange, orange\", you would enter \"1,1\"."
    );

    let mut history: Vec<Turn> = Vec::new();
    for round in 1..=max_tries {
        let guess = guesser.select_next_guess(&history)?;
        println!("I'm guessing: {}. How did I do?", guess);

        let score = loop {
            match read_score(config) {
                Ok(score) => break score,
                Err(e) => println!("{} Try again.", e),
            }
        };

        if score.is_win(config.width()) {
            println!("I did it! It took me {} guesses.", round);
            return Ok(());
        }
        history.push(Turn::new(guess, score));
    }

    println!("I couldn't guess it :(");

    Ok(())
}

fn read_score(config: &GameConfig) -> Result<Score, Box<dyn Error>> {
    let mut buffer = String::new();
    io::stdin().read_line(&mut buffer)?;
    let score: Score = buffer.trim().parse()?;
    if score.exact as usize + score.color_only as usize > config.width() {
        return Err(MastermindError::InvalidScore(format!(
            "at most {} pegs can match",
            config.width()
        ))
        .into());
    }
    Ok(score)
}

fn parse_turn(input: &str, config: &GameConfig) -> Result<Turn, Box<dyn Error>> {
    let (guess, score) = input.rsplit_once('=').ok_or_else(|| {
        MastermindError::InvalidScore(format!("expected '<guess>=<score>', got '{}'", input))
    })?;
    Ok(Turn::new(parse_code(guess, config)?, score.parse()?))
}

fn check_candidate(
    candidate: &str,
    turns: &[String],
    config: &GameConfig,
) -> Result<(), Box<dyn Error>> {
    let candidate = parse_code(candidate, config)?;
    let history = turns
        .iter()
        .map(|turn| parse_turn(turn, config))
        .collect::<Result<Vec<Turn>, _>>()?;

    for turn in history.iter() {
        let score = compute_score(&candidate, &turn.guess);
        let verdict = if score == turn.score { "ok" } else { "conflicts" };
        println!(
            "\t{} scored {}, candidate would score {} ({})",
            turn.guess, turn.score, score, verdict
        );
    }

    if is_feasible(&candidate, &history) {
        println!("{} is consistent with every turn.", candidate);
    } else {
        println!("{} can't be the secret.", candidate);
    }
    Ok(())
}
