use crate::results::MastermindError;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The maximum number of positions in a code.
pub const MAX_WIDTH: usize = 8;

/// The number of colors in the full alphabet.
pub const MAX_COLORS: usize = 15;

/// One symbol of the code alphabet.
///
/// Colors are only compared for identity, and ordered by their position in [`Color::ALL`]. They
/// carry no display information; mapping them to something visible is up to the front end.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    Purple,
    Pink,
    Olive,
    LightBlue,
    LightGreen,
    LightRed,
    LightOrange,
    LightPurple,
    White,
    Black,
}

impl Color {
    /// Every color, in alphabet order.
    pub const ALL: [Color; MAX_COLORS] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Orange,
        Color::Purple,
        Color::Pink,
        Color::Olive,
        Color::LightBlue,
        Color::LightGreen,
        Color::LightRed,
        Color::LightOrange,
        Color::LightPurple,
        Color::White,
        Color::Black,
    ];

    /// The zero-based position of this color in the alphabet.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the color at the given position in the alphabet, if there is one.
    pub fn from_index(index: usize) -> Option<Color> {
        Color::ALL.get(index).copied()
    }

    fn name(self) -> &'static str {
        match self {
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Blue => "Blue",
            Color::Yellow => "Yellow",
            Color::Orange => "Orange",
            Color::Purple => "Purple",
            Color::Pink => "Pink",
            Color::Olive => "Olive",
            Color::LightBlue => "LightBlue",
            Color::LightGreen => "LightGreen",
            Color::LightRed => "LightRed",
            Color::LightOrange => "LightOrange",
            Color::LightPurple => "LightPurple",
            Color::White => "White",
            Color::Black => "Black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = MastermindError;

    /// Parses either a color name (case-insensitive) or its zero-based index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<usize>() {
            return Color::from_index(index)
                .ok_or_else(|| MastermindError::InvalidCode(format!("no color at index {index}")));
        }
        Color::ALL
            .iter()
            .find(|color| color.name().eq_ignore_ascii_case(trimmed))
            .copied()
            .ok_or_else(|| MastermindError::InvalidCode(format!("unknown color '{trimmed}'")))
    }
}

/// An ordered, fixed-width row of colors: either a guess or the secret.
///
/// A position may be empty (`None`) while a row is being filled in. Empty positions never match
/// anything when scoring.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Code {
    pegs: Vec<Option<Color>>,
}

impl Code {
    /// Constructs a complete code from the given colors.
    ///
    /// ```
    /// use mastermind_solver::{Code, Color};
    ///
    /// let code = Code::new(vec![Color::Red, Color::Green]);
    /// assert_eq!(code.width(), 2);
    /// assert!(code.is_complete());
    /// ```
    pub fn new(colors: Vec<Color>) -> Code {
        Code {
            pegs: colors.into_iter().map(Some).collect(),
        }
    }

    /// Constructs a row of the given width with every position empty.
    pub fn empty(width: usize) -> Code {
        Code {
            pegs: vec![None; width],
        }
    }

    pub fn width(&self) -> usize {
        self.pegs.len()
    }

    /// Returns the color at the given position, or `None` if it is empty or out of range.
    pub fn get(&self, index: usize) -> Option<Color> {
        self.pegs.get(index).copied().flatten()
    }

    /// Sets the color at the given position.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than the width.
    pub fn set(&mut self, index: usize, color: Color) {
        self.pegs[index] = Some(color);
    }

    /// The raw positions of this row, including empty ones.
    pub fn pegs(&self) -> &[Option<Color>] {
        &self.pegs
    }

    pub(crate) fn pegs_mut(&mut self) -> &mut [Option<Color>] {
        &mut self.pegs
    }

    /// Whether every position holds a color.
    pub fn is_complete(&self) -> bool {
        self.pegs.iter().all(Option::is_some)
    }

    /// Iterates over the colors of the filled positions.
    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.pegs.iter().flatten().copied()
    }

    /// Counts how many positions hold the given color.
    pub fn count_of(&self, color: Color) -> usize {
        self.colors().filter(|other| *other == color).count()
    }

    /// Whether any color appears in more than one position.
    pub fn has_repeats(&self) -> bool {
        let mut seen = [false; MAX_COLORS];
        for color in self.colors() {
            if seen[color.index()] {
                return true;
            }
            seen[color.index()] = true;
        }
        false
    }
}

impl FromIterator<Color> for Code {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> Self {
        Code {
            pegs: iter.into_iter().map(Some).collect(),
        }
    }
}

impl FromStr for Code {
    type Err = MastermindError;

    /// Parses colors separated by commas and/or whitespace, e.g. `"red, green blue,3"`. An
    /// underscore marks an empty position.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pegs = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| {
                if part == "_" {
                    Ok(None)
                } else {
                    part.parse::<Color>().map(Some)
                }
            })
            .collect::<Result<Vec<Option<Color>>, MastermindError>>()?;
        if pegs.is_empty() {
            return Err(MastermindError::InvalidCode(format!(
                "'{s}' does not contain any colors"
            )));
        }
        Ok(Code { pegs })
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, peg) in self.pegs.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            match peg {
                Some(color) => write!(f, "{color}")?,
                None => f.write_str("_")?,
            }
        }
        Ok(())
    }
}

/// The rules that a valid code must follow.
///
/// A `GameConfig` can only be constructed with supported values, so the guessers can rely on it
/// without checking again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "UncheckedGameConfig")
)]
pub struct GameConfig {
    width: u8,
    color_count: u8,
    allow_repeats: bool,
}

impl GameConfig {
    /// Constructs a new config, returning an error if no valid code could exist under it.
    ///
    /// ```
    /// use mastermind_solver::GameConfig;
    ///
    /// assert!(GameConfig::new(4, 6, true).is_ok());
    /// assert!(GameConfig::new(4, 2, false).is_err());
    /// ```
    pub fn new(width: u8, color_count: u8, allow_repeats: bool) -> Result<Self, MastermindError> {
        if width == 0 || width as usize > MAX_WIDTH {
            return Err(MastermindError::InvalidConfig(format!(
                "width must be between 1 and {MAX_WIDTH}, got {width}"
            )));
        }
        if color_count == 0 || color_count as usize > MAX_COLORS {
            return Err(MastermindError::InvalidConfig(format!(
                "color count must be between 1 and {MAX_COLORS}, got {color_count}"
            )));
        }
        if !allow_repeats && color_count < width {
            return Err(MastermindError::InvalidConfig(format!(
                "{color_count} colors cannot fill {width} positions without repeats"
            )));
        }
        Ok(GameConfig {
            width,
            color_count,
            allow_repeats,
        })
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn color_count(&self) -> usize {
        self.color_count as usize
    }

    pub fn allow_repeats(&self) -> bool {
        self.allow_repeats
    }

    /// The subset of the alphabet that is in play.
    pub fn palette(&self) -> &'static [Color] {
        &Color::ALL[..self.color_count()]
    }

    /// Whether the code is complete, has the right width, only uses colors from the palette, and
    /// respects the repeat rule.
    pub fn is_valid_code(&self, code: &Code) -> bool {
        code.width() == self.width()
            && code.is_complete()
            && code.colors().all(|color| color.index() < self.color_count())
            && (self.allow_repeats || !code.has_repeats())
    }

    /// The number of valid codes under this config.
    pub fn num_codes(&self) -> u64 {
        let colors = self.color_count as u64;
        if self.allow_repeats {
            colors.pow(self.width as u32)
        } else {
            (0..self.width as u64).map(|i| colors - i).product()
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            width: 4,
            color_count: 6,
            allow_repeats: true,
        }
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct UncheckedGameConfig {
    width: u8,
    color_count: u8,
    allow_repeats: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<UncheckedGameConfig> for GameConfig {
    type Error = MastermindError;

    fn try_from(unchecked: UncheckedGameConfig) -> Result<Self, Self::Error> {
        GameConfig::new(
            unchecked.width,
            unchecked.color_count,
            unchecked.allow_repeats,
        )
    }
}
