//! Terminal styling utilities
//!
//! Semantic colors for CLI output:
//! - Cyan for headers and technical terms
//! - Green/yellow/red for status

use crossterm::style::Stylize;

/// Extension trait for consistent `SoundSurfer` styling
///
/// ```
/// use soundsurfer::style::SurferStyle;
///
/// println!("{}", "Screen Devices".header());
/// println!("{}", "/path/to/config.json".technical());
/// ```
pub trait SurferStyle: Stylize {
    /// Section headers (cyan bold)
    fn header(self) -> <<Self as Stylize>::Styled as Stylize>::Styled
    where
        Self: Sized,
        <Self as Stylize>::Styled: Stylize,
    {
        self.cyan().bold()
    }

    /// Positive states: valid config, matched window
    fn success(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.green()
    }

    /// Problems: not found, unmapped
    fn error(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.red()
    }

    fn warning(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.yellow()
    }

    /// Paths, device names, screen ids
    fn technical(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.cyan()
    }
}

impl<T: Stylize> SurferStyle for T {}
