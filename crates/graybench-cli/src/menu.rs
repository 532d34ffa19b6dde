//! Numeric strategy menu.

use std::io::{self, BufRead, Write};

use graybench_compute::StrategyKind;

/// Highest menu number.
pub const MAX_CHOICE: i64 = 4;

/// One menu selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Exit,
    Run(StrategyKind),
}

impl MenuChoice {
    /// Maps a menu number to a choice, clamping into `0..=4`.
    pub fn from_index(index: i64) -> Self {
        match index.clamp(0, MAX_CHOICE) {
            0 => MenuChoice::Exit,
            1 => MenuChoice::Run(StrategyKind::Reference),
            2 => MenuChoice::Run(StrategyKind::Cpu),
            3 => MenuChoice::Run(StrategyKind::Gpu),
            _ => MenuChoice::Run(StrategyKind::Split),
        }
    }

    /// Parses one input line. `None` if it is not an integer.
    pub fn parse(line: &str) -> Option<Self> {
        line.trim().parse::<i64>().ok().map(Self::from_index)
    }
}

/// Writes the menu and the prompt.
pub fn print_menu<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "0. Exit program.")?;
    for (i, kind) in StrategyKind::ALL.iter().enumerate() {
        writeln!(out, "{}. {}.", i + 1, kind)?;
    }
    write!(out, "Please select: ")?;
    out.flush()
}

/// Prompts until a number is entered. End of input counts as exit.
pub fn read_choice<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<MenuChoice> {
    let mut line = String::new();
    loop {
        print_menu(out)?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(MenuChoice::Exit);
        }
        match MenuChoice::parse(&line) {
            Some(choice) => return Ok(choice),
            None => writeln!(out, "Not a number: {}", line.trim())?,
        }
    }
}
