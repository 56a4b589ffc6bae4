// Operator input parsing

/// One line of operator input, resolved against the current catalog size
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Refresh,
    KillAll,
    Health,
    /// A 1-based index already checked against the catalog
    Kill(usize),
    /// Digits outside `1..=entry_count`
    OutOfRange,
    Unknown,
}

impl Command {
    pub fn parse(input: &str, entry_count: usize) -> Self {
        let input = input.trim();

        match input {
            "q" | "Q" => return Self::Quit,
            "r" | "R" => return Self::Refresh,
            "a" | "A" => return Self::KillAll,
            "m" | "M" => return Self::Health,
            _ => {}
        }

        if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Self::Unknown;
        }

        // Digits too long for usize are out of range too
        match input.parse::<usize>() {
            Ok(index) if (1..=entry_count).contains(&index) => Self::Kill(index),
            _ => Self::OutOfRange,
        }
    }
}

/// `y` or `yes`, any case
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
