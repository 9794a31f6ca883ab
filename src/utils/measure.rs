//! Memory size quantities such as `512MB` or `1GB`.

use crate::server::InvalidConfigChange;

const UNITS: [(&str, u64); 5] = [
    ("TB", 1 << 40),
    ("GB", 1 << 30),
    ("MB", 1 << 20),
    ("KB", 1 << 10),
    ("B", 1),
];

/// Parses a memory quantity into bytes. Units are base 1024 and case-insensitive.
pub fn parse_memory_size(value: &str) -> std::result::Result<u64, InvalidConfigChange> {
    let trimmed = value.trim();
    let upper = trimmed.to_ascii_uppercase();

    let (digits, multiplier) = UNITS
        .iter()
        .find_map(|(unit, multiplier)| upper.strip_suffix(unit).map(|digits| (digits, *multiplier)))
        .ok_or_else(|| {
            InvalidConfigChange::new(format!(
                "Invalid memory size '{}': expected a quantity followed by one of B, KB, MB, GB, TB",
                value
            ))
        })?;

    let quantity: u64 = digits
        .trim()
        .parse()
        .map_err(|_| InvalidConfigChange::new(format!("Invalid memory size '{}': quantity is not a number", value)))?;

    if quantity == 0 {
        return Err(InvalidConfigChange::new(format!(
            "Invalid memory size '{}': must be greater than zero",
            value
        )));
    }

    quantity
        .checked_mul(multiplier)
        .ok_or_else(|| InvalidConfigChange::new(format!("Invalid memory size '{}': too large", value)))
}

/// Renders a byte count using the largest unit that divides it exactly
pub fn format_memory_size(bytes: u64) -> String {
    for (unit, multiplier) in UNITS {
        if bytes >= multiplier && bytes % multiplier == 0 {
            return format!("{}{}", bytes / multiplier, unit);
        }
    }
    format!("{}B", bytes)
}
