//! Terminal output for the target catalog listing.

use crate::target::Target;
use colored::*;

/// Prints the catalog as a two-column box table sized to the terminal.
pub fn print_target_catalog() {
    let term_width = console::Term::stdout().size().1 as usize;
    let (name_width, desc_width) = column_widths(term_width);

    let sep = |left: &str, mid: &str, right: &str| {
        format!(
            "{}{}{}{}{}",
            left,
            "─".repeat(name_width + 2),
            mid,
            "─".repeat(desc_width + 2),
            right
        )
    };

    println!("{}", sep("┌", "┬", "┐"));
    println!(
        "│ {}{} │ {}{} │",
        "Target".bold(),
        " ".repeat(name_width - "Target".len()),
        "Description".bold(),
        " ".repeat(desc_width.saturating_sub("Description".len())),
    );
    println!("{}", sep("├", "┼", "┤"));

    for target in Target::ALL {
        let desc = console::truncate_str(target.describe(), desc_width, "...");
        println!(
            "│ {:<nw$} │ {:<dw$} │",
            target.name(),
            desc,
            nw = name_width,
            dw = desc_width
        );
    }

    println!("{}", sep("└", "┴", "┘"));
}

/// Name column fits the longest target, the description column takes what
/// is left of the terminal but never collapses entirely.
fn column_widths(term_width: usize) -> (usize, usize) {
    let name_width = Target::ALL
        .iter()
        .map(|t| t.name().chars().count())
        .max()
        .unwrap_or(0)
        .max("Target".len());

    let max_desc = Target::ALL
        .iter()
        .map(|t| t.describe().chars().count())
        .max()
        .unwrap_or(0)
        .max("Description".len());

    let desc_width = max_desc.min(term_width.saturating_sub(name_width + 7).max(16));
    (name_width, desc_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_terminals_fit_every_description() {
        let (_, desc_width) = column_widths(200);
        let longest = Target::ALL
            .iter()
            .map(|t| t.describe().chars().count())
            .max()
            .unwrap();
        assert_eq!(desc_width, longest);
    }

    #[test]
    fn test_narrow_terminals_keep_a_readable_column() {
        let (name_width, desc_width) = column_widths(40);
        assert_eq!(name_width, "cross-android-arm32".len());
        assert_eq!(desc_width, 16);
    }
}
