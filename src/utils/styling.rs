//! Terminal styling utilities for the clustering CLI

use std::path::Path;
use std::time::Duration;

use console::{style, Emoji};

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static GRID: Emoji<'_, '_> = Emoji("🧩 ", "");
pub static DICE: Emoji<'_, '_> = Emoji("🎲 ", "");

const CARD_WIDTH: usize = 56;

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ██████╗  ██████╗██╗  ██╗██████╗
    ██╔══██╗██╔════╝██║  ██║██╔══██╗
    ██║  ██║██║     ███████║██████╔╝
    ██║  ██║██║     ██╔══██║██╔══██╗
    ██████╔╝╚██████╗██║  ██║██████╔╝
    ╚═════╝  ╚═════╝╚═╝  ╚═╝╚═════╝
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {} {}",
        style("◆").magenta().bold(),
        style("Population-stratified village clustering").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Values shown on the configuration card
pub struct ConfigCard<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub domains: &'a [String],
    pub k: Option<usize>,
    pub restarts: Option<usize>,
    pub seed: Option<u64>,
    pub elbow: bool,
}

fn card_row(icon: &Emoji<'_, '_>, label: &str, value: String) {
    println!("    │  {}{:<10}{:<38}│", icon, label, truncate_string(&value, 37));
}

/// Print configuration card
pub fn print_config(card: &ConfigCard<'_>) {
    let line = "─".repeat(CARD_WIDTH - 2);
    let or_preset = |v: Option<String>| v.unwrap_or_else(|| "per domain".to_string());

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(CARD_WIDTH - 20)
    );
    println!("    ├{}┤", line);
    card_row(&FOLDER, "Input:", truncate_path(card.input, 37));
    card_row(&SAVE, "Output:", truncate_path(card.output, 37));
    card_row(&GRID, "Domains:", card.domains.join(", "));
    println!("    ├{}┤", line);
    card_row(&GRID, "k:", or_preset(card.k.map(|k| k.to_string())));
    card_row(&DICE, "Restarts:", or_preset(card.restarts.map(|r| r.to_string())));
    card_row(&DICE, "Seed:", or_preset(card.seed.map(|s| s.to_string())));
    card_row(
        &INFO,
        "Elbow:",
        if card.elbow { "on" } else { "off" }.to_string(),
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print how long a step took
pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}",
        style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("Clustering complete!").green().bold()
    );
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, detail: Option<&str>) {
    if let Some(detail) = detail {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(detail).dim()
        );
    } else {
        println!(
            "      Found {} {}",
            style(count).yellow().bold(),
            description
        );
    }
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}
