//! Console output helpers for dcctl.
//!
//! Progress is printed as it happens so a failed run shows exactly which
//! phase and item it stopped at.

use colored::Colorize;

/// Print the DeviceChain banner.
pub fn print_banner() {
    println!();
    println!(
        "{}",
        r"
  ____             _           ____ _           _
 |  _ \  _____   _(_) ___ ___ / ___| |__   __ _(_)_ __
 | | | |/ _ \ \ / / |/ __/ _ \ |   | '_ \ / _` | | '_ \
 | |_| |  __/\ V /| | (_|  __/ |___| | | | (_| | | | | |
 |____/ \___| \_/ |_|\___\___|\____|_| |_|\__,_|_|_| |_|
"
        .cyan()
    );
    println!("  {}", "IoT control plane provisioning".bright_black());
    println!();
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", "═".repeat(70).bright_black());
    println!("{}", title.cyan().bold());
    println!("{}", "═".repeat(70).bright_black());
    println!();
}

/// Print a progress step with step number.
pub fn print_progress_step(current: usize, total: usize, message: &str) {
    println!(
        "{} {} {}",
        format!("[{current}/{total}]").bright_black(),
        "▶".cyan(),
        message.bold()
    );
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print one processed item within a phase.
pub fn print_progress(message: &str) {
    println!("  {} {}", "→".cyan(), message);
}

/// Print an item followed by a status tag, e.g. `FOUND` or `ADDED`.
pub fn print_status(message: &str, status: &str, fresh: bool) {
    let tag = if fresh {
        status.green().bold()
    } else {
        status.bright_black().bold()
    };
    println!("  {} {message} {tag}", "→".cyan());
}
