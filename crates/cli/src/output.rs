//! Output formatting for CLI

use colored::Colorize;

/// Print success message
pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).green());
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).red());
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).yellow());
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}

/// Print numbered remediation steps, if any
pub fn print_remediation(steps: &[&str]) {
    if steps.is_empty() {
        return;
    }
    println!();
    println!("Solutions:");
    for (i, step) in steps.iter().enumerate() {
        println!("{}. {}", i + 1, step);
    }
}
