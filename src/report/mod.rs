pub mod table;
pub mod json;

use crate::config::Config;
use crate::scan::{Category, ScanResult};

pub fn print_scan(result: &ScanResult, only: Option<Category>, config: &Config) {
    if config.json_output {
        match only {
            Some(category) => println!("{}", json::render(&result.records_in(category))),
            None => println!("{}", json::render(result)),
        }
    } else {
        print!("{}", table::render_records(result, only));
        print_diagnostics(&result.diagnostics, config.verbose);
    }
}

pub fn print_diagnostics(diagnostics: &[String], verbose: bool) {
    if diagnostics.is_empty() {
        return;
    }

    println!();
    if verbose {
        println!("Diagnostics:");
        println!("{}", "-".repeat(40));
        for diagnostic in diagnostics {
            println!("  {diagnostic}");
        }
    } else {
        for diagnostic in diagnostics {
            println!("[diagnostic] {diagnostic}");
        }
    }
}
