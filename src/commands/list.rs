//! List commands implementation

use crate::programmers;
use spinand_core::pattern::Pattern;

/// List all supported programmers
pub fn list_programmers() {
    let programmers = programmers::available_programmers();
    if programmers.is_empty() {
        println!("No programmers compiled in.");
        return;
    }

    println!("Supported programmers:");
    println!();
    for p in &programmers {
        println!("  {:10} - {}", p.name, p.description);
        if !p.aliases.is_empty() {
            println!("  {:10}   aliases: {}", "", p.aliases.join(", "));
        }
    }
}

/// List the named data patterns
pub fn list_patterns() {
    println!("Data patterns:");
    println!();
    for (name, pattern) in Pattern::PRESETS.iter() {
        let mut head = [0u8; 8];
        pattern.fill(&mut head);
        let head: Vec<String> = head.iter().map(|b| format!("{:02X}", b)).collect();
        println!("  {:<14} {:<26} {} ...", name, pattern.to_string(), head.join(" "));
    }
}
