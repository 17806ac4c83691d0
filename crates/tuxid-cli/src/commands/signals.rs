//! `tuxid signals`: list the signal registry.

pub fn run(registry_path: Option<&str>, json: bool) {
    let registry = super::load_registry(registry_path);

    if json {
        match serde_json::to_string_pretty(registry.definitions()) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("Failed to serialize registry: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let width = registry
        .definitions()
        .iter()
        .map(|d| d.name.chars().count())
        .max()
        .unwrap_or(0);
    println!(
        "  {:<width$} {:<10} {:>10}  {:<10}",
        "Signal", "Category", "Resettable", "Privilege"
    );
    println!("  {}", "-".repeat(width + 35));
    for def in registry.definitions() {
        println!(
            "  {:<width$} {:<10} {:>10}  {:<10}",
            def.name,
            def.category.to_string(),
            if def.user_resettable { "yes" } else { "no" },
            def.read_privilege.to_string()
        );
    }
    println!("\n{} signal(s) known.", registry.len());
}
