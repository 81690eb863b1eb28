//! `thinkact tools`: print the catalog exactly as the model sees it.

use std::path::Path;

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let registry = super::build_registry(&config);

    println!("{}", registry.render_catalog());

    let unavailable: Vec<&str> = registry
        .names()
        .into_iter()
        .filter(|name| registry.get(name).is_some_and(|t| !t.is_available()))
        .collect();
    if !unavailable.is_empty() {
        println!("Unavailable here: {}", unavailable.join(", "));
    }
    Ok(())
}
