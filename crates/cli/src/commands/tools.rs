//! `reagent tools`: list registered tool definitions.

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let dispatch = reagent_tools::default_dispatch(&config.tools)?;

    for def in dispatch.definitions() {
        let params: Vec<&str> = def.parameters["required"]
            .as_array()
            .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        println!("{:<16} ({}) {}", def.name, params.join(", "), def.description);
    }
    println!();
    println!(
        "{} tools; file access confined to {}",
        dispatch.definitions().len(),
        config.tools.workspace_root.display()
    );
    Ok(())
}
