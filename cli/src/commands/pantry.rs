use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use sous_core::controller::Controller;

use super::helpers::{not_found, truncate};

pub(crate) fn cmd_pantry_add(
    ctrl: &mut Controller,
    name: &str,
    amount: Option<&str>,
    json: bool,
) -> Result<()> {
    let added = ctrl.add_ingredient(name, amount)?;

    match (added, json) {
        (Some(ingredient), true) => println!("{}", serde_json::to_string_pretty(&ingredient)?),
        (Some(ingredient), false) => match ingredient.amount {
            Some(ref amount) => println!("Added {} ({amount})", ingredient.name),
            None => println!("Added {}", ingredient.name),
        },
        (None, true) => println!("null"),
        (None, false) => eprintln!("Ingredient name is empty; nothing added"),
    }

    Ok(())
}

pub(crate) fn cmd_pantry_remove(ctrl: &mut Controller, id: &str, json: bool) -> Result<()> {
    if !ctrl.remove_ingredient(id)? {
        return Err(not_found(&format!("No ingredient with id '{id}'"), json));
    }

    if json {
        println!("{}", serde_json::json!({ "removed": id }));
    } else {
        println!("Removed ingredient {id}");
    }
    Ok(())
}

pub(crate) fn cmd_pantry_list(ctrl: &Controller, json: bool) -> Result<()> {
    let pantry = ctrl.pantry();

    if json {
        println!("{}", serde_json::to_string_pretty(pantry)?);
        return Ok(());
    }
    if pantry.is_empty() {
        eprintln!("Your pantry is empty. Use `sous pantry add <name>` to stock it.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Amount")]
        amount: String,
    }

    let rows: Vec<IngredientRow> = pantry
        .iter()
        .map(|i| IngredientRow {
            id: i.id.clone(),
            name: truncate(&i.name, 40),
            amount: i.amount.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
