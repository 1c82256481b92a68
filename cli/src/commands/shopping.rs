use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use sous_core::controller::{Controller, Operation, Outcome};
use sous_core::generation::GenerationClient;
use sous_core::models::{ShoppingItem, group_by_category};

use super::helpers::{not_found, report_outcome};

pub(crate) async fn cmd_shopping_generate(
    ctrl: &mut Controller,
    client: &dyn GenerationClient,
    json: bool,
) -> Result<()> {
    let outcome = ctrl.generate_shopping_list(client).await?;
    report_outcome(ctrl, Operation::ShoppingList, outcome, ctrl.shopping_list(), json)?;
    match outcome {
        Outcome::Completed { .. } if !json => print_grouped(ctrl.shopping_list()),
        Outcome::Skipped if !json => eprintln!(
            "No recipes to shop for. Run `recipes discover` first (recipes last for one session)."
        ),
        _ => {}
    }
    Ok(())
}

pub(crate) fn cmd_shopping_list(ctrl: &Controller, json: bool) -> Result<()> {
    let items = ctrl.shopping_list();
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else if items.is_empty() {
        eprintln!("Your shopping list is empty.");
    } else {
        print_grouped(items);
    }
    Ok(())
}

pub(crate) fn cmd_shopping_toggle(ctrl: &mut Controller, id: &str, json: bool) -> Result<()> {
    let Some(checked) = ctrl.toggle_shopping_item(id)? else {
        return Err(not_found(&format!("No shopping item with id '{id}'"), json));
    };
    if json {
        println!("{}", serde_json::json!({ "id": id, "checked": checked }));
    } else {
        let state = if checked { "checked" } else { "unchecked" };
        println!("Item {id} {state}");
    }
    Ok(())
}

pub(crate) fn cmd_shopping_export(ctrl: &Controller, output: Option<&Path>) -> Result<()> {
    let items = ctrl.shopping_list();
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_csv(items, file)?;
            eprintln!("Exported {} items to {}", items.len(), path.display());
        }
        None => write_csv(items, std::io::stdout().lock())?,
    }
    Ok(())
}

#[derive(Serialize)]
struct CsvRow<'a> {
    category: &'a str,
    name: &'a str,
    checked: bool,
}

fn write_csv<W: Write>(items: &[ShoppingItem], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (category, members) in group_by_category(items) {
        for item in members {
            wtr.serialize(CsvRow {
                category,
                name: &item.name,
                checked: item.checked,
            })
            .context("Failed to write CSV row")?;
        }
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

fn print_grouped(items: &[ShoppingItem]) {
    for (category, members) in group_by_category(items) {
        println!("{category}");
        for item in members {
            let mark = if item.checked { "x" } else { " " };
            println!("  [{mark}] {}  ({})", item.name, item.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str, category: &str, checked: bool) -> ShoppingItem {
        ShoppingItem {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            checked,
        }
    }

    #[test]
    fn test_write_csv_groups_by_category() {
        let items = vec![
            item("1", "Eggs", "Dairy", false),
            item("2", "Basil", "Produce", true),
            item("3", "Milk, whole", "Dairy", false),
        ];
        let mut out = Vec::new();
        write_csv(&items, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "category,name,checked\n\
             Dairy,Eggs,false\n\
             Dairy,\"Milk, whole\",false\n\
             Produce,Basil,true\n"
        );
    }

    #[test]
    fn test_write_csv_empty() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert!(out.is_empty());
    }
}
