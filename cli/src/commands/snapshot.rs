use std::path::Path;

use anyhow::{Context, Result};

use sous_core::controller::Controller;
use sous_core::models::Snapshot;

pub(crate) fn cmd_export(ctrl: &Controller, file: &Path, json: bool) -> Result<()> {
    let data = serde_json::to_string_pretty(ctrl.snapshot())?;
    std::fs::write(file, data).with_context(|| format!("Failed to write {}", file.display()))?;

    let snapshot = ctrl.snapshot();
    if json {
        println!(
            "{}",
            serde_json::json!({
                "file": file.display().to_string(),
                "pantry": snapshot.pantry.len(),
                "mealPlan": snapshot.meal_plan.len(),
                "shoppingList": snapshot.shopping_list.len(),
                "reviews": snapshot.reviews.len(),
            })
        );
    } else {
        println!("Exported to {}", file.display());
    }
    Ok(())
}

/// Replace all persisted state with the contents of `file`.
pub(crate) fn cmd_import(ctrl: &mut Controller, file: &Path, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid sous export", file.display()))?;
    let summary = (
        snapshot.pantry.len(),
        snapshot.meal_plan.len(),
        snapshot.shopping_list.len(),
        snapshot.reviews.len(),
    );
    ctrl.restore(snapshot)?;

    if json {
        println!("{}", serde_json::to_string_pretty(ctrl.snapshot())?);
    } else {
        let (pantry, days, items, reviews) = summary;
        println!(
            "Imported {pantry} ingredients, {days} plan days, {items} shopping items, {reviews} reviews"
        );
    }
    Ok(())
}
