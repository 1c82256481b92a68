use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use sous_core::controller::{Controller, Operation, Outcome};
use sous_core::generation::GenerationClient;
use sous_core::models::{Recipe, Review, average_rating};

use super::helpers::{not_found, report_outcome, truncate};

pub(crate) async fn cmd_recipes_discover(
    ctrl: &mut Controller,
    client: &dyn GenerationClient,
    json: bool,
) -> Result<()> {
    if !json {
        eprintln!("Asking the chef for ideas...");
    }
    let outcome = ctrl.discover_recipes(client).await?;
    report_outcome(ctrl, Operation::Recipes, outcome, ctrl.recipes(), json)?;
    if !json && matches!(outcome, Outcome::Completed { .. }) {
        print_recipe_table(ctrl.recipes(), ctrl.reviews());
    }
    Ok(())
}

pub(crate) fn cmd_recipes_list(ctrl: &Controller, json: bool) -> Result<()> {
    let recipes = ctrl.recipes();
    if json {
        println!("{}", serde_json::to_string_pretty(recipes)?);
    } else if recipes.is_empty() {
        eprintln!("No recipes yet. Use `recipes discover` to generate some from your pantry.");
    } else {
        print_recipe_table(recipes, ctrl.reviews());
    }
    Ok(())
}

pub(crate) fn cmd_recipes_show(ctrl: &mut Controller, id: &str, json: bool) -> Result<()> {
    ctrl.select_recipe(Some(id));
    let Some(recipe) = ctrl.selected_recipe() else {
        return Err(not_found(&format!("No recipe with id '{id}'"), json));
    };
    let reviews = ctrl.reviews_for(id);

    if json {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RecipeDetail<'a> {
            #[serde(flatten)]
            recipe: &'a Recipe,
            average_rating: Option<f64>,
            reviews: &'a [&'a Review],
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&RecipeDetail {
                recipe,
                average_rating: average_rating(ctrl.reviews(), id),
                reviews: &reviews,
            })?
        );
        return Ok(());
    }

    println!("{}", recipe.title);
    println!("{}", recipe.description);
    println!(
        "\n  {} min | {} servings | {} kcal",
        recipe.cooking_time,
        recipe.servings,
        recipe.display_calories()
    );
    if !recipe.tags.is_empty() {
        println!("  Tags: {}", recipe.tags.join(", "));
    }
    println!("  Image: {}", recipe.image_url);

    println!("\nIngredients:");
    for ingredient in &recipe.ingredients {
        println!("  - {ingredient}");
    }
    println!("\nInstructions:");
    for (i, step) in recipe.instructions.iter().enumerate() {
        println!("  {}. {step}", i + 1);
    }

    println!("\nReviews:");
    if reviews.is_empty() {
        println!("  No reviews yet.");
    } else {
        if let Some(avg) = average_rating(ctrl.reviews(), id) {
            println!("  Average: {avg:.1} / 5");
        }
        for review in reviews {
            println!(
                "  {} {} ({}, {})",
                stars(review.rating),
                review.comment,
                review.user,
                review.date
            );
        }
    }
    Ok(())
}

pub(crate) fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "*".repeat(filled), ".".repeat(5 - filled))
}

fn print_recipe_table(recipes: &[Recipe], reviews: &[Review]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Time (min)")]
        time: String,
        #[tabled(rename = "Servings")]
        servings: String,
        #[tabled(rename = "Kcal")]
        calories: String,
        #[tabled(rename = "Rating")]
        rating: String,
        #[tabled(rename = "Tags")]
        tags: String,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id.clone(),
            title: truncate(&r.title, 35),
            time: format!("{}", r.cooking_time),
            servings: format!("{}", r.servings),
            calories: format!("{:.0}", r.display_calories()),
            rating: average_rating(reviews, &r.id).map_or("-".into(), |v| format!("{v:.1}")),
            tags: truncate(&r.tags.join(", "), 25),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
