use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use sous_core::controller::Controller;
use sous_core::models::{DEFAULT_REVIEW_COMMENT, Review};

use super::helpers::truncate;
use super::recipes::stars;

pub(crate) fn cmd_review_add(
    ctrl: &mut Controller,
    recipe_id: &str,
    rating: u8,
    comment: Option<&str>,
    json: bool,
) -> Result<()> {
    if ctrl.recipe(recipe_id).is_none() {
        tracing::debug!(recipe_id, "review for a recipe outside the current set");
    }
    let review = ctrl.add_review(recipe_id, rating, comment.unwrap_or(DEFAULT_REVIEW_COMMENT))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&review)?);
    } else {
        println!(
            "Saved {} review for {}: {}",
            stars(review.rating),
            review.recipe_id,
            review.comment
        );
    }
    Ok(())
}

pub(crate) fn cmd_review_list(ctrl: &Controller, recipe: Option<&str>, json: bool) -> Result<()> {
    let reviews: Vec<&Review> = match recipe {
        Some(id) => ctrl.reviews_for(id),
        None => ctrl.reviews().iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reviews)?);
        return Ok(());
    }
    if reviews.is_empty() {
        eprintln!("No reviews yet.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct ReviewRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "Rating")]
        rating: String,
        #[tabled(rename = "Comment")]
        comment: String,
    }

    let rows: Vec<ReviewRow> = reviews
        .iter()
        .map(|r| ReviewRow {
            date: r.date.clone(),
            recipe: ctrl
                .recipe(&r.recipe_id)
                .map_or_else(|| r.recipe_id.clone(), |rec| truncate(&rec.title, 30)),
            rating: stars(r.rating),
            comment: truncate(&r.comment, 50),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
