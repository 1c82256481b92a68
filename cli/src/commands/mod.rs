mod helpers;
mod pantry;
mod plan;
mod prefs;
mod recipes;
mod review;
mod session;
mod shopping;
mod snapshot;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use sous_core::controller::Controller;
use sous_core::generation::GenerationClient;

pub(crate) use helpers::NotFound;
pub(crate) use session::cmd_session;

use pantry::{cmd_pantry_add, cmd_pantry_list, cmd_pantry_remove};
use plan::{cmd_plan_generate, cmd_plan_show};
use prefs::{cmd_allergy_add, cmd_allergy_remove, cmd_prefs_set, cmd_prefs_show, cmd_prefs_toggle};
use recipes::{cmd_recipes_discover, cmd_recipes_list, cmd_recipes_show};
use review::{cmd_review_add, cmd_review_list};
use shopping::{cmd_shopping_export, cmd_shopping_generate, cmd_shopping_list, cmd_shopping_toggle};
use snapshot::{cmd_export, cmd_import};

/// Commands that act on the controller. Shared by the one-shot CLI and `session`.
#[derive(Subcommand)]
pub(crate) enum Action {
    /// Manage the ingredients you have on hand
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Show or change dietary preferences and allergies
    Prefs {
        #[command(subcommand)]
        command: PrefsCommands,
    },
    /// Discover and browse AI-generated recipes
    Recipes {
        #[command(subcommand)]
        command: RecipesCommands,
    },
    /// Generate or show the weekly meal plan
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Generate, view and check off the shopping list
    Shopping {
        #[command(subcommand)]
        command: ShoppingCommands,
    },
    /// Rate recipes
    Review {
        #[command(subcommand)]
        command: ReviewCommands,
    },
    /// Write all saved data to a JSON file
    Export {
        /// Destination file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace all saved data with a JSON file written by `export`
    Import {
        /// Source file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum PantryCommands {
    /// Add an ingredient
    Add {
        /// Ingredient name
        name: String,
        /// Optional free-form amount (e.g. "2 cups")
        #[arg(short, long)]
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient by ID
    Remove {
        /// Ingredient ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List pantry contents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum PrefsCommands {
    /// Show current preferences
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a flag: vegetarian, vegan, gluten-free, keto, paleo
    Set {
        /// Preference flag
        flag: String,
        /// on or off
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip a flag
    Toggle {
        /// Preference flag
        flag: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage allergies
    Allergy {
        #[command(subcommand)]
        command: AllergyCommands,
    },
}

#[derive(Subcommand)]
pub(crate) enum AllergyCommands {
    /// Add an allergy
    Add {
        /// Allergen name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an allergy
    Remove {
        /// Allergen name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum RecipesCommands {
    /// Generate recipes from the pantry, preferences and recent reviews
    Discover {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the current recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with its reviews
    Show {
        /// Recipe ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum PlanCommands {
    /// Generate a 7-day plan from your preferences
    Generate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the saved plan
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum ShoppingCommands {
    /// Build a shopping list for the current recipes
    Generate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the list grouped by category
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check or uncheck an item
    Toggle {
        /// Item ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the list as CSV (stdout by default)
    Export {
        /// Destination file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub(crate) enum ReviewCommands {
    /// Rate a recipe
    Add {
        /// Recipe ID
        recipe_id: String,
        /// Stars, 1-5
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
        /// Comment text
        #[arg(short, long)]
        comment: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List reviews, most recent first
    List {
        /// Only reviews for this recipe ID
        #[arg(long)]
        recipe: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub(crate) async fn dispatch(
    ctrl: &mut Controller,
    client: &dyn GenerationClient,
    action: Action,
) -> Result<()> {
    match action {
        Action::Pantry { command } => match command {
            PantryCommands::Add { name, amount, json } => {
                cmd_pantry_add(ctrl, &name, amount.as_deref(), json)
            }
            PantryCommands::Remove { id, json } => cmd_pantry_remove(ctrl, &id, json),
            PantryCommands::List { json } => cmd_pantry_list(ctrl, json),
        },
        Action::Prefs { command } => match command {
            PrefsCommands::Show { json } => cmd_prefs_show(ctrl, json),
            PrefsCommands::Set { flag, value, json } => cmd_prefs_set(ctrl, &flag, &value, json),
            PrefsCommands::Toggle { flag, json } => cmd_prefs_toggle(ctrl, &flag, json),
            PrefsCommands::Allergy { command } => match command {
                AllergyCommands::Add { name, json } => cmd_allergy_add(ctrl, &name, json),
                AllergyCommands::Remove { name, json } => cmd_allergy_remove(ctrl, &name, json),
            },
        },
        Action::Recipes { command } => match command {
            RecipesCommands::Discover { json } => cmd_recipes_discover(ctrl, client, json).await,
            RecipesCommands::List { json } => cmd_recipes_list(ctrl, json),
            RecipesCommands::Show { id, json } => cmd_recipes_show(ctrl, &id, json),
        },
        Action::Plan { command } => match command {
            PlanCommands::Generate { json } => cmd_plan_generate(ctrl, client, json).await,
            PlanCommands::Show { json } => cmd_plan_show(ctrl, json),
        },
        Action::Shopping { command } => match command {
            ShoppingCommands::Generate { json } => {
                cmd_shopping_generate(ctrl, client, json).await
            }
            ShoppingCommands::List { json } => cmd_shopping_list(ctrl, json),
            ShoppingCommands::Toggle { id, json } => cmd_shopping_toggle(ctrl, &id, json),
            ShoppingCommands::Export { output } => cmd_shopping_export(ctrl, output.as_deref()),
        },
        Action::Review { command } => match command {
            ReviewCommands::Add {
                recipe_id,
                rating,
                comment,
                json,
            } => cmd_review_add(ctrl, &recipe_id, rating, comment.as_deref(), json),
            ReviewCommands::List { recipe, json } => {
                cmd_review_list(ctrl, recipe.as_deref(), json)
            }
        },
        Action::Export { file, json } => cmd_export(ctrl, &file, json),
        Action::Import { file, json } => cmd_import(ctrl, &file, json),
    }
}
