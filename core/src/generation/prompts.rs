use anyhow::Result;

use crate::models::DietaryPreferences;

/// How many recipes a discovery asks for.
pub const RECIPE_COUNT: usize = 3;

pub fn recipes_prompt(
    ingredients: &[String],
    preferences: &DietaryPreferences,
    review_context: &[String],
) -> String {
    let ingredients = ingredients.join(", ");
    let restrictions = preferences.active_flags().join(", ");
    let allergies = preferences.allergies.join(", ");
    let reviews = review_context.join("; ");
    format!(
        "Generate {RECIPE_COUNT} high-quality recipes based strictly on these ingredients: {ingredients}.\n\
         Dietary Restrictions: {restrictions}.\n\
         Allergies: {allergies}.\n\
         Context from user reviews: {reviews}.\n\
         Make sure recipes are creative and professional."
    )
}

pub fn meal_plan_prompt(preferences: &DietaryPreferences) -> Result<String> {
    let preferences = serde_json::to_string(preferences)?;
    Ok(format!(
        "Generate a 7-day meal plan based on these dietary preferences: {preferences}.\n\
         Return exactly 7 days (Monday through Sunday). Each day should have a breakfast, lunch, and dinner title."
    ))
}

pub fn shopping_list_prompt(recipe_titles: &[String]) -> String {
    let titles = recipe_titles.join(", ");
    format!(
        "Based on these recipes: {titles}, create a consolidated grocery shopping list. \
         Categorize items (e.g., Produce, Dairy, Pantry)."
    )
}
