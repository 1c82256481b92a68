use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Shown in place of a recipe's calories when the model left them out.
pub const PLACEHOLDER_CALORIES: f64 = 450.0;

/// Author recorded on locally submitted reviews.
pub const REVIEW_USER: &str = "FoodieUser";

/// Comment attached to a star rating when none is given.
pub const DEFAULT_REVIEW_COMMENT: &str = "Loved this AI creation!";

const IMAGE_URL_PREFIX: &str = "https://picsum.photos/seed/";
const IMAGE_URL_SUFFIX: &str = "/800/600";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietaryPreferences {
    #[serde(default)]
    pub vegetarian: bool,
    #[serde(default)]
    pub vegan: bool,
    #[serde(default)]
    pub gluten_free: bool,
    #[serde(default)]
    pub keto: bool,
    #[serde(default)]
    pub paleo: bool,
    #[serde(default)]
    pub allergies: Vec<String>,
}

impl DietaryPreferences {
    #[must_use]
    pub fn get(&self, flag: PreferenceFlag) -> bool {
        match flag {
            PreferenceFlag::Vegetarian => self.vegetarian,
            PreferenceFlag::Vegan => self.vegan,
            PreferenceFlag::GlutenFree => self.gluten_free,
            PreferenceFlag::Keto => self.keto,
            PreferenceFlag::Paleo => self.paleo,
        }
    }

    /// Return a copy with `flag` set to `value`.
    #[must_use]
    pub fn with(&self, flag: PreferenceFlag, value: bool) -> Self {
        let mut next = self.clone();
        match flag {
            PreferenceFlag::Vegetarian => next.vegetarian = value,
            PreferenceFlag::Vegan => next.vegan = value,
            PreferenceFlag::GlutenFree => next.gluten_free = value,
            PreferenceFlag::Keto => next.keto = value,
            PreferenceFlag::Paleo => next.paleo = value,
        }
        next
    }

    /// Names of the flags currently switched on, in declaration order.
    #[must_use]
    pub fn active_flags(&self) -> Vec<&'static str> {
        PreferenceFlag::ALL
            .iter()
            .filter(|f| self.get(**f))
            .map(|f| f.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceFlag {
    Vegetarian,
    Vegan,
    GlutenFree,
    Keto,
    Paleo,
}

impl PreferenceFlag {
    pub const ALL: [PreferenceFlag; 5] = [
        Self::Vegetarian,
        Self::Vegan,
        Self::GlutenFree,
        Self::Keto,
        Self::Paleo,
    ];

    /// The field name used in the stored record and in prompts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::GlutenFree => "glutenFree",
            Self::Keto => "keto",
            Self::Paleo => "paleo",
        }
    }
}

impl fmt::Display for PreferenceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreferenceFlag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "vegetarian" => Ok(Self::Vegetarian),
            "vegan" => Ok(Self::Vegan),
            "glutenfree" => Ok(Self::GlutenFree),
            "keto" => Ok(Self::Keto),
            "paleo" => Ok(Self::Paleo),
            _ => bail!(
                "Unknown preference '{s}'. Must be one of: {}",
                PreferenceFlag::ALL.map(PreferenceFlag::as_str).join(", ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub cooking_time: f64,
    pub servings: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl Recipe {
    /// Calories for display; missing or zero falls back to the placeholder.
    #[must_use]
    pub fn display_calories(&self) -> f64 {
        self.calories
            .filter(|c| *c != 0.0)
            .unwrap_or(PLACEHOLDER_CALORIES)
    }
}

/// Recipe record as declared to the generation service, before the image URL
/// is attached.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub id: String,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub cooking_time: f64,
    pub servings: f64,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RecipeDraft {
    #[must_use]
    pub fn into_recipe(self) -> Recipe {
        let image_url = recipe_image_url(&self.title);
        Recipe {
            id: self.id,
            title: self.title,
            description: self.description,
            ingredients: self.ingredients,
            instructions: self.instructions,
            cooking_time: self.cooking_time,
            servings: self.servings,
            calories: self.calories,
            tags: self.tags,
            image_url,
            rating: None,
        }
    }
}

/// Deterministic placeholder image for a recipe title.
#[must_use]
pub fn recipe_image_url(title: &str) -> String {
    let seed: String = title.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{IMAGE_URL_PREFIX}{seed}{IMAGE_URL_SUFFIX}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub recipe_id: String,
    pub user: String,
    pub rating: u8,
    pub comment: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPlanDay {
    pub day: String,
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    #[serde(default)]
    pub snacks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub checked: bool,
}

/// Shopping item as declared to the generation service.
#[derive(Debug, Clone, Deserialize)]
pub struct ShoppingItemDraft {
    pub id: String,
    pub name: String,
    pub category: String,
}

impl From<ShoppingItemDraft> for ShoppingItem {
    fn from(draft: ShoppingItemDraft) -> Self {
        Self {
            id: draft.id,
            name: draft.name,
            category: draft.category,
            checked: false,
        }
    }
}

/// Group items by category, categories ordered by first appearance.
#[must_use]
pub fn group_by_category(items: &[ShoppingItem]) -> Vec<(&str, Vec<&ShoppingItem>)> {
    let mut groups: Vec<(&str, Vec<&ShoppingItem>)> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|(c, _)| *c == item.category) {
            Some((_, members)) => members.push(item),
            None => groups.push((item.category.as_str(), vec![item])),
        }
    }
    groups
}

/// Mean star rating of the reviews that reference `recipe_id`.
#[must_use]
pub fn average_rating(reviews: &[Review], recipe_id: &str) -> Option<f64> {
    let ratings: Vec<f64> = reviews
        .iter()
        .filter(|r| r.recipe_id == recipe_id)
        .map(|r| f64::from(r.rating))
        .collect();
    if ratings.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = ratings.len() as f64;
    Some(ratings.iter().sum::<f64>() / count)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Pantry,
    Recipes,
    MealPlan,
    Shopping,
}

impl View {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pantry => "pantry",
            Self::Recipes => "recipes",
            Self::MealPlan => "mealplan",
            Self::Shopping => "shopping",
        }
    }
}

impl FromStr for View {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pantry" => Ok(Self::Pantry),
            "recipes" => Ok(Self::Recipes),
            "mealplan" | "meal-plan" | "plan" => Ok(Self::MealPlan),
            "shopping" => Ok(Self::Shopping),
            _ => bail!("Invalid view '{s}'. Must be one of: pantry, recipes, mealplan, shopping"),
        }
    }
}

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub pantry: Vec<Ingredient>,
    #[serde(default)]
    pub preferences: DietaryPreferences,
    #[serde(default)]
    pub meal_plan: Vec<MealPlanDay>,
    #[serde(default)]
    pub shopping_list: Vec<ShoppingItem>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft(title: &str) -> RecipeDraft {
        RecipeDraft {
            id: "r1".to_string(),
            title: title.to_string(),
            description: "desc".to_string(),
            ingredients: vec!["egg".to_string()],
            instructions: vec!["Crack".to_string(), "Whisk".to_string()],
            cooking_time: 10.0,
            servings: 2.0,
            calories: None,
            tags: vec![],
        }
    }

    fn review(recipe_id: &str, rating: u8) -> Review {
        Review {
            id: format!("{recipe_id}-{rating}"),
            recipe_id: recipe_id.to_string(),
            user: REVIEW_USER.to_string(),
            rating,
            comment: String::new(),
            date: "2024-06-15".to_string(),
        }
    }

    #[test]
    fn test_image_url_strips_whitespace() {
        let url = recipe_image_url("Fluffy  Egg\tPancakes");
        assert_eq!(url, "https://picsum.photos/seed/FluffyEggPancakes/800/600");
    }

    #[test]
    fn test_draft_into_recipe_attaches_image_url() {
        let recipe = sample_draft("Egg Flour Crepes").into_recipe();
        assert!(recipe.image_url.contains("EggFlourCrepes"));
        assert_eq!(recipe.instructions, vec!["Crack", "Whisk"]);
        assert!(recipe.calories.is_none());
        assert!(recipe.rating.is_none());
    }

    #[test]
    fn test_display_calories_placeholder() {
        let mut recipe = sample_draft("Crepes").into_recipe();
        assert_eq!(recipe.display_calories(), PLACEHOLDER_CALORIES);
        recipe.calories = Some(0.0);
        assert_eq!(recipe.display_calories(), PLACEHOLDER_CALORIES);
        recipe.calories = Some(320.0);
        assert_eq!(recipe.display_calories(), 320.0);
    }

    #[test]
    fn test_recipe_json_uses_camel_case() {
        let recipe = sample_draft("Crepes").into_recipe();
        let json = serde_json::to_value(&recipe).unwrap();
        assert!(json.get("cookingTime").is_some());
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("calories").is_none());
    }

    #[test]
    fn test_active_flags_only_true() {
        let prefs = DietaryPreferences::default()
            .with(PreferenceFlag::Vegan, true)
            .with(PreferenceFlag::GlutenFree, true);
        assert_eq!(prefs.active_flags(), vec!["vegan", "glutenFree"]);
        assert!(DietaryPreferences::default().active_flags().is_empty());
    }

    #[test]
    fn test_preferences_with_does_not_mutate_original() {
        let prefs = DietaryPreferences::default();
        let next = prefs.with(PreferenceFlag::Keto, true);
        assert!(!prefs.keto);
        assert!(next.keto);
    }

    #[test]
    fn test_preference_flag_parse() {
        assert_eq!(
            "gluten-free".parse::<PreferenceFlag>().unwrap(),
            PreferenceFlag::GlutenFree
        );
        assert_eq!(
            "glutenFree".parse::<PreferenceFlag>().unwrap(),
            PreferenceFlag::GlutenFree
        );
        assert_eq!(
            "VEGAN".parse::<PreferenceFlag>().unwrap(),
            PreferenceFlag::Vegan
        );
        assert!("pescatarian".parse::<PreferenceFlag>().is_err());
    }

    #[test]
    fn test_preferences_serialized_field_names() {
        let json = serde_json::to_string(&DietaryPreferences::default()).unwrap();
        assert_eq!(
            json,
            r#"{"vegetarian":false,"vegan":false,"glutenFree":false,"keto":false,"paleo":false,"allergies":[]}"#
        );
    }

    #[test]
    fn test_shopping_draft_starts_unchecked() {
        let item: ShoppingItem = ShoppingItemDraft {
            id: "s1".to_string(),
            name: "Milk".to_string(),
            category: "Dairy".to_string(),
        }
        .into();
        assert!(!item.checked);
    }

    #[test]
    fn test_group_by_category_first_appearance_order() {
        let item = |id: &str, cat: &str| ShoppingItem {
            id: id.to_string(),
            name: id.to_string(),
            category: cat.to_string(),
            checked: false,
        };
        let items = vec![
            item("a", "Produce"),
            item("b", "Dairy"),
            item("c", "Produce"),
        ];
        let groups = group_by_category(&items);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "Produce");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "Dairy");
    }

    #[test]
    fn test_average_rating() {
        let reviews = vec![review("r1", 5), review("r1", 3), review("r2", 1)];
        assert_eq!(average_rating(&reviews, "r1"), Some(4.0));
        assert_eq!(average_rating(&reviews, "r2"), Some(1.0));
        assert!(average_rating(&reviews, "missing").is_none());
    }

    #[test]
    fn test_view_parse() {
        assert_eq!("plan".parse::<View>().unwrap(), View::MealPlan);
        assert_eq!("Recipes".parse::<View>().unwrap(), View::Recipes);
        assert!("settings".parse::<View>().is_err());
    }

    #[test]
    fn test_meal_plan_day_snacks_default() {
        let day: MealPlanDay = serde_json::from_str(
            r#"{"day":"Monday","breakfast":"Oats","lunch":"Salad","dinner":"Soup"}"#,
        )
        .unwrap();
        assert!(day.snacks.is_empty());
    }
}
