use std::collections::HashSet;

use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::generation::{GenerationClient, GenerationError};
use crate::models::{
    DietaryPreferences, Ingredient, MealPlanDay, PreferenceFlag, Recipe, REVIEW_USER, Review,
    ShoppingItem, Snapshot, View,
};
use crate::store::SnapshotStore;

pub const EMPTY_PANTRY_MESSAGE: &str = "Add some ingredients to your pantry first!";
pub const RECIPES_FAILED_MESSAGE: &str = "Failed to generate recipes. Please check your API key.";
pub const MEAL_PLAN_FAILED_MESSAGE: &str = "Failed to generate meal plan.";
pub const SHOPPING_LIST_FAILED_MESSAGE: &str = "Failed to generate shopping list.";

/// How many recent reviews are fed back into the recipe prompt.
pub const REVIEW_CONTEXT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Recipes,
    MealPlan,
    ShoppingList,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Self::Recipes, Self::MealPlan, Self::ShoppingList];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recipes => "recipes",
            Self::MealPlan => "meal_plan",
            Self::ShoppingList => "shopping_list",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Self::Recipes => RECIPES_FAILED_MESSAGE,
            Self::MealPlan => MEAL_PLAN_FAILED_MESSAGE,
            Self::ShoppingList => SHOPPING_LIST_FAILED_MESSAGE,
        }
    }
}

impl std::str::FromStr for Operation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "recipes" => Ok(Self::Recipes),
            "meal_plan" => Ok(Self::MealPlan),
            "shopping_list" => Ok(Self::ShoppingList),
            _ => anyhow::bail!(
                "Invalid operation '{s}'. Must be one of: recipes, meal_plan, shopping_list"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationStatus {
    pub pending: bool,
    pub error: Option<String>,
}

/// One independent status record per generation operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusBoard {
    pub recipes: OperationStatus,
    pub meal_plan: OperationStatus,
    pub shopping_list: OperationStatus,
}

impl StatusBoard {
    #[must_use]
    pub fn get(&self, op: Operation) -> &OperationStatus {
        match op {
            Operation::Recipes => &self.recipes,
            Operation::MealPlan => &self.meal_plan,
            Operation::ShoppingList => &self.shopping_list,
        }
    }

    fn get_mut(&mut self, op: Operation) -> &mut OperationStatus {
        match op {
            Operation::Recipes => &mut self.recipes,
            Operation::MealPlan => &mut self.meal_plan,
            Operation::ShoppingList => &mut self.shopping_list,
        }
    }
}

/// What happened when a generation operation was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    /// Collection replaced with `count` new entries.
    Completed { count: usize },
    /// A precondition failed; a validation message was reported.
    Rejected,
    /// A precondition failed silently; nothing was reported.
    Skipped,
    /// The call failed; the operation's fixed message was reported.
    Failed,
}

/// Inputs captured by `begin_recipe_discovery`.
#[derive(Debug, Clone)]
pub struct RecipeRequest {
    pub ingredients: Vec<String>,
    pub preferences: DietaryPreferences,
    pub review_context: Vec<String>,
}

/// Owns all in-memory state and mirrors the persisted part to a store.
pub struct Controller {
    store: Box<dyn SnapshotStore>,
    state: Snapshot,
    recipes: Vec<Recipe>,
    view: View,
    selected_recipe: Option<String>,
    status: StatusBoard,
}

impl Controller {
    pub fn new(store: Box<dyn SnapshotStore>) -> Result<Self> {
        let state = store.load()?;
        Ok(Self {
            store,
            state,
            recipes: Vec::new(),
            view: View::default(),
            selected_recipe: None,
            status: StatusBoard::default(),
        })
    }

    /// Save `next` and adopt it as the current state. On a failed write the
    /// in-memory state is left as it was.
    fn commit(&mut self, next: Snapshot) -> Result<()> {
        self.store.save(&next)?;
        self.state = next;
        Ok(())
    }

    /// Commit the result of a generation operation, clearing `pending` either way.
    fn commit_result(&mut self, op: Operation, next: Snapshot, count: usize) -> Result<()> {
        if let Err(e) = self.commit(next) {
            self.status.get_mut(op).pending = false;
            return Err(e);
        }
        self.succeed(op, count);
        Ok(())
    }

    // --- Read access ---

    #[must_use]
    pub fn pantry(&self) -> &[Ingredient] {
        &self.state.pantry
    }

    #[must_use]
    pub fn preferences(&self) -> &DietaryPreferences {
        &self.state.preferences
    }

    #[must_use]
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    #[must_use]
    pub fn recipe(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn meal_plan(&self) -> &[MealPlanDay] {
        &self.state.meal_plan
    }

    #[must_use]
    pub fn shopping_list(&self) -> &[ShoppingItem] {
        &self.state.shopping_list
    }

    #[must_use]
    pub fn reviews(&self) -> &[Review] {
        &self.state.reviews
    }

    /// Reviews referencing `recipe_id`, most recent first.
    #[must_use]
    pub fn reviews_for(&self, recipe_id: &str) -> Vec<&Review> {
        self.state
            .reviews
            .iter()
            .filter(|r| r.recipe_id == recipe_id)
            .collect()
    }

    #[must_use]
    pub fn view(&self) -> View {
        self.view
    }

    #[must_use]
    pub fn selected_recipe(&self) -> Option<&Recipe> {
        self.selected_recipe.as_deref().and_then(|id| self.recipe(id))
    }

    #[must_use]
    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.state
    }

    // --- Pantry ---

    /// Append an ingredient. Blank names are ignored and return `None`.
    pub fn add_ingredient(&mut self, name: &str, amount: Option<&str>) -> Result<Option<Ingredient>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let ingredient = Ingredient {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            amount: amount
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from),
        };
        let mut next = self.state.clone();
        next.pantry.push(ingredient.clone());
        self.commit(next)?;
        Ok(Some(ingredient))
    }

    pub fn remove_ingredient(&mut self, id: &str) -> Result<bool> {
        if !self.state.pantry.iter().any(|i| i.id == id) {
            return Ok(false);
        }
        let mut next = self.state.clone();
        next.pantry.retain(|i| i.id != id);
        self.commit(next)?;
        Ok(true)
    }

    // --- Preferences ---

    /// Replace the preference record. Allergies are trimmed, blanks dropped
    /// and case-insensitive duplicates collapsed to their first spelling.
    pub fn set_preferences(&mut self, mut preferences: DietaryPreferences) -> Result<()> {
        preferences.allergies = normalize_allergies(preferences.allergies);
        let next = Snapshot {
            preferences,
            ..self.state.clone()
        };
        self.commit(next)
    }

    pub fn set_preference(&mut self, flag: PreferenceFlag, value: bool) -> Result<()> {
        let next = self.state.preferences.with(flag, value);
        self.set_preferences(next)
    }

    /// Flip a flag and return its new value.
    pub fn toggle_preference(&mut self, flag: PreferenceFlag) -> Result<bool> {
        let value = !self.state.preferences.get(flag);
        self.set_preference(flag, value)?;
        Ok(value)
    }

    /// Add an allergy. Blank or already-listed (case-insensitive) names are ignored.
    pub fn add_allergy(&mut self, name: &str) -> Result<bool> {
        let name = name.trim();
        let key = name.to_lowercase();
        if name.is_empty()
            || self
                .state
                .preferences
                .allergies
                .iter()
                .any(|a| a.to_lowercase() == key)
        {
            return Ok(false);
        }
        let mut next = self.state.preferences.clone();
        next.allergies.push(name.to_string());
        self.set_preferences(next)?;
        Ok(true)
    }

    pub fn remove_allergy(&mut self, name: &str) -> Result<bool> {
        let key = name.trim().to_lowercase();
        let mut next = self.state.preferences.clone();
        next.allergies.retain(|a| a.to_lowercase() != key);
        if next.allergies.len() == self.state.preferences.allergies.len() {
            return Ok(false);
        }
        self.set_preferences(next)?;
        Ok(true)
    }

    // --- Status ---

    fn start(&mut self, op: Operation) {
        let status = self.status.get_mut(op);
        if status.pending {
            debug!(operation = op.as_str(), "operation already pending");
        }
        status.pending = true;
        status.error = None;
    }

    fn fail(&mut self, op: Operation, err: &GenerationError) {
        warn!(operation = op.as_str(), error = %err, "generation failed");
        let status = self.status.get_mut(op);
        status.pending = false;
        status.error = Some(op.failure_message().to_string());
    }

    fn succeed(&mut self, op: Operation, count: usize) {
        info!(operation = op.as_str(), count, "generation completed");
        self.status.get_mut(op).pending = false;
    }

    pub fn dismiss_error(&mut self, op: Operation) {
        self.status.get_mut(op).error = None;
    }

    pub fn dismiss_errors(&mut self) {
        for op in Operation::ALL {
            self.dismiss_error(op);
        }
    }

    // --- Recipe discovery ---

    /// Check the precondition and mark discovery pending.
    ///
    /// Returns `None` when the pantry is empty; the validation message is then
    /// set on the recipes status.
    pub fn begin_recipe_discovery(&mut self) -> Option<RecipeRequest> {
        if self.state.pantry.is_empty() {
            self.status.recipes.error = Some(EMPTY_PANTRY_MESSAGE.to_string());
            return None;
        }
        self.start(Operation::Recipes);
        let review_context = self
            .state
            .reviews
            .iter()
            .take(REVIEW_CONTEXT_LIMIT)
            .map(|r| format!("{} stars: {}", r.rating, r.comment))
            .collect();
        Some(RecipeRequest {
            ingredients: self.state.pantry.iter().map(|i| i.name.clone()).collect(),
            preferences: self.state.preferences.clone(),
            review_context,
        })
    }

    pub fn finish_recipe_discovery(
        &mut self,
        result: Result<Vec<Recipe>, GenerationError>,
    ) -> Result<Outcome> {
        match result {
            Ok(recipes) => {
                let count = recipes.len();
                self.recipes = recipes;
                self.selected_recipe = None;
                self.view = View::Recipes;
                self.succeed(Operation::Recipes, count);
                Ok(Outcome::Completed { count })
            }
            Err(e) => {
                self.fail(Operation::Recipes, &e);
                Ok(Outcome::Failed)
            }
        }
    }

    pub async fn discover_recipes(&mut self, client: &dyn GenerationClient) -> Result<Outcome> {
        let Some(request) = self.begin_recipe_discovery() else {
            return Ok(Outcome::Rejected);
        };
        let result = client
            .generate_recipes(
                &request.ingredients,
                &request.preferences,
                &request.review_context,
            )
            .await;
        self.finish_recipe_discovery(result)
    }

    // --- Meal plan ---

    pub fn begin_meal_plan(&mut self) -> DietaryPreferences {
        self.start(Operation::MealPlan);
        self.state.preferences.clone()
    }

    pub fn finish_meal_plan(
        &mut self,
        result: Result<Vec<MealPlanDay>, GenerationError>,
    ) -> Result<Outcome> {
        match result {
            Ok(days) => {
                let count = days.len();
                let next = Snapshot {
                    meal_plan: days,
                    ..self.state.clone()
                };
                self.commit_result(Operation::MealPlan, next, count)?;
                Ok(Outcome::Completed { count })
            }
            Err(e) => {
                self.fail(Operation::MealPlan, &e);
                Ok(Outcome::Failed)
            }
        }
    }

    pub async fn generate_meal_plan(&mut self, client: &dyn GenerationClient) -> Result<Outcome> {
        let preferences = self.begin_meal_plan();
        let result = client.generate_meal_plan(&preferences).await;
        self.finish_meal_plan(result)
    }

    // --- Shopping list ---

    /// Returns the recipe titles to shop for, or `None` when there are no
    /// recipes (no status change in that case).
    pub fn begin_shopping_list(&mut self) -> Option<Vec<String>> {
        if self.recipes.is_empty() {
            return None;
        }
        self.start(Operation::ShoppingList);
        Some(self.recipes.iter().map(|r| r.title.clone()).collect())
    }

    pub fn finish_shopping_list(
        &mut self,
        result: Result<Vec<ShoppingItem>, GenerationError>,
    ) -> Result<Outcome> {
        match result {
            Ok(items) => {
                let count = items.len();
                let next = Snapshot {
                    shopping_list: items,
                    ..self.state.clone()
                };
                self.commit_result(Operation::ShoppingList, next, count)?;
                self.view = View::Shopping;
                Ok(Outcome::Completed { count })
            }
            Err(e) => {
                self.fail(Operation::ShoppingList, &e);
                Ok(Outcome::Failed)
            }
        }
    }

    pub async fn generate_shopping_list(
        &mut self,
        client: &dyn GenerationClient,
    ) -> Result<Outcome> {
        let Some(titles) = self.begin_shopping_list() else {
            return Ok(Outcome::Skipped);
        };
        let result = client.generate_shopping_list(&titles).await;
        self.finish_shopping_list(result)
    }

    /// Flip one item's checked flag. Returns the item's new state, or `None`
    /// if no item has that id.
    pub fn toggle_shopping_item(&mut self, id: &str) -> Result<Option<bool>> {
        let Some(item) = self.state.shopping_list.iter().find(|i| i.id == id) else {
            return Ok(None);
        };
        let checked = !item.checked;
        let shopping_list = self
            .state
            .shopping_list
            .iter()
            .map(|i| {
                if i.id == id {
                    ShoppingItem {
                        checked,
                        ..i.clone()
                    }
                } else {
                    i.clone()
                }
            })
            .collect();
        let next = Snapshot {
            shopping_list,
            ..self.state.clone()
        };
        self.commit(next)?;
        Ok(Some(checked))
    }

    // --- Reviews ---

    /// Prepend a review. The rating is stored as given.
    pub fn add_review(&mut self, recipe_id: &str, rating: u8, comment: &str) -> Result<Review> {
        let review = Review {
            id: Uuid::new_v4().to_string(),
            recipe_id: recipe_id.to_string(),
            user: REVIEW_USER.to_string(),
            rating,
            comment: comment.to_string(),
            date: Local::now().format("%Y-%m-%d").to_string(),
        };
        let mut next = self.state.clone();
        next.reviews.insert(0, review.clone());
        self.commit(next)?;
        Ok(review)
    }

    // --- Presentation ---

    pub fn select_view(&mut self, view: View) {
        self.view = view;
    }

    /// Open a recipe's detail. Returns false if the id is not in the current set.
    pub fn select_recipe(&mut self, id: Option<&str>) -> bool {
        match id {
            None => {
                self.selected_recipe = None;
                true
            }
            Some(id) if self.recipe(id).is_some() => {
                self.selected_recipe = Some(id.to_string());
                true
            }
            Some(_) => false,
        }
    }

    // --- Backup ---

    /// Replace all persisted collections at once.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<()> {
        self.commit(snapshot)
    }
}

fn normalize_allergies(allergies: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    allergies
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty() && seen.insert(a.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{FakeService, StructuredClient};
    use crate::models::Snapshot;
    use crate::store::MemoryStore;

    const THREE_RECIPES: &str = r#"[
        {"id": "r1", "title": "Egg Flour Crepes", "description": "Thin pancakes",
         "ingredients": ["egg", "flour"], "instructions": ["Mix", "Fry"],
         "cookingTime": 15, "servings": 2},
        {"id": "r2", "title": "Fresh  Pasta", "description": "Egg pasta",
         "ingredients": ["egg", "flour"], "instructions": ["Knead", "Roll", "Cut"],
         "cookingTime": 40, "servings": 4, "calories": 380},
        {"id": "r3", "title": "Dumplings", "description": "Soft dumplings",
         "ingredients": ["egg", "flour", "water"], "instructions": ["Mix", "Boil"],
         "cookingTime": 25, "servings": 3, "tags": ["comfort"]}
    ]"#;

    const WEEK: &str = r#"[
        {"day": "Monday", "breakfast": "Oats", "lunch": "Salad", "dinner": "Soup"},
        {"day": "Tuesday", "breakfast": "Toast", "lunch": "Wrap", "dinner": "Stew"},
        {"day": "Wednesday", "breakfast": "Eggs", "lunch": "Bowl", "dinner": "Curry"},
        {"day": "Thursday", "breakfast": "Yogurt", "lunch": "Soup", "dinner": "Pasta"},
        {"day": "Friday", "breakfast": "Smoothie", "lunch": "Sandwich", "dinner": "Pizza"},
        {"day": "Saturday", "breakfast": "Pancakes", "lunch": "Tacos", "dinner": "Risotto"},
        {"day": "Sunday", "breakfast": "Waffles", "lunch": "Quiche", "dinner": "Roast"}
    ]"#;

    const ITEMS: &str = r#"[
        {"id": "s1", "name": "Eggs", "category": "Dairy"},
        {"id": "s2", "name": "Flour", "category": "Pantry"},
        {"id": "s3", "name": "Parsley", "category": "Produce"}
    ]"#;

    fn client() -> StructuredClient<FakeService> {
        let service = FakeService::with_response("recipes", THREE_RECIPES);
        service.add_response("meal_plan", WEEK);
        service.add_response("shopping_list", ITEMS);
        StructuredClient::new(service)
    }

    fn controller() -> (Controller, MemoryStore) {
        let store = MemoryStore::new();
        let ctrl = Controller::new(Box::new(store.clone())).unwrap();
        (ctrl, store)
    }

    /// Loads an empty snapshot and refuses every write.
    struct FailingStore;

    impl SnapshotStore for FailingStore {
        fn load(&self) -> Result<Snapshot> {
            Ok(Snapshot::default())
        }

        fn save(&self, _snapshot: &Snapshot) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn stocked() -> (Controller, MemoryStore) {
        let (mut ctrl, store) = controller();
        ctrl.add_ingredient("egg", None).unwrap();
        ctrl.add_ingredient("flour", None).unwrap();
        (ctrl, store)
    }

    #[test]
    fn test_add_ingredient_trims() {
        let (mut ctrl, store) = controller();
        let added = ctrl.add_ingredient("  chicken breast ", Some(" 2 ")).unwrap().unwrap();
        assert_eq!(added.name, "chicken breast");
        assert_eq!(added.amount.as_deref(), Some("2"));
        assert_eq!(ctrl.pantry().len(), 1);
        assert_eq!(store.stored().unwrap().pantry, ctrl.pantry());
    }

    #[test]
    fn test_add_blank_ingredient_is_noop() {
        let (mut ctrl, store) = controller();
        assert!(ctrl.add_ingredient("", None).unwrap().is_none());
        assert!(ctrl.add_ingredient("   \t", None).unwrap().is_none());
        assert!(ctrl.pantry().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_ingredient_ids_unique() {
        let (ctrl, _) = stocked();
        assert_ne!(ctrl.pantry()[0].id, ctrl.pantry()[1].id);
    }

    #[test]
    fn test_remove_ingredient_only_match() {
        let (mut ctrl, _) = stocked();
        ctrl.add_ingredient("milk", None).unwrap();
        let id = ctrl.pantry()[1].id.clone();
        assert!(ctrl.remove_ingredient(&id).unwrap());
        let names: Vec<&str> = ctrl.pantry().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["egg", "milk"]);
    }

    #[test]
    fn test_remove_missing_ingredient_is_noop() {
        let (mut ctrl, store) = stocked();
        let saves = store.save_count();
        assert!(!ctrl.remove_ingredient("missing").unwrap());
        assert_eq!(ctrl.pantry().len(), 2);
        assert_eq!(store.save_count(), saves);
    }

    #[test]
    fn test_toggle_preference_persists() {
        let (mut ctrl, store) = controller();
        assert!(ctrl.toggle_preference(PreferenceFlag::Vegan).unwrap());
        assert!(ctrl.preferences().vegan);
        assert!(store.stored().unwrap().preferences.vegan);
        assert!(!ctrl.toggle_preference(PreferenceFlag::Vegan).unwrap());
        assert!(!ctrl.preferences().vegan);
    }

    #[test]
    fn test_allergies_dedup_and_remove() {
        let (mut ctrl, _) = controller();
        assert!(ctrl.add_allergy("Peanuts").unwrap());
        assert!(!ctrl.add_allergy("peanuts").unwrap());
        assert!(!ctrl.add_allergy("  ").unwrap());
        assert!(ctrl.add_allergy("soy").unwrap());
        assert_eq!(ctrl.preferences().allergies, vec!["Peanuts", "soy"]);
        assert!(ctrl.remove_allergy("PEANUTS").unwrap());
        assert!(!ctrl.remove_allergy("gluten").unwrap());
        assert_eq!(ctrl.preferences().allergies, vec!["soy"]);
    }

    #[test]
    fn test_allergies_dedup_non_ascii() {
        let (mut ctrl, _) = controller();
        assert!(ctrl.add_allergy("Ärtor").unwrap());
        assert!(!ctrl.add_allergy("ärtor").unwrap());
        assert!(ctrl.remove_allergy("ÄRTOR").unwrap());
        assert!(ctrl.preferences().allergies.is_empty());
    }

    #[test]
    fn test_set_preferences_normalizes_allergies() {
        let (mut ctrl, store) = controller();
        let prefs = DietaryPreferences {
            allergies: vec![
                " Peanuts ".to_string(),
                String::new(),
                "peanuts".to_string(),
                "  ".to_string(),
                "Soy".to_string(),
            ],
            ..DietaryPreferences::default()
        };
        ctrl.set_preferences(prefs).unwrap();
        assert_eq!(ctrl.preferences().allergies, vec!["Peanuts", "Soy"]);
        assert_eq!(store.stored().unwrap().preferences.allergies, vec!["Peanuts", "Soy"]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let mut ctrl = Controller::new(Box::new(FailingStore)).unwrap();
        assert!(ctrl.add_ingredient("egg", None).is_err());
        assert!(ctrl.pantry().is_empty());

        assert!(ctrl.toggle_preference(PreferenceFlag::Vegan).is_err());
        assert!(!ctrl.preferences().vegan);
        assert!(ctrl.add_allergy("soy").is_err());
        assert!(ctrl.preferences().allergies.is_empty());

        assert!(ctrl.add_review("r1", 5, "Great").is_err());
        assert!(ctrl.reviews().is_empty());

        let client = client();
        assert!(ctrl.generate_meal_plan(&client).await.is_err());
        assert!(ctrl.meal_plan().is_empty());
        assert!(!ctrl.status().meal_plan.pending);
        assert!(ctrl.status().meal_plan.error.is_none());

        let restored = Snapshot {
            reviews: vec![Review {
                id: "v1".to_string(),
                recipe_id: "r1".to_string(),
                user: REVIEW_USER.to_string(),
                rating: 3,
                comment: String::new(),
                date: "2024-06-15".to_string(),
            }],
            ..Snapshot::default()
        };
        assert!(ctrl.restore(restored).is_err());
        assert_eq!(ctrl.snapshot(), &Snapshot::default());
    }

    #[tokio::test]
    async fn test_failed_shopping_write_keeps_view() {
        let mut ctrl = Controller::new(Box::new(FailingStore)).unwrap();
        let recipes = vec![
            crate::models::RecipeDraft {
                id: "r1".to_string(),
                title: "Crepes".to_string(),
                description: String::new(),
                ingredients: vec!["egg".to_string()],
                instructions: vec![],
                cooking_time: 10.0,
                servings: 2.0,
                calories: None,
                tags: vec![],
            }
            .into_recipe(),
        ];
        ctrl.finish_recipe_discovery(Ok(recipes)).unwrap();
        assert_eq!(ctrl.view(), View::Recipes);

        assert!(ctrl.generate_shopping_list(&client()).await.is_err());
        assert!(ctrl.shopping_list().is_empty());
        assert!(!ctrl.status().shopping_list.pending);
        assert_eq!(ctrl.view(), View::Recipes);
    }

    #[tokio::test]
    async fn test_discover_with_empty_pantry() {
        let (mut ctrl, _) = controller();
        let client = client();
        let outcome = ctrl.discover_recipes(&client).await.unwrap();

        assert_eq!(outcome, Outcome::Rejected);
        assert!(ctrl.pantry().is_empty());
        assert!(ctrl.recipes().is_empty());
        assert_eq!(
            ctrl.status().recipes.error.as_deref(),
            Some(EMPTY_PANTRY_MESSAGE)
        );
        assert!(!ctrl.status().recipes.pending);
        assert_eq!(client.service().call_count(), 0);
    }

    #[tokio::test]
    async fn test_discover_recipes_end_to_end() {
        let (mut ctrl, _) = stocked();
        let client = client();
        let outcome = ctrl.discover_recipes(&client).await.unwrap();

        assert_eq!(outcome, Outcome::Completed { count: 3 });
        assert_eq!(ctrl.recipes().len(), 3);
        for recipe in ctrl.recipes() {
            let stripped: String = recipe.title.split_whitespace().collect();
            assert!(!recipe.image_url.is_empty());
            assert!(recipe.image_url.contains(&stripped));
        }
        assert_eq!(ctrl.view(), View::Recipes);
        assert_eq!(ctrl.status().recipes, OperationStatus::default());

        let calls = client.service().calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("egg, flour"));
        assert!(calls[0].prompt.contains("Dietary Restrictions: ."));
    }

    #[tokio::test]
    async fn test_discover_uses_five_most_recent_reviews() {
        let (mut ctrl, _) = stocked();
        for i in 1..=7u8 {
            ctrl.add_review("r1", i % 5 + 1, &format!("comment {i}")).unwrap();
        }
        let request = ctrl.begin_recipe_discovery().unwrap();
        assert_eq!(request.review_context.len(), REVIEW_CONTEXT_LIMIT);
        assert_eq!(request.review_context[0], "3 stars: comment 7");
        assert!(request.review_context.iter().all(|c| !c.contains("comment 1")));
        assert!(request.review_context.iter().all(|c| !c.contains("comment 2")));
        assert!(ctrl.status().recipes.pending);
    }

    #[tokio::test]
    async fn test_discover_failure_keeps_previous_recipes() {
        let (mut ctrl, _) = stocked();
        let good = client();
        ctrl.discover_recipes(&good).await.unwrap();
        ctrl.select_view(View::Pantry);

        let failing = StructuredClient::new(FakeService::new());
        let outcome = ctrl.discover_recipes(&failing).await.unwrap();

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(ctrl.recipes().len(), 3);
        assert_eq!(ctrl.view(), View::Pantry);
        assert_eq!(
            ctrl.status().recipes.error.as_deref(),
            Some(RECIPES_FAILED_MESSAGE)
        );
        assert!(!ctrl.status().recipes.pending);
    }

    #[tokio::test]
    async fn test_discover_clears_previous_error() {
        let (mut ctrl, _) = controller();
        let client = client();
        ctrl.discover_recipes(&client).await.unwrap();
        assert!(ctrl.status().recipes.error.is_some());

        ctrl.add_ingredient("egg", None).unwrap();
        ctrl.discover_recipes(&client).await.unwrap();
        assert!(ctrl.status().recipes.error.is_none());
    }

    #[tokio::test]
    async fn test_meal_plan_replaces_collection() {
        let (mut ctrl, store) = controller();
        let outcome = ctrl.generate_meal_plan(&client()).await.unwrap();
        assert_eq!(outcome, Outcome::Completed { count: 7 });
        assert_eq!(ctrl.meal_plan().len(), 7);
        assert_eq!(ctrl.meal_plan()[6].day, "Sunday");
        assert_eq!(store.stored().unwrap().meal_plan.len(), 7);
        assert_eq!(ctrl.view(), View::Pantry);
    }

    #[tokio::test]
    async fn test_meal_plan_malformed_response() {
        let (mut ctrl, _) = controller();
        ctrl.generate_meal_plan(&client()).await.unwrap();
        let before = ctrl.meal_plan().to_vec();

        let broken = StructuredClient::new(FakeService::with_response(
            "meal_plan",
            "<html>502 Bad Gateway</html>",
        ));
        let outcome = ctrl.generate_meal_plan(&broken).await.unwrap();

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(ctrl.meal_plan(), before.as_slice());
        assert_eq!(
            ctrl.status().meal_plan.error.as_deref(),
            Some(MEAL_PLAN_FAILED_MESSAGE)
        );
        assert_eq!(ctrl.status().recipes, OperationStatus::default());
        assert_eq!(ctrl.status().shopping_list, OperationStatus::default());
    }

    #[tokio::test]
    async fn test_meal_plan_prompt_carries_preferences() {
        let (mut ctrl, _) = controller();
        ctrl.set_preference(PreferenceFlag::Keto, true).unwrap();
        let client = client();
        ctrl.generate_meal_plan(&client).await.unwrap();
        assert!(client.service().calls()[0].prompt.contains(r#""keto":true"#));
    }

    #[tokio::test]
    async fn test_shopping_list_without_recipes_is_silent() {
        let (mut ctrl, store) = stocked();
        let saves = store.save_count();
        let client = client();
        let outcome = ctrl.generate_shopping_list(&client).await.unwrap();

        assert_eq!(outcome, Outcome::Skipped);
        assert!(ctrl.shopping_list().is_empty());
        assert_eq!(ctrl.status().shopping_list, OperationStatus::default());
        assert_eq!(client.service().call_count(), 0);
        assert_eq!(store.save_count(), saves);
    }

    #[tokio::test]
    async fn test_shopping_list_after_discovery() {
        let (mut ctrl, store) = stocked();
        let client = client();
        ctrl.discover_recipes(&client).await.unwrap();
        let outcome = ctrl.generate_shopping_list(&client).await.unwrap();

        assert_eq!(outcome, Outcome::Completed { count: 3 });
        assert_eq!(ctrl.view(), View::Shopping);
        assert!(ctrl.shopping_list().iter().all(|i| !i.checked));
        assert_eq!(store.stored().unwrap().shopping_list.len(), 3);

        let calls = client.service().calls();
        assert!(calls[1].prompt.contains("Egg Flour Crepes, Fresh  Pasta, Dumplings"));
    }

    #[tokio::test]
    async fn test_shopping_list_failure_message() {
        let (mut ctrl, _) = stocked();
        let service = FakeService::with_response("recipes", THREE_RECIPES);
        service.add_failure("shopping_list", "timeout");
        let client = StructuredClient::new(service);
        ctrl.discover_recipes(&client).await.unwrap();

        let outcome = ctrl.generate_shopping_list(&client).await.unwrap();
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(ctrl.view(), View::Recipes);
        assert_eq!(
            ctrl.status().shopping_list.error.as_deref(),
            Some(SHOPPING_LIST_FAILED_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_toggle_shopping_item_round_trip() {
        let (mut ctrl, _) = stocked();
        let client = client();
        ctrl.discover_recipes(&client).await.unwrap();
        ctrl.generate_shopping_list(&client).await.unwrap();
        let original = ctrl.shopping_list().to_vec();

        assert_eq!(ctrl.toggle_shopping_item("s2").unwrap(), Some(true));
        assert!(ctrl.shopping_list()[1].checked);
        assert!(!ctrl.shopping_list()[0].checked);
        assert!(!ctrl.shopping_list()[2].checked);

        assert_eq!(ctrl.toggle_shopping_item("s2").unwrap(), Some(false));
        assert_eq!(ctrl.shopping_list(), original.as_slice());
        assert_eq!(ctrl.toggle_shopping_item("nope").unwrap(), None);
    }

    #[test]
    fn test_add_review_prepends() {
        let (mut ctrl, store) = controller();
        ctrl.add_review("other", 3, "ok").unwrap();
        let review = ctrl.add_review("R", 5, "Loved this AI creation!").unwrap();

        assert_eq!(ctrl.reviews().len(), 2);
        assert_eq!(ctrl.reviews()[0], review);
        assert_eq!(review.user, REVIEW_USER);
        assert_eq!(ctrl.reviews_for("R").len(), 1);
        assert!(ctrl.reviews_for("other").iter().all(|r| r.id != review.id));
        assert_eq!(store.stored().unwrap().reviews[0].id, review.id);
    }

    #[test]
    fn test_add_review_rating_not_validated() {
        let (mut ctrl, _) = controller();
        let review = ctrl.add_review("R", 9, "").unwrap();
        assert_eq!(review.rating, 9);
    }

    #[test]
    fn test_dangling_review_kept() {
        let (mut ctrl, _) = controller();
        ctrl.add_review("never-generated", 4, "hmm").unwrap();
        assert_eq!(ctrl.reviews().len(), 1);
        assert!(ctrl.recipe("never-generated").is_none());
    }

    #[tokio::test]
    async fn test_dismiss_error() {
        let (mut ctrl, _) = controller();
        ctrl.discover_recipes(&client()).await.unwrap();
        let broken = StructuredClient::new(FakeService::new());
        ctrl.generate_meal_plan(&broken).await.unwrap();

        ctrl.dismiss_error(Operation::Recipes);
        assert!(ctrl.status().recipes.error.is_none());
        assert!(ctrl.status().meal_plan.error.is_some());
        ctrl.dismiss_errors();
        assert!(ctrl.status().meal_plan.error.is_none());
    }

    #[test]
    fn test_overlapping_operations_keep_separate_status() {
        let (mut ctrl, _) = stocked();
        let request = ctrl.begin_recipe_discovery().unwrap();
        let _ = ctrl.begin_meal_plan();
        assert!(ctrl.status().recipes.pending);
        assert!(ctrl.status().meal_plan.pending);

        ctrl.finish_meal_plan(Err(GenerationError::EmptyResponse))
            .unwrap();
        assert!(ctrl.status().recipes.pending);
        assert!(ctrl.status().recipes.error.is_none());

        let recipes = vec![
            crate::models::RecipeDraft {
                id: "x".to_string(),
                title: request.ingredients.join(" "),
                description: String::new(),
                ingredients: request.ingredients.clone(),
                instructions: vec![],
                cooking_time: 1.0,
                servings: 1.0,
                calories: None,
                tags: vec![],
            }
            .into_recipe(),
        ];
        ctrl.finish_recipe_discovery(Ok(recipes)).unwrap();
        assert!(Operation::ALL.iter().all(|op| !ctrl.status().get(*op).pending));
        assert_eq!(
            ctrl.status().meal_plan.error.as_deref(),
            Some(MEAL_PLAN_FAILED_MESSAGE)
        );
        assert!(ctrl.status().recipes.error.is_none());
    }

    #[test]
    fn test_select_recipe() {
        let (mut ctrl, _) = controller();
        assert!(!ctrl.select_recipe(Some("missing")));
        assert!(ctrl.select_recipe(None));
        assert!(ctrl.selected_recipe().is_none());
    }

    #[test]
    fn test_state_reloads_in_fresh_controller() {
        let (mut ctrl, store) = stocked();
        ctrl.toggle_preference(PreferenceFlag::Paleo).unwrap();
        ctrl.add_allergy("sesame").unwrap();
        ctrl.add_review("r1", 4, "Tasty").unwrap();
        let expected = ctrl.snapshot().clone();

        let reloaded = Controller::new(Box::new(store)).unwrap();
        assert_eq!(reloaded.snapshot(), &expected);
        assert!(reloaded.recipes().is_empty());
        assert_eq!(reloaded.view(), View::Pantry);
    }

    #[test]
    fn test_restore_replaces_everything() {
        let (mut ctrl, store) = stocked();
        ctrl.restore(Snapshot::default()).unwrap();
        assert!(ctrl.pantry().is_empty());
        assert_eq!(store.stored().unwrap(), Snapshot::default());
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!("meal-plan".parse::<Operation>().unwrap(), Operation::MealPlan);
        assert_eq!(
            "shopping_list".parse::<Operation>().unwrap(),
            Operation::ShoppingList
        );
        assert!("pantry".parse::<Operation>().is_err());
    }
}
