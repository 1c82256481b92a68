//! Deterministic generation service for tests and offline use.
//!
//! Responses are registered per schema name (`recipes`, `meal_plan`,
//! `shopping_list`). Every call is recorded so tests can assert on the prompt
//! that was sent and on how many calls were made.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;

use super::{GenerationError, GenerationService, ResponseSchema};

#[derive(Debug, Clone)]
enum Canned {
    Text(String),
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    pub schema: &'static str,
    pub prompt: String,
}

#[derive(Debug, Default)]
pub struct FakeService {
    responses: RwLock<HashMap<String, Canned>>,
    default_response: Option<String>,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeService {
    /// A service with nothing registered; every call fails.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(schema: &str, response: &str) -> Self {
        let service = Self::new();
        service.add_response(schema, response);
        service
    }

    pub fn add_response(&self, schema: &str, response: &str) {
        self.responses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(schema.to_string(), Canned::Text(response.to_string()));
    }

    /// Make calls for `schema` fail as if the service were unreachable.
    pub fn add_failure(&self, schema: &str, message: &str) {
        self.responses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(schema.to_string(), Canned::Failure(message.to_string()));
    }

    #[must_use]
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Canned answers for all three schemas, used by the `fake` provider.
    pub fn with_sample_responses() -> Self {
        let service = Self::new();
        service.add_response(
            "recipes",
            r#"[
                {"id": "fake-1", "title": "Pantry Frittata", "description": "A quick skillet frittata.",
                 "ingredients": ["4 eggs", "1 cup spinach", "salt"],
                 "instructions": ["Whisk the eggs.", "Wilt the spinach.", "Cook until set."],
                 "cookingTime": 20, "servings": 2, "calories": 280, "tags": ["quick", "breakfast"]},
                {"id": "fake-2", "title": "Rustic Flatbread", "description": "Pan-cooked flatbread.",
                 "ingredients": ["2 cups flour", "water", "olive oil"],
                 "instructions": ["Mix dough.", "Rest 10 minutes.", "Cook in a hot pan."],
                 "cookingTime": 30, "servings": 4, "tags": ["bread"]},
                {"id": "fake-3", "title": "Garden Soup", "description": "Clear vegetable soup.",
                 "ingredients": ["carrots", "onion", "stock"],
                 "instructions": ["Chop vegetables.", "Simmer 25 minutes."],
                 "cookingTime": 35, "servings": 4, "calories": 150, "tags": []}
            ]"#,
        );
        service.add_response(
            "meal_plan",
            r#"[
                {"day": "Monday", "breakfast": "Overnight Oats", "lunch": "Lentil Salad", "dinner": "Veggie Curry", "snacks": ["Apple"]},
                {"day": "Tuesday", "breakfast": "Yogurt Bowl", "lunch": "Falafel Wrap", "dinner": "Stir Fry", "snacks": []},
                {"day": "Wednesday", "breakfast": "Smoothie", "lunch": "Minestrone", "dinner": "Stuffed Peppers", "snacks": ["Almonds"]},
                {"day": "Thursday", "breakfast": "Avocado Toast", "lunch": "Quinoa Bowl", "dinner": "Mushroom Risotto", "snacks": []},
                {"day": "Friday", "breakfast": "Pancakes", "lunch": "Caprese Sandwich", "dinner": "Bean Chili", "snacks": ["Hummus"]},
                {"day": "Saturday", "breakfast": "Shakshuka", "lunch": "Greek Salad", "dinner": "Homemade Pizza", "snacks": []},
                {"day": "Sunday", "breakfast": "French Toast", "lunch": "Tomato Soup", "dinner": "Roast Vegetables", "snacks": ["Popcorn"]}
            ]"#,
        );
        service.add_response(
            "shopping_list",
            r#"[
                {"id": "item-1", "name": "Eggs", "category": "Dairy"},
                {"id": "item-2", "name": "Spinach", "category": "Produce"},
                {"id": "item-3", "name": "Flour", "category": "Pantry"},
                {"id": "item-4", "name": "Carrots", "category": "Produce"}
            ]"#,
        );
        service
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl GenerationService for FakeService {
    async fn generate(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FakeCall {
                schema: schema.name,
                prompt: prompt.to_string(),
            });

        let canned = self
            .responses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(schema.name)
            .cloned();

        match canned {
            Some(Canned::Text(text)) => Ok(text),
            Some(Canned::Failure(message)) => Err(GenerationError::RequestFailed(message)),
            None => self.default_response.clone().ok_or_else(|| {
                GenerationError::RequestFailed(format!(
                    "FakeService: no response configured for schema '{}'",
                    schema.name
                ))
            }),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
