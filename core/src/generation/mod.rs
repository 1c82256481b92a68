//! Structured generation: prompt construction, schema declaration and
//! response parsing for recipes, meal plans and shopping lists.
//!
//! Two seams live here. [`GenerationService`] is the vendor boundary: one
//! prompt plus one schema in, one raw text payload out. [`GenerationClient`]
//! is the domain-facing capability with one operation per use case;
//! [`StructuredClient`] implements it on top of any service.

mod fake;
pub mod prompts;
pub mod schema;

pub use fake::{FakeCall, FakeService};
pub use schema::ResponseSchema;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    DietaryPreferences, MealPlanDay, Recipe, RecipeDraft, ShoppingItem, ShoppingItemDraft,
};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("service returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("service reported an error in its response: {0}")]
    ResponseError(String),

    #[error("response contained no text")]
    EmptyResponse,

    #[error("response did not match the {schema} schema: {message}")]
    Parse {
        schema: &'static str,
        message: String,
    },

    #[error("generation service not configured: {0}")]
    NotConfigured(String),
}

/// A structured text-completion provider.
///
/// Each call is stateless: no conversation history is kept between calls.
#[async_trait]
pub trait GenerationService: Send + Sync + fmt::Debug {
    /// Ask for a JSON payload conforming to `schema`; returns the raw text.
    async fn generate(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<String, GenerationError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate_recipes(
        &self,
        ingredients: &[String],
        preferences: &DietaryPreferences,
        review_context: &[String],
    ) -> Result<Vec<Recipe>, GenerationError>;

    async fn generate_meal_plan(
        &self,
        preferences: &DietaryPreferences,
    ) -> Result<Vec<MealPlanDay>, GenerationError>;

    async fn generate_shopping_list(
        &self,
        recipe_titles: &[String],
    ) -> Result<Vec<ShoppingItem>, GenerationError>;
}

/// [`GenerationClient`] backed by a [`GenerationService`].
#[derive(Debug)]
pub struct StructuredClient<S> {
    service: S,
}

impl<S: GenerationService> StructuredClient<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    async fn request<T: DeserializeOwned>(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<Vec<T>, GenerationError> {
        debug!(
            provider = self.service.provider_name(),
            model = self.service.model_name(),
            schema = schema.name,
            "requesting structured generation"
        );
        let raw = self.service.generate(prompt, schema).await?;
        parse_records(&raw, schema)
    }
}

/// Parse a raw payload as an array of `T`.
pub fn parse_records<T: DeserializeOwned>(
    raw: &str,
    schema: &ResponseSchema,
) -> Result<Vec<T>, GenerationError> {
    serde_json::from_str(raw.trim()).map_err(|e| {
        warn!(schema = schema.name, error = %e, "unparseable generation response");
        GenerationError::Parse {
            schema: schema.name,
            message: e.to_string(),
        }
    })
}

#[async_trait]
impl<S: GenerationService> GenerationClient for StructuredClient<S> {
    async fn generate_recipes(
        &self,
        ingredients: &[String],
        preferences: &DietaryPreferences,
        review_context: &[String],
    ) -> Result<Vec<Recipe>, GenerationError> {
        let prompt = prompts::recipes_prompt(ingredients, preferences, review_context);
        let drafts: Vec<RecipeDraft> = self.request(&prompt, &schema::RECIPES).await?;
        Ok(drafts.into_iter().map(RecipeDraft::into_recipe).collect())
    }

    async fn generate_meal_plan(
        &self,
        preferences: &DietaryPreferences,
    ) -> Result<Vec<MealPlanDay>, GenerationError> {
        let prompt = prompts::meal_plan_prompt(preferences).map_err(|e| {
            GenerationError::RequestFailed(format!("could not encode preferences: {e}"))
        })?;
        let days: Vec<MealPlanDay> = self.request(&prompt, &schema::MEAL_PLAN).await?;
        if days.len() != 7 {
            warn!(days = days.len(), "meal plan does not cover a full week");
        }
        Ok(days)
    }

    async fn generate_shopping_list(
        &self,
        recipe_titles: &[String],
    ) -> Result<Vec<ShoppingItem>, GenerationError> {
        let prompt = prompts::shopping_list_prompt(recipe_titles);
        let drafts: Vec<ShoppingItemDraft> =
            self.request(&prompt, &schema::SHOPPING_LIST).await?;
        Ok(drafts.into_iter().map(ShoppingItem::from).collect())
    }
}
