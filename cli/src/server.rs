use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

use sous_core::controller::{Controller, EMPTY_PANTRY_MESSAGE, Operation, Outcome, StatusBoard};
use sous_core::generation::GenerationClient;
use sous_core::models::{
    DEFAULT_REVIEW_COMMENT, DietaryPreferences, Ingredient, MealPlanDay, Recipe, Review,
    ShoppingItem, Snapshot, View,
};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    controller: Arc<Mutex<Controller>>,
    client: Arc<dyn GenerationClient>,
    api_key: Option<String>,
}

impl AppState {
    fn controller(&self) -> MutexGuard<'_, Controller> {
        self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct AddIngredientRequest {
    name: String,
    amount: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddReviewRequest {
    recipe_id: String,
    rating: u8,
    comment: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateResponse<'a> {
    #[serde(flatten)]
    snapshot: &'a Snapshot,
    recipes: &'a [Recipe],
    view: View,
    selected_recipe: Option<&'a str>,
    status: &'a StatusBoard,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Generation(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Generation(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// The reported message for a failed operation.
fn generation_failed(ctrl: &Controller, op: Operation) -> ApiError {
    let message = ctrl
        .status()
        .get(op)
        .error
        .clone()
        .unwrap_or_else(|| format!("{} generation failed", op.as_str()));
    ApiError::Generation(message)
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn get_state(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let ctrl = state.controller();
    let body = StateResponse {
        snapshot: ctrl.snapshot(),
        recipes: ctrl.recipes(),
        view: ctrl.view(),
        selected_recipe: ctrl.selected_recipe().map(|r| r.id.as_str()),
        status: ctrl.status(),
    };
    let value = serde_json::to_value(body).map_err(anyhow::Error::from)?;
    Ok(Json(value))
}

async fn add_ingredient(
    State(state): State<AppState>,
    Json(req): Json<AddIngredientRequest>,
) -> Result<(StatusCode, Json<Ingredient>), ApiError> {
    let added = state
        .controller()
        .add_ingredient(&req.name, req.amount.as_deref())?;
    let ingredient =
        added.ok_or_else(|| ApiError::BadRequest("Ingredient name is required".to_string()))?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

async fn remove_ingredient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.controller().remove_ingredient(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("No ingredient with id '{id}'")))
    }
}

async fn get_preferences(State(state): State<AppState>) -> Json<DietaryPreferences> {
    Json(state.controller().preferences().clone())
}

async fn put_preferences(
    State(state): State<AppState>,
    Json(prefs): Json<DietaryPreferences>,
) -> Result<Json<DietaryPreferences>, ApiError> {
    let mut ctrl = state.controller();
    ctrl.set_preferences(prefs)?;
    Ok(Json(ctrl.preferences().clone()))
}

async fn discover_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    let request = state.controller().begin_recipe_discovery();
    let Some(request) = request else {
        return Err(ApiError::BadRequest(EMPTY_PANTRY_MESSAGE.to_string()));
    };

    let result = state
        .client
        .generate_recipes(
            &request.ingredients,
            &request.preferences,
            &request.review_context,
        )
        .await;

    let mut ctrl = state.controller();
    match ctrl.finish_recipe_discovery(result)? {
        Outcome::Completed { .. } => Ok(Json(ctrl.recipes().to_vec())),
        _ => Err(generation_failed(&ctrl, Operation::Recipes)),
    }
}

async fn list_recipes(State(state): State<AppState>) -> Json<Vec<Recipe>> {
    Json(state.controller().recipes().to_vec())
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    state
        .controller()
        .recipe(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No recipe with id '{id}'")))
}

async fn get_recipe_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<Review>> {
    Json(
        state
            .controller()
            .reviews_for(&id)
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn generate_meal_plan(
    State(state): State<AppState>,
) -> Result<Json<Vec<MealPlanDay>>, ApiError> {
    let preferences = state.controller().begin_meal_plan();
    let result = state.client.generate_meal_plan(&preferences).await;

    let mut ctrl = state.controller();
    match ctrl.finish_meal_plan(result)? {
        Outcome::Completed { .. } => Ok(Json(ctrl.meal_plan().to_vec())),
        _ => Err(generation_failed(&ctrl, Operation::MealPlan)),
    }
}

async fn get_meal_plan(State(state): State<AppState>) -> Json<Vec<MealPlanDay>> {
    Json(state.controller().meal_plan().to_vec())
}

/// With no recipes this is a no-op that returns the existing list.
async fn generate_shopping_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<ShoppingItem>>, ApiError> {
    let titles = state.controller().begin_shopping_list();
    let Some(titles) = titles else {
        return Ok(Json(state.controller().shopping_list().to_vec()));
    };

    let result = state.client.generate_shopping_list(&titles).await;

    let mut ctrl = state.controller();
    match ctrl.finish_shopping_list(result)? {
        Outcome::Completed { .. } => Ok(Json(ctrl.shopping_list().to_vec())),
        _ => Err(generation_failed(&ctrl, Operation::ShoppingList)),
    }
}

async fn get_shopping_list(State(state): State<AppState>) -> Json<Vec<ShoppingItem>> {
    Json(state.controller().shopping_list().to_vec())
}

async fn toggle_shopping_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ShoppingItem>, ApiError> {
    let mut ctrl = state.controller();
    if ctrl.toggle_shopping_item(&id)?.is_none() {
        return Err(ApiError::NotFound(format!("No shopping item with id '{id}'")));
    }
    ctrl.shopping_list()
        .iter()
        .find(|i| i.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No shopping item with id '{id}'")))
}

async fn add_review(
    State(state): State<AppState>,
    Json(req): Json<AddReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    let comment = req.comment.as_deref().unwrap_or(DEFAULT_REVIEW_COMMENT);
    let review = state
        .controller()
        .add_review(&req.recipe_id, req.rating, comment)?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn dismiss_error(
    State(state): State<AppState>,
    Path(operation): Path<String>,
) -> Result<Json<StatusBoard>, ApiError> {
    let op: Operation = operation
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let mut ctrl = state.controller();
    ctrl.dismiss_error(op);
    Ok(Json(ctrl.status().clone()))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/pantry", post(add_ingredient))
        .route("/api/pantry/{id}", delete(remove_ingredient))
        .route(
            "/api/preferences",
            get(get_preferences).put(put_preferences),
        )
        .route("/api/recipes", get(list_recipes))
        .route("/api/recipes/discover", post(discover_recipes))
        .route("/api/recipes/{id}", get(get_recipe))
        .route("/api/recipes/{id}/reviews", get(get_recipe_reviews))
        .route("/api/meal-plan", get(get_meal_plan))
        .route("/api/meal-plan/generate", post(generate_meal_plan))
        .route("/api/shopping-list", get(get_shopping_list))
        .route("/api/shopping-list/generate", post(generate_shopping_list))
        .route(
            "/api/shopping-list/{id}/toggle",
            post(toggle_shopping_item),
        )
        .route("/api/reviews", post(add_review))
        .route("/api/status/{operation}/error", delete(dismiss_error))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of the key, or `None` when the key is too
/// short to show any of it.
fn key_preview(key: &str) -> Option<String> {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 12 {
        return None;
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    Some(format!("{head}...{tail}"))
}

pub async fn start_server(
    controller: Controller,
    client: Arc<dyn GenerationClient>,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        controller: Arc::new(Mutex::new(controller)),
        client,
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        match key_preview(key) {
            Some(preview) => {
                eprintln!("API key: {preview} (see api_key file in data directory)");
            }
            None => eprintln!("API key: see api_key file in data directory"),
        }
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!(bind, port, "server started");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
