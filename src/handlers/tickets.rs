// Ticket catalog handlers: public reads and admin CRUD

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::ticket::{Category, CategoryUpdate, NewCategory, NewTicket, Ticket, TicketUpdate},
    utils::{trim_and_validate_field, trim_optional_field, ServiceError},
};

#[derive(Debug, Deserialize)]
pub struct TicketFilter {
    pub category_id: Option<Uuid>,
    /// Prefix match against the event name
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(length(min = 1, max = 255))]
    pub event_name: String,
    pub event_description: String,
    pub event_image: Option<String>,
    #[validate(range(min = 0))]
    pub price_cents: i64,
    #[validate(range(min = 0))]
    pub available_quantity: i32,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub event_name: Option<String>,
    pub event_description: Option<String>,
    pub event_image: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub available_quantity: Option<i32>,
    pub category_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
}

fn require_admin(auth_user: &AuthenticatedUser) -> Result<(), ServiceError> {
    if auth_user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

/// GET /tickets
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(filter): Query<TicketFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;

    let tickets = match (&filter.search, filter.category_id) {
        (Some(term), _) if !term.trim().is_empty() => {
            Ticket::search_by_name(&mut conn, term.trim()).await?
        },
        (_, Some(category)) => Ticket::list_by_category(&mut conn, category).await?,
        _ => Ticket::list_all(&mut conn).await?,
    };

    Ok(Json(tickets))
}

/// GET /tickets/{id}
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let ticket = Ticket::find_by_id(&mut conn, ticket_id)
        .await?
        .ok_or(ServiceError::NotFound)?;

    Ok(Json(ticket))
}

/// GET /categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let categories = Category::list_all(&mut conn).await?;
    Ok(Json(categories))
}

/// POST /admin/tickets
pub async fn create_ticket(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<CreateTicketRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;
    req.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let ticket = Ticket::create(
        &mut conn,
        NewTicket {
            event_name: trim_and_validate_field(&req.event_name, true)
                .map_err(ServiceError::ValidationError)?,
            event_description: req.event_description,
            event_image: trim_optional_field(req.event_image.as_ref()),
            price_cents: req.price_cents,
            available_quantity: req.available_quantity,
            category_id: req.category_id,
        },
    )
    .await?;

    tracing::info!(ticket_id = %ticket.id, admin = %auth_user.user_id, "Created ticket");
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// PUT /admin/tickets/{id}
pub async fn update_ticket(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<UpdateTicketRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    if let Some(price) = req.price_cents {
        if price < 0 {
            return Err(ServiceError::ValidationError(
                "price_cents must not be negative".to_string(),
            ));
        }
    }

    let mut conn = state.diesel_pool.get().await?;
    let ticket = Ticket::update(
        &mut conn,
        ticket_id,
        TicketUpdate {
            event_name: req.event_name,
            event_description: req.event_description,
            event_image: req.event_image,
            price_cents: req.price_cents,
            available_quantity: req.available_quantity,
            category_id: req.category_id,
        },
    )
    .await?
    .ok_or(ServiceError::NotFound)?;

    Ok(Json(ticket))
}

/// DELETE /admin/tickets/{id}
pub async fn delete_ticket(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    let mut conn = state.diesel_pool.get().await?;
    let deleted = Ticket::delete(&mut conn, ticket_id).await?;
    if deleted == 0 {
        return Err(ServiceError::NotFound);
    }

    tracing::info!(ticket_id = %ticket_id, admin = %auth_user.user_id, "Deleted ticket");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/categories
pub async fn create_category(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;
    req.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let category = Category::create(
        &mut conn,
        NewCategory {
            name: trim_and_validate_field(&req.name, true).map_err(ServiceError::ValidationError)?,
            description: req.description,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /admin/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(category_id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;
    req.validate()?;

    if req.name.is_none() && req.description.is_none() {
        return Err(ServiceError::ValidationError(
            "no fields to update".to_string(),
        ));
    }

    let mut conn = state.diesel_pool.get().await?;
    let category = Category::update(
        &mut conn,
        category_id,
        CategoryUpdate {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
        },
    )
    .await?
    .ok_or(ServiceError::NotFound)?;

    Ok(Json(category))
}

/// DELETE /admin/categories/{id}
pub async fn delete_category(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    let mut conn = state.diesel_pool.get().await?;
    let deleted = Category::delete(&mut conn, category_id).await?;
    if deleted == 0 {
        return Err(ServiceError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}
