use std::sync::Arc;

use shared::{
    domain::{DestroyFilter, NewTutorial, Tutorial, TutorialChanges, TutorialFilter, TutorialId},
    error::{ApiError, ErrorCode, MessageResponse},
    protocol::{CreateTutorialRequest, ListTutorialsQuery, UpdateTutorialRequest},
};
use storage::TutorialStore;
use tracing::{debug, error};

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn TutorialStore>,
}

impl ApiContext {
    pub fn new(store: impl TutorialStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

pub async fn create_tutorial(
    ctx: &ApiContext,
    req: CreateTutorialRequest,
) -> Result<Tutorial, ApiError> {
    require_fields(&[("title", req.title.as_deref())])?;

    let tutorial = NewTutorial {
        title: req.title.unwrap_or_default(),
        description: req.description,
        published: req.published.unwrap_or(false),
    };
    ctx.store
        .create(tutorial)
        .await
        .map_err(|e| internal(e, "Some error occurred while creating the Tutorial."))
}

/// Lists every tutorial, or those whose title contains `query.title`.
pub async fn list_tutorials(
    ctx: &ApiContext,
    query: ListTutorialsQuery,
) -> Result<Vec<Tutorial>, ApiError> {
    let filter = match query.title {
        Some(title) => TutorialFilter::title_contains(title),
        None => TutorialFilter::default(),
    };
    ctx.store
        .find_all(filter)
        .await
        .map_err(|e| internal(e, "Some error occurred while retrieving tutorials."))
}

pub async fn get_tutorial(ctx: &ApiContext, id: TutorialId) -> Result<Tutorial, ApiError> {
    ctx.store
        .find_by_key(id)
        .await
        .map_err(|e| opaque_failure(e, format!("Error retrieving Tutorial with id={id}")))?
        .ok_or_else(|| {
            debug!(%id, "tutorial not found");
            ApiError::not_found(format!("Cannot find Tutorial with id={id}."))
        })
}

pub async fn update_tutorial(
    ctx: &ApiContext,
    id: TutorialId,
    req: UpdateTutorialRequest,
) -> Result<MessageResponse, ApiError> {
    if req.title.is_some() {
        require_fields(&[("title", req.title.as_deref())])?;
    }

    let changes = TutorialChanges {
        title: req.title,
        description: req.description,
        published: req.published,
    };
    let rows = ctx
        .store
        .update(id, changes)
        .await
        .map_err(|e| opaque_failure(e, format!("Error updating Tutorial with id={id}")))?;

    if rows == 0 {
        return Err(ApiError::validation(format!(
            "Cannot update Tutorial with id={id}. Maybe Tutorial was not found or the request body is empty!"
        )));
    }
    Ok(MessageResponse::new("Tutorial was updated successfully."))
}

pub async fn delete_tutorial(
    ctx: &ApiContext,
    id: TutorialId,
) -> Result<MessageResponse, ApiError> {
    let rows = ctx
        .store
        .destroy(DestroyFilter::ById(id))
        .await
        .map_err(|e| opaque_failure(e, format!("Could not delete Tutorial with id={id}")))?;

    if rows == 0 {
        return Err(ApiError::not_found(format!(
            "Cannot delete Tutorial with id={id}. Maybe Tutorial was not found!"
        )));
    }
    Ok(MessageResponse::new("Tutorial was deleted successfully!"))
}

/// Deletes rows instead of truncating so the removed count can be reported.
pub async fn delete_all_tutorials(ctx: &ApiContext) -> Result<MessageResponse, ApiError> {
    let rows = ctx
        .store
        .destroy(DestroyFilter::All)
        .await
        .map_err(|e| internal(e, "Some error occurred while removing all tutorials."))?;
    Ok(MessageResponse::new(format!(
        "{rows} Tutorials were deleted successfully!"
    )))
}

pub async fn list_published_tutorials(ctx: &ApiContext) -> Result<Vec<Tutorial>, ApiError> {
    ctx.store
        .find_all(TutorialFilter::published())
        .await
        .map_err(|e| internal(e, "Some error occurred while retrieving tutorials."))
}

/// Rejects on the first field that is absent or empty.
pub fn require_fields(fields: &[(&str, Option<&str>)]) -> Result<(), ApiError> {
    match fields
        .iter()
        .find(|(_, value)| value.map_or(true, str::is_empty))
    {
        Some((name, _)) => Err(empty_field(name)),
        None => Ok(()),
    }
}

fn empty_field(name: &str) -> ApiError {
    ApiError::validation(format!("{name} can not be empty!"))
}

/// Maps a store failure to an `ApiError`, keeping the failure's own message
/// unless it has none.
pub fn store_failure(
    code: ErrorCode,
    err: anyhow::Error,
    fallback: impl Into<String>,
) -> ApiError {
    let message = err.to_string();
    let detail = format!("{err:#}");
    error!(error = %detail, "tutorial store call failed");
    if message.trim().is_empty() {
        ApiError::new(code, fallback)
    } else {
        ApiError::new(code, message)
    }
}

fn internal(err: anyhow::Error, fallback: impl Into<String>) -> ApiError {
    store_failure(ErrorCode::Internal, err, fallback)
}

/// Logs the store failure but answers with `message` only.
fn opaque_failure(err: anyhow::Error, message: impl Into<String>) -> ApiError {
    let detail = format!("{err:#}");
    error!(error = %detail, "tutorial store call failed");
    ApiError::new(ErrorCode::Internal, message)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
