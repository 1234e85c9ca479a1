// src/handlers/templates.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        from_stored,
        code_template::{CodeTemplate, RenderTemplateRequest},
    },
    schema::CollectionName,
    store::DocumentStore,
};

/// Renders a code template, filling placeholders from the request or their defaults.
pub async fn render_template(
    State(store): State<Arc<DocumentStore>>,
    Path(id): Path<String>,
    payload: Option<Json<RenderTemplateRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let template: CodeTemplate = from_stored(store.get(CollectionName::CodeTemplates, &id).await?)?;
    let code = template.render(&payload.values)?;

    Ok(Json(json!({
        "language": template.language,
        "code": code,
    })))
}
