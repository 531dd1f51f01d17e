use axum::{
    Extension, Json,
    extract::{Multipart, Path, State, multipart::Field},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};
use uuid::Uuid;

use garage_types::api::{Claims, DeleteCarResponse};
use garage_types::models::{CarFields, MAX_IMAGES, NewCar, parse_tags};

use crate::error::ApiError;
use crate::service::{self, CarUpdate};
use crate::state::AppState;

// ── Multipart form ──────────────────────────────────────────────────────

/// An image received in the form but not yet written to storage.
struct PendingUpload {
    file_name: String,
    data: Vec<u8>,
}

/// Parsed `multipart/form-data` body shared by create and update.
///
/// Recognised parts: `title`, `description`, `tags` (comma-joined),
/// `deletedImages` (JSON array of references) and any number of `images`
/// file parts. Text parts named `images` are existing references echoed back
/// by clients and are ignored.
#[derive(Default)]
struct CarForm {
    fields: CarFields,
    uploads: Vec<PendingUpload>,
    deleted: Vec<String>,
}

impl CarForm {
    async fn parse(mut multipart: Multipart, max_upload_bytes: usize) -> Result<Self, ApiError> {
        let mut form = CarForm::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "title" => form.fields.title = Some(field.text().await.map_err(bad_form)?),
                "description" => {
                    form.fields.description = Some(field.text().await.map_err(bad_form)?)
                }
                "tags" => form.fields.tags = Some(parse_tags(&field.text().await.map_err(bad_form)?)),
                "deletedImages" => {
                    let raw = field.text().await.map_err(bad_form)?;
                    if !raw.trim().is_empty() {
                        form.deleted = serde_json::from_str(&raw).map_err(|_| {
                            ApiError::Validation(
                                "deletedImages must be a JSON array of strings".into(),
                            )
                        })?;
                    }
                }
                "images" => {
                    let Some(file_name) = field.file_name().map(str::to_string) else {
                        continue;
                    };
                    let data = read_limited(field, max_upload_bytes).await?;
                    // Browsers send an empty part when no file was picked.
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    if form.uploads.len() == MAX_IMAGES {
                        return Err(ApiError::LimitExceeded);
                    }
                    form.uploads.push(PendingUpload { file_name, data });
                }
                other => debug!("Ignoring form field '{}'", other),
            }
        }

        Ok(form)
    }
}

async fn read_limited(mut field: Field<'_>, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(bad_form)? {
        if data.len() + chunk.len() > limit {
            return Err(ApiError::Validation(format!(
                "Error uploading images: each image must be at most {} bytes",
                limit
            )));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

fn bad_form(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation(format!("Error uploading images: {}", e.body_text()))
}

/// Write pending uploads to storage. On failure, whatever was already
/// written is removed again.
async fn store_uploads(state: &AppState, uploads: Vec<PendingUpload>) -> Result<Vec<String>, ApiError> {
    let mut refs = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match state.storage.store(&upload.file_name, &upload.data).await {
            Ok(reference) => refs.push(reference),
            Err(e) => {
                warn!("Failed to store upload '{}': {}", upload.file_name, e);
                state.storage.purge(&refs).await;
                return Err(ApiError::Storage(e));
            }
        }
    }
    Ok(refs)
}

/// Ids that don't parse can't name an existing car.
fn parse_car_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound)
}

// ── Handlers ────────────────────────────────────────────────────────────

/// POST /api/cars — create a car with up to 10 images.
pub async fn create_car(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = CarForm::parse(multipart, state.max_upload_bytes).await?;
    let images = store_uploads(&state, form.uploads).await?;

    let car = NewCar {
        title: form.fields.title.unwrap_or_default(),
        description: form.fields.description.filter(|d| !d.is_empty()),
        tags: form.fields.tags.unwrap_or_default(),
        images,
    };
    let created = service::create_car(&state, &claims.sub, car).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/cars — every car owned by the caller.
pub async fn list_cars(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let cars = service::list_cars(&state, &claims.sub).await?;
    Ok(Json(cars))
}

/// GET /api/cars/{id}
pub async fn get_car(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_car_id(&id)?;
    let car = service::get_car(&state, &claims.sub, id).await?;
    Ok(Json(car))
}

/// PUT /api/cars/{id} — update fields, append uploads, drop `deletedImages`.
pub async fn update_car(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_car_id(&id)?;
    let form = CarForm::parse(multipart, state.max_upload_bytes).await?;
    let uploaded = store_uploads(&state, form.uploads).await?;

    let car = service::update_car(
        &state,
        &claims.sub,
        id,
        CarUpdate {
            fields: form.fields,
            uploaded,
            deleted: form.deleted,
        },
    )
    .await?;

    Ok(Json(car))
}

/// DELETE /api/cars/{id} — remove the car and, best-effort, its images.
pub async fn delete_car(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_car_id(&id)?;
    service::delete_car(&state, &claims.sub, id).await?;
    Ok(Json(DeleteCarResponse {
        message: "Car deleted successfully".into(),
    }))
}
