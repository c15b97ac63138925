use axum::{
    extract::{Multipart, Query, State, multipart::Field as MultipartField},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{debug, error, warn};

use super::GalleryGrid;
use crate::{
    AppState,
    form::UploadForm,
    images::{self, SelectedFile, paginate},
    notify::{Notice, Toast},
};

const GALLERY_TEMPLATE: &str = "index.html.liquid";

#[derive(Debug, Deserialize, Default)]
pub struct GalleryQuery {
    /// Id of the image to show in the overlay.
    pub view: Option<String>,
    /// Listing cursor.
    pub after: Option<String>,
    /// Present when the upload modal is open.
    pub upload: Option<String>,
    /// Unknown values are ignored.
    pub notice: Option<String>,
}

impl GalleryQuery {
    fn notice(&self) -> Option<Notice> {
        let raw = self.notice.as_deref()?;
        raw.parse()
            .map_err(|e| debug!("Ignoring notice: {}", e))
            .ok()
    }
}

#[derive(Debug, Default, Serialize)]
struct FormView {
    title: String,
    description: String,
    errors: BTreeMap<String, String>,
    is_submitting: bool,
}

impl From<&UploadForm> for FormView {
    fn from(form: &UploadForm) -> Self {
        Self {
            title: form.title().to_string(),
            description: form.description().to_string(),
            errors: form.errors().messages(),
            is_submitting: form.is_submitting(),
        }
    }
}

struct PageView {
    grid: GalleryGrid,
    after: Option<String>,
    next_after: Option<String>,
    upload_open: bool,
    form: FormView,
    toast: Option<Toast>,
}

async fn load_grid(
    app_state: &AppState,
    after: Option<&str>,
) -> Result<(GalleryGrid, Option<String>), Response> {
    let images = images::load_collection(&*app_state.store, &app_state.cache)
        .await
        .map_err(|e| {
            error!("Failed to load images: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load images").into_response()
        })?;

    let page = paginate(&images, after, app_state.config.gallery.images_per_page);
    let grid = GalleryGrid::new(&page.data).map_err(|e| {
        error!("Cannot lay out gallery: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load images").into_response()
    })?;

    Ok((grid, page.after))
}

/// Cursors go into hrefs, so they are percent-encoded before rendering.
fn cursor_param(cursor: &str) -> String {
    urlencoding::encode(cursor).into_owned()
}

async fn render_page(app_state: &AppState, view: PageView, status: StatusCode) -> Response {
    let css_url = app_state
        .static_handler
        .versioned_url("/static/gallery.css")
        .await;

    let mut globals = view.grid.context();
    let extra = liquid::object!({
        "app_name": app_state.config.app.name,
        "page_title": app_state.config.app.name,
        "css_url": css_url,
        "after": view.after.as_deref().map(cursor_param),
        "next_after": view.next_after.as_deref().map(cursor_param),
        "upload_open": view.upload_open,
        "form": view.form,
        "toast": view.toast,
    });
    for (key, value) in extra {
        globals.insert(key, value);
    }

    match app_state
        .template_engine
        .render_template(GALLERY_TEMPLATE, globals)
        .await
    {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!("Template rendering error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn gallery_handler(
    State(app_state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> Response {
    let (mut grid, next_after) = match load_grid(&app_state, query.after.as_deref()).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    // the requested image may live on another page of the listing
    if let Some(id) = query.view.as_deref()
        && !grid.select(id)
    {
        match app_state.store.get(id).await {
            Ok(image) => grid.view_image(&image.url),
            Err(e) => debug!("Cannot view image: {}", e),
        }
    }

    let toast = query.notice().map(Notice::toast);
    let view = PageView {
        grid,
        after: query.after,
        next_after,
        upload_open: query.upload.is_some(),
        form: FormView::default(),
        toast,
    };
    render_page(&app_state, view, StatusCode::OK).await
}

#[derive(Default)]
struct SubmittedFields {
    title: String,
    description: String,
    file: Option<SelectedFile>,
}

async fn read_file_field(field: MultipartField<'_>) -> Result<Option<SelectedFile>, String> {
    let name = field.file_name().unwrap_or_default().to_string();
    let media_type = field.content_type().unwrap_or_default().to_string();
    let data = field.bytes().await.map_err(|e| e.to_string())?;

    // browsers send an empty part when no file was picked
    if name.is_empty() && data.is_empty() {
        return Ok(None);
    }
    Ok(Some(SelectedFile::new(name, media_type, data)))
}

async fn read_fields(multipart: &mut Multipart) -> Result<SubmittedFields, String> {
    let mut fields = SubmittedFields::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => fields.title = field.text().await.map_err(|e| e.to_string())?,
            "description" => {
                fields.description = field.text().await.map_err(|e| e.to_string())?
            }
            "image" => fields.file = read_file_field(field).await?,
            other => debug!("Ignoring form field {:?}", other),
        }
    }

    Ok(fields)
}

/// Runs a submitted upload form through select, transfer, and creation.
/// Finished submissions close the modal by redirecting back to the gallery;
/// invalid input re-renders the modal with inline errors.
pub async fn submit_image_handler(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let fields = match read_fields(&mut multipart).await {
        Ok(fields) => fields,
        Err(e) => {
            warn!("Malformed upload form: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid form data").into_response();
        }
    };

    let modal_closed = Arc::new(AtomicBool::new(false));
    let close_flag = modal_closed.clone();

    let mut form = UploadForm::new(
        app_state.store.clone(),
        app_state.storage.clone(),
        app_state.cache.clone(),
    )
    .on_close(move || close_flag.store(true, Ordering::SeqCst));

    form.set_title(fields.title);
    form.set_description(fields.description);

    if let Some(file) = fields.file
        && form.select_file(file).is_ok()
        && let Err(e) = form.upload().await
    {
        warn!("Upload step failed: {}", e);
    }

    let outcome = match form.submit().await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Upload form in unexpected state: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if modal_closed.load(Ordering::SeqCst)
        && let Some(notice) = outcome.notice()
    {
        return Redirect::to(&format!("/?notice={}", notice.as_str())).into_response();
    }

    let (grid, next_after) = match load_grid(&app_state, None).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    let view = PageView {
        grid,
        after: None,
        next_after,
        upload_open: true,
        form: FormView::from(&form),
        toast: outcome.toast().cloned(),
    };
    render_page(&app_state, view, StatusCode::UNPROCESSABLE_ENTITY).await
}
