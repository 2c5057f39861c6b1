//! List, create, edit and delete handlers shared by the content editors.

use async_trait::async_trait;
use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    application::{
        content::{CollectionService, ContentError, ContentServices},
        error::ErrorReport,
        listing::{Listable, ListingQuery, filter_and_sort},
    },
    domain::content::ContentRecord,
    infra::http::{content_error_to_http, see_other},
    presentation::{
        admin::views::{AdminListTemplate, AdminRowView, ConfirmTemplate, FormMeta},
        views::{
            LayoutView, Notice, NoticeView, Theme, render_not_found_response,
            render_template_response,
        },
    },
};

use super::{
    AdminState,
    forms::ConfirmForm,
    multipart::{FormPayload, read_form_payload},
    uploads::{
        UploadedImages, attach_upload_report, upload_error_message, upload_error_status,
        upload_images,
    },
};

const COVER_FIELD: &str = "image_file";
const GALLERY_FIELD: &str = "image_files";
const SLUG_MESSAGE: &str = "The title needs at least one letter or digit to build a link.";

/// One editable content collection.
#[async_trait]
pub(super) trait Editor: Send + Sync + 'static {
    type Record: ContentRecord + Listable;
    type Form: Clone + Default + Send + Sync + 'static + for<'a> From<&'a Self::Record>;

    const SECTION: &'static str;
    const BASE: &'static str;
    const NEW_HREF: &'static str;
    const HEADING: &'static str;
    const NOUN: &'static str;

    fn service(content: &ContentServices) -> &CollectionService<Self::Record>;

    fn read_form(payload: &FormPayload) -> Self::Form;

    fn validate(form: &Self::Form) -> Vec<String>;

    fn build(form: Self::Form, images: UploadedImages) -> Self::Record;

    fn label(record: &Self::Record) -> String;

    fn row(record: &Self::Record) -> AdminRowView;

    fn render(
        layout: LayoutView,
        meta: FormMeta,
        form: Self::Form,
        status: StatusCode,
    ) -> Response;

    async fn insert(
        service: &CollectionService<Self::Record>,
        record: Self::Record,
    ) -> Result<Self::Record, ContentError>;

    async fn replace(
        service: &CollectionService<Self::Record>,
        id: &str,
        record: Self::Record,
    ) -> Result<Self::Record, ContentError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NoticeQuery {
    notice: Option<String>,
}

impl NoticeQuery {
    pub(super) fn notice(&self) -> Option<NoticeView> {
        self.notice
            .as_deref()
            .and_then(Notice::from_code)
            .map(NoticeView::from)
    }
}

fn edit_action<E: Editor>(id: &str) -> String {
    format!("{}/{id}/edit", E::BASE)
}

fn delete_action<E: Editor>(id: &str) -> String {
    format!("{}/{id}/delete", E::BASE)
}

fn form_meta<E: Editor>(state: &AdminState, action: impl Into<String>) -> FormMeta {
    FormMeta::new(action, E::BASE, state.uploader.is_enabled())
}

fn not_found<E: Editor>(layout: LayoutView) -> Response {
    let message = format!("That {} does not exist.", E::NOUN);
    render_not_found_response(layout, &message)
}

pub(super) async fn list<E: Editor>(
    State(state): State<AdminState>,
    theme: Theme,
    Query(query): Query<NoticeQuery>,
) -> Response {
    let layout = LayoutView::admin(theme, E::SECTION)
        .with_title(E::HEADING)
        .with_notice(query.notice());

    let (rows, error) = match E::service(&state.content).list().await {
        Ok(records) => {
            let records = filter_and_sort(records, &ListingQuery::default());
            (records.iter().map(E::row).collect(), None)
        }
        Err(err) => {
            warn!(
                target = "folio::http::admin",
                section = E::SECTION,
                error = %err,
                "failed to load admin list"
            );
            (Vec::new(), Some(format!("Failed to load {}.", E::HEADING.to_lowercase())))
        }
    };

    render_template_response(
        AdminListTemplate {
            layout,
            heading: E::HEADING,
            new_href: E::NEW_HREF,
            rows,
            error,
        },
        StatusCode::OK,
    )
}

pub(super) async fn new_form<E: Editor>(State(state): State<AdminState>, theme: Theme) -> Response {
    let layout = LayoutView::admin(theme, E::SECTION).with_title(format!("New {}", E::NOUN));
    E::render(
        layout,
        form_meta::<E>(&state, E::NEW_HREF),
        E::Form::default(),
        StatusCode::OK,
    )
}

/// Read, validate and upload a submitted editor form.
///
/// On rejection the ready-to-send response re-renders the form.
async fn prepare<E: Editor>(
    state: &AdminState,
    layout: &LayoutView,
    action: &str,
    multipart: &mut Multipart,
    source: &'static str,
) -> Result<(E::Form, E::Record), Response> {
    let payload = read_form_payload(multipart)
        .await
        .map_err(|err| err.into_http(state.upload_limit_bytes).into_response())?;

    let form = E::read_form(&payload);
    let errors = E::validate(&form);
    if !errors.is_empty() {
        return Err(E::render(
            layout.clone(),
            form_meta::<E>(state, action).with_errors(errors),
            form,
            StatusCode::UNPROCESSABLE_ENTITY,
        ));
    }

    let images = match upload_images(
        state.uploader.as_ref(),
        payload.file(COVER_FIELD),
        payload.files(GALLERY_FIELD),
    )
    .await
    {
        Ok(images) => images,
        Err(err) => {
            let mut response = E::render(
                layout.clone(),
                form_meta::<E>(state, action).with_errors(vec![upload_error_message(&err)]),
                form,
                upload_error_status(&err),
            );
            attach_upload_report(source, &err, &mut response);
            return Err(response);
        }
    };

    let record = E::build(form.clone(), images);
    Ok((form, record))
}

fn save_failed<E: Editor>(
    state: &AdminState,
    layout: LayoutView,
    action: &str,
    form: E::Form,
    err: ContentError,
    source: &'static str,
) -> Response {
    match err {
        ContentError::Slug(_) => {
            let mut response = E::render(
                layout,
                form_meta::<E>(state, action).with_errors(vec![SLUG_MESSAGE.to_string()]),
                form,
                StatusCode::UNPROCESSABLE_ENTITY,
            );
            ErrorReport::from_error(source, StatusCode::UNPROCESSABLE_ENTITY, &err)
                .attach(&mut response);
            response
        }
        ContentError::NotFound { .. } => not_found::<E>(layout),
        other => {
            error!(
                target = "folio::http::admin",
                section = E::SECTION,
                source = source,
                error = %other,
                "failed to save record"
            );
            see_other(&Notice::SaveFailed.redirect_target(E::BASE))
        }
    }
}

pub(super) async fn create<E: Editor>(
    State(state): State<AdminState>,
    theme: Theme,
    mut multipart: Multipart,
) -> Response {
    const SOURCE: &str = "infra::http::admin::editor::create";

    let layout = LayoutView::admin(theme, E::SECTION).with_title(format!("New {}", E::NOUN));
    let (form, record) =
        match prepare::<E>(&state, &layout, E::NEW_HREF, &mut multipart, SOURCE).await {
            Ok(prepared) => prepared,
            Err(response) => return response,
        };

    match E::insert(E::service(&state.content), record).await {
        Ok(record) => {
            info!(
                target = "folio::http::admin",
                section = E::SECTION,
                id = record.id(),
                "record created"
            );
            see_other(&Notice::Created.redirect_target(E::BASE))
        }
        Err(err) => save_failed::<E>(&state, layout, E::NEW_HREF, form, err, SOURCE),
    }
}

pub(super) async fn edit<E: Editor>(
    State(state): State<AdminState>,
    theme: Theme,
    Path(id): Path<String>,
) -> Response {
    let layout = LayoutView::admin(theme, E::SECTION);
    match E::service(&state.content).get(&id).await {
        Ok(Some(record)) => E::render(
            layout.with_title(E::label(&record)),
            form_meta::<E>(&state, edit_action::<E>(&id)),
            E::Form::from(&record),
            StatusCode::OK,
        ),
        Ok(None) => not_found::<E>(layout),
        Err(err) => content_error_to_http("infra::http::admin::editor::edit", err).into_response(),
    }
}

pub(super) async fn update<E: Editor>(
    State(state): State<AdminState>,
    theme: Theme,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    const SOURCE: &str = "infra::http::admin::editor::update";

    let action = edit_action::<E>(&id);
    let layout = LayoutView::admin(theme, E::SECTION).with_title(format!("Edit {}", E::NOUN));
    let (form, record) = match prepare::<E>(&state, &layout, &action, &mut multipart, SOURCE).await
    {
        Ok(prepared) => prepared,
        Err(response) => return response,
    };

    match E::replace(E::service(&state.content), &id, record).await {
        Ok(_) => {
            info!(
                target = "folio::http::admin",
                section = E::SECTION,
                id = %id,
                "record updated"
            );
            see_other(&Notice::Updated.redirect_target(E::BASE))
        }
        Err(err) => save_failed::<E>(&state, layout, &action, form, err, SOURCE),
    }
}

pub(super) async fn confirm_delete<E: Editor>(
    State(state): State<AdminState>,
    theme: Theme,
    Path(id): Path<String>,
) -> Response {
    let layout = LayoutView::admin(theme, E::SECTION).with_title(format!("Delete {}", E::NOUN));
    match E::service(&state.content).get(&id).await {
        Ok(Some(record)) => render_template_response(
            ConfirmTemplate {
                layout,
                prompt: format!(
                    "Delete the {} \"{}\"? This cannot be undone.",
                    E::NOUN,
                    E::label(&record)
                ),
                action: delete_action::<E>(&id),
            },
            StatusCode::OK,
        ),
        Ok(None) => not_found::<E>(layout),
        Err(err) => {
            content_error_to_http("infra::http::admin::editor::confirm_delete", err)
                .into_response()
        }
    }
}

pub(super) async fn delete<E: Editor>(
    State(state): State<AdminState>,
    theme: Theme,
    Path(id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    if !form.outcome.is_confirmed() {
        return see_other(&Notice::Cancelled.redirect_target(E::BASE));
    }

    match E::service(&state.content).delete(&id).await {
        Ok(()) => {
            info!(
                target = "folio::http::admin",
                section = E::SECTION,
                id = %id,
                "record deleted"
            );
            see_other(&Notice::Deleted.redirect_target(E::BASE))
        }
        Err(ContentError::NotFound { .. }) => not_found::<E>(LayoutView::admin(theme, E::SECTION)),
        Err(err) => {
            error!(
                target = "folio::http::admin",
                section = E::SECTION,
                id = %id,
                error = %err,
                "failed to delete record"
            );
            see_other(&Notice::DeleteFailed.redirect_target(E::BASE))
        }
    }
}
