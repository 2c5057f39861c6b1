use async_trait::async_trait;
use axum::{http::StatusCode, response::Response};

use crate::{
    application::content::{CollectionService, ContentError, ContentServices},
    domain::content::{EMPTY_CREDENTIAL_URL, License},
    presentation::{
        admin::views::{AdminRowView, FormMeta, LicenseFormTemplate, LicenseFormView},
        views::{LayoutView, render_template_response},
    },
};

use super::{editor::Editor, forms::Validator, multipart::FormPayload, uploads::UploadedImages};

pub(super) struct LicenseEditor;

#[async_trait]
impl Editor for LicenseEditor {
    type Record = License;
    type Form = LicenseFormView;

    const SECTION: &'static str = "licenses";
    const BASE: &'static str = "/admin/licenses";
    const NEW_HREF: &'static str = "/admin/licenses/new";
    const HEADING: &'static str = "Licenses";
    const NOUN: &'static str = "license";

    fn service(content: &ContentServices) -> &CollectionService<License> {
        &content.licenses
    }

    fn read_form(payload: &FormPayload) -> LicenseFormView {
        LicenseFormView {
            name: payload.text("name").trim().to_string(),
            issuing_organization: payload.text("issuing_organization").trim().to_string(),
            issue_date: payload.text("issue_date").trim().to_string(),
            expiration_date: payload.text("expiration_date").trim().to_string(),
            credential_url: payload.text("credential_url").trim().to_string(),
            image: payload.text("image").trim().to_string(),
        }
    }

    fn validate(form: &LicenseFormView) -> Vec<String> {
        Validator::default()
            .required("Name", &form.name)
            .required("Issuing organization", &form.issuing_organization)
            .required("Issue date", &form.issue_date)
            .date("Issue date", &form.issue_date)
            .date("Expiration date", &form.expiration_date)
            .finish()
    }

    fn build(form: LicenseFormView, images: UploadedImages) -> License {
        let credential_url = if form.credential_url.is_empty() {
            EMPTY_CREDENTIAL_URL.to_string()
        } else {
            form.credential_url
        };
        License {
            id: String::new(),
            credential_url,
            image: images.cover.unwrap_or(form.image),
            name: form.name,
            issuing_organization: form.issuing_organization,
            issue_date: form.issue_date,
            expiration_date: form.expiration_date,
        }
    }

    fn label(record: &License) -> String {
        record.name.clone()
    }

    fn row(record: &License) -> AdminRowView {
        AdminRowView::from(record)
    }

    fn render(
        layout: LayoutView,
        meta: FormMeta,
        form: LicenseFormView,
        status: StatusCode,
    ) -> Response {
        render_template_response(LicenseFormTemplate { layout, meta, form }, status)
    }

    async fn insert(
        service: &CollectionService<License>,
        record: License,
    ) -> Result<License, ContentError> {
        service.create_plain(record).await
    }

    async fn replace(
        service: &CollectionService<License>,
        id: &str,
        record: License,
    ) -> Result<License, ContentError> {
        service.update_plain(id, record).await
    }
}
