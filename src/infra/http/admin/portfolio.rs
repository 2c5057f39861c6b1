use async_trait::async_trait;
use axum::{http::StatusCode, response::Response};

use crate::{
    application::content::{CollectionService, ContentError, ContentServices},
    domain::content::Portfolio,
    presentation::{
        admin::views::{AdminRowView, FormMeta, PortfolioFormTemplate, PortfolioFormView},
        views::{LayoutView, render_template_response},
    },
};

use super::{
    editor::Editor,
    forms::{Validator, optional, split_lines, split_tags},
    multipart::FormPayload,
    uploads::UploadedImages,
};

pub(super) struct PortfolioEditor;

#[async_trait]
impl Editor for PortfolioEditor {
    type Record = Portfolio;
    type Form = PortfolioFormView;

    const SECTION: &'static str = "portfolio";
    const BASE: &'static str = "/admin/portfolio";
    const NEW_HREF: &'static str = "/admin/portfolio/new";
    const HEADING: &'static str = "Portfolio";
    const NOUN: &'static str = "project";

    fn service(content: &ContentServices) -> &CollectionService<Portfolio> {
        &content.portfolio
    }

    fn read_form(payload: &FormPayload) -> PortfolioFormView {
        PortfolioFormView {
            title: payload.text("title").trim().to_string(),
            start_date: payload.text("start_date").trim().to_string(),
            end_date: payload.text("end_date").trim().to_string(),
            image: payload.text("image").trim().to_string(),
            description: payload.text("description").to_string(),
            video: payload.text("video").trim().to_string(),
            tags: payload.text("tags").to_string(),
            images: payload.text("images").to_string(),
        }
    }

    fn validate(form: &PortfolioFormView) -> Vec<String> {
        Validator::default()
            .required("Title", &form.title)
            .required("Start date", &form.start_date)
            .date("Start date", &form.start_date)
            .date("End date", &form.end_date)
            .required("Description", &form.description)
            .finish()
    }

    fn build(form: PortfolioFormView, images: UploadedImages) -> Portfolio {
        let mut gallery = split_lines(&form.images);
        gallery.extend(images.gallery);
        Portfolio {
            id: String::new(),
            tags: split_tags(&form.tags),
            video: optional(&form.video),
            image: images.cover.unwrap_or(form.image),
            images: gallery,
            title: form.title,
            start_date: form.start_date,
            end_date: form.end_date,
            description: form.description,
            slug: String::new(),
        }
    }

    fn label(record: &Portfolio) -> String {
        record.title.clone()
    }

    fn row(record: &Portfolio) -> AdminRowView {
        AdminRowView::from(record)
    }

    fn render(
        layout: LayoutView,
        meta: FormMeta,
        form: PortfolioFormView,
        status: StatusCode,
    ) -> Response {
        render_template_response(PortfolioFormTemplate { layout, meta, form }, status)
    }

    async fn insert(
        service: &CollectionService<Portfolio>,
        record: Portfolio,
    ) -> Result<Portfolio, ContentError> {
        service.create(record).await
    }

    async fn replace(
        service: &CollectionService<Portfolio>,
        id: &str,
        record: Portfolio,
    ) -> Result<Portfolio, ContentError> {
        service.update(id, record).await
    }
}
