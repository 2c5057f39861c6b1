use async_trait::async_trait;
use axum::{http::StatusCode, response::Response};

use crate::{
    application::content::{CollectionService, ContentError, ContentServices},
    domain::content::BlogPost,
    presentation::{
        admin::views::{AdminRowView, BlogFormTemplate, BlogFormView, FormMeta},
        views::{LayoutView, render_template_response},
    },
};

use super::{
    editor::Editor,
    forms::{Validator, optional, split_tags},
    multipart::FormPayload,
    uploads::UploadedImages,
};

pub(super) struct BlogEditor;

#[async_trait]
impl Editor for BlogEditor {
    type Record = BlogPost;
    type Form = BlogFormView;

    const SECTION: &'static str = "blog";
    const BASE: &'static str = "/admin/blog";
    const NEW_HREF: &'static str = "/admin/blog/new";
    const HEADING: &'static str = "Blog posts";
    const NOUN: &'static str = "post";

    fn service(content: &ContentServices) -> &CollectionService<BlogPost> {
        &content.blog
    }

    fn read_form(payload: &FormPayload) -> BlogFormView {
        BlogFormView {
            title: payload.text("title").trim().to_string(),
            date: payload.text("date").trim().to_string(),
            tags: payload.text("tags").to_string(),
            image: payload.text("image").trim().to_string(),
            content: payload.text("content").to_string(),
            excerpt: payload.text("excerpt").trim().to_string(),
        }
    }

    fn validate(form: &BlogFormView) -> Vec<String> {
        Validator::default()
            .required("Title", &form.title)
            .required("Date", &form.date)
            .date("Date", &form.date)
            .required("Content", &form.content)
            .finish()
    }

    fn build(form: BlogFormView, images: UploadedImages) -> BlogPost {
        BlogPost {
            id: String::new(),
            tags: split_tags(&form.tags),
            excerpt: optional(&form.excerpt),
            image: images.cover.unwrap_or(form.image),
            title: form.title,
            date: form.date,
            content: form.content,
            slug: String::new(),
        }
    }

    fn label(record: &BlogPost) -> String {
        record.title.clone()
    }

    fn row(record: &BlogPost) -> AdminRowView {
        AdminRowView::from(record)
    }

    fn render(layout: LayoutView, meta: FormMeta, form: BlogFormView, status: StatusCode) -> Response {
        render_template_response(BlogFormTemplate { layout, meta, form }, status)
    }

    async fn insert(
        service: &CollectionService<BlogPost>,
        record: BlogPost,
    ) -> Result<BlogPost, ContentError> {
        service.create(record).await
    }

    async fn replace(
        service: &CollectionService<BlogPost>,
        id: &str,
        record: BlogPost,
    ) -> Result<BlogPost, ContentError> {
        service.update(id, record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_excerpt_is_dropped() {
        let form = BlogEditor::read_form(&FormPayload::from_fields([
            ("title", "Hello"),
            ("date", "2024-03-01"),
            ("content", "<p>Hi</p>"),
            ("excerpt", "   "),
        ]));
        assert!(BlogEditor::validate(&form).is_empty());
        let post = BlogEditor::build(form, UploadedImages::default());
        assert_eq!(post.excerpt, None);
        assert!(post.tags.is_empty());
    }
}
