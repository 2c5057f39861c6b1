//! Profile editor, including its experience and education entries.

use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use tracing::{error, info};

use crate::{
    application::about::AboutError,
    domain::content::{About, Education, Experience, SocialMedia},
    infra::http::{about_error_to_http, see_other},
    presentation::{
        admin::views::{
            AboutFormTemplate, AboutFormView, ConfirmTemplate, EducationRowView,
            ExperienceRowView, FormMeta,
        },
        views::{
            LayoutView, Notice, Theme, render_not_found_response, render_template_response,
        },
    },
};

use super::{
    AdminState,
    editor::NoticeQuery,
    forms::{ConfirmForm, EducationForm, ExperienceForm, Validator, optional, parse_badges},
    multipart::{FormPayload, read_form_payload},
    uploads::{attach_upload_report, upload_error_message, upload_error_status, upload_images},
};

const BASE: &str = "/admin/about";
const PROFILE_IMAGE_FIELD: &str = "profile_image_file";

fn layout(theme: Theme) -> LayoutView {
    LayoutView::admin(theme, "about").with_title("About")
}

fn render_about(
    state: &AdminState,
    layout: LayoutView,
    about: &About,
    form: AboutFormView,
    errors: Vec<String>,
    status: StatusCode,
) -> Response {
    let meta = FormMeta::new(BASE, "/admin", state.uploader.is_enabled()).with_errors(errors);
    render_template_response(
        AboutFormTemplate {
            layout,
            meta,
            form,
            experiences: about.experiences.iter().map(ExperienceRowView::from).collect(),
            educations: about.educations.iter().map(EducationRowView::from).collect(),
        },
        status,
    )
}

/// Re-render the editor from the stored profile with `errors` shown above it.
async fn render_rejected(
    state: &AdminState,
    theme: Theme,
    form: Option<AboutFormView>,
    errors: Vec<String>,
    status: StatusCode,
) -> Response {
    match state.content.about.load_for_edit().await {
        Ok(about) => {
            let form = form.unwrap_or_else(|| AboutFormView::from(&about));
            render_about(state, layout(theme), &about, form, errors, status)
        }
        Err(err) => about_error_to_http("infra::http::admin::about", err).into_response(),
    }
}

pub(super) async fn edit(
    State(state): State<AdminState>,
    theme: Theme,
    Query(query): Query<NoticeQuery>,
) -> Response {
    match state.content.about.load_for_edit().await {
        Ok(about) => render_about(
            &state,
            layout(theme).with_notice(query.notice()),
            &about,
            AboutFormView::from(&about),
            Vec::new(),
            StatusCode::OK,
        ),
        Err(err) => about_error_to_http("infra::http::admin::about::edit", err).into_response(),
    }
}

fn read_form(payload: &FormPayload) -> AboutFormView {
    AboutFormView {
        short_name: payload.text("short_name").trim().to_string(),
        full_name: payload.text("full_name").trim().to_string(),
        job: payload.text("job").trim().to_string(),
        workplace: payload.text("workplace").trim().to_string(),
        profile_image: payload.text("profile_image").trim().to_string(),
        email: payload.text("email").trim().to_string(),
        instagram: payload.text("instagram").trim().to_string(),
        linkedin: payload.text("linkedin").trim().to_string(),
        github: payload.text("github").trim().to_string(),
        description: payload.text("description").trim().to_string(),
        tech_stack: payload.text("tech_stack").to_string(),
        interests: payload.text("interests").to_string(),
    }
}

fn validate(form: &AboutFormView) -> Vec<String> {
    Validator::default()
        .required("Short name", &form.short_name)
        .required("Full name", &form.full_name)
        .finish()
}

/// Apply the edited fields, keeping the stored experiences and educations.
fn apply_form(mut about: About, form: AboutFormView, uploaded_image: Option<String>) -> About {
    about.profile_image = uploaded_image.or_else(|| optional(&form.profile_image));
    about.social_media = SocialMedia {
        email: optional(&form.email),
        instagram: optional(&form.instagram),
        linkedin: optional(&form.linkedin),
        github: optional(&form.github),
    };
    about.tech_stack = parse_badges(&form.tech_stack);
    about.interests = parse_badges(&form.interests);
    about.short_name = form.short_name;
    about.full_name = form.full_name;
    about.job = form.job;
    about.workplace = form.workplace;
    about.description = form.description;
    about
}

pub(super) async fn update(
    State(state): State<AdminState>,
    theme: Theme,
    mut multipart: Multipart,
) -> Response {
    const SOURCE: &str = "infra::http::admin::about::update";

    let payload = match read_form_payload(&mut multipart).await {
        Ok(payload) => payload,
        Err(err) => return err.into_http(state.upload_limit_bytes).into_response(),
    };
    let form = read_form(&payload);
    let errors = validate(&form);
    if !errors.is_empty() {
        return render_rejected(
            &state,
            theme,
            Some(form),
            errors,
            StatusCode::UNPROCESSABLE_ENTITY,
        )
        .await;
    }

    let uploaded = match upload_images(
        state.uploader.as_ref(),
        payload.file(PROFILE_IMAGE_FIELD),
        Vec::new(),
    )
    .await
    {
        Ok(uploaded) => uploaded.cover,
        Err(err) => {
            let mut response = render_rejected(
                &state,
                theme,
                Some(form),
                vec![upload_error_message(&err)],
                upload_error_status(&err),
            )
            .await;
            attach_upload_report(SOURCE, &err, &mut response);
            return response;
        }
    };

    let current = match state.content.about.load_for_edit().await {
        Ok(about) => about,
        Err(err) => return save_failed(SOURCE, err),
    };

    match state
        .content
        .about
        .save(apply_form(current, form, uploaded))
        .await
    {
        Ok(_) => see_other(&Notice::Saved.redirect_target(BASE)),
        Err(err) => save_failed(SOURCE, err),
    }
}

fn save_failed(source: &'static str, err: AboutError) -> Response {
    error!(
        target = "folio::http::admin",
        source = source,
        error = %err,
        "failed to save profile"
    );
    see_other(&Notice::SaveFailed.redirect_target(BASE))
}

pub(super) async fn add_experience(
    State(state): State<AdminState>,
    theme: Theme,
    Form(form): Form<ExperienceForm>,
) -> Response {
    let errors = Validator::default()
        .required("Company", &form.company)
        .required("Position", &form.position)
        .required("Start date", &form.start_date)
        .date("Start date", &form.start_date)
        .date("End date", &form.end_date)
        .finish();
    if !errors.is_empty() {
        return render_rejected(&state, theme, None, errors, StatusCode::UNPROCESSABLE_ENTITY)
            .await;
    }

    let experience = Experience {
        id: String::new(),
        company: form.company.trim().to_string(),
        position: form.position.trim().to_string(),
        start_date: form.start_date.trim().to_string(),
        end_date: form.end_date.trim().to_string(),
        description: form.description.trim().to_string(),
    };
    match state.content.about.add_experience(experience).await {
        Ok(_) => {
            info!(target = "folio::http::admin", "experience added");
            see_other(&Notice::Saved.redirect_target(BASE))
        }
        Err(err) => save_failed("infra::http::admin::about::add_experience", err),
    }
}

pub(super) async fn add_education(
    State(state): State<AdminState>,
    theme: Theme,
    Form(form): Form<EducationForm>,
) -> Response {
    let errors = Validator::default()
        .required("Institution", &form.institution)
        .required("Degree", &form.degree)
        .required("Start date", &form.start_date)
        .date("Start date", &form.start_date)
        .date("End date", &form.end_date)
        .finish();
    if !errors.is_empty() {
        return render_rejected(&state, theme, None, errors, StatusCode::UNPROCESSABLE_ENTITY)
            .await;
    }

    let education = Education {
        id: String::new(),
        institution: form.institution.trim().to_string(),
        degree: form.degree.trim().to_string(),
        start_date: form.start_date.trim().to_string(),
        end_date: form.end_date.trim().to_string(),
    };
    match state.content.about.add_education(education).await {
        Ok(_) => {
            info!(target = "folio::http::admin", "education added");
            see_other(&Notice::Saved.redirect_target(BASE))
        }
        Err(err) => save_failed("infra::http::admin::about::add_education", err),
    }
}

/// Which profile list an entry removal targets.
#[derive(Clone, Copy)]
enum Entry {
    Experience,
    Education,
}

impl Entry {
    fn path(self) -> &'static str {
        match self {
            Entry::Experience => "experiences",
            Entry::Education => "educations",
        }
    }
}

async fn confirm_remove(state: &AdminState, theme: Theme, entry: Entry, id: &str) -> Response {
    let about = match state.content.about.load_for_edit().await {
        Ok(about) => about,
        Err(err) => {
            return about_error_to_http("infra::http::admin::about::confirm_remove", err)
                .into_response();
        }
    };

    let label = match entry {
        Entry::Experience => about
            .experiences
            .iter()
            .find(|item| item.id == id)
            .map(|item| format!("{} at {}", item.position, item.company)),
        Entry::Education => about
            .educations
            .iter()
            .find(|item| item.id == id)
            .map(|item| format!("{}, {}", item.degree, item.institution)),
    };

    match label {
        Some(label) => render_template_response(
            ConfirmTemplate {
                layout: layout(theme),
                prompt: format!("Remove \"{label}\" from the profile?"),
                action: format!("{BASE}/{}/{id}/delete", entry.path()),
            },
            StatusCode::OK,
        ),
        None => render_not_found_response(layout(theme), "That profile entry does not exist."),
    }
}

async fn remove(state: &AdminState, theme: Theme, entry: Entry, id: &str, form: ConfirmForm) -> Response {
    if !form.outcome.is_confirmed() {
        return see_other(&Notice::Cancelled.redirect_target(BASE));
    }

    let result = match entry {
        Entry::Experience => state.content.about.remove_experience(id).await,
        Entry::Education => state.content.about.remove_education(id).await,
    };
    match result {
        Ok(_) => see_other(&Notice::Deleted.redirect_target(BASE)),
        Err(AboutError::EntryNotFound { .. }) => {
            render_not_found_response(layout(theme), "That profile entry does not exist.")
        }
        Err(err) => {
            error!(
                target = "folio::http::admin",
                entry = entry.path(),
                id = %id,
                error = %err,
                "failed to remove profile entry"
            );
            see_other(&Notice::DeleteFailed.redirect_target(BASE))
        }
    }
}

pub(super) async fn confirm_remove_experience(
    State(state): State<AdminState>,
    theme: Theme,
    Path(id): Path<String>,
) -> Response {
    confirm_remove(&state, theme, Entry::Experience, &id).await
}

pub(super) async fn remove_experience(
    State(state): State<AdminState>,
    theme: Theme,
    Path(id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    remove(&state, theme, Entry::Experience, &id, form).await
}

pub(super) async fn confirm_remove_education(
    State(state): State<AdminState>,
    theme: Theme,
    Path(id): Path<String>,
) -> Response {
    confirm_remove(&state, theme, Entry::Education, &id).await
}

pub(super) async fn remove_education(
    State(state): State<AdminState>,
    theme: Theme,
    Path(id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    remove(&state, theme, Entry::Education, &id, form).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_the_form_keeps_entries() {
        let mut about = About::default();
        about.experiences.push(Experience {
            id: "e1".into(),
            company: "Acme".into(),
            position: "Engineer".into(),
            start_date: "2020-01-01".into(),
            end_date: String::new(),
            description: String::new(),
        });

        let form = read_form(&FormPayload::from_fields([
            ("short_name", "Ada"),
            ("full_name", "Ada Lovelace"),
            ("profile_image", ""),
            ("github", "https://github.com/ada"),
            ("tech_stack", "Rust|rust|#dea584"),
        ]));
        assert!(validate(&form).is_empty());

        let updated = apply_form(about, form, None);
        assert_eq!(updated.full_name, "Ada Lovelace");
        assert_eq!(updated.experiences.len(), 1);
        assert_eq!(updated.profile_image, None);
        assert_eq!(updated.social_media.email, None);
        assert_eq!(updated.social_media.github.as_deref(), Some("https://github.com/ada"));
        assert_eq!(updated.tech_stack.len(), 1);
    }

    #[test]
    fn uploaded_profile_image_wins() {
        let form = read_form(&FormPayload::from_fields([
            ("short_name", "Ada"),
            ("full_name", "Ada Lovelace"),
            ("profile_image", "https://cdn.example/old.png"),
        ]));
        let updated = apply_form(
            About::default(),
            form,
            Some("https://cdn.example/new.png".into()),
        );
        assert_eq!(
            updated.profile_image.as_deref(),
            Some("https://cdn.example/new.png")
        );
    }
}
