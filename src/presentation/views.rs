use crate::application::error::{ErrorReport, HttpError};
use crate::application::listing::{ListingQuery, Page};
use crate::domain::content::{
    About, Badge, BlogPost, EMPTY_CREDENTIAL_URL, Education, Experience, License, Portfolio,
    embed_video_url, parse_date,
};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::macros::format_description;
use url::form_urlencoded;

const SUMMARY_CHARS: usize = 100;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(layout: LayoutView, message: &str) -> Response {
    let template = NotFoundTemplate {
        layout: layout.with_title("Not found"),
        message: message.to_string(),
    };
    let mut response = render_template_response(template, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        message,
    )
    .attach(&mut response);
    response
}

/// Colour scheme preference kept in the `theme` cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "dark" => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Outcome banner carried across a redirect as `?notice=<code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Created,
    Updated,
    Deleted,
    Saved,
    Cancelled,
    SaveFailed,
    DeleteFailed,
    LoggedOut,
}

impl Notice {
    pub fn code(self) -> &'static str {
        match self {
            Notice::Created => "created",
            Notice::Updated => "updated",
            Notice::Deleted => "deleted",
            Notice::Saved => "saved",
            Notice::Cancelled => "cancelled",
            Notice::SaveFailed => "save-failed",
            Notice::DeleteFailed => "delete-failed",
            Notice::LoggedOut => "logged-out",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        [
            Notice::Created,
            Notice::Updated,
            Notice::Deleted,
            Notice::Saved,
            Notice::Cancelled,
            Notice::SaveFailed,
            Notice::DeleteFailed,
            Notice::LoggedOut,
        ]
        .into_iter()
        .find(|notice| notice.code() == code)
    }

    pub fn message(self) -> &'static str {
        match self {
            Notice::Created => "Item created.",
            Notice::Updated => "Item updated.",
            Notice::Deleted => "Item deleted.",
            Notice::Saved => "Changes saved.",
            Notice::Cancelled => "Nothing was changed.",
            Notice::SaveFailed => "Saving failed. Please try again.",
            Notice::DeleteFailed => "Deleting failed. Please try again.",
            Notice::LoggedOut => "You have been logged out.",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Notice::SaveFailed | Notice::DeleteFailed)
    }

    /// `path` with this notice appended to its query string.
    pub fn redirect_target(self, path: &str) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        format!("{path}{separator}notice={}", self.code())
    }
}

#[derive(Clone)]
pub struct NoticeView {
    pub kind: &'static str,
    pub message: String,
}

impl NoticeView {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        Self {
            kind: if notice.is_error() { "error" } else { "success" },
            message: notice.message().to_string(),
        }
    }
}

/// Page chrome shared by every template.
#[derive(Clone)]
pub struct LayoutView {
    pub title: String,
    pub theme: &'static str,
    pub section: &'static str,
    pub notice: Option<NoticeView>,
    pub admin: bool,
}

impl LayoutView {
    pub fn public(theme: Theme, section: &'static str) -> Self {
        Self {
            title: String::new(),
            theme: theme.as_str(),
            section,
            notice: None,
            admin: false,
        }
    }

    pub fn admin(theme: Theme, section: &'static str) -> Self {
        Self {
            admin: true,
            ..Self::public(theme, section)
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self
        }
    }

    pub fn with_notice(self, notice: Option<NoticeView>) -> Self {
        Self { notice, ..self }
    }

    pub fn page_title(&self) -> String {
        if self.title.is_empty() {
            "Portfolio".to_string()
        } else {
            format!("{} | Portfolio", self.title)
        }
    }
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub layout: LayoutView,
    pub message: String,
}

pub struct SocialLinkView {
    pub label: &'static str,
    pub href: String,
}

pub struct ExperienceView {
    pub position: String,
    pub company: String,
    pub period: String,
    pub description_html: String,
}

pub struct EducationView {
    pub degree: String,
    pub institution: String,
    pub period: String,
}

pub struct AboutView {
    pub full_name: String,
    pub job: String,
    pub workplace: String,
    pub description: String,
    pub profile_image: Option<String>,
    pub initials: String,
    pub socials: Vec<SocialLinkView>,
    pub tech_stack: Vec<Badge>,
    pub interests: Vec<Badge>,
    pub experiences: Vec<ExperienceView>,
    pub educations: Vec<EducationView>,
}

impl From<About> for AboutView {
    fn from(about: About) -> Self {
        let initials = about
            .full_name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase();

        let mut socials = Vec::new();
        let media = &about.social_media;
        if let Some(email) = non_empty(media.email.as_deref()) {
            socials.push(SocialLinkView {
                label: "Email",
                href: format!("mailto:{email}"),
            });
        }
        for (label, value) in [
            ("GitHub", media.github.as_deref()),
            ("LinkedIn", media.linkedin.as_deref()),
            ("Instagram", media.instagram.as_deref()),
        ] {
            if let Some(href) = non_empty(value) {
                socials.push(SocialLinkView {
                    label,
                    href: href.to_string(),
                });
            }
        }

        let mut experiences = about.experiences;
        experiences.sort_by(|a, b| parse_date(&b.start_date).cmp(&parse_date(&a.start_date)));
        let mut educations = about.educations;
        educations.sort_by(|a, b| parse_date(&b.start_date).cmp(&parse_date(&a.start_date)));

        Self {
            full_name: about.full_name,
            job: about.job,
            workplace: about.workplace,
            description: about.description,
            profile_image: about.profile_image.filter(|url| !url.trim().is_empty()),
            initials,
            socials,
            tech_stack: about.tech_stack,
            interests: about.interests,
            experiences: experiences.into_iter().map(ExperienceView::from).collect(),
            educations: educations.into_iter().map(EducationView::from).collect(),
        }
    }
}

impl From<Experience> for ExperienceView {
    fn from(experience: Experience) -> Self {
        Self {
            period: period(&experience.start_date, &experience.end_date),
            position: experience.position,
            company: experience.company,
            description_html: experience.description,
        }
    }
}

impl From<Education> for EducationView {
    fn from(education: Education) -> Self {
        Self {
            period: period(&education.start_date, &education.end_date),
            degree: education.degree,
            institution: education.institution,
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub layout: LayoutView,
    pub about: AboutView,
    pub projects: Vec<PortfolioCardView>,
    pub posts: Vec<BlogCardView>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct TagOptionView {
    pub name: String,
    pub href: String,
    pub selected: bool,
}

pub struct PageLinkView {
    pub number: usize,
    pub href: String,
    pub current: bool,
}

pub struct PaginationView {
    pub pages: Vec<PageLinkView>,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
}

impl PaginationView {
    pub fn is_needed(&self) -> bool {
        self.pages.len() > 1
    }
}

/// A filtered, paginated public list.
pub struct ListView<T> {
    pub items: Vec<T>,
    pub search: String,
    pub tag: String,
    pub tags: Vec<TagOptionView>,
    pub pagination: PaginationView,
    pub total: usize,
    pub is_filtered: bool,
    pub clear_href: &'static str,
    pub requested_page: usize,
    pub page_count: usize,
    /// First page with the current filters kept.
    pub first_page_href: String,
    pub error: Option<String>,
}

impl<T> ListView<T> {
    pub fn build<S>(
        base_path: &'static str,
        query: &ListingQuery,
        tags: Vec<String>,
        page: Page<S>,
        map: impl Fn(S) -> T,
    ) -> Self {
        let tag_options = tags
            .into_iter()
            .map(|name| {
                let selected = query.tag.as_deref() == Some(name.as_str());
                let href = if selected {
                    list_href(base_path, query.search.as_deref(), None, 1)
                } else {
                    list_href(base_path, query.search.as_deref(), Some(&name), 1)
                };
                TagOptionView {
                    name,
                    href,
                    selected,
                }
            })
            .collect();

        let link = |number: usize| {
            list_href(
                base_path,
                query.search.as_deref(),
                query.tag.as_deref(),
                number,
            )
        };
        let pagination = PaginationView {
            pages: page
                .page_numbers()
                .into_iter()
                .map(|number| PageLinkView {
                    number,
                    href: link(number),
                    current: number == page.page,
                })
                .collect(),
            previous_href: page.has_previous().then(|| link(page.page - 1)),
            next_href: page.has_next().then(|| link(page.page + 1)),
        };

        Self {
            total: page.total,
            items: page.items.into_iter().map(map).collect(),
            search: query.search.clone().unwrap_or_default(),
            tag: query.tag.clone().unwrap_or_default(),
            tags: tag_options,
            pagination,
            is_filtered: !query.is_empty(),
            clear_href: base_path,
            requested_page: page.page,
            page_count: page.page_count,
            first_page_href: link(1),
            error: None,
        }
    }

    pub fn with_error(self, error: Option<String>) -> Self {
        Self { error, ..self }
    }
}

/// Link to a list page, omitting empty parameters and page one.
pub fn list_href(base: &str, search: Option<&str>, tag: Option<&str>, page: usize) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(search) = search.filter(|value| !value.is_empty()) {
        query.append_pair("q", search);
    }
    if let Some(tag) = tag.filter(|value| !value.is_empty()) {
        query.append_pair("tag", tag);
    }
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }
    let query = query.finish();
    if query.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{query}")
    }
}

pub struct PortfolioCardView {
    pub title: String,
    pub href: String,
    pub image: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub period: String,
}

impl From<Portfolio> for PortfolioCardView {
    fn from(project: Portfolio) -> Self {
        Self {
            href: detail_href("/portfolio", &project.slug, &project.id),
            period: period(&project.start_date, &project.end_date),
            summary: summarize(&project.description),
            title: project.title,
            image: project.image,
            tags: project.tags,
        }
    }
}

#[derive(Template)]
#[template(path = "portfolio_list.html")]
pub struct PortfolioListTemplate {
    pub layout: LayoutView,
    pub list: ListView<PortfolioCardView>,
}

pub struct PortfolioDetailView {
    pub title: String,
    pub period: String,
    pub image: String,
    pub description_html: String,
    pub video_embed: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

impl From<Portfolio> for PortfolioDetailView {
    fn from(project: Portfolio) -> Self {
        Self {
            period: period(&project.start_date, &project.end_date),
            video_embed: project
                .video
                .as_deref()
                .and_then(|url| non_empty(Some(url)))
                .map(embed_video_url),
            title: project.title,
            image: project.image,
            description_html: project.description,
            tags: project.tags,
            images: project
                .images
                .into_iter()
                .filter(|url| !url.trim().is_empty())
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "portfolio_detail.html")]
pub struct PortfolioDetailTemplate {
    pub layout: LayoutView,
    pub project: PortfolioDetailView,
}

pub struct BlogCardView {
    pub title: String,
    pub href: String,
    pub image: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub date: String,
}

impl From<BlogPost> for BlogCardView {
    fn from(post: BlogPost) -> Self {
        let summary = match non_empty(post.excerpt.as_deref()) {
            Some(excerpt) => excerpt.to_string(),
            None => summarize(&post.content),
        };
        Self {
            href: detail_href("/blog", &post.slug, &post.id),
            date: long_date(&post.date),
            summary,
            title: post.title,
            image: post.image,
            tags: post.tags,
        }
    }
}

#[derive(Template)]
#[template(path = "blog_list.html")]
pub struct BlogListTemplate {
    pub layout: LayoutView,
    pub list: ListView<BlogCardView>,
}

pub struct BlogDetailView {
    pub title: String,
    pub date: String,
    pub image: String,
    pub content_html: String,
    pub tags: Vec<String>,
}

impl From<BlogPost> for BlogDetailView {
    fn from(post: BlogPost) -> Self {
        Self {
            date: long_date(&post.date),
            title: post.title,
            image: post.image,
            content_html: post.content,
            tags: post.tags,
        }
    }
}

#[derive(Template)]
#[template(path = "blog_detail.html")]
pub struct BlogDetailTemplate {
    pub layout: LayoutView,
    pub post: BlogDetailView,
}

pub struct LicenseCardView {
    pub name: String,
    pub issuer: String,
    pub issued: String,
    pub expires: Option<String>,
    pub credential_url: Option<String>,
    pub image: String,
}

impl From<License> for LicenseCardView {
    fn from(license: License) -> Self {
        let credential_url = Some(license.credential_url)
            .filter(|url| !url.trim().is_empty() && url != EMPTY_CREDENTIAL_URL);
        Self {
            issued: month_year(&license.issue_date),
            expires: non_empty(Some(&license.expiration_date)).map(month_year),
            credential_url,
            name: license.name,
            issuer: license.issuing_organization,
            image: license.image,
        }
    }
}

#[derive(Template)]
#[template(path = "licenses.html")]
pub struct LicensesTemplate {
    pub layout: LayoutView,
    pub list: ListView<LicenseCardView>,
}

pub struct LoginView {
    pub locked: bool,
    pub minutes_remaining: u64,
    pub attempts_left: u32,
    pub error: Option<&'static str>,
    pub configured: bool,
    /// Seconds between automatic reloads while locked out.
    pub refresh_seconds: u32,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub layout: LayoutView,
    pub view: LoginView,
}

fn detail_href(base: &str, slug: &str, id: &str) -> String {
    let key = if slug.is_empty() { id } else { slug };
    let encoded: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
    format!("{base}/{encoded}")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Text content of an HTML fragment, cut to a card-sized summary.
pub fn summarize(html: &str) -> String {
    let text = strip_tags(html);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= SUMMARY_CHARS {
        return text;
    }
    let cut: String = text.chars().take(SUMMARY_CHARS).collect();
    format!("{}...", cut.trim_end())
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text
}

/// "March 2024", or the raw value when it is not a date.
pub fn month_year(raw: &str) -> String {
    match parse_date(raw) {
        Some(date) => date
            .format(format_description!("[month repr:long] [year]"))
            .unwrap_or_else(|_| raw.to_string()),
        None => raw.to_string(),
    }
}

/// "March 9, 2024", or the raw value when it is not a date.
pub fn long_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(date) => date
            .format(format_description!(
                "[month repr:long] [day padding:none], [year]"
            ))
            .unwrap_or_else(|_| raw.to_string()),
        None => raw.to_string(),
    }
}

fn period(start: &str, end: &str) -> String {
    let end = match non_empty(Some(end)) {
        Some(end) => month_year(end),
        None => "Present".to_string(),
    };
    format!("{} - {end}", month_year(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_strip_markup_and_truncate() {
        assert_eq!(summarize("<p>Hello <b>there</b></p>"), "Hello there");
        let long = format!("<p>{}</p>", "word ".repeat(40));
        let summary = summarize(&long);
        assert!(summary.ends_with("..."));
        assert!(summary.chars().count() <= SUMMARY_CHARS + 3);
    }

    #[test]
    fn dates_render_in_long_form() {
        assert_eq!(month_year("2024-03-09"), "March 2024");
        assert_eq!(long_date("2024-03-09"), "March 9, 2024");
        assert_eq!(month_year("soon"), "soon");
        assert_eq!(period("2022-01-01", ""), "January 2022 - Present");
    }

    #[test]
    fn list_hrefs_skip_defaults_and_encode() {
        assert_eq!(list_href("/blog", None, None, 1), "/blog");
        assert_eq!(
            list_href("/blog", Some("rust & wasm"), Some("web"), 2),
            "/blog?q=rust+%26+wasm&tag=web&page=2"
        );
    }

    #[test]
    fn notices_round_trip_through_codes() {
        let target = Notice::Deleted.redirect_target("/admin/blog");
        assert_eq!(target, "/admin/blog?notice=deleted");
        assert_eq!(Notice::from_code("deleted"), Some(Notice::Deleted));
        assert_eq!(Notice::from_code("bogus"), None);
    }

    #[test]
    fn placeholder_credential_links_are_hidden() {
        let card = LicenseCardView::from(License {
            id: "l1".into(),
            name: "CKA".into(),
            issuing_organization: "CNCF".into(),
            issue_date: "2023-01-01".into(),
            expiration_date: String::new(),
            credential_url: EMPTY_CREDENTIAL_URL.into(),
            image: String::new(),
        });
        assert!(card.credential_url.is_none());
        assert!(card.expires.is_none());
    }
}
