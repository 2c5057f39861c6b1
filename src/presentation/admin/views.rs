use askama::Template;

use crate::domain::content::{
    About, Badge, BlogPost, EMPTY_CREDENTIAL_URL, Education, Experience, License, Portfolio,
};
use crate::presentation::views::{LayoutView, long_date, month_year};

#[derive(Clone)]
pub struct AdminMetricView {
    pub label: &'static str,
    pub value: Option<usize>,
    pub href: &'static str,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
pub struct AdminDashboardTemplate {
    pub layout: LayoutView,
    pub metrics: Vec<AdminMetricView>,
    pub uploads_enabled: bool,
}

/// One row of an admin content table.
pub struct AdminRowView {
    pub title: String,
    pub subtitle: String,
    pub edit_href: String,
    pub delete_href: String,
    pub public_href: Option<String>,
}

impl From<&Portfolio> for AdminRowView {
    fn from(project: &Portfolio) -> Self {
        Self {
            title: project.title.clone(),
            subtitle: month_year(&project.start_date),
            edit_href: format!("/admin/portfolio/{}/edit", project.id),
            delete_href: format!("/admin/portfolio/{}/delete", project.id),
            public_href: public_href("/portfolio", &project.slug, &project.id),
        }
    }
}

impl From<&BlogPost> for AdminRowView {
    fn from(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            subtitle: long_date(&post.date),
            edit_href: format!("/admin/blog/{}/edit", post.id),
            delete_href: format!("/admin/blog/{}/delete", post.id),
            public_href: public_href("/blog", &post.slug, &post.id),
        }
    }
}

impl From<&License> for AdminRowView {
    fn from(license: &License) -> Self {
        Self {
            title: license.name.clone(),
            subtitle: license.issuing_organization.clone(),
            edit_href: format!("/admin/licenses/{}/edit", license.id),
            delete_href: format!("/admin/licenses/{}/delete", license.id),
            public_href: None,
        }
    }
}

fn public_href(base: &str, slug: &str, id: &str) -> Option<String> {
    let key = if slug.is_empty() { id } else { slug };
    (!key.is_empty()).then(|| format!("{base}/{key}"))
}

#[derive(Template)]
#[template(path = "admin/list.html")]
pub struct AdminListTemplate {
    pub layout: LayoutView,
    pub heading: &'static str,
    pub new_href: &'static str,
    pub rows: Vec<AdminRowView>,
    pub error: Option<String>,
}

/// Form state shared by every editor: where it posts and what went wrong.
pub struct FormMeta {
    pub action: String,
    pub cancel_href: &'static str,
    pub errors: Vec<String>,
    pub uploads_enabled: bool,
}

impl FormMeta {
    pub fn new(action: impl Into<String>, cancel_href: &'static str, uploads_enabled: bool) -> Self {
        Self {
            action: action.into(),
            cancel_href,
            errors: Vec::new(),
            uploads_enabled,
        }
    }

    pub fn with_errors(self, errors: Vec<String>) -> Self {
        Self { errors, ..self }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioFormView {
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub image: String,
    pub description: String,
    pub video: String,
    pub tags: String,
    pub images: String,
}

impl From<&Portfolio> for PortfolioFormView {
    fn from(project: &Portfolio) -> Self {
        Self {
            title: project.title.clone(),
            start_date: project.start_date.clone(),
            end_date: project.end_date.clone(),
            image: project.image.clone(),
            description: project.description.clone(),
            video: project.video.clone().unwrap_or_default(),
            tags: project.tags.join(", "),
            images: project.images.join("\n"),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/portfolio_form.html")]
pub struct PortfolioFormTemplate {
    pub layout: LayoutView,
    pub meta: FormMeta,
    pub form: PortfolioFormView,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogFormView {
    pub title: String,
    pub date: String,
    pub tags: String,
    pub image: String,
    pub content: String,
    pub excerpt: String,
}

impl From<&BlogPost> for BlogFormView {
    fn from(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            date: post.date.clone(),
            tags: post.tags.join(", "),
            image: post.image.clone(),
            content: post.content.clone(),
            excerpt: post.excerpt.clone().unwrap_or_default(),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/blog_form.html")]
pub struct BlogFormTemplate {
    pub layout: LayoutView,
    pub meta: FormMeta,
    pub form: BlogFormView,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LicenseFormView {
    pub name: String,
    pub issuing_organization: String,
    pub issue_date: String,
    pub expiration_date: String,
    pub credential_url: String,
    pub image: String,
}

impl From<&License> for LicenseFormView {
    fn from(license: &License) -> Self {
        let credential_url = if license.credential_url == EMPTY_CREDENTIAL_URL {
            String::new()
        } else {
            license.credential_url.clone()
        };
        Self {
            name: license.name.clone(),
            issuing_organization: license.issuing_organization.clone(),
            issue_date: license.issue_date.clone(),
            expiration_date: license.expiration_date.clone(),
            credential_url,
            image: license.image.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "admin/license_form.html")]
pub struct LicenseFormTemplate {
    pub layout: LayoutView,
    pub meta: FormMeta,
    pub form: LicenseFormView,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AboutFormView {
    pub short_name: String,
    pub full_name: String,
    pub job: String,
    pub workplace: String,
    pub profile_image: String,
    pub email: String,
    pub instagram: String,
    pub linkedin: String,
    pub github: String,
    pub description: String,
    /// One `name|icon|color` badge per line.
    pub tech_stack: String,
    pub interests: String,
}

impl From<&About> for AboutFormView {
    fn from(about: &About) -> Self {
        let social = &about.social_media;
        Self {
            short_name: about.short_name.clone(),
            full_name: about.full_name.clone(),
            job: about.job.clone(),
            workplace: about.workplace.clone(),
            profile_image: about.profile_image.clone().unwrap_or_default(),
            email: social.email.clone().unwrap_or_default(),
            instagram: social.instagram.clone().unwrap_or_default(),
            linkedin: social.linkedin.clone().unwrap_or_default(),
            github: social.github.clone().unwrap_or_default(),
            description: about.description.clone(),
            tech_stack: badge_lines(&about.tech_stack),
            interests: badge_lines(&about.interests),
        }
    }
}

pub fn badge_lines(badges: &[Badge]) -> String {
    badges
        .iter()
        .map(|badge| format!("{}|{}|{}", badge.name, badge.icon, badge.color))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct ExperienceRowView {
    pub id: String,
    pub position: String,
    pub company: String,
    pub period: String,
}

impl From<&Experience> for ExperienceRowView {
    fn from(experience: &Experience) -> Self {
        Self {
            id: experience.id.clone(),
            position: experience.position.clone(),
            company: experience.company.clone(),
            period: admin_period(&experience.start_date, &experience.end_date),
        }
    }
}

pub struct EducationRowView {
    pub id: String,
    pub degree: String,
    pub institution: String,
    pub period: String,
}

impl From<&Education> for EducationRowView {
    fn from(education: &Education) -> Self {
        Self {
            id: education.id.clone(),
            degree: education.degree.clone(),
            institution: education.institution.clone(),
            period: admin_period(&education.start_date, &education.end_date),
        }
    }
}

fn admin_period(start: &str, end: &str) -> String {
    if end.trim().is_empty() {
        format!("{} - Present", month_year(start))
    } else {
        format!("{} - {}", month_year(start), month_year(end))
    }
}

#[derive(Template)]
#[template(path = "admin/about_form.html")]
pub struct AboutFormTemplate {
    pub layout: LayoutView,
    pub meta: FormMeta,
    pub form: AboutFormView,
    pub experiences: Vec<ExperienceRowView>,
    pub educations: Vec<EducationRowView>,
}

#[derive(Template)]
#[template(path = "admin/confirm.html")]
pub struct ConfirmTemplate {
    pub layout: LayoutView,
    pub prompt: String,
    pub action: String,
}
