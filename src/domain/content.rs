//! Content records held in the document store.
//!
//! Documents arrive as loosely shaped JSON; every read goes through
//! [`decode_record`] so a missing or mistyped field surfaces as a
//! [`MalformedRecordError`] instead of leaking into the views.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::{Date, macros::format_description};

use super::error::MalformedRecordError;

/// Logical collections of the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    About,
    Portfolio,
    BlogPosts,
    Licenses,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::About,
        Collection::Portfolio,
        Collection::BlogPosts,
        Collection::Licenses,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::About => "about",
            Collection::Portfolio => "portfolio",
            Collection::BlogPosts => "blogPosts",
            Collection::Licenses => "licenses",
        }
    }
}

/// Document id of the singleton profile inside [`Collection::About`].
pub const ABOUT_DOCUMENT_ID: &str = "about";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct About {
    pub short_name: String,
    pub full_name: String,
    pub job: String,
    pub workplace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub social_media: SocialMedia,
    pub description: String,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub tech_stack: Vec<Badge>,
    #[serde(default)]
    pub interests: Vec<Badge>,
}

impl Default for About {
    /// Placeholder profile shown until the owner saves a real one.
    fn default() -> Self {
        Self {
            short_name: "John Doe".to_string(),
            full_name: "John Doe".to_string(),
            job: "Software Engineer".to_string(),
            workplace: "Tech Company".to_string(),
            profile_image: Some("https://i.pravatar.cc/500".to_string()),
            social_media: SocialMedia {
                email: Some("john.doe@example.com".to_string()),
                instagram: Some("https://instagram.com/johndoe".to_string()),
                linkedin: Some("https://linkedin.com/in/johndoe".to_string()),
                github: Some("https://github.com/johndoe".to_string()),
            },
            description: "I am a passionate software engineer with experience in building web applications.".to_string(),
            experiences: Vec::new(),
            educations: Vec::new(),
            tech_stack: Vec::new(),
            interests: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialMedia {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: String,
    pub company: String,
    pub position: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

/// Named icon chip used for the tech stack and interests sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    #[serde(skip)]
    pub id: String,
    pub title: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub image: String,
    pub description: String,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    #[serde(skip)]
    pub id: String,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub issuing_organization: String,
    pub issue_date: String,
    #[serde(default)]
    pub expiration_date: String,
    #[serde(default = "default_credential_url")]
    pub credential_url: String,
    #[serde(default)]
    pub image: String,
}

/// Placeholder link stored when a license has no credential URL.
pub const EMPTY_CREDENTIAL_URL: &str = "#";

fn default_credential_url() -> String {
    EMPTY_CREDENTIAL_URL.to_string()
}

/// A content type persisted in its own collection under a store-assigned id.
pub trait ContentRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);
}

impl ContentRecord for Portfolio {
    const COLLECTION: Collection = Collection::Portfolio;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl ContentRecord for BlogPost {
    const COLLECTION: Collection = Collection::BlogPosts;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl ContentRecord for License {
    const COLLECTION: Collection = Collection::Licenses;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Content types that carry a URL slug.
pub trait Sluggable: ContentRecord {
    fn title(&self) -> &str;

    fn slug(&self) -> &str;

    fn set_slug(&mut self, slug: String);
}

impl Sluggable for Portfolio {
    fn title(&self) -> &str {
        &self.title
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn set_slug(&mut self, slug: String) {
        self.slug = slug;
    }
}

impl Sluggable for BlogPost {
    fn title(&self) -> &str {
        &self.title
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn set_slug(&mut self, slug: String) {
        self.slug = slug;
    }
}

/// Decode a stored document into `T`, attaching its id.
pub fn decode_record<T: ContentRecord>(id: &str, data: Value) -> Result<T, MalformedRecordError> {
    let mut record: T = serde_json::from_value(data)
        .map_err(|err| MalformedRecordError::new(T::COLLECTION.as_str(), id, err.to_string()))?;
    record.set_id(id.to_string());
    Ok(record)
}

/// Decode the singleton profile document.
pub fn decode_about(data: Value) -> Result<About, MalformedRecordError> {
    serde_json::from_value(data).map_err(|err| {
        MalformedRecordError::new(Collection::About.as_str(), ABOUT_DOCUMENT_ID, err.to_string())
    })
}

/// Serialize a record into the document body stored for it (the id is not part of the body).
pub fn encode_record<T: Serialize>(record: &T) -> Value {
    serde_json::to_value(record).unwrap_or(Value::Null)
}

/// Parse the leading `YYYY-MM-DD` of a stored date string.
pub fn parse_date(value: &str) -> Option<Date> {
    let format = format_description!("[year]-[month]-[day]");
    let head = value.trim().get(..10)?;
    Date::parse(head, format).ok()
}

/// Rewrite common YouTube watch/share links to their embeddable form.
///
/// Links that do not carry an eleven character video id are returned unchanged.
pub fn embed_video_url(url: &str) -> String {
    const MARKERS: [&str; 5] = ["watch?v=", "&v=", "embed/", "youtu.be/", "/v/"];

    let position = MARKERS
        .iter()
        .filter_map(|marker| url.rfind(marker).map(|index| index + marker.len()))
        .max();

    if let Some(start) = position {
        let rest = &url[start..];
        let end = rest.find(['#', '&', '?']).unwrap_or(rest.len());
        let id = &rest[..end];
        if id.len() == 11 {
            return format!("https://www.youtube.com/embed/{id}");
        }
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_record_attaches_id() {
        let post: BlogPost = decode_record(
            "abc",
            json!({
                "title": "First",
                "date": "2024-05-01",
                "content": "<p>Hi</p>",
                "slug": "first-12345"
            }),
        )
        .expect("decodes");
        assert_eq!(post.id, "abc");
        assert!(post.tags.is_empty());
        assert_eq!(post.slug, "first-12345");
    }

    #[test]
    fn decode_record_reports_missing_fields() {
        let err = decode_record::<Portfolio>("p1", json!({ "title": "No dates" }))
            .expect_err("missing fields");
        assert_eq!(err.collection, "portfolio");
        assert_eq!(err.id, "p1");
        assert!(err.reason.contains("startDate"), "{}", err.reason);
    }

    #[test]
    fn encode_record_omits_id() {
        let license = License {
            id: "l1".to_string(),
            name: "Cloud Practitioner".to_string(),
            issuing_organization: "AWS".to_string(),
            issue_date: "2023-02-01".to_string(),
            expiration_date: String::new(),
            credential_url: EMPTY_CREDENTIAL_URL.to_string(),
            image: String::new(),
        };
        let body = encode_record(&license);
        assert!(body.get("id").is_none());
        assert_eq!(body["issuingOrganization"], "AWS");
    }

    #[test]
    fn license_credential_url_defaults_to_placeholder() {
        let license: License = decode_record(
            "l2",
            json!({ "name": "CKA", "issuingOrganization": "CNCF", "issueDate": "2022-01-01" }),
        )
        .expect("decodes");
        assert_eq!(license.credential_url, EMPTY_CREDENTIAL_URL);
    }

    #[test]
    fn parse_date_accepts_iso_prefix() {
        assert_eq!(
            parse_date("2024-03-09T10:00:00Z"),
            Some(time::macros::date!(2024 - 03 - 09))
        );
        assert_eq!(parse_date("March 2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn embed_video_url_rewrites_youtube_links() {
        assert_eq!(
            embed_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        );
        assert_eq!(
            embed_video_url("https://youtu.be/dQw4w9WgXcQ"),
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        );
        assert_eq!(
            embed_video_url("https://vimeo.com/123"),
            "https://vimeo.com/123"
        );
    }
}
