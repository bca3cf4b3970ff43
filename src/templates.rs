use askama::Template;
use askama_web::WebTemplate;

#[derive(Template)]
#[template(path = "manifest.json", escape = "none")]
pub(crate) struct ManifestTemplate<'a> {
    pub(crate) app_name: &'a str,
}

#[derive(Template, WebTemplate)]
#[template(path = "push_subscribe.html")]
pub(crate) struct PushSubscribeTemplate {
    pub(crate) app_name: String,
    pub(crate) push_enabled: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "notify.html")]
pub(crate) struct NotifyTemplate {
    pub(crate) app_name: String,
    pub(crate) operator: String,
    pub(crate) subscriber_count: usize,
    pub(crate) houses: Vec<HouseOption>,
    pub(crate) push_enabled: bool,
}

pub(crate) struct HouseOption {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) total_points: i64,
}

#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub(crate) struct LoginTemplate {
    pub(crate) app_name: String,
    pub(crate) error: String,
    pub(crate) next: String,
}
