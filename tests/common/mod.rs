//! Shared fixtures for the end-to-end tests: a mock catalog site and configs

#![allow(dead_code)]

use dokkan_archive::config::{parse_config, Config};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A card served by the mock site
pub struct SiteCard {
    pub id: String,
    pub name: String,
    pub rarity: &'static str,
    pub card_type: &'static str,
    pub ultra_super_attack: bool,
}

impl SiteCard {
    pub fn new(id: &str, name: &str, rarity: &'static str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            rarity,
            card_type: "str",
            ultra_super_attack: false,
        }
    }

    pub fn with_ultra(mut self) -> Self {
        self.ultra_super_attack = true;
        self
    }

    pub fn html(&self) -> String {
        let ultra = if self.ultra_super_attack {
            "<div><b>Ultra Super Attack</b></div><div>Ultimate Kamehameha</div><div>Causes mega-colossal damage</div>"
        } else {
            ""
        };
        format!(
            r#"<html><head><title>Dokkan Info - {name}</title></head><body>
              <h1>{name}</h1>
              <div class="card-icon-item card-icon-item-rarity card-info-above-thumb">
                <img src="/layout/cha_rare_sm_{rarity}.png">
              </div>
              <div class="row justify-content-center align-items-center padding-top-bottom-10 border border-2 border-{card_type}">
                <img src="/character/card/card_{id}_character.png">
              </div>
              <div><b>Leader Skill</b></div><div>Ki +3 for card {id}</div>
              <div><b>Super Attack</b></div><div>Kamehameha</div><div>Causes immense damage</div>
              {ultra}
            </body></html>"#,
            name = self.name,
            rarity = self.rarity,
            card_type = self.card_type,
            id = self.id,
            ultra = ultra,
        )
    }
}

pub fn list_html(ids: &[&str], next_page: Option<u32>) -> String {
    let anchors: String = ids
        .iter()
        .map(|id| format!(r#"<a class="col-auto" href="/cards/{}">card {}</a>"#, id, id))
        .collect();
    let next = next_page
        .map(|p| format!(r#"<a rel="next" href="/cards?sort=open_at&page={}">Next</a>"#, p))
        .unwrap_or_default();
    format!(
        r#"<html><body><div class="row d-flex flex-wrap justify-content-center">{}</div>{}</body></html>"#,
        anchors, next
    )
}

/// Serves `ids` on list page `page`; later pages are left unmounted (404)
pub async fn mount_list_page(server: &MockServer, page: u32, ids: &[&str], next_page: Option<u32>) {
    Mock::given(method("GET"))
        .and(path("/cards"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_html(ids, next_page)))
        .mount(server)
        .await;
}

/// Serves one card's detail page, expecting it to be fetched `expected` times
pub async fn mount_card(server: &MockServer, card: &SiteCard, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/cards/{}", card.id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(card.html()))
        .expect(expected)
        .mount(server)
        .await;
}

/// Builds a validated config pointing at `base_url` with fast, single-attempt fetching
pub fn test_config(base_url: &str, database_path: &Path, max_new_items: u32) -> Config {
    let export_path = database_path.with_extension("json");
    parse_config(&format!(
        r#"
[crawler]
max-new-items = {max_new_items}
concurrency = 2
rate-limit-ms = 0
request-timeout-secs = 5
max-attempts = 1

[source]
base-url = "{base_url}"

[user-agent]
crawler-name = "DokkanArchiveTest"
crawler-version = "0.3"
contact-url = "https://example.com/about"
contact-email = "test@example.com"

[output]
database-path = "{database}"
export-path = "{export}"
"#,
        max_new_items = max_new_items,
        base_url = base_url,
        database = database_path.display(),
        export = export_path.display(),
    ))
    .expect("test config is valid")
}
