use agridoctor::AgriClient;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Deserialize)]
pub struct Fixture {
    #[serde(rename = "_meta")]
    pub meta: Option<FixtureMeta>,
    pub request: FixtureRequest,
    pub response: FixtureResponse,
}

#[derive(Deserialize)]
pub struct FixtureMeta {
    /// Token the request must carry as `Authorization: Bearer <token>`
    pub bearer: Option<String>,
}

#[derive(Deserialize)]
pub struct FixtureRequest {
    pub method: String,
    pub path: String,
}

#[derive(Deserialize)]
pub struct FixtureResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
}

pub struct AgriMock {
    pub server: MockServer,
}

impl AgriMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    fn load(fixture_path: &str) -> Fixture {
        let full_path = Self::fixtures_dir().join(fixture_path);

        let content = fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", full_path.display(), e));

        serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", full_path.display(), e))
    }

    fn mock_for(fixture: &Fixture) -> Mock {
        let mut builder = Mock::given(method(fixture.request.method.as_str()))
            .and(path(fixture.request.path.as_str()));

        if let Some(bearer) = fixture.meta.as_ref().and_then(|meta| meta.bearer.as_deref()) {
            builder = builder.and(header("authorization", format!("Bearer {bearer}").as_str()));
        }

        builder.respond_with(
            ResponseTemplate::new(fixture.response.status_code)
                .set_body_json(&fixture.response.body),
        )
    }

    #[allow(dead_code)]
    pub async fn mount_fixture(&self, fixture_path: &str) {
        Self::mock_for(&Self::load(fixture_path))
            .mount(&self.server)
            .await;
    }

    /// Mounts a fixture that must be hit exactly `times` times, checked on drop.
    #[allow(dead_code)]
    pub async fn mount_fixture_expect(&self, fixture_path: &str, times: u64) {
        Self::mock_for(&Self::load(fixture_path))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Fails the test if any request reaches the server.
    #[allow(dead_code)]
    pub async fn forbid_requests(&self) {
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    pub fn client(&self) -> AgriClient {
        AgriClient::new(format!("{}/api", self.server.uri()))
    }

    #[allow(dead_code)]
    pub fn authed_client(&self) -> AgriClient {
        self.client().with_token("test_token")
    }
}

/// A client pointed at a port nothing listens on.
#[allow(dead_code)]
pub fn unreachable_client() -> AgriClient {
    AgriClient::new("http://127.0.0.1:1/api")
}
