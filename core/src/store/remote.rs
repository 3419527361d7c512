use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use super::{Settings, VideoDraft, VideoRecord, VideoStore, new_record_id};
use crate::config::SignageConfig;
use crate::{Error, Result};

/// Signed-in admin session
#[derive(Debug, Clone)]
struct Session {
    access_token: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RecordPatch<'a> {
    title: &'a str,
    url: &'a str,
    #[serde(rename = "loop")]
    loop_enabled: bool,
}

/// Hosted PostgREST table plus password auth, spoken over blocking HTTP.
///
/// Reads go out with the anon key; mutations need a session from
/// [`VideoStore::authenticate`].
pub struct RemoteStore {
    client: Client,
    base_url: String,
    anon_key: String,
    table: String,
    session: Option<Session>,
}

impl RemoteStore {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        table: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            table: table.into(),
            session: None,
        })
    }

    pub fn from_config(config: &SignageConfig) -> Result<Self> {
        let (Some(url), Some(key)) = (&config.remote.url, &config.remote.anon_key) else {
            return Err(Error::Config(
                "remote store needs SUPABASE_URL and SUPABASE_ANON_KEY".to_string(),
            ));
        };
        info!("Using remote store {} (table {})", url, config.remote.table);
        Self::new(url, key, &config.remote.table, config.request_timeout())
    }

    /// Email of the signed-in admin
    pub fn session_email(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.email.as_deref())
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn list_url(&self) -> String {
        format!("{}?select=*&order=created_at.asc", self.table_url())
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}?id=eq.{}", self.table_url(), urlencoding::encode(id))
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let token = self
            .session
            .as_ref()
            .map(|s| s.access_token.as_str())
            .unwrap_or(&self.anon_key);
        debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    fn require_session(&self) -> Result<()> {
        if self.session.is_none() {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    /// Mutations ask for the affected rows back so a missing id shows up
    /// as an empty array instead of a silent no-op.
    fn mutate(&self, method: Method, id: &str, body: Option<&RecordPatch<'_>>) -> Result<()> {
        self.require_session()?;
        let mut request = self
            .request(method, &self.record_url(id))
            .header("Prefer", "return=representation");
        if let Some(body) = body {
            request = request.json(body);
        }
        let rows: Vec<VideoRecord> = check(request.send()?)?.json()?;
        if rows.is_empty() {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Map non-success responses onto the error taxonomy
fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        warn!("Store rejected credentials: {}", error_message(&body));
        return Err(Error::Unauthorized);
    }
    Err(Error::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Pull a human readable message out of an error body. The REST and auth
/// endpoints use different field names.
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["message", "error_description", "msg", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

impl VideoStore for RemoteStore {
    fn describe(&self) -> String {
        format!("remote table: {}", self.table)
    }

    fn requires_auth(&self) -> bool {
        true
    }

    fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    fn authenticate(&mut self, email: &str, password: &str) -> Result<()> {
        if email.trim().is_empty() {
            return Err(Error::MissingField("email"));
        }
        if password.is_empty() {
            return Err(Error::MissingField("password"));
        }
        let response = self
            .client
            .post(self.auth_url("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&Credentials {
                email: email.trim(),
                password,
            })
            .send()?;
        let token: TokenResponse = check(response)?.json()?;
        let email = token
            .user
            .and_then(|u| u.email)
            .or_else(|| Some(email.trim().to_string()));
        info!("Signed in as {}", email.as_deref().unwrap_or("admin"));
        self.session = Some(Session {
            access_token: token.access_token,
            email,
        });
        Ok(())
    }

    fn sign_out(&mut self) -> Result<()> {
        if self.session.is_none() {
            return Ok(());
        }
        let result = self
            .request(Method::POST, &self.auth_url("logout"))
            .send()
            .map_err(Error::from)
            .and_then(check);
        // The local session is dropped even if the server call failed
        self.session = None;
        if let Err(e) = result {
            warn!("Sign-out request failed: {}", e);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<VideoRecord>> {
        let response = self.request(Method::GET, &self.list_url()).send()?;
        let records: Vec<VideoRecord> = check(response)?.json()?;
        debug!("Fetched {} records", records.len());
        Ok(records)
    }

    fn create(&mut self, draft: &VideoDraft) -> Result<VideoRecord> {
        let draft = draft.validated()?;
        self.require_session()?;
        let record = draft.into_record(new_record_id());
        let response = self
            .request(Method::POST, &self.table_url())
            .header("Prefer", "return=minimal")
            .json(&[&record])
            .send()?;
        check(response)?;
        info!("Created remote record {}", record.id);
        Ok(record)
    }

    fn update(&mut self, id: &str, draft: &VideoDraft) -> Result<()> {
        let draft = draft.validated()?;
        let patch = RecordPatch {
            title: &draft.title,
            url: &draft.url,
            loop_enabled: draft.loop_enabled,
        };
        self.mutate(Method::PATCH, id, Some(&patch))
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.mutate(Method::DELETE, id, None)
    }

    /// The kiosk plays the first channel in creation order
    fn settings(&self) -> Result<Settings> {
        Ok(self
            .list()?
            .into_iter()
            .next()
            .map(|r| Settings {
                video_url: r.url,
                loop_enabled: r.loop_enabled,
            })
            .unwrap_or_default())
    }

    fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        let settings = settings.validated()?;
        self.require_session()?;
        let mut draft = VideoDraft::new("Default", settings.video_url);
        draft.loop_enabled = settings.loop_enabled;
        match self.list()?.into_iter().next() {
            Some(first) => {
                draft.title = first.title;
                self.update(&first.id, &draft)
            }
            None => self.create(&draft).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc::{self, Receiver};
    use std::thread;

    /// Serve one canned `(status, body)` per connection, in order, and hand
    /// back each raw request.
    fn serve(replies: Vec<(u16, &'static str)>) -> (String, Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for (status, body) in replies {
                let (mut stream, _) = listener.accept().unwrap();
                let request = read_request(&mut stream);
                let _ = tx.send(request);
                let reply = format!(
                    "HTTP/1.1 {status} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
        });
        (base, rx)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break raw.len();
            }
            raw.extend_from_slice(&chunk[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&raw[..header_end]).to_lowercase();
        let length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while raw.len() < header_end + length {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&raw).into_owned()
    }

    fn local_store(base: &str, signed_in: bool) -> RemoteStore {
        let mut store = RemoteStore::new(base, "anon", "t", Duration::from_secs(5)).unwrap();
        store.client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        if signed_in {
            store.session = Some(Session {
                access_token: "tok".to_string(),
                email: None,
            });
        }
        store
    }

    const TWO_ROWS: &str = r#"[
        {"id":"vid_1","title":"Lobby","url":"https://youtu.be/dQw4w9WgXcQ","loop":false,"created_at":"2024-01-01T00:00:00Z"},
        {"id":"vid_2","title":"Hall","url":"https://cdn.example.com/b.mp4","loop":true}
    ]"#;

    fn store() -> RemoteStore {
        RemoteStore::new(
            "https://demo.supabase.co/",
            "anon",
            "pixeltv_final",
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let store = store();
        assert_eq!(
            store.list_url(),
            "https://demo.supabase.co/rest/v1/pixeltv_final?select=*&order=created_at.asc"
        );
        assert_eq!(
            store.record_url("vid 1"),
            "https://demo.supabase.co/rest/v1/pixeltv_final?id=eq.vid%201"
        );
        assert_eq!(
            store.auth_url("token?grant_type=password"),
            "https://demo.supabase.co/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn test_mutations_need_session() {
        let mut store = store();
        assert!(store.requires_auth());
        assert!(!store.is_authenticated());

        let draft = VideoDraft::new("Lobby", "https://youtu.be/dQw4w9WgXcQ");
        assert!(matches!(store.create(&draft), Err(Error::Unauthorized)));
        assert!(matches!(store.update("vid_1", &draft), Err(Error::Unauthorized)));
        assert!(matches!(store.delete("vid_1"), Err(Error::Unauthorized)));
    }

    #[test]
    fn test_invalid_draft_rejected_before_auth() {
        let mut store = store();
        let draft = VideoDraft::new("Lobby", "not a link");
        assert!(matches!(store.create(&draft), Err(Error::InvalidLink)));
    }

    #[test]
    fn test_sign_out_without_session_is_noop() {
        let mut store = store();
        assert!(store.sign_out().is_ok());
    }

    #[test]
    fn test_login_requires_fields() {
        let mut store = store();
        assert!(matches!(store.authenticate(" ", "pw"), Err(Error::MissingField("email"))));
        assert!(matches!(
            store.authenticate("a@b.c", ""),
            Err(Error::MissingField("password"))
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"code":"42P01","message":"relation does not exist"}"#),
            "relation does not exist"
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(" upstream timeout \n"), "upstream timeout");
    }

    #[test]
    fn test_list_decodes_rows() {
        let (base, requests) = serve(vec![(200, TWO_ROWS)]);
        let store = local_store(&base, false);

        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "vid_1");
        assert!(!records[0].loop_enabled);
        assert_eq!(records[0].created_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(records[1].created_at, None);

        let request = requests.recv().unwrap();
        assert!(request.starts_with("GET /rest/v1/t?select=*&order=created_at.asc "));
        let lower = request.to_lowercase();
        assert!(lower.contains("apikey: anon"));
        assert!(lower.contains("authorization: bearer anon"));
    }

    #[test]
    fn test_settings_come_from_first_record() {
        let (base, _requests) = serve(vec![(200, TWO_ROWS), (200, "[]")]);
        let store = local_store(&base, false);

        let settings = store.settings().unwrap();
        assert_eq!(settings.video_url, "https://youtu.be/dQw4w9WgXcQ");
        assert!(!settings.loop_enabled);

        // An empty table yields the default settings
        assert_eq!(store.settings().unwrap(), Settings::default());
    }

    #[test]
    fn test_save_settings_updates_first_record() {
        let updated = r#"[{"id":"vid_1","title":"Lobby","url":"https://cdn.example.com/new.mp4","loop":true}]"#;
        let (base, requests) = serve(vec![(200, TWO_ROWS), (200, updated)]);
        let mut store = local_store(&base, true);

        let settings = Settings {
            video_url: "https://cdn.example.com/new.mp4".to_string(),
            loop_enabled: true,
        };
        store.save_settings(&settings).unwrap();

        let _list = requests.recv().unwrap();
        let patch = requests.recv().unwrap();
        assert!(patch.starts_with("PATCH /rest/v1/t?id=eq.vid_1 "));
        let lower = patch.to_lowercase();
        assert!(lower.contains("authorization: bearer tok"));
        assert!(lower.contains("prefer: return=representation"));
        assert!(patch.contains(r#""title":"Lobby""#));
        assert!(patch.contains(r#""url":"https://cdn.example.com/new.mp4""#));
        assert!(patch.contains(r#""loop":true"#));
    }

    #[test]
    fn test_save_settings_creates_default_when_empty() {
        let (base, requests) = serve(vec![(200, "[]"), (201, "")]);
        let mut store = local_store(&base, true);

        let settings = Settings {
            video_url: "https://cdn.example.com/a.mp4".to_string(),
            loop_enabled: false,
        };
        store.save_settings(&settings).unwrap();

        let _list = requests.recv().unwrap();
        let post = requests.recv().unwrap();
        assert!(post.starts_with("POST /rest/v1/t "));
        assert!(post.to_lowercase().contains("prefer: return=minimal"));
        assert!(post.contains(r#""title":"Default""#));
        assert!(post.contains(r#""loop":false"#));
        assert!(post.contains(r#""id":"vid_"#));
    }

    #[test]
    fn test_create_returns_new_record() {
        let (base, requests) = serve(vec![(201, "")]);
        let mut store = local_store(&base, true);

        let record = store
            .create(&VideoDraft::new("Lobby", "https://youtu.be/dQw4w9WgXcQ"))
            .unwrap();
        assert!(record.id.starts_with("vid_"));
        assert_eq!(record.title, "Lobby");

        let post = requests.recv().unwrap();
        assert!(post.contains(&format!(r#"[{{"id":"{}""#, record.id)));
    }

    #[test]
    fn test_mutation_on_missing_id_is_not_found() {
        let (base, _requests) = serve(vec![(200, "[]"), (200, "[]")]);
        let mut store = local_store(&base, true);

        assert!(matches!(store.delete("vid_9"), Err(Error::NotFound(id)) if id == "vid_9"));
        let draft = VideoDraft::new("Lobby", "https://youtu.be/dQw4w9WgXcQ");
        assert!(matches!(store.update("vid_9", &draft), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_rejected_token_is_unauthorized() {
        let (base, _requests) = serve(vec![
            (401, r#"{"message":"JWT expired"}"#),
            (500, r#"{"message":"relation does not exist"}"#),
        ]);
        let mut store = local_store(&base, true);

        assert!(matches!(store.delete("vid_1"), Err(Error::Unauthorized)));
        assert!(matches!(
            store.list(),
            Err(Error::Api { status: 500, message }) if message == "relation does not exist"
        ));
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = SignageConfig::default();
        assert!(matches!(RemoteStore::from_config(&config), Err(Error::Config(_))));
    }
}
