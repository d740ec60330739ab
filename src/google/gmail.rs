//! Gmail API client for listing unread mail, fetching threads, and
//! saving or sending replies.

use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::provider::ProviderError;

// Gmail hands out base64url both with and without padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Message and thread structures from Gmail API documentation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageResponse {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Option<Vec<MessageResponse>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub snippet: Option<String>,
    pub payload: Option<MessagePayload>,
    #[serde(rename = "labelIds")]
    pub label_ids: Option<Vec<String>>,
    #[serde(rename = "internalDate")]
    pub internal_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePartBody {
    #[serde(rename = "attachmentId")]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub size: u64,
    // Base64url encoded
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "partId")]
    pub part_id: Option<String>,
    #[serde(rename = "mimeType")]
    pub mimetype: String,
    pub headers: Option<Vec<MessageHeader>>,
    pub body: Option<MessagePartBody>,
    // multipart/* parts nest further parts
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub headers: Option<Vec<MessageHeader>>,
    #[serde(rename = "mimeType")]
    pub mimetype: String,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct ResourceId {
    id: String,
}

impl Message {
    /// Header value by exact (case-sensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .as_ref()?
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}

/// Decode a base64url body. Returns `None` when the data isn't valid
/// base64 or doesn't decode to UTF-8.
pub fn decode_base64(data: &str) -> Option<String> {
    URL_SAFE_LENIENT
        .decode(data.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

/// base64url encode without padding, the format of the `raw` field
pub fn base64_url_no_pad(input: &[u8]) -> String {
    URL_SAFE_LENIENT.encode(input)
}

async fn read_response(
    res: reqwest::Response,
    context: &str,
) -> Result<String, ProviderError> {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        tracing::warn!("{} returned {}", context, status);
        return Err(ProviderError::from_status(status, context, &text));
    }
    Ok(text)
}

fn parse<T: serde::de::DeserializeOwned>(text: &str, context: &str) -> Result<T, ProviderError> {
    serde_json::from_str(text)
        .map_err(|e| ProviderError::transient(format!("{} returned malformed json: {}", context, e)))
}

/// List unread inbox messages, newest first.
pub async fn list_unread_messages(
    client: &Client,
    base_url: &str,
    access_token: &str,
    max_results: usize,
) -> Result<Vec<MessageResponse>, ProviderError> {
    let url = format!(
        "{}/gmail/v1/users/me/messages?labelIds=UNREAD&q=is:unread%20in:inbox&maxResults={}",
        base_url, max_results
    );
    let res = client.get(&url).bearer_auth(access_token).send().await?;
    let text = read_response(res, "Unread fetch").await?;
    let msgs: ListMessagesResponse = parse(&text, "Unread fetch")?;
    Ok(msgs.messages.unwrap_or_default())
}

/// Fetch full thread for a given threadId
pub async fn fetch_thread(
    client: &Client,
    base_url: &str,
    access_token: &str,
    thread_id: &str,
) -> Result<Thread, ProviderError> {
    let url = format!(
        "{}/gmail/v1/users/me/threads/{}?format=full",
        base_url, thread_id
    );
    let res = client.get(&url).bearer_auth(access_token).send().await?;
    let text = read_response(res, "Thread fetch").await?;
    parse(&text, "Thread fetch")
}

/// Fetch only the requested headers of a message
pub async fn fetch_message_metadata(
    client: &Client,
    base_url: &str,
    access_token: &str,
    message_id: &str,
    header_names: &[&str],
) -> Result<Vec<MessageHeader>, ProviderError> {
    let mut url = format!(
        "{}/gmail/v1/users/me/messages/{}?format=metadata",
        base_url, message_id
    );
    for name in header_names {
        url.push_str("&metadataHeaders=");
        url.push_str(name);
    }
    let res = client.get(&url).bearer_auth(access_token).send().await?;
    let text = read_response(res, "Metadata fetch").await?;
    let message: Message = parse(&text, "Metadata fetch")?;
    Ok(message
        .payload
        .and_then(|p| p.headers)
        .unwrap_or_default())
}

pub async fn create_draft(
    client: &Client,
    base_url: &str,
    access_token: &str,
    thread_id: &str,
    raw: &str,
) -> Result<String, ProviderError> {
    let url = format!("{}/gmail/v1/users/me/drafts", base_url);
    let payload = json!({"message": {"threadId": thread_id, "raw": raw}});
    let res = client
        .post(&url)
        .bearer_auth(access_token)
        .json(&payload)
        .send()
        .await?;
    let text = read_response(res, "Draft create").await?;
    let draft: ResourceId = parse(&text, "Draft create")?;
    Ok(draft.id)
}

pub async fn send_message(
    client: &Client,
    base_url: &str,
    access_token: &str,
    thread_id: &str,
    raw: &str,
) -> Result<String, ProviderError> {
    let url = format!("{}/gmail/v1/users/me/messages/send", base_url);
    let payload = json!({"threadId": thread_id, "raw": raw});
    let res = client
        .post(&url)
        .bearer_auth(access_token)
        .json(&payload)
        .send()
        .await?;
    let text = read_response(res, "Message send").await?;
    let sent: ResourceId = parse(&text, "Message send")?;
    Ok(sent.id)
}

/// Mark every message in the thread as read
pub async fn remove_unread_label(
    client: &Client,
    base_url: &str,
    access_token: &str,
    thread_id: &str,
) -> Result<(), ProviderError> {
    let url = format!("{}/gmail/v1/users/me/threads/{}/modify", base_url, thread_id);
    let payload = json!({"removeLabelIds": ["UNREAD"]});
    let res = client
        .post(&url)
        .bearer_auth(access_token)
        .json(&payload)
        .send()
        .await?;
    read_response(res, "Thread modify").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::provider::ProviderErrorKind;

    #[test]
    fn test_decode_base64() {
        // Padded and unpadded forms of "Test body"
        assert_eq!(decode_base64("VGVzdCBib2R5").as_deref(), Some("Test body"));
        assert_eq!(decode_base64("SGVsbG8=").as_deref(), Some("Hello"));
        assert_eq!(decode_base64("SGVsbG8").as_deref(), Some("Hello"));
        // URL-safe alphabet
        assert_eq!(decode_base64("Pz8_").as_deref(), Some("???"));
        assert_eq!(decode_base64("not base64!"), None);
    }

    #[test]
    fn test_base64_url_no_pad() {
        assert_eq!(base64_url_no_pad(b"Hello"), "SGVsbG8");
        assert_eq!(base64_url_no_pad(b""), "");
        assert_eq!(base64_url_no_pad(b"???"), "Pz8_");
    }

    #[test]
    fn test_header_lookup_is_case_sensitive() {
        let message: Message = serde_json::from_str(
            r#"{
                "id": "m1",
                "threadId": "t1",
                "payload": {
                    "mimeType": "text/plain",
                    "headers": [
                        {"name": "From", "value": "alice@example.com"},
                        {"name": "subject", "value": "lowercase"}
                    ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(message.header("From"), Some("alice@example.com"));
        assert_eq!(message.header("Subject"), None);
        assert_eq!(message.internal_date, None);
    }

    #[tokio::test]
    async fn test_list_unread_messages() {
        let mut server = mockito::Server::new_async().await;
        let mock_resp = r#"{"messages": [{"id": "msg_001", "threadId": "thr_001"}], "nextPageToken": null}"#;
        let mock = server
            .mock("GET", "/gmail/v1/users/me/messages")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("labelIds".into(), "UNREAD".into()),
                mockito::Matcher::UrlEncoded("maxResults".into(), "5".into()),
            ]))
            .match_header("authorization", "Bearer test_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(mock_resp)
            .create_async()
            .await;

        let msgs = list_unread_messages(&Client::new(), &server.url(), "test_token", 5)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].thread_id, "thr_001");
    }

    #[tokio::test]
    async fn test_list_unread_messages_empty_inbox() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gmail/v1/users/me/messages")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"resultSizeEstimate": 0}"#)
            .create_async()
            .await;

        let msgs = list_unread_messages(&Client::new(), &server.url(), "t", 5)
            .await
            .unwrap();
        assert!(msgs.is_empty());
    }

    #[tokio::test]
    async fn test_list_unread_messages_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gmail/v1/users/me/messages")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"message": "Unauthorized"}}"#)
            .create_async()
            .await;

        let err = list_unread_messages(&Client::new(), &server.url(), "bad_token", 5)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_fetch_thread() {
        let mut server = mockito::Server::new_async().await;
        let mock_resp = r#"{
            "id": "thr_001",
            "messages": [
                {
                    "id": "msg_001a",
                    "threadId": "thr_001",
                    "snippet": "Test snippet",
                    "labelIds": ["INBOX"],
                    "internalDate": "1731401723000",
                    "payload": {
                        "mimeType": "multipart/alternative",
                        "headers": [
                            {"name": "From", "value": "test@example.com"},
                            {"name": "To", "value": "me@example.org"},
                            {"name": "Subject", "value": "Test Thread"}
                        ],
                        "parts": [
                            {"partId": "0", "mimeType": "text/plain", "body": {"size": 9, "data": "VGVzdCBib2R5"}},
                            {"partId": "1", "mimeType": "text/html", "body": {"size": 16, "data": "PHA-VGVzdDwvcD4"}}
                        ]
                    }
                }
            ]
        }"#;
        let mock = server
            .mock("GET", "/gmail/v1/users/me/threads/thr_001")
            .match_query(mockito::Matcher::UrlEncoded("format".into(), "full".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(mock_resp)
            .create_async()
            .await;

        let thread = fetch_thread(&Client::new(), &server.url(), "test_token", "thr_001")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(thread.id, "thr_001");
        assert_eq!(thread.messages.len(), 1);
        let parts = thread.messages[0].payload.as_ref().unwrap().parts.as_ref().unwrap();
        assert_eq!(parts[1].mimetype, "text/html");
    }

    #[tokio::test]
    async fn test_fetch_message_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/gmail/v1/users/me/messages/msg_1")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("format".into(), "metadata".into()),
                mockito::Matcher::UrlEncoded("metadataHeaders".into(), "Subject".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"id": "msg_1", "threadId": "thr_1", "payload": {"mimeType": "text/html",
                    "headers": [{"name": "From", "value": "a@example.com"}, {"name": "Subject", "value": "Hi"}]}}"#,
            )
            .create_async()
            .await;

        let headers = fetch_message_metadata(
            &Client::new(),
            &server.url(),
            "t",
            "msg_1",
            &["From", "Subject"],
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[1].value, "Hi");
    }

    #[tokio::test]
    async fn test_create_draft() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/gmail/v1/users/me/drafts")
            .match_body(mockito::Matcher::Json(
                json!({"message": {"threadId": "thread_123", "raw": "cmF3"}}),
            ))
            .with_status(200)
            .with_body(r#"{"id": "draft_123", "message": {"id": "m", "threadId": "thread_123"}}"#)
            .create_async()
            .await;

        let id = create_draft(&Client::new(), &server.url(), "t", "thread_123", "cmF3")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(id, "draft_123");
    }

    #[tokio::test]
    async fn test_send_message_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gmail/v1/users/me/messages/send")
            .with_status(429)
            .with_body(r#"{"error": {"message": "Rate Limit Exceeded"}}"#)
            .create_async()
            .await;

        let err = send_message(&Client::new(), &server.url(), "t", "thread_123", "cmF3")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::QuotaOrPermission);
        assert!(err.message.contains("Rate Limit Exceeded"));
    }

    #[tokio::test]
    async fn test_send_message_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gmail/v1/users/me/messages/send")
            .with_status(503)
            .with_body("backend unavailable")
            .create_async()
            .await;

        let err = send_message(&Client::new(), &server.url(), "t", "thread_123", "cmF3")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_remove_unread_label() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/gmail/v1/users/me/threads/thread_123/modify")
            .match_body(mockito::Matcher::Json(json!({"removeLabelIds": ["UNREAD"]})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        remove_unread_label(&Client::new(), &server.url(), "t", "thread_123")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
