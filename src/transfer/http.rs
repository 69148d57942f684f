//! HTTP implementation of the multipart wire protocol.
//!
//! The storage endpoint speaks the S3 multipart surface over plain HTTP:
//! `POST {object}?uploads` to initiate, `PUT {object}?partNumber&uploadId`
//! per part, `POST {object}?uploadId` with the tag list to complete, and
//! `DELETE {object}?uploadId` to abort. Requests are unauthenticated; the
//! per-job unique id in the key prefix is the capability.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use super::backend::StoreBackend;
use super::error::StoreError;
use super::types::{CompletionRecord, PartTag};
use crate::target::UPLOAD_BUCKET;

/// Reqwest-backed [`StoreBackend`]
#[derive(Debug, Clone)]
pub struct HttpStoreBackend {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct InitiateResult {
    #[serde(rename = "UploadId", default)]
    upload_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct CompleteResult {
    #[serde(rename = "ETag", default)]
    etag: Option<String>,
    #[serde(rename = "Location", default)]
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResult {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

impl HttpStoreBackend {
    /// Wrap an already-configured client (timeout and TLS trust are the
    /// caller's transport decisions, made once per run).
    pub fn new(client: reqwest::Client) -> Self {
        HttpStoreBackend { client }
    }

    fn object_url(endpoint: &str, key: &str) -> String {
        // endpoint always ends in '/'
        format!("{}{}/{}", endpoint, UPLOAD_BUCKET, key)
    }

    async fn check_status(response: reqwest::Response) -> Result<String, StoreError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Decode the close response. The endpoint can answer HTTP 200 with an
/// `<Error>` document instead of a completion result, so the root element
/// decides how the body is read.
fn parse_complete_response(body: &str) -> Result<CompleteResult, StoreError> {
    match root_element_name(body) {
        Some("Error") => {
            let err: ErrorResult = quick_xml::de::from_str(body).unwrap_or_default();
            Err(StoreError::Protocol(format!(
                "close rejected: {}: {}",
                err.code, err.message
            )))
        }
        Some("CompleteMultipartUploadResult") => quick_xml::de::from_str(body)
            .map_err(|e| StoreError::Protocol(format!("bad close response: {e}"))),
        Some(other) => Err(StoreError::Protocol(format!(
            "unexpected close response root '{other}'"
        ))),
        None => Err(StoreError::Protocol(
            "close response is not well-formed XML".to_string(),
        )),
    }
}

fn root_element_name(xml: &str) -> Option<&str> {
    let rest = xml.trim_start();
    // Skip the XML declaration if present
    let rest = match rest.strip_prefix("<?") {
        Some(after) => after.split_once("?>")?.1.trim_start(),
        None => rest,
    };
    let name = rest.strip_prefix('<')?;
    let end = name.find(|c: char| c.is_whitespace() || c == '>' || c == '/')?;
    Some(&name[..end])
}

/// Serialize the ordered tag list as the completion request body
fn complete_body(tags: &[PartTag]) -> String {
    let mut body = String::from("<CompleteMultipartUpload>");
    for tag in tags {
        body.push_str(&format!(
            "<Part><PartNumber>{}</PartNumber><ETag>{}</ETag></Part>",
            tag.part_number, tag.etag
        ));
    }
    body.push_str("</CompleteMultipartUpload>");
    body
}

#[async_trait]
impl StoreBackend for HttpStoreBackend {
    async fn initiate(&self, endpoint: &str, key: &str) -> Result<String, StoreError> {
        let url = format!("{}?uploads", Self::object_url(endpoint, key));
        // The endpoint rejects an initiate without an explicit zero
        // Content-Length, so it is set rather than left to the client.
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(StoreError::from)?;

        let body = Self::check_status(response).await?;
        let parsed: InitiateResult = quick_xml::de::from_str(&body)
            .map_err(|e| StoreError::Protocol(format!("bad initiate response: {e}")))?;
        if parsed.upload_id.is_empty() {
            return Err(StoreError::Protocol(
                "no upload id in initiate response".to_string(),
            ));
        }
        Ok(parsed.upload_id)
    }

    async fn upload_part(
        &self,
        endpoint: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<PartTag, StoreError> {
        let url = format!(
            "{}?partNumber={}&uploadId={}",
            Self::object_url(endpoint, key),
            part_number,
            upload_id
        );
        let response = self
            .client
            .put(&url)
            .body(body)
            .send()
            .await
            .map_err(StoreError::from)?;

        let etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        Self::check_status(response).await?;

        let etag = etag.ok_or_else(|| {
            StoreError::Protocol(format!("no confirmation tag for part {part_number}"))
        })?;
        Ok(PartTag { part_number, etag })
    }

    async fn complete(
        &self,
        endpoint: &str,
        key: &str,
        upload_id: &str,
        tags: &[PartTag],
    ) -> Result<CompletionRecord, StoreError> {
        let url = format!("{}?uploadId={}", Self::object_url(endpoint, key), upload_id);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(complete_body(tags))
            .send()
            .await
            .map_err(StoreError::from)?;

        let body = Self::check_status(response).await?;
        let parsed = parse_complete_response(&body)?;
        Ok(CompletionRecord {
            key: key.to_string(),
            etag: parsed.etag,
            location: parsed.location,
        })
    }

    async fn abort(&self, endpoint: &str, key: &str, upload_id: &str) -> Result<(), StoreError> {
        let url = format!("{}?uploadId={}", Self::object_url(endpoint, key), upload_id);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(StoreError::from)?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url() {
        assert_eq!(
            HttpStoreBackend::object_url("https://host/Panopto/", "abc-123/lecture.mp4"),
            "https://host/Panopto/Upload/abc-123/lecture.mp4"
        );
    }

    #[test]
    fn test_complete_body_preserves_order() {
        let tags = vec![
            PartTag {
                part_number: 1,
                etag: "\"aaa\"".to_string(),
            },
            PartTag {
                part_number: 2,
                etag: "\"bbb\"".to_string(),
            },
        ];
        assert_eq!(
            complete_body(&tags),
            "<CompleteMultipartUpload>\
             <Part><PartNumber>1</PartNumber><ETag>\"aaa\"</ETag></Part>\
             <Part><PartNumber>2</PartNumber><ETag>\"bbb\"</ETag></Part>\
             </CompleteMultipartUpload>"
        );
    }

    #[test]
    fn test_parse_initiate_response() {
        let body = r#"<?xml version="1.0"?>
<InitiateMultipartUploadResult>
  <Bucket>Upload</Bucket>
  <Key>abc-123/lecture.mp4</Key>
  <UploadId>upload-42</UploadId>
</InitiateMultipartUploadResult>"#;
        let parsed: InitiateResult = quick_xml::de::from_str(body).unwrap();
        assert_eq!(parsed.upload_id, "upload-42");
    }

    #[test]
    fn test_parse_complete_response() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUploadResult>
  <Location>https://host/Panopto/Upload/abc/lecture.mp4</Location>
  <ETag>"deadbeef"</ETag>
</CompleteMultipartUploadResult>"#;
        let parsed = parse_complete_response(body).unwrap();
        assert_eq!(parsed.etag.as_deref(), Some("\"deadbeef\""));
        assert!(parsed.location.unwrap().ends_with("lecture.mp4"));
    }

    #[test]
    fn test_complete_error_document_with_success_status() {
        // Some endpoints answer 200 and put the failure in the body
        let body = r#"<Error>
  <Code>InvalidPart</Code>
  <Message>One or more of the specified parts could not be found.</Message>
</Error>"#;
        let err = parse_complete_response(body).unwrap_err();
        match err {
            StoreError::Protocol(detail) => {
                assert!(detail.contains("InvalidPart"));
                assert!(detail.contains("could not be found"));
            }
            other => panic!("expected Protocol, got: {other:?}"),
        }
    }

    #[test]
    fn test_complete_garbage_body_is_protocol_error() {
        assert!(matches!(
            parse_complete_response("not xml at all"),
            Err(StoreError::Protocol(_))
        ));
        assert!(matches!(
            parse_complete_response("<SomethingElse/>"),
            Err(StoreError::Protocol(_))
        ));
    }

    #[test]
    fn test_root_element_name() {
        assert_eq!(
            root_element_name("<?xml version=\"1.0\"?>\n<Error><Code>x</Code></Error>"),
            Some("Error")
        );
        assert_eq!(root_element_name("<SomethingElse/>"), Some("SomethingElse"));
        assert_eq!(root_element_name("plain text"), None);
    }
}
