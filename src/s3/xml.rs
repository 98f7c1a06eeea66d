//! XML codec for the handful of S3 response/request bodies the proxy touches.
//!
//! Event-based parsing with byte-slice tag matching; no DOM, no serde-XML.
//! Unknown elements are skipped so backend dialect differences don't break
//! the proxy.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::client::{CompletedPart, S3Error};
use crate::models::bucket::BucketSummary;
use crate::models::object::ObjectDescriptor;

/// Decoded `ListBucketResult` page.
#[derive(Debug, Default, PartialEq)]
pub struct ListObjectsPage {
    pub objects: Vec<ObjectDescriptor>,
    pub is_truncated: bool,
    /// Opaque continuation token, absent on the last page.
    pub next_continuation_token: Option<String>,
}

fn decode_err(err: impl std::fmt::Display) -> S3Error {
    S3Error::Decode(err.to_string())
}

/// Parse a `ListObjectsV2` response body.
pub fn parse_list_objects(xml: &[u8]) -> Result<ListObjectsPage, S3Error> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut page = ListObjectsPage::default();
    let mut current: Option<ObjectDescriptor> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(decode_err)? {
            Event::Start(e) | Event::Empty(e) => {
                if e.local_name().as_ref() == b"Contents" {
                    current = Some(ObjectDescriptor::default());
                }
            }
            Event::Text(e) => {
                text.clear();
                text.push_str(&e.unescape().map_err(decode_err)?);
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"Key" => {
                        if let Some(obj) = current.as_mut() {
                            obj.key = std::mem::take(&mut text);
                        }
                    }
                    b"Size" => {
                        if let Some(obj) = current.as_mut() {
                            obj.size = text.parse().unwrap_or(0);
                        }
                    }
                    b"LastModified" => {
                        if let Some(obj) = current.as_mut() {
                            obj.last_modified = Some(std::mem::take(&mut text));
                        }
                    }
                    b"ETag" => {
                        if let Some(obj) = current.as_mut() {
                            obj.etag = Some(text.trim_matches('"').to_string());
                        }
                    }
                    b"StorageClass" => {
                        if let Some(obj) = current.as_mut() {
                            obj.storage_class = Some(std::mem::take(&mut text));
                        }
                    }
                    b"Contents" => {
                        if let Some(obj) = current.take() {
                            page.objects.push(obj);
                        }
                    }
                    b"IsTruncated" => {
                        page.is_truncated = text == "true";
                    }
                    b"NextContinuationToken" => {
                        page.next_continuation_token = Some(std::mem::take(&mut text));
                    }
                    _ => {}
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(page)
}

/// Parse a `ListAllMyBuckets` response body.
pub fn parse_bucket_list(xml: &[u8]) -> Result<Vec<BucketSummary>, S3Error> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut buckets = Vec::new();
    let mut current: Option<BucketSummary> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(decode_err)? {
            Event::Start(e) | Event::Empty(e) => {
                if e.local_name().as_ref() == b"Bucket" {
                    current = Some(BucketSummary {
                        name: String::new(),
                        creation_date: None,
                    });
                }
            }
            Event::Text(e) => {
                text.clear();
                text.push_str(&e.unescape().map_err(decode_err)?);
            }
            Event::End(e) => {
                match e.local_name().as_ref() {
                    b"Name" => {
                        if let Some(bucket) = current.as_mut() {
                            bucket.name = std::mem::take(&mut text);
                        }
                    }
                    b"CreationDate" => {
                        if let Some(bucket) = current.as_mut() {
                            bucket.creation_date = Some(std::mem::take(&mut text));
                        }
                    }
                    b"Bucket" => {
                        if let Some(bucket) = current.take() {
                            if !bucket.name.is_empty() {
                                buckets.push(bucket);
                            }
                        }
                    }
                    _ => {}
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(buckets)
}

/// Extract the `UploadId` from an `InitiateMultipartUpload` response.
pub fn parse_initiate_multipart(xml: &[u8]) -> Result<String, S3Error> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut upload_id = String::new();
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(decode_err)? {
            Event::Text(e) => {
                text.clear();
                text.push_str(&e.unescape().map_err(decode_err)?);
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"UploadId" {
                    upload_id = std::mem::take(&mut text);
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if upload_id.is_empty() {
        return Err(S3Error::Decode(
            "InitiateMultipartUpload response missing UploadId".into(),
        ));
    }
    Ok(upload_id)
}

/// Best-effort extraction of `<Error><Code>/<Message>` from an error body.
///
/// Returns `None` when the body carries no recognizable error element.
pub fn parse_error(xml: &[u8]) -> Option<(String, String)> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut code = String::new();
    let mut message = String::new();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => {
                text.clear();
                if let Ok(value) = e.unescape() {
                    text.push_str(&value);
                }
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Code" => code = std::mem::take(&mut text),
                    b"Message" => message = std::mem::take(&mut text),
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    if code.is_empty() {
        None
    } else {
        Some((code, message))
    }
}

/// Build the `CompleteMultipartUpload` request body.
pub fn complete_multipart_body(parts: &[CompletedPart]) -> String {
    let mut xml = String::from("<CompleteMultipartUpload>");
    for part in parts {
        xml.push_str(&format!(
            "<Part><PartNumber>{}</PartNumber><ETag>{}</ETag></Part>",
            part.part_number,
            xml_escape(&part.etag)
        ));
    }
    xml.push_str("</CompleteMultipartUpload>");
    xml
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>demo</Name>
  <Prefix>logs/</Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>100</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>1ueGcxLPRx1Tr</NextContinuationToken>
  <Contents>
    <Key>logs/a.txt</Key>
    <LastModified>2026-01-05T09:30:00.000Z</LastModified>
    <ETag>&quot;599393a2c526c680119d84155d90f1e5&quot;</ETag>
    <Size>1042</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
  <Contents>
    <Key>logs/b.bin</Key>
    <LastModified>2026-01-06T11:00:00.000Z</LastModified>
    <ETag>&quot;0f343b0931126a20f133d67c2b018a3b&quot;</ETag>
    <Size>5242880</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
</ListBucketResult>"#;

    #[test]
    fn list_page_objects_and_token() {
        let page = parse_list_objects(LIST_PAGE.as_bytes()).unwrap();
        assert_eq!(page.objects.len(), 2);
        assert!(page.is_truncated);
        assert_eq!(page.next_continuation_token.as_deref(), Some("1ueGcxLPRx1Tr"));

        let first = &page.objects[0];
        assert_eq!(first.key, "logs/a.txt");
        assert_eq!(first.size, 1042);
        assert_eq!(
            first.last_modified.as_deref(),
            Some("2026-01-05T09:30:00.000Z")
        );
        // Quotes around the etag are stripped.
        assert_eq!(
            first.etag.as_deref(),
            Some("599393a2c526c680119d84155d90f1e5")
        );
        assert_eq!(first.storage_class.as_deref(), Some("STANDARD"));
    }

    #[test]
    fn list_final_page_has_no_token() {
        let xml = r#"<ListBucketResult>
  <IsTruncated>false</IsTruncated>
  <Contents><Key>solo.txt</Key><Size>7</Size></Contents>
</ListBucketResult>"#;
        let page = parse_list_objects(xml.as_bytes()).unwrap();
        assert_eq!(page.objects.len(), 1);
        assert!(!page.is_truncated);
        assert_eq!(page.next_continuation_token, None);
    }

    #[test]
    fn bucket_list_parses_names_and_dates() {
        let xml = r#"<ListAllMyBucketsResult>
  <Owner><ID>rgw</ID><DisplayName>demo user</DisplayName></Owner>
  <Buckets>
    <Bucket><Name>alpha</Name><CreationDate>2025-11-02T08:00:00.000Z</CreationDate></Bucket>
    <Bucket><Name>beta</Name><CreationDate>2025-12-24T17:45:00.000Z</CreationDate></Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;
        let buckets = parse_bucket_list(xml.as_bytes()).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].name, "alpha");
        assert_eq!(
            buckets[1].creation_date.as_deref(),
            Some("2025-12-24T17:45:00.000Z")
        );
    }

    #[test]
    fn initiate_multipart_upload_id() {
        let xml = r#"<InitiateMultipartUploadResult>
  <Bucket>demo</Bucket><Key>big.bin</Key>
  <UploadId>2~pZnyE9DUD1jfABcSpO1nVp4cSP8jv07</UploadId>
</InitiateMultipartUploadResult>"#;
        assert_eq!(
            parse_initiate_multipart(xml.as_bytes()).unwrap(),
            "2~pZnyE9DUD1jfABcSpO1nVp4cSP8jv07"
        );
    }

    #[test]
    fn initiate_without_upload_id_is_decode_error() {
        let err = parse_initiate_multipart(b"<InitiateMultipartUploadResult/>").unwrap_err();
        assert!(matches!(err, S3Error::Decode(_)));
    }

    #[test]
    fn error_body_code_and_message() {
        let xml = r#"<Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist</Message></Error>"#;
        let (code, message) = parse_error(xml.as_bytes()).unwrap();
        assert_eq!(code, "NoSuchBucket");
        assert_eq!(message, "The specified bucket does not exist");
    }

    #[test]
    fn non_error_body_yields_none() {
        assert_eq!(parse_error(b"<CompleteMultipartUploadResult/>"), None);
        assert_eq!(parse_error(b"not xml at all"), None);
    }

    #[test]
    fn complete_body_lists_parts_in_order() {
        let parts = vec![
            CompletedPart {
                part_number: 1,
                etag: "aaa".into(),
            },
            CompletedPart {
                part_number: 2,
                etag: "bbb".into(),
            },
        ];
        assert_eq!(
            complete_multipart_body(&parts),
            "<CompleteMultipartUpload>\
             <Part><PartNumber>1</PartNumber><ETag>aaa</ETag></Part>\
             <Part><PartNumber>2</PartNumber><ETag>bbb</ETag></Part>\
             </CompleteMultipartUpload>"
        );
    }
}
