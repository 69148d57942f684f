/*!
 * Upload-target resolution
 *
 * The REST API hands back an upload target of the form
 * `http[s]://{host}/Panopto/Upload/{unique-id}`. The storage endpoint wants
 * the part of it up to and including `/Panopto/` as the service URL, and
 * `{unique-id}/{file name}` as the object key. Pure string operations, no
 * I/O.
 */

use crate::error::{CaravanError, Result};

/// Marker for the service root inside an upload target
pub const ROOT_SEGMENT: &str = "/Panopto/";

/// Marker for the upload bucket inside an upload target
pub const BUCKET_SEGMENT: &str = "/Panopto/Upload/";

/// Bucket name the storage endpoint serves uploads under
pub const UPLOAD_BUCKET: &str = "Upload";

/// Compute the storage service URL from an upload target.
///
/// `https://host/Panopto/Upload/abc-123` becomes `https://host/Panopto/`.
pub fn service_endpoint(target: &str) -> Result<&str> {
    let idx = target
        .find(ROOT_SEGMENT)
        .ok_or(CaravanError::MalformedTarget {
            target: target.to_string(),
            marker: ROOT_SEGMENT,
        })?;
    Ok(&target[..idx + ROOT_SEGMENT.len()])
}

/// Compute the per-job key prefix from an upload target.
///
/// `https://host/Panopto/Upload/abc-123` becomes `abc-123`.
pub fn key_prefix(target: &str) -> Result<&str> {
    let idx = target
        .find(BUCKET_SEGMENT)
        .ok_or(CaravanError::MalformedTarget {
            target: target.to_string(),
            marker: BUCKET_SEGMENT,
        })?;
    Ok(&target[idx + BUCKET_SEGMENT.len()..])
}

/// Assemble an object key from an upload target and a local file name.
///
/// Any local directory prefix on `file_name` is stripped (both `/` and `\`
/// separators), and the key always uses forward slashes:
/// `{unique-id}/{base name}`.
pub fn object_key(target: &str, file_name: &str) -> Result<String> {
    let prefix = key_prefix(target)?;
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    Ok(format!("{}/{}", prefix, base))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "https://demo.hosted.example.com/Panopto/Upload/6ee5a11b-7d5f-4a3a-9b3a-bba6ae1c5d6b";

    #[test]
    fn test_service_endpoint() {
        assert_eq!(
            service_endpoint(TARGET).unwrap(),
            "https://demo.hosted.example.com/Panopto/"
        );
    }

    #[test]
    fn test_service_endpoint_http() {
        assert_eq!(
            service_endpoint("http://localhost:8080/Panopto/Upload/x").unwrap(),
            "http://localhost:8080/Panopto/"
        );
    }

    #[test]
    fn test_key_prefix() {
        assert_eq!(
            key_prefix(TARGET).unwrap(),
            "6ee5a11b-7d5f-4a3a-9b3a-bba6ae1c5d6b"
        );
    }

    #[test]
    fn test_object_key_bare_name() {
        assert_eq!(
            object_key(TARGET, "lecture.mp4").unwrap(),
            "6ee5a11b-7d5f-4a3a-9b3a-bba6ae1c5d6b/lecture.mp4"
        );
    }

    #[test]
    fn test_object_key_strips_unix_prefix() {
        assert_eq!(
            object_key(TARGET, "/data/sessions/week1/lecture.mp4").unwrap(),
            "6ee5a11b-7d5f-4a3a-9b3a-bba6ae1c5d6b/lecture.mp4"
        );
    }

    #[test]
    fn test_object_key_strips_windows_prefix() {
        assert_eq!(
            object_key(TARGET, "C:\\sessions\\week1\\lecture.mp4").unwrap(),
            "6ee5a11b-7d5f-4a3a-9b3a-bba6ae1c5d6b/lecture.mp4"
        );
    }

    #[test]
    fn test_missing_root_segment() {
        let err = service_endpoint("https://host/Other/Upload/x").unwrap_err();
        match err {
            CaravanError::MalformedTarget { marker, .. } => assert_eq!(marker, ROOT_SEGMENT),
            other => panic!("expected MalformedTarget, got: {other:?}"),
        }
    }

    #[test]
    fn test_missing_bucket_segment() {
        // Root marker present, bucket marker absent
        let err = object_key("https://host/Panopto/Other/x", "f.mp4").unwrap_err();
        match err {
            CaravanError::MalformedTarget { marker, .. } => assert_eq!(marker, BUCKET_SEGMENT),
            other => panic!("expected MalformedTarget, got: {other:?}"),
        }
        // But the service endpoint is still resolvable
        assert_eq!(
            service_endpoint("https://host/Panopto/Other/x").unwrap(),
            "https://host/Panopto/"
        );
    }
}
