//! Shared key generation for storage backends.

/// Content type of every stored audio object
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Path segment used when the caller identity is absent
pub const ANONYMOUS_USER_SEGMENT: &str = "(null)";

/// Object key for synthesized audio: `downloads/{uid}/audio_{unix_millis}.mp3`.
///
/// Two calls by the same user within one millisecond produce the same key.
pub fn audio_object_key(user_id: Option<&str>, unix_millis: i64) -> String {
    let user_segment = user_id
        .filter(|uid| !uid.is_empty())
        .unwrap_or(ANONYMOUS_USER_SEGMENT);
    format!("downloads/{}/audio_{}.mp3", user_segment, unix_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_object_key() {
        assert_eq!(
            audio_object_key(Some("uid123"), 1700000000000),
            "downloads/uid123/audio_1700000000000.mp3"
        );
    }

    #[test]
    fn test_anonymous_key() {
        assert_eq!(
            audio_object_key(None, 42),
            "downloads/(null)/audio_42.mp3"
        );
        assert_eq!(audio_object_key(Some(""), 42), "downloads/(null)/audio_42.mp3");
    }

    #[test]
    fn test_distinct_millis_distinct_keys() {
        assert_ne!(
            audio_object_key(Some("u"), 1),
            audio_object_key(Some("u"), 2)
        );
    }
}
