fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use mediadrop_protocol::{
        DEFAULT_PIPELINE, FinalizeRequest, ProcessingTask, StatusRequest, UploadDestination,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent comparison).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  API:  {fixture}\n  Rust: {reserialized}"
        );
        parsed
    }

    // --- JSON responses ---

    #[test]
    fn fixture_upload_destination() {
        let dest = roundtrip_test::<UploadDestination>("upload_destination.json");
        assert!(dest.url.contains("X-Amz-Signature"));
    }

    #[test]
    fn fixture_processing_task() {
        let task = roundtrip_test::<ProcessingTask>("processing_task.json");
        assert_eq!(task.task_id, "9d3b7f40-5a1e-4c2b-8f0d-6e1a2b3c4d5e");
    }

    #[test]
    fn destination_ignores_extra_fields() {
        let json = r#"{"key":"k","url":"https://bucket.test/k","uploadId":"u-1"}"#;
        let dest: UploadDestination = serde_json::from_str(json).unwrap();
        assert_eq!(dest.key, "k");
    }

    // --- Form bodies ---

    #[test]
    fn finalize_form_encoding() {
        let request = roundtrip_test::<FinalizeRequest>("finalize_request.json");
        assert_eq!(request.pipeline, DEFAULT_PIPELINE);

        let form = serde_urlencoded::to_string(&request).unwrap();
        assert_eq!(
            form,
            "key=uploads%2F2f6c1a9e-beach.jpg&pipeline=dragonfly-img-basic"
        );
    }

    #[test]
    fn status_form_encoding() {
        let request = roundtrip_test::<StatusRequest>("status_request.json");

        let form = serde_urlencoded::to_string(&request).unwrap();
        assert_eq!(form, "taskId=9d3b7f40-5a1e-4c2b-8f0d-6e1a2b3c4d5e");

        let back: StatusRequest = serde_urlencoded::from_str(&form).unwrap();
        assert_eq!(back, request);
    }
}
