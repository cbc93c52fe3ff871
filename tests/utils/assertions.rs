use serde_json::Value;

// ============================================================================
// Frame Assertions
// ============================================================================

/// Fluent checks on a frame received by a client
pub struct FrameAssertion {
    frame: Value,
}

impl FrameAssertion {
    pub fn new(frame: Option<Value>) -> Self {
        Self {
            frame: frame.expect("Expected a frame but none arrived"),
        }
    }

    pub fn of_type(self, expected: &str) -> Self {
        assert_eq!(
            self.frame["type"], expected,
            "Unexpected frame type in {}",
            self.frame
        );
        self
    }

    pub fn with_field(self, field: &str, expected: Value) -> Self {
        assert_eq!(
            self.frame[field], expected,
            "Unexpected value for '{}' in {}",
            field, self.frame
        );
        self
    }

    pub fn with_timestamp(self) -> Self {
        let raw = self.frame["timestamp"]
            .as_str()
            .unwrap_or_else(|| panic!("Missing timestamp in {}", self.frame));
        assert!(
            chrono::DateTime::parse_from_rfc3339(raw).is_ok(),
            "Timestamp is not RFC 3339: {}",
            raw
        );
        self
    }

    pub fn into_value(self) -> Value {
        self.frame
    }
}
