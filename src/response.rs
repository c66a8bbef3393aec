use serde::{Deserialize, Serialize};

/// Body an upload endpoint may answer with.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UploadResponse {
    pub content: Content,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Content {
    #[serde(default)]
    pub bboxes: Vec<f32>,
    #[serde(default)]
    pub pred_labels: Vec<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Detection {
    pub bbox: [f32; 4],
    pub label: String,
}

impl UploadResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Pairs each label with the next four bbox values.
    pub fn detections(&self) -> Vec<Detection> {
        self.content
            .bboxes
            .chunks_exact(4)
            .zip(self.content.pred_labels.iter())
            .map(|(bbox, label)| Detection {
                bbox: [bbox[0], bbox[1], bbox[2], bbox[3]],
                label: label.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_pair() {
        let body = br#"{
            "content": {
                "bboxes": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
                "pred_labels": ["cat", "dog"]
            }
        }"#;
        let response = UploadResponse::from_slice(body).unwrap();
        let detections = response.detections();

        assert_eq!(
            detections,
            vec![
                Detection {
                    bbox: [1.0, 2.0, 3.0, 4.0],
                    label: "cat".into()
                },
                Detection {
                    bbox: [5.0, 6.0, 7.0, 8.0],
                    label: "dog".into()
                },
            ]
        );
    }

    #[test]
    fn test_pairing_stops_at_shorter_side() {
        let response = UploadResponse {
            content: Content {
                bboxes: vec![0.0; 10],
                pred_labels: vec!["a".into(), "b".into(), "c".into()],
            },
        };
        assert_eq!(response.detections().len(), 2);
    }

    #[test]
    fn test_missing_arrays_default_to_empty() {
        let response = UploadResponse::from_slice(br#"{"content": {}}"#).unwrap();
        assert!(response.detections().is_empty());
    }

    #[test]
    fn test_non_json_body_is_an_error() {
        assert!(UploadResponse::from_slice(b"ok").is_err());
    }
}
