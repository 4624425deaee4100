use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::parse::parse_response;
use crate::error::{EnrichError, EnrichResult};

use super::{ContentGenerator, GeneratedContent, GenerationRequest};

// Serves pre-recorded backend responses from
// `<root>/section_NN/<kind>.json`. The files hold the raw response text, so
// they go through the same lenient parse as a live backend would.
pub struct ResponseDirGenerator {
    root: PathBuf,
}

impl ResponseDirGenerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn response_path(&self, request: &GenerationRequest) -> PathBuf {
        self.root
            .join(request.section.record_id())
            .join(format!("{}.json", request.kind.label()))
    }
}

impl ContentGenerator for ResponseDirGenerator {
    fn generate(&self, request: &GenerationRequest) -> EnrichResult<GeneratedContent> {
        let kind = request.kind.label();
        let path = self.response_path(request);
        let raw = fs::read_to_string(&path).map_err(|err| EnrichError::Generation {
            kind: kind.to_string(),
            reason: format!("failed to read response {}: {err}", path.display()),
        })?;

        debug!(
            section = %request.section,
            kind,
            topic = %request.topic,
            count = request.count,
            path = %path.display(),
            "loaded generation response"
        );

        let value = parse_response(kind, &raw, request.kind.shape())?;
        GeneratedContent::from_value(request.kind, value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::engine::SectionNumber;
    use crate::generation::ContentKind;

    fn request(kind: ContentKind) -> GenerationRequest {
        GenerationRequest {
            section: SectionNumber::new(5),
            kind,
            topic: "Medical Equipment".to_string(),
            count: 2,
        }
    }

    #[test]
    fn reads_and_repairs_recorded_responses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let section_dir = dir.path().join("section_05");
        fs::create_dir_all(&section_dir).expect("section dir");
        fs::write(
            section_dir.join("vocabulary.json"),
            "```json\n[{\"germanTerm\": \"die Spritze\"},]\n```",
        )
        .expect("write response");

        let generator = ResponseDirGenerator::new(dir.path());
        let content = generator
            .generate(&request(ContentKind::VocabularyBatch))
            .expect("response should load");
        assert_eq!(
            content,
            GeneratedContent::Items(vec![json!({ "germanTerm": "die Spritze" })])
        );
    }

    #[test]
    fn missing_response_is_a_generation_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let generator = ResponseDirGenerator::new(dir.path());

        let err = generator
            .generate(&request(ContentKind::Metadata))
            .expect_err("missing response should fail");
        assert_eq!(err.kind(), "generation-failure");
    }

    #[test]
    fn metadata_must_be_an_object() {
        let dir = tempfile::tempdir().expect("tempdir");
        let section_dir = dir.path().join("section_05");
        fs::create_dir_all(&section_dir).expect("section dir");
        fs::write(section_dir.join("metadata.json"), "[1, 2]").expect("write response");

        let generator = ResponseDirGenerator::new(dir.path());
        let err = generator
            .generate(&request(ContentKind::Metadata))
            .expect_err("list metadata should fail");
        assert_eq!(err.kind(), "malformed-generation-response");
    }
}
