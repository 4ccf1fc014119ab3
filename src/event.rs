//! Pipeline job event parsing
//!
//! The runner is invoked with a JSON event naming the job and the artifact
//! holding the migration bundle. Two shapes are accepted: the CodePipeline
//! invocation shape (`CodePipeline.job` with an input artifact list) and a
//! flat `{job_id, bucket, key}` shape for direct invocation.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("invalid event format, expected a pipeline job: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("pipeline job {job_id} carries no input artifacts")]
    MissingArtifact { job_id: String },
}

/// The resolved invocation: which job to report against and where the
/// bundle artifact lives.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEvent {
    pub job_id: String,
    pub bucket: String,
    pub key: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEvent {
    Pipeline(PipelineEvent),
    Flat(FlatEvent),
}

#[derive(Deserialize)]
struct PipelineEvent {
    #[serde(rename = "CodePipeline.job")]
    job: PipelineJob,
}

#[derive(Deserialize)]
struct PipelineJob {
    id: String,
    data: PipelineJobData,
}

#[derive(Deserialize)]
struct PipelineJobData {
    #[serde(rename = "inputArtifacts")]
    input_artifacts: Vec<InputArtifact>,
}

#[derive(Deserialize)]
struct InputArtifact {
    location: ArtifactLocation,
}

#[derive(Deserialize)]
struct ArtifactLocation {
    #[serde(rename = "s3Location")]
    s3_location: S3Location,
}

#[derive(Deserialize)]
struct S3Location {
    #[serde(rename = "bucketName")]
    bucket_name: String,
    #[serde(rename = "objectKey")]
    object_key: String,
}

#[derive(Deserialize)]
struct FlatEvent {
    job_id: String,
    bucket: String,
    key: String,
}

impl JobEvent {
    /// Parse an invocation event from JSON.
    ///
    /// Only the first input artifact is consulted, matching the pipeline
    /// action contract (one source artifact per migration step).
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        match serde_json::from_str::<RawEvent>(json)? {
            RawEvent::Pipeline(event) => {
                let job_id = event.job.id;
                let artifact = event
                    .job
                    .data
                    .input_artifacts
                    .into_iter()
                    .next()
                    .ok_or_else(|| EventError::MissingArtifact {
                        job_id: job_id.clone(),
                    })?;
                Ok(Self {
                    job_id,
                    bucket: artifact.location.s3_location.bucket_name,
                    key: artifact.location.s3_location.object_key,
                })
            }
            RawEvent::Flat(event) => Ok(Self {
                job_id: event.job_id,
                bucket: event.bucket,
                key: event.key,
            }),
        }
    }
}
