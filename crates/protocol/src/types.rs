use serde::{Deserialize, Serialize};

/// Pre-signed location a file's parts are PUT to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDestination {
    /// Storage object identifier.
    pub key: String,
    /// Address each part is sent to.
    pub url: String,
}

/// Processing task created when a multipart upload is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingTask {
    pub key: String,
    pub task_id: String,
}

/// Form body of the finalize call (`key=<key>&pipeline=<pipeline>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub key: String,
    pub pipeline: String,
}

/// Form body of the status call (`taskId=<id>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub task_id: String,
}

/// Opaque status response. Receiving one at all means the task is done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub body: String,
}
