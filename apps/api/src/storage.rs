//! S3-backed storage for uploaded resume files.

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// Thin wrapper over the S3 client carrying the bucket name.
#[derive(Clone)]
pub struct Storage {
    s3: S3Client,
    bucket: String,
}

impl Storage {
    pub fn new(s3: S3Client, bucket: String) -> Self {
        Self { s3, bucket }
    }

    /// Builds the object key for an uploaded resume file.
    pub fn resume_key(user_id: Uuid, resume_id: Uuid, filename: &str) -> String {
        format!("resumes/{user_id}/{resume_id}/{filename}")
    }

    /// Uploads a resume file under the given key.
    pub async fn put_resume(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<(), AppError> {
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed for {key}: {e}")))?;

        info!("Uploaded resume file to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    /// Downloads a resume file by key.
    pub async fn get_resume(&self, key: &str) -> Result<Bytes, AppError> {
        let object = self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 download failed for {key}: {e}")))?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("S3 body read failed for {key}: {e}")))?;

        Ok(data.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_key_layout() {
        let user_id = Uuid::nil();
        let resume_id = Uuid::nil();
        let key = Storage::resume_key(user_id, resume_id, "cv.pdf");
        assert_eq!(
            key,
            format!("resumes/{user_id}/{resume_id}/cv.pdf")
        );
    }
}
