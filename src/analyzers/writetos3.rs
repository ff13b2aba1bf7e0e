use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Uploads raw bytes under `key`.
pub async fn write_bytes_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
    content_type: &str,
) -> anyhow::Result<()> {
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body))
        .content_type(content_type)
        .send()
        .await?;

    debug!(bucket, key, "S3 object written");
    Ok(())
}

/// Object key and body for a local file, gzip-compressed when requested.
pub fn prepare_upload(path: &Path, prefix: &str, gzip: bool) -> anyhow::Result<(String, Vec<u8>)> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("not a file path: {}", path.display()))?;
    let contents = std::fs::read(path)?;

    if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&contents)?;
        Ok((format!("{prefix}{file_name}.gz"), encoder.finish()?))
    } else {
        Ok((format!("{prefix}{file_name}"), contents))
    }
}

fn content_type_for(path: &Path, gzip: bool) -> &'static str {
    if gzip {
        return "application/gzip";
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Uploads every file in `paths` under `prefix`.
#[tracing::instrument(skip(client, paths), fields(files = paths.len()))]
pub async fn publish_files(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: &str,
    paths: &[PathBuf],
    gzip: bool,
) -> anyhow::Result<usize> {
    let mut upload_count = 0;

    for path in paths {
        let (key, body) = prepare_upload(path, prefix, gzip)?;
        write_bytes_to_s3(client, bucket, &key, body, content_type_for(path, gzip)).await?;
        upload_count += 1;
    }

    info!(upload_count, bucket, prefix, "S3 upload complete");
    Ok(upload_count)
}
